//! Core library for `passvault`.
//!
//! Contains the record field cipher, the password generator, the
//! self-clearing clipboard, session providers, the record store and the
//! UI-facing controller. This crate depends on `passvault-remote` for the
//! collection trait and knows nothing about HTTP.

pub mod clipboard;
pub mod config;
pub mod controller;
pub mod crypto;
pub mod error;
pub mod generator;
pub mod record;
pub mod session;
pub mod store;

pub use controller::VaultController;
pub use error::VaultError;
pub use record::{Draft, Password, VaultRecord};
pub use store::VaultStore;
