//! Self-clearing clipboard exposure.
//!
//! [`ClipboardTimer`] writes a secret to the clipboard and arms a single
//! auto-clear timer. A second copy before the timer fires cancels the first
//! timer and arms a fresh one, so at most one clear is ever pending.
//!
//! Cancellation is twofold: the pending task is aborted, and every armed
//! task carries a generation number that must still be current when it
//! fires. The second check covers a task that has already woken up when the
//! abort arrives.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::ClipboardError;

/// How long a copied secret stays on the clipboard.
pub const CLEAR_AFTER: Duration = Duration::from_millis(15_000);

/// A writable text clipboard.
pub trait Clipboard: Send + Sync + 'static {
    /// Replace the clipboard contents with `text`.
    ///
    /// # Errors
    ///
    /// Returns [`ClipboardError`] if the clipboard cannot be opened or
    /// written.
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// The platform clipboard, opened lazily on first use.
///
/// The handle is kept open afterwards: on X11 the contents are served by
/// the owning process and vanish when the last handle is dropped.
#[derive(Default)]
pub struct SystemClipboard {
    handle: Mutex<Option<arboard::Clipboard>>,
}

impl SystemClipboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Debug for SystemClipboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemClipboard").finish_non_exhaustive()
    }
}

impl Clipboard for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut guard = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        let handle = match guard.take() {
            Some(handle) => handle,
            None => arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable {
                reason: e.to_string(),
            })?,
        };
        guard
            .insert(handle)
            .set_text(text)
            .map_err(|e| ClipboardError::Write {
                reason: e.to_string(),
            })
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    contents: String,
    writes: Vec<String>,
    deny: bool,
}

/// In-process clipboard for tests. Records every write.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryClipboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents.
    #[must_use]
    pub fn contents(&self) -> String {
        self.lock().contents.clone()
    }

    /// Every successful write, oldest first.
    #[must_use]
    pub fn writes(&self) -> Vec<String> {
        self.lock().writes.clone()
    }

    /// Make subsequent writes fail as if access were denied.
    pub fn deny_access(&self, deny: bool) {
        self.lock().deny = deny;
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut state = self.lock();
        if state.deny {
            return Err(ClipboardError::Write {
                reason: "access denied".to_owned(),
            });
        }
        state.contents = text.to_owned();
        state.writes.push(text.to_owned());
        Ok(())
    }
}

/// Status changes emitted by [`ClipboardTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardEvent {
    /// The secret is on the clipboard and a clear is pending.
    Copied,
    /// The clipboard write was refused; nothing is pending.
    CopyFailed,
    /// The pending clear overwrote the clipboard.
    Cleared,
    /// The pending clear could not write to the clipboard.
    ClearFailed,
}

impl fmt::Display for ClipboardEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copied => write!(f, "Copied! Will clear in {}s", CLEAR_AFTER.as_secs()),
            Self::CopyFailed => f.write_str("Failed to copy"),
            Self::Cleared => f.write_str("Clipboard cleared"),
            Self::ClearFailed => f.write_str("Could not clear clipboard automatically"),
        }
    }
}

#[derive(Debug, Default)]
struct TimerState {
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl TimerState {
    /// Abort any pending clear and invalidate tasks already in flight.
    fn cancel(&mut self) -> bool {
        self.generation = self.generation.wrapping_add(1);
        match self.pending.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

/// Owns the single pending auto-clear for copied secrets.
///
/// State machine: `Idle -> Pending -> Idle`. Must be used from within a
/// tokio runtime; outside one, [`copy`](Self::copy) refuses rather than
/// leave a secret on the clipboard with no timer to remove it.
pub struct ClipboardTimer {
    clipboard: Arc<dyn Clipboard>,
    state: Arc<Mutex<TimerState>>,
    events: mpsc::UnboundedSender<ClipboardEvent>,
    clear_after: Duration,
}

impl ClipboardTimer {
    /// Create an idle timer over `clipboard`, returning the receiving end of
    /// its status events.
    pub fn new(
        clipboard: Arc<dyn Clipboard>,
    ) -> (Self, mpsc::UnboundedReceiver<ClipboardEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let timer = Self {
            clipboard,
            state: Arc::new(Mutex::new(TimerState::default())),
            events,
            clear_after: CLEAR_AFTER,
        };
        (timer, rx)
    }

    /// Write `text` to the clipboard and (re)arm the auto-clear.
    ///
    /// A successful write cancels any pending clear before arming the new
    /// one. A failed write arms nothing and leaves an earlier pending clear
    /// in place, since the earlier secret is still on the clipboard.
    pub fn copy(&self, text: &str) -> ClipboardEvent {
        let mut state = self.lock();

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime to schedule the clipboard clear; refusing to copy");
            return self.emit(ClipboardEvent::CopyFailed);
        };

        if let Err(e) = self.clipboard.write_text(text) {
            warn!(error = %e, "copy to clipboard failed");
            return self.emit(ClipboardEvent::CopyFailed);
        }

        if state.cancel() {
            debug!("superseding pending clipboard clear");
        }
        let generation = state.generation;
        state.pending = Some(runtime.spawn(clear_later(
            Arc::clone(&self.clipboard),
            Arc::clone(&self.state),
            self.events.clone(),
            generation,
            self.clear_after,
        )));
        debug!(generation, delay = ?self.clear_after, "clipboard clear armed");
        self.emit(ClipboardEvent::Copied)
    }

    /// Cancel the pending clear and clear the clipboard immediately.
    ///
    /// Returns `None` when nothing was pending.
    pub fn clear_now(&self) -> Option<ClipboardEvent> {
        let mut state = self.lock();
        if !state.cancel() {
            return None;
        }
        let event = clear(self.clipboard.as_ref());
        drop(state);
        Some(self.emit(event))
    }

    /// Whether an auto-clear is armed.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.lock().pending.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ClipboardEvent) -> ClipboardEvent {
        // A dropped receiver only means nobody is displaying status.
        let _ = self.events.send(event);
        event
    }
}

impl fmt::Debug for ClipboardTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClipboardTimer")
            .field("pending", &self.is_pending())
            .field("clear_after", &self.clear_after)
            .finish_non_exhaustive()
    }
}

async fn clear_later(
    clipboard: Arc<dyn Clipboard>,
    state: Arc<Mutex<TimerState>>,
    events: mpsc::UnboundedSender<ClipboardEvent>,
    generation: u64,
    delay: Duration,
) {
    tokio::time::sleep(delay).await;

    let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
    if guard.generation != generation {
        return;
    }
    guard.pending = None;
    let event = clear(clipboard.as_ref());
    drop(guard);
    let _ = events.send(event);
}

fn clear(clipboard: &dyn Clipboard) -> ClipboardEvent {
    match clipboard.write_text("") {
        Ok(()) => {
            debug!("clipboard cleared");
            ClipboardEvent::Cleared
        }
        Err(e) => {
            warn!(error = %e, "automatic clipboard clear failed");
            ClipboardEvent::ClearFailed
        }
    }
}
