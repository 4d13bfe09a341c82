//! Random password generation from a character-class policy.

use rand::Rng;
use rand::rngs::OsRng;

use crate::error::GeneratorError;

pub const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
pub const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const DIGITS: &str = "0123456789";
pub const SYMBOLS: &str = "!@#$%^&*()_+-={}[]|:;<>,.?/";

pub const MIN_LENGTH: usize = 6;
pub const MAX_LENGTH: usize = 32;
pub const DEFAULT_LENGTH: usize = 12;

/// Which character classes a generated password draws from.
///
/// Lowercase letters are always included, so the pool is never empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorPolicy {
    length: usize,
    pub include_uppercase: bool,
    pub include_numbers: bool,
    pub include_symbols: bool,
}

impl GeneratorPolicy {
    /// A policy of the given length with every optional class enabled.
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError::LengthOutOfRange`] unless
    /// `6 <= length <= 32`.
    pub fn new(length: usize) -> Result<Self, GeneratorError> {
        let mut policy = Self::default();
        policy.set_length(length)?;
        Ok(policy)
    }

    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Change the length, keeping the class selection.
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError::LengthOutOfRange`] unless
    /// `6 <= length <= 32`; the policy is left unchanged.
    pub fn set_length(&mut self, length: usize) -> Result<(), GeneratorError> {
        if !(MIN_LENGTH..=MAX_LENGTH).contains(&length) {
            return Err(GeneratorError::LengthOutOfRange {
                min: MIN_LENGTH,
                max: MAX_LENGTH,
                actual: length,
            });
        }
        self.length = length;
        Ok(())
    }

    /// The characters a password under this policy is drawn from.
    #[must_use]
    pub fn pool(&self) -> Vec<char> {
        let mut pool: Vec<char> = LOWERCASE.chars().collect();
        if self.include_uppercase {
            pool.extend(UPPERCASE.chars());
        }
        if self.include_numbers {
            pool.extend(DIGITS.chars());
        }
        if self.include_symbols {
            pool.extend(SYMBOLS.chars());
        }
        pool
    }
}

impl Default for GeneratorPolicy {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
            include_uppercase: true,
            include_numbers: true,
            include_symbols: true,
        }
    }
}

/// Generate a password: `policy.length()` independent, uniform draws (with
/// replacement) from the policy's pool, using the OS CSPRNG.
#[must_use]
pub fn generate(policy: &GeneratorPolicy) -> String {
    generate_with(policy, &mut OsRng)
}

/// [`generate`] with a caller-supplied random source.
pub fn generate_with<R: Rng>(policy: &GeneratorPolicy, rng: &mut R) -> String {
    let pool = policy.pool();
    (0..policy.length())
        .map(|_| pool[rng.gen_range(0..pool.len())])
        .collect()
}
