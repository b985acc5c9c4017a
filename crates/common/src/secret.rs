//! Redacting wrapper for credentials
//!
//! Client secrets and bearer tokens pass through this type so that a stray
//! `{:?}` in a log line prints `[REDACTED]` instead of the value. The inner
//! value is zeroed when the wrapper is dropped.

use std::fmt;
use std::path::Path;
use zeroize::Zeroize;

use crate::{Error, Result};

/// Sensitive value, redacted in Debug and Display
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Borrow the inner value. Only call this at the point of use
    /// (request header, form body), never to log.
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl Secret<String> {
    /// Read a secret mounted as a file (container secret, systemd credential).
    /// Surrounding whitespace is stripped; a blank file is an error.
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read secret file {}: {e}", path.display()))
        })?;
        let secret = Self::new(raw.trim().to_owned());
        raw.zeroize();

        if secret.expose().is_empty() {
            return Err(Error::Config(format!(
                "secret file {} is empty",
                path.display()
            )));
        }
        Ok(secret)
    }
}

impl From<String> for Secret<String> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T: Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<T: Zeroize + Clone> Clone for Secret<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}
