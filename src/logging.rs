//! Log-safe rendering of API keys.
//!
//! fal keys look like `<key-id>:<secret>`; only the first characters of the
//! key id are ever shown.

use std::fmt;

/// Redacted API key representation.
///
/// Shows the first 8 characters followed by `***`, suitable for logs.
#[derive(Clone, Debug)]
pub struct SensitiveApiKey<'a> {
    inner: &'a str,
}

impl<'a> SensitiveApiKey<'a> {
    /// ```
    /// use falgen::logging::SensitiveApiKey;
    ///
    /// let key = "4f1c2a9e-1111-2222-3333-444455556666:abcdef0123";
    /// assert_eq!(SensitiveApiKey::new(key).to_string(), "4f1c2a9e***");
    /// ```
    pub fn new(key: &'a str) -> Self {
        Self { inner: key }
    }
}

impl<'a> fmt::Display for SensitiveApiKey<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visible_len = 8;
        match self.inner.get(..visible_len) {
            Some(prefix) if self.inner.len() > visible_len => write!(f, "{}***", prefix),
            _ => write!(f, "***"),
        }
    }
}
