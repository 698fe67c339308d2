use std::fmt;

use crate::logging::SensitiveApiKey;

/// Source of the API key used for pricing calls.
///
/// Injected into the pricing client instead of reading a process-wide key,
/// so tests and callers decide where credentials come from.
pub trait CredentialProvider: Send + Sync {
    fn api_key(&self) -> Option<String>;
}

/// A key supplied directly, e.g. from a CLI flag.
pub struct StaticCredential {
    key: String,
}

impl StaticCredential {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl CredentialProvider for StaticCredential {
    fn api_key(&self) -> Option<String> {
        Some(self.key.clone())
    }
}

impl fmt::Debug for StaticCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredential")
            .field("key", &SensitiveApiKey::new(&self.key).to_string())
            .finish()
    }
}

/// Reads the key from an environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialProvider for EnvCredential {
    fn api_key(&self) -> Option<String> {
        std::env::var(&self.var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// No credentials; every authenticated call fails and estimation degrades.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredential;

impl CredentialProvider for NoCredential {
    fn api_key(&self) -> Option<String> {
        None
    }
}
