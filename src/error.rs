use std::path::PathBuf;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Failures of the atomic persistence primitive.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures talking to the pricing API. These never escape the estimation
/// engine; they only select the next trust tier.
#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("no API key available")]
    MissingCredential,

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("failed to parse pricing response: {0}")]
    Parse(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("failed to persist history: {0}")]
    Write(#[from] StoreError),

    #[error("refusing to record generation {id}: invalid cost {cost}")]
    InvalidCost { id: String, cost: f64 },

    #[error("failed to back up corrupt history {path}: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("no config directory available; set storage.dir")]
    NoConfigDir,
}
