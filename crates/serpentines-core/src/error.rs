use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrailError {
    #[error("invalid config `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("failed to read config {}: {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML config: {0}")]
    ConfigToml(#[from] toml::de::Error),

    #[error("failed to write TOML config: {0}")]
    ConfigTomlWrite(#[from] toml::ser::Error),

    #[error("invalid JSON config: {0}")]
    ConfigJson(#[from] serde_json::Error),

    #[error("unsupported config format `{0}` (expected .toml or .json)")]
    UnsupportedFormat(String),

    #[error("sink rejected frame: {0}")]
    Sink(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl TrailError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TrailError>;
