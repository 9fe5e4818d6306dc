use thiserror::Error;

/// Result type for pack building operations
pub type Result<T> = std::result::Result<T, PackError>;

/// Errors that can occur while loading pack configs or writing packs
#[derive(Error, Debug)]
pub enum PackError {
    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Pack config could not be parsed as TOML
    #[error("Failed to parse pack config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Pack config parsed but is semantically invalid
    #[error("Invalid pack config: {0}")]
    InvalidConfig(String),

    /// An extraction pattern did not compile
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PackError {
    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
