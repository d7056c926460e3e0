use thiserror::Error;

pub type Result<T> = std::result::Result<T, MetadataError>;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("comment marker not found")]
    MarkerNotFound,

    #[error("block comment is not terminated")]
    UnterminatedBlock,

    #[error("embedded payload is empty")]
    EmptyPayload,

    #[error("Base64 error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("VName lookup failed for {0:?}")]
    Lookup(String),

    #[error("Config error: {0}")]
    ConfigError(#[from] toml::de::Error),
}
