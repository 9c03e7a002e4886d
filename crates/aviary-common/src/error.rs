use thiserror::Error;

#[derive(Error, Debug)]
pub enum AviaryError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<std::net::AddrParseError> for AviaryError {
    fn from(err: std::net::AddrParseError) -> Self {
        AviaryError::InvalidConfig(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AviaryError>;
