use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Gadget error: {0}")]
    Gadget(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Media error: {0}")]
    Media(String),

    #[error("WebRTC error: {0}")]
    WebRtc(String),
}

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, AppError>;
