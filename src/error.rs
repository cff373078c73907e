use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Invalid matrix shape: {0}")]
    Shape(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Failed to parse input: {0}")]
    Parse(String),

    #[error("Batch aborted: {0}")]
    Batch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DetectError>;
