use thiserror::Error;

#[derive(Error, Debug)]
pub enum KycError {
    #[error("Image loading error: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Metadata extraction error: {0}")]
    Metadata(String),

    #[error("Oracle call failed: {0}")]
    Oracle(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),
}

pub type Result<T> = std::result::Result<T, KycError>;
