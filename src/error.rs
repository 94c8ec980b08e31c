use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForensicsError {
    #[error("Could not load image: {0}")]
    DecodeFailure(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No document boundary found")]
    NoContentFound,

    #[error("Metadata extraction error: {0}")]
    MetadataReadFailure(String),

    #[error("Edge computation failed: {0}")]
    EdgeComputeFailure(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Report serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("OCR error: {0}")]
    Ocr(String),
}

impl From<exif::Error> for ForensicsError {
    fn from(err: exif::Error) -> Self {
        ForensicsError::MetadataReadFailure(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ForensicsError>;
