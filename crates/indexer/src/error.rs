use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid project path: {0}")]
    InvalidPath(String),

    #[error("File listing failed: {0}")]
    ListingFailed(String),

    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(#[from] globset::Error),
}
