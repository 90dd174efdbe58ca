use thiserror::Error;

#[derive(Debug, Error)]
pub enum FillerError {
    #[error("filler source failed: {0}")]
    Source(String),
}

pub type FillerResult<T> = Result<T, FillerError>;
