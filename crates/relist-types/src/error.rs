use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("empty entity identifier")]
    EmptyId,

    #[error("invalid uuid: {0}")]
    InvalidUuid(String),
}
