use std::io;

use thiserror::Error;

/// Failure reported by a fetch provider (network, cache, or persistence).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid parent reference: {0}")]
    InvalidParent(String),
}

/// Errors surfaced by a reconciliation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A fetch failure to show to the user. The held list is unchanged.
    #[error("fetch failed: {0}")]
    Fetch(#[source] FetchError),

    /// The owning context no longer exists upstream; the caller should evict
    /// it from its own collection.
    #[error("context {context} no longer exists upstream")]
    InvalidContext {
        context: String,
        #[source]
        source: FetchError,
    },

    #[error("reconciler for {0} is closed")]
    Closed(String),

    #[error("diff worker failed: {0}")]
    Worker(String),
}

impl ReconcileError {
    pub fn is_invalid_context(&self) -> bool {
        matches!(self, Self::InvalidContext { .. })
    }
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Errors loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
