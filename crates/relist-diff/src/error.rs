//! Error types for the diff crate.

use std::fmt;

use relist_types::EntityId;

/// Which snapshot a problem was found in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    Before,
    After,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => f.write_str("before"),
            Self::After => f.write_str("after"),
        }
    }
}

/// Errors that can occur during diff operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DiffError {
    /// The same identifier occurs twice in one snapshot. Snapshots handed to
    /// the diff computer must come out of the merge engine, which never
    /// produces duplicates.
    #[error("duplicate identifier {id} in {side} snapshot")]
    DuplicateIdentifier { side: Side, id: EntityId },
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
