//! Diff engine for relist.
//!
//! Compares two snapshots of a reconciled list and produces the positional
//! edit script a renderer applies to go from one to the other.
//!
//! # Key Types
//!
//! - [`ListDiff`] -- Classified index pairs plus the ordered [`EditOp`] script
//! - [`Pair`] / [`PairKind`] -- How a surviving row moved or changed
//! - [`DiffError`] -- Precondition violations (duplicate identifiers)

pub mod error;
pub mod list_diff;

pub use error::{DiffError, DiffResult, Side};
pub use list_diff::{diff, try_diff, EditOp, ListDiff, Pair, PairKind};
