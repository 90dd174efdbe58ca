//! Merge engine for relist.
//!
//! Folds a freshly fetched snapshot into a held, ordered list in place:
//! matched rows are updated where they stand, new rows are inserted, and
//! rows missing from the snapshot are dropped only when the snapshot is
//! authoritative for its context. The result is unique by identifier and
//! sorted by the context's [`ListOrder`](relist_types::ListOrder), ready for
//! diffing.

pub mod engine;

pub use engine::{dedupe, merge, MergeMode, MergeReport};
