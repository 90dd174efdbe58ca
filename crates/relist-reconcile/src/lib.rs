//! Reconciliation pipeline for relist.
//!
//! One [`Reconciler`] owns the ordered list of one owning context (a team's
//! events, an event's guests, the feed). Each reconciliation awaits a fetch,
//! merges the result into a private copy of the list, re-interleaves
//! fillers, diffs against the last published snapshot, then swaps the copy
//! in and publishes the diff. Superseded and cancelled results are dropped
//! without touching the list.
//!
//! [`ContextRegistry`] keeps one reconciler per context, derives pagination
//! cursors, and evicts contexts that no longer exist upstream.
//!
//! # Key Types
//!
//! - [`Reconciler`] -- Generation-checked fetch/merge/diff/publish for one context
//! - [`ContextRegistry`] -- Reconcilers keyed by owning context
//! - [`FetchProvider`] -- Async source of entity snapshots
//! - [`ErrorClassifier`] -- Splits fetch failures into transient and invalid-context
//! - [`RelistConfig`] -- TOML configuration for reconciliation and fillers

pub mod config;
pub mod error;
pub mod fetch;
pub mod reconciler;
pub mod registry;

pub use config::{ReconcileConfig, RelistConfig};
pub use error::{ConfigError, FetchError, ReconcileError, ReconcileResult};
pub use fetch::{Cursor, DefaultClassifier, ErrorClassifier, FailureClass, FetchProvider};
pub use reconciler::{DiscardReason, Publication, ReconcileOutcome, ReconcilePhase, Reconciler};
pub use registry::ContextRegistry;
