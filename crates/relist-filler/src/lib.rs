//! Filler rotation for relist.
//!
//! Holds the process-wide queue of filler (ad) rows and interleaves them into
//! reconciled lists at a fixed stride, rotating the queue so every filler
//! gets round-robin exposure. The rotation is an explicitly constructed
//! service shared by handle, never ambient global state.

pub mod config;
pub mod error;
pub mod rotation;
pub mod source;

pub use config::FillerConfig;
pub use error::{FillerError, FillerResult};
pub use rotation::{FillerRotation, InterleaveReport};
pub use source::{FillerSource, StaticFillerSource};
