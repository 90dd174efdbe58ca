//! Foundation types for relist.
//!
//! Defines how list rows are identified, how they are ordered, and the closed
//! set of row kinds a renderable list may hold. Every other relist crate
//! depends on `relist-types`.
//!
//! # Key Types
//!
//! - [`EntityId`] -- Opaque, stable identifier of a domain record
//! - [`Identifiable`] -- Capability shared by everything that lives in a list
//! - [`ListOrder`] -- Ordering model applied after every merge
//! - [`ListItem`] -- Tagged row variant: entity, filler, or section header
//! - [`Record`] -- Generic domain record used by tooling and tests

pub mod error;
pub mod identity;
pub mod item;
pub mod ordering;
pub mod record;

pub use error::TypeError;
pub use identity::{same_identity, EntityId, Identifiable};
pub use item::{Filler, FillerKind, ListItem, SectionHeader};
pub use ordering::ListOrder;
pub use record::Record;
