use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Stable identifier of a domain record.
///
/// Server records are usually keyed by UUID strings, but any non-empty string
/// is accepted. Two values with equal `EntityId`s are the same logical record
/// no matter how their other fields differ. Serialized as a bare string;
/// deserializing an empty one fails.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    /// Wrap an existing identifier, rejecting the empty string.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.is_empty() {
            return Err(TypeError::EmptyId);
        }
        Ok(Self(id))
    }

    /// Generate a fresh time-ordered identifier (UUID v7).
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Build an identifier from a UUID.
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid.to_string())
    }

    /// Interpret the identifier as a UUID.
    pub fn to_uuid(&self) -> Result<uuid::Uuid, TypeError> {
        uuid::Uuid::parse_str(&self.0).map_err(|e| TypeError::InvalidUuid(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short representation (first 8 characters).
    pub fn short_id(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl TryFrom<String> for EntityId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

// Unchecked, for literals and ids already known to be valid.
impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Anything that can live in a reconciled list.
///
/// Only the identifier is mandatory. The merge, diff, and interleave
/// algorithms never look further than this trait, so every entity kind
/// (events, teams, guests, media, feed items) plugs in without a shared base
/// representation.
pub trait Identifiable {
    /// The stable identifier.
    fn id(&self) -> &EntityId;

    /// Creation time used by the timed [`ListOrder`]s.
    fn created_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// The owning/parent record, if any.
    fn parent_id(&self) -> Option<&EntityId> {
        None
    }

    /// Rows re-inserted fresh on every cycle. The diff computer never pairs
    /// them across snapshots.
    fn is_transient(&self) -> bool {
        false
    }

    /// Identity equality, as opposed to structural `PartialEq`.
    fn same_identity(&self, other: &Self) -> bool
    where
        Self: Sized,
    {
        self.id() == other.id()
    }

    /// Absorb the fields of a fresher copy of the same record in place.
    fn update_from(&mut self, fresh: Self)
    where
        Self: Sized,
    {
        *self = fresh;
    }
}

/// `true` iff both values carry the same identifier.
pub fn same_identity<A, B>(a: &A, b: &B) -> bool
where
    A: Identifiable + ?Sized,
    B: Identifiable + ?Sized,
{
    a.id() == b.id()
}
