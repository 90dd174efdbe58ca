//! Renderable row kinds.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{EntityId, Identifiable};

/// Kind of filler (ad) row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillerKind {
    /// Sponsored content card.
    Content,
    /// App-install card.
    Install,
}

impl fmt::Display for FillerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Content => f.write_str("content"),
            Self::Install => f.write_str("install"),
        }
    }
}

/// A placeholder row not owned by any context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filler {
    pub id: EntityId,
    pub kind: FillerKind,
    pub headline: String,
}

impl Filler {
    pub fn new(kind: FillerKind, headline: impl Into<String>) -> Self {
        Self {
            id: EntityId::generate(),
            kind,
            headline: headline.into(),
        }
    }
}

/// A static section title inside a list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionHeader {
    pub id: EntityId,
    pub title: String,
}

impl SectionHeader {
    pub fn new(id: impl Into<EntityId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// One row of a renderable list.
///
/// Each kind carries only what it needs; algorithms reach the shared
/// capability through [`Identifiable`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ListItem<T> {
    Entity(T),
    Filler(Filler),
    Header(SectionHeader),
}

impl<T> ListItem<T> {
    pub fn as_entity(&self) -> Option<&T> {
        match self {
            Self::Entity(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_entity(self) -> Option<T> {
        match self {
            Self::Entity(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_filler(&self) -> Option<&Filler> {
        match self {
            Self::Filler(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_filler(&self) -> bool {
        matches!(self, Self::Filler(_))
    }
}

impl<T> From<Filler> for ListItem<T> {
    fn from(filler: Filler) -> Self {
        Self::Filler(filler)
    }
}

impl<T> From<SectionHeader> for ListItem<T> {
    fn from(header: SectionHeader) -> Self {
        Self::Header(header)
    }
}

impl<T: Identifiable> Identifiable for ListItem<T> {
    fn id(&self) -> &EntityId {
        match self {
            Self::Entity(e) => e.id(),
            Self::Filler(f) => &f.id,
            Self::Header(h) => &h.id,
        }
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Entity(e) => e.created_at(),
            _ => None,
        }
    }

    fn parent_id(&self) -> Option<&EntityId> {
        match self {
            Self::Entity(e) => e.parent_id(),
            _ => None,
        }
    }

    fn is_transient(&self) -> bool {
        match self {
            Self::Entity(e) => e.is_transient(),
            Self::Filler(_) => true,
            Self::Header(_) => false,
        }
    }

    fn update_from(&mut self, fresh: Self) {
        match (self, fresh) {
            (Self::Entity(stale), Self::Entity(fresh)) => stale.update_from(fresh),
            (slot, fresh) => *slot = fresh,
        }
    }
}
