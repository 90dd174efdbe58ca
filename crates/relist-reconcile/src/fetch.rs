use async_trait::async_trait;
use chrono::{DateTime, Utc};

use relist_merge::MergeMode;
use relist_types::{Identifiable, ListItem};

use crate::error::FetchError;

/// Which slice of a context's data a fetch asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cursor {
    /// The full current state; authoritative for the context.
    Latest,
    /// One page of rows older than the given instant.
    Before(DateTime<Utc>),
}

impl Cursor {
    /// Deletion policy implied by the cursor.
    pub fn merge_mode(&self) -> MergeMode {
        match self {
            Self::Latest => MergeMode::Authoritative,
            Self::Before(_) => MergeMode::Partial,
        }
    }

    /// The cursor that pages backward from the oldest entity held in
    /// `items`, or [`Cursor::Latest`] when nothing timed is held.
    pub fn continuing<T: Identifiable>(items: &[ListItem<T>]) -> Self {
        items
            .iter()
            .filter_map(ListItem::as_entity)
            .filter_map(|entity| entity.created_at())
            .min()
            .map_or(Self::Latest, Self::Before)
    }
}

/// Source of entity snapshots for an owning context: a REST client, a cache,
/// or an on-device store.
#[async_trait]
pub trait FetchProvider<C, T>: Send + Sync {
    async fn fetch(&self, context: &C, cursor: Cursor) -> Result<Vec<T>, FetchError>;
}

/// How a fetch failure should be surfaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureClass {
    /// The owning context itself is gone upstream.
    InvalidContext,
    /// Anything else; shown to the user, list untouched.
    Transient,
}

pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, error: &FetchError) -> FailureClass;
}

/// Treats "not found" and "invalid parent" responses as a vanished context.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultClassifier;

impl ErrorClassifier for DefaultClassifier {
    fn classify(&self, error: &FetchError) -> FailureClass {
        match error {
            FetchError::NotFound(_) | FetchError::InvalidParent(_) => FailureClass::InvalidContext,
            FetchError::Transport(_) | FetchError::Timeout | FetchError::Server { .. } => {
                FailureClass::Transient
            }
        }
    }
}
