//! Ordering model applied to every reconciled list.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::identity::Identifiable;

/// How the rows of one owning context are ordered.
///
/// Timed orders compare by [`Identifiable::created_at`]; rows without a
/// timestamp sort after every timed row so the relation stays total. Ties
/// are never broken here: callers sort stably, so rows that compare equal
/// keep their pre-merge relative order (first seen wins).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListOrder {
    /// Descending creation time (feeds, events, media).
    #[default]
    NewestFirst,
    /// Ascending creation time.
    OldestFirst,
    /// Keep insertion order; every pair compares equal.
    Insertion,
}

impl ListOrder {
    pub fn compare<T: Identifiable + ?Sized>(&self, a: &T, b: &T) -> Ordering {
        let (a, b) = (a.created_at(), b.created_at());
        match self {
            Self::Insertion => Ordering::Equal,
            Self::NewestFirst | Self::OldestFirst => match (a, b) {
                (Some(a), Some(b)) if *self == Self::NewestFirst => b.cmp(&a),
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        }
    }

    /// Stable sort of `items` under this order.
    pub fn sort<T: Identifiable>(&self, items: &mut [T]) {
        if *self != Self::Insertion {
            items.sort_by(|a, b| self.compare(a, b));
        }
    }

    /// Whether every adjacent pair satisfies `compare(a, b) <= 0`.
    pub fn is_sorted<T: Identifiable>(&self, items: &[T]) -> bool {
        items
            .windows(2)
            .all(|w| self.compare(&w[0], &w[1]) != Ordering::Greater)
    }
}
