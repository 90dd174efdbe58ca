use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identity::{EntityId, Identifiable};

/// A schema-less domain record.
///
/// Carries the identity fields every list needs plus an open attribute map,
/// which is enough to stand in for events, teams, guests, or media when the
/// concrete model type is not at hand (tooling, fixtures).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<EntityId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            created_at: None,
            parent: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn created(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    pub fn owned_by(mut self, parent: impl Into<EntityId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

impl Identifiable for Record {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn parent_id(&self) -> Option<&EntityId> {
        self.parent.as_ref()
    }

    fn update_from(&mut self, fresh: Self) {
        self.created_at = fresh.created_at;
        self.parent = fresh.parent;
        self.attributes = fresh.attributes;
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn builder_sets_fields() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let record = Record::new("event-1")
            .created(at)
            .owned_by("team-1")
            .with("name", "Practice");

        assert_eq!(record.id().as_str(), "event-1");
        assert_eq!(record.created_at(), Some(at));
        assert_eq!(record.parent_id().map(EntityId::as_str), Some("team-1"));
        assert_eq!(record.attributes["name"], json!("Practice"));
    }

    #[test]
    fn update_from_keeps_id() {
        let mut stale = Record::new("a").with("v", 1);
        stale.update_from(Record::new("a").with("v", 2));
        assert_eq!(stale.id.as_str(), "a");
        assert_eq!(stale.attributes["v"], json!(2));
    }

    #[test]
    fn sparse_json_parses() {
        let record: Record = serde_json::from_value(json!({ "id": "m-1" })).unwrap();
        assert_eq!(record, Record::new("m-1"));
        assert_eq!(serde_json::to_value(&record).unwrap(), json!({ "id": "m-1" }));
    }
}
