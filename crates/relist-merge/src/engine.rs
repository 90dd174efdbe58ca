use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use relist_types::{EntityId, Identifiable, ListOrder};

/// How a fetched snapshot relates to the held list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// The snapshot is the full, current state of the context. Held rows
    /// absent from it are removed.
    Authoritative,
    /// The snapshot is one page (e.g. "before date X"). Nothing is removed.
    #[default]
    Partial,
    /// Every fetched row has been consumed upstream and leaves the list.
    RemoveFetched,
    /// Fetched rows replace their held copies and are re-placed by the
    /// ordering model rather than updated where they stand.
    Reappend,
}

/// Counts describing what a merge did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Rows that were not held before.
    pub inserted: usize,
    /// Held rows matched by a fetched row.
    pub updated: usize,
    /// Held rows dropped, including duplicates.
    pub removed: usize,
}

impl MergeReport {
    /// Returns `true` if the merge neither inserted nor removed anything.
    pub fn is_structurally_unchanged(&self) -> bool {
        self.inserted == 0 && self.removed == 0
    }
}

/// Merge `fresh` into `stale` in place.
///
/// The `stale` vector stays the same container: rows are updated, removed,
/// or appended, then stably re-sorted under `order`, so rows that compare
/// equal keep their pre-merge relative order and new rows land after
/// existing ties. Duplicate identifiers are collapsed (first position, last
/// value), so the output never carries the same id twice.
pub fn merge<T: Identifiable>(
    stale: &mut Vec<T>,
    fresh: Vec<T>,
    mode: MergeMode,
    order: ListOrder,
) -> MergeReport {
    let mut report = MergeReport {
        removed: dedupe(stale),
        ..MergeReport::default()
    };

    match mode {
        MergeMode::Authoritative | MergeMode::Partial => upsert(stale, fresh, mode, &mut report),
        MergeMode::RemoveFetched => {
            let fetched: HashSet<EntityId> = fresh.iter().map(|f| f.id().clone()).collect();
            let before = stale.len();
            stale.retain(|s| !fetched.contains(s.id()));
            report.removed += before - stale.len();
        }
        MergeMode::Reappend => {
            let mut fresh = fresh;
            dedupe_last_wins(&mut fresh);
            let fetched: HashSet<&EntityId> = fresh.iter().map(|f| f.id()).collect();
            let before = stale.len();
            stale.retain(|s| !fetched.contains(s.id()));
            report.updated = before - stale.len();
            report.inserted = fresh.len() - report.updated;
            stale.extend(fresh);
        }
    }

    order.sort(stale);

    debug!(
        ?mode,
        inserted = report.inserted,
        updated = report.updated,
        removed = report.removed,
        len = stale.len(),
        "list merged"
    );
    report
}

fn upsert<T: Identifiable>(
    stale: &mut Vec<T>,
    fresh: Vec<T>,
    mode: MergeMode,
    report: &mut MergeReport,
) {
    let index: HashMap<EntityId, usize> = stale
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id().clone(), i))
        .collect();
    let mut matched = vec![false; stale.len()];
    let mut additions: Vec<T> = Vec::new();
    let mut added_at: HashMap<EntityId, usize> = HashMap::new();

    for item in fresh {
        if let Some(&i) = index.get(item.id()) {
            stale[i].update_from(item);
            if !matched[i] {
                matched[i] = true;
                report.updated += 1;
            }
        } else if let Some(&j) = added_at.get(item.id()) {
            additions[j].update_from(item);
        } else {
            added_at.insert(item.id().clone(), additions.len());
            additions.push(item);
        }
    }

    if mode == MergeMode::Authoritative {
        let before = stale.len();
        // `retain` visits every element exactly once, in order.
        let mut keep = matched.into_iter();
        stale.retain(|_| keep.next().unwrap_or(false));
        report.removed += before - stale.len();
    }

    report.inserted = additions.len();
    stale.extend(additions);
}

/// Drop repeated identifiers, keeping the first occurrence. Returns the
/// number of rows dropped.
pub fn dedupe<T: Identifiable>(items: &mut Vec<T>) -> usize {
    let mut seen = HashSet::new();
    let before = items.len();
    items.retain(|item| seen.insert(item.id().clone()));
    before - items.len()
}

/// Collapse repeated identifiers onto their first position, keeping the
/// value of the last occurrence.
fn dedupe_last_wins<T: Identifiable>(items: &mut Vec<T>) {
    let mut collapsed: Vec<T> = Vec::with_capacity(items.len());
    let mut at: HashMap<EntityId, usize> = HashMap::new();
    for item in items.drain(..) {
        match at.get(item.id()) {
            Some(&i) => collapsed[i].update_from(item),
            None => {
                at.insert(item.id().clone(), collapsed.len());
                collapsed.push(item);
            }
        }
    }
    *items = collapsed;
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use relist_types::{Filler, FillerKind, ListItem, Record};

    use super::*;

    fn rec(id: &str, secs: i64) -> Record {
        Record::new(id).created(Utc.timestamp_opt(secs, 0).unwrap())
    }

    fn ids<T: Identifiable>(items: &[T]) -> Vec<&str> {
        items.iter().map(|i| i.id().as_str()).collect()
    }

    #[test]
    fn empty_stale_yields_sorted_fresh() {
        let mut list = Vec::new();
        let report = merge(
            &mut list,
            vec![rec("a", 1), rec("c", 3), rec("b", 2)],
            MergeMode::Partial,
            ListOrder::NewestFirst,
        );
        assert_eq!(ids(&list), ["c", "b", "a"]);
        assert_eq!(report.inserted, 3);
        assert_eq!(report.updated, 0);
    }

    #[test]
    fn empty_fresh_partial_keeps_everything() {
        let mut list = vec![rec("b", 2), rec("a", 1)];
        let report = merge(&mut list, Vec::new(), MergeMode::Partial, ListOrder::NewestFirst);
        assert_eq!(ids(&list), ["b", "a"]);
        assert!(report.is_structurally_unchanged());
    }

    #[test]
    fn empty_fresh_authoritative_clears() {
        let mut list = vec![rec("b", 2), rec("a", 1)];
        let report = merge(
            &mut list,
            Vec::new(),
            MergeMode::Authoritative,
            ListOrder::NewestFirst,
        );
        assert!(list.is_empty());
        assert_eq!(report.removed, 2);
    }

    #[test]
    fn matched_rows_are_updated_in_place() {
        let mut list = vec![rec("b", 2).with("name", "old"), rec("a", 1)];
        let report = merge(
            &mut list,
            vec![rec("b", 2).with("name", "new")],
            MergeMode::Partial,
            ListOrder::NewestFirst,
        );
        assert_eq!(report.updated, 1);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].attributes["name"], "new");
    }

    #[test]
    fn partial_fetch_never_deletes_unfetched_rows() {
        let mut list: Vec<Record> = (1..=5).map(|d| rec(&format!("e{d}"), d)).collect();
        ListOrder::NewestFirst.sort(&mut list);

        let report = merge(
            &mut list,
            vec![rec("e3", 3), rec("e4", 4)],
            MergeMode::Partial,
            ListOrder::NewestFirst,
        );

        assert_eq!(ids(&list), ["e5", "e4", "e3", "e2", "e1"]);
        assert_eq!(report.removed, 0);
        assert_eq!(report.updated, 2);
    }

    #[test]
    fn authoritative_fetch_drops_missing_rows() {
        let mut list: Vec<Record> = (1..=5).map(|d| rec(&format!("e{d}"), d)).collect();
        let report = merge(
            &mut list,
            vec![rec("e3", 3), rec("e6", 6)],
            MergeMode::Authoritative,
            ListOrder::NewestFirst,
        );
        assert_eq!(ids(&list), ["e6", "e3"]);
        assert_eq!(report.removed, 4);
        assert_eq!(report.inserted, 1);
    }

    #[test]
    fn ties_keep_held_rows_before_new_ones() {
        let mut list = vec![rec("held", 5)];
        merge(
            &mut list,
            vec![rec("new", 5)],
            MergeMode::Partial,
            ListOrder::NewestFirst,
        );
        assert_eq!(ids(&list), ["held", "new"]);
    }

    #[test]
    fn insertion_order_appends_new_rows() {
        let mut list = vec![Record::new("x"), Record::new("y")];
        merge(
            &mut list,
            vec![Record::new("z"), Record::new("x")],
            MergeMode::Partial,
            ListOrder::Insertion,
        );
        assert_eq!(ids(&list), ["x", "y", "z"]);
    }

    #[test]
    fn duplicate_fresh_rows_collapse_last_value_wins() {
        let mut list = Vec::new();
        merge(
            &mut list,
            vec![rec("a", 1).with("v", 1), rec("a", 1).with("v", 2)],
            MergeMode::Partial,
            ListOrder::NewestFirst,
        );
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].attributes["v"], 2);
    }

    #[test]
    fn duplicate_stale_rows_are_dropped() {
        let mut list = vec![rec("a", 1), rec("a", 1), rec("b", 2)];
        let report = merge(&mut list, Vec::new(), MergeMode::Partial, ListOrder::NewestFirst);
        assert_eq!(ids(&list), ["b", "a"]);
        assert_eq!(report.removed, 1);
    }

    #[test]
    fn remove_fetched_drops_processed_rows() {
        let mut list = vec![rec("c", 3), rec("b", 2), rec("a", 1)];
        let report = merge(
            &mut list,
            vec![rec("b", 2)],
            MergeMode::RemoveFetched,
            ListOrder::NewestFirst,
        );
        assert_eq!(ids(&list), ["c", "a"]);
        assert_eq!(report.removed, 1);
    }

    #[test]
    fn reappend_moves_replaced_row_to_the_end() {
        let mut list = vec![Record::new("guest-1"), Record::new("guest-2")];
        let report = merge(
            &mut list,
            vec![Record::new("guest-1").with("attending", true)],
            MergeMode::Reappend,
            ListOrder::Insertion,
        );
        assert_eq!(ids(&list), ["guest-2", "guest-1"]);
        assert_eq!(list[1].attributes["attending"], true);
        assert_eq!(report.updated, 1);
        assert_eq!(report.inserted, 0);
    }

    #[test]
    fn merges_list_items_with_fillers_kept() {
        let mut list: Vec<ListItem<Record>> = vec![
            ListItem::Entity(rec("b", 2)),
            ListItem::Filler(Filler::new(FillerKind::Install, "ad")),
        ];
        merge(
            &mut list,
            vec![ListItem::Entity(rec("c", 3))],
            MergeMode::Partial,
            ListOrder::NewestFirst,
        );
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].id().as_str(), "c");
        assert!(list[2].is_filler());
    }

    #[test]
    fn merge_keeps_the_held_allocation() {
        let mut list = Vec::with_capacity(16);
        list.extend([rec("c", 3), rec("b", 2), rec("a", 1)]);
        let (ptr, capacity) = (list.as_ptr(), list.capacity());

        for mode in [MergeMode::Partial, MergeMode::Authoritative, MergeMode::Reappend] {
            merge(
                &mut list,
                vec![rec("d", 4), rec("b", 2).with("v", 1)],
                mode,
                ListOrder::NewestFirst,
            );
            assert_eq!(list.as_ptr(), ptr);
            assert_eq!(list.capacity(), capacity);
        }
        assert_eq!(ids(&list), ["d", "b"]);
    }

    fn record_strategy() -> impl Strategy<Value = Record> {
        (0u8..12, proptest::option::of(0i64..40), 0u8..4).prop_map(|(id, secs, v)| {
            let record = Record::new(format!("r{id}")).with("v", v);
            match secs {
                Some(s) => record.created(Utc.timestamp_opt(s, 0).unwrap()),
                None => record,
            }
        })
    }

    fn mode_strategy() -> impl Strategy<Value = MergeMode> {
        prop_oneof![
            Just(MergeMode::Authoritative),
            Just(MergeMode::Partial),
            Just(MergeMode::RemoveFetched),
            Just(MergeMode::Reappend),
        ]
    }

    /// Modes that leave fetched rows in the list.
    fn keeping_mode_strategy() -> impl Strategy<Value = MergeMode> {
        prop_oneof![
            Just(MergeMode::Authoritative),
            Just(MergeMode::Partial),
            Just(MergeMode::Reappend),
        ]
    }

    fn order_strategy() -> impl Strategy<Value = ListOrder> {
        prop_oneof![
            Just(ListOrder::NewestFirst),
            Just(ListOrder::OldestFirst),
            Just(ListOrder::Insertion),
        ]
    }

    proptest! {
        #[test]
        fn merge_is_idempotent(
            stale in proptest::collection::vec(record_strategy(), 0..20),
            fresh in proptest::collection::vec(record_strategy(), 0..20),
            mode in mode_strategy(),
            order in order_strategy(),
        ) {
            let mut once = stale;
            merge(&mut once, fresh.clone(), mode, order);
            let mut twice = once.clone();
            let report = merge(&mut twice, fresh, mode, order);
            prop_assert_eq!(&twice, &once);
            prop_assert!(report.is_structurally_unchanged());
        }

        #[test]
        fn merged_rows_carry_fresh_values(
            stale in proptest::collection::vec(record_strategy(), 0..20),
            fresh in proptest::collection::vec(record_strategy(), 0..20),
            mode in keeping_mode_strategy(),
        ) {
            let mut list = stale;
            merge(&mut list, fresh.clone(), mode, ListOrder::NewestFirst);

            let mut latest: HashMap<EntityId, Record> = HashMap::new();
            for record in fresh {
                latest.insert(record.id.clone(), record);
            }
            for (id, expected) in &latest {
                let found: Vec<&Record> = list.iter().filter(|r| &r.id == id).collect();
                prop_assert_eq!(found.len(), 1);
                prop_assert_eq!(found[0], expected);
            }
        }

        #[test]
        fn merge_output_is_ordered_and_unique(
            stale in proptest::collection::vec(record_strategy(), 0..20),
            fresh in proptest::collection::vec(record_strategy(), 0..20),
            mode in mode_strategy(),
            order in order_strategy(),
        ) {
            let mut list = stale;
            merge(&mut list, fresh, mode, order);
            prop_assert!(order.is_sorted(&list));
            let unique: HashSet<&EntityId> = list.iter().map(|r| &r.id).collect();
            prop_assert_eq!(unique.len(), list.len());
        }
    }
}
