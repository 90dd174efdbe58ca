//! Snapshot diff: classify rows by identity, then derive an edit script.
//!
//! Rows are matched by identifier. The longest common subsequence of the two
//! id sequences (computed by `similar`) gives the *anchors*: rows that keep
//! their relative order. Rows present on both sides but off the LCS are
//! *moved*. Whether a matched row *changed* is decided by structural
//! equality, so a row with the same id and edited fields is reported as a
//! change at its position, not as unchanged.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use similar::{capture_diff_slices, Algorithm, DiffTag};
use tracing::error;

use relist_types::{EntityId, Identifiable};

use crate::error::{DiffError, DiffResult, Side};

/// Classification of a row present in both snapshots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairKind {
    /// Same relative position, equal content.
    Unchanged,
    /// Same relative position, different content.
    Changed,
    /// Relative position changed; `changed` tells whether content did too.
    Moved { changed: bool },
}

/// A row matched across snapshots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pair {
    pub old_index: usize,
    pub new_index: usize,
    pub kind: PairKind,
}

impl Pair {
    fn content_changed(&self) -> bool {
        matches!(
            self.kind,
            PairKind::Changed | PairKind::Moved { changed: true }
        )
    }
}

/// One positional operation. Positions refer to the list as it stands after
/// every preceding operation has been applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditOp {
    /// Remove the row at `at`.
    Remove { at: usize },
    /// Insert `after[new_index]` at `at`.
    Insert { at: usize, new_index: usize },
    /// Take the row at `from` out and re-insert it at `to`.
    Move { from: usize, to: usize },
    /// Replace the row at `at` with `after[new_index]`.
    Change { at: usize, new_index: usize },
}

/// The edit script between two snapshots of a list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListDiff {
    /// Length of the `before` snapshot.
    pub old_len: usize,
    /// Length of the `after` snapshot.
    pub new_len: usize,
    /// Rows present in both snapshots, ordered by `new_index`.
    pub pairs: Vec<Pair>,
    /// `before` indices with no counterpart, ascending.
    pub removed: Vec<usize>,
    /// `after` indices with no counterpart, ascending.
    pub inserted: Vec<usize>,
    /// Operations to apply, in order.
    pub ops: Vec<EditOp>,
}

impl ListDiff {
    /// A script that drops every old row and inserts every new one.
    pub fn replace_all(old_len: usize, new_len: usize) -> Self {
        let ops = (0..old_len)
            .rev()
            .map(|at| EditOp::Remove { at })
            .chain((0..new_len).map(|i| EditOp::Insert { at: i, new_index: i }))
            .collect();
        Self {
            old_len,
            new_len,
            pairs: Vec::new(),
            removed: (0..old_len).collect(),
            inserted: (0..new_len).collect(),
            ops,
        }
    }

    /// Returns `true` if the snapshots are identical.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of operations in the script.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn insertions(&self) -> usize {
        self.inserted.len()
    }

    pub fn removals(&self) -> usize {
        self.removed.len()
    }

    /// Number of rows whose relative position changed.
    pub fn moves(&self) -> usize {
        self.pairs
            .iter()
            .filter(|p| matches!(p.kind, PairKind::Moved { .. }))
            .count()
    }

    /// Number of matched rows whose content changed.
    pub fn changes(&self) -> usize {
        self.pairs.iter().filter(|p| p.content_changed()).count()
    }

    /// Apply the script to `items` (a copy of the `before` snapshot), pulling
    /// inserted and changed rows from `after`.
    pub fn apply<T: Clone>(&self, items: &mut Vec<T>, after: &[T]) {
        for op in &self.ops {
            match *op {
                EditOp::Remove { at } => {
                    items.remove(at);
                }
                EditOp::Insert { at, new_index } => items.insert(at, after[new_index].clone()),
                EditOp::Move { from, to } => {
                    let row = items.remove(from);
                    items.insert(to, row);
                }
                EditOp::Change { at, new_index } => items[at] = after[new_index].clone(),
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Key<'a> {
    Id(&'a EntityId),
    Transient(Side, usize),
}

fn keys<T: Identifiable>(items: &[T], side: Side) -> DiffResult<Vec<Key<'_>>> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            if item.is_transient() {
                return Ok(Key::Transient(side, i));
            }
            if !seen.insert(item.id()) {
                return Err(DiffError::DuplicateIdentifier {
                    side,
                    id: item.id().clone(),
                });
            }
            Ok(Key::Id(item.id()))
        })
        .collect()
}

/// Diff two snapshots, failing if either carries a duplicate identifier.
pub fn try_diff<T>(before: &[T], after: &[T]) -> DiffResult<ListDiff>
where
    T: Identifiable + PartialEq,
{
    let old_keys = keys(before, Side::Before)?;
    let new_keys = keys(after, Side::After)?;

    let mut old_to_new: Vec<Option<usize>> = vec![None; before.len()];
    let mut new_to_old: Vec<Option<usize>> = vec![None; after.len()];
    let mut anchor = vec![false; after.len()];
    let mut loose_old: HashMap<&EntityId, usize> = HashMap::new();
    let mut loose_new: Vec<usize> = Vec::new();

    for op in capture_diff_slices(Algorithm::Lcs, &old_keys, &new_keys) {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        match tag {
            DiffTag::Equal => {
                for (o, n) in old_range.zip(new_range) {
                    old_to_new[o] = Some(n);
                    new_to_old[n] = Some(o);
                    anchor[n] = true;
                }
            }
            DiffTag::Delete | DiffTag::Insert | DiffTag::Replace => {
                for o in old_range {
                    if let Key::Id(id) = old_keys[o] {
                        loose_old.insert(id, o);
                    }
                }
                loose_new.extend(new_range);
            }
        }
    }

    // Rows that left the LCS but survive on both sides are moves.
    for n in loose_new {
        if let Key::Id(id) = new_keys[n] {
            if let Some(o) = loose_old.remove(id) {
                old_to_new[o] = Some(n);
                new_to_old[n] = Some(o);
            }
        }
    }

    let pairs: Vec<Pair> = new_to_old
        .iter()
        .enumerate()
        .filter_map(|(n, o)| {
            o.map(|o| {
                let changed = before[o] != after[n];
                let kind = match (anchor[n], changed) {
                    (true, false) => PairKind::Unchanged,
                    (true, true) => PairKind::Changed,
                    (false, changed) => PairKind::Moved { changed },
                };
                Pair {
                    old_index: o,
                    new_index: n,
                    kind,
                }
            })
        })
        .collect();
    let removed: Vec<usize> = (0..before.len()).filter(|&o| old_to_new[o].is_none()).collect();
    let inserted: Vec<usize> = (0..after.len()).filter(|&n| new_to_old[n].is_none()).collect();

    let ops = script(&old_to_new, &new_to_old, &anchor, &pairs, &removed);

    Ok(ListDiff {
        old_len: before.len(),
        new_len: after.len(),
        pairs,
        removed,
        inserted,
        ops,
    })
}

/// Diff two snapshots.
///
/// Duplicate identifiers are a programming error upstream: debug builds
/// panic, release builds log and fall back to [`ListDiff::replace_all`] so
/// the rendered list is never corrupted.
pub fn diff<T>(before: &[T], after: &[T]) -> ListDiff
where
    T: Identifiable + PartialEq,
{
    match try_diff(before, after) {
        Ok(diff) => diff,
        Err(err) => {
            debug_assert!(false, "{err}");
            error!(%err, "diff precondition violated, replacing list wholesale");
            ListDiff::replace_all(before.len(), after.len())
        }
    }
}

#[derive(Clone, Copy)]
struct Slot {
    new_index: usize,
    placed: bool,
}

/// Removals from the back, then one move per off-LCS row, then inserts in
/// ascending order, then changes at their final positions.
fn script(
    old_to_new: &[Option<usize>],
    new_to_old: &[Option<usize>],
    anchor: &[bool],
    pairs: &[Pair],
    removed: &[usize],
) -> Vec<EditOp> {
    let mut ops: Vec<EditOp> = removed
        .iter()
        .rev()
        .map(|&at| EditOp::Remove { at })
        .collect();

    let mut working: Vec<Slot> = old_to_new
        .iter()
        .filter_map(|n| {
            n.map(|n| Slot {
                new_index: n,
                placed: anchor[n],
            })
        })
        .collect();

    // Placed rows are always in `after` order relative to each other, so
    // each mover goes straight in front of the first placed row that
    // follows it.
    let movers = pairs
        .iter()
        .filter(|p| matches!(p.kind, PairKind::Moved { .. }))
        .map(|p| p.new_index);
    for n in movers {
        let Some(from) = working.iter().position(|s| s.new_index == n) else {
            continue;
        };
        working.remove(from);
        let to = working
            .iter()
            .position(|s| s.placed && s.new_index > n)
            .unwrap_or(working.len());
        working.insert(
            to,
            Slot {
                new_index: n,
                placed: true,
            },
        );
        ops.push(EditOp::Move { from, to });
    }

    ops.extend(
        (0..new_to_old.len())
            .filter(|&j| new_to_old[j].is_none())
            .map(|j| EditOp::Insert { at: j, new_index: j }),
    );
    ops.extend(
        pairs
            .iter()
            .filter(|p| p.content_changed())
            .map(|p| EditOp::Change {
                at: p.new_index,
                new_index: p.new_index,
            }),
    );

    ops
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use relist_types::{Filler, FillerKind, ListItem, Record};

    use super::*;

    fn recs(ids: &[&str]) -> Vec<Record> {
        ids.iter().map(|id| Record::new(*id)).collect()
    }

    fn check<T: Identifiable + PartialEq + Clone + std::fmt::Debug>(
        before: &[T],
        after: &[T],
    ) -> ListDiff {
        let d = diff(before, after);
        let mut applied = before.to_vec();
        d.apply(&mut applied, after);
        assert_eq!(applied, after);
        d
    }

    #[test]
    fn identical_snapshots_produce_no_ops() {
        let list = recs(&["a", "b", "c"]);
        let d = check(&list, &list);
        assert!(d.is_empty());
        assert_eq!(d.pairs.len(), 3);
        assert!(d.pairs.iter().all(|p| p.kind == PairKind::Unchanged));
    }

    #[test]
    fn empty_to_populated_is_all_inserts() {
        let empty: Vec<Record> = Vec::new();
        let d = check(&empty, &recs(&["a", "b"]));
        assert_eq!(d.insertions(), 2);
        assert_eq!(d.removals(), 0);
        assert_eq!(
            d.ops,
            vec![
                EditOp::Insert { at: 0, new_index: 0 },
                EditOp::Insert { at: 1, new_index: 1 },
            ]
        );
    }

    #[test]
    fn populated_to_empty_removes_from_the_back() {
        let empty: Vec<Record> = Vec::new();
        let d = check(&recs(&["a", "b"]), &empty);
        assert_eq!(d.ops, vec![EditOp::Remove { at: 1 }, EditOp::Remove { at: 0 }]);
    }

    #[test]
    fn field_change_reported_at_position() {
        let before = vec![Record::new("a"), Record::new("b").with("name", "old")];
        let after = vec![Record::new("a"), Record::new("b").with("name", "new")];
        let d = check(&before, &after);
        assert_eq!(d.changes(), 1);
        assert_eq!(d.moves(), 0);
        assert_eq!(d.ops, vec![EditOp::Change { at: 1, new_index: 1 }]);
        assert_eq!(d.pairs[1].kind, PairKind::Changed);
    }

    #[test]
    fn single_row_moved_to_end_is_one_move() {
        let d = check(&recs(&["a", "b", "c"]), &recs(&["b", "c", "a"]));
        assert_eq!(d.moves(), 1);
        assert_eq!(d.ops.len(), 1);
        assert!(matches!(d.ops[0], EditOp::Move { .. }));
    }

    #[test]
    fn single_row_moved_to_front_is_one_move() {
        let d = check(&recs(&["a", "b", "c"]), &recs(&["c", "a", "b"]));
        assert_eq!(d.moves(), 1);
        assert_eq!(d.ops, vec![EditOp::Move { from: 2, to: 0 }]);
    }

    #[test]
    fn interleaved_movers_each_move_once() {
        let before = recs(&["r5", "r9", "r3", "r4", "r0", "r6"]);
        let after = recs(&["r2", "r6", "r0", "r4", "r7", "r1", "r8"]);
        let d = check(&before, &after);
        assert_eq!(d.moves(), 2);
        let move_ops = d
            .ops
            .iter()
            .filter(|op| matches!(op, EditOp::Move { .. }))
            .count();
        assert_eq!(move_ops, 2);
    }

    #[test]
    fn mixed_insert_remove_move_change() {
        let before = vec![
            Record::new("keep"),
            Record::new("drop"),
            Record::new("edit").with("v", 1),
            Record::new("late"),
        ];
        let after = vec![
            Record::new("late"),
            Record::new("keep"),
            Record::new("edit").with("v", 2),
            Record::new("new"),
        ];
        let d = check(&before, &after);
        assert_eq!(d.removed, vec![1]);
        assert_eq!(d.inserted, vec![3]);
        assert_eq!(d.changes(), 1);
        assert_eq!(d.moves(), 1);
    }

    #[test]
    fn fillers_are_never_paired() {
        let filler: ListItem<Record> = Filler::new(FillerKind::Content, "ad").into();
        let before = vec![
            ListItem::Entity(Record::new("a")),
            filler.clone(),
            ListItem::Entity(Record::new("b")),
        ];
        let after = vec![
            ListItem::Entity(Record::new("a")),
            ListItem::Entity(Record::new("b")),
            filler,
        ];
        let d = check(&before, &after);
        assert_eq!(d.removed, vec![1]);
        assert_eq!(d.inserted, vec![2]);
        assert_eq!(d.moves(), 0);
    }

    #[test]
    fn duplicates_are_rejected_by_try_diff() {
        let before = recs(&["a", "a"]);
        let err = try_diff(&before, &recs(&["a"])).unwrap_err();
        assert_eq!(
            err,
            DiffError::DuplicateIdentifier {
                side: Side::Before,
                id: EntityId::from("a"),
            }
        );
        let err = try_diff(&recs(&["a"]), &recs(&["b", "b"])).unwrap_err();
        assert!(matches!(err, DiffError::DuplicateIdentifier { side: Side::After, .. }));
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "duplicate identifier"))]
    fn duplicates_fall_back_to_wholesale_replace() {
        let before = recs(&["a", "a"]);
        let after = recs(&["b"]);
        let d = diff(&before, &after);
        assert_eq!(d, ListDiff::replace_all(2, 1));
    }

    #[test]
    fn replace_all_applies_cleanly() {
        let before = recs(&["a", "b", "c"]);
        let after = recs(&["x", "y"]);
        let d = ListDiff::replace_all(before.len(), after.len());
        let mut applied = before.clone();
        d.apply(&mut applied, &after);
        assert_eq!(applied, after);
    }

    fn snapshot() -> impl Strategy<Value = Vec<Record>> {
        let pool: Vec<u8> = (0..16).collect();
        (
            proptest::sample::subsequence(pool, 0..=16).prop_shuffle(),
            proptest::collection::vec(0u8..2, 16),
        )
            .prop_map(|(ids, versions)| {
                ids.into_iter()
                    .map(|id| Record::new(format!("r{id}")).with("v", versions[id as usize]))
                    .collect()
            })
    }

    proptest! {
        #[test]
        fn applying_the_script_reproduces_after(before in snapshot(), after in snapshot()) {
            let d = diff(&before, &after);
            let mut applied = before.clone();
            d.apply(&mut applied, &after);
            prop_assert_eq!(&applied, &after);
            prop_assert_eq!(d.pairs.len() + d.removed.len(), before.len());
            prop_assert_eq!(d.pairs.len() + d.inserted.len(), after.len());
        }

        #[test]
        fn each_moved_row_moves_once(before in snapshot(), after in snapshot()) {
            let d = diff(&before, &after);
            let move_ops = d.ops.iter().filter(|op| matches!(op, EditOp::Move { .. })).count();
            prop_assert_eq!(move_ops, d.moves());
            prop_assert_eq!(d.len(), d.removals() + d.insertions() + d.moves() + d.changes());
        }
    }
}
