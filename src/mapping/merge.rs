//! Reconciliation of two slot chains that cover the same stretch of an axis.
//!
//! Sibling subtrees each produce their own chain of rows (or columns). When
//! they share a container the chains have to agree on one set of boundaries:
//! slots are split where one side has a boundary the other lacks, hidden
//! slots are threaded through without counting against visible sizes, and
//! every node keeps its claim on every slot it overlaps.

use tracing::debug;

use crate::error::Result;

use super::chain::Chain;
use super::slot::{Axis, SlotArena, SlotId};

/// Relative tolerance under which two sizes count as equal.
const SIZE_TOLERANCE: f64 = 1e-9;

fn same_size(a: f64, b: f64) -> bool {
    (a - b).abs() <= SIZE_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

/// Position inside the target chain. `prev` is the slot linking to
/// `current`, or `None` at the head.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    prev: Option<SlotId>,
    current: SlotId,
}

impl Chain {
    /// Fold `source` into this chain so the result accounts for both.
    ///
    /// Source slots are consumed: their maps end up on the target slots they
    /// overlap and the source slots are retired. Merging into an empty chain
    /// adopts `source` as is.
    pub fn merge(&mut self, arena: &mut SlotArena, source: Chain) -> Result<()> {
        self.check_axis(&source)?;
        let sources = source.slot_ids(arena)?;
        let Some(first) = self.first else {
            *self = source;
            return Ok(());
        };
        if sources.is_empty() {
            return Ok(());
        }
        debug!(axis = ?self.axis, source_slots = sources.len(), "merging slot chains");

        let axis = self.axis;
        let mut merger = Merger {
            arena,
            chain: self,
            axis,
        };
        let mut cursor = Cursor {
            prev: None,
            current: first,
        };
        let mut pending = sources.iter().copied().peekable();
        while let Some(source_slot) = pending.next() {
            let touched = merger.absorb(cursor, source_slot)?;
            if let Some(&upcoming) = pending.peek() {
                cursor = merger.advance(touched, upcoming)?;
            }
        }
        Ok(())
    }
}

struct Merger<'a> {
    arena: &'a mut SlotArena,
    chain: &'a mut Chain,
    axis: Axis,
}

impl Merger<'_> {
    /// Step past the last target slot touched. If the target ran out while
    /// source remains, grow it by an empty slot matching the next source
    /// slot's visibility.
    fn advance(&mut self, touched: SlotId, upcoming: SlotId) -> Result<Cursor> {
        let next = match self.arena.slot(touched)?.next() {
            Some(next) => next,
            None => {
                let hidden = self.arena.slot(upcoming)?.hidden();
                let slot = self.arena.create(self.axis, None, hidden)?;
                self.chain.insert_after(self.arena, touched, slot)?;
                slot
            }
        };
        Ok(Cursor {
            prev: Some(touched),
            current: next,
        })
    }

    /// Account for one source slot starting at `cursor`. Returns the last
    /// target slot the source landed on.
    fn absorb(&mut self, cursor: Cursor, source: SlotId) -> Result<SlotId> {
        let target_hidden = self.arena.slot(cursor.current)?.hidden();
        let source_hidden = self.arena.slot(source)?.hidden();
        match (target_hidden, source_hidden) {
            (false, false) => self.allocate(cursor, source, false),
            (false, true) => self.insert_hidden_before(cursor, source),
            (true, false) => self.allocate_past_hidden(cursor, source),
            (true, true) => self.allocate(cursor, source, true),
        }
    }

    /// A hidden source in front of a visible target becomes its own hidden
    /// slot ahead of the target. The target itself is left untouched.
    fn insert_hidden_before(&mut self, cursor: Cursor, source: SlotId) -> Result<SlotId> {
        let size = self.arena.slot(source)?.size();
        let hidden = self.arena.create(self.axis, size, true)?;
        self.arena.move_maps(source, hidden)?;
        self.arena.add_maps(cursor.current, hidden)?;
        self.chain
            .insert_before(self.arena, cursor.prev, cursor.current, hidden)?;
        self.arena.retire(source)?;
        Ok(hidden)
    }

    /// A visible source meeting hidden targets claims each of them without
    /// spending any of its size, then lands on the next visible target.
    fn allocate_past_hidden(&mut self, cursor: Cursor, source: SlotId) -> Result<SlotId> {
        let mut cursor = cursor;
        loop {
            let slot = self.arena.slot(cursor.current)?;
            let (hidden, following) = (slot.hidden(), slot.next());
            if !hidden {
                return self.allocate(cursor, source, false);
            }
            self.arena.add_maps(source, cursor.current)?;
            let next = match following {
                Some(next) => next,
                None => {
                    let slot = self.arena.create(self.axis, None, false)?;
                    self.chain.insert_after(self.arena, cursor.current, slot)?;
                    slot
                }
            };
            cursor = Cursor {
                prev: Some(cursor.current),
                current: next,
            };
        }
    }

    /// Reconcile a source with a target of the same visibility.
    fn allocate(&mut self, cursor: Cursor, source: SlotId, hidden: bool) -> Result<SlotId> {
        let target = cursor.current;
        let target_size = self.arena.slot(target)?.size();
        let source_size = self.arena.slot(source)?.size();

        match (target_size, source_size) {
            (None, Some(size)) => {
                self.arena.set_size(target, Some(size))?;
                self.arena.move_maps(source, target)?;
            }
            (_, None) => {
                // unsized source goes with the flow of the target
                self.arena.move_maps(source, target)?;
            }
            (Some(t), Some(s)) if same_size(t, s) => {
                self.arena.move_maps(source, target)?;
            }
            (Some(t), Some(s)) if t > s => {
                // the excess keeps the target's identity only
                let excess = self.arena.create(self.axis, Some(t - s), hidden)?;
                self.arena.add_maps(target, excess)?;
                self.arena.set_size(target, Some(s))?;
                self.chain.insert_after(self.arena, target, excess)?;
                self.arena.move_maps(source, target)?;
            }
            (Some(t), Some(s)) => {
                self.arena.add_maps(source, target)?;
                let last = self.allocate_remainder(target, source, s - t, hidden)?;
                self.arena.retire(source)?;
                return Ok(last);
            }
        }
        self.arena.retire(source)?;
        Ok(target)
    }

    /// Spread what is left of a source that outgrew one target over the
    /// following targets. Returns the last slot the remainder landed on.
    fn allocate_remainder(
        &mut self,
        after: SlotId,
        source: SlotId,
        remainder: f64,
        hidden: bool,
    ) -> Result<SlotId> {
        let mut prev = after;
        let mut remaining = remainder;
        loop {
            let Some(next) = self.arena.slot(prev)?.next() else {
                return self.insert_remainder(prev, source, remaining, hidden, None);
            };
            let next_slot = self.arena.slot(next)?;
            let (next_hidden, next_size) = (next_slot.hidden(), next_slot.size());

            if next_hidden != hidden {
                if hidden {
                    // a hidden remainder never spills into visible space
                    return self.insert_remainder(prev, source, remaining, true, None);
                }
                // hidden slots are free real estate for a visible source
                self.arena.add_maps(source, next)?;
                prev = next;
                continue;
            }

            match next_size {
                None => {
                    self.arena.set_size(next, Some(remaining))?;
                    self.arena.add_maps(source, next)?;
                    return Ok(next);
                }
                Some(size) if same_size(size, remaining) => {
                    self.arena.add_maps(source, next)?;
                    return Ok(next);
                }
                Some(size) if size > remaining => {
                    self.arena.set_size(next, Some(size - remaining))?;
                    return self.insert_remainder(prev, source, remaining, hidden, Some(next));
                }
                Some(size) => {
                    self.arena.add_maps(source, next)?;
                    remaining -= size;
                    prev = next;
                }
            }
        }
    }

    /// Insert a slot of `size` right after `prev` carrying the source's maps,
    /// plus the maps of `split` when it is carved out of that slot.
    fn insert_remainder(
        &mut self,
        prev: SlotId,
        source: SlotId,
        size: f64,
        hidden: bool,
        split: Option<SlotId>,
    ) -> Result<SlotId> {
        let slot = self.arena.create(self.axis, Some(size), hidden)?;
        if let Some(split) = split {
            self.arena.add_maps(split, slot)?;
        }
        self.arena.add_maps(source, slot)?;
        self.chain.insert_after(self.arena, prev, slot)?;
        Ok(slot)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic,
    clippy::cast_possible_truncation
)]
mod tests {
    use super::*;
    use crate::mapping::node::NodeId;
    use std::collections::BTreeSet;

    /// Build a chain where slot `i` is mapped to `NodeId(base + i)`.
    fn chain(arena: &mut SlotArena, base: u32, slots: &[(Option<f64>, bool)]) -> Chain {
        let mut chain = Chain::new(Axis::Column);
        for (i, (size, hidden)) in slots.iter().enumerate() {
            let slot = arena.create(Axis::Column, *size, *hidden).unwrap();
            arena.associate(slot, NodeId(base + i as u32)).unwrap();
            chain.push(arena, slot).unwrap();
        }
        chain
    }

    fn shape(arena: &SlotArena, chain: &Chain) -> Vec<(Option<f64>, bool, Vec<u32>)> {
        chain
            .slot_ids(arena)
            .unwrap()
            .into_iter()
            .map(|id| {
                let slot = arena.slot(id).unwrap();
                (
                    slot.size(),
                    slot.hidden(),
                    slot.maps().iter().map(|n| n.0).collect(),
                )
            })
            .collect()
    }

    fn all_maps(arena: &SlotArena, chain: &Chain) -> BTreeSet<NodeId> {
        chain
            .slot_ids(arena)
            .unwrap()
            .into_iter()
            .flat_map(|id| arena.slot(id).unwrap().maps().clone())
            .collect()
    }

    #[test]
    fn test_merge_into_empty_adopts_source() {
        let mut arena = SlotArena::new();
        let source = chain(&mut arena, 0, &[(Some(4.0), false)]);
        let mut target = Chain::new(Axis::Column);
        target.merge(&mut arena, source).unwrap();
        assert_eq!(target, source);
    }

    #[test]
    fn test_equal_widths_union_maps() {
        let mut arena = SlotArena::new();
        let mut target = chain(&mut arena, 0, &[(Some(10.0), false)]);
        let source = chain(&mut arena, 10, &[(Some(10.0), false)]);
        target.merge(&mut arena, source).unwrap();
        assert_eq!(shape(&arena, &target), vec![(Some(10.0), false, vec![0, 10])]);
        arena.check_consistency().unwrap();
    }

    #[test]
    fn test_wider_target_is_split() {
        let mut arena = SlotArena::new();
        let mut target = chain(&mut arena, 0, &[(Some(10.0), false)]);
        let source = chain(&mut arena, 10, &[(Some(6.0), false)]);
        target.merge(&mut arena, source).unwrap();
        assert_eq!(
            shape(&arena, &target),
            vec![(Some(6.0), false, vec![0, 10]), (Some(4.0), false, vec![0])]
        );
        assert_eq!(target.last(), target.slot_ids(&arena).unwrap().last().copied());
    }

    #[test]
    fn test_wider_source_spills_into_new_slot() {
        let mut arena = SlotArena::new();
        let mut target = chain(&mut arena, 0, &[(Some(5.0), false)]);
        let source = chain(&mut arena, 10, &[(Some(12.0), false)]);
        target.merge(&mut arena, source).unwrap();
        assert_eq!(
            shape(&arena, &target),
            vec![(Some(5.0), false, vec![0, 10]), (Some(7.0), false, vec![10])]
        );
    }

    #[test]
    fn test_hidden_source_goes_before_visible_target() {
        let mut arena = SlotArena::new();
        let mut target = chain(&mut arena, 0, &[(None, false)]);
        let original = target.first().unwrap();
        let source = chain(&mut arena, 10, &[(Some(3.0), true)]);
        target.merge(&mut arena, source).unwrap();
        assert_eq!(
            shape(&arena, &target),
            vec![(Some(3.0), true, vec![0, 10]), (None, false, vec![0])]
        );
        assert_eq!(target.last(), Some(original));
    }

    #[test]
    fn test_visible_source_passes_hidden_targets() {
        let mut arena = SlotArena::new();
        let mut target = chain(&mut arena, 0, &[(Some(2.0), true), (Some(8.0), false)]);
        let source = chain(&mut arena, 10, &[(Some(8.0), false)]);
        target.merge(&mut arena, source).unwrap();
        assert_eq!(
            shape(&arena, &target),
            vec![(Some(2.0), true, vec![0, 10]), (Some(8.0), false, vec![1, 10])]
        );
    }

    #[test]
    fn test_remainder_skips_hidden_and_splits_next() {
        let mut arena = SlotArena::new();
        let mut target = chain(
            &mut arena,
            0,
            &[(Some(4.0), false), (Some(1.0), true), (Some(10.0), false)],
        );
        let source = chain(&mut arena, 10, &[(Some(7.0), false), (Some(7.0), false)]);
        target.merge(&mut arena, source).unwrap();
        assert_eq!(
            shape(&arena, &target),
            vec![
                (Some(4.0), false, vec![0, 10]),
                (Some(1.0), true, vec![1, 10]),
                (Some(3.0), false, vec![2, 10]),
                (Some(7.0), false, vec![2, 11]),
            ]
        );
        arena.check_consistency().unwrap();
    }

    #[test]
    fn test_unsized_target_adopts_source_size() {
        let mut arena = SlotArena::new();
        let mut target = chain(&mut arena, 0, &[(None, false), (Some(5.0), false)]);
        let source = chain(&mut arena, 10, &[(Some(3.0), false), (None, false)]);
        target.merge(&mut arena, source).unwrap();
        assert_eq!(
            shape(&arena, &target),
            vec![(Some(3.0), false, vec![0, 10]), (Some(5.0), false, vec![1, 11])]
        );
    }

    #[test]
    fn test_longer_source_grows_target() {
        let mut arena = SlotArena::new();
        let mut target = chain(&mut arena, 0, &[(Some(5.0), false)]);
        let source = chain(
            &mut arena,
            10,
            &[(Some(5.0), false), (Some(2.0), true), (None, false)],
        );
        target.merge(&mut arena, source).unwrap();
        assert_eq!(
            shape(&arena, &target),
            vec![
                (Some(5.0), false, vec![0, 10]),
                (Some(2.0), true, vec![11]),
                (None, false, vec![12]),
            ]
        );
        assert_eq!(target.len(&arena).unwrap(), 3);
    }

    #[test]
    fn test_hidden_pair_splits_like_visible() {
        let mut arena = SlotArena::new();
        let mut target = chain(&mut arena, 0, &[(Some(6.0), true)]);
        let source = chain(&mut arena, 10, &[(Some(2.0), true)]);
        target.merge(&mut arena, source).unwrap();
        assert_eq!(
            shape(&arena, &target),
            vec![(Some(2.0), true, vec![0, 10]), (Some(4.0), true, vec![0])]
        );
    }

    #[test]
    fn test_hidden_remainder_stays_hidden() {
        let mut arena = SlotArena::new();
        let mut target = chain(&mut arena, 0, &[(Some(2.0), true), (Some(9.0), false)]);
        let source = chain(&mut arena, 10, &[(Some(5.0), true)]);
        target.merge(&mut arena, source).unwrap();
        assert_eq!(
            shape(&arena, &target),
            vec![
                (Some(2.0), true, vec![0, 10]),
                (Some(3.0), true, vec![10]),
                (Some(9.0), false, vec![1]),
            ]
        );
    }

    #[test]
    fn test_split_sizes_sum_to_original() {
        let mut arena = SlotArena::new();
        let mut target = chain(&mut arena, 0, &[(Some(12.5), false)]);
        let source = chain(&mut arena, 10, &[(Some(4.25), false)]);
        target.merge(&mut arena, source).unwrap();
        let sizes: f64 = target
            .iter(&arena)
            .map(|id| arena.slot(id).unwrap().size().unwrap())
            .sum();
        assert_eq!(sizes, 12.5);
    }

    #[test]
    fn test_maps_are_conserved() {
        let mut arena = SlotArena::new();
        let mut target = chain(
            &mut arena,
            0,
            &[(Some(3.0), false), (None, true), (Some(9.0), false)],
        );
        let source = chain(
            &mut arena,
            10,
            &[(Some(1.0), true), (Some(5.0), false), (None, false), (Some(4.0), false)],
        );
        let mut expected = all_maps(&arena, &target);
        expected.extend(all_maps(&arena, &source));

        target.merge(&mut arena, source).unwrap();
        assert_eq!(all_maps(&arena, &target), expected);
        for id in target.iter(&arena) {
            assert_eq!(arena.slot(id).unwrap().axis(), Axis::Column);
        }
        arena.check_consistency().unwrap();
        target.validate(&arena).unwrap();
    }

    #[test]
    fn test_merge_rejects_other_axis() {
        let mut arena = SlotArena::new();
        let mut target = chain(&mut arena, 0, &[(None, false)]);
        let mut rows = Chain::new(Axis::Row);
        let slot = arena.create(Axis::Row, None, false).unwrap();
        rows.push(&mut arena, slot).unwrap();
        assert!(target.merge(&mut arena, rows).is_err());
    }
}
