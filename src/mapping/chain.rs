//! Singly linked chains of slots.
//!
//! A [`Chain`] is just a head, a tail and an axis; the links themselves live
//! on the slots inside the [`SlotArena`]. Chains are never circular. Every
//! walk is bounded by the arena size so a corrupted link fails instead of
//! looping.

use crate::error::{Result, XlmapError};

use super::slot::{Axis, SlotArena, SlotId};

/// Ordered rows (or columns) implied by one layout subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chain {
    pub(crate) axis: Axis,
    pub(crate) first: Option<SlotId>,
    pub(crate) last: Option<SlotId>,
}

impl Chain {
    #[must_use]
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            first: None,
            last: None,
        }
    }

    #[must_use]
    pub fn axis(&self) -> Axis {
        self.axis
    }

    #[must_use]
    pub fn first(&self) -> Option<SlotId> {
        self.first
    }

    #[must_use]
    pub fn last(&self) -> Option<SlotId> {
        self.last
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    pub(crate) fn check_axis(&self, other: &Chain) -> Result<()> {
        if self.axis != other.axis {
            return Err(XlmapError::invariant(format!(
                "cannot combine a {:?} chain with a {:?} chain",
                self.axis, other.axis
            )));
        }
        Ok(())
    }

    /// Add one slot at the tail.
    pub fn push(&mut self, arena: &mut SlotArena, slot: SlotId) -> Result<()> {
        if arena.slot(slot)?.axis() != self.axis {
            return Err(XlmapError::invariant(format!(
                "{slot} does not belong on a {:?} chain",
                self.axis
            )));
        }
        arena.set_next(slot, None)?;
        match self.last {
            Some(last) => arena.set_next(last, Some(slot))?,
            None => self.first = Some(slot),
        }
        self.last = Some(slot);
        Ok(())
    }

    /// Concatenate `source` after this chain without reconciling anything.
    pub fn append(&mut self, arena: &mut SlotArena, source: Chain) -> Result<()> {
        self.check_axis(&source)?;
        let (Some(head), Some(tail)) = (source.first, source.last) else {
            return Ok(());
        };
        match self.last {
            Some(last) => arena.set_next(last, Some(head))?,
            None => self.first = Some(head),
        }
        self.last = Some(tail);
        Ok(())
    }

    /// Link `new` directly after `after`, moving the tail if needed.
    pub(crate) fn insert_after(
        &mut self,
        arena: &mut SlotArena,
        after: SlotId,
        new: SlotId,
    ) -> Result<()> {
        let following = arena.slot(after)?.next();
        arena.set_next(new, following)?;
        arena.set_next(after, Some(new))?;
        if self.last == Some(after) {
            self.last = Some(new);
        }
        Ok(())
    }

    /// Link `new` directly before `before`, whose predecessor is `prev`.
    pub(crate) fn insert_before(
        &mut self,
        arena: &mut SlotArena,
        prev: Option<SlotId>,
        before: SlotId,
        new: SlotId,
    ) -> Result<()> {
        arena.set_next(new, Some(before))?;
        match prev {
            Some(p) => arena.set_next(p, Some(new))?,
            None => self.first = Some(new),
        }
        Ok(())
    }

    /// Walk the chain without validating it. Stops after as many steps as
    /// there are slots in the arena.
    #[must_use]
    pub fn iter<'a>(&self, arena: &'a SlotArena) -> ChainIter<'a> {
        ChainIter {
            arena,
            next: self.first,
            remaining: arena.len(),
        }
    }

    /// Slot ids from head to tail, failing on cycles or a broken tail.
    pub fn slot_ids(&self, arena: &SlotArena) -> Result<Vec<SlotId>> {
        let mut ids = Vec::new();
        let mut cursor = self.first;
        while let Some(id) = cursor {
            if ids.len() >= arena.len() {
                return Err(XlmapError::structure(format!(
                    "{:?} chain starting at {:?} is circular",
                    self.axis, self.first
                )));
            }
            let slot = arena.slot(id)?;
            if slot.axis() != self.axis {
                return Err(XlmapError::invariant(format!(
                    "{id} is a {:?} slot inside a {:?} chain",
                    slot.axis(),
                    self.axis
                )));
            }
            ids.push(id);
            cursor = slot.next();
        }
        if ids.last().copied() != self.last {
            return Err(XlmapError::structure(format!(
                "{:?} chain tail {:?} is not reachable from its head",
                self.axis, self.last
            )));
        }
        Ok(ids)
    }

    /// Number of slots in the chain.
    pub fn len(&self, arena: &SlotArena) -> Result<usize> {
        Ok(self.slot_ids(arena)?.len())
    }

    /// Check the chain invariants.
    pub fn validate(&self, arena: &SlotArena) -> Result<()> {
        self.slot_ids(arena).map(|_| ())
    }

    /// Number the slots 1..=N in chain order and return N.
    pub fn count(&self, arena: &mut SlotArena) -> Result<u32> {
        let ids = self.slot_ids(arena)?;
        let mut index: u32 = 0;
        for id in ids {
            index = index
                .checked_add(1)
                .ok_or_else(|| XlmapError::structure("too many rows or columns"))?;
            arena.set_excel_index(id, index)?;
        }
        Ok(index)
    }
}

/// Iterator over the slot ids of a chain.
pub struct ChainIter<'a> {
    arena: &'a SlotArena,
    next: Option<SlotId>,
    remaining: usize,
}

impl Iterator for ChainIter<'_> {
    type Item = SlotId;

    fn next(&mut self) -> Option<SlotId> {
        let id = self.next?;
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.next = self.arena.find(id).and_then(|slot| slot.next());
        Some(id)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;

    fn chain_of(arena: &mut SlotArena, axis: Axis, sizes: &[Option<f64>]) -> Chain {
        let mut chain = Chain::new(axis);
        for size in sizes {
            let slot = arena.create(axis, *size, false).unwrap();
            chain.push(arena, slot).unwrap();
        }
        chain
    }

    #[test]
    fn test_append_onto_empty_adopts_source() {
        let mut arena = SlotArena::new();
        let source = chain_of(&mut arena, Axis::Column, &[Some(1.0), Some(2.0)]);
        let before = source.slot_ids(&arena).unwrap();

        let mut target = Chain::new(Axis::Column);
        target.append(&mut arena, source).unwrap();
        assert_eq!(target, source);
        assert_eq!(target.slot_ids(&arena).unwrap(), before);
    }

    #[test]
    fn test_append_links_tail_to_head() {
        let mut arena = SlotArena::new();
        let mut a = chain_of(&mut arena, Axis::Row, &[None, None]);
        let b = chain_of(&mut arena, Axis::Row, &[Some(3.0)]);
        a.append(&mut arena, b).unwrap();
        assert_eq!(a.len(&arena).unwrap(), 3);
        assert_eq!(a.last(), b.last());
        a.validate(&arena).unwrap();
    }

    #[test]
    fn test_append_rejects_other_axis() {
        let mut arena = SlotArena::new();
        let mut rows = chain_of(&mut arena, Axis::Row, &[None]);
        let columns = chain_of(&mut arena, Axis::Column, &[None]);
        assert!(matches!(
            rows.append(&mut arena, columns),
            Err(XlmapError::Invariant(_))
        ));
    }

    #[test]
    fn test_count_numbers_from_one() {
        let mut arena = SlotArena::new();
        let chain = chain_of(&mut arena, Axis::Column, &[None, Some(5.0), None]);
        assert_eq!(chain.count(&mut arena).unwrap(), 3);
        let indices: Vec<u32> = chain
            .iter(&arena)
            .map(|id| arena.slot(id).unwrap().excel_index().unwrap())
            .collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_cycle_is_detected() {
        let mut arena = SlotArena::new();
        let chain = chain_of(&mut arena, Axis::Row, &[None, None]);
        let first = chain.first().unwrap();
        let last = chain.last().unwrap();
        arena.set_next(last, Some(first)).unwrap();
        assert!(matches!(
            chain.slot_ids(&arena),
            Err(XlmapError::Structure(_))
        ));
        // the unchecked iterator still terminates
        assert_eq!(chain.iter(&arena).count(), 2);
    }

    #[test]
    fn test_insert_before_head_and_after_tail() {
        let mut arena = SlotArena::new();
        let mut chain = chain_of(&mut arena, Axis::Column, &[Some(1.0)]);
        let only = chain.first().unwrap();
        let head = arena.create(Axis::Column, None, true).unwrap();
        chain.insert_before(&mut arena, None, only, head).unwrap();
        let tail = arena.create(Axis::Column, None, false).unwrap();
        chain.insert_after(&mut arena, only, tail).unwrap();
        assert_eq!(chain.slot_ids(&arena).unwrap(), vec![head, only, tail]);
        assert_eq!(chain.first(), Some(head));
        assert_eq!(chain.last(), Some(tail));
    }
}
