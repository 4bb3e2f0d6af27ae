//! Row/column slots and their association with coordinate nodes.
//!
//! A [`Slot`] is one row or one column unit. Slots live in a [`SlotArena`],
//! which also owns the node ↔ slot association table. The association is
//! only ever changed through [`SlotArena::associate`] and
//! [`SlotArena::disassociate`], so `node ∈ slot.maps()` holds exactly when
//! `slot ∈ arena.slots_of(node, slot.axis())`.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::{Result, XlmapError};
use crate::store::{store_id, Storable, Store};

use super::node::{CoordinateNode, NodeId};

store_id!(
    /// Identity of a row or column slot.
    SlotId,
    "slot"
);

/// Which axis a slot or chain belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Axis {
    Row,
    Column,
}

impl Axis {
    #[must_use]
    pub fn is_row(self) -> bool {
        matches!(self, Axis::Row)
    }
}

/// One row or column unit.
#[derive(Debug, Clone)]
pub struct Slot {
    id: SlotId,
    axis: Axis,
    size: Option<f64>,
    hidden: bool,
    next: Option<SlotId>,
    maps: BTreeSet<NodeId>,
    excel_index: Option<u32>,
    retired: bool,
}

impl Storable for Slot {
    type Id = SlotId;

    fn id(&self) -> SlotId {
        self.id
    }
}

impl Slot {
    #[must_use]
    pub fn id(&self) -> SlotId {
        self.id
    }

    #[must_use]
    pub fn axis(&self) -> Axis {
        self.axis
    }

    #[must_use]
    pub fn is_row(&self) -> bool {
        self.axis.is_row()
    }

    /// Fixed size in pixels, or `None` when the content decides.
    #[must_use]
    pub fn size(&self) -> Option<f64> {
        self.size
    }

    #[must_use]
    pub fn hidden(&self) -> bool {
        self.hidden
    }

    #[must_use]
    pub fn next(&self) -> Option<SlotId> {
        self.next
    }

    /// Nodes that claim this slot.
    #[must_use]
    pub fn maps(&self) -> &BTreeSet<NodeId> {
        &self.maps
    }

    /// Whether a merge absorbed this slot into another chain.
    #[must_use]
    pub fn is_retired(&self) -> bool {
        self.retired
    }

    /// The 1-based worksheet row/column. Fails until the chain is counted.
    pub fn excel_index(&self) -> Result<u32> {
        self.excel_index.ok_or_else(|| {
            XlmapError::invariant(format!("excel index of {} read before numbering", self.id))
        })
    }
}

/// Arena of slots plus the node ↔ slot association table.
#[derive(Debug, Clone, Default)]
pub struct SlotArena {
    slots: Store<Slot>,
    rows: BTreeMap<NodeId, BTreeSet<SlotId>>,
    columns: BTreeMap<NodeId, BTreeSet<SlotId>>,
}

impl SlotArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots ever created, retired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, id: SlotId) -> Result<&Slot> {
        self.slots.get(id)
    }

    /// Look up a slot that may not exist.
    #[must_use]
    pub fn find(&self, id: SlotId) -> Option<&Slot> {
        self.slots.try_get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }

    /// Create a slot with no maps.
    pub fn create(&mut self, axis: Axis, size: Option<f64>, hidden: bool) -> Result<SlotId> {
        self.slots.insert_with(|id| Slot {
            id,
            axis,
            size,
            hidden,
            next: None,
            maps: BTreeSet::new(),
            excel_index: None,
            retired: false,
        })
    }

    /// Create a slot sized and hidden the way `node` asks for on `axis`, and
    /// associate the node with it.
    pub fn create_for(&mut self, axis: Axis, node: &CoordinateNode) -> Result<SlotId> {
        let props = node.props();
        let (size, hidden) = match axis {
            Axis::Row => (props.assigned_height, props.row_hidden),
            Axis::Column => (props.assigned_width, props.column_hidden),
        };
        let slot = self.create(axis, size, hidden)?;
        self.associate(slot, node.id())?;
        Ok(slot)
    }

    fn links(&self, axis: Axis) -> &BTreeMap<NodeId, BTreeSet<SlotId>> {
        match axis {
            Axis::Row => &self.rows,
            Axis::Column => &self.columns,
        }
    }

    fn links_mut(&mut self, axis: Axis) -> &mut BTreeMap<NodeId, BTreeSet<SlotId>> {
        match axis {
            Axis::Row => &mut self.rows,
            Axis::Column => &mut self.columns,
        }
    }

    fn live_slot_mut(&mut self, id: SlotId) -> Result<&mut Slot> {
        let slot = self.slots.get_mut(id)?;
        if slot.retired {
            return Err(XlmapError::invariant(format!("{id} was retired by a merge")));
        }
        Ok(slot)
    }

    /// Record that `node` claims `slot`, on both sides.
    pub fn associate(&mut self, slot: SlotId, node: NodeId) -> Result<()> {
        let entry = self.live_slot_mut(slot)?;
        let axis = entry.axis;
        entry.maps.insert(node);
        self.links_mut(axis).entry(node).or_default().insert(slot);
        Ok(())
    }

    /// Remove the claim of `node` on `slot`, on both sides.
    pub fn disassociate(&mut self, slot: SlotId, node: NodeId) -> Result<()> {
        let entry = self.slots.get_mut(slot)?;
        let axis = entry.axis;
        entry.maps.remove(&node);
        let links = self.links_mut(axis);
        if let Some(set) = links.get_mut(&node) {
            set.remove(&slot);
            if set.is_empty() {
                links.remove(&node);
            }
        }
        Ok(())
    }

    /// Copy every map of `from` onto `to`; `from` keeps its maps.
    pub fn add_maps(&mut self, from: SlotId, to: SlotId) -> Result<()> {
        let maps: Vec<NodeId> = self.slot(from)?.maps.iter().copied().collect();
        for node in maps {
            self.associate(to, node)?;
        }
        Ok(())
    }

    /// Move every map of `from` onto `to`, leaving `from` without maps.
    pub fn move_maps(&mut self, from: SlotId, to: SlotId) -> Result<()> {
        let maps: Vec<NodeId> = self.slot(from)?.maps.iter().copied().collect();
        for node in maps {
            self.associate(to, node)?;
            self.disassociate(from, node)?;
        }
        Ok(())
    }

    /// Associate `node` with every slot in `slots`.
    pub fn associate_all(
        &mut self,
        slots: impl IntoIterator<Item = SlotId>,
        node: NodeId,
    ) -> Result<()> {
        for slot in slots {
            self.associate(slot, node)?;
        }
        Ok(())
    }

    /// Drop a slot that a merge consumed. Its maps must already live on the
    /// surviving slots; the slot releases them and unlinks itself.
    pub(crate) fn retire(&mut self, id: SlotId) -> Result<()> {
        let maps: Vec<NodeId> = self.slot(id)?.maps.iter().copied().collect();
        let axis = self.slot(id)?.axis;
        for node in maps {
            let elsewhere = self
                .links(axis)
                .get(&node)
                .is_some_and(|set| set.iter().any(|s| *s != id));
            if !elsewhere {
                return Err(XlmapError::invariant(format!(
                    "retiring {id} would orphan {node}"
                )));
            }
            self.disassociate(id, node)?;
        }
        let slot = self.slots.get_mut(id)?;
        slot.next = None;
        slot.retired = true;
        Ok(())
    }

    pub(crate) fn set_size(&mut self, id: SlotId, size: Option<f64>) -> Result<()> {
        self.live_slot_mut(id)?.size = size;
        Ok(())
    }

    pub(crate) fn set_hidden(&mut self, id: SlotId, hidden: bool) -> Result<()> {
        self.live_slot_mut(id)?.hidden = hidden;
        Ok(())
    }

    pub(crate) fn set_next(&mut self, id: SlotId, next: Option<SlotId>) -> Result<()> {
        self.live_slot_mut(id)?.next = next;
        Ok(())
    }

    /// Assign the 1-based worksheet index. Zero is rejected.
    pub fn set_excel_index(&mut self, id: SlotId, index: u32) -> Result<()> {
        if index == 0 {
            return Err(XlmapError::invariant(format!(
                "excel index of {id} must be positive"
            )));
        }
        self.live_slot_mut(id)?.excel_index = Some(index);
        Ok(())
    }

    /// Slots `node` claims on `axis`, in id order.
    pub fn slots_of(&self, node: NodeId, axis: Axis) -> impl Iterator<Item = SlotId> + '_ {
        self.links(axis)
            .get(&node)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    pub fn rows_of(&self, node: NodeId) -> impl Iterator<Item = SlotId> + '_ {
        self.slots_of(node, Axis::Row)
    }

    pub fn columns_of(&self, node: NodeId) -> impl Iterator<Item = SlotId> + '_ {
        self.slots_of(node, Axis::Column)
    }

    /// Check that the slot and node sides of the association agree.
    pub fn check_consistency(&self) -> Result<()> {
        for slot in self.slots.iter() {
            for node in &slot.maps {
                let linked = self
                    .links(slot.axis)
                    .get(node)
                    .is_some_and(|set| set.contains(&slot.id));
                if !linked {
                    return Err(XlmapError::invariant(format!(
                        "{} maps {} but the node does not list it",
                        slot.id, node
                    )));
                }
            }
        }
        for axis in [Axis::Row, Axis::Column] {
            for (node, set) in self.links(axis) {
                for id in set {
                    let slot = self.slot(*id)?;
                    if slot.axis != axis || !slot.maps.contains(node) || slot.retired {
                        return Err(XlmapError::invariant(format!(
                            "{node} lists {id} but the slot does not map it"
                        )));
                    }
                }
            }
        }
        Ok(())
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

    #[test]
    fn test_associate_is_bidirectional() {
        let mut arena = SlotArena::new();
        let slot = arena.create(Axis::Column, Some(10.0), false).unwrap();
        arena.associate(slot, NodeId(4)).unwrap();
        assert!(arena.slot(slot).unwrap().maps().contains(&NodeId(4)));
        assert_eq!(arena.columns_of(NodeId(4)).collect::<Vec<_>>(), vec![slot]);
        assert_eq!(arena.rows_of(NodeId(4)).count(), 0);

        arena.disassociate(slot, NodeId(4)).unwrap();
        assert!(arena.slot(slot).unwrap().maps().is_empty());
        assert_eq!(arena.columns_of(NodeId(4)).count(), 0);
        arena.check_consistency().unwrap();
    }

    #[test]
    fn test_move_and_add_maps() {
        let mut arena = SlotArena::new();
        let a = arena.create(Axis::Row, None, false).unwrap();
        let b = arena.create(Axis::Row, None, false).unwrap();
        let c = arena.create(Axis::Row, None, false).unwrap();
        arena.associate(a, NodeId(1)).unwrap();
        arena.associate(a, NodeId(2)).unwrap();

        arena.add_maps(a, b).unwrap();
        assert_eq!(arena.slot(a).unwrap().maps().len(), 2);
        assert_eq!(arena.slot(b).unwrap().maps().len(), 2);

        arena.move_maps(a, c).unwrap();
        assert!(arena.slot(a).unwrap().maps().is_empty());
        assert_eq!(arena.rows_of(NodeId(1)).collect::<Vec<_>>(), vec![b, c]);
        arena.check_consistency().unwrap();
    }

    #[test]
    fn test_excel_index_invariants() {
        let mut arena = SlotArena::new();
        let slot = arena.create(Axis::Row, None, false).unwrap();
        assert!(matches!(
            arena.slot(slot).unwrap().excel_index(),
            Err(XlmapError::Invariant(_))
        ));
        assert!(matches!(
            arena.set_excel_index(slot, 0),
            Err(XlmapError::Invariant(_))
        ));
        arena.set_excel_index(slot, 3).unwrap();
        assert_eq!(arena.slot(slot).unwrap().excel_index().unwrap(), 3);
    }

    #[test]
    fn test_retire_refuses_to_orphan() {
        let mut arena = SlotArena::new();
        let a = arena.create(Axis::Column, None, false).unwrap();
        let b = arena.create(Axis::Column, None, false).unwrap();
        arena.associate(a, NodeId(0)).unwrap();
        assert!(matches!(arena.retire(a), Err(XlmapError::Invariant(_))));

        arena.add_maps(a, b).unwrap();
        arena.retire(a).unwrap();
        assert!(arena.slot(a).unwrap().is_retired());
        assert!(arena.slot(a).unwrap().maps().is_empty());
        assert!(arena.associate(a, NodeId(0)).is_err());
        arena.check_consistency().unwrap();
    }
}
