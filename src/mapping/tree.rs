//! The coordinate tree and the bottom-up chain builder.

use std::collections::BTreeSet;

use tracing::debug;

use crate::cell_ref::RangeReference;
use crate::error::{Result, XlmapError};
use crate::store::Store;

use super::chain::Chain;
use super::node::{
    ContainerData, CoordinateNode, GridPos, NodeId, NodeKind, NodeKindTag, NodeProps,
    PlaceholderData,
};
use super::slot::{Axis, SlotArena};

/// Arena of coordinate nodes plus the root they hang from.
#[derive(Debug, Clone, Default)]
pub struct MapTree {
    nodes: Store<CoordinateNode>,
    root: Option<NodeId>,
}

impl MapTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, kind: NodeKind, props: NodeProps) -> Result<NodeId> {
        self.nodes
            .insert_with(|id| CoordinateNode::new(id, kind, props))
    }

    pub fn add_container(&mut self, props: NodeProps) -> Result<NodeId> {
        self.add(NodeKind::Container(ContainerData::default()), props)
    }

    /// Add a cell. Both spans must be at least one.
    pub fn add_placeholder(&mut self, props: NodeProps, data: PlaceholderData) -> Result<NodeId> {
        if data.column_span == 0 || data.row_span == 0 {
            return Err(XlmapError::invariant(format!(
                "placeholder spans must be positive, got {}x{}",
                data.column_span, data.row_span
            )));
        }
        self.add(NodeKind::Placeholder(data), props)
    }

    pub fn add_padding(&mut self) -> Result<NodeId> {
        self.add(NodeKind::Padding, NodeProps::default())
    }

    pub fn set_root(&mut self, id: NodeId) -> Result<()> {
        let node = self.nodes.get(id)?;
        if node.parent().is_some() {
            return Err(XlmapError::structure(format!("{id} is placed and cannot be the root")));
        }
        self.root = Some(id);
        Ok(())
    }

    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Result<&CoordinateNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &CoordinateNode> {
        self.nodes.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn container_mut(&mut self, id: NodeId) -> Result<&mut ContainerData> {
        match self.nodes.get_mut(id)?.kind_mut() {
            NodeKind::Container(data) => Ok(data),
            _ => Err(XlmapError::structure(format!("{id} is not a container"))),
        }
    }

    fn container(&self, id: NodeId) -> Result<&ContainerData> {
        self.nodes
            .get(id)?
            .as_container()
            .ok_or_else(|| XlmapError::structure(format!("{id} is not a container")))
    }

    /// Put `child` at local (`column`, `row`) of `container`.
    pub fn place(&mut self, container: NodeId, child: NodeId, column: u32, row: u32) -> Result<()> {
        if container == child {
            return Err(XlmapError::structure(format!("{child} cannot contain itself")));
        }
        if self.root == Some(child) {
            return Err(XlmapError::structure(format!("root {child} cannot be placed")));
        }
        if self.is_ancestor(child, container)? {
            return Err(XlmapError::structure(format!(
                "{child} is an ancestor of {container}"
            )));
        }
        if let Some(owner) = self.nodes.get(child)?.parent() {
            return Err(XlmapError::invariant(format!(
                "{child} already belongs to {owner}"
            )));
        }
        self.container_mut(container)?
            .insert(GridPos::new(column, row), child)?;
        self.nodes.get_mut(child)?.set_parent(container)
    }

    /// Whether `ancestor` is on the parent chain of `id`.
    fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> Result<bool> {
        let mut current = self.nodes.get(id)?.parent();
        let mut steps = 0usize;
        while let Some(parent) = current {
            if parent == ancestor {
                return Ok(true);
            }
            steps += 1;
            if steps > self.nodes.len() {
                return Err(XlmapError::structure(format!(
                    "parent chain of {id} is circular"
                )));
            }
            current = self.nodes.get(parent)?.parent();
        }
        Ok(false)
    }

    /// Place `child` at the cursor and move the cursor one column right.
    pub fn place_next_in_row(&mut self, container: NodeId, child: NodeId) -> Result<()> {
        let data = self.container(container)?;
        let (column, row) = (data.current_column(), data.current_row());
        self.place(container, child, column, row)?;
        self.container_mut(container)?
            .set_cursor(column.saturating_add(1), row);
        Ok(())
    }

    /// Place `child` at the cursor and move the cursor one row down.
    pub fn place_next_in_column(&mut self, container: NodeId, child: NodeId) -> Result<()> {
        let data = self.container(container)?;
        let (column, row) = (data.current_column(), data.current_row());
        self.place(container, child, column, row)?;
        self.container_mut(container)?
            .set_cursor(column, row.saturating_add(1));
        Ok(())
    }

    /// Move the cursor to the start of the next local row.
    pub fn next_row(&mut self, container: NodeId) -> Result<()> {
        let data = self.container_mut(container)?;
        let row = data.current_row().saturating_add(1);
        data.set_cursor(0, row);
        Ok(())
    }

    /// Link a placeholder to the one it is merged with in the output.
    pub fn set_merge_with(&mut self, cell: NodeId, other: NodeId) -> Result<()> {
        if cell == other {
            return Err(XlmapError::layout(format!("{cell} cannot merge with itself")));
        }
        if self.nodes.get(other)?.tag() != NodeKindTag::Placeholder {
            return Err(XlmapError::layout(format!("{other} is not a cell")));
        }
        match self.nodes.get_mut(cell)?.kind_mut() {
            NodeKind::Placeholder(data) => {
                data.merge_with = Some(other);
                Ok(())
            }
            _ => Err(XlmapError::layout(format!("{cell} is not a cell"))),
        }
    }

    /// Check the tree is well formed: a root exists, every node is reached
    /// from it exactly once and parent links match placements.
    pub fn validate(&self) -> Result<()> {
        let root = self
            .root
            .ok_or_else(|| XlmapError::structure("the tree has no root"))?;
        let root_node = self.nodes.get(root)?;
        if root_node.parent().is_some() {
            return Err(XlmapError::structure(format!("root {root} has a parent")));
        }

        let mut seen = BTreeSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                return Err(XlmapError::structure(format!("{id} is reachable twice")));
            }
            let node = self.nodes.get(id)?;
            if let Some(data) = node.as_container() {
                for (pos, child) in data.children() {
                    let child_node = self.nodes.get(child)?;
                    if child_node.parent() != Some(id) {
                        return Err(XlmapError::structure(format!(
                            "{child} at ({}, {}) of {id} names {:?} as its parent",
                            pos.column,
                            pos.row,
                            child_node.parent()
                        )));
                    }
                    stack.push(child);
                }
            }
            if let Some(data) = node.as_placeholder() {
                if let Some(other) = data.merge_with {
                    if self.nodes.get(other)?.tag() != NodeKindTag::Placeholder {
                        return Err(XlmapError::structure(format!(
                            "{id} merges with {other}, which is not a cell"
                        )));
                    }
                }
            }
        }

        if let Some(stray) = self.nodes.iter().find(|n| !seen.contains(&n.id())) {
            return Err(XlmapError::structure(format!(
                "{} is not reachable from root {root}",
                stray.id()
            )));
        }
        Ok(())
    }

    pub fn build_rows_model(&self, arena: &mut SlotArena, id: NodeId) -> Result<Chain> {
        self.build_model(arena, id, Axis::Row, 0)
    }

    pub fn build_columns_model(&self, arena: &mut SlotArena, id: NodeId) -> Result<Chain> {
        self.build_model(arena, id, Axis::Column, 0)
    }

    fn build_model(
        &self,
        arena: &mut SlotArena,
        id: NodeId,
        axis: Axis,
        depth: usize,
    ) -> Result<Chain> {
        if depth > self.nodes.len() {
            return Err(XlmapError::structure(format!("{id} is nested in a cycle")));
        }
        let node = self.nodes.get(id)?;
        let mut chain = Chain::new(axis);
        match node.kind() {
            NodeKind::Placeholder(data) => {
                for _ in 0..data.span_on(axis) {
                    let slot = arena.create_for(axis, node)?;
                    chain.push(arena, slot)?;
                }
            }
            NodeKind::Padding => {
                // padding claims a unit but never maps itself onto it
                let slot = arena.create(axis, None, false)?;
                chain.push(arena, slot)?;
            }
            NodeKind::Container(data) => {
                // a sized container reserves its own extent before its
                // children split it; an empty one still takes one unit
                let size = node.props().size_on(axis);
                if size.is_some() || data.is_empty() {
                    let seed = arena.create(axis, size, false)?;
                    arena.associate(seed, id)?;
                    chain.push(arena, seed)?;
                }
                for line in data.lines(axis) {
                    let mut lane = Chain::new(axis);
                    for child in line {
                        let child_chain = self.build_model(arena, child, axis, depth + 1)?;
                        lane.append(arena, child_chain)?;
                    }
                    chain.merge(arena, lane)?;
                    let slots = chain.slot_ids(arena)?;
                    arena.associate_all(slots, id)?;
                }
                if node.props().hidden_on(axis) {
                    for slot in chain.slot_ids(arena)? {
                        arena.set_hidden(slot, true)?;
                    }
                }
                debug!(
                    node = %id,
                    ?axis,
                    slots = chain.len(arena)?,
                    "built container chain"
                );
            }
        }
        Ok(chain)
    }

    /// Store every node's worksheet extent from the numbered slots it maps.
    pub fn resolve_placements(&mut self, arena: &SlotArena) -> Result<()> {
        let ids: Vec<NodeId> = self.nodes.iter().map(CoordinateNode::id).collect();
        for id in ids {
            for axis in [Axis::Row, Axis::Column] {
                let mut start: Option<u32> = None;
                let mut end: Option<u32> = None;
                for slot in arena.slots_of(id, axis) {
                    let index = arena.slot(slot)?.excel_index()?;
                    start = Some(start.map_or(index, |s| s.min(index)));
                    end = Some(end.map_or(index, |e| e.max(index)));
                }
                self.nodes
                    .get_mut(id)?
                    .placement_mut()
                    .set_on(axis, start, end);
            }
        }
        Ok(())
    }

    /// Last worksheet column of `id`, following span-to-container requests
    /// up the ancestor chain.
    pub fn end_column_index(&self, id: NodeId) -> Result<Option<u32>> {
        self.end_index(id, Axis::Column, 0)
    }

    /// Last worksheet row of `id`, following span-to-container requests up
    /// the ancestor chain.
    pub fn end_row_index(&self, id: NodeId) -> Result<Option<u32>> {
        self.end_index(id, Axis::Row, 0)
    }

    fn end_index(&self, id: NodeId, axis: Axis, depth: usize) -> Result<Option<u32>> {
        if depth > self.nodes.len() {
            return Err(XlmapError::structure(format!(
                "parent chain of {id} is circular"
            )));
        }
        let node = self.nodes.get(id)?;
        match node.parent() {
            Some(parent) if node.props().spans_last_on(axis) => {
                self.end_index(parent, axis, depth + 1)
            }
            _ => Ok(node.placement().end_on(axis)),
        }
    }

    /// Worksheet range of a node, stretched by its span-to-container
    /// requests. `None` when the node maps no slot (padding).
    pub fn extent(&self, id: NodeId) -> Result<Option<RangeReference>> {
        let placement = *self.nodes.get(id)?.placement();
        let (Some(start_column), Some(start_row)) = (placement.column_start, placement.row_start)
        else {
            return Ok(None);
        };
        let end_column = self.end_column_index(id)?.unwrap_or(start_column);
        let end_row = self.end_row_index(id)?.unwrap_or(start_row);
        Ok(Some(RangeReference::new(
            start_column,
            start_row,
            end_column,
            end_row,
        )))
    }

    /// First node of kind `tag` below `id`, depth first in row-major order.
    pub fn first_descendant(&self, id: NodeId, tag: NodeKindTag) -> Result<Option<NodeId>> {
        let mut stack: Vec<NodeId> = Vec::new();
        let mut visited = 0usize;
        if let Some(data) = self.nodes.get(id)?.as_container() {
            stack.extend(data.children().map(|(_, child)| child).rev());
        }
        while let Some(current) = stack.pop() {
            visited += 1;
            if visited > self.nodes.len() {
                return Err(XlmapError::structure(format!("{id} contains a cycle")));
            }
            let node = self.nodes.get(current)?;
            if node.tag() == tag {
                return Ok(Some(current));
            }
            if let Some(data) = node.as_container() {
                stack.extend(data.children().map(|(_, child)| child).rev());
            }
        }
        Ok(None)
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

    fn cell(tree: &mut MapTree, width: Option<f64>, height: Option<f64>) -> NodeId {
        tree.add_placeholder(NodeProps::sized(width, height), PlaceholderData::default())
            .unwrap()
    }

    #[test]
    fn test_two_cells_in_a_row() {
        let mut tree = MapTree::new();
        let root = tree.add_container(NodeProps::default()).unwrap();
        tree.set_root(root).unwrap();
        let a = cell(&mut tree, Some(10.0), None);
        let b = cell(&mut tree, Some(20.0), None);
        tree.place_next_in_row(root, a).unwrap();
        tree.place_next_in_row(root, b).unwrap();
        tree.validate().unwrap();

        let mut arena = SlotArena::new();
        let columns = tree.build_columns_model(&mut arena, root).unwrap();
        let ids = columns.slot_ids(&arena).unwrap();
        assert_eq!(ids.len(), 2);
        let first = arena.slot(ids[0]).unwrap();
        let second = arena.slot(ids[1]).unwrap();
        assert_eq!(first.size(), Some(10.0));
        assert_eq!(second.size(), Some(20.0));
        assert_eq!(first.maps().iter().copied().collect::<Vec<_>>(), vec![root, a]);
        assert_eq!(second.maps().iter().copied().collect::<Vec<_>>(), vec![root, b]);
        assert_eq!(columns.count(&mut arena).unwrap(), 2);
        arena.check_consistency().unwrap();
    }

    #[test]
    fn test_stacked_cells_share_columns() {
        let mut tree = MapTree::new();
        let root = tree.add_container(NodeProps::default()).unwrap();
        tree.set_root(root).unwrap();
        let wide = cell(&mut tree, Some(30.0), None);
        let narrow = cell(&mut tree, Some(10.0), None);
        tree.place_next_in_column(root, wide).unwrap();
        tree.place_next_in_column(root, narrow).unwrap();

        let mut arena = SlotArena::new();
        let columns = tree.build_columns_model(&mut arena, root).unwrap();
        let sizes: Vec<Option<f64>> = columns
            .iter(&arena)
            .map(|id| arena.slot(id).unwrap().size())
            .collect();
        assert_eq!(sizes, vec![Some(10.0), Some(20.0)]);
        let rows = tree.build_rows_model(&mut arena, root).unwrap();
        assert_eq!(rows.len(&arena).unwrap(), 2);
    }

    #[test]
    fn test_padding_claims_no_map() {
        let mut tree = MapTree::new();
        let root = tree.add_container(NodeProps::default()).unwrap();
        tree.set_root(root).unwrap();
        let pad = tree.add_padding().unwrap();
        tree.place(root, pad, 0, 0).unwrap();

        let mut arena = SlotArena::new();
        let chain = tree.build_rows_model(&mut arena, pad).unwrap();
        let slot = arena.slot(chain.first().unwrap()).unwrap();
        assert!(slot.maps().is_empty());
        assert_eq!(slot.size(), None);
    }

    #[test]
    fn test_hidden_container_hides_its_slots() {
        let mut tree = MapTree::new();
        let root = tree.add_container(NodeProps {
            row_hidden: true,
            ..NodeProps::default()
        })
        .unwrap();
        tree.set_root(root).unwrap();
        let a = cell(&mut tree, None, Some(12.0));
        tree.place(root, a, 0, 0).unwrap();

        let mut arena = SlotArena::new();
        let rows = tree.build_rows_model(&mut arena, root).unwrap();
        assert!(rows.iter(&arena).all(|id| arena.slot(id).unwrap().hidden()));
        let columns = tree.build_columns_model(&mut arena, root).unwrap();
        assert!(columns.iter(&arena).all(|id| !arena.slot(id).unwrap().hidden()));
    }

    #[test]
    fn test_sized_container_seeds_its_chain() {
        let mut tree = MapTree::new();
        let root = tree.add_container(NodeProps::sized(Some(100.0), None)).unwrap();
        tree.set_root(root).unwrap();
        let a = cell(&mut tree, Some(30.0), None);
        let b = cell(&mut tree, None, None);
        tree.place_next_in_row(root, a).unwrap();
        tree.place_next_in_row(root, b).unwrap();

        let mut arena = SlotArena::new();
        let columns = tree.build_columns_model(&mut arena, root).unwrap();
        let shape: Vec<(Option<f64>, usize)> = columns
            .iter(&arena)
            .map(|id| {
                let slot = arena.slot(id).unwrap();
                (slot.size(), slot.maps().len())
            })
            .collect();
        assert_eq!(shape, vec![(Some(30.0), 2), (Some(70.0), 2)]);
    }

    #[test]
    fn test_empty_container_occupies_one_unit() {
        let mut tree = MapTree::new();
        let root = tree.add_container(NodeProps::default()).unwrap();
        tree.set_root(root).unwrap();
        let mut arena = SlotArena::new();
        let rows = tree.build_rows_model(&mut arena, root).unwrap();
        assert_eq!(rows.len(&arena).unwrap(), 1);
        assert_eq!(arena.rows_of(root).count(), 1);
    }

    #[test]
    fn test_validate_rejects_stray_and_rootless_trees() {
        let mut tree = MapTree::new();
        let root = tree.add_container(NodeProps::default()).unwrap();
        assert!(matches!(tree.validate(), Err(XlmapError::Structure(_))));
        tree.set_root(root).unwrap();
        let _stray = tree.add_padding().unwrap();
        assert!(matches!(tree.validate(), Err(XlmapError::Structure(_))));
    }

    #[test]
    fn test_place_rejects_occupied_and_second_parent() {
        let mut tree = MapTree::new();
        let root = tree.add_container(NodeProps::default()).unwrap();
        let other = tree.add_container(NodeProps::default()).unwrap();
        let a = cell(&mut tree, None, None);
        let b = cell(&mut tree, None, None);
        tree.place(root, a, 0, 0).unwrap();
        assert!(tree.place(root, b, 0, 0).is_err());
        assert!(tree.place(other, a, 0, 0).is_err());
        assert!(tree.place(a, b, 0, 0).is_err());
    }

    #[test]
    fn test_zero_span_is_rejected() {
        let mut tree = MapTree::new();
        let result = tree.add_placeholder(
            NodeProps::default(),
            PlaceholderData {
                row_span: 0,
                ..PlaceholderData::default()
            },
        );
        assert!(matches!(result, Err(XlmapError::Invariant(_))));
    }

    #[test]
    fn test_end_index_follows_span_requests() {
        let mut tree = MapTree::new();
        let root = tree.add_container(NodeProps::default()).unwrap();
        tree.set_root(root).unwrap();
        let a = cell(&mut tree, Some(10.0), None);
        let b = tree
            .add_placeholder(
                NodeProps {
                    span_last_column: true,
                    ..NodeProps::default()
                },
                PlaceholderData::default(),
            )
            .unwrap();
        let c = cell(&mut tree, Some(10.0), None);
        tree.place(root, a, 0, 0).unwrap();
        tree.place(root, c, 1, 0).unwrap();
        tree.place(root, b, 0, 1).unwrap();

        let mut arena = SlotArena::new();
        let columns = tree.build_columns_model(&mut arena, root).unwrap();
        let rows = tree.build_rows_model(&mut arena, root).unwrap();
        columns.count(&mut arena).unwrap();
        rows.count(&mut arena).unwrap();
        tree.resolve_placements(&arena).unwrap();

        assert_eq!(tree.node(b).unwrap().placement().column_end, Some(1));
        assert_eq!(tree.end_column_index(b).unwrap(), Some(2));
        assert_eq!(tree.end_column_index(a).unwrap(), Some(1));
        assert_eq!(tree.end_row_index(b).unwrap(), Some(2));
    }

    #[test]
    fn test_first_descendant_is_row_major() {
        let mut tree = MapTree::new();
        let root = tree.add_container(NodeProps::default()).unwrap();
        let inner = tree.add_container(NodeProps::default()).unwrap();
        let deep = cell(&mut tree, None, None);
        let later = cell(&mut tree, None, None);
        tree.place(root, inner, 0, 0).unwrap();
        tree.place(root, later, 1, 0).unwrap();
        tree.place(inner, deep, 0, 0).unwrap();
        assert_eq!(
            tree.first_descendant(root, NodeKindTag::Placeholder).unwrap(),
            Some(deep)
        );
        assert_eq!(
            tree.first_descendant(root, NodeKindTag::Container).unwrap(),
            Some(inner)
        );
        assert_eq!(tree.first_descendant(later, NodeKindTag::Padding).unwrap(), None);
    }

    fn spanning_container(tree: &mut MapTree) -> NodeId {
        tree.add_container(NodeProps {
            span_last_column: true,
            ..NodeProps::default()
        })
        .unwrap()
    }

    #[test]
    fn test_place_rejects_ancestor_as_child() {
        let mut tree = MapTree::new();
        let root = tree.add_container(NodeProps::default()).unwrap();
        tree.set_root(root).unwrap();
        let outer = tree.add_container(NodeProps::default()).unwrap();
        let inner = tree.add_container(NodeProps::default()).unwrap();
        tree.place(root, outer, 0, 0).unwrap();
        tree.place(outer, inner, 0, 0).unwrap();

        let err = tree.place(inner, outer, 0, 0).unwrap_err();
        assert!(matches!(err, XlmapError::Structure(_)), "{err}");
        // a loose pair is caught as well
        let a = tree.add_container(NodeProps::default()).unwrap();
        let b = tree.add_container(NodeProps::default()).unwrap();
        tree.place(a, b, 0, 0).unwrap();
        assert!(matches!(tree.place(b, a, 0, 0), Err(XlmapError::Structure(_))));
        assert_eq!(tree.node(a).unwrap().parent(), None);
    }

    #[test]
    fn test_cyclic_parent_chain_is_a_structure_error() {
        let mut tree = MapTree::new();
        let a = spanning_container(&mut tree);
        let b = spanning_container(&mut tree);
        tree.place(a, b, 0, 0).unwrap();
        // wire the back edge directly, since place refuses it
        tree.container_mut(b)
            .unwrap()
            .insert(GridPos::new(0, 0), a)
            .unwrap();
        tree.nodes.get_mut(a).unwrap().set_parent(b).unwrap();

        assert!(matches!(tree.end_column_index(a), Err(XlmapError::Structure(_))));
        let mut arena = SlotArena::new();
        assert!(matches!(
            tree.build_columns_model(&mut arena, a),
            Err(XlmapError::Structure(_))
        ));
        assert!(matches!(
            tree.first_descendant(a, NodeKindTag::Padding),
            Err(XlmapError::Structure(_))
        ));
        assert!(matches!(tree.validate(), Err(XlmapError::Structure(_))));
    }
}
