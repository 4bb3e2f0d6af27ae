//! Coordinate mapping: from a tree of placed layout nodes to numbered
//! worksheet rows and columns.
//!
//! The pass runs bottom-up then top-down:
//! 1. every node builds a row chain and a column chain ([`MapTree::build_rows_model`]),
//!    containers merging their children's chains line by line;
//! 2. the root chains are numbered 1..N ([`Chain::count`]);
//! 3. node placements are read back from the numbered slots;
//! 4. a top-down walk records the nodes covering every cell, row and column
//!    ([`update_layered_cells`]).

mod builder;
mod chain;
mod layered;
mod merge;
mod node;
mod slot;
mod tree;

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::cell_ref::{CompositeRangeReference, RangeReference};
use crate::error::{Result, XlmapError};

pub use builder::build_tree;
pub use chain::{Chain, ChainIter};
pub use layered::{
    update_layered_cells, CellInfo, CellPoint, ColumnInfo, LayeredCellsDictionary,
    LayeredColumnsDictionary, LayeredDictionary, LayeredInfo, LayeredRowsDictionary, Layers,
    RowInfo,
};
pub use node::{
    ContainerData, CoordinateNode, GridPos, NodeId, NodeKind, NodeKindTag, NodeProps, Placement,
    PlaceholderData,
};
pub use slot::{Axis, Slot, SlotArena, SlotId};
pub use tree::MapTree;

/// The result of one mapping pass over a coordinate tree.
#[derive(Debug, Clone)]
pub struct Mapping {
    tree: MapTree,
    arena: SlotArena,
    rows: Chain,
    columns: Chain,
    row_count: u32,
    column_count: u32,
    layers: Layers,
}

/// Run the whole mapping pass over `tree`.
///
/// A failed pass leaves nothing half-applied worth keeping; rebuild the tree
/// and start over.
pub fn map_tree(mut tree: MapTree) -> Result<Mapping> {
    tree.validate()?;
    let root = tree
        .root()
        .ok_or_else(|| XlmapError::structure("the tree has no root"))?;

    let mut arena = SlotArena::new();
    let rows = tree.build_rows_model(&mut arena, root)?;
    let columns = tree.build_columns_model(&mut arena, root)?;
    let row_count = rows.count(&mut arena)?;
    let column_count = columns.count(&mut arena)?;
    arena.check_consistency()?;

    tree.resolve_placements(&arena)?;
    let mut layers = Layers::default();
    update_layered_cells(&tree, &arena, &mut layers)?;

    info!(
        nodes = tree.len(),
        slots = arena.len(),
        rows = row_count,
        columns = column_count,
        "mapped layout"
    );

    Ok(Mapping {
        tree,
        arena,
        rows,
        columns,
        row_count,
        column_count,
        layers,
    })
}

impl Mapping {
    #[must_use]
    pub fn tree(&self) -> &MapTree {
        &self.tree
    }

    #[must_use]
    pub fn arena(&self) -> &SlotArena {
        &self.arena
    }

    #[must_use]
    pub fn row_chain(&self) -> Chain {
        self.rows
    }

    #[must_use]
    pub fn column_chain(&self) -> Chain {
        self.columns
    }

    #[must_use]
    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    #[must_use]
    pub fn column_count(&self) -> u32 {
        self.column_count
    }

    #[must_use]
    pub fn layers(&self) -> &Layers {
        &self.layers
    }

    /// The tree for reading, the layers for filling in.
    pub(crate) fn split_layers(&mut self) -> (&MapTree, &mut Layers) {
        (&self.tree, &mut self.layers)
    }

    /// Final row slots, in worksheet order.
    pub fn row_slots(&self) -> Result<Vec<&Slot>> {
        self.chain_slots(self.rows)
    }

    /// Final column slots, in worksheet order.
    pub fn column_slots(&self) -> Result<Vec<&Slot>> {
        self.chain_slots(self.columns)
    }

    fn chain_slots(&self, chain: Chain) -> Result<Vec<&Slot>> {
        chain
            .slot_ids(&self.arena)?
            .into_iter()
            .map(|id| self.arena.slot(id))
            .collect()
    }

    /// Worksheet range of a node, stretched by its span-to-container
    /// requests.
    pub fn node_range(&self, id: NodeId) -> Result<Option<RangeReference>> {
        self.tree.extent(id)
    }

    /// Ranges to merge in the output: multi-cell placeholders and
    /// `merge_with` groups. A range overlapping one already taken is dropped.
    pub fn merged_ranges(&self) -> Result<Vec<RangeReference>> {
        let mut parents: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        for node in self.tree.nodes() {
            if let Some(other) = node.as_placeholder().and_then(|p| p.merge_with) {
                let (a, b) = (find_group(&parents, node.id()), find_group(&parents, other));
                if a != b {
                    parents.insert(a.max(b), a.min(b));
                }
            }
        }

        let mut groups: BTreeMap<NodeId, CompositeRangeReference> = BTreeMap::new();
        for node in self.tree.nodes() {
            if node.as_placeholder().is_none() {
                continue;
            }
            if let Some(range) = self.node_range(node.id())? {
                groups
                    .entry(find_group(&parents, node.id()))
                    .or_default()
                    .update(range);
            }
        }

        let mut accepted: Vec<RangeReference> = Vec::new();
        for (owner, composite) in groups {
            let Some(range) = composite.bounds() else {
                continue;
            };
            if range.is_single_cell() {
                continue;
            }
            if let Some(clash) = accepted.iter().find(|r| r.overlaps(&range)) {
                warn!(%owner, %range, %clash, "dropping overlapping merge");
                continue;
            }
            accepted.push(range);
        }
        Ok(accepted)
    }

    /// Defined names with their absolute references, sorted by name. Nodes
    /// sharing a name contribute to one bounding range.
    pub fn defined_names(&self, sheet: &str) -> Result<Vec<(String, String)>> {
        let mut names: BTreeMap<&str, CompositeRangeReference> = BTreeMap::new();
        for node in self.tree.nodes() {
            let Some(name) = node.props().defined_name.as_deref() else {
                continue;
            };
            if let Some(range) = self.node_range(node.id())? {
                names.entry(name).or_default().update(range);
            }
        }
        Ok(names
            .into_iter()
            .filter_map(|(name, composite)| {
                composite
                    .bounds()
                    .map(|range| (name.to_string(), range.absolute(sheet)))
            })
            .collect())
    }
}

/// Representative of the merge group `id` belongs to. Links always point at
/// a lower id, so the walk ends.
fn find_group(parents: &BTreeMap<NodeId, NodeId>, id: NodeId) -> NodeId {
    let mut current = id;
    while let Some(&parent) = parents.get(&current) {
        if parent >= current {
            break;
        }
        current = parent;
    }
    current
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

    fn cell(tree: &mut MapTree, props: NodeProps, column_span: u32) -> NodeId {
        tree.add_placeholder(
            props,
            PlaceholderData {
                column_span,
                ..PlaceholderData::default()
            },
        )
        .unwrap()
    }

    /// Place `cells` left to right in a new row container stacked under `root`.
    fn line(tree: &mut MapTree, root: NodeId, cells: &[NodeId]) -> NodeId {
        let row = tree.add_container(NodeProps::default()).unwrap();
        for cell in cells {
            tree.place_next_in_row(row, *cell).unwrap();
        }
        tree.place_next_in_column(root, row).unwrap();
        row
    }

    #[test]
    fn test_merged_ranges_from_spans_and_links() {
        let mut tree = MapTree::new();
        let root = tree.add_container(NodeProps::default()).unwrap();
        tree.set_root(root).unwrap();
        let header = cell(&mut tree, NodeProps::default(), 3);
        tree.place_next_in_column(root, header).unwrap();
        let a = cell(&mut tree, NodeProps::default(), 1);
        let b = cell(&mut tree, NodeProps::default(), 1);
        let c = cell(&mut tree, NodeProps::default(), 1);
        line(&mut tree, root, &[a, b, c]);
        tree.set_merge_with(a, b).unwrap();

        let mapping = map_tree(tree).unwrap();
        assert_eq!(mapping.column_count(), 3);
        assert_eq!(mapping.row_count(), 2);
        let merged: Vec<String> = mapping
            .merged_ranges()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(merged, vec!["A1:C1", "A2:B2"]);
    }

    #[test]
    fn test_overlapping_merge_is_dropped() {
        let mut tree = MapTree::new();
        let root = tree.add_container(NodeProps::default()).unwrap();
        tree.set_root(root).unwrap();
        let x = cell(&mut tree, NodeProps::default(), 1);
        let y = cell(&mut tree, NodeProps::default(), 1);
        line(&mut tree, root, &[x, y]);
        let z = cell(&mut tree, NodeProps::default(), 2);
        tree.place_next_in_column(root, z).unwrap();
        let w = cell(&mut tree, NodeProps::default(), 1);
        let v = cell(&mut tree, NodeProps::default(), 1);
        line(&mut tree, root, &[w, v]);
        tree.set_merge_with(x, z).unwrap();
        tree.set_merge_with(y, w).unwrap();

        let mapping = map_tree(tree).unwrap();
        let merged: Vec<String> = mapping
            .merged_ranges()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        // {x, z} covers A1:B2; {y, w} would cover A1:B3 and loses
        assert_eq!(merged, vec!["A1:B2"]);
    }

    #[test]
    fn test_defined_names_cover_all_named_nodes() {
        let mut tree = MapTree::new();
        let root = tree.add_container(NodeProps::default()).unwrap();
        tree.set_root(root).unwrap();
        let named = NodeProps {
            defined_name: Some("Totals".to_string()),
            ..NodeProps::default()
        };
        let a = cell(&mut tree, named.clone(), 1);
        let gap = cell(&mut tree, NodeProps::default(), 1);
        let b = cell(&mut tree, named, 1);
        tree.place_next_in_column(root, a).unwrap();
        tree.place_next_in_column(root, gap).unwrap();
        tree.place_next_in_column(root, b).unwrap();

        let mapping = map_tree(tree).unwrap();
        assert_eq!(
            mapping.defined_names("Sheet1").unwrap(),
            vec![("Totals".to_string(), "Sheet1!$A$1:$A$3".to_string())]
        );
    }

    #[test]
    fn test_span_last_column_stretches_range() {
        let mut tree = MapTree::new();
        let root = tree.add_container(NodeProps::default()).unwrap();
        tree.set_root(root).unwrap();
        let title = cell(
            &mut tree,
            NodeProps {
                span_last_column: true,
                ..NodeProps::default()
            },
            1,
        );
        tree.place_next_in_column(root, title).unwrap();
        let a = cell(&mut tree, NodeProps::sized(Some(10.0), None), 1);
        let b = cell(&mut tree, NodeProps::sized(Some(10.0), None), 1);
        line(&mut tree, root, &[a, b]);

        let mapping = map_tree(tree).unwrap();
        assert_eq!(mapping.column_count(), 2);
        assert_eq!(mapping.node_range(title).unwrap().unwrap().to_string(), "A1:B1");
        let merged = mapping.merged_ranges().unwrap();
        assert_eq!(merged[0].to_string(), "A1:B1");
        let layers = mapping.layers();
        assert_eq!(
            layers.cells.get(&CellPoint::new(2, 1)).unwrap().innermost(),
            Some(title)
        );
    }
}
