//! Per-coordinate stacks of the nodes covering each cell, row and column.
//!
//! Layers are recorded outer to inner: a container is listed before the
//! nodes nested in it, so later layers are the more specific ones.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{Result, XlmapError};
use crate::types::{CellValue, ResolvedFormat};

use super::node::NodeId;
use super::slot::{Axis, SlotArena};
use super::tree::MapTree;

/// A 1-based worksheet cell. Ordered row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CellPoint {
    pub row: u32,
    pub column: u32,
}

impl CellPoint {
    #[must_use]
    pub fn new(column: u32, row: u32) -> Self {
        Self { row, column }
    }
}

/// Resolved content of one cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellInfo {
    pub format: ResolvedFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<CellValue>,
}

/// Resolved height and visibility of one worksheet row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowInfo {
    /// Height in points, `None` for the sheet default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    pub hidden: bool,
}

/// Resolved width and visibility of one worksheet column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    /// Width in character units, `None` for the sheet default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    pub hidden: bool,
}

/// The nodes covering one key, plus the result a later pass fills in.
#[derive(Debug, Clone, PartialEq)]
pub struct LayeredInfo<R> {
    layers: Vec<NodeId>,
    pub info: Option<R>,
}

impl<R> Default for LayeredInfo<R> {
    fn default() -> Self {
        Self {
            layers: Vec::new(),
            info: None,
        }
    }
}

impl<R> LayeredInfo<R> {
    /// Covering nodes, outermost first.
    #[must_use]
    pub fn layers(&self) -> &[NodeId] {
        &self.layers
    }

    /// The most specific covering node.
    #[must_use]
    pub fn innermost(&self) -> Option<NodeId> {
        self.layers.last().copied()
    }

    pub(crate) fn push(&mut self, node: NodeId) {
        self.layers.push(node);
    }
}

/// Upsert-only map from a coordinate to its layers.
#[derive(Debug, Clone, PartialEq)]
pub struct LayeredDictionary<K: Ord, R> {
    entries: BTreeMap<K, LayeredInfo<R>>,
}

impl<K: Ord, R> Default for LayeredDictionary<K, R> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Copy, R> LayeredDictionary<K, R> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `node` to the layers of `key`, creating the entry if needed.
    /// The same node may be appended more than once.
    pub fn upsert(&mut self, key: K, node: NodeId) -> &mut LayeredInfo<R> {
        let entry = self.entries.entry(key).or_default();
        entry.push(node);
        entry
    }

    /// Entry for `key`, created empty if missing. Adds no layer.
    pub fn ensure(&mut self, key: K) -> &mut LayeredInfo<R> {
        self.entries.entry(key).or_default()
    }

    #[must_use]
    pub fn get(&self, key: &K) -> Option<&LayeredInfo<R>> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut LayeredInfo<R>> {
        self.entries.get_mut(key)
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (K, &LayeredInfo<R>)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (K, &mut LayeredInfo<R>)> {
        self.entries.iter_mut().map(|(k, v)| (*k, v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub type LayeredCellsDictionary = LayeredDictionary<CellPoint, CellInfo>;
pub type LayeredRowsDictionary = LayeredDictionary<u32, RowInfo>;
pub type LayeredColumnsDictionary = LayeredDictionary<u32, ColumnInfo>;

/// All three layer tables of one mapping pass.
#[derive(Debug, Clone, Default)]
pub struct Layers {
    pub cells: LayeredCellsDictionary,
    pub rows: LayeredRowsDictionary,
    pub columns: LayeredColumnsDictionary,
}

/// Walk the tree from the root, outer nodes first, and record every node on
/// every numbered row, column and cell it covers.
pub fn update_layered_cells(tree: &MapTree, arena: &SlotArena, layers: &mut Layers) -> Result<()> {
    let root = tree
        .root()
        .ok_or_else(|| XlmapError::structure("the tree has no root"))?;
    let mut stack = vec![root];
    let mut visited = 0usize;
    while let Some(id) = stack.pop() {
        visited += 1;
        if visited > tree.len() {
            return Err(XlmapError::structure(format!("{root} contains a cycle")));
        }
        let rows = covered(tree, arena, id, Axis::Row)?;
        let columns = covered(tree, arena, id, Axis::Column)?;
        for &row in &rows {
            layers.rows.upsert(row, id);
        }
        for &column in &columns {
            layers.columns.upsert(column, id);
        }
        for &row in &rows {
            for &column in &columns {
                layers.cells.upsert(CellPoint::new(column, row), id);
            }
        }
        if let Some(data) = tree.node(id)?.as_container() {
            let children: Vec<NodeId> = data.children().map(|(_, child)| child).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    Ok(())
}

/// Indices `node` maps on `axis`, extended to the enclosing container's
/// edge when the node asks to span there.
fn covered(tree: &MapTree, arena: &SlotArena, node: NodeId, axis: Axis) -> Result<Vec<u32>> {
    let mut out = arena
        .slots_of(node, axis)
        .map(|slot| arena.slot(slot).and_then(|s| s.excel_index()))
        .collect::<Result<Vec<u32>>>()?;
    out.sort_unstable();
    let end = match axis {
        Axis::Row => tree.end_row_index(node)?,
        Axis::Column => tree.end_column_index(node)?,
    };
    if let (Some(&last), Some(end)) = (out.last(), end) {
        if end > last {
            out.extend(last + 1..=end);
        }
    }
    Ok(out)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::mapping::node::{NodeProps, PlaceholderData};

    #[test]
    fn test_upsert_appends_duplicates() {
        let mut rows = LayeredRowsDictionary::new();
        rows.upsert(3, NodeId(0));
        rows.upsert(3, NodeId(0));
        rows.upsert(1, NodeId(2));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.get(&3).unwrap().layers(), &[NodeId(0), NodeId(0)]);
        assert!(rows.get(&3).unwrap().info.is_none());
        let keys: Vec<u32> = rows.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![1, 3]);
    }

    #[test]
    fn test_layers_run_outer_to_inner() {
        let mut tree = MapTree::new();
        let root = tree.add_container(NodeProps::default()).unwrap();
        tree.set_root(root).unwrap();
        let inner = tree.add_container(NodeProps::default()).unwrap();
        let cell = tree
            .add_placeholder(
                NodeProps::default(),
                PlaceholderData {
                    column_span: 2,
                    ..PlaceholderData::default()
                },
            )
            .unwrap();
        let side = tree
            .add_placeholder(NodeProps::default(), PlaceholderData::default())
            .unwrap();
        tree.place(root, inner, 0, 0).unwrap();
        tree.place(root, side, 1, 0).unwrap();
        tree.place(inner, cell, 0, 0).unwrap();

        let mut arena = SlotArena::new();
        let rows = tree.build_rows_model(&mut arena, root).unwrap();
        let columns = tree.build_columns_model(&mut arena, root).unwrap();
        rows.count(&mut arena).unwrap();
        assert_eq!(columns.count(&mut arena).unwrap(), 3);

        let mut layers = Layers::default();
        update_layered_cells(&tree, &arena, &mut layers).unwrap();
        assert_eq!(
            layers.cells.get(&CellPoint::new(2, 1)).unwrap().layers(),
            &[root, inner, cell]
        );
        assert_eq!(
            layers.cells.get(&CellPoint::new(3, 1)).unwrap().layers(),
            &[root, side]
        );
        assert_eq!(layers.columns.get(&1).unwrap().innermost(), Some(cell));
        assert_eq!(layers.rows.get(&1).unwrap().layers().len(), 4);
        assert_eq!(layers.cells.len(), 3);
    }
}
