//! Coordinate nodes: the placed elements of a layout tree.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{Result, XlmapError};
use crate::store::{store_id, Storable};
use crate::types::{CellFormat, CellValue};

use super::slot::Axis;

store_id!(
    /// Identity of a coordinate node.
    NodeId,
    "node"
);

/// A position in a container's local grid (0-based). Ordered row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GridPos {
    pub row: u32,
    pub column: u32,
}

impl GridPos {
    #[must_use]
    pub fn new(column: u32, row: u32) -> Self {
        Self { row, column }
    }
}

/// What a node asks for, independent of its variant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeProps {
    /// Requested width in pixels.
    pub assigned_width: Option<f64>,
    /// Requested height in pixels.
    pub assigned_height: Option<f64>,
    pub row_hidden: bool,
    pub column_hidden: bool,
    /// Extend to the last column of the enclosing container.
    pub span_last_column: bool,
    /// Extend to the last row of the enclosing container.
    pub span_last_row: bool,
    /// Named range emitted for this node.
    pub defined_name: Option<String>,
    pub format: CellFormat,
}

impl NodeProps {
    #[must_use]
    pub fn sized(width: Option<f64>, height: Option<f64>) -> Self {
        Self {
            assigned_width: width,
            assigned_height: height,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn size_on(&self, axis: Axis) -> Option<f64> {
        match axis {
            Axis::Row => self.assigned_height,
            Axis::Column => self.assigned_width,
        }
    }

    #[must_use]
    pub fn hidden_on(&self, axis: Axis) -> bool {
        match axis {
            Axis::Row => self.row_hidden,
            Axis::Column => self.column_hidden,
        }
    }

    #[must_use]
    pub fn spans_last_on(&self, axis: Axis) -> bool {
        match axis {
            Axis::Row => self.span_last_row,
            Axis::Column => self.span_last_column,
        }
    }
}

/// Children of a container, keyed by local position.
#[derive(Debug, Clone, Default)]
pub struct ContainerData {
    children: BTreeMap<GridPos, NodeId>,
    current_row: u32,
    current_column: u32,
}

impl ContainerData {
    /// Children in row-major order.
    pub fn children(&self) -> impl DoubleEndedIterator<Item = (GridPos, NodeId)> + '_ {
        self.children.iter().map(|(pos, id)| (*pos, *id))
    }

    #[must_use]
    pub fn child_at(&self, column: u32, row: u32) -> Option<NodeId> {
        self.children.get(&GridPos::new(column, row)).copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// One more than the highest occupied local row.
    #[must_use]
    pub fn row_count(&self) -> u32 {
        self.children.keys().map(|p| p.row.saturating_add(1)).max().unwrap_or(0)
    }

    /// One more than the highest occupied local column.
    #[must_use]
    pub fn column_count(&self) -> u32 {
        self.children.keys().map(|p| p.column.saturating_add(1)).max().unwrap_or(0)
    }

    #[must_use]
    pub fn current_row(&self) -> u32 {
        self.current_row
    }

    #[must_use]
    pub fn current_column(&self) -> u32 {
        self.current_column
    }

    /// Group children into the lines that are laid side by side along
    /// `axis`: for columns, one line per local row ordered by column; for
    /// rows, one line per local column ordered by row.
    #[must_use]
    pub fn lines(&self, axis: Axis) -> Vec<Vec<NodeId>> {
        let mut lines: BTreeMap<u32, Vec<(u32, NodeId)>> = BTreeMap::new();
        for (pos, id) in &self.children {
            let (line, along) = match axis {
                Axis::Column => (pos.row, pos.column),
                Axis::Row => (pos.column, pos.row),
            };
            lines.entry(line).or_default().push((along, *id));
        }
        lines
            .into_values()
            .map(|mut line| {
                line.sort_by_key(|(along, _)| *along);
                line.into_iter().map(|(_, id)| id).collect()
            })
            .collect()
    }

    pub(crate) fn insert(&mut self, pos: GridPos, child: NodeId) -> Result<()> {
        if let Some(existing) = self.children.get(&pos) {
            return Err(XlmapError::structure(format!(
                "position ({}, {}) already holds {}",
                pos.column, pos.row, existing
            )));
        }
        self.children.insert(pos, child);
        Ok(())
    }

    pub(crate) fn set_cursor(&mut self, column: u32, row: u32) {
        self.current_column = column;
        self.current_row = row;
    }
}

/// An addressable cell, possibly spanning several rows or columns.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderData {
    pub column_span: u32,
    pub row_span: u32,
    /// Another placeholder this one is merged with in the output.
    pub merge_with: Option<NodeId>,
    pub value: Option<CellValue>,
}

impl Default for PlaceholderData {
    fn default() -> Self {
        Self {
            column_span: 1,
            row_span: 1,
            merge_with: None,
            value: None,
        }
    }
}

impl PlaceholderData {
    #[must_use]
    pub fn span_on(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Row => self.row_span,
            Axis::Column => self.column_span,
        }
    }
}

/// The closed set of node variants.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Container(ContainerData),
    Placeholder(PlaceholderData),
    /// Sizeless 1x1 filler.
    Padding,
}

/// Kind tag used for lookups and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKindTag {
    Container,
    Placeholder,
    Padding,
}

/// Resolved 1-based placement on the worksheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub row_start: Option<u32>,
    pub row_end: Option<u32>,
    pub column_start: Option<u32>,
    pub column_end: Option<u32>,
}

impl Placement {
    #[must_use]
    pub fn start_on(&self, axis: Axis) -> Option<u32> {
        match axis {
            Axis::Row => self.row_start,
            Axis::Column => self.column_start,
        }
    }

    #[must_use]
    pub fn end_on(&self, axis: Axis) -> Option<u32> {
        match axis {
            Axis::Row => self.row_end,
            Axis::Column => self.column_end,
        }
    }

    pub(crate) fn set_on(&mut self, axis: Axis, start: Option<u32>, end: Option<u32>) {
        match axis {
            Axis::Row => {
                self.row_start = start;
                self.row_end = end;
            }
            Axis::Column => {
                self.column_start = start;
                self.column_end = end;
            }
        }
    }
}

/// One element of the coordinate tree.
#[derive(Debug, Clone)]
pub struct CoordinateNode {
    id: NodeId,
    parent: Option<NodeId>,
    kind: NodeKind,
    props: NodeProps,
    placement: Placement,
}

impl Storable for CoordinateNode {
    type Id = NodeId;

    fn id(&self) -> NodeId {
        self.id
    }
}

impl CoordinateNode {
    pub(crate) fn new(id: NodeId, kind: NodeKind, props: NodeProps) -> Self {
        Self {
            id,
            parent: None,
            kind,
            props,
            placement: Placement::default(),
        }
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Attach the node to its owner. A node has exactly one parent.
    pub fn set_parent(&mut self, parent: NodeId) -> Result<()> {
        if parent == self.id {
            return Err(XlmapError::invariant(format!("{} cannot own itself", self.id)));
        }
        if let Some(existing) = self.parent {
            return Err(XlmapError::invariant(format!(
                "{} already belongs to {}",
                self.id, existing
            )));
        }
        self.parent = Some(parent);
        Ok(())
    }

    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    #[must_use]
    pub fn tag(&self) -> NodeKindTag {
        match self.kind {
            NodeKind::Container(_) => NodeKindTag::Container,
            NodeKind::Placeholder(_) => NodeKindTag::Placeholder,
            NodeKind::Padding => NodeKindTag::Padding,
        }
    }

    #[must_use]
    pub fn as_container(&self) -> Option<&ContainerData> {
        match &self.kind {
            NodeKind::Container(data) => Some(data),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_placeholder(&self) -> Option<&PlaceholderData> {
        match &self.kind {
            NodeKind::Placeholder(data) => Some(data),
            _ => None,
        }
    }

    #[must_use]
    pub fn props(&self) -> &NodeProps {
        &self.props
    }

    #[must_use]
    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    pub(crate) fn placement_mut(&mut self) -> &mut Placement {
        &mut self.placement
    }

    /// Size of this node's own local row space.
    #[must_use]
    pub fn map_row_count(&self) -> u32 {
        match &self.kind {
            NodeKind::Container(data) => data.row_count(),
            NodeKind::Placeholder(_) | NodeKind::Padding => 1,
        }
    }

    /// Size of this node's own local column space.
    #[must_use]
    pub fn map_column_count(&self) -> u32 {
        match &self.kind {
            NodeKind::Container(data) => data.column_count(),
            NodeKind::Placeholder(_) | NodeKind::Padding => 1,
        }
    }
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

    #[test]
    fn test_parent_is_set_once() {
        let mut node = CoordinateNode::new(NodeId(2), NodeKind::Padding, NodeProps::default());
        assert!(node.set_parent(NodeId(2)).is_err());
        node.set_parent(NodeId(0)).unwrap();
        assert!(matches!(
            node.set_parent(NodeId(1)),
            Err(XlmapError::Invariant(_))
        ));
        assert_eq!(node.parent(), Some(NodeId(0)));
    }

    #[test]
    fn test_container_lines_per_axis() {
        let mut data = ContainerData::default();
        data.insert(GridPos::new(1, 0), NodeId(1)).unwrap();
        data.insert(GridPos::new(0, 0), NodeId(0)).unwrap();
        data.insert(GridPos::new(0, 1), NodeId(2)).unwrap();
        assert!(data.insert(GridPos::new(0, 1), NodeId(9)).is_err());

        assert_eq!(
            data.lines(Axis::Column),
            vec![vec![NodeId(0), NodeId(1)], vec![NodeId(2)]]
        );
        assert_eq!(
            data.lines(Axis::Row),
            vec![vec![NodeId(0), NodeId(2)], vec![NodeId(1)]]
        );
        assert_eq!(data.row_count(), 2);
        assert_eq!(data.column_count(), 2);
    }

    #[test]
    fn test_atomic_nodes_are_one_by_one() {
        let cell = CoordinateNode::new(
            NodeId(0),
            NodeKind::Placeholder(PlaceholderData {
                column_span: 3,
                ..PlaceholderData::default()
            }),
            NodeProps::default(),
        );
        assert_eq!(cell.map_column_count(), 1);
        assert_eq!(cell.map_row_count(), 1);
        assert_eq!(cell.tag(), NodeKindTag::Placeholder);
    }
}
