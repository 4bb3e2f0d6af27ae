//! Translation of a [`Layout`] document into a coordinate tree.

use std::collections::HashMap;

use crate::error::{Result, XlmapError};
use crate::types::{CellElement, ContainerElement, ElementProps, Layout, LayoutElement, TableElement};

use super::node::{NodeId, NodeProps, PlaceholderData};
use super::tree::MapTree;

/// How a container places its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    /// Top to bottom.
    Down,
    /// Left to right.
    Across,
}

/// Build the coordinate tree for `layout`. The root stacks its children
/// top to bottom like a panel.
pub fn build_tree(layout: &Layout) -> Result<MapTree> {
    let mut builder = TreeBuilder::default();
    let root = builder.tree.add_container(node_props(&layout.props)?)?;
    builder.tree.set_root(root)?;
    builder.add_children(root, &layout.children, Flow::Down)?;
    builder.resolve_merges()?;
    Ok(builder.tree)
}

#[derive(Default)]
struct TreeBuilder {
    tree: MapTree,
    cell_ids: HashMap<String, NodeId>,
    merges: Vec<(NodeId, String)>,
}

impl TreeBuilder {
    fn add_children(&mut self, parent: NodeId, children: &[LayoutElement], flow: Flow) -> Result<()> {
        for child in children {
            let id = self.add_element(child)?;
            self.place(parent, id, flow)?;
        }
        Ok(())
    }

    fn place(&mut self, parent: NodeId, child: NodeId, flow: Flow) -> Result<()> {
        match flow {
            Flow::Down => self.tree.place_next_in_column(parent, child),
            Flow::Across => self.tree.place_next_in_row(parent, child),
        }
    }

    fn add_element(&mut self, element: &LayoutElement) -> Result<NodeId> {
        match element {
            LayoutElement::Panel(c) | LayoutElement::Column(c) => self.add_container(c, Flow::Down),
            LayoutElement::Row(c) => self.add_container(c, Flow::Across),
            LayoutElement::Table(table) => self.add_table(table),
            LayoutElement::Cell(cell) => self.add_cell(cell),
            LayoutElement::Padding => self.tree.add_padding(),
        }
    }

    fn add_container(&mut self, element: &ContainerElement, flow: Flow) -> Result<NodeId> {
        let id = self.tree.add_container(node_props(&element.props)?)?;
        self.add_children(id, &element.children, flow)?;
        Ok(id)
    }

    fn add_table(&mut self, table: &TableElement) -> Result<NodeId> {
        let id = self.tree.add_container(node_props(&table.props)?)?;
        for row in &table.rows {
            let row_id = self.tree.add_container(node_props(&row.props)?)?;
            for cell in &row.cells {
                if cell.row_span.is_some_and(|span| span > 1) {
                    return Err(XlmapError::layout(format!(
                        "table cell {} cannot span rows; nest a column instead",
                        cell.id.as_deref().unwrap_or("without id")
                    )));
                }
                let cell_id = self.add_cell(cell)?;
                self.tree.place_next_in_row(row_id, cell_id)?;
            }
            self.tree.place_next_in_column(id, row_id)?;
        }
        Ok(id)
    }

    fn add_cell(&mut self, cell: &CellElement) -> Result<NodeId> {
        let data = PlaceholderData {
            column_span: span(cell.col_span, "colSpan")?,
            row_span: span(cell.row_span, "rowSpan")?,
            merge_with: None,
            value: cell.value.clone(),
        };
        let id = self.tree.add_placeholder(node_props(&cell.props)?, data)?;
        if let Some(name) = &cell.id {
            if self.cell_ids.insert(name.clone(), id).is_some() {
                return Err(XlmapError::layout(format!("duplicate cell id {name:?}")));
            }
        }
        if let Some(target) = &cell.merge_with {
            self.merges.push((id, target.clone()));
        }
        Ok(id)
    }

    fn resolve_merges(&mut self) -> Result<()> {
        for (cell, target) in std::mem::take(&mut self.merges) {
            let other = self
                .cell_ids
                .get(&target)
                .copied()
                .ok_or_else(|| XlmapError::layout(format!("mergeWith names unknown cell {target:?}")))?;
            self.tree.set_merge_with(cell, other)?;
        }
        Ok(())
    }
}

fn span(value: Option<u32>, what: &str) -> Result<u32> {
    match value {
        None => Ok(1),
        Some(0) => Err(XlmapError::layout(format!("{what} must be at least 1"))),
        Some(n) => Ok(n),
    }
}

fn size(value: Option<f64>, what: &str) -> Result<Option<f64>> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => {
            Err(XlmapError::layout(format!("{what} must be a non-negative number, got {v}")))
        }
        other => Ok(other),
    }
}

fn node_props(props: &ElementProps) -> Result<NodeProps> {
    Ok(NodeProps {
        assigned_width: size(props.width, "width")?,
        assigned_height: size(props.height, "height")?,
        row_hidden: props.hidden_row,
        column_hidden: props.hidden_column,
        span_last_column: props.span_last_column,
        span_last_row: props.span_last_row,
        defined_name: props.name.clone(),
        format: props.format.clone(),
    })
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
    use crate::mapping::node::NodeKindTag;
    use crate::types::TableRow;

    fn cell(id: &str) -> CellElement {
        CellElement {
            id: Some(id.to_string()),
            ..CellElement::default()
        }
    }

    #[test]
    fn test_row_places_children_across() {
        let layout = Layout {
            children: vec![LayoutElement::Row(ContainerElement {
                props: ElementProps::default(),
                children: vec![
                    LayoutElement::Cell(cell("a")),
                    LayoutElement::Padding,
                    LayoutElement::Cell(cell("b")),
                ],
            })],
            ..Layout::default()
        };
        let tree = build_tree(&layout).unwrap();
        tree.validate().unwrap();
        let root = tree.root().unwrap();
        let row = tree.node(root).unwrap().as_container().unwrap().child_at(0, 0).unwrap();
        let data = tree.node(row).unwrap().as_container().unwrap();
        assert_eq!(data.column_count(), 3);
        assert_eq!(data.row_count(), 1);
        let middle = data.child_at(1, 0).unwrap();
        assert_eq!(tree.node(middle).unwrap().tag(), NodeKindTag::Padding);
    }

    #[test]
    fn test_table_rows_stack_down() {
        let layout = Layout {
            children: vec![LayoutElement::Table(TableElement {
                props: ElementProps::default(),
                rows: vec![
                    TableRow {
                        cells: vec![cell("a"), cell("b")],
                        ..TableRow::default()
                    },
                    TableRow {
                        cells: vec![cell("c")],
                        ..TableRow::default()
                    },
                ],
            })],
            ..Layout::default()
        };
        let tree = build_tree(&layout).unwrap();
        let root = tree.root().unwrap();
        let table = tree.node(root).unwrap().as_container().unwrap().child_at(0, 0).unwrap();
        let data = tree.node(table).unwrap().as_container().unwrap();
        assert_eq!(data.row_count(), 2);
        assert_eq!(data.column_count(), 1);
    }

    #[test]
    fn test_table_cell_row_span_is_rejected() {
        let mut spanning = cell("a");
        spanning.row_span = Some(2);
        let layout = Layout {
            children: vec![LayoutElement::Table(TableElement {
                props: ElementProps::default(),
                rows: vec![TableRow {
                    cells: vec![spanning],
                    ..TableRow::default()
                }],
            })],
            ..Layout::default()
        };
        assert!(matches!(build_tree(&layout), Err(XlmapError::Layout(_))));
    }

    #[test]
    fn test_merge_with_resolves_ids() {
        let mut first = cell("a");
        first.merge_with = Some("b".to_string());
        let layout = Layout {
            children: vec![LayoutElement::Cell(first), LayoutElement::Cell(cell("b"))],
            ..Layout::default()
        };
        let tree = build_tree(&layout).unwrap();
        let merged: Vec<_> = tree
            .nodes()
            .filter_map(|n| n.as_placeholder().and_then(|p| p.merge_with))
            .collect();
        assert_eq!(merged.len(), 1);

        let mut dangling = cell("x");
        dangling.merge_with = Some("nope".to_string());
        let layout = Layout {
            children: vec![LayoutElement::Cell(dangling)],
            ..Layout::default()
        };
        assert!(matches!(build_tree(&layout), Err(XlmapError::Layout(_))));
    }

    #[test]
    fn test_bad_sizes_and_spans_are_rejected() {
        let mut zero = cell("z");
        zero.col_span = Some(0);
        let layout = Layout {
            children: vec![LayoutElement::Cell(zero)],
            ..Layout::default()
        };
        assert!(build_tree(&layout).is_err());

        let mut negative = cell("n");
        negative.props.width = Some(-3.0);
        let layout = Layout {
            children: vec![LayoutElement::Cell(negative)],
            ..Layout::default()
        };
        assert!(build_tree(&layout).is_err());

        let layout = Layout {
            children: vec![LayoutElement::Cell(cell("d")), LayoutElement::Cell(cell("d"))],
            ..Layout::default()
        };
        assert!(matches!(build_tree(&layout), Err(XlmapError::Layout(_))));
    }
}
