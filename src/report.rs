//! JSON-serializable summary of a mapping pass.

use serde::Serialize;

use crate::cell_ref::cell_ref;
use crate::error::Result;
use crate::mapping::{
    CellInfo, ColumnInfo, Mapping, NodeId, NodeKindTag, Placement, RowInfo, Slot,
};
use crate::options::MapOptions;

/// Everything a mapping pass decided, flattened for inspection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingReport {
    pub sheet_name: String,
    pub row_count: u32,
    pub column_count: u32,
    pub rows: Vec<AxisEntry<RowInfo>>,
    pub columns: Vec<AxisEntry<ColumnInfo>>,
    pub nodes: Vec<NodeEntry>,
    pub cells: Vec<CellEntry>,
    pub merges: Vec<String>,
    pub defined_names: Vec<DefinedNameEntry>,
}

/// One numbered row or column.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisEntry<R> {
    pub index: u32,
    /// Size in pixels as reconciled from the layout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    pub hidden: bool,
    /// Nodes mapped onto this slot.
    pub nodes: Vec<NodeId>,
    /// Nodes covering the row or column, outer to inner.
    pub layers: Vec<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<R>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeEntry {
    pub id: NodeId,
    pub kind: NodeKindTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    pub placement: Placement,
    /// Placement stretched by span-to-container requests, A1 style.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellEntry {
    pub cell: String,
    pub layers: Vec<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<CellInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DefinedNameEntry {
    pub name: String,
    pub reference: String,
}

impl Mapping {
    /// Build the report for this pass. Row, column and cell `info` is only
    /// present once formats have been resolved.
    pub fn report(&self, options: &MapOptions) -> Result<MappingReport> {
        let layers = self.layers();

        let rows = self
            .row_slots()?
            .into_iter()
            .map(|slot| {
                let index = slot.excel_index()?;
                let entry = layers.rows.get(&index);
                Ok(axis_entry(
                    slot,
                    index,
                    entry.map(|e| e.layers().to_vec()).unwrap_or_default(),
                    entry.and_then(|e| e.info.clone()),
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        let columns = self
            .column_slots()?
            .into_iter()
            .map(|slot| {
                let index = slot.excel_index()?;
                let entry = layers.columns.get(&index);
                Ok(axis_entry(
                    slot,
                    index,
                    entry.map(|e| e.layers().to_vec()).unwrap_or_default(),
                    entry.and_then(|e| e.info.clone()),
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        let nodes = self
            .tree()
            .nodes()
            .map(|node| {
                Ok(NodeEntry {
                    id: node.id(),
                    kind: node.tag(),
                    parent: node.parent(),
                    placement: *node.placement(),
                    range: self.node_range(node.id())?.map(|r| r.to_string()),
                    name: node.props().defined_name.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let cells = layers
            .cells
            .iter()
            .map(|(point, entry)| CellEntry {
                cell: cell_ref(point.column, point.row),
                layers: entry.layers().to_vec(),
                info: entry.info.clone(),
            })
            .collect();

        let merges = self
            .merged_ranges()?
            .iter()
            .map(ToString::to_string)
            .collect();

        let defined_names = self
            .defined_names(&options.sheet_name)?
            .into_iter()
            .map(|(name, reference)| DefinedNameEntry { name, reference })
            .collect();

        Ok(MappingReport {
            sheet_name: options.sheet_name.clone(),
            row_count: self.row_count(),
            column_count: self.column_count(),
            rows,
            columns,
            nodes,
            cells,
            merges,
            defined_names,
        })
    }
}

fn axis_entry<R>(slot: &Slot, index: u32, layers: Vec<NodeId>, info: Option<R>) -> AxisEntry<R> {
    AxisEntry {
        index,
        size: slot.size(),
        hidden: slot.hidden(),
        nodes: slot.maps().iter().copied().collect(),
        layers,
        info,
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
    use crate::mapping::{build_tree, map_tree};
    use crate::parser::parse_layout_xml;
    use crate::styles::resolve_formats;

    #[test]
    fn test_report_shape() {
        let layout = parse_layout_xml(
            r#"<layout>
                <row><cell name="Head" width="40" colSpan="2">Title</cell></row>
                <row><cell>a</cell><cell hiddenColumn="true">b</cell></row>
            </layout>"#,
        )
        .unwrap();
        let options = MapOptions::default();
        let mut mapping = map_tree(build_tree(&layout).unwrap()).unwrap();
        resolve_formats(&mut mapping, &options).unwrap();
        let report = mapping.report(&options).unwrap();

        // the hidden cell threads its own column in front of the header's second
        assert_eq!(report.row_count, 2);
        assert_eq!(report.column_count, 3);
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.columns.len(), 3);
        assert!(report.columns[1].hidden);
        assert!(!report.columns[2].hidden);
        assert_eq!(report.columns[0].size, Some(40.0));
        assert_eq!(report.merges, vec!["A1:C1"]);
        assert_eq!(report.defined_names[0].name, "Head");
        assert_eq!(report.defined_names[0].reference, "Sheet1!$A$1:$C$1");
        assert_eq!(report.cells[0].cell, "A1");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["rowCount"], 2);
        assert_eq!(json["definedNames"][0]["name"], "Head");
        assert!(json["nodes"].as_array().unwrap().len() >= 6);
    }
}
