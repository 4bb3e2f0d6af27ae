//! End-to-end tests for the coordinate mapping pass.
//!
//! Layouts are written in the XML form and mapped with default options; the
//! assertions look at the final row/column chains, node placements and the
//! per-cell layer stacks.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;

use common::{
    assert_mapping_invariants, cell_layers, column_hidden, column_sizes, map, named_node,
    row_sizes,
};
use test_case::test_case;
use xlmap::mapping::{map_tree, MapTree, NodeProps, PlaceholderData};
use xlmap::{build_tree, parse_layout_json, parse_layout_xml, XlmapError};

// ============================================================================
// TREE API
// ============================================================================

/// A container with two cells side by side, widths 10 and 20.
#[test]
fn test_two_cells_in_one_row() {
    let mut tree = MapTree::new();
    let container = tree.add_container(NodeProps::default()).unwrap();
    tree.set_root(container).unwrap();
    let left = tree
        .add_placeholder(NodeProps::sized(Some(10.0), None), PlaceholderData::default())
        .unwrap();
    let right = tree
        .add_placeholder(NodeProps::sized(Some(20.0), None), PlaceholderData::default())
        .unwrap();
    tree.place(container, left, 0, 0).unwrap();
    tree.place(container, right, 1, 0).unwrap();

    let mapping = map_tree(tree).unwrap();
    assert_eq!(mapping.column_count(), 2);
    assert_eq!(mapping.row_count(), 1);

    let columns = mapping.column_slots().unwrap();
    assert_eq!(columns[0].size(), Some(10.0));
    assert_eq!(columns[1].size(), Some(20.0));
    assert_eq!(columns[0].excel_index().unwrap(), 1);
    assert_eq!(columns[1].excel_index().unwrap(), 2);
    assert_eq!(
        columns[0].maps().iter().copied().collect::<Vec<_>>(),
        vec![container, left]
    );
    assert_eq!(
        columns[1].maps().iter().copied().collect::<Vec<_>>(),
        vec![container, right]
    );
    assert_mapping_invariants(&mapping);
}

#[test]
fn test_unplaced_node_is_rejected() {
    let mut tree = MapTree::new();
    let root = tree.add_container(NodeProps::default()).unwrap();
    tree.set_root(root).unwrap();
    tree.add_placeholder(NodeProps::default(), PlaceholderData::default())
        .unwrap();
    assert!(matches!(map_tree(tree), Err(XlmapError::Structure(_))));
}

#[test]
fn test_tree_without_root_is_rejected() {
    let tree = MapTree::new();
    assert!(matches!(map_tree(tree), Err(XlmapError::Structure(_))));
}

// ============================================================================
// SIZE RECONCILIATION
// ============================================================================

/// Two rows of cells with different column boundaries end up on the same
/// columns whichever row comes first.
#[test_case(r#"<row><cell width="30"/><cell width="70"/></row><row><cell width="100"/></row>"#, "A2:B2" ; "split row first")]
#[test_case(r#"<row><cell width="100"/></row><row><cell width="30"/><cell width="70"/></row>"#, "A1:B1" ; "wide row first")]
fn test_boundaries_are_shared(body: &str, wide_range: &str) {
    let mapping = map(&format!("<layout>{body}</layout>"));
    assert_eq!(column_sizes(&mapping), vec![Some(30.0), Some(70.0)]);
    let merged: Vec<String> = mapping
        .merged_ranges()
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(merged, vec![wide_range]);
    assert_mapping_invariants(&mapping);
}

#[test]
fn test_split_sizes_sum_to_widest() {
    let mapping = map(
        r#"<layout>
            <row><cell width="25"/><cell width="25"/><cell width="50"/></row>
            <row><cell width="40"/><cell width="60"/></row>
            <row><cell width="100"/></row>
        </layout>"#,
    );
    let sizes: Vec<f64> = column_sizes(&mapping).into_iter().map(Option::unwrap).collect();
    assert_eq!(sizes, vec![25.0, 15.0, 10.0, 50.0]);
    assert_eq!(sizes.iter().sum::<f64>(), 100.0);
    assert_mapping_invariants(&mapping);
}

#[test]
fn test_unsized_cells_follow_sized_neighbours() {
    let mapping = map(
        r#"<layout>
            <row><cell width="40"/><cell width="60"/></row>
            <row><cell/><cell/></row>
        </layout>"#,
    );
    assert_eq!(column_sizes(&mapping), vec![Some(40.0), Some(60.0)]);
    assert!(mapping.merged_ranges().unwrap().is_empty());
}

#[test]
fn test_row_heights_come_from_containers_and_cells() {
    let mapping = map(
        r#"<layout>
            <row height="20"><cell/><cell/></row>
            <cell height="35"/>
            <cell/>
        </layout>"#,
    );
    assert_eq!(row_sizes(&mapping), vec![Some(20.0), Some(35.0), None]);
}

// ============================================================================
// HIDDEN ROWS AND COLUMNS
// ============================================================================

#[test]
fn test_hidden_cell_gets_its_own_column() {
    let mapping = map(
        r#"<layout>
            <row><cell name="wide" colSpan="2"/></row>
            <row><cell/><cell hiddenColumn="true"/><cell/></row>
        </layout>"#,
    );
    assert_eq!(column_hidden(&mapping), vec![false, true, false]);
    let wide = named_node(&mapping, "wide");
    assert_eq!(mapping.node_range(wide).unwrap().unwrap().to_string(), "A1:C1");
    assert_mapping_invariants(&mapping);
}

#[test]
fn test_hidden_container_hides_every_row() {
    let mapping = map(
        r#"<layout>
            <cell/>
            <column hiddenRow="true"><cell/><cell/></column>
            <cell/>
        </layout>"#,
    );
    let hidden: Vec<bool> = mapping
        .row_slots()
        .unwrap()
        .iter()
        .map(|slot| slot.hidden())
        .collect();
    assert_eq!(hidden, vec![false, true, true, false]);
}

// ============================================================================
// LAYERS AND SPANS
// ============================================================================

#[test]
fn test_layers_run_outer_to_inner() {
    let mapping = map(
        r#"<layout name="root">
            <row name="line"><cell/><cell name="target"/></row>
        </layout>"#,
    );
    let expected = vec![
        named_node(&mapping, "root"),
        named_node(&mapping, "line"),
        named_node(&mapping, "target"),
    ];
    assert_eq!(cell_layers(&mapping, "B1"), expected);
    assert_eq!(cell_layers(&mapping, "A1").len(), 3);
}

#[test]
fn test_span_last_column_reaches_the_container_edge() {
    let mapping = map(
        r#"<layout>
            <cell name="title" spanLastColumn="true">Title</cell>
            <row><cell/><cell/><cell/></row>
        </layout>"#,
    );
    let title = named_node(&mapping, "title");
    assert_eq!(mapping.node_range(title).unwrap().unwrap().to_string(), "A1:C1");
    assert_eq!(cell_layers(&mapping, "C1").last(), Some(&title));
    let merged: Vec<String> = mapping
        .merged_ranges()
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(merged, vec!["A1:C1"]);
}

#[test]
fn test_merge_with_joins_cells() {
    let mapping = map(
        r#"<layout>
            <table>
                <tr><td id="a">a</td><td>b</td></tr>
                <tr><td mergeWith="a"/><td>d</td></tr>
            </table>
        </layout>"#,
    );
    let merged: Vec<String> = mapping
        .merged_ranges()
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(merged, vec!["A1:A2"]);
}

#[test]
fn test_defined_names_are_absolute() {
    let mapping = map(
        r#"<layout>
            <cell/>
            <row name="Totals"><cell/><cell/></row>
        </layout>"#,
    );
    assert_eq!(
        mapping.defined_names("Q1 Report").unwrap(),
        vec![("Totals".to_string(), "'Q1 Report'!$A$2:$B$2".to_string())]
    );
}

// ============================================================================
// INVALID LAYOUTS
// ============================================================================

#[test_case(r#"<layout><cell colSpan="0"/></layout>"# ; "zero span")]
#[test_case(r#"<layout><cell width="-3"/></layout>"# ; "negative width")]
#[test_case(r#"<layout><cell mergeWith="nobody"/></layout>"# ; "unknown merge target")]
#[test_case(r#"<layout><cell id="x"/><cell id="x"/></layout>"# ; "duplicate id")]
#[test_case(r#"<layout><table><tr><td rowSpan="2"/></tr></table></layout>"# ; "row span in table")]
fn test_invalid_layout_is_rejected(xml: &str) {
    let layout = parse_layout_xml(xml).unwrap();
    assert!(matches!(build_tree(&layout), Err(XlmapError::Layout(_))));
}

#[test]
fn test_json_layout_maps_like_xml() {
    let layout = parse_layout_json(
        r#"{"children": [
            {"type": "row", "children": [
                {"type": "cell", "width": 10},
                {"type": "padding"},
                {"type": "cell", "width": 20}
            ]}
        ]}"#,
    )
    .unwrap();
    let mapping = map_tree(build_tree(&layout).unwrap()).unwrap();
    let sizes: Vec<Option<f64>> = mapping
        .column_slots()
        .unwrap()
        .iter()
        .map(|slot| slot.size())
        .collect();
    assert_eq!(sizes, vec![Some(10.0), None, Some(20.0)]);
    // padding claims its column without mapping onto it
    let padding_column = mapping.column_slots().unwrap()[1];
    assert_eq!(padding_column.maps().len(), 2);
}
