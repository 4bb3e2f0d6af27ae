//! Tests for the layout readers.
//!
//! Layout XML:
//! ```xml
//! <layout>
//!   <panel|row|column> ... </panel|row|column>
//!   <table><tr><td/></tr></table>
//!   <cell type="number">42</cell>
//!   <padding/>
//! </layout>
//! ```
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

use test_case::test_case;
use xlmap::{
    parse_layout, parse_layout_json, parse_layout_xml, BorderStyle, CellValue, HAlign,
    LayoutElement, VAlign, XlmapError,
};

fn only_child(xml: &str) -> LayoutElement {
    let mut layout = parse_layout_xml(&format!("<layout>{xml}</layout>")).unwrap();
    assert_eq!(layout.children.len(), 1);
    layout.children.remove(0)
}

fn only_cell(xml: &str) -> xlmap::CellElement {
    match only_child(xml) {
        LayoutElement::Cell(cell) => cell,
        other => panic!("expected a cell, got {}", other.type_name()),
    }
}

// ============================================================================
// ELEMENTS
// ============================================================================

#[test_case("<panel/>", "panel")]
#[test_case("<row></row>", "row")]
#[test_case("<column/>", "column")]
#[test_case("<table/>", "table")]
#[test_case("<cell/>", "cell")]
#[test_case("<padding/>", "padding")]
fn test_element_types(xml: &str, expected: &str) {
    assert_eq!(only_child(xml).type_name(), expected);
}

#[test]
fn test_deep_nesting() {
    let element = only_child(
        "<panel><column><row><panel><cell>deep</cell></panel></row></column></panel>",
    );
    let mut current = &element;
    let mut path = Vec::new();
    loop {
        path.push(current.type_name());
        current = match current {
            LayoutElement::Panel(c) | LayoutElement::Row(c) | LayoutElement::Column(c) => {
                &c.children[0]
            }
            _ => break,
        };
    }
    assert_eq!(path, vec!["panel", "column", "row", "panel", "cell"]);
}

// ============================================================================
// CELL VALUES
// ============================================================================

#[test_case(r#"<cell>plain</cell>"#, Some(CellValue::Text("plain".into())) ; "text content")]
#[test_case(r#"<cell value="attr"/>"#, Some(CellValue::Text("attr".into())) ; "value attribute")]
#[test_case(r#"<cell type="number"> 12.5 </cell>"#, Some(CellValue::Number(12.5)) ; "number")]
#[test_case(r#"<cell type="bool">0</cell>"#, Some(CellValue::Bool(false)) ; "bool")]
#[test_case(r#"<cell>Fish &amp; Chips</cell>"#, Some(CellValue::Text("Fish & Chips".into())) ; "entity")]
#[test_case(r#"<cell><![CDATA[a < b]]></cell>"#, Some(CellValue::Text("a < b".into())) ; "cdata")]
#[test_case("<cell>\n   </cell>", None ; "whitespace only")]
#[test_case(r#"<cell value="wins">loses</cell>"#, Some(CellValue::Text("wins".into())) ; "attribute beats content")]
fn test_cell_values(xml: &str, expected: Option<CellValue>) {
    assert_eq!(only_cell(xml).value, expected);
}

// ============================================================================
// ATTRIBUTES
// ============================================================================

#[test]
fn test_geometry_attributes() {
    let cell = only_cell(
        r#"<cell id="c1" width="64" height="18.5" colSpan="3" rowSpan="2"
                hiddenRow="1" hiddenColumn="false" spanLastColumn="true"
                spanLastRow="0" name="Block" mergeWith="c2"/>"#,
    );
    assert_eq!(cell.id.as_deref(), Some("c1"));
    assert_eq!(cell.props.width, Some(64.0));
    assert_eq!(cell.props.height, Some(18.5));
    assert_eq!(cell.col_span, Some(3));
    assert_eq!(cell.row_span, Some(2));
    assert!(cell.props.hidden_row);
    assert!(!cell.props.hidden_column);
    assert!(cell.props.span_last_column);
    assert!(!cell.props.span_last_row);
    assert_eq!(cell.props.name.as_deref(), Some("Block"));
    assert_eq!(cell.merge_with.as_deref(), Some("c2"));
}

#[test]
fn test_format_attributes() {
    let cell = only_cell(
        r##"<cell bold="true" italic="1" fontColor="#112233" fontSize="14"
                fontFamily="Arial" fill="#FFEEDD" hAlign="center" vAlign="top"
                wrap="true" numberFormat="0.00%" border="dashed" borderColor="#000"/>"##,
    );
    let format = cell.props.format;
    assert_eq!(format.bold, Some(true));
    assert_eq!(format.italic, Some(true));
    assert_eq!(format.font_color.as_deref(), Some("#112233"));
    assert_eq!(format.font_size, Some(14.0));
    assert_eq!(format.font_family.as_deref(), Some("Arial"));
    assert_eq!(format.fill.as_deref(), Some("#FFEEDD"));
    assert_eq!(format.h_align, Some(HAlign::Center));
    assert_eq!(format.v_align, Some(VAlign::Top));
    assert_eq!(format.wrap, Some(true));
    assert_eq!(format.number_format.as_deref(), Some("0.00%"));
    let border = format.border.unwrap();
    assert_eq!(border.style, BorderStyle::Dashed);
    assert_eq!(border.color.as_deref(), Some("#000"));
}

#[test]
fn test_border_color_without_border_is_ignored() {
    let cell = only_cell(r##"<cell borderColor="#000"/>"##);
    assert!(cell.props.format.border.is_none());
}

// ============================================================================
// ERRORS
// ============================================================================

#[test_case("<layout><tr/></layout>" ; "tr outside table")]
#[test_case("<layout><table><td/></table></layout>" ; "td outside tr")]
#[test_case("<layout><table><tr><cell/></tr></table></layout>" ; "cell inside tr")]
#[test_case("<layout><padding><cell/></padding></layout>" ; "child of padding")]
#[test_case("<layout><padding>text</padding></layout>" ; "text in padding")]
#[test_case("<layout><row>" ; "unclosed")]
#[test_case(r#"<layout><cell bold="yes"/></layout>"# ; "bad boolean")]
#[test_case(r#"<layout><cell border="wavy"/></layout>"# ; "bad border")]
#[test_case(r#"<layout><cell vAlign="middle"/></layout>"# ; "bad vertical alignment")]
#[test_case(r#"<layout><cell colSpan="-1"/></layout>"# ; "negative span")]
#[test_case(r#"<layout><cell type="bool">maybe</cell></layout>"# ; "bad bool content")]
fn test_invalid_xml_layouts(xml: &str) {
    let err = parse_layout_xml(xml).unwrap_err();
    assert!(matches!(err, XlmapError::Layout(_)), "{xml}: {err}");
}

#[test]
fn test_mismatched_tags_are_xml_errors() {
    let err = parse_layout_xml("<layout><row></column></layout>").unwrap_err();
    assert!(matches!(err, XlmapError::Xml(_)), "{err}");
}

// ============================================================================
// JSON
// ============================================================================

#[test]
fn test_json_table() {
    let layout = parse_layout_json(
        r#"{
            "name": "Report",
            "children": [
                {"type": "table", "format": {"border": {"style": "thin"}}, "rows": [
                    {"height": 18, "cells": [{"value": "a"}, {"value": true}]},
                    {"cells": [{"colSpan": 2, "value": 3}]}
                ]}
            ]
        }"#,
    )
    .unwrap();
    assert_eq!(layout.props.name.as_deref(), Some("Report"));
    let LayoutElement::Table(table) = &layout.children[0] else {
        panic!("expected a table");
    };
    assert_eq!(
        table.props.format.border.as_ref().map(|b| b.style),
        Some(BorderStyle::Thin)
    );
    assert_eq!(table.rows[0].props.height, Some(18.0));
    assert_eq!(table.rows[0].cells[1].value, Some(CellValue::Bool(true)));
    assert_eq!(table.rows[1].cells[0].col_span, Some(2));
    assert_eq!(table.rows[1].cells[0].value, Some(CellValue::Number(3.0)));
}

#[test]
fn test_layout_serializes_back_to_the_same_json_shape() {
    let layout = parse_layout_xml(
        r#"<layout><row hiddenRow="true"><cell id="x" bold="true">hi</cell><padding/></row></layout>"#,
    )
    .unwrap();
    let json = serde_json::to_value(&layout).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "children": [
                {"type": "row", "hiddenRow": true, "children": [
                    {"type": "cell", "id": "x", "format": {"bold": true}, "value": "hi"},
                    {"type": "padding"}
                ]}
            ]
        })
    );
}

#[test]
fn test_parse_layout_sniffs_the_format() {
    assert!(parse_layout("  {\"children\": []}").unwrap().children.is_empty());
    assert!(parse_layout("<layout/>").unwrap().children.is_empty());
}
