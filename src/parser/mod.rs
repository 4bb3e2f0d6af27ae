//! Layout description front ends.
//!
//! Both readers produce the same [`Layout`] model; the XML form is the one
//! meant to be written by hand, the JSON form mirrors the serde model
//! directly.

mod layout_xml;

use tracing::debug;

use crate::error::Result;
use crate::types::Layout;

pub use layout_xml::parse_layout_xml;

/// Parse a layout from its JSON form.
///
/// ```
/// let layout = xlmap::parser::parse_layout_json(
///     r#"{"children": [{"type": "cell", "value": "hello"}]}"#,
/// ).unwrap();
/// assert_eq!(layout.children.len(), 1);
/// ```
pub fn parse_layout_json(json: &str) -> Result<Layout> {
    let layout: Layout = serde_json::from_str(json)?;
    debug!(children = layout.children.len(), "parsed JSON layout");
    Ok(layout)
}

/// Parse a layout, picking the reader from the first non-blank character.
pub fn parse_layout(source: &str) -> Result<Layout> {
    if source.trim_start().starts_with('{') {
        parse_layout_json(source)
    } else {
        parse_layout_xml(source)
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
    use crate::error::XlmapError;
    use crate::types::{CellValue, LayoutElement};

    #[test]
    fn test_json_and_xml_agree() {
        let json = r#"{
            "format": {"bold": true},
            "children": [
                {"type": "row", "height": 20, "children": [
                    {"type": "cell", "id": "a", "colSpan": 2, "value": 5},
                    {"type": "padding"}
                ]}
            ]
        }"#;
        let xml = r#"<layout bold="true">
            <row height="20"><cell id="a" colSpan="2" type="number">5</cell><padding/></row>
        </layout>"#;
        let from_json = parse_layout(json).unwrap();
        let from_xml = parse_layout(xml).unwrap();
        assert_eq!(from_json, from_xml);

        let LayoutElement::Row(row) = &from_json.children[0] else {
            panic!("expected a row");
        };
        let LayoutElement::Cell(cell) = &row.children[0] else {
            panic!("expected a cell");
        };
        assert_eq!(cell.value, Some(CellValue::Number(5.0)));
    }

    #[test]
    fn test_unknown_json_type_is_an_error() {
        let err = parse_layout_json(r#"{"children": [{"type": "widget"}]}"#).unwrap_err();
        assert!(matches!(err, XlmapError::Json(_)));
    }
}
