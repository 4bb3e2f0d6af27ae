use serde::{Deserialize, Serialize};

use super::{CellFormat, CellValue};

/// Attributes shared by every layout element.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ElementProps {
    /// Width in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Height in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden_row: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden_column: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub span_last_column: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub span_last_row: bool,
    /// Defined name to emit for the element's range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "CellFormat::is_empty")]
    pub format: CellFormat,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(v: &bool) -> bool {
    !*v
}

/// A whole layout document. The root behaves like a panel.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    #[serde(flatten)]
    pub props: ElementProps,
    #[serde(default)]
    pub children: Vec<LayoutElement>,
}

/// One element of a layout document.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LayoutElement {
    /// Children stacked top to bottom.
    Panel(ContainerElement),
    /// Children laid out left to right.
    Row(ContainerElement),
    /// Children stacked top to bottom.
    Column(ContainerElement),
    Table(TableElement),
    Cell(CellElement),
    /// Empty 1x1 filler.
    Padding,
}

impl LayoutElement {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            LayoutElement::Panel(_) => "panel",
            LayoutElement::Row(_) => "row",
            LayoutElement::Column(_) => "column",
            LayoutElement::Table(_) => "table",
            LayoutElement::Cell(_) => "cell",
            LayoutElement::Padding => "padding",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerElement {
    #[serde(flatten)]
    pub props: ElementProps,
    #[serde(default)]
    pub children: Vec<LayoutElement>,
}

/// Grid of cells. Each table row becomes its own row of the grid; cells are
/// placed left to right in document order.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableElement {
    #[serde(flatten)]
    pub props: ElementProps,
    #[serde(default)]
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    #[serde(flatten)]
    pub props: ElementProps,
    #[serde(default)]
    pub cells: Vec<CellElement>,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CellElement {
    #[serde(flatten)]
    pub props: ElementProps,
    /// Document-local identifier other cells can reference in `merge_with`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col_span: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_span: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_with: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<CellValue>,
}
