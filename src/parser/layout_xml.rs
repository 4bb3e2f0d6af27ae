//! Layout XML reader.
//!
//! ```xml
//! <layout fontFamily="Arial">
//!   <row height="20" bold="true">
//!     <cell id="title" width="120" colSpan="2">Quarterly report</cell>
//!     <padding/>
//!   </row>
//!   <table border="thin">
//!     <tr><td>Region</td><td type="number">42</td></tr>
//!   </table>
//! </layout>
//! ```
//!
//! Elements are kept on a stack while open and attached to their parent when
//! they close.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Result, XlmapError};
use crate::types::{
    BorderLine, BorderStyle, CellElement, CellFormat, CellValue, ContainerElement, ElementProps,
    HAlign, Layout, LayoutElement, TableElement, TableRow, VAlign,
};
use crate::xml_helpers::{
    attr_bool, attr_f64, attr_flag, attr_string, attr_u32, local_name_string,
};

/// An element still waiting for its closing tag.
enum Frame {
    Root(Layout),
    Panel(ContainerElement),
    Row(ContainerElement),
    Column(ContainerElement),
    Table(TableElement),
    TableRow(TableRow),
    Padding,
    Cell {
        element: CellElement,
        kind: Option<String>,
        text: String,
        in_table: bool,
    },
}

impl Frame {
    fn tag(&self) -> &'static str {
        match self {
            Frame::Root(_) => "layout",
            Frame::Panel(_) => "panel",
            Frame::Row(_) => "row",
            Frame::Column(_) => "column",
            Frame::Table(_) => "table",
            Frame::TableRow(_) => "tr",
            Frame::Padding => "padding",
            Frame::Cell { in_table: true, .. } => "td",
            Frame::Cell { .. } => "cell",
        }
    }
}

/// A closed element ready to be attached.
enum Closed {
    Element(LayoutElement),
    TableRow(TableRow),
    TableCell(CellElement),
}

/// Parse a layout XML document.
pub fn parse_layout_xml(xml: &str) -> Result<Layout> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut stack: Vec<Frame> = Vec::new();
    let mut layout: Option<Layout> = None;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => {
                let frame = open(e, &stack, layout.is_some())?;
                stack.push(frame);
            }
            Event::Empty(ref e) => {
                let frame = open(e, &stack, layout.is_some())?;
                close(frame, &mut stack, &mut layout)?;
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| XlmapError::layout("closing tag without an open element"))?;
                close(frame, &mut stack, &mut layout)?;
            }
            Event::Text(ref t) => {
                let text = t.unescape()?;
                match stack.last_mut() {
                    Some(Frame::Cell { text: buf, .. }) => buf.push_str(&text),
                    Some(frame) if !text.trim().is_empty() => {
                        return Err(XlmapError::layout(format!(
                            "unexpected text {:?} inside <{}>",
                            text.trim(),
                            frame.tag()
                        )));
                    }
                    _ => {}
                }
            }
            Event::CData(ref t) => {
                if let Some(Frame::Cell { text, .. }) = stack.last_mut() {
                    text.push_str(&String::from_utf8_lossy(t));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(XlmapError::layout(format!("<{}> is never closed", open.tag())));
    }
    layout.ok_or_else(|| XlmapError::layout("document has no <layout> element"))
}

/// Turn an opening tag into a frame, checking it may appear where it is.
fn open(e: &BytesStart, stack: &[Frame], finished: bool) -> Result<Frame> {
    let name = local_name_string(e);
    let parent = stack.last();
    if finished {
        return Err(XlmapError::layout(format!("<{name}> after the end of <layout>")));
    }
    let allowed = match (parent, name.as_str()) {
        (None, "layout") => true,
        (None, _) => false,
        (Some(Frame::Table(_)), tag) => tag == "tr",
        (Some(Frame::TableRow(_)), tag) => tag == "td",
        (Some(Frame::Cell { .. } | Frame::Padding), _) => false,
        (Some(_), tag) => matches!(tag, "panel" | "row" | "column" | "table" | "cell" | "padding"),
    };
    if !allowed {
        let inside = parent.map_or("the document", Frame::tag);
        return Err(XlmapError::layout(format!("<{name}> is not allowed inside {inside}")));
    }

    let frame = match name.as_str() {
        "layout" => Frame::Root(Layout {
            props: element_props(e)?,
            children: Vec::new(),
        }),
        "panel" => Frame::Panel(container(e)?),
        "row" => Frame::Row(container(e)?),
        "column" => Frame::Column(container(e)?),
        "table" => Frame::Table(TableElement {
            props: element_props(e)?,
            rows: Vec::new(),
        }),
        "tr" => Frame::TableRow(TableRow {
            props: element_props(e)?,
            cells: Vec::new(),
        }),
        "cell" | "td" => Frame::Cell {
            element: cell_element(e)?,
            kind: attr_string(e, b"type"),
            text: String::new(),
            in_table: name == "td",
        },
        "padding" => Frame::Padding,
        _ => return Err(XlmapError::layout(format!("unknown element <{name}>"))),
    };
    Ok(frame)
}

/// Finish a frame and attach it to its parent (or make it the document).
fn close(frame: Frame, stack: &mut [Frame], layout: &mut Option<Layout>) -> Result<()> {
    let closed = match frame {
        Frame::Root(root) => {
            *layout = Some(root);
            return Ok(());
        }
        Frame::Panel(c) => Closed::Element(LayoutElement::Panel(c)),
        Frame::Row(c) => Closed::Element(LayoutElement::Row(c)),
        Frame::Column(c) => Closed::Element(LayoutElement::Column(c)),
        Frame::Table(t) => Closed::Element(LayoutElement::Table(t)),
        Frame::TableRow(r) => Closed::TableRow(r),
        Frame::Padding => Closed::Element(LayoutElement::Padding),
        Frame::Cell {
            mut element,
            kind,
            text,
            in_table,
        } => {
            if element.value.is_none() && !text.trim().is_empty() {
                element.value = Some(cell_value(kind.as_deref(), &text)?);
            }
            if in_table {
                Closed::TableCell(element)
            } else {
                Closed::Element(LayoutElement::Cell(element))
            }
        }
    };

    match (stack.last_mut(), closed) {
        (Some(Frame::Root(root)), Closed::Element(el)) => root.children.push(el),
        (
            Some(Frame::Panel(c) | Frame::Row(c) | Frame::Column(c)),
            Closed::Element(el),
        ) => c.children.push(el),
        (Some(Frame::Table(t)), Closed::TableRow(r)) => t.rows.push(r),
        (Some(Frame::TableRow(r)), Closed::TableCell(cell)) => r.cells.push(cell),
        _ => return Err(XlmapError::layout("element closed outside its parent")),
    }
    Ok(())
}

fn container(e: &BytesStart) -> Result<ContainerElement> {
    Ok(ContainerElement {
        props: element_props(e)?,
        children: Vec::new(),
    })
}

fn cell_element(e: &BytesStart) -> Result<CellElement> {
    let kind = attr_string(e, b"type");
    let value = attr_string(e, b"value")
        .map(|raw| cell_value(kind.as_deref(), &raw))
        .transpose()?;
    Ok(CellElement {
        props: element_props(e)?,
        id: attr_string(e, b"id"),
        col_span: attr_u32(e, b"colSpan")?,
        row_span: attr_u32(e, b"rowSpan")?,
        merge_with: attr_string(e, b"mergeWith"),
        value,
    })
}

fn cell_value(kind: Option<&str>, raw: &str) -> Result<CellValue> {
    CellValue::parse_as(kind, raw).ok_or_else(|| {
        XlmapError::layout(format!(
            "{raw:?} is not a valid {} value",
            kind.unwrap_or("text")
        ))
    })
}

fn element_props(e: &BytesStart) -> Result<ElementProps> {
    Ok(ElementProps {
        width: attr_f64(e, b"width")?,
        height: attr_f64(e, b"height")?,
        hidden_row: attr_flag(e, b"hiddenRow")?,
        hidden_column: attr_flag(e, b"hiddenColumn")?,
        span_last_column: attr_flag(e, b"spanLastColumn")?,
        span_last_row: attr_flag(e, b"spanLastRow")?,
        name: attr_string(e, b"name"),
        format: cell_format(e)?,
    })
}

fn cell_format(e: &BytesStart) -> Result<CellFormat> {
    let h_align = attr_string(e, b"hAlign")
        .map(|v| HAlign::parse(&v).ok_or_else(|| bad_value("hAlign", &v)))
        .transpose()?;
    let v_align = attr_string(e, b"vAlign")
        .map(|v| VAlign::parse(&v).ok_or_else(|| bad_value("vAlign", &v)))
        .transpose()?;
    let border = attr_string(e, b"border")
        .map(|v| {
            BorderStyle::parse(&v)
                .map(|style| BorderLine {
                    style,
                    color: attr_string(e, b"borderColor"),
                })
                .ok_or_else(|| bad_value("border", &v))
        })
        .transpose()?;
    Ok(CellFormat {
        bold: attr_bool(e, b"bold")?,
        italic: attr_bool(e, b"italic")?,
        font_color: attr_string(e, b"fontColor"),
        font_size: attr_f64(e, b"fontSize")?,
        font_family: attr_string(e, b"fontFamily"),
        fill: attr_string(e, b"fill"),
        h_align,
        v_align,
        wrap: attr_bool(e, b"wrap")?,
        number_format: attr_string(e, b"numberFormat"),
        border,
    })
}

fn bad_value(attr: &str, value: &str) -> XlmapError {
    XlmapError::layout(format!("{value:?} is not a valid {attr}"))
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

    #[test]
    fn test_nested_document() {
        let xml = r##"<?xml version="1.0"?>
            <layout fill="#FFFFFF">
              <row height="20" bold="true">
                <cell id="a" width="80" colSpan="2">Name &amp; title</cell>
                <padding/>
                <cell type="number" value="3.5"/>
              </row>
              <column hiddenColumn="1"/>
            </layout>"##;
        let layout = parse_layout_xml(xml).unwrap();
        assert_eq!(layout.props.format.fill.as_deref(), Some("#FFFFFF"));
        assert_eq!(layout.children.len(), 2);

        let LayoutElement::Row(row) = &layout.children[0] else {
            panic!("expected a row");
        };
        assert_eq!(row.props.height, Some(20.0));
        assert_eq!(row.props.format.bold, Some(true));
        assert_eq!(row.children.len(), 3);
        let LayoutElement::Cell(first) = &row.children[0] else {
            panic!("expected a cell");
        };
        assert_eq!(first.id.as_deref(), Some("a"));
        assert_eq!(first.col_span, Some(2));
        assert_eq!(first.value, Some(CellValue::Text("Name & title".into())));
        assert_eq!(row.children[1], LayoutElement::Padding);
        let LayoutElement::Cell(third) = &row.children[2] else {
            panic!("expected a cell");
        };
        assert_eq!(third.value, Some(CellValue::Number(3.5)));

        let LayoutElement::Column(column) = &layout.children[1] else {
            panic!("expected a column");
        };
        assert!(column.props.hidden_column);
    }

    #[test]
    fn test_table_document() {
        let xml = r##"<layout><table border="medium" borderColor="#333333">
            <tr height="18"><td>Region</td><td type="bool">true</td></tr>
            <tr><td colSpan="2" mergeWith="x"/></tr>
        </table></layout>"##;
        let layout = parse_layout_xml(xml).unwrap();
        let LayoutElement::Table(table) = &layout.children[0] else {
            panic!("expected a table");
        };
        let border = table.props.format.border.clone().unwrap();
        assert_eq!(border.style, BorderStyle::Medium);
        assert_eq!(border.color.as_deref(), Some("#333333"));
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].props.height, Some(18.0));
        assert_eq!(table.rows[0].cells[1].value, Some(CellValue::Bool(true)));
        assert_eq!(table.rows[1].cells[0].merge_with.as_deref(), Some("x"));
    }

    #[test]
    fn test_misplaced_elements_are_rejected() {
        for xml in [
            "<panel/>",
            "<layout><td/></layout>",
            "<layout><table><cell/></table></layout>",
            "<layout><cell><cell/></cell></layout>",
            "<layout><widget/></layout>",
            "<layout><row>stray</row></layout>",
            "<layout/><layout/>",
            "",
        ] {
            assert!(
                matches!(parse_layout_xml(xml), Err(XlmapError::Layout(_))),
                "{xml} should be rejected"
            );
        }
    }

    #[test]
    fn test_bad_attribute_values_are_rejected() {
        assert!(parse_layout_xml(r#"<layout><cell width="wide"/></layout>"#).is_err());
        assert!(parse_layout_xml(r#"<layout><cell hAlign="middle"/></layout>"#).is_err());
        assert!(parse_layout_xml(r#"<layout><cell type="number">ten</cell></layout>"#).is_err());
    }
}
