//! Generates worksheet XML from a resolved [`Mapping`].
//!
//! Strings are written inline (`t="inlineStr"`) so the package needs no
//! shared string table.

use std::collections::BTreeMap;

use crate::cell_ref::{cell_ref, column_letter, RangeReference};
use crate::error::Result;
use crate::mapping::{CellInfo, CellPoint, Mapping};
use crate::options::MapOptions;
use crate::types::CellValue;
use crate::xml_helpers::escape;

/// Write a complete worksheet XML string.
///
/// `styles` maps each cell to its `cellXfs` index; cells not listed use the
/// default format.
pub(crate) fn write_sheet_xml(
    mapping: &Mapping,
    options: &MapOptions,
    styles: &BTreeMap<CellPoint, u32>,
    merges: &[RangeReference],
) -> Result<String> {
    let mut out = String::with_capacity(4096);
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(
        r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
    );
    out.push_str(
        r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
    );
    out.push('\n');

    // <dimension>
    if mapping.row_count() > 0 && mapping.column_count() > 0 {
        out.push_str(&format!(
            "<dimension ref=\"A1:{}\"/>\n",
            cell_ref(mapping.column_count(), mapping.row_count())
        ));
    }

    // <sheetFormatPr>
    out.push_str(&format!(
        "<sheetFormatPr defaultRowHeight=\"{}\" defaultColWidth=\"{}\"/>\n",
        options.default_row_height, options.default_column_width
    ));

    write_cols(&mut out, mapping, options);

    // <sheetData>
    out.push_str("<sheetData>\n");
    write_sheet_data(&mut out, mapping, options, styles);
    out.push_str("</sheetData>\n");

    // <mergeCells>
    if !merges.is_empty() {
        out.push_str(&format!("<mergeCells count=\"{}\">\n", merges.len()));
        for merge in merges {
            out.push_str(&format!("<mergeCell ref=\"{merge}\"/>\n"));
        }
        out.push_str("</mergeCells>\n");
    }

    out.push_str("</worksheet>");
    Ok(out)
}

/// `<cols>`: one entry per column with a custom width or hidden flag.
fn write_cols(out: &mut String, mapping: &Mapping, options: &MapOptions) {
    let custom: Vec<_> = mapping
        .layers()
        .columns
        .iter()
        .filter_map(|(column, entry)| entry.info.as_ref().map(|info| (column, info)))
        .filter(|(_, info)| info.width.is_some() || info.hidden)
        .collect();
    if custom.is_empty() {
        return;
    }

    out.push_str("<cols>\n");
    for (column, info) in custom {
        out.push_str(&format!("<col min=\"{column}\" max=\"{column}\""));
        match info.width {
            Some(width) => out.push_str(&format!(" width=\"{width}\" customWidth=\"1\"")),
            None => out.push_str(&format!(" width=\"{}\"", options.default_column_width)),
        }
        if info.hidden {
            out.push_str(" hidden=\"1\"");
        }
        out.push_str("/>\n");
    }
    out.push_str("</cols>\n");
}

/// Write all rows into `<sheetData>`. A row is written when it holds a
/// styled or valued cell, or carries its own height or hidden flag.
fn write_sheet_data(
    out: &mut String,
    mapping: &Mapping,
    options: &MapOptions,
    styles: &BTreeMap<CellPoint, u32>,
) {
    let layers = mapping.layers();

    // Group the cells worth writing by row; keys are row-major already.
    let mut rows: BTreeMap<u32, Vec<(u32, u32, Option<&CellValue>)>> = BTreeMap::new();
    for (point, entry) in layers.cells.iter() {
        let style = styles.get(&point).copied().unwrap_or(0);
        let value = entry
            .info
            .as_ref()
            .and_then(|info: &CellInfo| info.value.as_ref())
            .filter(|_| options.emit_values);
        if style == 0 && value.is_none() {
            continue;
        }
        rows.entry(point.row)
            .or_default()
            .push((point.column, style, value));
    }
    for (row, entry) in layers.rows.iter() {
        if entry
            .info
            .as_ref()
            .is_some_and(|info| info.height.is_some() || info.hidden)
        {
            rows.entry(row).or_default();
        }
    }

    for (row, cells) in &rows {
        out.push_str(&format!("<row r=\"{row}\""));
        if let Some(info) = layers.rows.get(row).and_then(|entry| entry.info.as_ref()) {
            if let Some(height) = info.height {
                out.push_str(&format!(" ht=\"{height}\" customHeight=\"1\""));
            }
            if info.hidden {
                out.push_str(" hidden=\"1\"");
            }
        }
        out.push('>');

        for &(column, style, value) in cells {
            write_cell(out, column, *row, style, value);
        }

        out.push_str("</row>\n");
    }
}

/// Write a single `<c>` element.
fn write_cell(out: &mut String, column: u32, row: u32, style: u32, value: Option<&CellValue>) {
    out.push_str(&format!("<c r=\"{}{}\"", column_letter(column), row));

    if style != 0 {
        out.push_str(&format!(" s=\"{style}\""));
    }

    match value {
        None => out.push_str("/>"),
        Some(CellValue::Text(text)) => {
            out.push_str(" t=\"inlineStr\"><is><t");
            if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
                out.push_str(" xml:space=\"preserve\"");
            }
            out.push('>');
            out.push_str(&escape(text));
            out.push_str("</t></is></c>");
        }
        Some(CellValue::Number(n)) => {
            out.push_str(&format!("><v>{n}</v></c>"));
        }
        Some(CellValue::Bool(b)) => {
            out.push_str(&format!(" t=\"b\"><v>{}</v></c>", u8::from(*b)));
        }
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

    #[test]
    fn test_write_cell_variants() {
        let mut out = String::new();
        write_cell(&mut out, 2, 3, 0, None);
        write_cell(&mut out, 1, 1, 4, Some(&CellValue::Text(" a<b".into())));
        write_cell(&mut out, 1, 2, 0, Some(&CellValue::Number(1.5)));
        write_cell(&mut out, 1, 3, 0, Some(&CellValue::Bool(true)));
        assert_eq!(
            out,
            concat!(
                r#"<c r="B3"/>"#,
                r#"<c r="A1" s="4" t="inlineStr"><is><t xml:space="preserve"> a&lt;b</t></is></c>"#,
                r#"<c r="A2"><v>1.5</v></c>"#,
                r#"<c r="A3" t="b"><v>1</v></c>"#,
            )
        );
    }
}
