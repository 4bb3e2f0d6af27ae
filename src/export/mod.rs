//! XLSX export.
//!
//! Writes a single-sheet package from a mapping whose formats have been
//! resolved (see [`crate::styles::resolve_formats`]). Cells without resolved
//! info are written with the default style.

mod package;
pub(crate) mod sheet_writer;
pub(crate) mod style_writer;

use std::collections::BTreeMap;
use std::io::{Cursor, Write};

use tracing::debug;
use zip::write::FileOptions;
use zip::ZipWriter;

use crate::error::Result;
use crate::mapping::{CellPoint, Mapping};
use crate::options::MapOptions;

use sheet_writer::write_sheet_xml;
use style_writer::StyleTable;

/// Serialize `mapping` to XLSX bytes.
pub fn write_xlsx(mapping: &Mapping, options: &MapOptions) -> Result<Vec<u8>> {
    let mut styles = StyleTable::new(options);
    let mut cell_styles: BTreeMap<CellPoint, u32> = BTreeMap::new();
    for (point, entry) in mapping.layers().cells.iter() {
        if let Some(info) = &entry.info {
            let style = styles.cell_style(&info.format);
            if style != 0 {
                cell_styles.insert(point, style);
            }
        }
    }

    let merges = mapping.merged_ranges()?;
    let defined_names = mapping.defined_names(&options.sheet_name)?;
    let sheet = write_sheet_xml(mapping, options, &cell_styles, &merges)?;

    debug!(
        styles = styles.len(),
        merges = merges.len(),
        names = defined_names.len(),
        "writing xlsx package"
    );

    let parts = [
        (package::CONTENT_TYPES_PATH, package::content_types_xml()),
        (package::ROOT_RELS_PATH, package::root_rels_xml()),
        (
            package::WORKBOOK_PATH,
            package::workbook_xml(&options.sheet_name, &defined_names),
        ),
        (package::WORKBOOK_RELS_PATH, package::workbook_rels_xml()),
        (package::STYLES_PATH, styles.to_xml()),
        (package::SHEET_PATH, sheet),
    ];

    let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(8192)));
    let file_options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (path, xml) in parts {
        writer.start_file(path, file_options)?;
        writer.write_all(xml.as_bytes())?;
    }
    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}
