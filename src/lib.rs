//! xlmap - lay out spreadsheets as nested boxes
//!
//! A layout is a tree of panels, rows, columns, tables and cells. xlmap
//! works out which worksheet rows and columns every element lands on:
//! - sibling elements with different sizes are reconciled by splitting rows
//!   and columns where their boundaries disagree
//! - hidden elements get rows/columns of their own without disturbing the
//!   visible ones
//! - formats cascade from enclosing elements to the cells inside them
//!
//! The result can be inspected as a [`MappingReport`] or written out as an
//! XLSX package.
//!
//! # Usage
//!
//! ```
//! let xml = r#"<layout>
//!   <row bold="true"><cell width="120">Region</cell><cell>Total</cell></row>
//!   <row><cell>North</cell><cell type="number">42</cell></row>
//! </layout>"#;
//! let bytes = xlmap::layout_xml_to_xlsx(xml, &xlmap::MapOptions::default()).unwrap();
//! assert!(bytes.starts_with(b"PK"));
//! ```

pub mod cell_ref;
pub mod error;
pub mod export;
pub mod mapping;
pub mod options;
pub mod parser;
pub mod report;
pub mod store;
pub mod styles;
pub mod types;
pub mod units;
pub mod xml_helpers;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use error::{Result, XlmapError};
pub use mapping::{build_tree, map_tree, Mapping};
pub use options::MapOptions;
pub use parser::{parse_layout, parse_layout_json, parse_layout_xml};
pub use report::MappingReport;
pub use types::*;

/// Build the coordinate tree for `layout`, map it and resolve every cell's
/// format.
pub fn map_layout(layout: &Layout, options: &MapOptions) -> Result<Mapping> {
    let tree = build_tree(layout)?;
    let mut mapping = map_tree(tree)?;
    styles::resolve_formats(&mut mapping, options)?;
    Ok(mapping)
}

/// Write a mapped layout as XLSX bytes.
pub fn render_xlsx(mapping: &Mapping, options: &MapOptions) -> Result<Vec<u8>> {
    export::write_xlsx(mapping, options)
}

/// Parse, map and render a layout XML document in one go.
pub fn layout_xml_to_xlsx(xml: &str, options: &MapOptions) -> Result<Vec<u8>> {
    let layout = parse_layout_xml(xml)?;
    let mapping = map_layout(&layout, options)?;
    render_xlsx(&mapping, options)
}
