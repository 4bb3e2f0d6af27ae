//! WebAssembly entry points.
//!
//! ```javascript
//! import init, { layout_to_xlsx, map_layout_report } from 'xlmap';
//! await init();
//! const bytes = layout_to_xlsx('<layout><cell>hi</cell></layout>');
//! const report = map_layout_report('<layout><cell>hi</cell></layout>');
//! ```

use wasm_bindgen::prelude::*;

use crate::options::MapOptions;
use crate::parser::parse_layout;

/// Render a layout (XML or JSON) to XLSX bytes with default options.
///
/// # Errors
/// Returns an error if the layout is invalid or cannot be mapped.
#[wasm_bindgen]
pub fn layout_to_xlsx(layout: &str) -> Result<Vec<u8>, JsValue> {
    let options = MapOptions::default();
    let mapping = crate::map_layout(&parse_layout(layout)?, &options)?;
    Ok(crate::render_xlsx(&mapping, &options)?)
}

/// Map a layout (XML or JSON) and return the mapping report as a JS object.
///
/// # Errors
/// Returns an error if the layout is invalid or cannot be mapped.
#[wasm_bindgen]
pub fn map_layout_report(layout: &str) -> Result<JsValue, JsValue> {
    let options = MapOptions::default();
    let mapping = crate::map_layout(&parse_layout(layout)?, &options)?;
    let report = mapping.report(&options)?;
    serde_wasm_bindgen::to_value(&report)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {e}")))
}

/// Get the library version
#[must_use]
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
