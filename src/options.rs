//! Mapping and export options.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::units::UnitConverter;

/// Options for one mapping pass. Every field has a default, so `{}` is a
/// valid options document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapOptions {
    /// Name of the single worksheet written.
    pub sheet_name: String,
    /// Default font; also calibrates column width conversion.
    pub font_family: String,
    /// Default font size in points.
    pub font_size: f64,
    /// Height in points of rows without an explicit size.
    pub default_row_height: f64,
    /// Width in characters of columns without an explicit size.
    pub default_column_width: f64,
    /// Write cell values. When off only formats and sizes are exported.
    pub emit_values: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            sheet_name: "Sheet1".to_string(),
            font_family: "Calibri".to_string(),
            font_size: 11.0,
            default_row_height: 15.0,
            default_column_width: 8.43,
            emit_values: true,
        }
    }
}

impl MapOptions {
    /// Parse options from a JSON object, filling in defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Width converter calibrated to the default font.
    #[must_use]
    pub fn unit_converter(&self) -> UnitConverter {
        UnitConverter::for_font(&self.font_family, self.font_size)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_gives_defaults() {
        let options = MapOptions::from_json("{}").unwrap();
        assert_eq!(options, MapOptions::default());
    }

    #[test]
    fn test_partial_override() {
        let options =
            MapOptions::from_json(r#"{"sheetName":"Report","fontSize":22,"emitValues":false}"#)
                .unwrap();
        assert_eq!(options.sheet_name, "Report");
        assert_eq!(options.font_size, 22.0);
        assert!(!options.emit_values);
        assert_eq!(options.font_family, "Calibri");
        assert_eq!(options.unit_converter().max_digit_width(), 14.0);
    }

    #[test]
    fn test_wrong_type_is_an_error() {
        assert!(MapOptions::from_json(r#"{"fontSize":"big"}"#).is_err());
    }
}
