use serde::{Deserialize, Serialize};

/// A literal value placed in a cell.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum CellValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Parse `raw` as the named kind (`"number"`, `"bool"`, anything else is
    /// text). Returns `None` when the text does not fit the kind.
    #[must_use]
    pub fn parse_as(kind: Option<&str>, raw: &str) -> Option<Self> {
        match kind {
            Some("number") => raw.trim().parse().ok().map(CellValue::Number),
            Some("bool" | "boolean") => match raw.trim() {
                "1" | "true" => Some(CellValue::Bool(true)),
                "0" | "false" => Some(CellValue::Bool(false)),
                _ => None,
            },
            _ => Some(CellValue::Text(raw.to_string())),
        }
    }
}
