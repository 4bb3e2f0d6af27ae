//! Structured error types for xlmap.
//!
//! Every fallible operation in the crate returns [`Result`]. Invariant
//! violations are reported as errors instead of panics so that a failed
//! mapping pass can be discarded by the caller.

/// All errors that can occur while parsing, mapping or exporting a layout.
#[derive(Debug, thiserror::Error)]
pub enum XlmapError {
    /// XML parsing error from quick-xml.
    #[error("XML parsing: {0}")]
    Xml(#[from] quick_xml::Error),

    /// ZIP archive error.
    #[error("ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// JSON (de)serialization error.
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The layout description is not valid.
    #[error("Invalid layout: {0}")]
    Layout(String),

    /// The coordinate tree is malformed (cycles, dangling children, ...).
    #[error("Malformed coordinate tree: {0}")]
    Structure(String),

    /// An internal invariant was violated by the caller.
    #[error("Invariant violated: {0}")]
    Invariant(String),

    /// A store lookup by id failed.
    #[error("{kind} {id} not found")]
    NotFound {
        /// What was looked up (`"slot"`, `"node"`, ...).
        kind: &'static str,
        /// The missing id.
        id: usize,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, XlmapError>;

impl XlmapError {
    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    pub(crate) fn structure(msg: impl Into<String>) -> Self {
        Self::Structure(msg.into())
    }

    pub(crate) fn layout(msg: impl Into<String>) -> Self {
        Self::Layout(msg.into())
    }
}

#[cfg(feature = "wasm")]
impl From<XlmapError> for wasm_bindgen::JsValue {
    fn from(e: XlmapError) -> Self {
        wasm_bindgen::JsValue::from_str(&e.to_string())
    }
}
