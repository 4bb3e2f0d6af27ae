//! Shared XML helpers: attribute extraction for the layout reader and
//! escaping for the package writers.
//!
//! The typed extractors are strict: a present attribute that does not parse
//! is a layout error rather than silently ignored.

use std::str::FromStr;

use quick_xml::events::BytesStart;

use crate::error::{Result, XlmapError};

/// Extract an attribute value by local name, unescaped.
///
/// Returns `None` if the attribute is missing or not valid UTF-8.
pub fn attr_string(e: &BytesStart, key: &[u8]) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == key {
            return attr.unescape_value().ok().map(|v| v.into_owned());
        }
    }
    None
}

/// Extract and parse an attribute, failing on a value that does not parse.
pub fn attr_parsed<T: FromStr>(e: &BytesStart, key: &[u8]) -> Result<Option<T>> {
    let Some(raw) = attr_string(e, key) else {
        return Ok(None);
    };
    raw.trim().parse().map(Some).map_err(|_| {
        XlmapError::layout(format!(
            "<{}> attribute {}={raw:?} is not valid",
            local_name_string(e),
            String::from_utf8_lossy(key)
        ))
    })
}

/// Extract an `f64` attribute value.
pub fn attr_f64(e: &BytesStart, key: &[u8]) -> Result<Option<f64>> {
    attr_parsed(e, key)
}

/// Extract a `u32` attribute value.
pub fn attr_u32(e: &BytesStart, key: &[u8]) -> Result<Option<u32>> {
    attr_parsed(e, key)
}

/// Extract a boolean attribute. Accepts `1`/`true` and `0`/`false`.
pub fn attr_bool(e: &BytesStart, key: &[u8]) -> Result<Option<bool>> {
    match attr_string(e, key).as_deref().map(str::trim) {
        None => Ok(None),
        Some("1" | "true") => Ok(Some(true)),
        Some("0" | "false") => Ok(Some(false)),
        Some(other) => Err(XlmapError::layout(format!(
            "<{}> attribute {}={other:?} is not a boolean",
            local_name_string(e),
            String::from_utf8_lossy(key)
        ))),
    }
}

/// Extract a boolean attribute, `false` when missing.
pub fn attr_flag(e: &BytesStart, key: &[u8]) -> Result<bool> {
    Ok(attr_bool(e, key)?.unwrap_or(false))
}

/// Get the local element name as an owned string.
///
/// Returns empty string if not valid UTF-8.
#[inline]
pub fn local_name_string(e: &BytesStart) -> String {
    let bytes = e.local_name();
    std::str::from_utf8(bytes.as_ref())
        .unwrap_or("")
        .to_string()
}

/// Minimal XML escaping for attribute and text content.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
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

    fn make_start(xml: &str) -> BytesStart<'_> {
        // Strip < and > / /> to get just the tag content
        let content = xml
            .trim_start_matches('<')
            .trim_end_matches('>')
            .trim_end_matches('/')
            .trim_end();
        BytesStart::from_content(content, content.find(' ').unwrap_or(content.len()))
    }

    #[test]
    fn test_attr_string_unescapes() {
        let e = make_start(r#"<cell value="a &amp; b" />"#);
        assert_eq!(attr_string(&e, b"value"), Some("a & b".to_string()));
        assert_eq!(attr_string(&e, b"missing"), None);
    }

    #[test]
    fn test_numbers_are_strict() {
        let e = make_start(r#"<cell width="42.5" colSpan="x" />"#);
        assert_eq!(attr_f64(&e, b"width").unwrap(), Some(42.5));
        assert_eq!(attr_f64(&e, b"height").unwrap(), None);
        assert!(matches!(
            attr_u32(&e, b"colSpan"),
            Err(XlmapError::Layout(_))
        ));
    }

    #[test]
    fn test_attr_bool() {
        let e = make_start(r#"<foo a="1" b="0" c="true" d="false" e="maybe" />"#);
        assert_eq!(attr_bool(&e, b"a").unwrap(), Some(true));
        assert_eq!(attr_bool(&e, b"b").unwrap(), Some(false));
        assert_eq!(attr_bool(&e, b"c").unwrap(), Some(true));
        assert_eq!(attr_bool(&e, b"d").unwrap(), Some(false));
        assert_eq!(attr_bool(&e, b"missing").unwrap(), None);
        assert!(attr_bool(&e, b"e").is_err());
        assert!(!attr_flag(&e, b"missing").unwrap());
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&apos;");
    }
}
