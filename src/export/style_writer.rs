//! `xl/styles.xml` generation.
//!
//! Resolved cell formats are broken into fonts, fills, borders and number
//! formats, each deduplicated by its XML form, then combined into `cellXfs`
//! entries. Index 0 of every table is the sheet default.

use std::collections::HashMap;

use tracing::warn;

use crate::options::MapOptions;
use crate::types::{BorderLine, ResolvedFormat};
use crate::xml_helpers::escape;

/// First id available to custom number formats.
const FIRST_CUSTOM_NUM_FMT: u32 = 164;

/// Number format codes with a built-in id.
const BUILTIN_NUM_FMTS: &[(u32, &str)] = &[
    (0, "General"),
    (1, "0"),
    (2, "0.00"),
    (3, "#,##0"),
    (4, "#,##0.00"),
    (9, "0%"),
    (10, "0.00%"),
    (11, "0.00E+00"),
    (12, "# ?/?"),
    (13, "# ??/??"),
    (14, "mm-dd-yy"),
    (15, "d-mmm-yy"),
    (16, "d-mmm"),
    (17, "mmm-yy"),
    (18, "h:mm AM/PM"),
    (19, "h:mm:ss AM/PM"),
    (20, "h:mm"),
    (21, "h:mm:ss"),
    (22, "m/d/yy h:mm"),
    (45, "mm:ss"),
    (46, "[h]:mm:ss"),
    (47, "mmss.0"),
    (48, "##0.0E+0"),
    (49, "@"),
];

/// Unique entries of one table, in insertion order.
#[derive(Debug, Default)]
struct Interned {
    entries: Vec<String>,
    index: HashMap<String, u32>,
}

impl Interned {
    #[allow(clippy::cast_possible_truncation)]
    fn intern(&mut self, xml: String) -> u32 {
        if let Some(&id) = self.index.get(&xml) {
            return id;
        }
        let id = self.entries.len() as u32;
        self.index.insert(xml.clone(), id);
        self.entries.push(xml);
        id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Xf {
    font: u32,
    fill: u32,
    border: u32,
    num_fmt: u32,
    alignment: Option<String>,
}

/// Style table built up while the worksheet is written.
#[derive(Debug)]
pub(crate) struct StyleTable {
    fonts: Interned,
    fills: Interned,
    borders: Interned,
    num_fmts: Vec<(u32, String)>,
    xfs: Vec<Xf>,
    xf_index: HashMap<Xf, u32>,
    default_font: (String, f64),
}

impl StyleTable {
    pub(crate) fn new(options: &MapOptions) -> Self {
        let mut table = Self {
            fonts: Interned::default(),
            fills: Interned::default(),
            borders: Interned::default(),
            num_fmts: Vec::new(),
            xfs: Vec::new(),
            xf_index: HashMap::new(),
            default_font: (options.font_family.clone(), options.font_size),
        };
        // Excel expects the first two fills to be these.
        table
            .fills
            .intern(r#"<fill><patternFill patternType="none"/></fill>"#.to_string());
        table
            .fills
            .intern(r#"<fill><patternFill patternType="gray125"/></fill>"#.to_string());
        table.cell_style(&ResolvedFormat::default());
        table
    }

    /// `cellXfs` index for `format`, adding entries as needed.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn cell_style(&mut self, format: &ResolvedFormat) -> u32 {
        let xf = Xf {
            font: self.font(format),
            fill: self.fill(format),
            border: self.border(format),
            num_fmt: self.num_fmt(format),
            alignment: alignment_xml(format),
        };
        if let Some(&id) = self.xf_index.get(&xf) {
            return id;
        }
        let id = self.xfs.len() as u32;
        self.xf_index.insert(xf.clone(), id);
        self.xfs.push(xf);
        id
    }

    fn font(&mut self, format: &ResolvedFormat) -> u32 {
        let mut xml = String::from("<font>");
        if format.bold == Some(true) {
            xml.push_str("<b/>");
        }
        if format.italic == Some(true) {
            xml.push_str("<i/>");
        }
        let size = format.font_size.unwrap_or(self.default_font.1);
        xml.push_str(&format!("<sz val=\"{size}\"/>"));
        if let Some(rgb) = format.font_color.as_deref().and_then(argb) {
            xml.push_str(&format!("<color rgb=\"{rgb}\"/>"));
        }
        let family = format
            .font_family
            .as_deref()
            .unwrap_or(&self.default_font.0);
        xml.push_str(&format!("<name val=\"{}\"/>", escape(family)));
        xml.push_str("</font>");
        self.fonts.intern(xml)
    }

    fn fill(&mut self, format: &ResolvedFormat) -> u32 {
        match format.fill.as_deref().and_then(argb) {
            None => 0,
            Some(rgb) => self.fills.intern(format!(
                "<fill><patternFill patternType=\"solid\"><fgColor rgb=\"{rgb}\"/><bgColor indexed=\"64\"/></patternFill></fill>"
            )),
        }
    }

    fn border(&mut self, format: &ResolvedFormat) -> u32 {
        let mut xml = String::from("<border>");
        for (tag, line) in [
            ("left", &format.border_left),
            ("right", &format.border_right),
            ("top", &format.border_top),
            ("bottom", &format.border_bottom),
        ] {
            xml.push_str(&border_edge(tag, line.as_ref()));
        }
        xml.push_str("<diagonal/></border>");
        self.borders.intern(xml)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn num_fmt(&mut self, format: &ResolvedFormat) -> u32 {
        let Some(code) = format.number_format.as_deref() else {
            return 0;
        };
        if let Some(&(id, _)) = BUILTIN_NUM_FMTS.iter().find(|(_, c)| *c == code) {
            return id;
        }
        if let Some((id, _)) = self.num_fmts.iter().find(|(_, c)| c == code) {
            return *id;
        }
        let id = FIRST_CUSTOM_NUM_FMT + self.num_fmts.len() as u32;
        self.num_fmts.push((id, code.to_string()));
        id
    }

    /// Number of `cellXfs` entries.
    pub(crate) fn len(&self) -> usize {
        self.xfs.len()
    }

    /// Serialize the whole stylesheet.
    pub(crate) fn to_xml(&self) -> String {
        let mut out = String::with_capacity(2048);
        out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        out.push('\n');
        out.push_str(
            r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        );
        out.push('\n');

        if !self.num_fmts.is_empty() {
            out.push_str(&format!("<numFmts count=\"{}\">", self.num_fmts.len()));
            for (id, code) in &self.num_fmts {
                out.push_str(&format!(
                    "<numFmt numFmtId=\"{id}\" formatCode=\"{}\"/>",
                    escape(code)
                ));
            }
            out.push_str("</numFmts>\n");
        }

        push_table(&mut out, "fonts", &self.fonts);
        push_table(&mut out, "fills", &self.fills);
        push_table(&mut out, "borders", &self.borders);

        out.push_str(concat!(
            r#"<cellStyleXfs count="1">"#,
            r#"<xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>"#,
            "</cellStyleXfs>\n"
        ));

        out.push_str(&format!("<cellXfs count=\"{}\">", self.xfs.len()));
        for xf in &self.xfs {
            out.push_str(&format!(
                "<xf numFmtId=\"{}\" fontId=\"{}\" fillId=\"{}\" borderId=\"{}\" xfId=\"0\"",
                xf.num_fmt, xf.font, xf.fill, xf.border
            ));
            if xf.num_fmt != 0 {
                out.push_str(" applyNumberFormat=\"1\"");
            }
            if xf.font != 0 {
                out.push_str(" applyFont=\"1\"");
            }
            if xf.fill != 0 {
                out.push_str(" applyFill=\"1\"");
            }
            if xf.border != 0 {
                out.push_str(" applyBorder=\"1\"");
            }
            match &xf.alignment {
                Some(alignment) => {
                    out.push_str(" applyAlignment=\"1\">");
                    out.push_str(alignment);
                    out.push_str("</xf>");
                }
                None => out.push_str("/>"),
            }
        }
        out.push_str("</cellXfs>\n");

        out.push_str(concat!(
            r#"<cellStyles count="1">"#,
            r#"<cellStyle name="Normal" xfId="0" builtinId="0"/>"#,
            "</cellStyles>\n"
        ));
        out.push_str("</styleSheet>");
        out
    }
}

fn push_table(out: &mut String, tag: &str, table: &Interned) {
    out.push_str(&format!("<{tag} count=\"{}\">", table.entries.len()));
    for entry in &table.entries {
        out.push_str(entry);
    }
    out.push_str(&format!("</{tag}>\n"));
}

fn border_edge(tag: &str, line: Option<&BorderLine>) -> String {
    let Some(line) = line else {
        return format!("<{tag}/>");
    };
    let color = line
        .color
        .as_deref()
        .and_then(argb)
        .map_or_else(|| r#"<color auto="1"/>"#.to_string(), |rgb| format!("<color rgb=\"{rgb}\"/>"));
    format!("<{tag} style=\"{}\">{color}</{tag}>", line.style.as_str())
}

fn alignment_xml(format: &ResolvedFormat) -> Option<String> {
    if format.h_align.is_none() && format.v_align.is_none() && format.wrap != Some(true) {
        return None;
    }
    let mut xml = String::from("<alignment");
    if let Some(h) = format.h_align {
        xml.push_str(&format!(" horizontal=\"{}\"", h.as_str()));
    }
    if let Some(v) = format.v_align {
        xml.push_str(&format!(" vertical=\"{}\"", v.as_str()));
    }
    if format.wrap == Some(true) {
        xml.push_str(" wrapText=\"1\"");
    }
    xml.push_str("/>");
    Some(xml)
}

/// Normalise `#RGB`, `#RRGGBB` or `AARRGGBB` to the `AARRGGBB` form.
fn argb(color: &str) -> Option<String> {
    let hex = color.trim().trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        warn!(color, "ignoring colour that is not hex");
        return None;
    }
    let hex = hex.to_ascii_uppercase();
    match hex.len() {
        3 => Some(format!("FF{}", hex.chars().flat_map(|c| [c, c]).collect::<String>())),
        6 => Some(format!("FF{hex}")),
        8 => Some(hex),
        _ => {
            warn!(color, "ignoring colour of unexpected length");
            None
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
    use crate::types::{BorderStyle, HAlign};

    #[test]
    fn test_argb() {
        assert_eq!(argb("#ff0000").as_deref(), Some("FFFF0000"));
        assert_eq!(argb("#abc").as_deref(), Some("FFAABBCC"));
        assert_eq!(argb("80112233").as_deref(), Some("80112233"));
        assert_eq!(argb("red"), None);
        assert_eq!(argb("#12345"), None);
    }

    #[test]
    fn test_identical_formats_share_an_index() {
        let mut table = StyleTable::new(&MapOptions::default());
        assert_eq!(table.cell_style(&ResolvedFormat::default()), 0);

        let bold = ResolvedFormat {
            bold: Some(true),
            ..ResolvedFormat::default()
        };
        let red = ResolvedFormat {
            fill: Some("#FF0000".into()),
            ..ResolvedFormat::default()
        };
        assert_eq!(table.cell_style(&bold), 1);
        assert_eq!(table.cell_style(&red), 2);
        assert_eq!(table.cell_style(&bold), 1);
        assert_eq!(table.len(), 3);
        // Setting a field to its default value lands on the default font
        let not_bold = ResolvedFormat {
            bold: Some(false),
            ..ResolvedFormat::default()
        };
        assert_eq!(table.cell_style(&not_bold), 0);
    }

    #[test]
    fn test_number_formats() {
        let mut table = StyleTable::new(&MapOptions::default());
        let percent = ResolvedFormat {
            number_format: Some("0.00%".into()),
            ..ResolvedFormat::default()
        };
        let custom = ResolvedFormat {
            number_format: Some("yyyy-mm-dd".into()),
            ..ResolvedFormat::default()
        };
        table.cell_style(&percent);
        table.cell_style(&custom);
        let xml = table.to_xml();
        assert!(xml.contains(r#"<numFmt numFmtId="164" formatCode="yyyy-mm-dd"/>"#));
        assert!(xml.contains(r#"<xf numFmtId="10" fontId="0""#));
        assert!(!xml.contains(r#"numFmtId="165""#));
    }

    #[test]
    fn test_stylesheet_tables() {
        let mut table = StyleTable::new(&MapOptions::default());
        table.cell_style(&ResolvedFormat {
            h_align: Some(HAlign::Center),
            wrap: Some(true),
            border_top: Some(BorderLine {
                style: BorderStyle::Thick,
                color: Some("#000000".into()),
            }),
            ..ResolvedFormat::default()
        });
        let xml = table.to_xml();
        assert!(xml.contains(r#"<fills count="2">"#));
        assert!(xml.contains(r#"<borders count="2">"#));
        assert!(xml.contains(r#"<top style="thick"><color rgb="FF000000"/></top>"#));
        assert!(xml.contains(r#"<alignment horizontal="center" wrapText="1"/>"#));
        assert!(xml.contains(r#"<name val="Calibri"/>"#));
        assert!(xml.contains(r#"<cellXfs count="2">"#));
    }
}
