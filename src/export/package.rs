//! Fixed package parts: content types, relationships and the workbook.

use crate::xml_helpers::escape;

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

pub(crate) const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";
pub(crate) const ROOT_RELS_PATH: &str = "_rels/.rels";
pub(crate) const WORKBOOK_PATH: &str = "xl/workbook.xml";
pub(crate) const WORKBOOK_RELS_PATH: &str = "xl/_rels/workbook.xml.rels";
pub(crate) const STYLES_PATH: &str = "xl/styles.xml";
pub(crate) const SHEET_PATH: &str = "xl/worksheets/sheet1.xml";

pub(crate) fn content_types_xml() -> String {
    format!(
        concat!(
            "{}\n",
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
            r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
            r#"<Default Extension="xml" ContentType="application/xml"/>"#,
            r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
            r#"<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
            "</Types>"
        ),
        XML_DECL
    )
}

pub(crate) fn root_rels_xml() -> String {
    format!(
        concat!(
            "{}\n",
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
            "</Relationships>"
        ),
        XML_DECL
    )
}

pub(crate) fn workbook_rels_xml() -> String {
    format!(
        concat!(
            "{}\n",
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>"#,
            r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
            "</Relationships>"
        ),
        XML_DECL
    )
}

/// The workbook part: one sheet plus its defined names.
pub(crate) fn workbook_xml(sheet_name: &str, defined_names: &[(String, String)]) -> String {
    let mut out = String::with_capacity(512);
    out.push_str(XML_DECL);
    out.push('\n');
    out.push_str(
        r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
    );
    out.push_str(
        r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
    );
    out.push_str(&format!(
        r#"<sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets>"#,
        escape(sheet_name)
    ));
    if !defined_names.is_empty() {
        out.push_str("<definedNames>");
        for (name, reference) in defined_names {
            out.push_str(&format!(
                "<definedName name=\"{}\">{}</definedName>",
                escape(name),
                escape(reference)
            ));
        }
        out.push_str("</definedNames>");
    }
    out.push_str("</workbook>");
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_workbook_lists_defined_names() {
        let xml = workbook_xml(
            "Q&A",
            &[("Totals".to_string(), "'Q&A'!$A$1:$B$2".to_string())],
        );
        assert!(xml.contains(r#"<sheet name="Q&amp;A" sheetId="1" r:id="rId1"/>"#));
        assert!(xml.contains(
            r#"<definedName name="Totals">&apos;Q&amp;A&apos;!$A$1:$B$2</definedName>"#
        ));
    }

    #[test]
    fn test_workbook_without_names() {
        assert!(!workbook_xml("Sheet1", &[]).contains("definedNames"));
    }
}
