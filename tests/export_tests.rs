//! Tests for XLSX export.
//!
//! Each test renders a layout and reads the package back with
//! `zip::ZipArchive`, checking the XML of the parts that matter.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;

use common::{assert_contains, map_with, part_names, read_part};
use xlmap::{layout_xml_to_xlsx, render_xlsx, MapOptions};

const REPORT: &str = r#"<layout>
    <row height="20" bold="true" name="Header">
        <cell width="75" colSpan="2">Report</cell>
    </row>
    <row>
        <cell>North</cell>
        <cell type="number" numberFormat="0.00">42.5</cell>
    </row>
</layout>"#;

fn render(xml: &str, options: &MapOptions) -> Vec<u8> {
    layout_xml_to_xlsx(xml, options).unwrap()
}

// ============================================================================
// PACKAGE
// ============================================================================

#[test]
fn test_package_parts() {
    let xlsx = render(REPORT, &MapOptions::default());
    assert!(xlsx.starts_with(b"PK"));
    assert_eq!(
        part_names(&xlsx),
        vec![
            "[Content_Types].xml",
            "_rels/.rels",
            "xl/_rels/workbook.xml.rels",
            "xl/styles.xml",
            "xl/workbook.xml",
            "xl/worksheets/sheet1.xml",
        ]
    );
    let content_types = read_part(&xlsx, "[Content_Types].xml");
    assert_contains(&content_types, r#"PartName="/xl/worksheets/sheet1.xml""#);
    assert_contains(
        &read_part(&xlsx, "xl/_rels/workbook.xml.rels"),
        r#"Target="worksheets/sheet1.xml""#,
    );
}

#[test]
fn test_workbook_names_and_sheet() {
    let options = MapOptions {
        sheet_name: "Sales".to_string(),
        ..MapOptions::default()
    };
    let xlsx = render(REPORT, &options);
    let workbook = read_part(&xlsx, "xl/workbook.xml");
    assert_contains(&workbook, r#"<sheet name="Sales" sheetId="1" r:id="rId1"/>"#);
    assert_contains(
        &workbook,
        r#"<definedName name="Header">Sales!$A$1:$B$1</definedName>"#,
    );
}

// ============================================================================
// WORKSHEET
// ============================================================================

#[test]
fn test_worksheet_layout() {
    let xlsx = render(REPORT, &MapOptions::default());
    let sheet = read_part(&xlsx, "xl/worksheets/sheet1.xml");

    assert_contains(&sheet, r#"<dimension ref="A1:B2"/>"#);
    assert_contains(
        &sheet,
        r#"<sheetFormatPr defaultRowHeight="15" defaultColWidth="8.43"/>"#,
    );
    // 75px at Calibri 11
    assert_contains(
        &sheet,
        r#"<col min="1" max="1" width="10.7109375" customWidth="1"/>"#,
    );
    assert_contains(
        &sheet,
        r#"<col min="2" max="2" width="10.7109375" customWidth="1"/>"#,
    );
    // 20px is 15pt
    assert_contains(&sheet, r#"<row r="1" ht="15" customHeight="1">"#);
    assert_contains(&sheet, r#"<row r="2">"#);
    assert_contains(&sheet, r#"<mergeCells count="1">"#);
    assert_contains(&sheet, r#"<mergeCell ref="A1:B1"/>"#);
}

#[test]
fn test_worksheet_cells() {
    let xlsx = render(REPORT, &MapOptions::default());
    let sheet = read_part(&xlsx, "xl/worksheets/sheet1.xml");

    assert_contains(
        &sheet,
        r#"<c r="A1" s="1" t="inlineStr"><is><t>Report</t></is></c>"#,
    );
    // merged-over cell keeps the format but not the value
    assert_contains(&sheet, r#"<c r="B1" s="1"/>"#);
    assert_contains(&sheet, r#"<c r="A2" t="inlineStr"><is><t>North</t></is></c>"#);
    assert_contains(&sheet, r#"<c r="B2" s="2"><v>42.5</v></c>"#);
}

#[test]
fn test_values_can_be_left_out() {
    let options = MapOptions {
        emit_values: false,
        ..MapOptions::default()
    };
    let xlsx = render(REPORT, &options);
    let sheet = read_part(&xlsx, "xl/worksheets/sheet1.xml");
    assert!(!sheet.contains("<v>"));
    assert!(!sheet.contains("inlineStr"));
    // styled cells are still written
    assert_contains(&sheet, r#"<c r="A1" s="1"/>"#);
}

#[test]
fn test_hidden_rows_and_columns() {
    let xlsx = render(
        r#"<layout>
            <row hiddenRow="true"><cell>a</cell><cell hiddenColumn="true">b</cell></row>
            <row><cell>c</cell><cell/></row>
        </layout>"#,
        &MapOptions::default(),
    );
    let sheet = read_part(&xlsx, "xl/worksheets/sheet1.xml");
    assert_contains(&sheet, r#"<row r="1" hidden="1">"#);
    assert_contains(&sheet, r#"<col min="2" max="2" width="8.43" hidden="1"/>"#);
}

#[test]
fn test_empty_layout_writes_an_empty_sheet() {
    let xlsx = render("<layout/>", &MapOptions::default());
    let sheet = read_part(&xlsx, "xl/worksheets/sheet1.xml");
    assert_contains(&sheet, "<sheetData>\n</sheetData>");
    assert!(!sheet.contains("<mergeCells"));
}

// ============================================================================
// STYLES
// ============================================================================

#[test]
fn test_styles_part() {
    let xlsx = render(REPORT, &MapOptions::default());
    let styles = read_part(&xlsx, "xl/styles.xml");

    assert_contains(&styles, r#"<fonts count="2">"#);
    assert_contains(&styles, r#"<font><b/><sz val="11"/><name val="Calibri"/></font>"#);
    assert_contains(&styles, r#"<cellXfs count="3">"#);
    assert_contains(
        &styles,
        r#"<xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/>"#,
    );
    assert_contains(
        &styles,
        r#"<xf numFmtId="2" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>"#,
    );
    assert!(!styles.contains("<numFmts"));
}

#[test]
fn test_outline_border_and_fill() {
    let xlsx = render(
        r##"<layout>
            <row border="thin" borderColor="#FF0000" fill="#CCCCCC">
                <cell/><cell/>
            </row>
        </layout>"##,
        &MapOptions::default(),
    );
    let styles = read_part(&xlsx, "xl/styles.xml");
    assert_contains(&styles, r#"<fgColor rgb="FFCCCCCC"/>"#);
    assert_contains(
        &styles,
        r#"<border><left style="thin"><color rgb="FFFF0000"/></left><right/><top style="thin"><color rgb="FFFF0000"/></top><bottom style="thin"><color rgb="FFFF0000"/></bottom><diagonal/></border>"#,
    );
    assert_contains(
        &styles,
        r#"<border><left/><right style="thin"><color rgb="FFFF0000"/></right><top style="thin"><color rgb="FFFF0000"/></top><bottom style="thin"><color rgb="FFFF0000"/></bottom><diagonal/></border>"#,
    );
    let sheet = read_part(&xlsx, "xl/worksheets/sheet1.xml");
    assert_contains(&sheet, r#"<c r="A1" s="1"/><c r="B1" s="2"/>"#);
}

#[test]
fn test_custom_font_option() {
    let options = MapOptions {
        font_family: "Arial".to_string(),
        font_size: 10.0,
        ..MapOptions::default()
    };
    let mapping = map_with(REPORT, &options);
    let xlsx = render_xlsx(&mapping, &options).unwrap();
    let styles = read_part(&xlsx, "xl/styles.xml");
    assert_contains(&styles, r#"<font><sz val="10"/><name val="Arial"/></font>"#);
}
