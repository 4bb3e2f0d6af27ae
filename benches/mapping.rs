//! Benchmarks for layout mapping and XLSX rendering.
//!
//! Run with: cargo bench
//!
//! Results are saved to `target/criterion/` with HTML reports.
#![allow(clippy::expect_used, clippy::cast_possible_truncation)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use xlmap::{map_layout, parse_layout_xml, render_xlsx, MapOptions};

/// A report-like layout: `rows` table rows of `columns` cells under a header
/// row whose cell widths disagree with the table's, so every merge splits.
fn report_layout(rows: usize, columns: usize) -> String {
    let mut xml = String::from("<layout>");
    xml.push_str(r##"<row bold="true" fill="#DDDDDD">"##);
    for c in 0..columns {
        xml.push_str(&format!(r#"<cell width="{}">H{c}</cell>"#, 40 + (c % 3) * 15));
    }
    xml.push_str("</row>");
    xml.push_str(r#"<table border="thin">"#);
    for r in 0..rows {
        xml.push_str("<tr>");
        for c in 0..columns {
            let width = 30 + ((r + c) % 4) * 10;
            xml.push_str(&format!(r#"<td width="{width}" type="number">{}</td>"#, r * c));
        }
        xml.push_str("</tr>");
    }
    xml.push_str("</table></layout>");
    xml
}

fn bench_parse(c: &mut Criterion) {
    let xml = report_layout(200, 10);
    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Bytes(xml.len() as u64));
    group.bench_function("layout_xml_200x10", |b| {
        b.iter(|| parse_layout_xml(black_box(&xml)).expect("Failed to parse"))
    });
    group.finish();
}

fn bench_map(c: &mut Criterion) {
    let options = MapOptions::default();
    let mut group = c.benchmark_group("map");
    for rows in [10, 100, 500] {
        let layout = parse_layout_xml(&report_layout(rows, 10)).expect("Failed to parse");
        group.throughput(Throughput::Elements((rows * 10) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &layout, |b, layout| {
            b.iter(|| map_layout(black_box(layout), &options).expect("Failed to map"))
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let options = MapOptions::default();
    let layout = parse_layout_xml(&report_layout(200, 10)).expect("Failed to parse");
    let mapping = map_layout(&layout, &options).expect("Failed to map");
    c.bench_function("render_xlsx_200x10", |b| {
        b.iter(|| render_xlsx(black_box(&mapping), &options).expect("Failed to render"))
    });
}

criterion_group!(benches, bench_parse, bench_map, bench_render);
criterion_main!(benches);
