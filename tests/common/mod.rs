//! Common test utilities and assertion helpers.
//!
//! Helpers to map layout documents and read back the XLSX parts written
//! for them.
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

use std::io::{Cursor, Read};

use xlmap::mapping::{CellPoint, NodeId, Slot};
use xlmap::{map_layout, parse_layout, MapOptions, Mapping};

// ============================================================================
// Mapping Helpers
// ============================================================================

/// Parse and map a layout (XML or JSON) with default options.
///
/// This is a test helper that panics on failure.
#[must_use]
pub fn map(source: &str) -> Mapping {
    map_with(source, &MapOptions::default())
}

#[must_use]
pub fn map_with(source: &str, options: &MapOptions) -> Mapping {
    let layout = parse_layout(source).expect("Failed to parse layout");
    map_layout(&layout, options).expect("Failed to map layout")
}

/// Reconciled pixel sizes of the final columns, in order.
#[must_use]
pub fn column_sizes(mapping: &Mapping) -> Vec<Option<f64>> {
    mapping
        .column_slots()
        .unwrap()
        .iter()
        .map(|slot| slot.size())
        .collect()
}

/// Reconciled pixel sizes of the final rows, in order.
#[must_use]
pub fn row_sizes(mapping: &Mapping) -> Vec<Option<f64>> {
    mapping
        .row_slots()
        .unwrap()
        .iter()
        .map(|slot| slot.size())
        .collect()
}

/// Hidden flags of the final columns, in order.
#[must_use]
pub fn column_hidden(mapping: &Mapping) -> Vec<bool> {
    mapping
        .column_slots()
        .unwrap()
        .iter()
        .map(|slot| slot.hidden())
        .collect()
}

/// Layers covering an A1-style cell, outer to inner.
#[must_use]
pub fn cell_layers(mapping: &Mapping, cell: &str) -> Vec<NodeId> {
    let (column, row) = xlmap::cell_ref::parse_cell_ref(cell).expect("bad cell reference");
    mapping
        .layers()
        .cells
        .get(&CellPoint::new(column, row))
        .map(|entry| entry.layers().to_vec())
        .unwrap_or_default()
}

/// First node carrying the defined name `name`.
#[must_use]
pub fn named_node(mapping: &Mapping, name: &str) -> NodeId {
    mapping
        .tree()
        .nodes()
        .find(|node| node.props().defined_name.as_deref() == Some(name))
        .map(|node| node.id())
        .unwrap_or_else(|| panic!("no node named {name}"))
}

/// Check the invariants every finished mapping must hold.
pub fn assert_mapping_invariants(mapping: &Mapping) {
    let arena = mapping.arena();
    arena.check_consistency().expect("slot associations disagree");

    for (chain, count) in [
        (mapping.row_chain(), mapping.row_count()),
        (mapping.column_chain(), mapping.column_count()),
    ] {
        let slots: Vec<&Slot> = chain
            .slot_ids(arena)
            .unwrap()
            .into_iter()
            .map(|id| arena.slot(id).unwrap())
            .collect();
        assert_eq!(slots.len(), count as usize, "chain length differs from count");
        for (position, slot) in slots.iter().enumerate() {
            assert_eq!(
                slot.excel_index().unwrap() as usize,
                position + 1,
                "excel indices must run 1..N in chain order"
            );
            assert!(!slot.is_retired(), "retired slot left in the chain");
            for node in slot.maps() {
                assert!(
                    arena.slots_of(*node, slot.axis()).any(|id| id == slot.id()),
                    "{node} maps {} but does not list it",
                    slot.id()
                );
            }
        }
    }

    for node in mapping.tree().nodes() {
        let placement = node.placement();
        if let (Some(start), Some(end)) = (placement.column_start, placement.column_end) {
            assert!(start <= end && end <= mapping.column_count());
        }
        if let (Some(start), Some(end)) = (placement.row_start, placement.row_end) {
            assert!(start <= end && end <= mapping.row_count());
        }
    }
}

// ============================================================================
// Package Helpers
// ============================================================================

/// Read one part of an XLSX package as text.
#[must_use]
pub fn read_part(xlsx: &[u8], path: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(xlsx)).expect("Failed to open ZIP archive");
    let mut file = archive
        .by_name(path)
        .unwrap_or_else(|_| panic!("missing part {path}"));
    let mut out = String::new();
    file.read_to_string(&mut out).unwrap();
    out
}

/// Names of every part in an XLSX package, sorted.
#[must_use]
pub fn part_names(xlsx: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(xlsx)).expect("Failed to open ZIP archive");
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

/// Assert that `haystack` contains `needle`, showing both on failure.
pub fn assert_contains(haystack: &str, needle: &str) {
    assert!(
        haystack.contains(needle),
        "expected to find\n  {needle}\nin\n  {haystack}"
    );
}
