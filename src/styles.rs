//! Format resolution over the layered cell, row and column tables.
//!
//! Each cell's layers are folded outer to inner: a field set on an inner
//! node overrides the same field from an enclosing one, unset fields are
//! inherited. Outline borders land only on the edges of the node's range.

use std::collections::BTreeMap;

use crate::cell_ref::RangeReference;
use crate::error::Result;
use crate::mapping::{CellInfo, CellPoint, ColumnInfo, MapTree, Mapping, NodeId, RowInfo};
use crate::options::MapOptions;
use crate::types::{CellFormat, CellValue, ResolvedFormat};
use crate::units::px_to_points;

/// Fill in the `info` of every cell, row and column of `mapping`.
pub fn resolve_formats(mapping: &mut Mapping, options: &MapOptions) -> Result<()> {
    let row_infos: Vec<(u32, RowInfo)> = mapping
        .row_slots()?
        .into_iter()
        .map(|slot| {
            Ok((
                slot.excel_index()?,
                RowInfo {
                    height: slot.size().map(px_to_points),
                    hidden: slot.hidden(),
                },
            ))
        })
        .collect::<Result<_>>()?;

    let converter = options.unit_converter();
    let column_infos: Vec<(u32, ColumnInfo)> = mapping
        .column_slots()?
        .into_iter()
        .map(|slot| {
            Ok((
                slot.excel_index()?,
                ColumnInfo {
                    width: slot.size().map(|px| converter.px_to_file_width(px)),
                    hidden: slot.hidden(),
                },
            ))
        })
        .collect::<Result<_>>()?;

    let (tree, layers) = mapping.split_layers();
    for (index, info) in row_infos {
        layers.rows.ensure(index).info = Some(info);
    }
    for (index, info) in column_infos {
        layers.columns.ensure(index).info = Some(info);
    }

    let mut extents: BTreeMap<NodeId, Option<RangeReference>> = BTreeMap::new();
    for (point, entry) in layers.cells.iter_mut() {
        let mut format = ResolvedFormat::default();
        for &id in entry.layers() {
            let layer = &tree.node(id)?.props().format;
            apply_layer(&mut format, layer);
            if layer.border.is_some() {
                let extent = match extents.get(&id) {
                    Some(extent) => *extent,
                    None => {
                        let extent = tree.extent(id)?;
                        extents.insert(id, extent);
                        extent
                    }
                };
                if let Some(range) = extent {
                    apply_outline(&mut format, layer, range, point);
                }
            }
        }
        let value = if options.emit_values {
            cell_value(tree, entry.layers(), point)?
        } else {
            None
        };
        entry.info = Some(CellInfo { format, value });
    }
    Ok(())
}

fn overlay<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
    if value.is_some() {
        target.clone_from(value);
    }
}

/// Apply the non-border fields of one layer.
fn apply_layer(format: &mut ResolvedFormat, layer: &CellFormat) {
    overlay(&mut format.bold, &layer.bold);
    overlay(&mut format.italic, &layer.italic);
    overlay(&mut format.font_color, &layer.font_color);
    overlay(&mut format.font_size, &layer.font_size);
    overlay(&mut format.font_family, &layer.font_family);
    overlay(&mut format.fill, &layer.fill);
    overlay(&mut format.h_align, &layer.h_align);
    overlay(&mut format.v_align, &layer.v_align);
    overlay(&mut format.wrap, &layer.wrap);
    overlay(&mut format.number_format, &layer.number_format);
}

/// Draw the layer's outline on whichever edges of `range` the cell sits on.
fn apply_outline(
    format: &mut ResolvedFormat,
    layer: &CellFormat,
    range: RangeReference,
    point: CellPoint,
) {
    let line = &layer.border;
    if point.column == range.start_column {
        overlay(&mut format.border_left, line);
    }
    if point.column == range.end_column {
        overlay(&mut format.border_right, line);
    }
    if point.row == range.start_row {
        overlay(&mut format.border_top, line);
    }
    if point.row == range.end_row {
        overlay(&mut format.border_bottom, line);
    }
}

/// Value of the innermost cell covering `point`, if `point` is its top-left
/// corner.
fn cell_value(tree: &MapTree, layers: &[NodeId], point: CellPoint) -> Result<Option<CellValue>> {
    for &id in layers.iter().rev() {
        let node = tree.node(id)?;
        let Some(data) = node.as_placeholder() else {
            continue;
        };
        let placement = node.placement();
        let at_corner =
            placement.column_start == Some(point.column) && placement.row_start == Some(point.row);
        return Ok(if at_corner { data.value.clone() } else { None });
    }
    Ok(None)
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
    use crate::mapping::{build_tree, map_tree};
    use crate::types::{
        BorderLine, BorderStyle, CellElement, ContainerElement, ElementProps, Layout,
        LayoutElement,
    };

    fn cell_with(format: CellFormat, col_span: Option<u32>, value: Option<CellValue>) -> LayoutElement {
        LayoutElement::Cell(CellElement {
            props: ElementProps {
                format,
                ..ElementProps::default()
            },
            col_span,
            value,
            ..CellElement::default()
        })
    }

    fn resolved(layout: &Layout, options: &MapOptions) -> Mapping {
        let mut mapping = map_tree(build_tree(layout).unwrap()).unwrap();
        resolve_formats(&mut mapping, options).unwrap();
        mapping
    }

    fn info(mapping: &Mapping, column: u32, row: u32) -> CellInfo {
        mapping
            .layers()
            .cells
            .get(&CellPoint::new(column, row))
            .unwrap()
            .info
            .clone()
            .unwrap()
    }

    #[test]
    fn test_inner_layers_override_outer() {
        let layout = Layout {
            props: ElementProps {
                format: CellFormat {
                    bold: Some(true),
                    fill: Some("#EEEEEE".into()),
                    ..CellFormat::default()
                },
                ..ElementProps::default()
            },
            children: vec![
                cell_with(
                    CellFormat {
                        fill: Some("#FF0000".into()),
                        ..CellFormat::default()
                    },
                    None,
                    None,
                ),
                cell_with(CellFormat::default(), None, None),
            ],
        };
        let mapping = resolved(&layout, &MapOptions::default());
        let first = info(&mapping, 1, 1);
        assert_eq!(first.format.fill.as_deref(), Some("#FF0000"));
        assert_eq!(first.format.bold, Some(true));
        let second = info(&mapping, 1, 2);
        assert_eq!(second.format.fill.as_deref(), Some("#EEEEEE"));
    }

    #[test]
    fn test_outline_border_only_on_edges() {
        let line = BorderLine {
            style: BorderStyle::Medium,
            color: None,
        };
        let layout = Layout {
            children: vec![LayoutElement::Row(ContainerElement {
                props: ElementProps {
                    format: CellFormat {
                        border: Some(line.clone()),
                        ..CellFormat::default()
                    },
                    ..ElementProps::default()
                },
                children: vec![
                    cell_with(CellFormat::default(), None, None),
                    cell_with(CellFormat::default(), None, None),
                    cell_with(CellFormat::default(), None, None),
                ],
            })],
            ..Layout::default()
        };
        let mapping = resolved(&layout, &MapOptions::default());
        let left = info(&mapping, 1, 1).format;
        let middle = info(&mapping, 2, 1).format;
        let right = info(&mapping, 3, 1).format;
        assert_eq!(left.border_left, Some(line.clone()));
        assert_eq!(left.border_right, None);
        assert_eq!(middle.border_left, None);
        assert_eq!(middle.border_top, Some(line.clone()));
        assert_eq!(middle.border_bottom, Some(line.clone()));
        assert_eq!(right.border_right, Some(line));
    }

    #[test]
    fn test_value_only_at_top_left_corner() {
        let layout = Layout {
            children: vec![cell_with(
                CellFormat::default(),
                Some(2),
                Some(CellValue::Number(42.0)),
            )],
            ..Layout::default()
        };
        let mapping = resolved(&layout, &MapOptions::default());
        assert_eq!(info(&mapping, 1, 1).value, Some(CellValue::Number(42.0)));
        assert_eq!(info(&mapping, 2, 1).value, None);

        let quiet = MapOptions {
            emit_values: false,
            ..MapOptions::default()
        };
        let mapping = resolved(&layout, &quiet);
        assert_eq!(info(&mapping, 1, 1).value, None);
    }

    #[test]
    fn test_row_and_column_sizes_are_converted() {
        let layout = Layout {
            children: vec![LayoutElement::Cell(CellElement {
                props: ElementProps {
                    width: Some(75.0),
                    height: Some(20.0),
                    ..ElementProps::default()
                },
                ..CellElement::default()
            })],
            ..Layout::default()
        };
        let mapping = resolved(&layout, &MapOptions::default());
        let row = mapping.layers().rows.get(&1).unwrap().info.clone().unwrap();
        assert_eq!(row.height, Some(15.0));
        assert!(!row.hidden);
        let column = mapping.layers().columns.get(&1).unwrap().info.clone().unwrap();
        // 75px at Calibri 11 is 10 characters plus padding
        assert_eq!(column.width, Some(10.7109375));
    }
}
