//! A1-style cell and range references.
//!
//! All indices here are 1-based Excel indices, matching the numbering of the
//! mapped slot chains.

use std::fmt;

use serde::Serialize;

/// Convert a 1-based column index to its letters (1 → "A", 27 → "AA").
///
/// Index 0 has no letters and yields an empty string.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn column_letter(column: u32) -> String {
    let mut result = String::new();
    let mut n = column;
    while n > 0 {
        n -= 1;
        let c = char::from(b'A' + (n % 26) as u8);
        result.insert(0, c);
        n /= 26;
    }
    result
}

/// Format a 1-based (column, row) pair as "B3".
#[must_use]
pub fn cell_ref(column: u32, row: u32) -> String {
    format!("{}{}", column_letter(column), row)
}

/// Parse a cell reference like "B3" (or "$B$3") into a 1-based (column, row).
#[must_use]
pub fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    let mut column: u32 = 0;
    let mut row: u32 = 0;
    let mut saw_column = false;
    let mut saw_row = false;

    for ch in cell_ref.trim().chars() {
        if ch == '$' {
            continue;
        }
        if ch.is_ascii_alphabetic() && !saw_row {
            let upper = ch.to_ascii_uppercase();
            column = column.checked_mul(26)?.checked_add(upper as u32 - 'A' as u32 + 1)?;
            saw_column = true;
        } else if ch.is_ascii_digit() {
            row = row.checked_mul(10)?.checked_add(ch as u32 - '0' as u32)?;
            saw_row = true;
        } else {
            return None;
        }
    }

    if !saw_column || !saw_row || row == 0 {
        return None;
    }
    Some((column, row))
}

/// Quote a sheet name for use in a reference when it needs it.
fn quote_sheet(sheet: &str) -> String {
    let plain = sheet
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !sheet.starts_with(|c: char| c.is_ascii_digit());
    if plain {
        sheet.to_string()
    } else {
        format!("'{}'", sheet.replace('\'', "''"))
    }
}

/// A rectangular range of cells, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeReference {
    pub start_column: u32,
    pub start_row: u32,
    pub end_column: u32,
    pub end_row: u32,
}

impl RangeReference {
    /// Build a range, normalising the corners so start <= end.
    #[must_use]
    pub fn new(start_column: u32, start_row: u32, end_column: u32, end_row: u32) -> Self {
        Self {
            start_column: start_column.min(end_column),
            start_row: start_row.min(end_row),
            end_column: start_column.max(end_column),
            end_row: start_row.max(end_row),
        }
    }

    /// Parse "A1:C4" or a single "B2".
    #[must_use]
    pub fn parse(range: &str) -> Option<Self> {
        if let Some((start, end)) = range.split_once(':') {
            let (sc, sr) = parse_cell_ref(start)?;
            let (ec, er) = parse_cell_ref(end)?;
            Some(Self::new(sc, sr, ec, er))
        } else {
            let (c, r) = parse_cell_ref(range)?;
            Some(Self::new(c, r, c, r))
        }
    }

    #[must_use]
    pub fn is_single_cell(&self) -> bool {
        self.start_column == self.end_column && self.start_row == self.end_row
    }

    #[must_use]
    pub fn contains(&self, column: u32, row: u32) -> bool {
        (self.start_column..=self.end_column).contains(&column)
            && (self.start_row..=self.end_row).contains(&row)
    }

    #[must_use]
    pub fn overlaps(&self, other: &RangeReference) -> bool {
        self.start_column <= other.end_column
            && other.start_column <= self.end_column
            && self.start_row <= other.end_row
            && other.start_row <= self.end_row
    }

    /// Absolute, sheet-qualified form: `'My Sheet'!$A$1:$C$4`.
    #[must_use]
    pub fn absolute(&self, sheet: &str) -> String {
        let start = format!("${}${}", column_letter(self.start_column), self.start_row);
        if self.is_single_cell() {
            format!("{}!{}", quote_sheet(sheet), start)
        } else {
            format!(
                "{}!{}:${}${}",
                quote_sheet(sheet),
                start,
                column_letter(self.end_column),
                self.end_row
            )
        }
    }
}

impl fmt::Display for RangeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_cell() {
            write!(f, "{}", cell_ref(self.start_column, self.start_row))
        } else {
            write!(
                f,
                "{}:{}",
                cell_ref(self.start_column, self.start_row),
                cell_ref(self.end_column, self.end_row)
            )
        }
    }
}

/// Bounding union of several ranges, used for defined names shared by more
/// than one node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositeRangeReference {
    bounds: Option<RangeReference>,
    parts: usize,
}

impl CompositeRangeReference {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grow the composite to include `range`.
    pub fn update(&mut self, range: RangeReference) {
        self.parts += 1;
        self.bounds = Some(match self.bounds {
            None => range,
            Some(b) => RangeReference {
                start_column: b.start_column.min(range.start_column),
                start_row: b.start_row.min(range.start_row),
                end_column: b.end_column.max(range.end_column),
                end_row: b.end_row.max(range.end_row),
            },
        });
    }

    /// The bounding range, if any part was added.
    #[must_use]
    pub fn bounds(&self) -> Option<RangeReference> {
        self.bounds
    }

    /// Number of ranges folded into this composite.
    #[must_use]
    pub fn parts(&self) -> usize {
        self.parts
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(1, "A")]
    #[test_case(26, "Z")]
    #[test_case(27, "AA")]
    #[test_case(702, "ZZ")]
    #[test_case(703, "AAA")]
    fn test_column_letter(column: u32, expected: &str) {
        assert_eq!(column_letter(column), expected);
    }

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(parse_cell_ref("A1"), Some((1, 1)));
        assert_eq!(parse_cell_ref("$AB$12"), Some((28, 12)));
        assert_eq!(parse_cell_ref("A0"), None);
        assert_eq!(parse_cell_ref("1A"), None);
        assert_eq!(parse_cell_ref("A-1"), None);
    }

    #[test]
    fn test_range_display_and_absolute() {
        let range = RangeReference::new(3, 4, 1, 1);
        assert_eq!(range.to_string(), "A1:C4");
        assert_eq!(range.absolute("Sheet1"), "Sheet1!$A$1:$C$4");
        assert_eq!(range.absolute("My Sheet"), "'My Sheet'!$A$1:$C$4");
        let single = RangeReference::new(2, 2, 2, 2);
        assert_eq!(single.absolute("Data"), "Data!$B$2");
        assert_eq!(RangeReference::parse("C4:A1"), Some(range));
    }

    #[test]
    fn test_composite_uses_column_extents() {
        // A tall narrow range followed by a short wide one: the column extent
        // must come from the column values, not the row values.
        let mut composite = CompositeRangeReference::new();
        composite.update(RangeReference::new(1, 1, 1, 10));
        composite.update(RangeReference::new(2, 2, 5, 2));
        assert_eq!(composite.parts(), 2);
        assert_eq!(composite.bounds(), Some(RangeReference::new(1, 1, 5, 10)));
    }

    #[test]
    fn test_overlap() {
        let a = RangeReference::new(1, 1, 2, 2);
        assert!(a.overlaps(&RangeReference::new(2, 2, 3, 3)));
        assert!(!a.overlaps(&RangeReference::new(3, 1, 4, 2)));
        assert!(a.contains(2, 1));
    }
}
