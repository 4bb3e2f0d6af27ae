//! Unit conversion between pixels, points, EMUs and Excel column widths.
//!
//! Layout sizes are expressed in pixels at 96 DPI. Row heights are written in
//! points and column widths in "characters" of the workbook's default font,
//! which requires calibrating the font's maximum digit width first.

/// Screen resolution assumed for pixel values.
pub const PIXELS_PER_INCH: f64 = 96.0;

/// Typographic points per inch.
pub const POINTS_PER_INCH: f64 = 72.0;

/// English Metric Units per pixel (914400 EMU per inch / 96).
pub const EMU_PER_PIXEL: f64 = 9525.0;

/// English Metric Units per point.
pub const EMU_PER_POINT: f64 = 12700.0;

/// Border and margin padding Excel adds to every column, in pixels.
pub const CELL_PADDING_PX: f64 = 5.0;

/// Font size the digit width table is measured at.
const REFERENCE_FONT_SIZE: f64 = 11.0;

/// Convert pixels to points.
#[must_use]
pub fn px_to_points(px: f64) -> f64 {
    px * POINTS_PER_INCH / PIXELS_PER_INCH
}

/// Convert points to pixels.
#[must_use]
pub fn points_to_px(points: f64) -> f64 {
    points * PIXELS_PER_INCH / POINTS_PER_INCH
}

/// Convert pixels to whole EMUs (truncating).
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn px_to_emu(px: f64) -> i64 {
    (px * EMU_PER_PIXEL).trunc() as i64
}

/// Convert EMUs to pixels.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn emu_to_px(emu: i64) -> f64 {
    emu as f64 / EMU_PER_PIXEL
}

/// Convert points to whole EMUs (truncating).
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn points_to_emu(points: f64) -> i64 {
    (points * EMU_PER_POINT).trunc() as i64
}

/// Get the maximum digit width in pixels for a font at the given size.
///
/// Widths are measured at 11pt, 96 DPI and scaled linearly. Unknown fonts
/// fall back to Calibri.
#[must_use]
pub fn max_digit_width(font_family: &str, font_size: f64) -> f64 {
    let at_reference = match font_family {
        "Calibri" => 7.0,
        "Arial" => 6.5,
        "Times New Roman" => 5.7,
        "Verdana" => 7.5,
        "Consolas" => 7.7,
        "Courier New" => 7.3,
        "Tahoma" => 6.8,
        "Georgia" => 6.2,
        _ => 7.0,
    };
    if font_size > 0.0 {
        at_reference * font_size / REFERENCE_FONT_SIZE
    } else {
        at_reference
    }
}

/// Column width conversions calibrated to one font.
#[derive(Debug, Clone, Copy)]
pub struct UnitConverter {
    max_digit_width: f64,
}

impl Default for UnitConverter {
    fn default() -> Self {
        Self::for_font("Calibri", REFERENCE_FONT_SIZE)
    }
}

impl UnitConverter {
    /// Calibrate against a font family and size.
    #[must_use]
    pub fn for_font(font_family: &str, font_size: f64) -> Self {
        Self {
            max_digit_width: max_digit_width(font_family, font_size),
        }
    }

    #[must_use]
    pub fn with_max_digit_width(max_digit_width: f64) -> Self {
        Self { max_digit_width }
    }

    #[must_use]
    pub fn max_digit_width(&self) -> f64 {
        self.max_digit_width
    }

    /// Padding for a column of `chars` characters. Narrower than one
    /// character, the padding shrinks in proportion.
    fn padding_for(chars: f64) -> f64 {
        if chars < 1.0 {
            CELL_PADDING_PX * chars.max(0.0)
        } else {
            CELL_PADDING_PX
        }
    }

    /// Pixel width of a column that displays `chars` characters, including
    /// padding, truncated to whole pixels.
    #[must_use]
    pub fn chars_to_px(&self, chars: f64) -> f64 {
        (chars * self.max_digit_width + Self::padding_for(chars)).trunc()
    }

    /// Number of displayable characters in a column of `px` pixels, to two
    /// decimal places.
    #[must_use]
    pub fn px_to_chars(&self, px: f64) -> f64 {
        let px = px.max(0.0);
        let one_char = self.max_digit_width + CELL_PADDING_PX;
        let chars = if px < one_char {
            px / one_char
        } else {
            (px - CELL_PADDING_PX) / self.max_digit_width
        };
        (chars * 100.0 + 0.5).trunc() / 100.0
    }

    /// Width stored in the `<col width>` attribute for `chars` characters:
    /// the character count plus padding, truncated to 1/256 of a character.
    #[must_use]
    pub fn chars_to_file_width(&self, chars: f64) -> f64 {
        let px = chars * self.max_digit_width + Self::padding_for(chars);
        (px / self.max_digit_width * 256.0).trunc() / 256.0
    }

    /// Width stored in the `<col width>` attribute for a pixel width.
    #[must_use]
    pub fn px_to_file_width(&self, px: f64) -> f64 {
        self.chars_to_file_width(self.px_to_chars(px))
    }

    /// Pixel width of a stored `<col width>` value.
    #[must_use]
    pub fn file_width_to_px(&self, width: f64) -> f64 {
        (width * self.max_digit_width).trunc()
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
    use test_case::test_case;

    #[test]
    fn test_points_and_pixels() {
        assert_eq!(px_to_points(20.0), 15.0);
        assert_eq!(points_to_px(15.0), 20.0);
    }

    #[test]
    fn test_emu_truncates() {
        assert_eq!(px_to_emu(1.0), 9525);
        assert_eq!(px_to_emu(1.5), 14287);
        assert_eq!(points_to_emu(1.0), 12700);
        assert_eq!(emu_to_px(95250), 10.0);
    }

    #[test_case("Calibri", 11.0, 7.0 ; "calibri")]
    #[test_case("Arial", 11.0, 6.5 ; "arial")]
    #[test_case("Calibri", 22.0, 14.0 ; "scaled")]
    #[test_case("Comic Sans", 11.0, 7.0 ; "unknown falls back")]
    fn test_max_digit_width(family: &str, size: f64, expected: f64) {
        assert_eq!(max_digit_width(family, size), expected);
    }

    #[test]
    fn test_default_excel_column() {
        // 8.43 characters of Calibri 11 is the classic 64px column
        let conv = UnitConverter::default();
        assert_eq!(conv.chars_to_px(8.43), 64.0);
        assert_eq!(conv.px_to_chars(64.0), 8.43);
    }

    #[test]
    fn test_file_width_includes_padding() {
        let conv = UnitConverter::default();
        // (10 * 7 + 5) / 7 = 10.714..., truncated to 1/256
        assert_eq!(conv.chars_to_file_width(10.0), 2742.0 / 256.0);
    }

    #[test]
    fn test_narrow_column_padding_is_proportional() {
        let conv = UnitConverter::default();
        assert_eq!(conv.chars_to_px(0.5), 6.0);
        assert_eq!(conv.px_to_chars(6.0), 0.5);
        assert_eq!(conv.px_to_chars(0.0), 0.0);
    }

    #[test]
    fn test_explicit_digit_width_round_trips_file_width() {
        let conv = UnitConverter::with_max_digit_width(8.0);
        assert_eq!(conv.max_digit_width(), 8.0);
        // (85 - 5) / 8 = 10 chars, stored as (10 * 8 + 5) / 8
        assert_eq!(conv.px_to_file_width(85.0), 10.625);
        assert_eq!(conv.file_width_to_px(10.625), 85.0);
        assert_eq!(conv.file_width_to_px(10.0), 80.0);
    }
}
