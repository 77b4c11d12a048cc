//! Text reconstruction for cell, range and sheet references.
//!
//! Relative components carry offsets from a base cell. When no base cell is known (always the case
//! for defined names) a relative cell can only be expressed in R1C1 notation, so the whole cell
//! switches to R1C1 regardless of the requested style.

use serde::{Deserialize, Serialize};

use crate::Ref3D;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceStyle {
    /// `$H$6`
    #[default]
    A1,
    /// `R6C8`
    R1C1,
}

impl ReferenceStyle {
    fn is_r1c1(self) -> bool {
        matches!(self, ReferenceStyle::R1C1)
    }
}

const ROW_WRAP: i32 = 0x1_0000;
const COL_WRAP: i32 = 0x100;

/// Excel error literals keyed by their BIFF error code.
pub const ERROR_CODES: [(u8, &str); 7] = [
    (0x00, "#NULL!"),
    (0x07, "#DIV/0!"),
    (0x0F, "#VALUE!"),
    (0x17, "#REF!"),
    (0x1D, "#NAME?"),
    (0x24, "#NUM!"),
    (0x2A, "#N/A"),
];

pub fn error_text_from_code(code: u8) -> Option<&'static str> {
    ERROR_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, text)| *text)
}

pub fn error_code_from_text(text: &str) -> Option<u8> {
    ERROR_CODES
        .iter()
        .find(|(_, t)| t.eq_ignore_ascii_case(text))
        .map(|(code, _)| *code)
}

/// Description of a negative sheet index produced by the EXTERNSHEET resolver.
pub fn unresolved_sheet_text(code: i32) -> String {
    match code {
        -1 => "?internal; any sheet?".to_string(),
        -2 => "internal; deleted sheet".to_string(),
        -3 => "internal; macro sheet".to_string(),
        -4 => "<<external>>".to_string(),
        other => format!("?error {other}?"),
    }
}

/// Render a number the way Excel converts it to text by default: integral values without a
/// fractional part, everything else in shortest round-trip form.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

/// `7 => "H"`, `27 => "AB"`.
pub fn col_name(col: u32) -> String {
    let mut n = col + 1;
    let mut out = Vec::<u8>::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.iter().rev().map(|&b| b as char).collect()
}

/// `(5, 7) => "H6"`.
pub fn cell_name(row: u32, col: u32) -> String {
    format!("{}{}", col_name(col), row + 1)
}

/// `(5, 7) => "$H$6"` or `"R6C8"`.
pub fn cell_name_abs(row: i32, col: i32, style: ReferenceStyle) -> String {
    match (style, u32::try_from(row), u32::try_from(col)) {
        (ReferenceStyle::A1, Ok(row), Ok(col)) => format!("${}${}", col_name(col), row + 1),
        _ => format!("R{}C{}", row + 1, col + 1),
    }
}

pub fn row_name_rel(row: i32, relative: bool, base_row: Option<i32>, style: ReferenceStyle) -> String {
    let base_row = if style.is_r1c1() { None } else { base_row };
    match (relative, base_row) {
        (false, None) => format!("R{}", row + 1),
        (false, Some(_)) => format!("${}", row + 1),
        (true, None) if row != 0 => format!("R[{row}]"),
        (true, None) => "R".to_string(),
        (true, Some(base)) => format!("{}", (base + row).rem_euclid(ROW_WRAP) + 1),
    }
}

pub fn col_name_rel(col: i32, relative: bool, base_col: Option<i32>, style: ReferenceStyle) -> String {
    let base_col = if style.is_r1c1() { None } else { base_col };
    match (relative, base_col) {
        (false, None) => format!("C{}", col + 1),
        (false, Some(_)) => format!("${}", col_name(col.max(0) as u32)),
        (true, None) if col != 0 => format!("C[{col}]"),
        (true, None) => "C".to_string(),
        (true, Some(base)) => col_name((base + col).rem_euclid(COL_WRAP) as u32),
    }
}

/// Name a cell whose components may be relative to `base` (`(row, col)` of the owning cell).
pub fn cell_name_rel(
    row: i32,
    col: i32,
    row_relative: bool,
    col_relative: bool,
    base: Option<(i32, i32)>,
    style: ReferenceStyle,
) -> String {
    if !row_relative && !col_relative {
        return cell_name_abs(row, col, style);
    }
    let style = if base.is_none() {
        ReferenceStyle::R1C1
    } else {
        style
    };
    let c = col_name_rel(col, col_relative, base.map(|b| b.1), style);
    let r = row_name_rel(row, row_relative, base.map(|b| b.0), style);
    match style {
        ReferenceStyle::R1C1 => r + &c,
        ReferenceStyle::A1 => c + &r,
    }
}

/// `(5, 20, 7, 10) => "$H$6:$J$20"`; a single-cell box collapses to `"$H$6"`.
pub fn range_name_2d(row_lo: i32, row_hi: i32, col_lo: i32, col_hi: i32, style: ReferenceStyle) -> String {
    let first = cell_name_abs(row_lo, col_lo, style);
    if row_hi == row_lo + 1 && col_hi == col_lo + 1 {
        return first;
    }
    format!("{first}:{}", cell_name_abs(row_hi - 1, col_hi - 1, style))
}

/// Relative counterpart of [`range_name_2d`]. `coords` is `(row_lo, row_hi, col_lo, col_hi)`.
pub fn range_name_2d_rel(
    coords: [i32; 4],
    relflags: [bool; 4],
    base: Option<(i32, i32)>,
    style: ReferenceStyle,
) -> String {
    let [row_lo, row_hi, col_lo, col_hi] = coords;
    let [row_lo_rel, row_hi_rel, col_lo_rel, col_hi_rel] = relflags;
    let any_row_rel = row_lo_rel || row_hi_rel;
    let any_col_rel = col_lo_rel || col_hi_rel;
    let style = if base.is_none() && (any_row_rel || any_col_rel) {
        ReferenceStyle::R1C1
    } else {
        style
    };

    let first = cell_name_rel(row_lo, col_lo, row_lo_rel, col_lo_rel, base, style);
    let single_cell = row_hi == row_lo + 1
        && col_hi == col_lo + 1
        && row_lo_rel == row_hi_rel
        && col_lo_rel == col_hi_rel;
    if single_cell {
        return first;
    }
    let last = cell_name_rel(row_hi - 1, col_hi - 1, row_hi_rel, col_hi_rel, base, style);
    format!("{first}:{last}")
}

/// Sheet name for use as a reference prefix, quoted when it contains a space or an apostrophe.
/// Negative indices are resolver sentinels.
pub fn quoted_sheet_name(sheet_names: &[String], index: i32) -> String {
    let name = usize::try_from(index)
        .ok()
        .and_then(|idx| sheet_names.get(idx))
        .cloned()
        .unwrap_or_else(|| {
            if index >= 0 {
                format!("?sheet {index}?")
            } else {
                unresolved_sheet_text(index)
            }
        });
    quote_sheet_name(&name)
}

pub fn quote_sheet_name(name: &str) -> String {
    if name.contains('\'') {
        return format!("'{}'", name.replace('\'', "''"));
    }
    if name.contains(' ') {
        return format!("'{name}'");
    }
    name.to_string()
}

/// `"Sheet2"` or `"Sheet2:Sheet4"` for the half-open range `lo..hi`.
pub fn sheet_range(sheet_names: &[String], lo: i32, hi: i32) -> String {
    let mut out = quoted_sheet_name(sheet_names, lo);
    if lo != hi - 1 {
        out.push(':');
        out.push_str(&quoted_sheet_name(sheet_names, hi - 1));
    }
    out
}

/// Like [`sheet_range`], but the current-sheet marker renders as an empty prefix.
pub fn sheet_range_rel(sheet_names: &[String], range: (i32, i32), relflags: (bool, bool)) -> String {
    if !relflags.0 && !relflags.1 {
        return sheet_range(sheet_names, range.0, range.1);
    }
    String::new()
}

/// `Ref3D([1, 3, 5, 20, 7, 10]) => "Sheet2:Sheet3!$H$6:$J$20"`.
pub fn range_name_3d(sheet_names: &[String], reference: &Ref3D, style: ReferenceStyle) -> String {
    let c = reference.coords;
    format!(
        "{}!{}",
        sheet_range(sheet_names, c[0], c[1]),
        range_name_2d(c[2], c[3], c[4], c[5], style)
    )
}

/// Display a possibly relative 3-D reference. References on the current sheet carry no prefix.
pub fn range_name_3d_rel(
    sheet_names: &[String],
    reference: &Ref3D,
    base: Option<(i32, i32)>,
    style: ReferenceStyle,
) -> String {
    let c = reference.coords;
    let f = reference.relflags;
    let sheets = sheet_range_rel(sheet_names, (c[0], c[1]), (f[0], f[1]));
    let cells = range_name_2d_rel([c[2], c[3], c[4], c[5]], [f[2], f[3], f[4], f[5]], base, style);
    if sheets.is_empty() {
        cells
    } else {
        format!("{sheets}!{cells}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn column_letters() {
        assert_eq!(col_name(0), "A");
        assert_eq!(col_name(7), "H");
        assert_eq!(col_name(25), "Z");
        assert_eq!(col_name(27), "AB");
        assert_eq!(col_name(255), "IV");
        assert_eq!(col_name(16_383), "XFD");
    }

    #[test]
    fn absolute_cells() {
        assert_eq!(cell_name(5, 7), "H6");
        assert_eq!(cell_name_abs(5, 7, ReferenceStyle::A1), "$H$6");
        assert_eq!(cell_name_abs(5, 7, ReferenceStyle::R1C1), "R6C8");
    }

    #[test]
    fn relative_cells_without_base_use_r1c1() {
        assert_eq!(cell_name_rel(0, 0, true, true, None, ReferenceStyle::A1), "RC");
        assert_eq!(cell_name_rel(-1, 2, true, true, None, ReferenceStyle::A1), "R[-1]C[2]");
        assert_eq!(cell_name_rel(4, 2, false, true, None, ReferenceStyle::A1), "R5C[2]");
        assert_eq!(cell_name_rel(0, 0, false, false, None, ReferenceStyle::A1), "$A$1");
    }

    #[test]
    fn relative_cells_with_base_use_a1() {
        assert_eq!(cell_name_rel(1, 1, true, true, Some((2, 3)), ReferenceStyle::A1), "E4");
        assert_eq!(cell_name_rel(1, 1, true, false, Some((2, 3)), ReferenceStyle::A1), "$B4");
        assert_eq!(cell_name_rel(-1, 0, true, true, Some((0, 0)), ReferenceStyle::A1), "A65536");
    }

    #[test]
    fn ranges_2d() {
        assert_eq!(range_name_2d(5, 20, 7, 10, ReferenceStyle::A1), "$H$6:$J$20");
        assert_eq!(range_name_2d(5, 6, 7, 8, ReferenceStyle::A1), "$H$6");
        assert_eq!(range_name_2d(5, 20, 7, 10, ReferenceStyle::R1C1), "R6C8:R20C10");
        assert_eq!(
            range_name_2d_rel([-32, -22, -13, 13], [true, true, true, true], None, ReferenceStyle::A1),
            "R[-32]C[-13]:R[-23]C[12]"
        );
    }

    #[test]
    fn sheet_prefixes() {
        let sheets = names(&["Sheet1", "My Sheet", "Bob's"]);
        assert_eq!(quoted_sheet_name(&sheets, 0), "Sheet1");
        assert_eq!(quoted_sheet_name(&sheets, 1), "'My Sheet'");
        assert_eq!(quoted_sheet_name(&sheets, 2), "'Bob''s'");
        assert_eq!(quoted_sheet_name(&sheets, -4), "<<external>>");
        assert_eq!(quoted_sheet_name(&sheets, -2), "'internal; deleted sheet'");
        assert_eq!(sheet_range(&sheets, 0, 2), "Sheet1:'My Sheet'");
        assert_eq!(sheet_range_rel(&sheets, (0, 1), (true, true)), "");
    }

    #[test]
    fn ranges_3d() {
        let sheets = names(&["Sheet1", "Sheet2", "Sheet3"]);
        let r = Ref3D::new([1, 3, 5, 20, 7, 10]);
        assert_eq!(range_name_3d(&sheets, &r, ReferenceStyle::A1), "Sheet2:Sheet3!$H$6:$J$20");

        let current = Ref3D::current_sheet((0, 1), (0, 1), (false, false), (false, false));
        assert_eq!(range_name_3d_rel(&sheets, &current, None, ReferenceStyle::A1), "$A$1");

        let rel = Ref3D::with_relflags([0, 1, 2, 3, 1, 2], [false, false, true, true, false, false]);
        assert_eq!(range_name_3d_rel(&sheets, &rel, None, ReferenceStyle::A1), "Sheet1!R[2]C2");
    }

    #[test]
    fn error_literals() {
        assert_eq!(error_text_from_code(0x07), Some("#DIV/0!"));
        assert_eq!(error_text_from_code(0x2A), Some("#N/A"));
        assert_eq!(error_text_from_code(0x01), None);
        assert_eq!(error_code_from_text("#ref!"), Some(0x17));
    }

    #[test]
    fn numbers_use_default_text_form() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(1e20), "100000000000000000000");
    }
}
