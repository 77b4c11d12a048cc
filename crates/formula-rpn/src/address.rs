//! Packed cell address fields used by `tRef`, `tArea` and their 3-D variants.
//!
//! BIFF8 stores a cell as `[rw: u16][col: u16]` where bit 15 of the column field marks a relative
//! row and bit 14 a relative column; only the low 8 bits of the column field carry the column.
//! BIFF2-BIFF7 store `[rw: u16][col: u8]` with the same two flags in bits 15 and 14 of the row
//! field, leaving 14 bits for the row.

use serde::{Deserialize, Serialize};

use crate::VersionFamily;

/// How relative row/column fields are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressMode {
    /// "Method B" addressing used by defined names: relative fields are signed offsets from an
    /// unspecified base cell, wrapping at the field width.
    #[default]
    RelDelta,
    /// Relative fields are stored as absolute positions and corrected by subtracting the cell
    /// that owns the formula.
    Base { row: i32, col: i32 },
}

/// Decoded cell coordinates. Relative components hold signed offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellAddress {
    pub row: i32,
    pub col: i32,
    pub row_relative: bool,
    pub col_relative: bool,
}

const ROW_RELATIVE_BIT: u16 = 0x8000;
const COL_RELATIVE_BIT: u16 = 0x4000;

const BIFF8_ROW_MODULUS: i32 = 0x1_0000;
const BIFF7_ROW_MODULUS: i32 = 0x4000;
const COL_MODULUS: i32 = 0x100;

/// Bytes occupied by one packed cell address.
pub const fn cell_address_len(family: VersionFamily) -> usize {
    if family.has_wide_addresses() {
        4
    } else {
        3
    }
}

/// Bytes occupied by a packed `(first, last)` range: both rows, then both columns.
pub const fn range_address_len(family: VersionFamily) -> usize {
    if family.has_wide_addresses() {
        8
    } else {
        6
    }
}

/// Interpret raw row/column fields. `col_field` is the full 16-bit field for BIFF8 and the
/// column byte for earlier families.
pub fn adjust_cell_address(
    family: VersionFamily,
    row_field: u16,
    col_field: u16,
    mode: AddressMode,
) -> CellAddress {
    let (row_relative, col_relative, mut row, mut col, row_modulus) = if family.has_wide_addresses()
    {
        (
            col_field & ROW_RELATIVE_BIT != 0,
            col_field & COL_RELATIVE_BIT != 0,
            i32::from(row_field),
            i32::from(col_field & 0x00FF),
            BIFF8_ROW_MODULUS,
        )
    } else {
        (
            row_field & ROW_RELATIVE_BIT != 0,
            row_field & COL_RELATIVE_BIT != 0,
            i32::from(row_field & 0x3FFF),
            i32::from(col_field & 0x00FF),
            BIFF7_ROW_MODULUS,
        )
    };

    match mode {
        AddressMode::RelDelta => {
            if row_relative && row >= row_modulus / 2 {
                row -= row_modulus;
            }
            if col_relative && col >= COL_MODULUS / 2 {
                col -= COL_MODULUS;
            }
        }
        AddressMode::Base {
            row: base_row,
            col: base_col,
        } => {
            if row_relative {
                row -= base_row;
            }
            if col_relative {
                col -= base_col;
            }
        }
    }

    CellAddress {
        row,
        col,
        row_relative,
        col_relative,
    }
}

fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn read_col(data: &[u8], offset: usize, family: VersionFamily) -> Option<u16> {
    if family.has_wide_addresses() {
        read_u16(data, offset)
    } else {
        data.get(offset).copied().map(u16::from)
    }
}

/// Decode one packed cell address at `offset`. Returns `None` when `data` is too short.
pub fn decode_cell_address(
    data: &[u8],
    offset: usize,
    family: VersionFamily,
    mode: AddressMode,
) -> Option<CellAddress> {
    let row = read_u16(data, offset)?;
    let col = read_col(data, offset + 2, family)?;
    Some(adjust_cell_address(family, row, col, mode))
}

/// Decode a packed range (`rwFirst, rwLast, colFirst, colLast`) at `offset`.
pub fn decode_range_address(
    data: &[u8],
    offset: usize,
    family: VersionFamily,
    mode: AddressMode,
) -> Option<(CellAddress, CellAddress)> {
    let row1 = read_u16(data, offset)?;
    let row2 = read_u16(data, offset + 2)?;
    let (col1, col2) = if family.has_wide_addresses() {
        (read_u16(data, offset + 4)?, read_u16(data, offset + 6)?)
    } else {
        (
            read_col(data, offset + 4, family)?,
            read_col(data, offset + 5, family)?,
        )
    };
    Some((
        adjust_cell_address(family, row1, col1, mode),
        adjust_cell_address(family, row2, col2, mode),
    ))
}

/// Pack a cell address into its raw `(row_field, col_field)` pair.
///
/// This is the inverse of [`adjust_cell_address`]; out-of-range coordinates are truncated to the
/// field width.
pub fn encode_cell_fields(
    family: VersionFamily,
    address: CellAddress,
    mode: AddressMode,
) -> (u16, u16) {
    let (mut row, mut col) = (address.row, address.col);
    if let AddressMode::Base {
        row: base_row,
        col: base_col,
    } = mode
    {
        if address.row_relative {
            row += base_row;
        }
        if address.col_relative {
            col += base_col;
        }
    }

    let mut flags = 0u16;
    if address.row_relative {
        flags |= ROW_RELATIVE_BIT;
    }
    if address.col_relative {
        flags |= COL_RELATIVE_BIT;
    }

    if family.has_wide_addresses() {
        (row as u16, flags | (col as u16 & 0x00FF))
    } else {
        (flags | (row as u16 & 0x3FFF), col as u16 & 0x00FF)
    }
}

/// Serialize a cell address in the layout [`decode_cell_address`] reads.
pub fn encode_cell_address(
    family: VersionFamily,
    address: CellAddress,
    mode: AddressMode,
) -> Vec<u8> {
    let (row, col) = encode_cell_fields(family, address, mode);
    let mut out = row.to_le_bytes().to_vec();
    if family.has_wide_addresses() {
        out.extend_from_slice(&col.to_le_bytes());
    } else {
        out.push(col as u8);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(row: i32, col: i32, row_relative: bool, col_relative: bool) -> CellAddress {
        CellAddress {
            row,
            col,
            row_relative,
            col_relative,
        }
    }

    #[test]
    fn biff8_absolute_address() {
        // $C$7
        let data = [0x06, 0x00, 0x02, 0x00];
        let got = decode_cell_address(&data, 0, VersionFamily::Biff8, AddressMode::RelDelta);
        assert_eq!(got, Some(addr(6, 2, false, false)));
    }

    #[test]
    fn biff8_relative_offsets_wrap_negative() {
        // R[-1]C[-2]
        let data = [0xFF, 0xFF, 0xFE, 0xC0];
        let got = decode_cell_address(&data, 0, VersionFamily::Biff8, AddressMode::RelDelta);
        assert_eq!(got, Some(addr(-1, -2, true, true)));
    }

    #[test]
    fn biff8_absolute_fields_never_wrap() {
        let data = [0xFF, 0xFF, 0xFF, 0x00];
        let got = decode_cell_address(&data, 0, VersionFamily::Biff8, AddressMode::RelDelta);
        assert_eq!(got, Some(addr(65535, 255, false, false)));
    }

    #[test]
    fn biff7_flags_live_in_the_row_field() {
        // Row 0x3FFF relative => -1; col 0x80 relative => -128.
        let data = [0xFF, 0xFF, 0x80];
        let got = decode_cell_address(&data, 0, VersionFamily::Biff5, AddressMode::RelDelta);
        assert_eq!(got, Some(addr(-1, -128, true, true)));

        let data = [0x05, 0x00, 0x03];
        let got = decode_cell_address(&data, 0, VersionFamily::Biff5, AddressMode::RelDelta);
        assert_eq!(got, Some(addr(5, 3, false, false)));
    }

    #[test]
    fn base_mode_subtracts_the_owning_cell() {
        let data = [0x0A, 0x00, 0x05, 0xC0];
        let got = decode_cell_address(
            &data,
            0,
            VersionFamily::Biff8,
            AddressMode::Base { row: 4, col: 1 },
        );
        assert_eq!(got, Some(addr(6, 4, true, true)));
    }

    #[test]
    fn range_reads_rows_then_columns() {
        // $B$2:$D$10 in BIFF8
        let data = [0x01, 0x00, 0x09, 0x00, 0x01, 0x00, 0x03, 0x00];
        let got = decode_range_address(&data, 0, VersionFamily::Biff8, AddressMode::RelDelta);
        assert_eq!(
            got,
            Some((addr(1, 1, false, false), addr(9, 3, false, false)))
        );

        let data = [0x01, 0x00, 0x09, 0x00, 0x01, 0x03];
        let got = decode_range_address(&data, 0, VersionFamily::Biff4, AddressMode::RelDelta);
        assert_eq!(
            got,
            Some((addr(1, 1, false, false), addr(9, 3, false, false)))
        );
    }

    #[test]
    fn truncated_input_is_none() {
        assert_eq!(
            decode_cell_address(&[0x00, 0x00, 0x00], 0, VersionFamily::Biff8, AddressMode::RelDelta),
            None
        );
        assert_eq!(
            decode_range_address(&[0; 5], 0, VersionFamily::Biff5, AddressMode::RelDelta),
            None
        );
        assert_eq!(
            decode_cell_address(&[0; 4], usize::MAX, VersionFamily::Biff8, AddressMode::RelDelta),
            None
        );
    }

    #[test]
    fn encode_matches_decode_layout() {
        let a = addr(-3, 4, true, false);
        for family in VersionFamily::ALL {
            let bytes = encode_cell_address(family, a, AddressMode::RelDelta);
            assert_eq!(bytes.len(), cell_address_len(family));
            assert_eq!(
                decode_cell_address(&bytes, 0, family, AddressMode::RelDelta),
                Some(a),
                "{family:?}"
            );
        }
    }
}
