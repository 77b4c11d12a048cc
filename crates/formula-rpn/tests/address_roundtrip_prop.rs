use formula_rpn::address::{encode_cell_address, encode_cell_fields, adjust_cell_address};
use formula_rpn::{decode_cell_address, AddressMode, CellAddress, VersionFamily};
use proptest::prelude::*;

const CASES: u32 = 256;

fn family() -> impl Strategy<Value = VersionFamily> {
    prop::sample::select(VersionFamily::ALL.to_vec())
}

fn row_modulus(family: VersionFamily) -> i32 {
    if family.has_wide_addresses() {
        0x1_0000
    } else {
        0x4000
    }
}

/// A cell address whose components fit the family's field widths under Method B addressing.
fn reldelta_address() -> impl Strategy<Value = (VersionFamily, CellAddress)> {
    (family(), any::<bool>(), any::<bool>(), any::<u16>(), any::<u8>()).prop_map(
        |(family, row_relative, col_relative, raw_row, raw_col)| {
            let modulus = row_modulus(family);
            let raw_row = i32::from(raw_row) % modulus;
            let row = if row_relative && raw_row >= modulus / 2 {
                raw_row - modulus
            } else {
                raw_row
            };
            let raw_col = i32::from(raw_col);
            let col = if col_relative && raw_col >= 128 {
                raw_col - 256
            } else {
                raw_col
            };
            (
                family,
                CellAddress {
                    row,
                    col,
                    row_relative,
                    col_relative,
                },
            )
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig { cases: CASES, .. ProptestConfig::default() })]

    #[test]
    fn reldelta_encode_then_decode_is_identity((family, address) in reldelta_address()) {
        let bytes = encode_cell_address(family, address, AddressMode::RelDelta);
        let decoded = decode_cell_address(&bytes, 0, family, AddressMode::RelDelta);
        prop_assert_eq!(decoded, Some(address));
    }

    #[test]
    fn relative_offsets_stay_within_half_the_modulus((family, address) in reldelta_address()) {
        let (row_field, col_field) = encode_cell_fields(family, address, AddressMode::RelDelta);
        let decoded = adjust_cell_address(family, row_field, col_field, AddressMode::RelDelta);
        let half = row_modulus(family) / 2;
        if decoded.row_relative {
            prop_assert!((-half..half).contains(&decoded.row));
        } else {
            prop_assert!((0..2 * half).contains(&decoded.row));
        }
        if decoded.col_relative {
            prop_assert!((-128..128).contains(&decoded.col));
        } else {
            prop_assert!((0..256).contains(&decoded.col));
        }
    }

    #[test]
    fn base_mode_encode_then_decode_is_identity(
        family in family(),
        row_relative in any::<bool>(),
        col_relative in any::<bool>(),
        raw_row in 0i32..0x4000,
        raw_col in 0i32..0x100,
        base_row in 0i32..0x4000,
        base_col in 0i32..0x100,
    ) {
        let mode = AddressMode::Base { row: base_row, col: base_col };
        let address = CellAddress {
            row: if row_relative { raw_row - base_row } else { raw_row },
            col: if col_relative { raw_col - base_col } else { raw_col },
            row_relative,
            col_relative,
        };
        let bytes = encode_cell_address(family, address, mode);
        prop_assert_eq!(decode_cell_address(&bytes, 0, family, mode), Some(address));
    }
}
