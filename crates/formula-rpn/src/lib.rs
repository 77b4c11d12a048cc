//! BIFF2-BIFF8 formula token tables.
//!
//! Pure, workbook-independent helpers for reading Excel's tokenized (`ptg`) formula streams:
//! - `ptg`: opcode constants and the per-version token size table
//! - `ftab`: the built-in function table used by `tFunc`/`tFuncVar`
//! - `address`: packed cell/range address fields and their relative flags
//! - `reference`: [`Ref3D`] boxes and the range/intersection operators on them
//! - `display`: A1/R1C1 text for cells, ranges and sheet prefixes
//!
//! Workbook-level concerns (EXTERNSHEET resolution, NAME records, recursive name evaluation) live
//! in `formula-names`.

pub mod address;
pub mod display;
mod ftab;
pub mod ptg;
mod reference;
mod version;

pub use address::{
    decode_cell_address, decode_range_address, AddressMode, CellAddress,
};
pub use display::ReferenceStyle;
pub use ftab::{
    function_id_from_name, function_name_from_id, function_spec_from_id, FunctionSpec,
    FTAB_USER_DEFINED, FUNC_CHOOSE, FUNC_COUNT, FUNC_IF, FUNC_SUM,
};
pub use ptg::{base_index, token_name, token_size, TokenClass, TokenSize};
pub use reference::{BoxOp, Ref3D};
pub use version::VersionFamily;
