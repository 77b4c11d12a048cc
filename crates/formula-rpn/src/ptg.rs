//! Parsed-thing (`ptg`) opcode tables.
//!
//! Every token in a BIFF formula starts with one `ptg` byte. Bits `0..=4` select the base
//! opcode and bits `5..=6` the token class. Control tokens (operators, literals, `tAttr`) use
//! class 0; operand tokens (`tRef`, `tName`, `tFunc`, ...) use classes 1-3 (reference, value,
//! array). Both halves are folded into a single 6-bit *base index*:
//! - class 0: `base = opcode` (`0x00..=0x1F`)
//! - class 1-3: `base = opcode + 0x20` (`0x20..=0x3F`)
//!
//! The base index selects the token's encoded length, which varies by [`VersionFamily`].

use crate::VersionFamily;

// Class-0 opcodes.
pub const PTG_EXP: u8 = 0x01;
pub const PTG_TBL: u8 = 0x02;
pub const PTG_ADD: u8 = 0x03;
pub const PTG_SUB: u8 = 0x04;
pub const PTG_MUL: u8 = 0x05;
pub const PTG_DIV: u8 = 0x06;
pub const PTG_POWER: u8 = 0x07;
pub const PTG_CONCAT: u8 = 0x08;
pub const PTG_LT: u8 = 0x09;
pub const PTG_LE: u8 = 0x0A;
pub const PTG_EQ: u8 = 0x0B;
pub const PTG_GE: u8 = 0x0C;
pub const PTG_GT: u8 = 0x0D;
pub const PTG_NE: u8 = 0x0E;
pub const PTG_ISECT: u8 = 0x0F;
pub const PTG_LIST: u8 = 0x10;
pub const PTG_RANGE: u8 = 0x11;
pub const PTG_UPLUS: u8 = 0x12;
pub const PTG_UMINUS: u8 = 0x13;
pub const PTG_PERCENT: u8 = 0x14;
pub const PTG_PAREN: u8 = 0x15;
pub const PTG_MISS_ARG: u8 = 0x16;
pub const PTG_STR: u8 = 0x17;
pub const PTG_EXTENDED: u8 = 0x18;
pub const PTG_ATTR: u8 = 0x19;
pub const PTG_SHEET: u8 = 0x1A;
pub const PTG_END_SHEET: u8 = 0x1B;
pub const PTG_ERR: u8 = 0x1C;
pub const PTG_BOOL: u8 = 0x1D;
pub const PTG_INT: u8 = 0x1E;
pub const PTG_NUM: u8 = 0x1F;

// Operand opcodes (low five bits of a class 1-3 ptg).
pub const PTG_ARRAY: u8 = 0x00;
pub const PTG_FUNC: u8 = 0x01;
pub const PTG_FUNC_VAR: u8 = 0x02;
pub const PTG_NAME: u8 = 0x03;
pub const PTG_REF: u8 = 0x04;
pub const PTG_AREA: u8 = 0x05;
pub const PTG_MEM_AREA: u8 = 0x06;
pub const PTG_MEM_ERR: u8 = 0x07;
pub const PTG_MEM_NO_MEM: u8 = 0x08;
pub const PTG_MEM_FUNC: u8 = 0x09;
pub const PTG_REF_ERR: u8 = 0x0A;
pub const PTG_AREA_ERR: u8 = 0x0B;
pub const PTG_REF_N: u8 = 0x0C;
pub const PTG_AREA_N: u8 = 0x0D;
pub const PTG_NAME_X: u8 = 0x19;
pub const PTG_REF_3D: u8 = 0x1A;
pub const PTG_AREA_3D: u8 = 0x1B;
pub const PTG_REF_ERR_3D: u8 = 0x1C;
pub const PTG_AREA_ERR_3D: u8 = 0x1D;

// `tAttr` sub-options.
pub const ATTR_VOLATILE: u8 = 0x01;
pub const ATTR_IF: u8 = 0x02;
pub const ATTR_CHOOSE: u8 = 0x04;
pub const ATTR_SKIP: u8 = 0x08;
pub const ATTR_SUM: u8 = 0x10;
pub const ATTR_ASSIGN: u8 = 0x20;
pub const ATTR_SPACE: u8 = 0x40;
pub const ATTR_SPACE_VOLATILE: u8 = 0x41;

/// Operand class encoded in bits 5-6 of a `ptg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenClass {
    /// Class 0: operators, literals and control tokens.
    Control,
    /// Class 1 (`0x20..=0x3F`): the operand is used as a reference.
    Reference,
    /// Class 2 (`0x40..=0x5F`): the operand is used as a value.
    Value,
    /// Class 3 (`0x60..=0x7F`): the operand is used as an array.
    Array,
}

impl TokenClass {
    pub const fn of(ptg: u8) -> Self {
        match (ptg & 0x60) >> 5 {
            0 => TokenClass::Control,
            1 => TokenClass::Reference,
            2 => TokenClass::Value,
            _ => TokenClass::Array,
        }
    }
}

/// The low five bits of a `ptg`.
pub const fn opcode(ptg: u8) -> u8 {
    ptg & 0x1F
}

/// Fold a `ptg` byte into its 6-bit base index (see module docs).
pub const fn base_index(ptg: u8) -> u8 {
    match TokenClass::of(ptg) {
        TokenClass::Control => opcode(ptg),
        _ => opcode(ptg) + 0x20,
    }
}

/// Encoded length of a token, including the `ptg` byte itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenSize {
    Fixed(usize),
    /// The length depends on the payload (`tStr`, `tAttr`, `tExtended`).
    Variable,
    /// The token does not exist in this BIFF version.
    Invalid,
}

const V: i8 = -1;
const X: i8 = -2;

/// Token lengths indexed by `[family][base_index]`.
const TOKEN_SIZES: [[i8; 64]; 5] = [
    // BIFF2
    [
        X, 4, 4, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
        1, 1, 1, 1, 1, 1, 1, V, X, V, 8, 4, 2, 2, 3, 9,
        8, 2, 3, 8, 4, 7, 5, 5, 5, 2, 4, 7, 4, 7, 2, 2,
        X, X, X, X, X, X, X, X, 3, X, X, X, X, X, X, X,
    ],
    // BIFF3
    [
        X, 5, 5, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
        1, 1, 1, 1, 1, 1, 1, V, X, V, 11, 5, 2, 2, 3, 9,
        9, 2, 3, 11, 4, 7, 7, 7, 7, 3, 4, 7, 4, 7, 3, 3,
        X, X, X, X, X, X, X, X, 3, X, X, X, X, X, X, X,
    ],
    // BIFF4
    [
        X, 5, 5, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
        1, 1, 1, 1, 1, 1, 1, V, X, V, 11, 5, 2, 2, 3, 9,
        9, 3, 4, 11, 4, 7, 7, 7, 7, 3, 4, 7, 4, 7, 3, 3,
        X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X,
    ],
    // BIFF5/BIFF7
    [
        X, 5, 5, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
        1, 1, 1, 1, 1, 1, 1, V, X, V, X, X, 2, 2, 3, 9,
        9, 3, 4, 15, 4, 7, 7, 7, 7, 3, 4, 7, 4, 7, 3, 3,
        X, X, X, X, X, X, X, X, X, 25, 18, 21, 18, 21, X, X,
    ],
    // BIFF8
    [
        X, 5, 5, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
        1, 1, 1, 1, 1, 1, 1, V, V, V, X, X, 2, 2, 3, 9,
        8, 3, 4, 5, 5, 9, 7, 7, 7, 3, 5, 9, 5, 9, 3, 3,
        X, X, X, X, X, X, X, X, X, 7, 7, 11, 7, 11, X, X,
    ],
];

/// Look up the encoded length of the token with the given base index.
///
/// Indices outside `0..64` are reported as [`TokenSize::Invalid`].
pub fn token_size(family: VersionFamily, base: u8) -> TokenSize {
    let Some(&raw) = TOKEN_SIZES[family.table_index()].get(base as usize) else {
        return TokenSize::Invalid;
    };
    match raw {
        V => TokenSize::Variable,
        X => TokenSize::Invalid,
        n => TokenSize::Fixed(n as usize),
    }
}

const TOKEN_NAMES: [&str; 64] = [
    "Unk00", "Exp", "Tbl", "Add", "Sub", "Mul", "Div", "Power", "Concat", "LT", "LE", "EQ", "GE",
    "GT", "NE", "Isect", "List", "Range", "Uplus", "Uminus", "Percent", "Paren", "MissArg", "Str",
    "Extended", "Attr", "Sheet", "EndSheet", "Err", "Bool", "Int", "Num", "Array", "Func",
    "FuncVar", "Name", "Ref", "Area", "MemArea", "MemErr", "MemNoMem", "MemFunc", "RefErr",
    "AreaErr", "RefN", "AreaN", "MemAreaN", "MemNoMemN", "", "", "", "", "", "", "", "", "FuncCE",
    "NameX", "Ref3d", "Area3d", "RefErr3d", "AreaErr3d", "", "",
];

/// Mnemonic (without the conventional `t` prefix) for a base index, or `""` when unassigned.
pub fn token_name(base: u8) -> &'static str {
    TOKEN_NAMES.get(base as usize).copied().unwrap_or("")
}
