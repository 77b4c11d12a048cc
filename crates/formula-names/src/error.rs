use formula_rpn::VersionFamily;
use thiserror::Error;

/// Fatal problems that abort evaluation of a NAME formula.
///
/// Recoverable conditions (unresolvable sheets, self-referencing names, unknown function ids) do
/// not surface here; they degrade the result operand and set `any_error` instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormulaError {
    #[error("unsupported BIFF version {version}")]
    UnsupportedVersion { version: u8 },
    #[error("unexpected token 0x{ptg:02X} at offset {offset} for {family:?}")]
    InvalidToken {
        offset: usize,
        ptg: u8,
        family: VersionFamily,
    },
    #[error("token 0x{ptg:02X} at offset {offset} is not allowed in a NAME formula")]
    NotAllowedInName { offset: usize, ptg: u8 },
    #[error("token 0x{ptg:02X} at offset {offset} is not implemented")]
    Unimplemented { offset: usize, ptg: u8 },
    #[error(
        "unexpected end of formula at offset {offset} (ptg=0x{ptg:02X}): needed {needed} bytes, {remaining} remaining"
    )]
    UnexpectedEof {
        offset: usize,
        ptg: u8,
        needed: usize,
        remaining: usize,
    },
    #[error("stack underflow at offset {offset} (ptg=0x{ptg:02X})")]
    StackUnderflow { offset: usize, ptg: u8 },
    #[error("token 0x{ptg:02X} at offset {offset} has no positive size")]
    NonPositiveSize { offset: usize, ptg: u8 },
    #[error("excessive indirect references while evaluating name #{name_index} (depth {depth})")]
    ExcessiveDepth { name_index: usize, depth: usize },
    #[error("invalid string at offset {offset}: {reason}")]
    InvalidString { offset: usize, reason: String },
    #[error("name index {index} out of range (table has {len} names)")]
    NameIndexOutOfRange { index: usize, len: usize },
    #[error("malformed {record} record: {reason}")]
    MalformedRecord { record: &'static str, reason: String },
    #[error("name `{name}` does not evaluate to a constant absolute reference")]
    NotConstantReference { name: String },
}
