//! `NAME` (defined name) record payloads.

use serde::{Deserialize, Serialize};

use crate::error::FormulaError;
use crate::strings::{decode_ansi, parse_biff8_unicode_string_no_cch};

const NAME_FLAG_HIDDEN: u16 = 0x0001;
const NAME_FLAG_FUNC: u16 = 0x0002;
const NAME_FLAG_VBASIC: u16 = 0x0004;
const NAME_FLAG_MACRO: u16 = 0x0008;
const NAME_FLAG_COMPLEX: u16 = 0x0010;
const NAME_FLAG_BUILTIN: u16 = 0x0020;
const NAME_MASK_FUNCGROUP: u16 = 0x0FC0;
const NAME_FLAG_BINARY: u16 = 0x1000;

/// Size of the fixed NAME header preceding the name characters.
const NAME_HEADER_LEN: usize = 14;

/// Built-in names, indexed by the single-character code stored in place of the name.
const BUILTIN_NAMES: [&str; 14] = [
    "Consolidate_Area",
    "Auto_Open",
    "Auto_Close",
    "Extract",
    "Database",
    "Criteria",
    "Print_Area",
    "Print_Titles",
    "Recorder",
    "Data_Form",
    "Auto_Activate",
    "Auto_Deactivate",
    "Sheet_Title",
    "_FilterDatabase",
];

const UNKNOWN_BUILTIN_NAME: &str = "??Unknown??";

/// Display name of a built-in name code.
pub fn builtin_name_from_code(code: u32) -> Option<&'static str> {
    BUILTIN_NAMES.get(code as usize).copied()
}

/// Built-in name code for a display name (exact match).
pub fn builtin_code_from_name(name: &str) -> Option<u8> {
    BUILTIN_NAMES
        .iter()
        .position(|builtin| *builtin == name)
        .map(|idx| idx as u8)
}

/// A decoded `NAME` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRecord {
    pub option_flags: u16,
    pub hidden: bool,
    /// Function or command name.
    pub func: bool,
    pub vbasic: bool,
    /// Macro name; never evaluated.
    #[serde(rename = "macro")]
    pub macro_: bool,
    pub complex: bool,
    pub builtin: bool,
    pub funcgroup: u8,
    /// Binary data (DDE/OLE); never evaluated.
    pub binary: bool,
    pub kb_shortcut: u8,
    /// Name text; built-in names are replaced by their display name.
    pub name: String,
    /// BIFF5/BIFF7 scope: 1-based EXTERNSHEET number, `0` for global names.
    pub extsht_index: u16,
    /// BIFF8 scope: 1-based BIFF sheet index, `0` for global names.
    pub sheet_index: u16,
    /// Declared length of the token stream at the start of `raw_formula`.
    pub formula_len: usize,
    /// Token stream followed by any trailing array constant data.
    pub raw_formula: Vec<u8>,
}

impl NameRecord {
    /// A global, non-macro name whose formula is exactly `tokens`.
    pub fn new(name: impl Into<String>, tokens: Vec<u8>) -> Self {
        Self {
            option_flags: 0,
            hidden: false,
            func: false,
            vbasic: false,
            macro_: false,
            complex: false,
            builtin: false,
            funcgroup: 0,
            binary: false,
            kb_shortcut: 0,
            name: name.into(),
            extsht_index: 0,
            sheet_index: 0,
            formula_len: tokens.len(),
            raw_formula: tokens,
        }
    }

    /// Append array constant data after the token stream.
    pub fn with_array_data(mut self, data: &[u8]) -> Self {
        self.raw_formula.extend_from_slice(data);
        self
    }

    pub fn with_sheet_index(mut self, sheet_index: u16) -> Self {
        self.sheet_index = sheet_index;
        self
    }

    pub fn with_extsht_index(mut self, extsht_index: u16) -> Self {
        self.extsht_index = extsht_index;
        self
    }

    pub fn with_option_flags(mut self, option_flags: u16) -> Self {
        self.set_option_flags(option_flags);
        self
    }

    fn set_option_flags(&mut self, flags: u16) {
        self.option_flags = flags;
        self.hidden = flags & NAME_FLAG_HIDDEN != 0;
        self.func = flags & NAME_FLAG_FUNC != 0;
        self.vbasic = flags & NAME_FLAG_VBASIC != 0;
        self.macro_ = flags & NAME_FLAG_MACRO != 0;
        self.complex = flags & NAME_FLAG_COMPLEX != 0;
        self.builtin = flags & NAME_FLAG_BUILTIN != 0;
        self.funcgroup = ((flags & NAME_MASK_FUNCGROUP) >> 6) as u8;
        self.binary = flags & NAME_FLAG_BINARY != 0;
    }

    /// The token stream proper, without trailing array data.
    pub fn tokens(&self) -> &[u8] {
        let end = self.formula_len.min(self.raw_formula.len());
        &self.raw_formula[..end]
    }
}

/// Parse the payload of a `NAME` record.
///
/// Layout: `[grbit: u16][chKey: u8][cch: u8][cce: u16][ixals: u16][itab: u16][4 x u8 text
/// lengths][name][rgce][array data]`. The name is a codepage string before BIFF8 and an
/// `XLUnicodeStringNoCch` in BIFF8.
pub fn parse_name_record(
    data: &[u8],
    biff_version: u8,
    codepage: u16,
) -> Result<NameRecord, FormulaError> {
    if biff_version < 50 {
        return Err(FormulaError::UnsupportedVersion {
            version: biff_version,
        });
    }

    let malformed = |reason: String| FormulaError::MalformedRecord {
        record: "NAME",
        reason,
    };

    let header = data.get(..NAME_HEADER_LEN).ok_or_else(|| {
        malformed(format!(
            "expected {NAME_HEADER_LEN} header bytes, got {}",
            data.len()
        ))
    })?;
    let option_flags = u16::from_le_bytes([header[0], header[1]]);
    let kb_shortcut = header[2];
    let name_len = usize::from(header[3]);
    let formula_len = usize::from(u16::from_le_bytes([header[4], header[5]]));
    let extsht_index = u16::from_le_bytes([header[6], header[7]]);
    let sheet_index = u16::from_le_bytes([header[8], header[9]]);

    let body = &data[NAME_HEADER_LEN..];
    let (internal_name, consumed) = if biff_version >= 80 {
        parse_biff8_unicode_string_no_cch(body, name_len, codepage)
            .map_err(|err| malformed(format!("name: {err}")))?
    } else {
        let bytes = body.get(..name_len).ok_or_else(|| {
            malformed(format!(
                "name needs {name_len} bytes, {} available",
                body.len()
            ))
        })?;
        (decode_ansi(codepage, bytes), name_len)
    };

    let mut record = NameRecord::new(internal_name, body[consumed..].to_vec());
    record.set_option_flags(option_flags);
    record.kb_shortcut = kb_shortcut;
    record.extsht_index = extsht_index;
    record.sheet_index = sheet_index;
    record.formula_len = formula_len;

    if record.builtin {
        let code = record.name.chars().next().map(u32::from).unwrap_or(u32::MAX);
        let builtin = builtin_name_from_code(code).unwrap_or(UNKNOWN_BUILTIN_NAME);
        log::trace!("builtin NAME code {code:#04x}: {builtin}");
        record.name = builtin.to_string();
    }

    log::debug!(
        "NAME {:?} flags={option_flags:#06x} cce={formula_len} ixals={extsht_index} itab={sheet_index}",
        record.name
    );
    Ok(record)
}
