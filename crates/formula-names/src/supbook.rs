//! BIFF8 `SUPBOOK` / `EXTERNNAME` payload parsing.
//!
//! Each XTI entry of the `EXTERNSHEET` table points at a `SUPBOOK`; its kind decides whether a
//! 3-D reference lands in this workbook, another workbook or the add-in function library.
//! `EXTERNNAME` records that follow an add-in `SUPBOOK` name the functions `tNameX` refers to.

use crate::context::SupBookKind;
use crate::error::FormulaError;
use crate::strings::{parse_biff8_unicode_string, parse_biff8_unicode_string_no_cch};

/// Sheet lists longer than this are truncated.
const MAX_SHEETS: u16 = 4096;

/// `[ctab: u16][marker: u16]` payload of the internal-references `SUPBOOK`.
const INTERNAL_MARKER: [u8; 2] = [0x01, 0x04];
/// `[ctab = 1][cch = 0x3A01]` payload of the add-in `SUPBOOK`.
const ADDIN_MARKER: [u8; 4] = [0x01, 0x00, 0x01, 0x3A];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupBookInfo {
    pub kind: SupBookKind,
    /// Encoded `virtPath` of external and DDE/OLE supbooks.
    pub url: Option<String>,
    /// Sheet names stored after `virtPath` (external workbooks only).
    pub sheet_names: Vec<String>,
    /// Non-fatal parse warnings.
    pub warnings: Vec<String>,
}

impl SupBookInfo {
    fn marker(kind: SupBookKind) -> Self {
        Self {
            kind,
            url: None,
            sheet_names: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Classify and parse the payload of a `SUPBOOK` record.
pub fn parse_supbook(data: &[u8], codepage: u16) -> Result<SupBookInfo, FormulaError> {
    if data.get(2..4) == Some(&INTERNAL_MARKER[..]) {
        return Ok(SupBookInfo::marker(SupBookKind::Internal));
    }
    if data.get(0..4) == Some(&ADDIN_MARKER[..]) {
        return Ok(SupBookInfo::marker(SupBookKind::AddIn));
    }

    let malformed = |reason: String| FormulaError::MalformedRecord {
        record: "SUPBOOK",
        reason,
    };

    let [lo, hi, rest @ ..] = data else {
        return Err(malformed(format!("expected ctab, got {} bytes", data.len())));
    };
    let ctab = u16::from_le_bytes([*lo, *hi]);

    let (url, consumed) = parse_biff8_unicode_string(rest, codepage)
        .map_err(|err| malformed(format!("virtPath: {err}")))?;

    // Some writers spell the single-character markers out as a virtPath instead.
    match url.trim_end_matches('\0') {
        "\u{0001}" | "\u{0001}\u{0004}" => return Ok(SupBookInfo::marker(SupBookKind::Internal)),
        "\u{0002}" => return Ok(SupBookInfo::marker(SupBookKind::AddIn)),
        _ => {}
    }

    let mut info = SupBookInfo {
        kind: if ctab == 0 {
            SupBookKind::DdeOle
        } else {
            SupBookKind::External
        },
        url: Some(url),
        sheet_names: Vec::new(),
        warnings: Vec::new(),
    };

    let sheet_count = if ctab > MAX_SHEETS {
        info.warnings.push(format!(
            "SUPBOOK has implausible ctab={ctab}; capping to {MAX_SHEETS}"
        ));
        MAX_SHEETS
    } else {
        ctab
    };

    let mut cursor = &rest[consumed..];
    for sheet_idx in 0..sheet_count {
        match parse_biff8_unicode_string(cursor, codepage) {
            Ok((name, used)) => {
                info.sheet_names.push(name);
                cursor = &cursor[used..];
            }
            Err(err) => {
                info.warnings
                    .push(format!("failed to decode SUPBOOK sheet name {sheet_idx}: {err}"));
                break;
            }
        }
    }

    log::debug!(
        "SUPBOOK {:?} url={:?} sheets={:?}",
        info.kind,
        info.url,
        info.sheet_names
    );
    Ok(info)
}

/// One BIFF8 `EXTERNNAME` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternName {
    pub option_flags: u16,
    pub name: String,
}

/// Parse the payload of a BIFF8 `EXTERNNAME` record.
///
/// Layout: `[grbit: u16][reserved: u32][cch: u8][rgchName: XLUnicodeStringNoCch]`. Anything after
/// the name (its formula or DDE values) is ignored.
pub fn parse_externname(data: &[u8], codepage: u16) -> Result<ExternName, FormulaError> {
    let malformed = |reason: String| FormulaError::MalformedRecord {
        record: "EXTERNNAME",
        reason,
    };

    if data.len() < 7 {
        return Err(malformed(format!(
            "expected at least 7 header bytes, got {}",
            data.len()
        )));
    }
    let option_flags = u16::from_le_bytes([data[0], data[1]]);
    let cch = usize::from(data[6]);
    let (name, _) = parse_biff8_unicode_string_no_cch(&data[7..], cch, codepage)
        .map_err(|err| malformed(format!("name: {err}")))?;

    Ok(ExternName { option_flags, name })
}
