//! `EXTERNSHEET` tables and the sheet ranges that 3-D tokens resolve to.
//!
//! BIFF8 3-D tokens carry an `ixti` into the workbook-global XTI table; BIFF5/BIFF7 tokens carry a
//! raw EXTERNSHEET index plus the first/last sheet numbers inline. Both resolve to a pair of
//! calculation-sheet indices, or to a negative code explaining why they could not.

use serde::{Deserialize, Serialize};

use crate::context::{
    ExternSheetB57, ExternSheetEntry, ExternSheetTypeB57, FormulaContext, ITAB_ANY_SHEET,
    ITAB_DELETED,
};
use crate::error::FormulaError;
use crate::strings::decode_ansi;

/// Hard cap on the number of XTI entries parsed from one `EXTERNSHEET` record.
const MAX_XTI_ENTRIES: usize = 16_384;

/// Result of resolving a 3-D reference's sheet part.
///
/// Every unresolved variant has a stable negative [`code`](SheetTarget::code), which is what ends
/// up in the sheet coordinates of a [`formula_rpn::Ref3D`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetTarget {
    /// Calculation sheets `first..=last`.
    Sheets { first: i32, last: i32 },
    /// No particular sheet (`-1`).
    AnySheet,
    /// Deleted sheet(s) (`-2`).
    Deleted,
    /// A macro sheet, or a range that maps onto one (`-3`).
    MacroSheet,
    /// Another workbook (`-4`).
    External,
    /// The add-in pseudo workbook (`-5`).
    AddIn,
    /// `ixti` past the end of the XTI table (`-101`).
    IndexOutOfRange,
    /// BIFF8 sheet range outside the workbook (`-102`).
    SheetRangeOutOfRange,
    /// BIFF5/BIFF7 sheet range outside the workbook (`-103`).
    SheetRangeOutOfRangeB57,
    /// BIFF5/BIFF7 `tNameX` through an EXTERNSHEET that is not type 4 (`-666`).
    UnsupportedExternSheet,
}

impl SheetTarget {
    pub fn code(self) -> i32 {
        match self {
            SheetTarget::Sheets { first, .. } => first,
            SheetTarget::AnySheet => -1,
            SheetTarget::Deleted => -2,
            SheetTarget::MacroSheet => -3,
            SheetTarget::External => -4,
            SheetTarget::AddIn => -5,
            SheetTarget::IndexOutOfRange => -101,
            SheetTarget::SheetRangeOutOfRange => -102,
            SheetTarget::SheetRangeOutOfRangeB57 => -103,
            SheetTarget::UnsupportedExternSheet => -666,
        }
    }

    /// `(first, last)` sheet coordinates; unresolved targets repeat their code.
    pub fn range(self) -> (i32, i32) {
        match self {
            SheetTarget::Sheets { first, last } => (first, last),
            other => (other.code(), other.code()),
        }
    }

    /// Worse than "any sheet": the reference cannot be tied to this workbook's sheets.
    pub fn is_error(self) -> bool {
        self.code() < -1
    }
}

/// Resolve a BIFF8 `ixti` through the XTI table.
pub fn resolve_externsheet(ctx: &FormulaContext, ixti: usize) -> SheetTarget {
    let Some(entry) = ctx.externsheet.get(ixti) else {
        return SheetTarget::IndexOutOfRange;
    };
    let supbook = Some(usize::from(entry.supbook));
    if supbook == ctx.supbook_addins_index() {
        return SheetTarget::AddIn;
    }
    if supbook != ctx.supbook_locals_index() {
        return SheetTarget::External;
    }

    match (entry.itab_first, entry.itab_last) {
        (ITAB_ANY_SHEET, ITAB_ANY_SHEET) => return SheetTarget::AnySheet,
        (ITAB_DELETED, ITAB_DELETED) => return SheetTarget::Deleted,
        _ => {}
    }

    let first = usize::from(entry.itab_first);
    let last = usize::from(entry.itab_last);
    if first > last || last >= ctx.all_sheets_map.len() {
        return SheetTarget::SheetRangeOutOfRange;
    }
    map_sheet_range(ctx, first, last)
}

/// Resolve the sheet part of a BIFF5/BIFF7 3-D reference.
///
/// A positive `raw_extsht` points at another document's EXTERNSHEET; references into this
/// workbook use a negative one and carry the sheet numbers in `first`/`last`.
pub fn resolve_externsheet_b57(
    ctx: &FormulaContext,
    raw_extsht: i16,
    first: i16,
    last: i16,
) -> SheetTarget {
    if raw_extsht > 0 {
        return SheetTarget::External;
    }
    if first == -1 && last == -1 {
        return SheetTarget::Deleted;
    }
    if first < 0 || first > last || last as usize >= ctx.all_sheets_map.len() {
        return SheetTarget::SheetRangeOutOfRangeB57;
    }
    map_sheet_range(ctx, first as usize, last as usize)
}

fn map_sheet_range(ctx: &FormulaContext, first: usize, last: usize) -> SheetTarget {
    let x1 = ctx.all_sheets_map[first];
    let x2 = ctx.all_sheets_map[last];
    if 0 <= x1 && x1 <= x2 {
        SheetTarget::Sheets {
            first: x1,
            last: x2,
        }
    } else {
        SheetTarget::MacroSheet
    }
}

/// Best-effort parse result for a BIFF8 `EXTERNSHEET` record.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExternSheetTable {
    /// Entries indexed by `ixti`.
    pub entries: Vec<ExternSheetEntry>,
    /// Non-fatal parse warnings.
    pub warnings: Vec<String>,
}

/// Parse the payload of a BIFF8 `EXTERNSHEET` record.
///
/// Truncated payloads keep the entries that are fully present and report the rest as warnings.
pub fn parse_biff8_externsheet(data: &[u8]) -> ExternSheetTable {
    let mut out = ExternSheetTable::default();

    // [cXTI: u16] then cXTI * [iSupBook: u16, itabFirst: u16, itabLast: u16]
    if data.len() < 2 {
        out.warnings
            .push("truncated EXTERNSHEET record: missing cxti".to_string());
        return out;
    }

    let cxti = u16::from_le_bytes([data[0], data[1]]) as usize;
    let max_entries = (data.len() - 2) / 6;
    if cxti > max_entries {
        out.warnings.push(format!(
            "EXTERNSHEET cxti={cxti} exceeds available data; clamping to {max_entries}"
        ));
    }

    let mut to_parse = cxti.min(max_entries);
    if to_parse > MAX_XTI_ENTRIES {
        out.warnings.push(format!(
            "EXTERNSHEET has {to_parse} XTI entries; capping to {MAX_XTI_ENTRIES}"
        ));
        to_parse = MAX_XTI_ENTRIES;
    }

    out.entries = data[2..]
        .chunks_exact(6)
        .take(to_parse)
        .map(|chunk| ExternSheetEntry {
            supbook: u16::from_le_bytes([chunk[0], chunk[1]]),
            itab_first: u16::from_le_bytes([chunk[2], chunk[3]]),
            itab_last: u16::from_le_bytes([chunk[4], chunk[5]]),
        })
        .collect();

    for (ixti, entry) in out.entries.iter().enumerate() {
        log::trace!(
            "XTI #{ixti}: supbook={} itab_first={} itab_last={}",
            entry.supbook,
            entry.itab_first,
            entry.itab_last
        );
    }

    out
}

/// Parse the payload of a BIFF5/BIFF7 `EXTERNSHEET` record.
///
/// Layout: `[cch: u8][type: u8][name bytes]`. Only type 3 (own sheet) records keep their name;
/// type codes outside 1..=4 are folded into [`ExternSheetTypeB57::Other`].
pub fn parse_b57_externsheet(data: &[u8], codepage: u16) -> Result<ExternSheetB57, FormulaError> {
    let [cch, code, rest @ ..] = data else {
        return Err(FormulaError::MalformedRecord {
            record: "EXTERNSHEET",
            reason: format!("expected at least 2 bytes, got {}", data.len()),
        });
    };

    let kind = ExternSheetTypeB57::from_code(*code);
    let sheet_name = if kind == ExternSheetTypeB57::OwnSheet {
        let cch = usize::from(*cch);
        let bytes = rest.get(..cch).ok_or_else(|| FormulaError::MalformedRecord {
            record: "EXTERNSHEET",
            reason: format!("sheet name needs {cch} bytes, {} available", rest.len()),
        })?;
        Some(decode_ansi(codepage, bytes))
    } else {
        None
    };

    log::trace!("EXTERNSHEET type {code} ({kind:?}) name={sheet_name:?}");
    Ok(ExternSheetB57 { kind, sheet_name })
}
