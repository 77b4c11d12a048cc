//! Workbook-level inputs to NAME formula evaluation.

use formula_rpn::VersionFamily;
use serde::{Deserialize, Serialize};

use crate::error::FormulaError;

/// `itabFirst`/`itabLast` value meaning "no particular sheet in this workbook".
pub const ITAB_ANY_SHEET: u16 = 0xFFFE;
/// `itabFirst`/`itabLast` value of a reference to deleted sheet(s).
pub const ITAB_DELETED: u16 = 0xFFFF;

/// One `XTI` entry of the BIFF8 `EXTERNSHEET` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternSheetEntry {
    /// Index of the owning `SUPBOOK` record.
    pub supbook: u16,
    /// First BIFF sheet index of the referenced range.
    pub itab_first: u16,
    /// Last BIFF sheet index of the referenced range.
    pub itab_last: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupBookKind {
    /// 3-D references into this workbook.
    Internal,
    /// Another workbook with a sheet list.
    External,
    /// Add-in function library.
    AddIn,
    /// DDE or OLE link (no sheets).
    DdeOle,
    Unknown,
}

/// Type code of a BIFF5/BIFF7 `EXTERNSHEET` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternSheetTypeB57 {
    /// Encoded document URL (another workbook).
    EncodedUrl,
    CurrentSheet,
    /// A named sheet in this workbook.
    OwnSheet,
    /// No particular sheet in this workbook.
    OwnDocument,
    /// Anything else, including unencoded names.
    Other,
}

impl ExternSheetTypeB57 {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => ExternSheetTypeB57::EncodedUrl,
            2 => ExternSheetTypeB57::CurrentSheet,
            3 => ExternSheetTypeB57::OwnSheet,
            4 => ExternSheetTypeB57::OwnDocument,
            _ => ExternSheetTypeB57::Other,
        }
    }
}

/// One BIFF5/BIFF7 `EXTERNSHEET` record. These are numbered from 1 in record order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternSheetB57 {
    pub kind: ExternSheetTypeB57,
    /// Sheet name for [`ExternSheetTypeB57::OwnSheet`] records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,
}

/// Everything about the workbook that formula evaluation reads, besides the name table itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaContext {
    pub biff_version: u8,
    pub family: VersionFamily,
    pub codepage: u16,
    /// Names of the worksheets exposed to callers, in calculation-sheet order.
    pub sheet_names: Vec<String>,
    /// BIFF sheet index (`BOUNDSHEET` order) to calculation-sheet index, `-1` for macro and
    /// VBA sheets that are not exposed.
    pub all_sheets_map: Vec<i32>,
    pub externsheet: Vec<ExternSheetEntry>,
    pub externsheet_b57: Vec<ExternSheetB57>,
    pub supbook_types: Vec<SupBookKind>,
    /// Names from `EXTERNNAME` records that follow an add-in `SUPBOOK`.
    pub addin_function_names: Vec<String>,
}

impl FormulaContext {
    /// Create a context for a workbook whose BIFF sheets are exactly `sheet_names`.
    pub fn new(
        biff_version: u8,
        codepage: u16,
        sheet_names: Vec<String>,
    ) -> Result<Self, FormulaError> {
        let family = VersionFamily::from_biff_version(biff_version)
            .ok_or(FormulaError::UnsupportedVersion {
                version: biff_version,
            })?;
        let all_sheets_map = (0..sheet_names.len() as i32).collect();
        Ok(Self {
            biff_version,
            family,
            codepage,
            sheet_names,
            all_sheets_map,
            externsheet: Vec::new(),
            externsheet_b57: Vec::new(),
            supbook_types: Vec::new(),
            addin_function_names: Vec::new(),
        })
    }

    pub fn with_all_sheets_map(mut self, map: Vec<i32>) -> Self {
        self.all_sheets_map = map;
        self
    }

    pub fn with_externsheet(mut self, entries: Vec<ExternSheetEntry>) -> Self {
        self.externsheet = entries;
        self
    }

    pub fn with_externsheet_b57(mut self, entries: Vec<ExternSheetB57>) -> Self {
        self.externsheet_b57 = entries;
        self
    }

    pub fn with_supbooks(mut self, kinds: Vec<SupBookKind>) -> Self {
        self.supbook_types = kinds;
        self
    }

    pub fn with_addin_function_names(mut self, names: Vec<String>) -> Self {
        self.addin_function_names = names;
        self
    }

    /// Record a `SUPBOOK` in workbook order.
    pub fn push_supbook(&mut self, kind: SupBookKind) {
        self.supbook_types.push(kind);
    }

    /// Record an `EXTERNNAME`. Only names owned by an add-in `SUPBOOK` are kept; they are what
    /// `tNameX` tokens into that supbook refer to.
    pub fn push_extern_name(&mut self, name: String) {
        if self.supbook_types.last() == Some(&SupBookKind::AddIn) {
            self.addin_function_names.push(name);
        }
    }

    /// Index of the `SUPBOOK` describing this workbook's own sheets.
    pub fn supbook_locals_index(&self) -> Option<usize> {
        self.supbook_types
            .iter()
            .rposition(|kind| *kind == SupBookKind::Internal)
    }

    /// Index of the add-in `SUPBOOK`.
    pub fn supbook_addins_index(&self) -> Option<usize> {
        self.supbook_types
            .iter()
            .rposition(|kind| *kind == SupBookKind::AddIn)
    }

    /// Calculation-sheet index for a sheet name, case-insensitively.
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheet_names
            .iter()
            .position(|sheet| sheet.eq_ignore_ascii_case(name))
    }

    /// Sheet name of the 1-based BIFF5/BIFF7 `EXTERNSHEET` number.
    pub fn externsheet_b57_name(&self, number: u16) -> Option<&str> {
        let idx = usize::from(number).checked_sub(1)?;
        self.externsheet_b57.get(idx)?.sheet_name.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sheets() -> Vec<String> {
        vec!["Sheet1".to_string(), "Sheet2".to_string()]
    }

    #[test]
    fn rejects_unknown_versions() {
        assert_eq!(
            FormulaContext::new(60, 1252, sheets()),
            Err(FormulaError::UnsupportedVersion { version: 60 })
        );
    }

    #[test]
    fn default_sheet_map_is_identity() {
        let ctx = FormulaContext::new(80, 1200, sheets()).unwrap();
        assert_eq!(ctx.family, VersionFamily::Biff8);
        assert_eq!(ctx.all_sheets_map, vec![0, 1]);
        assert_eq!(ctx.sheet_index("SHEET2"), Some(1));
    }

    #[test]
    fn extern_names_follow_addin_supbooks_only() {
        let mut ctx = FormulaContext::new(80, 1200, sheets()).unwrap();
        ctx.push_supbook(SupBookKind::External);
        ctx.push_extern_name("RemoteName".to_string());
        ctx.push_supbook(SupBookKind::AddIn);
        ctx.push_extern_name("EUROCONVERT".to_string());
        ctx.push_supbook(SupBookKind::Internal);
        ctx.push_extern_name("Ignored".to_string());

        assert_eq!(ctx.addin_function_names, vec!["EUROCONVERT".to_string()]);
        assert_eq!(ctx.supbook_addins_index(), Some(1));
        assert_eq!(ctx.supbook_locals_index(), Some(2));
    }

    #[test]
    fn b57_names_are_one_based() {
        let ctx = FormulaContext::new(70, 1252, sheets())
            .unwrap()
            .with_externsheet_b57(vec![
                ExternSheetB57 {
                    kind: ExternSheetTypeB57::OwnDocument,
                    sheet_name: None,
                },
                ExternSheetB57 {
                    kind: ExternSheetTypeB57::OwnSheet,
                    sheet_name: Some("Sheet2".to_string()),
                },
            ]);
        assert_eq!(ctx.externsheet_b57_name(0), None);
        assert_eq!(ctx.externsheet_b57_name(1), None);
        assert_eq!(ctx.externsheet_b57_name(2), Some("Sheet2"));
    }
}
