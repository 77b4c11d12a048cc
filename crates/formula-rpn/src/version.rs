//! BIFF format revisions that share a token encoding.

use serde::{Deserialize, Serialize};

/// A group of BIFF versions that encode formula tokens identically.
///
/// The raw version numbers follow the usual `10 * major` convention (`80` is BIFF8, the format
/// written by Excel 97-2003).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VersionFamily {
    /// BIFF2 (versions 20 and 21).
    Biff2,
    /// BIFF3 (version 30).
    Biff3,
    /// BIFF4 worksheets and workbooks (versions 40 and 45).
    Biff4,
    /// BIFF5 and BIFF7 (versions 50 and 70).
    Biff5,
    /// BIFF8 (version 80).
    Biff8,
}

impl VersionFamily {
    pub const ALL: [VersionFamily; 5] = [
        VersionFamily::Biff2,
        VersionFamily::Biff3,
        VersionFamily::Biff4,
        VersionFamily::Biff5,
        VersionFamily::Biff8,
    ];

    /// Map a raw BIFF version number to its family.
    pub fn from_biff_version(version: u8) -> Option<Self> {
        Some(match version {
            20 | 21 => VersionFamily::Biff2,
            30 => VersionFamily::Biff3,
            40 | 45 => VersionFamily::Biff4,
            50 | 70 => VersionFamily::Biff5,
            80 => VersionFamily::Biff8,
            _ => return None,
        })
    }

    pub(crate) const fn table_index(self) -> usize {
        match self {
            VersionFamily::Biff2 => 0,
            VersionFamily::Biff3 => 1,
            VersionFamily::Biff4 => 2,
            VersionFamily::Biff5 => 3,
            VersionFamily::Biff8 => 4,
        }
    }

    /// BIFF8 stores cell addresses as `(row: u16, col: u16)` with the relative flags packed into
    /// the column field; older versions use `(row: u16, col: u8)` with the flags in the row.
    pub const fn has_wide_addresses(self) -> bool {
        matches!(self, VersionFamily::Biff8)
    }

    /// String literals are BIFF8 `ShortXLUnicodeString`s; earlier versions use 8-bit codepage
    /// strings.
    pub const fn has_unicode_strings(self) -> bool {
        matches!(self, VersionFamily::Biff8)
    }

    /// 3-D references go through the workbook-global `EXTERNSHEET`/`SUPBOOK` tables.
    pub const fn has_externsheet_table(self) -> bool {
        matches!(self, VersionFamily::Biff8)
    }

    /// Function ids in `tFunc`/`tFuncVar` are 16-bit from BIFF4 on.
    pub const fn has_wide_function_ids(self) -> bool {
        matches!(
            self,
            VersionFamily::Biff4 | VersionFamily::Biff5 | VersionFamily::Biff8
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_supported_versions() {
        assert_eq!(VersionFamily::from_biff_version(20), Some(VersionFamily::Biff2));
        assert_eq!(VersionFamily::from_biff_version(21), Some(VersionFamily::Biff2));
        assert_eq!(VersionFamily::from_biff_version(30), Some(VersionFamily::Biff3));
        assert_eq!(VersionFamily::from_biff_version(45), Some(VersionFamily::Biff4));
        assert_eq!(VersionFamily::from_biff_version(70), Some(VersionFamily::Biff5));
        assert_eq!(VersionFamily::from_biff_version(80), Some(VersionFamily::Biff8));
    }

    #[test]
    fn rejects_unknown_versions() {
        for version in [0, 10, 60, 81, 120] {
            assert_eq!(VersionFamily::from_biff_version(version), None, "{version}");
        }
    }

    #[test]
    fn table_indices_are_dense() {
        for (idx, family) in VersionFamily::ALL.iter().enumerate() {
            assert_eq!(family.table_index(), idx);
        }
    }
}
