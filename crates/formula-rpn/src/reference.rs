use serde::{Deserialize, Serialize};

/// A box of cells spanning one or more sheets.
///
/// `coords` is `(sheet_lo, sheet_hi, row_lo, row_hi, col_lo, col_hi)` with half-open bounds. The
/// upper bounds may exceed a sheet's used extent (e.g. `Print_Titles` spanning every column);
/// callers clip as needed.
///
/// `relflags` marks which bounds are relative to an unspecified base cell. The only
/// sheet-relative shape is a 2-D reference on the current sheet, stored as `(0, 1, ..)` with both
/// sheet flags set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ref3D {
    pub coords: [i32; 6],
    #[serde(default, skip_serializing_if = "is_absolute")]
    pub relflags: [bool; 6],
}

fn is_absolute(flags: &[bool; 6]) -> bool {
    flags.iter().all(|f| !f)
}

/// Coordinate-wise combination of two boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoxOp {
    /// The smallest box containing both (`A1:B2` style range operator).
    Range,
    /// The overlap of both (space operator).
    Intersect,
}

impl Ref3D {
    pub const fn new(coords: [i32; 6]) -> Self {
        Self {
            coords,
            relflags: [false; 6],
        }
    }

    pub const fn with_relflags(coords: [i32; 6], relflags: [bool; 6]) -> Self {
        Self { coords, relflags }
    }

    /// A 2-D box on the current sheet.
    pub const fn current_sheet(
        rows: (i32, i32),
        cols: (i32, i32),
        row_relative: (bool, bool),
        col_relative: (bool, bool),
    ) -> Self {
        Self {
            coords: [0, 1, rows.0, rows.1, cols.0, cols.1],
            relflags: [
                true,
                true,
                row_relative.0,
                row_relative.1,
                col_relative.0,
                col_relative.1,
            ],
        }
    }

    pub const fn sheet_lo(&self) -> i32 {
        self.coords[0]
    }
    pub const fn sheet_hi(&self) -> i32 {
        self.coords[1]
    }
    pub const fn row_lo(&self) -> i32 {
        self.coords[2]
    }
    pub const fn row_hi(&self) -> i32 {
        self.coords[3]
    }
    pub const fn col_lo(&self) -> i32 {
        self.coords[4]
    }
    pub const fn col_hi(&self) -> i32 {
        self.coords[5]
    }

    pub fn is_absolute(&self) -> bool {
        is_absolute(&self.relflags)
    }

    pub fn is_current_sheet(&self) -> bool {
        self.relflags[0] && self.relflags[1]
    }

    /// Combine two boxes bound by bound. Relative flags are taken from `self`.
    pub fn combine(&self, other: &Ref3D, op: BoxOp) -> Ref3D {
        let mut coords = [0; 6];
        for (idx, slot) in coords.iter_mut().enumerate() {
            let (a, b) = (self.coords[idx], other.coords[idx]);
            let is_lo = idx % 2 == 0;
            *slot = match (op, is_lo) {
                (BoxOp::Range, true) | (BoxOp::Intersect, false) => a.min(b),
                (BoxOp::Range, false) | (BoxOp::Intersect, true) => a.max(b),
            };
        }
        Ref3D {
            coords,
            relflags: self.relflags,
        }
    }
}
