#![allow(dead_code)]

use formula_names::{
    ExternSheetEntry, FormulaContext, NameRecord, NameTable, SupBookKind,
};

// Token bytes for hand-built NAME formulas. Operand tokens take the class bits explicitly so tests
// can exercise reference vs value class handling.
pub const CLASS_REF: u8 = 0x20;
pub const CLASS_VALUE: u8 = 0x40;
pub const CLASS_ARRAY: u8 = 0x60;

pub const PTG_ADD: u8 = 0x03;
pub const PTG_DIV: u8 = 0x06;
pub const PTG_LIST: u8 = 0x10;
pub const PTG_RANGE: u8 = 0x11;
pub const PTG_UMINUS: u8 = 0x13;
pub const PTG_PAREN: u8 = 0x15;
pub const PTG_MISS_ARG: u8 = 0x16;

const ATTR_IF: u8 = 0x02;
const ATTR_CHOOSE: u8 = 0x04;
const ATTR_SKIP: u8 = 0x08;
const ATTR_SUM: u8 = 0x10;

/// Little-endian token stream builder.
#[derive(Debug, Default, Clone)]
pub struct Rgce {
    bytes: Vec<u8>,
}

impl Rgce {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }

    pub fn op(mut self, ptg: u8) -> Self {
        self.bytes.push(ptg);
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn int(self, value: u16) -> Self {
        self.op(0x1E).raw(&value.to_le_bytes())
    }

    pub fn num(self, value: f64) -> Self {
        self.op(0x1F).raw(&value.to_le_bytes())
    }

    pub fn boolean(self, value: bool) -> Self {
        self.op(0x1D).raw(&[u8::from(value)])
    }

    pub fn err(self, code: u8) -> Self {
        self.op(0x1C).raw(&[code])
    }

    /// BIFF8 `tStr` (compressed `ShortXLUnicodeString`).
    pub fn str8(self, value: &str) -> Self {
        self.op(0x17)
            .raw(&[value.len() as u8, 0])
            .raw(value.as_bytes())
    }

    /// BIFF5/BIFF7 `tStr` (8-bit length, codepage bytes).
    pub fn str5(self, value: &str) -> Self {
        self.op(0x17).raw(&[value.len() as u8]).raw(value.as_bytes())
    }

    pub fn attr_if(self) -> Self {
        self.op(0x19).raw(&[ATTR_IF, 0, 0])
    }

    pub fn attr_skip(self) -> Self {
        self.op(0x19).raw(&[ATTR_SKIP, 0, 0])
    }

    pub fn attr_sum(self) -> Self {
        self.op(0x19).raw(&[ATTR_SUM, 0, 0])
    }

    /// `tAttrChoose` with a zeroed jump table for `cases` choices.
    pub fn attr_choose(self, cases: u16) -> Self {
        let table = vec![0u8; usize::from(cases + 1) * 2];
        self.op(0x19)
            .raw(&[ATTR_CHOOSE])
            .raw(&cases.to_le_bytes())
            .raw(&table)
    }

    pub fn func(self, id: u16) -> Self {
        self.op(CLASS_VALUE | 0x01).raw(&id.to_le_bytes())
    }

    pub fn func_var(self, nargs: u8, id: u16) -> Self {
        self.op(CLASS_VALUE | 0x02).raw(&[nargs]).raw(&id.to_le_bytes())
    }

    /// BIFF8 `tName` (1-based index).
    pub fn name(self, index: u16) -> Self {
        self.op(CLASS_REF | 0x03).raw(&index.to_le_bytes()).raw(&[0, 0])
    }

    /// BIFF8 `tNameX`.
    pub fn name_x(self, ixti: u16, iname: u16) -> Self {
        self.op(CLASS_REF | 0x19)
            .raw(&ixti.to_le_bytes())
            .raw(&iname.to_le_bytes())
            .raw(&[0, 0])
    }

    /// BIFF5/BIFF7 `tNameX`.
    pub fn name_x_b57(self, ixals: i16, iname: u16) -> Self {
        self.op(CLASS_REF | 0x19)
            .raw(&ixals.to_le_bytes())
            .raw(&[0; 8])
            .raw(&iname.to_le_bytes())
            .raw(&[0; 12])
    }

    /// BIFF8 `tRef`; relative components are signed offsets.
    pub fn ref8(self, class: u8, row: i32, col: i32, row_rel: bool, col_rel: bool) -> Self {
        let (row, col) = biff8_fields(row, col, row_rel, col_rel);
        self.op(class | 0x04).raw(&row.to_le_bytes()).raw(&col.to_le_bytes())
    }

    /// BIFF8 `tArea` with absolute corners.
    pub fn area8(self, class: u8, rows: (u16, u16), cols: (u16, u16)) -> Self {
        self.op(class | 0x05)
            .raw(&rows.0.to_le_bytes())
            .raw(&rows.1.to_le_bytes())
            .raw(&cols.0.to_le_bytes())
            .raw(&cols.1.to_le_bytes())
    }

    /// BIFF8 `tRef3d`.
    pub fn ref3d8(self, class: u8, ixti: u16, row: i32, col: i32, row_rel: bool, col_rel: bool) -> Self {
        let (row, col) = biff8_fields(row, col, row_rel, col_rel);
        self.op(class | 0x1A)
            .raw(&ixti.to_le_bytes())
            .raw(&row.to_le_bytes())
            .raw(&col.to_le_bytes())
    }

    /// BIFF8 `tArea3d` with absolute corners.
    pub fn area3d8(self, class: u8, ixti: u16, rows: (u16, u16), cols: (u16, u16)) -> Self {
        self.op(class | 0x1B)
            .raw(&ixti.to_le_bytes())
            .raw(&rows.0.to_le_bytes())
            .raw(&rows.1.to_le_bytes())
            .raw(&cols.0.to_le_bytes())
            .raw(&cols.1.to_le_bytes())
    }

    /// BIFF5/BIFF7 `tRef3d` with an absolute cell.
    pub fn ref3d5(self, class: u8, ixals: i16, sheets: (i16, i16), row: u16, col: u8) -> Self {
        self.op(class | 0x1A)
            .raw(&ixals.to_le_bytes())
            .raw(&[0; 8])
            .raw(&sheets.0.to_le_bytes())
            .raw(&sheets.1.to_le_bytes())
            .raw(&(row & 0x3FFF).to_le_bytes())
            .raw(&[col])
    }

    /// `tArray` placeholder; the values go after the token stream.
    pub fn array(self) -> Self {
        self.op(CLASS_ARRAY).raw(&[0; 7])
    }
}

fn biff8_fields(row: i32, col: i32, row_rel: bool, col_rel: bool) -> (u16, u16) {
    let row_field = (row & 0xFFFF) as u16;
    let mut col_field = (col & 0xFF) as u16;
    if row_rel {
        col_field |= 0x8000;
    }
    if col_rel {
        col_field |= 0x4000;
    }
    (row_field, col_field)
}

/// BIFF8 array constant payload for a `rows x cols` grid of numbers.
pub fn number_array8(rows: &[&[f64]]) -> Vec<u8> {
    let ncols = rows.first().map_or(1, |row| row.len());
    let mut out = vec![(ncols - 1) as u8];
    out.extend_from_slice(&((rows.len() - 1) as u16).to_le_bytes());
    for row in rows {
        for value in *row {
            out.push(0x01);
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
    out
}

pub fn sheet_names(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// BIFF8 workbook `Sheet1`, `Sheet2` whose XTI entries are
/// `0: Sheet1:Sheet2`, `1: deleted`, `2: any sheet`, `3: Sheet2`.
pub fn biff8_context() -> FormulaContext {
    FormulaContext::new(80, 1200, sheet_names(&["Sheet1", "Sheet2"]))
        .unwrap()
        .with_supbooks(vec![SupBookKind::Internal])
        .with_externsheet(vec![
            xti(0, 0, 1),
            xti(0, 0xFFFF, 0xFFFF),
            xti(0, 0xFFFE, 0xFFFE),
            xti(0, 1, 1),
        ])
}

pub fn xti(supbook: u16, itab_first: u16, itab_last: u16) -> ExternSheetEntry {
    ExternSheetEntry {
        supbook,
        itab_first,
        itab_last,
    }
}

/// A table of global names with the given formulas.
pub fn table(names: Vec<(&str, Vec<u8>)>) -> NameTable {
    let mut table = NameTable::new();
    for (name, tokens) in names {
        table.push(NameRecord::new(name, tokens));
    }
    table
}
