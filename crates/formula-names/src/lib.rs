//! Static evaluation of defined-name (`NAME` record) formulas in BIFF2-BIFF8 workbooks.
//!
//! A [`NameTable`] holds the decoded `NAME` records of a workbook. Evaluating a name walks its
//! token stream on an operand stack and yields:
//! - reconstructed formula text (`Sheet1!$A$1:$B$4`, `SUM(Data)`, `IF(1,"a","b")`, ...)
//! - the statically known value, when there is one (constants, absolute references, folded
//!   `IF`/`CHOOSE`)
//! - `any_relative` / `any_error` / `any_external` flags for the name
//!
//! Names that refer to other names are evaluated recursively and memoized, so each name's
//! formula is interpreted at most once. Workbook-level inputs (sheet names, `EXTERNSHEET` /
//! `SUPBOOK` tables, add-in function names) are carried by a [`FormulaContext`].
//!
//! ```
//! use formula_names::{EvalOptions, FormulaContext, NameRecord, NameTable, OperandValue};
//!
//! let ctx = FormulaContext::new(80, 1200, vec!["Sheet1".to_string()]).unwrap();
//! let mut names = NameTable::new();
//! // tInt 42
//! let idx = names.push(NameRecord::new("Answer", vec![0x1E, 0x2A, 0x00]));
//!
//! let result = names.evaluate(&ctx, idx, &EvalOptions::default()).unwrap().unwrap();
//! assert_eq!(result.text, "42");
//! assert_eq!(result.value, Some(OperandValue::Number(42.0)));
//! ```

mod config;
pub mod context;
mod error;
pub mod externsheet;
mod interpreter;
pub mod name_record;
mod names;
mod operand;
pub mod operators;
pub mod strings;
pub mod supbook;

pub use config::{EvalOptions, TraceLevel, DEFAULT_ALARM_DEPTH, DEFAULT_PANIC_DEPTH};
pub use context::{
    ExternSheetB57, ExternSheetEntry, ExternSheetTypeB57, FormulaContext, SupBookKind,
};
pub use error::FormulaError;
pub use externsheet::{resolve_externsheet, resolve_externsheet_b57, SheetTarget};
pub use name_record::{parse_name_record, NameRecord};
pub use names::{NameFormula, NameScope, NameTable};
pub use operand::{Operand, OperandKind, OperandValue, FUNC_RANK, LEAF_RANK, SET_RANK};
pub use operators::{apply_binary, apply_set, apply_unary, BinaryOp, SetOp, SetResult, UnaryOp};

pub use formula_rpn::{ReferenceStyle, Ref3D, VersionFamily};
