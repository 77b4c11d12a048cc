//! The workbook-wide table of defined names and their memoized evaluation results.

use formula_rpn::VersionFamily;
use serde::{Deserialize, Serialize};

use crate::config::EvalOptions;
use crate::context::FormulaContext;
use crate::error::FormulaError;
use crate::interpreter;
use crate::name_record::NameRecord;
use crate::operand::{Operand, OperandKind};

/// Where a defined name is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameScope {
    /// Workbook-global. Names start out global until [`NameTable::resolve_scopes`] runs.
    #[default]
    Global,
    /// Local to the calculation sheet with this index.
    Sheet(usize),
    /// Local to a macro or VBA sheet that is not exposed.
    MacroSheet,
    /// The stored sheet index does not match any sheet.
    Invalid,
}

impl NameScope {
    /// Integer form used for ordering: `-3` invalid, `-2` macro sheet, `-1` global, else the sheet.
    pub fn code(self) -> i64 {
        match self {
            NameScope::Global => -1,
            NameScope::Sheet(idx) => idx as i64,
            NameScope::MacroSheet => -2,
            NameScope::Invalid => -3,
        }
    }
}

/// Outcome of running one name's formula.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Evaluation {
    pub(crate) result: Option<Operand>,
    pub(crate) any_relative: bool,
    pub(crate) any_error: bool,
    pub(crate) any_external: bool,
    pub(crate) warnings: Vec<String>,
}

impl Evaluation {
    /// Recorded for a name whose evaluation failed fatally.
    pub(crate) fn failed() -> Self {
        Self {
            any_error: true,
            ..Self::default()
        }
    }
}

/// A defined name together with its (memoized) evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameFormula {
    pub record: NameRecord,
    pub scope: NameScope,
    evaluation: Option<Evaluation>,
}

impl NameFormula {
    pub fn new(record: NameRecord) -> Self {
        Self {
            record,
            scope: NameScope::Global,
            evaluation: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// Macro and binary names carry no formula worth evaluating.
    pub fn is_macro_or_binary(&self) -> bool {
        self.record.macro_ || self.record.binary
    }

    pub fn evaluated(&self) -> bool {
        self.evaluation.is_some()
    }

    /// The single operand left by the formula, if evaluation produced exactly one.
    pub fn result(&self) -> Option<&Operand> {
        self.evaluation.as_ref()?.result.as_ref()
    }

    pub fn any_relative(&self) -> bool {
        self.evaluation.as_ref().is_some_and(|e| e.any_relative)
    }

    pub fn any_error(&self) -> bool {
        self.evaluation.as_ref().is_some_and(|e| e.any_error)
    }

    pub fn any_external(&self) -> bool {
        self.evaluation.as_ref().is_some_and(|e| e.any_external)
    }

    /// Structural warnings recorded while evaluating.
    pub fn warnings(&self) -> &[String] {
        self.evaluation
            .as_ref()
            .map(|e| e.warnings.as_slice())
            .unwrap_or(&[])
    }

    /// `(sheet, row, col)` when the name is a constant absolute reference to one cell.
    pub fn single_cell(&self) -> Result<(usize, u32, u32), FormulaError> {
        let (sheet, row_lo, row_hi, col_lo, col_hi) = self.area2d(None)?;
        if row_hi != row_lo + 1 || col_hi != col_lo + 1 {
            return Err(self.not_constant());
        }
        Ok((sheet, row_lo, col_lo))
    }

    /// `(sheet, row_lo, row_hi, col_lo, col_hi)` (half-open) when the name is a constant absolute
    /// reference to one box on one sheet. `clip_to` is the sheet's `(rows, cols)` extent; when
    /// given, the box is clipped to it.
    pub fn area2d(
        &self,
        clip_to: Option<(u32, u32)>,
    ) -> Result<(usize, u32, u32, u32, u32), FormulaError> {
        let result = self.result().ok_or_else(|| self.not_constant())?;
        if result.kind != OperandKind::Reference {
            return Err(self.not_constant());
        }
        let [reference] = result.references().ok_or_else(|| self.not_constant())? else {
            return Err(self.not_constant());
        };

        let sheet = reference.sheet_lo();
        if sheet < 0 || reference.sheet_hi() != sheet + 1 {
            return Err(self.not_constant());
        }
        let bound = |value: i32| u32::try_from(value).map_err(|_| self.not_constant());
        let mut row_lo = bound(reference.row_lo())?;
        let mut row_hi = bound(reference.row_hi())?;
        let mut col_lo = bound(reference.col_lo())?;
        let mut col_hi = bound(reference.col_hi())?;
        if row_lo > row_hi || col_lo > col_hi {
            return Err(self.not_constant());
        }

        if let Some((nrows, ncols)) = clip_to {
            row_lo = row_lo.min(nrows);
            row_hi = row_hi.min(nrows);
            col_lo = col_lo.min(ncols);
            col_hi = col_hi.min(ncols);
        }
        Ok((sheet as usize, row_lo, row_hi, col_lo, col_hi))
    }

    fn not_constant(&self) -> FormulaError {
        FormulaError::NotConstantReference {
            name: self.record.name.clone(),
        }
    }
}

/// Every defined name of a workbook, in `NAME` record order.
///
/// Name tokens refer to entries by 1-based position, so the order is significant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NameTable {
    names: Vec<NameFormula>,
    #[serde(skip)]
    evaluations: usize,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a name, returning its 0-based index.
    pub fn push(&mut self, record: NameRecord) -> usize {
        self.names.push(NameFormula::new(record));
        self.names.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&NameFormula> {
        self.names.get(index)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NameFormula> {
        self.names.iter()
    }

    /// How many times a formula has actually been run (cache hits are not counted).
    pub fn evaluation_count(&self) -> usize {
        self.evaluations
    }

    pub(crate) fn record_evaluation(&mut self) {
        self.evaluations += 1;
    }

    pub(crate) fn store(&mut self, index: usize, evaluation: Evaluation) {
        if let Some(name) = self.names.get_mut(index) {
            name.evaluation = Some(evaluation);
        }
    }

    /// Convert the raw sheet fields of every name into a [`NameScope`].
    ///
    /// BIFF8 names store a 1-based BIFF sheet index that goes through the all-sheets map;
    /// BIFF5/BIFF7 names store a 1-based EXTERNSHEET number whose sheet name is looked up among
    /// the calculation sheets.
    pub fn resolve_scopes(&mut self, ctx: &FormulaContext) {
        for name in &mut self.names {
            name.scope = match ctx.family {
                VersionFamily::Biff8 => scope_biff8(ctx, name.record.sheet_index),
                VersionFamily::Biff5 => scope_b57(ctx, name.record.extsht_index),
                _ => NameScope::Global,
            };
            log::trace!("NAME {:?} scope {:?}", name.record.name, name.scope);
        }
    }

    /// Evaluate one name (0-based index), reusing the cached result if it was already evaluated.
    pub fn evaluate(
        &mut self,
        ctx: &FormulaContext,
        index: usize,
        options: &EvalOptions,
    ) -> Result<Option<&Operand>, FormulaError> {
        let name = self.get(index).ok_or(FormulaError::NameIndexOutOfRange {
            index,
            len: self.len(),
        })?;
        if !name.evaluated() {
            interpreter::evaluate_name(ctx, self, index, options, 0)?;
        }
        Ok(self.names[index].result())
    }

    /// Evaluate every name that is not a macro or binary name and has not been evaluated yet.
    ///
    /// A fatal error only affects the name it occurred in (and the names that depend on it);
    /// the failures are returned by name index.
    pub fn evaluate_all(
        &mut self,
        ctx: &FormulaContext,
        options: &EvalOptions,
    ) -> Vec<(usize, FormulaError)> {
        let mut failures = Vec::new();
        for index in 0..self.names.len() {
            let name = &self.names[index];
            if name.is_macro_or_binary() || name.evaluated() {
                continue;
            }
            if let Err(err) = interpreter::evaluate_name(ctx, self, index, options, 0) {
                log::warn!("failed to evaluate NAME {:?}: {err}", self.names[index].name());
                failures.push((index, err));
            }
        }
        failures
    }

    /// The name with this (case-insensitive) identifier and scope. Later duplicates win.
    pub fn lookup(&self, name: &str, scope: NameScope) -> Option<&NameFormula> {
        self.names
            .iter()
            .rev()
            .find(|candidate| candidate.scope == scope && candidate.name().eq_ignore_ascii_case(name))
    }

    /// Every name with this (case-insensitive) identifier, ordered by scope then record order.
    pub fn lookup_all(&self, name: &str) -> Vec<&NameFormula> {
        let mut matches: Vec<(i64, usize, &NameFormula)> = self
            .names
            .iter()
            .enumerate()
            .filter(|(_, candidate)| candidate.name().eq_ignore_ascii_case(name))
            .map(|(idx, candidate)| (candidate.scope.code(), idx, candidate))
            .collect();
        matches.sort_by_key(|&(scope, idx, _)| (scope, idx));
        matches.into_iter().map(|(_, _, candidate)| candidate).collect()
    }
}

fn scope_biff8(ctx: &FormulaContext, sheet_index: u16) -> NameScope {
    if sheet_index == 0 {
        return NameScope::Global;
    }
    match ctx.all_sheets_map.get(usize::from(sheet_index) - 1) {
        Some(&calc) if calc >= 0 => NameScope::Sheet(calc as usize),
        Some(_) => NameScope::MacroSheet,
        None => NameScope::Invalid,
    }
}

fn scope_b57(ctx: &FormulaContext, extsht_index: u16) -> NameScope {
    if extsht_index == 0 {
        return NameScope::Global;
    }
    match ctx.externsheet_b57_name(extsht_index) {
        Some(sheet_name) => ctx
            .sheet_index(sheet_name)
            .map_or(NameScope::MacroSheet, NameScope::Sheet),
        None => NameScope::Invalid,
    }
}
