//! The NAME formula stack machine.
//!
//! Token streams are walked left to right. Every token pushes, pops or rewrites operands on a
//! stack; at the end exactly one operand should remain. Name tokens recurse into the referenced
//! name first, so evaluating one name may evaluate several others.

use formula_rpn::display::{
    error_text_from_code, format_number, quoted_sheet_name, range_name_3d, range_name_3d_rel,
};
use formula_rpn::ptg::{self, TokenClass};
use formula_rpn::{
    base_index, decode_cell_address, decode_range_address, function_spec_from_id, token_name,
    token_size, AddressMode, CellAddress, Ref3D, TokenSize, VersionFamily, FTAB_USER_DEFINED,
    FUNC_CHOOSE, FUNC_IF,
};

use crate::config::EvalOptions;
use crate::context::{ExternSheetTypeB57, FormulaContext};
use crate::error::FormulaError;
use crate::externsheet::{resolve_externsheet, resolve_externsheet_b57, SheetTarget};
use crate::name_record::NameRecord;
use crate::names::{Evaluation, NameScope, NameTable};
use crate::operand::{Operand, OperandKind, OperandValue, FUNC_RANK, LEAF_RANK};
use crate::operators::{apply_binary, apply_set, apply_unary, BinaryOp, SetOp, UnaryOp};
use crate::strings::{parse_biff5_short_string, parse_biff8_unicode_string, parse_short_string};

/// `#REF!`, pushed for the error variants of reference tokens.
const ERROR_REF: u8 = 0x17;

/// Evaluate the name at `index` and store the outcome in `names`.
///
/// On a fatal error the name is still marked evaluated (erroneous, without a result) before the
/// error is returned, so every name on a failing recursion chain ends up marked.
pub(crate) fn evaluate_name(
    ctx: &FormulaContext,
    names: &mut NameTable,
    index: usize,
    options: &EvalOptions,
    depth: usize,
) -> Result<(), FormulaError> {
    let record = match names.get(index) {
        Some(name) => name.record.clone(),
        None => {
            return Err(FormulaError::NameIndexOutOfRange {
                index,
                len: names.len(),
            })
        }
    };
    names.record_evaluation();

    let outcome = if depth > options.panic_depth {
        Err(FormulaError::ExcessiveDepth {
            name_index: index,
            depth,
        })
    } else {
        Machine::new(ctx, options, index, depth, &record).run(names)
    };

    match outcome {
        Ok(evaluation) => {
            names.store(index, evaluation);
            Ok(())
        }
        Err(err) => {
            log::debug!("NAME #{index} {:?} failed at depth {depth}: {err}", record.name);
            names.store(index, Evaluation::failed());
            Err(err)
        }
    }
}

struct Machine<'a> {
    ctx: &'a FormulaContext,
    options: &'a EvalOptions,
    family: VersionFamily,
    name_index: usize,
    name: &'a str,
    depth: usize,
    trace: bool,
    formula_len: usize,
    tokens: &'a [u8],
    array_data: &'a [u8],
    array_pos: usize,
    stack: Vec<Operand>,
    any_relative: bool,
    any_error: bool,
    any_external: bool,
    warnings: Vec<String>,
}

impl<'a> Machine<'a> {
    fn new(
        ctx: &'a FormulaContext,
        options: &'a EvalOptions,
        name_index: usize,
        depth: usize,
        record: &'a NameRecord,
    ) -> Self {
        let split = record.formula_len.min(record.raw_formula.len());
        let (tokens, array_data) = record.raw_formula.split_at(split);
        Self {
            ctx,
            options,
            family: ctx.family,
            name_index,
            name: &record.name,
            depth,
            trace: options.tracing_at(depth),
            formula_len: record.formula_len,
            tokens,
            array_data,
            array_pos: 0,
            stack: Vec::new(),
            any_relative: false,
            any_error: false,
            any_external: false,
            warnings: Vec::new(),
        }
    }

    fn run(mut self, names: &mut NameTable) -> Result<Evaluation, FormulaError> {
        if self.trace {
            log::debug!(
                "evaluating NAME #{} {:?}: {} token bytes, {:?}, depth {}",
                self.name_index,
                self.name,
                self.formula_len,
                self.family,
                self.depth
            );
        }

        if self.formula_len == 0 {
            // A name without a formula (e.g. a label) still yields one placeholder.
            self.stack.push(Operand::unknown("?"));
        }

        let mut pos = 0usize;
        while pos < self.formula_len {
            let ptg = *self.tokens.get(pos).ok_or(FormulaError::UnexpectedEof {
                offset: pos,
                ptg: 0,
                needed: 1,
                remaining: 0,
            })?;
            let size = self.step(names, pos, ptg)?;
            if size == 0 {
                return Err(FormulaError::NonPositiveSize { offset: pos, ptg });
            }
            pos += size;
        }

        if self.stack.len() != 1 {
            self.warn(format!(
                "NAME {:?}: {} operands left on the stack at end of formula",
                self.name,
                self.stack.len()
            ));
        }
        let result = self.stack.pop();
        if self.trace {
            log::debug!(
                "end of NAME {:?}: result={:?} any_relative={} any_error={} any_external={}",
                self.name,
                result.as_ref().map(|op| op.text.as_str()),
                self.any_relative,
                self.any_error,
                self.any_external
            );
        }

        Ok(Evaluation {
            result,
            any_relative: self.any_relative,
            any_error: self.any_error,
            any_external: self.any_external,
            warnings: self.warnings,
        })
    }

    /// Execute the token at `pos`, returning its encoded length.
    fn step(&mut self, names: &mut NameTable, pos: usize, ptg: u8) -> Result<usize, FormulaError> {
        let base = base_index(ptg);
        let class = TokenClass::of(ptg);
        let op = ptg::opcode(ptg);

        let fixed = match token_size(self.family, base) {
            TokenSize::Invalid => {
                return Err(FormulaError::InvalidToken {
                    offset: pos,
                    ptg,
                    family: self.family,
                })
            }
            TokenSize::Fixed(n) => {
                self.payload(pos, ptg, 0, n)?;
                Some(n)
            }
            TokenSize::Variable => None,
        };

        if self.trace {
            let stack: Vec<&str> = self.stack.iter().map(|op| op.text.as_str()).collect();
            log::trace!(
                "pos={pos} ptg=0x{ptg:02X} t{} class={class:?} size={fixed:?} stack={stack:?}",
                token_name(base)
            );
        }

        let size = if class == TokenClass::Control {
            self.control_token(pos, ptg, op, fixed)?
        } else {
            self.operand_token(names, pos, ptg, op, class)?;
            fixed.unwrap_or(0)
        };
        Ok(size)
    }

    fn control_token(
        &mut self,
        pos: usize,
        ptg: u8,
        op: u8,
        fixed: Option<usize>,
    ) -> Result<usize, FormulaError> {
        match op {
            0x00 | ptg::PTG_EXP | ptg::PTG_TBL => {
                return Err(FormulaError::NotAllowedInName { offset: pos, ptg })
            }
            ptg::PTG_ADD..=ptg::PTG_NE => {
                let Some(binop) = BinaryOp::from_ptg(op) else {
                    return Err(FormulaError::InvalidToken {
                        offset: pos,
                        ptg,
                        family: self.family,
                    });
                };
                let right = self.pop(pos, ptg)?;
                let left = self.pop(pos, ptg)?;
                self.stack.push(apply_binary(binop, &left, &right));
            }
            ptg::PTG_ISECT | ptg::PTG_LIST | ptg::PTG_RANGE => {
                let Some(setop) = SetOp::from_ptg(op) else {
                    return Err(FormulaError::InvalidToken {
                        offset: pos,
                        ptg,
                        family: self.family,
                    });
                };
                let right = self.pop(pos, ptg)?;
                let left = self.pop(pos, ptg)?;
                let combined = apply_set(setop, &left, &right);
                if let Some(warning) = combined.warning {
                    self.warn(format!("NAME {:?} offset {pos}: {warning}", self.name));
                }
                self.stack.push(combined.operand);
            }
            ptg::PTG_UPLUS | ptg::PTG_UMINUS | ptg::PTG_PERCENT => {
                let Some(unop) = UnaryOp::from_ptg(op) else {
                    return Err(FormulaError::InvalidToken {
                        offset: pos,
                        ptg,
                        family: self.family,
                    });
                };
                let operand = self.pop(pos, ptg)?;
                self.stack.push(apply_unary(unop, &operand));
            }
            // Parentheses are re-derived from operator ranks.
            ptg::PTG_PAREN => {}
            ptg::PTG_MISS_ARG => self.stack.push(Operand::missing()),
            ptg::PTG_STR => {
                let input = self.tokens.get(pos + 1..).unwrap_or_default();
                let (value, consumed) = parse_short_string(input, self.family, self.ctx.codepage)
                    .map_err(|reason| FormulaError::InvalidString {
                        offset: pos + 1,
                        reason,
                    })?;
                self.stack.push(Operand::string(value));
                return Ok(1 + consumed);
            }
            ptg::PTG_EXTENDED | ptg::PTG_SHEET | ptg::PTG_END_SHEET => {
                return Err(FormulaError::Unimplemented { offset: pos, ptg })
            }
            ptg::PTG_ATTR => return self.attr_token(pos, ptg),
            ptg::PTG_ERR => {
                let code = self.payload(pos, ptg, 1, 1)?[0];
                let mnemonic = error_text_from_code(code)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("#ERR{code:02X}!"));
                self.stack.push(Operand::new(
                    OperandKind::Error,
                    Some(OperandValue::Error(code)),
                    LEAF_RANK,
                    format!("\"{mnemonic}\""),
                ));
            }
            ptg::PTG_BOOL => {
                let value = self.payload(pos, ptg, 1, 1)?[0];
                self.stack.push(Operand::boolean(value != 0));
            }
            ptg::PTG_INT => {
                let value = self.read_u16(pos, ptg, 1)?;
                self.stack
                    .push(Operand::number(f64::from(value), value.to_string()));
            }
            ptg::PTG_NUM => {
                let bytes = self.payload(pos, ptg, 1, 8)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                let value = f64::from_le_bytes(raw);
                self.stack.push(Operand::number(value, format_number(value)));
            }
            _ => {
                return Err(FormulaError::InvalidToken {
                    offset: pos,
                    ptg,
                    family: self.family,
                })
            }
        }
        fixed.ok_or(FormulaError::NonPositiveSize { offset: pos, ptg })
    }

    /// `tAttr`: `[subop: u8][data: u16]`, followed by a jump table for `tAttrChoose`.
    fn attr_token(&mut self, pos: usize, ptg: u8) -> Result<usize, FormulaError> {
        let subop = self.payload(pos, ptg, 1, 1)?[0];
        let nc = usize::from(self.read_u16(pos, ptg, 2)?);

        let size = if subop == ptg::ATTR_CHOOSE {
            nc * 2 + 6
        } else {
            if subop == ptg::ATTR_SUM {
                let top = self.stack.last_mut().ok_or(FormulaError::StackUnderflow {
                    offset: pos,
                    ptg,
                })?;
                *top = Operand::new(
                    OperandKind::Number,
                    None,
                    FUNC_RANK,
                    format!("SUM({})", top.text),
                );
            }
            4
        };
        if self.trace {
            log::trace!("tAttr subop=0x{subop:02X} nc={nc} size={size}");
        }
        self.payload(pos, ptg, 0, size)?;
        Ok(size)
    }

    fn operand_token(
        &mut self,
        names: &mut NameTable,
        pos: usize,
        ptg: u8,
        op: u8,
        class: TokenClass,
    ) -> Result<(), FormulaError> {
        match op {
            ptg::PTG_ARRAY => {
                let text = self.next_array_constant();
                self.stack.push(Operand::unknown(text));
            }
            ptg::PTG_FUNC => self.func_token(pos, ptg)?,
            ptg::PTG_FUNC_VAR => self.func_var_token(pos, ptg)?,
            ptg::PTG_NAME => {
                let raw = self.read_u16(pos, ptg, 1)?;
                let operand = match usize::from(raw).checked_sub(1) {
                    Some(target) if target < names.len() => {
                        self.name_operand(names, target)?
                    }
                    _ => {
                        self.any_error = true;
                        self.warn(format!(
                            "NAME {:?} offset {pos}: tName index {raw} out of range",
                            self.name
                        ));
                        Operand::unknown("#NAME?")
                    }
                };
                self.stack.push(operand);
            }
            ptg::PTG_REF => {
                let cell = self.cell_address(pos, ptg, 1)?;
                self.push_local_reference(
                    class,
                    Ref3D::current_sheet(
                        (cell.row, cell.row + 1),
                        (cell.col, cell.col + 1),
                        (cell.row_relative, cell.row_relative),
                        (cell.col_relative, cell.col_relative),
                    ),
                );
            }
            ptg::PTG_AREA => {
                let (first, last) = self.range_address(pos, ptg, 1)?;
                self.push_local_reference(
                    class,
                    Ref3D::current_sheet(
                        (first.row, last.row + 1),
                        (first.col, last.col + 1),
                        (first.row_relative, last.row_relative),
                        (first.col_relative, last.col_relative),
                    ),
                );
            }
            ptg::PTG_MEM_AREA | ptg::PTG_REF_N | ptg::PTG_AREA_N => {
                return Err(FormulaError::NotAllowedInName { offset: pos, ptg })
            }
            // The sub-expression that follows is evaluated on its own.
            ptg::PTG_MEM_FUNC => {}
            ptg::PTG_REF_3D => self.reference_3d(pos, ptg, class, false)?,
            ptg::PTG_AREA_3D => self.reference_3d(pos, ptg, class, true)?,
            ptg::PTG_NAME_X => self.name_x_token(names, pos, ptg)?,
            ptg::PTG_MEM_ERR
            | ptg::PTG_MEM_NO_MEM
            | ptg::PTG_REF_ERR
            | ptg::PTG_AREA_ERR
            | ptg::PTG_REF_ERR_3D
            | ptg::PTG_AREA_ERR_3D => {
                self.any_error = true;
                self.stack.push(Operand::new(
                    OperandKind::Error,
                    Some(OperandValue::Error(ERROR_REF)),
                    LEAF_RANK,
                    "#REF!",
                ));
            }
            _ => {
                if self.trace {
                    log::debug!("t{} at offset {pos} is not handled", token_name(base_index(ptg)));
                }
                self.any_error = true;
            }
        }
        Ok(())
    }

    /// `tFunc`: fixed-arity call, `[iftab]`.
    fn func_token(&mut self, pos: usize, ptg: u8) -> Result<(), FormulaError> {
        let id = self.read_function_id(pos, ptg, 1)?;
        let Some(spec) = function_spec_from_id(id) else {
            self.any_error = true;
            self.warn(format!(
                "NAME {:?} offset {pos}: tFunc with unknown function id {id}",
                self.name
            ));
            self.stack.push(Operand::unknown(format!("FUNC#{id}()")));
            return Ok(());
        };

        let args = self.pop_args(pos, ptg, usize::from(spec.min_args))?;
        let text = format!("{}({})", spec.name, self.join_args(&args));
        self.stack
            .push(Operand::new(OperandKind::Unknown, None, FUNC_RANK, text));
        Ok(())
    }

    /// `tFuncVar`: `[argc: u8 (bit 7 = prompt)][iftab (bit 15 = command)]`.
    fn func_var_token(&mut self, pos: usize, ptg: u8) -> Result<(), FormulaError> {
        let raw_nargs = self.payload(pos, ptg, 1, 1)?[0];
        let raw_id = self.read_function_id(pos, ptg, 2)?;
        let nargs = usize::from(raw_nargs & 0x7F);
        let id = raw_id & 0x7FFF;
        if self.trace {
            log::trace!(
                "tFuncVar id={id} nargs={nargs} prompt={} command={}",
                raw_nargs & 0x80 != 0,
                raw_id & 0x8000 != 0
            );
        }

        let args = self.pop_args(pos, ptg, nargs)?;

        if id == FTAB_USER_DEFINED {
            // The callee is the first argument (a name or an add-in function).
            let text = match args.split_first() {
                Some((callee, rest)) => format!("{}({})", callee.text, self.join_args(rest)),
                None => "()".to_string(),
            };
            self.stack
                .push(Operand::new(OperandKind::Unknown, None, FUNC_RANK, text));
            return Ok(());
        }

        let Some(spec) = function_spec_from_id(id) else {
            self.any_error = true;
            self.warn(format!(
                "NAME {:?} offset {pos}: tFuncVar with unknown function id {id}",
                self.name
            ));
            let text = format!("FUNC#{id}({})", self.join_args(&args));
            self.stack
                .push(Operand::new(OperandKind::Unknown, None, FUNC_RANK, text));
            return Ok(());
        };

        if nargs < usize::from(spec.min_args) || nargs > usize::from(spec.max_args) {
            self.warn(format!(
                "NAME {:?} offset {pos}: {} called with {nargs} arguments, expected {}..={}",
                self.name, spec.name, spec.min_args, spec.max_args
            ));
        }

        let text = format!("{}({})", spec.name, self.join_args(&args));
        let mut result = Operand::new(OperandKind::Unknown, None, FUNC_RANK, text);
        let folded = match id {
            FUNC_IF => fold_if(&args),
            FUNC_CHOOSE => fold_choose(&args),
            _ => None,
        };
        if let Some((kind, value)) = folded {
            if self.trace {
                log::trace!("{} folded to constant {kind:?}", spec.name);
            }
            result.kind = kind;
            result.value = value;
        }
        self.stack.push(result);
        Ok(())
    }

    fn name_x_token(&mut self, names: &mut NameTable, pos: usize, ptg: u8) -> Result<(), FormulaError> {
        // BIFF8: [ixti: u16][iname: u16][reserved: u16]
        // BIFF5/7: [ixals: i16][reserved: 8 bytes][iname: u16][reserved: 12 bytes]
        let (orig_refx, raw_target) = if self.family.has_externsheet_table() {
            (
                i32::from(self.read_u16(pos, ptg, 1)?),
                self.read_u16(pos, ptg, 3)?,
            )
        } else {
            (
                i32::from(self.read_i16(pos, ptg, 1)?),
                self.read_u16(pos, ptg, 11)?,
            )
        };
        let target = usize::from(raw_target).checked_sub(1);

        let mut dodgy = false;
        let refx = if self.family.has_externsheet_table() {
            orig_refx
        } else if orig_refx > 0 {
            orig_refx - 1
        } else if orig_refx < 0 {
            -orig_refx - 1
        } else {
            dodgy = true;
            0
        };

        let self_reference = target == Some(self.name_index);

        let sheets = if dodgy {
            None
        } else if self.family.has_externsheet_table() {
            Some(resolve_externsheet(self.ctx, refx as usize))
        } else if orig_refx > 0 {
            Some(SheetTarget::External)
        } else {
            let kind = self
                .ctx
                .externsheet_b57
                .get(refx as usize)
                .map(|entry| entry.kind);
            Some(if kind == Some(ExternSheetTypeB57::OwnDocument) {
                SheetTarget::AnySheet
            } else {
                SheetTarget::UnsupportedExternSheet
            })
        };

        if sheets == Some(SheetTarget::External) {
            self.any_external = true;
        }

        let operand = match (sheets, target) {
            (Some(SheetTarget::AddIn), Some(target)) => {
                let ctx = self.ctx;
                match ctx.addin_function_names.get(target) {
                    Some(function) => Operand::new(
                        OperandKind::String,
                        Some(OperandValue::String(function.clone())),
                        LEAF_RANK,
                        function.clone(),
                    ),
                    None => self.unresolved_name_x(Some(target), orig_refx),
                }
            }
            (Some(_), Some(_)) if self_reference => {
                if self.trace {
                    log::debug!("NAME {:?} refers to itself through tNameX", self.name);
                }
                self.unresolved_name_x(target, orig_refx)
            }
            (Some(sheets), Some(target)) if !sheets.is_error() && target < names.len() => {
                self.name_operand(names, target)?
            }
            (_, target) => self.unresolved_name_x(target, orig_refx),
        };
        self.stack.push(operand);
        Ok(())
    }

    fn unresolved_name_x(&mut self, target: Option<usize>, orig_refx: i32) -> Operand {
        self.any_error = true;
        let target = target.map_or_else(|| "?".to_string(), |target| target.to_string());
        Operand::unknown(format!("<<Name #{target} in external(?) file #{orig_refx}>>"))
    }

    /// Operand for a reference to another defined name, evaluating it first if needed.
    fn name_operand(&mut self, names: &mut NameTable, target: usize) -> Result<Operand, FormulaError> {
        let needs_eval = names
            .get(target)
            .is_some_and(|name| !name.evaluated() && !name.is_macro_or_binary());
        if needs_eval {
            evaluate_name(self.ctx, names, target, self.options, self.depth + 1)?;
        }

        let Some(name) = names.get(target) else {
            return Err(FormulaError::NameIndexOutOfRange {
                index: target,
                len: names.len(),
            });
        };

        self.any_relative |= name.any_relative();
        self.any_external |= name.any_external();
        let mut operand = match name.result() {
            Some(result) if !name.is_macro_or_binary() && !name.any_error() => result.clone(),
            _ => {
                self.any_error = true;
                if self.trace {
                    log::debug!("NAME {:?} has no usable result", name.name());
                }
                Operand::unknown("")
            }
        };

        operand.rank = LEAF_RANK;
        operand.text = match name.scope {
            NameScope::Sheet(sheet) => format!(
                "{}!{}",
                quoted_sheet_name(&self.ctx.sheet_names, sheet as i32),
                name.name()
            ),
            _ => name.name().to_string(),
        };
        Ok(operand)
    }

    fn push_local_reference(&mut self, class: TokenClass, reference: Ref3D) {
        self.any_relative = true;
        let text = range_name_3d_rel(
            &self.ctx.sheet_names,
            &reference,
            None,
            self.options.reference_style,
        );
        let operand = if class == TokenClass::Reference {
            Operand::new(
                OperandKind::RelativeReference,
                Some(OperandValue::References(vec![reference])),
                LEAF_RANK,
                text,
            )
        } else {
            Operand::unknown(text)
        };
        self.stack.push(operand);
    }

    /// `tRef3d` / `tArea3d`.
    fn reference_3d(
        &mut self,
        pos: usize,
        ptg: u8,
        class: TokenClass,
        area: bool,
    ) -> Result<(), FormulaError> {
        // BIFF8: [ixti: u16][address]
        // BIFF5/7: [ixals: i16][reserved: 8 bytes][itabFirst: i16][itabLast: i16][address]
        let (sheets, address_offset) = if self.family.has_externsheet_table() {
            let ixti = self.read_u16(pos, ptg, 1)?;
            (resolve_externsheet(self.ctx, usize::from(ixti)), 3)
        } else {
            let raw_extsht = self.read_i16(pos, ptg, 1)?;
            let first = self.read_i16(pos, ptg, 11)?;
            let last = self.read_i16(pos, ptg, 13)?;
            if self.trace {
                log::trace!("3-D reference ixals={raw_extsht} itab={first}..={last}");
            }
            (
                resolve_externsheet_b57(self.ctx, raw_extsht, first, last),
                15,
            )
        };

        let (first, last) = if area {
            self.range_address(pos, ptg, address_offset)?
        } else {
            let cell = self.cell_address(pos, ptg, address_offset)?;
            (cell, cell)
        };

        self.any_error |= sheets.is_error();
        self.any_external |= sheets == SheetTarget::External;

        let (sheet_lo, sheet_hi) = sheets.range();
        let coords = [
            sheet_lo,
            sheet_hi + 1,
            first.row,
            last.row + 1,
            first.col,
            last.col + 1,
        ];
        let relflags = [
            false,
            false,
            first.row_relative,
            last.row_relative,
            first.col_relative,
            last.col_relative,
        ];
        let is_relative = relflags.iter().any(|&flag| flag);
        self.any_relative |= is_relative;

        let (kind, reference, text) = if is_relative {
            let reference = Ref3D::with_relflags(coords, relflags);
            let text = range_name_3d_rel(
                &self.ctx.sheet_names,
                &reference,
                None,
                self.options.reference_style,
            );
            (OperandKind::RelativeReference, reference, text)
        } else {
            let reference = Ref3D::new(coords);
            let text = range_name_3d(
                &self.ctx.sheet_names,
                &reference,
                self.options.reference_style,
            );
            (OperandKind::Reference, reference, text)
        };

        let value =
            (class == TokenClass::Reference).then(|| OperandValue::References(vec![reference]));
        self.stack
            .push(Operand::new(kind, value, LEAF_RANK, text));
        Ok(())
    }

    /// Render the next array constant from the data trailing the token stream.
    fn next_array_constant(&mut self) -> String {
        let input = self.array_data.get(self.array_pos..).unwrap_or_default();
        match parse_array_constant(
            input,
            self.family,
            self.ctx.codepage,
            self.options.list_separator,
        ) {
            Ok((text, consumed)) => {
                self.array_pos += consumed;
                text
            }
            Err(reason) => {
                self.warn(format!(
                    "NAME {:?}: malformed array constant data: {reason}",
                    self.name
                ));
                self.array_pos = self.array_data.len();
                "{...}".to_string()
            }
        }
    }

    fn warn(&mut self, message: String) {
        log::warn!("{message}");
        self.warnings.push(message);
    }

    fn pop(&mut self, pos: usize, ptg: u8) -> Result<Operand, FormulaError> {
        self.stack
            .pop()
            .ok_or(FormulaError::StackUnderflow { offset: pos, ptg })
    }

    fn pop_args(&mut self, pos: usize, ptg: u8, nargs: usize) -> Result<Vec<Operand>, FormulaError> {
        let split = self
            .stack
            .len()
            .checked_sub(nargs)
            .ok_or(FormulaError::StackUnderflow { offset: pos, ptg })?;
        Ok(self.stack.split_off(split))
    }

    fn join_args(&self, args: &[Operand]) -> String {
        let separator = self.options.list_separator.to_string();
        args.iter()
            .map(|arg| arg.text.as_str())
            .collect::<Vec<_>>()
            .join(&separator)
    }

    /// `len` bytes starting `start` bytes after the token at `pos`.
    fn payload(&self, pos: usize, ptg: u8, start: usize, len: usize) -> Result<&'a [u8], FormulaError> {
        let tokens = self.tokens;
        let from = pos + start;
        tokens
            .get(from..from + len)
            .ok_or(FormulaError::UnexpectedEof {
                offset: pos,
                ptg,
                needed: len,
                remaining: tokens.len().saturating_sub(from),
            })
    }

    fn read_u16(&self, pos: usize, ptg: u8, start: usize) -> Result<u16, FormulaError> {
        let bytes = self.payload(pos, ptg, start, 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_i16(&self, pos: usize, ptg: u8, start: usize) -> Result<i16, FormulaError> {
        let bytes = self.payload(pos, ptg, start, 2)?;
        Ok(i16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Function ids are 16-bit from BIFF4 on, 8-bit before.
    fn read_function_id(&self, pos: usize, ptg: u8, start: usize) -> Result<u16, FormulaError> {
        if self.family.has_wide_function_ids() {
            self.read_u16(pos, ptg, start)
        } else {
            Ok(u16::from(self.payload(pos, ptg, start, 1)?[0]))
        }
    }

    fn cell_address(&self, pos: usize, ptg: u8, start: usize) -> Result<CellAddress, FormulaError> {
        decode_cell_address(self.tokens, pos + start, self.family, AddressMode::RelDelta).ok_or(
            FormulaError::UnexpectedEof {
                offset: pos,
                ptg,
                needed: formula_rpn::address::cell_address_len(self.family),
                remaining: self.tokens.len().saturating_sub(pos + start),
            },
        )
    }

    fn range_address(
        &self,
        pos: usize,
        ptg: u8,
        start: usize,
    ) -> Result<(CellAddress, CellAddress), FormulaError> {
        decode_range_address(self.tokens, pos + start, self.family, AddressMode::RelDelta).ok_or(
            FormulaError::UnexpectedEof {
                offset: pos,
                ptg,
                needed: formula_rpn::address::range_address_len(self.family),
                remaining: self.tokens.len().saturating_sub(pos + start),
            },
        )
    }
}

/// `IF(test, a[, b])` with a constant 0/1 test selects a branch statically.
fn fold_if(args: &[Operand]) -> Option<(OperandKind, Option<OperandValue>)> {
    let test = args.first()?;
    if !matches!(test.kind, OperandKind::Number | OperandKind::Boolean) {
        return None;
    }
    let selector = test.as_number()?;
    if selector != 0.0 && selector != 1.0 {
        return None;
    }
    if args.len() == 2 && selector == 0.0 {
        return Some((OperandKind::Boolean, Some(OperandValue::Boolean(false))));
    }
    // args[1] when true, args[2] when false.
    let chosen = args.get(2 - selector as usize)?;
    Some(chosen_branch(chosen))
}

/// `CHOOSE(n, v1, v2, ...)` with a constant in-range `n` selects `v<n>` statically.
fn fold_choose(args: &[Operand]) -> Option<(OperandKind, Option<OperandValue>)> {
    let test = args.first()?;
    if test.kind != OperandKind::Number {
        return None;
    }
    let selector = test.as_number()?;
    if !(selector >= 1.0 && selector < args.len() as f64) {
        return None;
    }
    let chosen = args.get(selector.trunc() as usize)?;
    Some(chosen_branch(chosen))
}

fn chosen_branch(chosen: &Operand) -> (OperandKind, Option<OperandValue>) {
    if chosen.kind == OperandKind::Missing {
        (OperandKind::Number, Some(OperandValue::Number(0.0)))
    } else {
        (chosen.kind, chosen.value.clone())
    }
}

const ARRAY_EMPTY: u8 = 0x00;
const ARRAY_NUMBER: u8 = 0x01;
const ARRAY_STRING: u8 = 0x02;
const ARRAY_BOOL: u8 = 0x04;
const ARRAY_ERROR: u8 = 0x10;

/// Parse one array constant: `[cols][rows]` followed by `rows * cols` tagged values.
///
/// BIFF8 stores `cols - 1` (u8) and `rows - 1` (u16); earlier versions store `cols` (u8, with 0
/// meaning 256) and `rows` (u16). Returns the `{a,b;c,d}` text and the bytes consumed.
fn parse_array_constant(
    input: &[u8],
    family: VersionFamily,
    codepage: u16,
    separator: char,
) -> Result<(String, usize), String> {
    let header = input
        .get(..3)
        .ok_or_else(|| "missing array dimensions".to_string())?;
    let raw_cols = usize::from(header[0]);
    let raw_rows = usize::from(u16::from_le_bytes([header[1], header[2]]));
    let (cols, rows) = if family.has_unicode_strings() {
        (raw_cols + 1, raw_rows + 1)
    } else {
        (if raw_cols == 0 { 256 } else { raw_cols }, raw_rows)
    };

    let mut pos = 3usize;
    let mut row_texts = Vec::with_capacity(rows.min(1024));
    for _ in 0..rows {
        let mut values = Vec::with_capacity(cols.min(256));
        for _ in 0..cols {
            let tag = *input
                .get(pos)
                .ok_or_else(|| format!("missing value tag at offset {pos}"))?;
            pos += 1;
            let fixed = |pos: usize| {
                input
                    .get(pos..pos + 8)
                    .ok_or_else(|| format!("missing 8-byte value at offset {pos}"))
            };
            let text = match tag {
                ARRAY_EMPTY => {
                    fixed(pos)?;
                    pos += 8;
                    String::new()
                }
                ARRAY_NUMBER => {
                    let mut raw = [0u8; 8];
                    raw.copy_from_slice(fixed(pos)?);
                    pos += 8;
                    format_number(f64::from_le_bytes(raw))
                }
                ARRAY_STRING => {
                    let rest = &input[pos..];
                    let (value, consumed) = if family.has_unicode_strings() {
                        parse_biff8_unicode_string(rest, codepage)?
                    } else {
                        parse_biff5_short_string(rest, codepage)?
                    };
                    pos += consumed;
                    format!("\"{}\"", value.replace('"', "\"\""))
                }
                ARRAY_BOOL => {
                    let value = fixed(pos)?[0];
                    pos += 8;
                    if value != 0 { "TRUE" } else { "FALSE" }.to_string()
                }
                ARRAY_ERROR => {
                    let code = fixed(pos)?[0];
                    pos += 8;
                    error_text_from_code(code)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("#ERR{code:02X}!"))
                }
                other => return Err(format!("unknown value tag 0x{other:02X} at offset {}", pos - 1)),
            };
            values.push(text);
        }
        row_texts.push(values.join(&separator.to_string()));
    }

    Ok((format!("{{{}}}", row_texts.join(";")), pos))
}
