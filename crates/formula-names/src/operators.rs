//! Operator semantics for constant folding.
//!
//! Each binary operator coerces its operands according to one of three policies. When either
//! operand has the wrong kind or no known value, the result still carries the operator's kind,
//! rank and reconstructed text but no value.

use std::cmp::Ordering;

use formula_rpn::display::format_number;
use formula_rpn::ptg;
use formula_rpn::BoxOp;

use crate::operand::{Operand, OperandKind, OperandValue, SET_RANK};

const ERROR_DIV0: u8 = 0x07;
const ERROR_NUM: u8 = 0x24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Power,
    Concat,
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
    Ne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Coercion {
    /// Numbers pass through, strings are parsed as numbers.
    Arithmetic,
    /// No conversion: numbers and strings are compared as they are.
    Comparison,
    /// Numbers are formatted to their default text form.
    Concatenation,
}

impl BinaryOp {
    pub fn from_ptg(ptg: u8) -> Option<Self> {
        Some(match ptg {
            ptg::PTG_ADD => BinaryOp::Add,
            ptg::PTG_SUB => BinaryOp::Sub,
            ptg::PTG_MUL => BinaryOp::Mul,
            ptg::PTG_DIV => BinaryOp::Div,
            ptg::PTG_POWER => BinaryOp::Power,
            ptg::PTG_CONCAT => BinaryOp::Concat,
            ptg::PTG_LT => BinaryOp::Lt,
            ptg::PTG_LE => BinaryOp::Le,
            ptg::PTG_EQ => BinaryOp::Eq,
            ptg::PTG_GE => BinaryOp::Ge,
            ptg::PTG_GT => BinaryOp::Gt,
            ptg::PTG_NE => BinaryOp::Ne,
            _ => return None,
        })
    }

    pub fn rank(self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 30,
            BinaryOp::Mul | BinaryOp::Div => 40,
            BinaryOp::Power => 50,
            BinaryOp::Concat => 20,
            _ => 10,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Power => "^",
            BinaryOp::Concat => "&",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Eq => "=",
            BinaryOp::Ge => ">=",
            BinaryOp::Gt => ">",
            BinaryOp::Ne => "<>",
        }
    }

    pub fn result_kind(self) -> OperandKind {
        match self.coercion() {
            Coercion::Arithmetic => OperandKind::Number,
            Coercion::Concatenation => OperandKind::String,
            Coercion::Comparison => OperandKind::Boolean,
        }
    }

    fn coercion(self) -> Coercion {
        match self {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Power => {
                Coercion::Arithmetic
            }
            BinaryOp::Concat => Coercion::Concatenation,
            _ => Coercion::Comparison,
        }
    }

    /// `a-(b-c)` must keep its parentheses; `a+(b+c)` need not.
    fn is_associative(self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Mul | BinaryOp::Concat)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Scalar {
    Number(f64),
    Text(String),
}

fn coerce(policy: Coercion, operand: &Operand) -> Option<Scalar> {
    let value = operand.value.as_ref()?;
    match (policy, operand.kind, value) {
        (_, OperandKind::Number, OperandValue::Number(n)) => Some(match policy {
            Coercion::Concatenation => Scalar::Text(format_number(*n)),
            _ => Scalar::Number(*n),
        }),
        (Coercion::Arithmetic, OperandKind::String, OperandValue::String(s)) => {
            parse_number(s).map(Scalar::Number)
        }
        (_, OperandKind::String, OperandValue::String(s)) => Some(Scalar::Text(s.clone())),
        _ => None,
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Strings and numbers compare by value when the string reads as a number; otherwise text sorts
/// after every number.
fn compare(a: &Scalar, b: &Scalar) -> Option<Ordering> {
    match (a, b) {
        (Scalar::Number(x), Scalar::Number(y)) => x.partial_cmp(y),
        (Scalar::Text(x), Scalar::Text(y)) => Some(x.cmp(y)),
        (Scalar::Text(x), Scalar::Number(y)) => match parse_number(x) {
            Some(x) => x.partial_cmp(y),
            None => Some(Ordering::Greater),
        },
        (Scalar::Number(_), Scalar::Text(_)) => compare(b, a).map(Ordering::reverse),
    }
}

fn arithmetic(op: BinaryOp, x: f64, y: f64) -> OperandValue {
    let result = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div if y == 0.0 => return OperandValue::Error(ERROR_DIV0),
        BinaryOp::Div => x / y,
        _ => x.powf(y),
    };
    if result.is_finite() {
        OperandValue::Number(result)
    } else {
        OperandValue::Error(ERROR_NUM)
    }
}

fn evaluate(op: BinaryOp, a: Scalar, b: Scalar) -> Option<OperandValue> {
    match op.coercion() {
        Coercion::Arithmetic => match (a, b) {
            (Scalar::Number(x), Scalar::Number(y)) => Some(arithmetic(op, x, y)),
            _ => None,
        },
        Coercion::Concatenation => match (a, b) {
            (Scalar::Text(x), Scalar::Text(y)) => Some(OperandValue::String(x + &y)),
            _ => None,
        },
        Coercion::Comparison => {
            let ord = compare(&a, &b)?;
            let result = match op {
                BinaryOp::Lt => ord == Ordering::Less,
                BinaryOp::Le => ord != Ordering::Greater,
                BinaryOp::Eq => ord == Ordering::Equal,
                BinaryOp::Ge => ord != Ordering::Less,
                BinaryOp::Gt => ord == Ordering::Greater,
                _ => ord != Ordering::Equal,
            };
            Some(OperandValue::Boolean(result))
        }
    }
}

/// Combine two operands with a binary operator.
pub fn apply_binary(op: BinaryOp, left: &Operand, right: &Operand) -> Operand {
    let rank = op.rank();
    let right_text = if right.rank < rank || (right.rank == rank && !op.is_associative()) {
        format!("({})", right.text)
    } else {
        right.text.clone()
    };
    let text = format!("{}{}{}", left.text_within(rank), op.symbol(), right_text);

    let value = match (coerce(op.coercion(), left), coerce(op.coercion(), right)) {
        (Some(a), Some(b)) => evaluate(op, a, b),
        _ => None,
    };
    let kind = match value {
        Some(OperandValue::Error(_)) => OperandKind::Error,
        _ => op.result_kind(),
    };
    Operand::new(kind, value, rank, text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Plus,
    Minus,
    Percent,
}

impl UnaryOp {
    pub fn from_ptg(ptg: u8) -> Option<Self> {
        Some(match ptg {
            ptg::PTG_UPLUS => UnaryOp::Plus,
            ptg::PTG_UMINUS => UnaryOp::Minus,
            ptg::PTG_PERCENT => UnaryOp::Percent,
            _ => return None,
        })
    }

    pub fn rank(self) -> u8 {
        match self {
            UnaryOp::Plus | UnaryOp::Minus => 70,
            UnaryOp::Percent => 60,
        }
    }
}

pub fn apply_unary(op: UnaryOp, operand: &Operand) -> Operand {
    let rank = op.rank();
    let inner = operand.text_within(rank);
    let text = match op {
        UnaryOp::Plus => format!("+{inner}"),
        UnaryOp::Minus => format!("-{inner}"),
        UnaryOp::Percent => format!("{inner}%"),
    };
    let value = match coerce(Coercion::Arithmetic, operand) {
        Some(Scalar::Number(n)) => Some(OperandValue::Number(match op {
            UnaryOp::Plus => n,
            UnaryOp::Minus => -n,
            UnaryOp::Percent => n / 100.0,
        })),
        _ => None,
    };
    Operand::new(OperandKind::Number, value, rank, text)
}

/// Reference operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOp {
    /// `A1:B2 C1:D4`
    Intersect,
    /// `(A1,B2)`
    Union,
    /// `A1:B2`
    Range,
}

impl SetOp {
    pub fn from_ptg(ptg: u8) -> Option<Self> {
        Some(match ptg {
            ptg::PTG_ISECT => SetOp::Intersect,
            ptg::PTG_LIST => SetOp::Union,
            ptg::PTG_RANGE => SetOp::Range,
            _ => return None,
        })
    }

    pub fn symbol(self) -> char {
        match self {
            SetOp::Intersect => ' ',
            SetOp::Union => ',',
            SetOp::Range => ':',
        }
    }
}

/// Result of a reference operator, plus a warning when two references could not be combined.
#[derive(Debug, Clone, PartialEq)]
pub struct SetResult {
    pub operand: Operand,
    pub warning: Option<String>,
}

pub fn apply_set(op: SetOp, left: &Operand, right: &Operand) -> SetResult {
    let text = format!(
        "{}{}{}",
        left.text_within(SET_RANK),
        op.symbol(),
        right.text_within(SET_RANK)
    );
    let mut warning = None;
    let (kind, value) = if left.kind == OperandKind::Error || right.kind == OperandKind::Error {
        (OperandKind::Error, None)
    } else if op == SetOp::Union && left.kind.is_reference() && right.kind.is_reference() {
        let kind = if left.kind == OperandKind::RelativeReference
            || right.kind == OperandKind::RelativeReference
        {
            OperandKind::RelativeReference
        } else {
            OperandKind::Reference
        };
        let value = match (left.references(), right.references()) {
            (Some(a), Some(b)) => Some(OperandValue::References(
                a.iter().chain(b.iter()).copied().collect(),
            )),
            _ => None,
        };
        (kind, value)
    } else if op != SetOp::Union && left.kind.is_reference() && left.kind == right.kind {
        let box_op = if op == SetOp::Range {
            BoxOp::Range
        } else {
            BoxOp::Intersect
        };
        let value = match (left.references(), right.references()) {
            (Some([a]), Some([b])) if a.relflags == b.relflags => {
                Some(OperandValue::References(vec![a.combine(b, box_op)]))
            }
            (Some(_), Some(_)) => {
                warning = Some(format!("cannot combine `{}` with `{}`", left.text, right.text));
                None
            }
            _ => None,
        };
        (left.kind, value)
    } else {
        if left.kind.is_reference() && right.kind.is_reference() {
            warning = Some(format!(
                "cannot combine absolute and relative references `{}` and `{}`",
                left.text, right.text
            ));
        }
        (OperandKind::Unknown, None)
    };

    SetResult {
        operand: Operand::new(kind, value, SET_RANK, text),
        warning,
    }
}
