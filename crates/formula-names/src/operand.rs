use formula_rpn::Ref3D;
use serde::{Deserialize, Serialize};

/// Precedence of literals, references and names. Nothing binds tighter.
pub const LEAF_RANK: u8 = 90;
/// Precedence of function calls.
pub const FUNC_RANK: u8 = 90;
/// Precedence of the reference operators (range, intersection, union).
pub const SET_RANK: u8 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperandKind {
    /// The kind is unknown or ambiguous.
    Unknown,
    Number,
    String,
    Boolean,
    Error,
    /// Absolute reference(s).
    Reference,
    /// Fully or partially relative reference(s).
    RelativeReference,
    /// Placeholder for an omitted function argument.
    Missing,
}

impl OperandKind {
    pub fn is_reference(self) -> bool {
        matches!(
            self,
            OperandKind::Reference | OperandKind::RelativeReference
        )
    }
}

/// A statically known operand value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum OperandValue {
    Number(f64),
    Boolean(bool),
    String(String),
    /// BIFF error code (`0x07` is `#DIV/0!`).
    Error(u8),
    /// One or more boxes; more than one only after a union.
    References(Vec<Ref3D>),
}

/// A value on the evaluation stack together with its reconstructed formula text.
///
/// `value` is `None` when the operand depends on cell data or could not be computed; `text` is
/// populated either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operand {
    pub kind: OperandKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<OperandValue>,
    pub text: String,
    pub rank: u8,
}

impl Operand {
    pub fn new(
        kind: OperandKind,
        value: Option<OperandValue>,
        rank: u8,
        text: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            value,
            text: text.into(),
            rank,
        }
    }

    pub fn unknown(text: impl Into<String>) -> Self {
        Self::new(OperandKind::Unknown, None, LEAF_RANK, text)
    }

    pub fn missing() -> Self {
        Self::new(OperandKind::Missing, None, LEAF_RANK, "")
    }

    pub fn number(value: f64, text: impl Into<String>) -> Self {
        Self::new(
            OperandKind::Number,
            Some(OperandValue::Number(value)),
            LEAF_RANK,
            text,
        )
    }

    pub fn boolean(value: bool) -> Self {
        Self::new(
            OperandKind::Boolean,
            Some(OperandValue::Boolean(value)),
            LEAF_RANK,
            if value { "TRUE" } else { "FALSE" },
        )
    }

    pub fn string(value: impl Into<String>) -> Self {
        let value = value.into();
        let text = format!("\"{}\"", value.replace('"', "\"\""));
        Self::new(
            OperandKind::String,
            Some(OperandValue::String(value)),
            LEAF_RANK,
            text,
        )
    }

    /// Numeric view of a number or boolean value.
    pub fn as_number(&self) -> Option<f64> {
        match self.value {
            Some(OperandValue::Number(n)) => Some(n),
            Some(OperandValue::Boolean(b)) => Some(if b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn references(&self) -> Option<&[Ref3D]> {
        match &self.value {
            Some(OperandValue::References(refs)) => Some(refs),
            _ => None,
        }
    }

    /// `text`, parenthesized when this operand binds looser than `rank`.
    pub(crate) fn text_within(&self, rank: u8) -> String {
        if self.rank < rank {
            format!("({})", self.text)
        } else {
            self.text.clone()
        }
    }
}
