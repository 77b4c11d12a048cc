use formula_rpn::ReferenceStyle;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ALARM_DEPTH: usize = 5;
pub const DEFAULT_PANIC_DEPTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceLevel {
    #[default]
    Off,
    /// Log every token and the stack after it at `debug`/`trace` level.
    Verbose,
}

/// Knobs for NAME formula evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalOptions {
    pub trace: TraceLevel,
    /// Display style for reconstructed references. Relative components without a base cell are
    /// always shown in R1C1 form.
    pub reference_style: ReferenceStyle,
    /// Separator between function arguments in reconstructed text.
    pub list_separator: char,
    /// Recursion depth above which tracing switches on.
    pub alarm_depth: usize,
    /// Recursion depth above which evaluation fails with `ExcessiveDepth`.
    pub panic_depth: usize,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            trace: TraceLevel::Off,
            reference_style: ReferenceStyle::A1,
            list_separator: ',',
            alarm_depth: DEFAULT_ALARM_DEPTH,
            panic_depth: DEFAULT_PANIC_DEPTH,
        }
    }
}

impl EvalOptions {
    pub fn verbose() -> Self {
        Self {
            trace: TraceLevel::Verbose,
            ..Self::default()
        }
    }

    pub(crate) fn tracing_at(&self, depth: usize) -> bool {
        self.trace == TraceLevel::Verbose || depth > self.alarm_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_fields_take_defaults() {
        let opts: EvalOptions = serde_json::from_str(r#"{"list_separator":";"}"#).unwrap();
        assert_eq!(
            opts,
            EvalOptions {
                list_separator: ';',
                ..EvalOptions::default()
            }
        );
    }

    #[test]
    fn enums_use_snake_case() {
        let opts: EvalOptions =
            serde_json::from_str(r#"{"trace":"verbose","reference_style":"r1c1"}"#).unwrap();
        assert_eq!(opts.trace, TraceLevel::Verbose);
        assert_eq!(opts.reference_style, ReferenceStyle::R1C1);
    }

    #[test]
    fn alarm_depth_turns_on_tracing() {
        let opts = EvalOptions::default();
        assert!(!opts.tracing_at(DEFAULT_ALARM_DEPTH));
        assert!(opts.tracing_at(DEFAULT_ALARM_DEPTH + 1));
        assert!(EvalOptions::verbose().tracing_at(0));
    }
}
