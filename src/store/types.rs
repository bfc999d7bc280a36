use crate::compute::kernel::{self, FormulaInputs};
use crate::compute::ledger::{Severity, ValidationResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named escape-hatch computation for math the `Operation` variants cannot express.
/// Must honour the null-propagation contract: return `None` rather than a non-finite number.
pub type CustomFn = fn(&FormulaInputs) -> Option<f64>;

/// Lookup table for `Operation::Custom`.
pub type FunctionTable = HashMap<String, CustomFn>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Currency,
    Percentage,
    Number,
    Ratio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperandKind {
    /// Output of another registered formula.
    Formula,
    /// Raw input supplied by the caller.
    Input,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperandRef {
    pub name: String,
    pub label: String,
    pub kind: OperandKind,
}

impl OperandRef {
    pub fn formula(name: &str, label: &str) -> Self {
        Self { name: name.into(), label: label.into(), kind: OperandKind::Formula }
    }

    pub fn input(name: &str, label: &str) -> Self {
        Self { name: name.into(), label: label.into(), kind: OperandKind::Input }
    }
}

/// The calculation performed by a formula. Operands are referenced by name and
/// resolved against the formula's gathered inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Add { lhs: String, rhs: String },
    Subtract { lhs: String, rhs: String },
    Multiply { lhs: String, rhs: String },
    #[serde(rename_all = "camelCase")]
    Divide {
        numerator: String,
        denominator: String,
        /// Treat a non-positive denominator as "cannot be computed" (cap rates, areas).
        #[serde(default)]
        require_positive: bool,
    },
    Sum { terms: Vec<String> },
    Custom { function: String },
}

impl Operation {
    /// Names this operation reads from its inputs. Custom functions read the
    /// formula's declared operands instead.
    pub fn operand_names(&self) -> Vec<&str> {
        match self {
            Operation::Add { lhs, rhs }
            | Operation::Subtract { lhs, rhs }
            | Operation::Multiply { lhs, rhs } => vec![lhs.as_str(), rhs.as_str()],
            Operation::Divide { numerator, denominator, .. } => vec![numerator.as_str(), denominator.as_str()],
            Operation::Sum { terms } => terms.iter().map(String::as_str).collect(),
            Operation::Custom { .. } => Vec::new(),
        }
    }

    pub fn symbol(&self) -> Option<&'static str> {
        match self {
            Operation::Add { .. } | Operation::Sum { .. } => Some("+"),
            Operation::Subtract { .. } => Some("-"),
            Operation::Multiply { .. } => Some("*"),
            Operation::Divide { .. } => Some("/"),
            Operation::Custom { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ValidationRule {
    /// Negative results are structurally invalid.
    NonNegative { message: String },
    Max { limit: f64, severity: Severity, message: String },
    Min { limit: f64, severity: Severity, message: String },
}

impl ValidationRule {
    fn check(&self, value: f64) -> Option<(Severity, &str)> {
        match self {
            ValidationRule::NonNegative { message } if value < 0.0 => Some((Severity::Error, message)),
            ValidationRule::Max { limit, severity, message } if value > *limit => Some((*severity, message)),
            ValidationRule::Min { limit, severity, message } if value < *limit => Some((*severity, message)),
            _ => None,
        }
    }
}

/// A statically registered, serializable formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaDefinition {
    pub id: String,
    pub name: String,
    pub human_readable: String,
    pub expression: String,
    #[serde(default)]
    pub operands: Vec<OperandRef>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub operation: Operation,
    /// Multiplier applied to the interpreted result (100 for percentages, 0.01 for rates).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    pub output_format: OutputFormat,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation: Vec<ValidationRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FormulaDefinition {
    /// Every name the formula reads: operation operands, then declared operands
    /// that the operation does not already mention.
    pub fn input_names(&self) -> Vec<&str> {
        let mut names = self.operation.operand_names();
        for op in &self.operands {
            if !names.contains(&op.name.as_str()) {
                names.push(op.name.as_str());
            }
        }
        names
    }

    pub fn operand_label<'a>(&'a self, name: &'a str) -> &'a str {
        self.operands
            .iter()
            .find(|o| o.name == name)
            .map_or(name, |o| o.label.as_str())
    }

    /// Runs the formula over `inputs`. Returns `None` whenever the result cannot be
    /// computed; never a non-finite number.
    pub fn compute(&self, inputs: &FormulaInputs, functions: &FunctionTable) -> Option<f64> {
        let raw = match &self.operation {
            Operation::Custom { function } => {
                let f = functions.get(function)?;
                f(inputs)
            }
            op => kernel::apply(op, inputs),
        }?;
        let scaled = match self.scale {
            Some(s) => raw * s,
            None => raw,
        };
        scaled.is_finite().then_some(scaled)
    }

    /// Applies the declarative rules to a computed value. The most severe triggered
    /// rule wins; ties go to the earlier rule.
    pub fn validate(&self, value: Option<f64>) -> ValidationResult {
        let Some(v) = value else {
            return ValidationResult::ok();
        };
        let mut worst: Option<(Severity, &str)> = None;
        for rule in &self.validation {
            if let Some(hit) = rule.check(v) {
                if worst.map_or(true, |(s, _)| hit.0 > s) {
                    worst = Some(hit);
                }
            }
        }
        match worst {
            Some((severity, message)) => ValidationResult::flagged(severity, message),
            None => ValidationResult::ok(),
        }
    }
}
