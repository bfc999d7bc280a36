//! Evaluates the registered formula graph and records the audit trail.
pub mod engine;
pub mod kernel;
pub mod ledger;

pub use engine::Evaluator;
pub use kernel::FormulaInputs;
pub use ledger::{
    CalculationAuditTrail, CalculationResult, CalculationStep, FormulaDisplay, OperandValue, Severity,
    ValidationResult,
};
