use thiserror::Error;

/// Registration-time failures. A registry that produced one of these is left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Duplicate formula id '{id}'")]
    DuplicateFormulaId { id: String },
    #[error("Formula '{formula}' depends on unknown formula '{dependency}'")]
    UnknownDependency { formula: String, dependency: String },
    #[error("Formula '{formula}' uses unregistered function '{function}'")]
    UnknownFunction { formula: String, function: String },
    #[error("Formula '{formula}' reads formula '{operand}' without declaring it as a dependency")]
    UndeclaredDependency { formula: String, operand: String },
    #[error("Cycle detected: {}", .chain.join(" -> "))]
    CycleDetected { chain: Vec<String> },
    #[error("Invalid formula definitions: {0}")]
    Parse(String),
}
