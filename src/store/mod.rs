//! Formula definitions and the registry that orders them.
pub mod error;
pub mod registry;
pub mod types;

pub use error::RegistryError;
pub use registry::{definitions_from_json, Registry};
pub use types::{
    CustomFn, FormulaDefinition, FunctionTable, OperandKind, OperandRef, Operation, OutputFormat, ValidationRule,
};
