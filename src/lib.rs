// Crate root: formula evaluation with a full audit trail, provenance-tagged
// inputs, the source notation used in narrative text, and converters to the
// external row/stream shapes.

pub mod analysis;
pub mod compute;
pub mod config;
pub mod convert;
pub mod display;
pub mod formulas;
pub mod notation;
pub mod source;
pub mod store;

pub use compute::{CalculationAuditTrail, CalculationResult, Evaluator, FormulaInputs, Severity, ValidationResult};
pub use config::{ConfigError, EngineConfig};
pub use convert::{ConversionError, FlatRecord, Stream, StreamRow, StreamType};
pub use formulas::standard_registry;
pub use source::{FinancialModel, LineItemWithSource, RawInputs, SourceReference, SourceType, ValueWithSource};
pub use store::{FormulaDefinition, Operation, Registry, RegistryError};
