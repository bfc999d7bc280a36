//! Value types carrying provenance.
pub mod error;
pub mod model;
pub mod reference;

pub use error::SourceError;
pub use model::{FinancialModel, LineItemWithSource, PropertyInfo, RawInputs, ValuationInputs};
pub use reference::{DocumentLocation, ReferenceKey, SourceReference, SourceType, ValueWithSource};
