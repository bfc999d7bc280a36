//! Human-readable rendering of values and audit trails.
pub mod format;
pub mod trace;

pub use format::format_value;
pub use trace::format_trace;
