//! Projections of a provenance-tagged model into external row and stream shapes.
pub mod error;
pub mod flat;
pub mod streams;

pub use error::ConversionError;
pub use flat::{to_flat_record, FlatRecord};
pub use streams::{
    to_grouped_streams, to_grouped_streams_with, to_vacancy_adjusted_stream,
    to_vacancy_adjusted_stream_with, Stream, StreamRow, StreamType,
};
