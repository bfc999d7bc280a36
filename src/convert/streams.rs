//! Category-grouped revenue streams for the income module integration.

use super::error::ConversionError;
use crate::config::EngineConfig;
use crate::source::{LineItemWithSource, SourceReference};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamType {
    Residential,
    Commercial,
    Miscellaneous,
}

impl StreamType {
    /// Case-insensitive keyword match on a category name.
    pub fn infer(category: &str) -> Self {
        let name = category.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| name.contains(w));
        if has(&["residential", "apartment"]) {
            StreamType::Residential
        } else if has(&["commercial", "office", "retail"]) {
            StreamType::Commercial
        } else {
            StreamType::Miscellaneous
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRow {
    pub id: String,
    pub label: String,
    pub monthly_rate: f64,
    pub annual_income: f64,
    pub source: SourceReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub flagged_for_review: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    pub id: String,
    pub name: String,
    pub stream_type: StreamType,
    pub rows: Vec<StreamRow>,
    pub gross_revenue: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vacancy_rate_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_revenue: Option<f64>,
}

/// Groups items by category using the default configuration.
pub fn to_grouped_streams(items: &[LineItemWithSource]) -> Vec<Stream> {
    to_grouped_streams_with(items, &EngineConfig::default())
}

/// Groups items by `category`, falling back to `config.default_category`. Streams
/// appear in the order their category is first seen; rows keep input order.
pub fn to_grouped_streams_with(items: &[LineItemWithSource], config: &EngineConfig) -> Vec<Stream> {
    let mut streams: Vec<Stream> = Vec::new();

    for item in items {
        let category = match item.category.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => c,
            _ => config.default_category.as_str(),
        };
        let row = StreamRow {
            id: Uuid::new_v4().to_string(),
            label: item.label.clone(),
            monthly_rate: item.amount / 12.0,
            annual_income: item.amount,
            source: item.source.clone(),
            notes: item.notes.clone(),
            flagged_for_review: item.flagged_for_review,
        };

        match streams.iter_mut().find(|s| s.name == category) {
            Some(stream) => stream.rows.push(row),
            None => streams.push(Stream {
                id: Uuid::new_v4().to_string(),
                name: category.to_string(),
                stream_type: StreamType::infer(category),
                rows: vec![row],
                gross_revenue: 0.0,
                vacancy_rate_percent: None,
                effective_revenue: None,
            }),
        }
    }

    for stream in &mut streams {
        stream.gross_revenue = stream.rows.iter().map(|r| r.annual_income).sum();
    }
    debug!(items = items.len(), streams = streams.len(), "Grouped line items into streams");
    streams
}

/// Applies vacancy, falling back to `config.default_vacancy_rate_percent`.
pub fn to_vacancy_adjusted_stream_with(
    stream: &Stream,
    vacancy_rate_percent: Option<f64>,
    config: &EngineConfig,
) -> Result<Stream, ConversionError> {
    to_vacancy_adjusted_stream(stream, vacancy_rate_percent, config.default_vacancy_rate_percent)
}

/// Returns a copy of `stream` with vacancy applied. `default_percent` is used when
/// `vacancy_rate_percent` is `None`; both must lie within `[0, 100]`.
pub fn to_vacancy_adjusted_stream(
    stream: &Stream,
    vacancy_rate_percent: Option<f64>,
    default_percent: f64,
) -> Result<Stream, ConversionError> {
    let rate = match vacancy_rate_percent {
        Some(rate) => rate,
        None => {
            warn!(stream = %stream.name, default_percent, "No vacancy rate supplied; using default");
            default_percent
        }
    };
    if !rate.is_finite() || !(0.0..=100.0).contains(&rate) {
        return Err(ConversionError::InvalidVacancyRate { rate });
    }

    let mut adjusted = stream.clone();
    adjusted.vacancy_rate_percent = Some(rate);
    adjusted.effective_revenue = Some(stream.gross_revenue * (1.0 - rate / 100.0));
    Ok(adjusted)
}
