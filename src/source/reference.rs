//! Provenance records attached to every value the engine touches.
//!
//! A `SourceReference` is created exactly once, at the moment a value is produced
//! (a user edit, a parser, or a formula evaluation), and is never mutated after it
//! has been attached to a value.

use super::error::SourceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    UserInput,
    ParsedDocument,
    Calculated,
    Default,
    Assumption,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::UserInput => "user_input",
            SourceType::ParsedDocument => "parsed_document",
            SourceType::Calculated => "calculated",
            SourceType::Default => "default",
            SourceType::Assumption => "assumption",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Locator into the producing collection. At least one field must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ReferenceKey {
    pub fn index(index: usize) -> Self {
        Self { index: Some(index), ..Default::default() }
    }

    pub fn key(key: impl Into<String>) -> Self {
        Self { key: Some(key.into()), ..Default::default() }
    }

    pub fn id(id: impl Into<String>) -> Self {
        Self { id: Some(id.into()), ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_none() && self.key.is_none() && self.id.is_none()
    }
}

/// Position of a parsed value inside its originating document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentLocation {
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<u32>,
}

impl fmt::Display for DocumentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_name)?;
        if let Some(page) = self.page {
            write!(f, " p.{}", page)?;
        }
        if let Some(sheet) = &self.sheet {
            write!(f, " [{}]", sheet)?;
        }
        if let Some(cell) = &self.cell {
            write!(f, "!{}", cell)?;
        }
        if let Some(row) = self.row {
            write!(f, " row {}", row)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReference {
    pub source_type: SourceType,
    pub reference: ReferenceKey,
    pub display_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_location: Option<DocumentLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsing_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl SourceReference {
    fn stamped(source_type: SourceType, reference: ReferenceKey, display_path: String) -> Self {
        Self {
            source_type,
            reference,
            display_path,
            confidence: None,
            timestamp: Utc::now(),
            document_location: None,
            parsing_session_id: None,
            user_id: None,
        }
    }

    /// Provenance for a formula output, keyed by the formula id.
    pub fn calculated(formula_id: &str) -> Self {
        Self::stamped(
            SourceType::Calculated,
            ReferenceKey::key(formula_id),
            format!("Calculated > {}", formula_id),
        )
    }

    pub fn user_input(field: &str, user_id: Option<String>) -> Self {
        let mut source = Self::stamped(
            SourceType::UserInput,
            ReferenceKey::key(field),
            format!("User Input > {}", field),
        );
        source.user_id = user_id;
        source
    }

    /// Provenance for a value read by a document parser. `index` is the position of the
    /// extracted item within the parser output.
    pub fn parsed_document(index: usize, location: DocumentLocation, session_id: Option<String>) -> Self {
        let display_path = format!("Document > {}", location);
        let mut source = Self::stamped(SourceType::ParsedDocument, ReferenceKey::index(index), display_path);
        source.document_location = Some(location);
        source.parsing_session_id = session_id;
        source
    }

    pub fn default_value(field: &str) -> Self {
        Self::stamped(
            SourceType::Default,
            ReferenceKey::key(field),
            format!("Default > {}", field),
        )
    }

    pub fn assumption(field: &str, rationale: &str) -> Self {
        Self::stamped(
            SourceType::Assumption,
            ReferenceKey::key(field),
            format!("Assumption > {}: {}", field, rationale),
        )
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.reference.id = Some(id.into());
        self
    }

    /// Checks the structural invariants of the record.
    pub fn validate(&self) -> Result<(), SourceError> {
        if self.reference.is_empty() {
            return Err(SourceError::EmptyReference { display_path: self.display_path.clone() });
        }
        if self.source_type == SourceType::ParsedDocument && self.document_location.is_none() {
            return Err(SourceError::MissingDocumentLocation { display_path: self.display_path.clone() });
        }
        if let Some(c) = self.confidence {
            if !c.is_finite() || !(0.0..=1.0).contains(&c) {
                return Err(SourceError::ConfidenceOutOfRange { confidence: c });
            }
        }
        Ok(())
    }
}

/// A number paired with the provenance of the number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueWithSource {
    pub value: f64,
    pub source: SourceReference,
}

impl ValueWithSource {
    pub fn new(value: f64, source: SourceReference) -> Self {
        Self { value, source }
    }
}
