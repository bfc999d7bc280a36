use serde::{Deserialize, Serialize};
use std::fmt;

/// The payload of one `${valueKey, tooltip:sourceType-refType:refValue}` token.
///
/// Fields hold the text as written; whether `source_type` and `ref_type` belong to
/// the known vocabularies is a `validate` concern, not a parsing one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotationRef {
    pub value_key: String,
    pub source_type: String,
    pub ref_type: String,
    pub ref_value: String,
}

impl NotationRef {
    pub fn new(value_key: &str, source_type: &str, ref_type: &str, ref_value: &str) -> Self {
        Self {
            value_key: value_key.into(),
            source_type: source_type.into(),
            ref_type: ref_type.into(),
            ref_value: ref_value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Text,
    Reference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSegment {
    #[serde(rename = "type")]
    pub kind: SegmentKind,
    /// Exact source text covered by the segment (the raw token for references).
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<NotationRef>,
}

impl ParsedSegment {
    pub(crate) fn text(content: &str) -> Self {
        Self { kind: SegmentKind::Text, content: content.into(), reference: None }
    }

    pub(crate) fn reference(content: &str, reference: NotationRef) -> Self {
        Self { kind: SegmentKind::Reference, content: content.into(), reference: Some(reference) }
    }
}

/// Source vocabulary accepted inside notation tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotationSourceType {
    UserInput,
    Calculated,
    SourceDocument,
    Assumption,
}

impl NotationSourceType {
    pub const ALL: [NotationSourceType; 4] = [
        NotationSourceType::UserInput,
        NotationSourceType::Calculated,
        NotationSourceType::SourceDocument,
        NotationSourceType::Assumption,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotationSourceType::UserInput => "userInput",
            NotationSourceType::Calculated => "calculated",
            NotationSourceType::SourceDocument => "sourceDocument",
            NotationSourceType::Assumption => "assumption",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for NotationSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefType {
    Index,
    Key,
    Id,
}

impl RefType {
    pub const ALL: [RefType; 3] = [RefType::Index, RefType::Key, RefType::Id];

    pub fn as_str(&self) -> &'static str {
        match self {
            RefType::Index => "index",
            RefType::Key => "key",
            RefType::Id => "id",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for RefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotationValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}
