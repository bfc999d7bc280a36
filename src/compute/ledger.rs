//! ledger.rs
//! Result records produced by one evaluation run.

use crate::source::SourceReference;
use crate::store::OutputFormat;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Ordered so that `Info < Warning < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub severity: Severity,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self { is_valid: true, message: None, severity: Severity::Info }
    }

    /// Only `Error` marks the result invalid; warnings are business-rule concerns.
    pub fn flagged(severity: Severity, message: &str) -> Self {
        Self {
            is_valid: severity != Severity::Error,
            message: Some(message.to_string()),
            severity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperandValue {
    pub name: String,
    pub label: String,
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaDisplay {
    pub display_formula: String,
    pub expression: String,
    pub operands: Vec<OperandValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationStep {
    pub description: String,
    pub expression: String,
    pub result: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    pub formula_id: String,
    pub name: String,
    pub value: Option<f64>,
    pub formula: FormulaDisplay,
    #[serde(default)]
    pub steps: Vec<CalculationStep>,
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub source: SourceReference,
    pub output_format: OutputFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub footnotes: Vec<String>,
}

/// Everything one evaluation run produced, in execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "TrailRecord")]
pub struct CalculationAuditTrail {
    pub model_id: String,
    pub timestamp: DateTime<Utc>,
    pub calculations: Vec<CalculationResult>,
    pub results: BTreeMap<String, Option<f64>>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
    // formula id -> position in `calculations`
    #[serde(skip)]
    index: HashMap<String, usize>,
}

// Wire shape of a trail; the lookup index is rebuilt on load.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrailRecord {
    model_id: String,
    timestamp: DateTime<Utc>,
    calculations: Vec<CalculationResult>,
    results: BTreeMap<String, Option<f64>>,
    #[serde(default)]
    warnings: Vec<String>,
    #[serde(default)]
    processing_time_ms: Option<u64>,
}

impl From<TrailRecord> for CalculationAuditTrail {
    fn from(record: TrailRecord) -> Self {
        let index = record
            .calculations
            .iter()
            .enumerate()
            .map(|(i, c)| (c.formula_id.clone(), i))
            .collect();
        Self {
            model_id: record.model_id,
            timestamp: record.timestamp,
            calculations: record.calculations,
            results: record.results,
            warnings: record.warnings,
            processing_time_ms: record.processing_time_ms,
            index,
        }
    }
}

impl CalculationAuditTrail {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            timestamp: Utc::now(),
            calculations: Vec::new(),
            results: BTreeMap::new(),
            warnings: Vec::new(),
            processing_time_ms: None,
            index: HashMap::new(),
        }
    }

    pub(crate) fn push(&mut self, result: CalculationResult) {
        self.results.insert(result.formula_id.clone(), result.value);
        if let Some(e) = &result.error {
            self.warnings.push(format!("{}: {}", result.name, e));
        }
        if let Some(w) = &result.warning {
            self.warnings.push(format!("{}: {}", result.name, w));
        }
        self.index.insert(result.formula_id.clone(), self.calculations.len());
        self.calculations.push(result);
    }

    /// The computed value for `id`, or `None` if it was null or never evaluated.
    pub fn value(&self, id: &str) -> Option<f64> {
        self.results.get(id).copied().flatten()
    }

    pub fn result(&self, id: &str) -> Option<&CalculationResult> {
        self.position(id).map(|i| &self.calculations[i])
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Results flagged with an error-severity validation.
    pub fn errors(&self) -> impl Iterator<Item = &CalculationResult> {
        self.calculations.iter().filter(|c| c.error.is_some())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, value: Option<f64>, warning: Option<&str>) -> CalculationResult {
        CalculationResult {
            formula_id: id.into(),
            name: id.to_uppercase(),
            value,
            formula: FormulaDisplay {
                display_formula: String::new(),
                expression: String::new(),
                operands: Vec::new(),
                operator: None,
            },
            steps: Vec::new(),
            is_valid: warning.is_none(),
            error: None,
            warning: warning.map(str::to_string),
            source: SourceReference::calculated(id),
            output_format: OutputFormat::Number,
            currency: None,
            precision: None,
            footnotes: Vec::new(),
        }
    }

    fn trail() -> CalculationAuditTrail {
        let mut trail = CalculationAuditTrail::new("m-1");
        trail.push(result("a", Some(1.0), None));
        trail.push(result("b", None, Some("missing a")));
        trail.push(result("c", Some(3.0), None));
        trail
    }

    #[test]
    fn test_lookup_by_id() {
        let trail = trail();
        assert_eq!(trail.position("c"), Some(2));
        assert_eq!(trail.result("b").unwrap().name, "B");
        assert_eq!(trail.result("zzz"), None);
        assert_eq!(trail.value("a"), Some(1.0));
        assert_eq!(trail.value("b"), None);
        assert_eq!(trail.warnings, vec!["B: missing a".to_string()]);
    }

    #[test]
    fn test_lookup_survives_json_round_trip() {
        let trail = trail();
        let json = trail.to_json().unwrap();

        let back: CalculationAuditTrail = serde_json::from_str(&json).unwrap();
        assert_eq!(back.position("b"), Some(1));
        assert_eq!(back.result("c").unwrap().value, Some(3.0));
        assert_eq!(back, trail);
    }
}
