//! Provenance-tagged inputs handed to the core by parsers and user edits.

use super::error::SourceError;
use super::reference::{SourceReference, ValueWithSource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Named raw inputs for an evaluation run. `None` means "known to be missing".
pub type RawInputs = BTreeMap<String, Option<f64>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemWithSource {
    pub id: String,
    pub label: String,
    pub amount: f64,
    pub source: SourceReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub flagged_for_review: bool,
}

impl LineItemWithSource {
    pub fn new(label: impl Into<String>, amount: f64, source: SourceReference) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            label: label.into(),
            amount,
            source,
            category: None,
            notes: None,
            flagged_for_review: false,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn flagged(mut self) -> Self {
        self.flagged_for_review = true;
        self
    }
}

/// Descriptive facts about the property. Anything outside the well-known fields
/// goes into `extensions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub square_footage: Option<ValueWithSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_count: Option<ValueWithSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_built: Option<u32>,
    #[serde(default)]
    pub extensions: BTreeMap<String, ValueWithSource>,
}

/// Market and financing assumptions. Rates are percentages (5.5 means 5.5%).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationInputs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap_rate: Option<ValueWithSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vacancy_rate: Option<ValueWithSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_amount: Option<ValueWithSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<ValueWithSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amortization_years: Option<ValueWithSource>,
    #[serde(default)]
    pub extensions: BTreeMap<String, ValueWithSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialModel {
    pub id: String,
    #[serde(default)]
    pub property: PropertyInfo,
    #[serde(default)]
    pub revenue: Vec<LineItemWithSource>,
    #[serde(default)]
    pub expenses: Vec<LineItemWithSource>,
    #[serde(default)]
    pub adjustments: Vec<LineItemWithSource>,
    #[serde(default)]
    pub valuation: ValuationInputs,
}

impl FinancialModel {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            property: PropertyInfo::default(),
            revenue: Vec::new(),
            expenses: Vec::new(),
            adjustments: Vec::new(),
            valuation: ValuationInputs::default(),
        }
    }

    /// Derives the evaluator's raw inputs. An empty section or a non-finite amount
    /// yields `None` for the corresponding total.
    pub fn raw_inputs(&self) -> RawInputs {
        let mut inputs = RawInputs::new();
        inputs.insert("totalRevenue".into(), section_total(&self.revenue));
        inputs.insert("totalExpenses".into(), section_total(&self.expenses));
        inputs.insert("totalAdjustments".into(), section_total(&self.adjustments));

        for (name, field) in self.well_known_fields() {
            inputs.insert(name.to_string(), field.map(|v| v.value));
        }
        for (name, v) in self.extensions() {
            inputs.entry(name.clone()).or_insert(Some(v.value));
        }
        inputs
    }

    /// Provenance for each raw input that has a single originating record.
    /// Section totals are attributed to their items, not to a single source, and are omitted.
    pub fn input_sources(&self) -> BTreeMap<String, SourceReference> {
        let mut sources = BTreeMap::new();
        for (name, field) in self.well_known_fields() {
            if let Some(v) = field {
                sources.insert(name.to_string(), v.source.clone());
            }
        }
        for (name, v) in self.extensions() {
            sources.entry(name.clone()).or_insert_with(|| v.source.clone());
        }
        sources
    }

    /// Validates every provenance record carried by the model.
    pub fn validate_sources(&self) -> Result<(), SourceError> {
        let items = self.revenue.iter().chain(&self.expenses).chain(&self.adjustments);
        for item in items {
            item.source.validate()?;
        }
        for (_, field) in self.well_known_fields() {
            if let Some(v) = field {
                v.source.validate()?;
            }
        }
        for (_, v) in self.extensions() {
            v.source.validate()?;
        }
        Ok(())
    }

    fn well_known_fields(&self) -> [(&'static str, Option<&ValueWithSource>); 7] {
        [
            ("squareFootage", self.property.square_footage.as_ref()),
            ("unitCount", self.property.unit_count.as_ref()),
            ("capRate", self.valuation.cap_rate.as_ref()),
            ("vacancyRate", self.valuation.vacancy_rate.as_ref()),
            ("loanAmount", self.valuation.loan_amount.as_ref()),
            ("interestRate", self.valuation.interest_rate.as_ref()),
            ("amortizationYears", self.valuation.amortization_years.as_ref()),
        ]
    }

    // Valuation extensions take precedence over property extensions.
    fn extensions(&self) -> impl Iterator<Item = (&String, &ValueWithSource)> {
        self.valuation.extensions.iter().chain(self.property.extensions.iter())
    }
}

fn section_total(items: &[LineItemWithSource]) -> Option<f64> {
    if items.is_empty() {
        return None;
    }
    let total: f64 = items.iter().map(|i| i.amount).sum();
    total.is_finite().then_some(total)
}
