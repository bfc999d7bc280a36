//! Flat per-section record keyed by line-item label.

use crate::source::{FinancialModel, LineItemWithSource, SourceReference};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatRecord {
    pub revenue: BTreeMap<String, f64>,
    pub expenses: BTreeMap<String, f64>,
    pub adjustments: BTreeMap<String, f64>,
    /// Keyed by `"{section}:{label}"`, e.g. `"revenue:Base Rent"`.
    pub provenance: BTreeMap<String, SourceReference>,
}

/// Projects a model onto label-keyed maps. A label appearing more than once within a
/// section keeps the amount and provenance of its last occurrence.
pub fn to_flat_record(model: &FinancialModel) -> FlatRecord {
    let mut record = FlatRecord::default();
    flatten("revenue", &model.revenue, &mut record.revenue, &mut record.provenance);
    flatten("expenses", &model.expenses, &mut record.expenses, &mut record.provenance);
    flatten("adjustments", &model.adjustments, &mut record.adjustments, &mut record.provenance);
    record
}

fn flatten(
    section: &str,
    items: &[LineItemWithSource],
    values: &mut BTreeMap<String, f64>,
    provenance: &mut BTreeMap<String, SourceReference>,
) {
    for item in items {
        if values.insert(item.label.clone(), item.amount).is_some() {
            debug!(section, label = %item.label, "Duplicate label overwritten");
        }
        provenance.insert(format!("{}:{}", section, item.label), item.source.clone());
    }
}
