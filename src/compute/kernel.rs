use crate::store::Operation;
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// The named values a single formula sees when it is computed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormulaInputs {
    values: BTreeMap<String, Option<f64>>,
}

impl FormulaInputs {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, name: impl Into<String>, value: Option<f64>) {
        self.values.insert(name.into(), value);
    }

    /// A usable operand: present, non-null and finite.
    #[inline]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied().flatten().filter(|v| v.is_finite())
    }
}

impl<S: Into<String>> FromIterator<(S, Option<f64>)> for FormulaInputs {
    fn from_iter<I: IntoIterator<Item = (S, Option<f64>)>>(iter: I) -> Self {
        Self { values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect() }
    }
}

/// Interprets the built-in operations. Any unusable operand yields `None`.
pub fn apply(op: &Operation, inputs: &FormulaInputs) -> Option<f64> {
    let result = match op {
        Operation::Add { lhs, rhs } => inputs.get(lhs)? + inputs.get(rhs)?,
        Operation::Subtract { lhs, rhs } => inputs.get(lhs)? - inputs.get(rhs)?,
        Operation::Multiply { lhs, rhs } => inputs.get(lhs)? * inputs.get(rhs)?,
        Operation::Divide { numerator, denominator, require_positive } => {
            let n = inputs.get(numerator)?;
            let d = inputs.get(denominator)?;
            if d == 0.0 || (*require_positive && d < 0.0) {
                return None;
            }
            n / d
        }
        Operation::Sum { terms } => {
            let values: SmallVec<[f64; 8]> = terms
                .iter()
                .map(|t| inputs.get(t))
                .collect::<Option<_>>()?;
            values.iter().sum()
        }
        // Resolved by the registry's function table.
        Operation::Custom { .. } => return None,
    };
    result.is_finite().then_some(result)
}
