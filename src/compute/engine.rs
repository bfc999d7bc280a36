//! A synchronous, single-threaded evaluator over a registered formula set.
use crate::compute::kernel::FormulaInputs;
use crate::compute::ledger::{
    CalculationAuditTrail, CalculationResult, CalculationStep, FormulaDisplay, OperandValue, Severity,
};
use crate::config::EngineConfig;
use crate::display::format::format_value;
use crate::source::{RawInputs, SourceReference};
use crate::store::{FormulaDefinition, OperandKind, OutputFormat, Registry};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct Evaluator<'a> {
    registry: &'a Registry,
    config: EngineConfig,
    model_id: String,
    input_sources: BTreeMap<String, SourceReference>,
}

impl<'a> Evaluator<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            config: EngineConfig::default(),
            model_id: Uuid::new_v4().to_string(),
            input_sources: BTreeMap::new(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    /// Provenance for raw inputs, attached to the operands that read them.
    pub fn with_input_sources(mut self, sources: BTreeMap<String, SourceReference>) -> Self {
        self.input_sources = sources;
        self
    }

    /// Computes every registered formula in dependency order.
    ///
    /// Never fails: formulas that cannot be computed are recorded as `None` with a
    /// warning, and validation errors are flagged on the result without stopping the run.
    pub fn evaluate(&self, raw_inputs: &RawInputs) -> CalculationAuditTrail {
        let started = Instant::now();
        let mut trail = CalculationAuditTrail::new(self.model_id.clone());
        debug!(model_id = %self.model_id, formulas = self.registry.count(), "Evaluation started");

        for def in self.registry.execution_order() {
            let result = self.evaluate_formula(def, raw_inputs, &trail);
            trail.push(result);
        }

        trail.processing_time_ms = Some(started.elapsed().as_millis() as u64);
        info!(
            model_id = %self.model_id,
            computed = trail.results.values().filter(|v| v.is_some()).count(),
            warnings = trail.warnings.len(),
            "Evaluation finished"
        );
        trail
    }

    /// Evaluates independent scenarios in parallel. Output order matches input order.
    pub fn evaluate_scenarios(&self, scenarios: &[RawInputs]) -> Vec<CalculationAuditTrail> {
        scenarios.par_iter().map(|inputs| self.evaluate(inputs)).collect()
    }

    /// Gathers the inputs one formula needs: matching raw inputs by name, overlaid by
    /// the already-computed results of its declared dependencies.
    fn gather_inputs(
        &self,
        def: &FormulaDefinition,
        raw_inputs: &RawInputs,
        computed: &BTreeMap<String, Option<f64>>,
    ) -> FormulaInputs {
        let mut inputs = FormulaInputs::new();
        for name in def.input_names() {
            if let Some(&v) = raw_inputs.get(name) {
                inputs.insert(name, v);
            }
        }
        for dep in &def.dependencies {
            // Topological order guarantees presence; a missing entry still reads as null.
            inputs.insert(dep.as_str(), computed.get(dep).copied().flatten());
        }
        inputs
    }

    fn evaluate_formula(
        &self,
        def: &FormulaDefinition,
        raw_inputs: &RawInputs,
        trail: &CalculationAuditTrail,
    ) -> CalculationResult {
        let inputs = self.gather_inputs(def, raw_inputs, &trail.results);
        let value = def.compute(&inputs, self.registry.functions());
        let operands = self.operand_values(def, &inputs, trail);

        let mut warning = None;
        let mut error = None;
        let mut is_valid = true;
        let mut footnotes: Vec<String> = def.description.iter().cloned().collect();

        if value.is_none() {
            let missing: Vec<&str> = operands
                .iter()
                .filter(|o| o.value.is_none())
                .map(|o| o.label.as_str())
                .collect();
            let msg = if missing.is_empty() {
                "Result is undefined for the given inputs".to_string()
            } else {
                format!("Cannot be computed; missing or invalid: {}", missing.join(", "))
            };
            debug!(formula = %def.id, "{}", msg);
            warning = Some(msg);
            is_valid = false;
        }

        let validation = def.validate(value);
        if let Some(message) = validation.message {
            match validation.severity {
                Severity::Error => {
                    warn!(formula = %def.id, value = ?value, "{}", message);
                    error = Some(message);
                    is_valid = false;
                }
                Severity::Warning => {
                    debug!(formula = %def.id, value = ?value, "{}", message);
                    warning = Some(match warning {
                        Some(prev) => format!("{}; {}", prev, message),
                        None => message,
                    });
                }
                Severity::Info => {
                    debug!(formula = %def.id, value = ?value, "{}", message);
                    footnotes.push(message);
                }
            }
        }

        let steps = self.build_steps(def, &operands, value);

        CalculationResult {
            formula_id: def.id.clone(),
            name: def.name.clone(),
            value,
            formula: FormulaDisplay {
                display_formula: format!("{} = {}", def.name, def.human_readable),
                expression: def.expression.clone(),
                operands,
                operator: def.operation.symbol().map(str::to_string),
            },
            steps,
            is_valid,
            error,
            warning,
            source: SourceReference::calculated(&def.id),
            output_format: def.output_format,
            currency: (def.output_format == OutputFormat::Currency).then(|| self.config.currency.clone()),
            precision: Some(self.config.precision),
            footnotes,
        }
    }

    /// Dependency operands carry the provenance stamped when the dependency was
    /// computed; raw operands carry whatever the caller supplied.
    fn operand_values(
        &self,
        def: &FormulaDefinition,
        inputs: &FormulaInputs,
        trail: &CalculationAuditTrail,
    ) -> Vec<OperandValue> {
        def.input_names()
            .into_iter()
            .map(|name| {
                let is_formula = def.dependencies.iter().any(|d| d == name)
                    || def.operands.iter().any(|o| o.name == name && o.kind == OperandKind::Formula);
                let source = if is_formula {
                    trail.result(name).map(|r| r.source.clone())
                } else {
                    self.input_sources.get(name).cloned()
                };
                OperandValue {
                    name: name.to_string(),
                    label: def.operand_label(name).to_string(),
                    value: inputs.get(name),
                    source,
                }
            })
            .collect()
    }

    fn build_steps(&self, def: &FormulaDefinition, operands: &[OperandValue], value: Option<f64>) -> Vec<CalculationStep> {
        let mut steps = Vec::with_capacity(3);
        let substituted = match def.operation.symbol() {
            Some(sym) => operands
                .iter()
                .take(def.operation.operand_names().len())
                .map(|o| self.fmt_operand(o))
                .collect::<Vec<_>>()
                .join(&format!(" {} ", sym)),
            None => operands
                .iter()
                .map(|o| format!("{}={}", o.name, self.fmt_operand(o)))
                .collect::<Vec<_>>()
                .join(", "),
        };
        steps.push(CalculationStep {
            description: "Substitute inputs".into(),
            expression: format!("{} = {}", def.expression, substituted),
            result: None,
        });
        if let Some(scale) = def.scale {
            steps.push(CalculationStep {
                description: "Apply scale".into(),
                expression: format!("x {}", scale),
                result: None,
            });
        }
        steps.push(CalculationStep {
            description: "Result".into(),
            expression: format_value(value, def.output_format, &self.config.currency, self.config.precision),
            result: value,
        });
        steps
    }

    fn fmt_operand(&self, o: &OperandValue) -> String {
        match o.value {
            Some(v) => format!("{}", v),
            None => "null".into(),
        }
    }
}
