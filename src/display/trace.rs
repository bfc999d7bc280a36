use crate::analysis::topology;
use crate::compute::ledger::{CalculationAuditTrail, CalculationResult, OperandValue};
use crate::config::EngineConfig;
use crate::display::format::format_value;
use crate::store::{FormulaDefinition, Operation, OutputFormat, Registry};
use std::collections::HashMap;
use std::fmt::Write;

/// Renders the calculation tree behind one formula: its value, the formula with
/// substituted operand values, and recursively every dependency down to the raw
/// inputs and their provenance.
pub fn format_trace(
    registry: &Registry,
    trail: &CalculationAuditTrail,
    target: &str,
    config: &EngineConfig,
) -> String {
    let mut tracer = Tracer {
        registry,
        trail,
        config,
        visited_at_level: HashMap::new(),
        output: String::new(),
    };

    match (registry.index.get(target), registry.get(target)) {
        (Some(&slot), Some(def)) => {
            let upstream = topology::upstream_from(registry, &[slot]).len() - 1;
            let _ = writeln!(tracer.output, "AUDIT TRACE for '{}' (model {}):", def.name, trail.model_id);
            let _ = writeln!(tracer.output, "Upstream formulas: {}", upstream);
            let _ = writeln!(tracer.output, "--------------------------------------------------");
            tracer.trace_node(def, 1, "");
        }
        _ => {
            let _ = writeln!(tracer.output, "Error: Unknown formula '{}'", target);
        }
    }
    tracer.output
}

struct Tracer<'a> {
    registry: &'a Registry,
    trail: &'a CalculationAuditTrail,
    config: &'a EngineConfig,
    visited_at_level: HashMap<&'a str, usize>,
    output: String,
}

impl<'a> Tracer<'a> {
    fn trace_node(&mut self, def: &'a FormulaDefinition, level: usize, prefix: &str) {
        if let Some(&first_seen) = self.visited_at_level.get(def.id.as_str()) {
            let _ = writeln!(self.output, "{}-> {} (Ref to L{})", prefix, def.name, first_seen);
            return;
        }
        self.visited_at_level.insert(def.id.as_str(), level);

        let (registry, trail) = (self.registry, self.trail);
        let Some(result) = trail.result(&def.id) else {
            let _ = writeln!(self.output, "{}[L{}] {} [not evaluated]", prefix, level, def.name);
            return;
        };

        let value_str = self.fmt(result.value, def.output_format);
        let formula_str = self.format_formula(def, result);
        let _ = writeln!(self.output, "{}[L{}] {} [{}] = {}", prefix, level, def.name, value_str, formula_str);

        let stem = build_child_stem(prefix);
        if let Some(e) = &result.error {
            let _ = writeln!(self.output, "{}|  !! {}", stem, e);
        }
        if let Some(w) = &result.warning {
            let _ = writeln!(self.output, "{}|  ! {}", stem, w);
        }

        let operands = &result.formula.operands;
        for (i, operand) in operands.iter().enumerate() {
            let connector = if i == operands.len() - 1 { "`--" } else { "|--" };
            let full_prefix = format!("{}{}", stem, connector);
            match registry.get(&operand.name) {
                Some(child) if def.dependencies.contains(&operand.name) => {
                    self.trace_node(child, level + 1, &full_prefix)
                }
                _ => self.trace_input(operand, &full_prefix),
            }
        }
    }

    fn trace_input(&mut self, operand: &OperandValue, prefix: &str) {
        let value = match operand.value {
            Some(v) => format!("{:.3}", v),
            None => "null".to_string(),
        };
        let origin = match &operand.source {
            Some(s) => format!(" <{}: {}>", s.source_type, s.display_path),
            None => String::new(),
        };
        let _ = writeln!(self.output, "{}{} -> Input([{}]){}", prefix, operand.label, value, origin);
    }

    fn format_formula(&self, def: &FormulaDefinition, result: &CalculationResult) -> String {
        let refs: Vec<String> = result
            .formula
            .operands
            .iter()
            .map(|o| format!("{}[{}]", o.label, self.fmt_operand(o)))
            .collect();

        let body = match &def.operation {
            Operation::Custom { function } => format!("{}({})", function, refs.join(", ")),
            op => {
                let sym = op.symbol().unwrap_or("?");
                let arity = op.operand_names().len();
                refs[..arity.min(refs.len())].join(&format!(" {} ", sym))
            }
        };
        match def.scale {
            Some(s) => format!("({}) x {}", body, s),
            None => body,
        }
    }

    fn fmt_operand(&self, o: &OperandValue) -> String {
        let format = self
            .registry
            .get(&o.name)
            .map_or(OutputFormat::Number, |d| d.output_format);
        self.fmt(o.value, format)
    }

    fn fmt(&self, value: Option<f64>, format: OutputFormat) -> String {
        format_value(value, format, &self.config.currency, self.config.precision)
    }
}

fn build_child_stem(current_prefix: &str) -> String {
    current_prefix.replace("`--", "   ").replace("|--", "|  ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Evaluator;
    use crate::formulas::standard_registry;
    use crate::source::{RawInputs, SourceReference};
    use std::collections::BTreeMap;

    fn inputs() -> RawInputs {
        [
            ("totalRevenue", Some(100_000.0)),
            ("vacancyRate", Some(5.0)),
            ("totalExpenses", Some(15_000.0)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    #[test]
    fn test_trace_shows_tree_and_provenance() {
        let reg = standard_registry().unwrap();
        let mut sources = BTreeMap::new();
        sources.insert("totalRevenue".to_string(), SourceReference::user_input("totalRevenue", None));
        let trail = Evaluator::new(&reg).with_model_id("m-9").with_input_sources(sources).evaluate(&inputs());

        let out = format_trace(&reg, &trail, "netOperatingIncome", &EngineConfig::default());
        assert!(out.starts_with("AUDIT TRACE for 'Net Operating Income' (model m-9):"), "{}", out);
        assert!(out.contains("[L1] Net Operating Income [$80,000.00]"), "{}", out);
        assert!(out.contains("[L2] Effective Gross Income [$95,000.00]"), "{}", out);
        assert!(out.contains("-> Input([100000.000]) <user_input: User Input > totalRevenue>"), "{}", out);
    }

    #[test]
    fn test_shared_dependency_printed_once() {
        let reg = standard_registry().unwrap();
        let trail = Evaluator::new(&reg).evaluate(&inputs());
        let out = format_trace(&reg, &trail, "expenseRatio", &EngineConfig::default());
        // EGI feeds expenseRatio directly; it is expanded once.
        assert_eq!(out.matches("[L2] Effective Gross Income").count(), 1, "{}", out);
    }

    #[test]
    fn test_unknown_target() {
        let reg = standard_registry().unwrap();
        let trail = Evaluator::new(&reg).evaluate(&inputs());
        let out = format_trace(&reg, &trail, "nope", &EngineConfig::default());
        assert_eq!(out, "Error: Unknown formula 'nope'\n");
    }
}
