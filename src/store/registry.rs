use super::error::RegistryError;
use super::types::*;
use crate::analysis::topology;
use crate::compute::kernel::FormulaInputs;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// The set of formulas known to an evaluator.
///
/// Built once (registration happens at startup) and read-only afterwards, so a
/// shared `&Registry` may be evaluated from many threads at once.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    // Columnar Arrays
    pub(crate) definitions: Vec<FormulaDefinition>,
    pub(crate) index: HashMap<String, usize>,

    // Topology (CSR-ish + Adjacency), slots are registration positions
    pub(crate) parents_flat: Vec<usize>,
    pub(crate) parents_ranges: Vec<(u32, u32)>, // (start, count)

    // Downstream traversal helpers
    pub(crate) first_child: Vec<u32>,
    pub(crate) child_targets: Vec<usize>,
    pub(crate) next_child: Vec<u32>,

    order: Vec<usize>,
    functions: FunctionTable,
}

impl Registry {
    pub fn new() -> Self { Self::default() }
    pub fn count(&self) -> usize { self.definitions.len() }
    pub fn is_empty(&self) -> bool { self.definitions.is_empty() }

    /// Makes `name` available to `Operation::Custom`. Register functions before the
    /// formulas that use them.
    pub fn register_function(&mut self, name: impl Into<String>, function: CustomFn) {
        self.functions.insert(name.into(), function);
    }

    pub fn functions(&self) -> &FunctionTable { &self.functions }

    /// Adds a batch of definitions. Dependencies may point at formulas registered
    /// earlier or anywhere in the same batch. On error nothing is registered.
    pub fn register(&mut self, definitions: Vec<FormulaDefinition>) -> Result<(), RegistryError> {
        let mut candidate = self.clone();
        let added = definitions.len();

        // --- Unique Id Enforcement ---
        for def in &definitions {
            if candidate.index.contains_key(&def.id) {
                return Err(RegistryError::DuplicateFormulaId { id: def.id.clone() });
            }
            candidate.index.insert(def.id.clone(), candidate.definitions.len());
            candidate.definitions.push(def.clone());
        }

        for def in &definitions {
            candidate.check_references(def)?;
        }

        // Parents are resolved only after the whole batch is indexed so that forward
        // references inside the batch work.
        candidate.first_child.resize(candidate.definitions.len(), u32::MAX);
        for def in definitions {
            candidate.link(&def);
        }

        candidate.order = topology::sort(&candidate)
            .map_err(|chain| RegistryError::CycleDetected { chain })?;

        *self = candidate;
        info!(added, total = self.count(), "Registered formulas");
        debug!(order = ?self.execution_order().map(|d| d.id.as_str()).collect::<Vec<_>>(), "Execution order");
        Ok(())
    }

    fn check_references(&self, def: &FormulaDefinition) -> Result<(), RegistryError> {
        for dep in &def.dependencies {
            if !self.index.contains_key(dep) {
                return Err(RegistryError::UnknownDependency {
                    formula: def.id.clone(),
                    dependency: dep.clone(),
                });
            }
        }

        if let Operation::Custom { function } = &def.operation {
            if !self.functions.contains_key(function) {
                return Err(RegistryError::UnknownFunction {
                    formula: def.id.clone(),
                    function: function.clone(),
                });
            }
        }

        // A formula read without being declared would have no ordering guarantee.
        let declared: HashSet<&str> = def.dependencies.iter().map(String::as_str).collect();
        for name in def.input_names() {
            if name != def.id && self.index.contains_key(name) && !declared.contains(name) {
                return Err(RegistryError::UndeclaredDependency {
                    formula: def.id.clone(),
                    operand: name.to_string(),
                });
            }
        }
        Ok(())
    }

    fn link(&mut self, def: &FormulaDefinition) {
        let slot = self.parents_ranges.len();
        let parents: Vec<usize> = def.dependencies.iter().filter_map(|d| self.index.get(d).copied()).collect();

        // 1. Register Parents
        let start = self.parents_flat.len() as u32;
        self.parents_ranges.push((start, parents.len() as u32));
        self.parents_flat.extend_from_slice(&parents);

        // 2. Register Children (Adjacency list for downstream lookups)
        for parent in parents {
            let head = self.first_child[parent];
            let new_edge = self.child_targets.len() as u32;
            self.child_targets.push(slot);
            self.next_child.push(head);
            self.first_child[parent] = new_edge;
        }
    }

    #[inline(always)]
    pub(crate) fn get_parents(&self, slot: usize) -> &[usize] {
        let (start, count) = self.parents_ranges[slot];
        &self.parents_flat[start as usize..(start + count) as usize]
    }

    pub fn get(&self, id: &str) -> Option<&FormulaDefinition> {
        self.index.get(id).map(|&slot| &self.definitions[slot])
    }

    pub fn contains(&self, id: &str) -> bool { self.index.contains_key(id) }

    /// Definitions in registration order.
    pub fn definitions(&self) -> &[FormulaDefinition] { &self.definitions }

    /// Definitions in evaluation order: every dependency precedes its dependents,
    /// unrelated formulas keep their registration order.
    pub fn execution_order(&self) -> impl Iterator<Item = &FormulaDefinition> {
        self.order.iter().map(move |&slot| &self.definitions[slot])
    }

    /// Runs a single formula against caller-supplied inputs. Unknown ids yield `None`.
    pub fn compute(&self, id: &str, inputs: &FormulaInputs) -> Option<f64> {
        self.get(id)?.compute(inputs, &self.functions)
    }

    /// Every formula that directly or transitively depends on `id`, in execution order.
    pub fn dependents_of(&self, id: &str) -> Vec<&str> {
        let Some(&slot) = self.index.get(id) else {
            return Vec::new();
        };
        let downstream = topology::downstream_from(self, &[slot]);
        self.order
            .iter()
            .filter(|&&s| s != slot && downstream.contains(&s))
            .map(|&s| self.definitions[s].id.as_str())
            .collect()
    }
}

/// Reads a JSON array of formula definitions.
pub fn definitions_from_json(json: &str) -> Result<Vec<FormulaDefinition>, RegistryError> {
    serde_json::from_str(json).map_err(|e| RegistryError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(id: &str, deps: &[&str], op: Operation) -> FormulaDefinition {
        FormulaDefinition {
            id: id.into(),
            name: id.into(),
            human_readable: id.into(),
            expression: id.into(),
            operands: Vec::new(),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            operation: op,
            scale: None,
            output_format: OutputFormat::Number,
            validation: Vec::new(),
            category: None,
            description: None,
        }
    }

    fn add(lhs: &str, rhs: &str) -> Operation {
        Operation::Add { lhs: lhs.into(), rhs: rhs.into() }
    }

    #[test]
    fn test_cycle_is_rejected_with_chain() {
        let mut reg = Registry::new();
        let err = reg
            .register(vec![def("a", &["b"], add("b", "x")), def("b", &["a"], add("a", "x"))])
            .unwrap_err();
        assert_eq!(err, RegistryError::CycleDetected { chain: vec!["a".into(), "b".into(), "a".into()] });
        assert!(err.to_string().contains("a -> b -> a"));
        assert!(reg.is_empty(), "failed batch must not be partially registered");
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let mut reg = Registry::new();
        let err = reg.register(vec![def("a", &["a"], add("a", "x"))]).unwrap_err();
        assert!(matches!(err, RegistryError::CycleDetected { .. }));
    }

    #[test]
    fn test_duplicate_ids() {
        let mut reg = Registry::new();
        reg.register(vec![def("a", &[], add("x", "y"))]).unwrap();
        let err = reg.register(vec![def("a", &[], add("x", "y"))]).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateFormulaId { id: "a".into() });

        let mut reg = Registry::new();
        let err = reg
            .register(vec![def("b", &[], add("x", "y")), def("b", &[], add("x", "y"))])
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateFormulaId { id: "b".into() });
    }

    #[test]
    fn test_unknown_dependency() {
        let mut reg = Registry::new();
        let err = reg.register(vec![def("a", &["ghost"], add("ghost", "x"))]).unwrap_err();
        assert_eq!(
            err,
            RegistryError::UnknownDependency { formula: "a".into(), dependency: "ghost".into() }
        );
    }

    #[test]
    fn test_unknown_custom_function() {
        let mut reg = Registry::new();
        let err = reg
            .register(vec![def("a", &[], Operation::Custom { function: "npv".into() })])
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownFunction { .. }));
    }

    #[test]
    fn test_undeclared_formula_operand() {
        let mut reg = Registry::new();
        reg.register(vec![def("base", &[], add("x", "y"))]).unwrap();
        let err = reg.register(vec![def("top", &[], add("base", "z"))]).unwrap_err();
        assert_eq!(
            err,
            RegistryError::UndeclaredDependency { formula: "top".into(), operand: "base".into() }
        );
    }

    #[test]
    fn test_forward_reference_within_batch_and_across_batches() {
        let mut reg = Registry::new();
        reg.register(vec![def("d", &["b", "c"], add("b", "c")), def("b", &[], add("x", "y")), def("c", &[], add("x", "y"))])
            .unwrap();
        reg.register(vec![def("e", &["d"], add("d", "x"))]).unwrap();

        let order: Vec<&str> = reg.execution_order().map(|d| d.id.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "d", "e"]);
        assert_eq!(reg.dependents_of("b"), vec!["d", "e"]);
        assert!(reg.dependents_of("e").is_empty());
        assert!(reg.dependents_of("missing").is_empty());
    }

    #[test]
    fn test_definitions_from_json() {
        let json = r#"[{
            "id": "noi",
            "name": "Net Operating Income",
            "humanReadable": "EGI minus operating expenses",
            "expression": "egi - opex",
            "operation": { "op": "subtract", "lhs": "egi", "rhs": "opex" },
            "outputFormat": "currency",
            "validation": [{ "rule": "non_negative", "message": "negative NOI" }]
        }]"#;
        let defs = definitions_from_json(json).unwrap();
        assert_eq!(defs[0].operation, Operation::Subtract { lhs: "egi".into(), rhs: "opex".into() });
        assert!(defs[0].dependencies.is_empty());

        let mut reg = Registry::new();
        reg.register(defs).unwrap();
        let inputs: FormulaInputs = [("egi", Some(10.0)), ("opex", Some(4.0))].into_iter().collect();
        assert_eq!(reg.compute("noi", &inputs), Some(6.0));

        assert!(matches!(definitions_from_json("{"), Err(RegistryError::Parse(_))));
    }
}
