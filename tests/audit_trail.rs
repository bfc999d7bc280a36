use prism_audit_core::convert::{to_flat_record, to_grouped_streams, to_vacancy_adjusted_stream};
use prism_audit_core::display::format_trace;
use prism_audit_core::notation;
use prism_audit_core::source::DocumentLocation;
use prism_audit_core::{
    standard_registry, EngineConfig, Evaluator, FinancialModel, LineItemWithSource, SourceReference, SourceType,
    ValueWithSource,
};

fn doc(index: usize, cell: &str) -> SourceReference {
    SourceReference::parsed_document(
        index,
        DocumentLocation {
            file_name: "t12.xlsx".into(),
            sheet: Some("Summary".into()),
            cell: Some(cell.into()),
            ..Default::default()
        },
        Some("session-1".into()),
    )
}

fn sample_model() -> FinancialModel {
    let mut model = FinancialModel::new("model-42");
    model.revenue = vec![
        LineItemWithSource::new("Apartment Rent", 90_000.0, doc(0, "B2")).with_category("Residential"),
        LineItemWithSource::new("Parking", 10_000.0, doc(1, "B3")),
    ];
    model.expenses = vec![
        LineItemWithSource::new("Taxes", 9_000.0, doc(2, "C2")),
        LineItemWithSource::new("Insurance", 6_000.0, doc(3, "C3")),
    ];
    model.valuation.vacancy_rate = Some(ValueWithSource::new(5.0, SourceReference::user_input("vacancyRate", None)));
    model.valuation.cap_rate = Some(ValueWithSource::new(
        8.0,
        SourceReference::assumption("capRate", "market survey"),
    ));
    model.property.unit_count = Some(ValueWithSource::new(10.0, SourceReference::user_input("unitCount", None)));
    model
}

#[test]
fn test_model_evaluates_with_full_audit_trail() {
    let registry = standard_registry().unwrap();
    let model = sample_model();
    model.validate_sources().unwrap();

    let trail = Evaluator::new(&registry)
        .with_model_id(model.id.clone())
        .with_input_sources(model.input_sources())
        .evaluate(&model.raw_inputs());

    assert_eq!(trail.model_id, "model-42");
    assert_eq!(trail.calculations.len(), registry.count());
    assert_eq!(trail.value("vacancyLoss"), Some(5_000.0));
    assert_eq!(trail.value("effectiveGrossIncome"), Some(95_000.0));
    assert_eq!(trail.value("netOperatingIncome"), Some(80_000.0));
    assert_eq!(trail.value("propertyValue"), Some(1_000_000.0));
    assert_eq!(trail.value("pricePerUnit"), Some(100_000.0));

    // Every dependency is evaluated before its consumer.
    for def in registry.definitions() {
        let at = trail.position(&def.id).unwrap();
        for dep in &def.dependencies {
            assert!(trail.position(dep).unwrap() < at, "{} must precede {}", dep, def.id);
        }
    }

    let noi = trail.result("netOperatingIncome").unwrap();
    assert!(noi.is_valid);
    assert_eq!(noi.currency.as_deref(), Some("USD"));
    assert_eq!(noi.source.source_type, SourceType::Calculated);
    assert_eq!(noi.steps.last().unwrap().expression, "$80,000.00");
    let egi = noi.formula.operands.iter().find(|o| o.name == "effectiveGrossIncome").unwrap();
    assert_eq!(egi.source.as_ref().unwrap().display_path, "Calculated > effectiveGrossIncome");

    let loss = trail.result("vacancyLoss").unwrap();
    let rate = loss.formula.operands.iter().find(|o| o.name == "vacancyRate").unwrap();
    assert_eq!(rate.source.as_ref().unwrap().source_type, SourceType::UserInput);
}

#[test]
fn test_missing_inputs_degrade_to_null_without_failing() {
    let registry = standard_registry().unwrap();
    let trail = Evaluator::new(&registry).evaluate(&sample_model().raw_inputs());

    // No square footage and no loan terms in the sample model.
    assert_eq!(trail.value("pricePerSquareFoot"), None);
    assert_eq!(trail.value("annualDebtService"), None);
    assert_eq!(trail.value("debtServiceCoverageRatio"), None);

    let ppsf = trail.result("pricePerSquareFoot").unwrap();
    assert!(!ppsf.is_valid);
    assert!(ppsf.warning.as_deref().unwrap().contains("Square Footage"));
    assert!(trail.warnings.iter().any(|w| w.starts_with("Price per Square Foot:")));
    assert_eq!(trail.errors().count(), 0);
}

#[test]
fn test_scenarios_keep_input_order() {
    let registry = standard_registry().unwrap();
    let base = sample_model().raw_inputs();
    let mut stressed = base.clone();
    stressed.insert("vacancyRate".into(), Some(20.0));

    let trails = Evaluator::new(&registry).evaluate_scenarios(&[base, stressed]);
    assert_eq!(trails.len(), 2);
    assert_eq!(trails[0].value("netOperatingIncome"), Some(80_000.0));
    assert_eq!(trails[1].value("netOperatingIncome"), Some(65_000.0));
}

#[test]
fn test_results_feed_notation_and_trace() {
    let registry = standard_registry().unwrap();
    let config = EngineConfig::default();
    let trail = Evaluator::new(&registry).with_model_id("m").evaluate(&sample_model().raw_inputs());

    let noi = trail.result("netOperatingIncome").unwrap();
    let reasoning = format!("The NOI is {}.", notation::annotate("noi", &noi.source).unwrap());
    assert!(notation::validate(&reasoning).is_valid);
    let rendered = notation::replace(&reasoning, |r| {
        let value = trail.value(&r.ref_value);
        prism_audit_core::display::format_value(value, noi.output_format, &config.currency, 0)
    });
    assert_eq!(rendered, "The NOI is $80,000.");

    let trace = format_trace(&registry, &trail, "netOperatingIncome", &config);
    assert!(trace.starts_with("AUDIT TRACE for 'Net Operating Income' (model m):"));
    assert!(trace.contains("Effective Gross Income"));
}

#[test]
fn test_model_converts_to_external_shapes() {
    let model = sample_model();
    let flat = to_flat_record(&model);
    assert_eq!(flat.revenue["Parking"], 10_000.0);
    assert_eq!(flat.expenses.values().sum::<f64>(), 15_000.0);
    assert!(flat.provenance["revenue:Parking"].display_path.contains("t12.xlsx"));

    let streams = to_grouped_streams(&model.revenue);
    assert_eq!(streams.len(), 2);
    let total: f64 = streams.iter().map(|s| s.gross_revenue).sum();
    assert_eq!(total, 100_000.0);

    let adjusted = to_vacancy_adjusted_stream(&streams[0], Some(5.0), 5.0).unwrap();
    assert_eq!(adjusted.effective_revenue, Some(85_500.0));
}
