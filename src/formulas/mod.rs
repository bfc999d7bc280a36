//! The standard income-property valuation formulas.
//!
//! Raw inputs read by this set: `totalRevenue`, `totalExpenses`, `vacancyRate` (%),
//! `capRate` (%), `squareFootage`, `unitCount`, `loanAmount`, `interestRate` (%),
//! `amortizationYears`.

use crate::compute::kernel::FormulaInputs;
use crate::compute::ledger::Severity;
use crate::store::{FormulaDefinition, OperandRef, Operation, OutputFormat, Registry, RegistryError, ValidationRule};

pub const AMORTIZED_ANNUAL_PAYMENT: &str = "amortized_annual_payment";

/// A fresh registry holding the standard formulas and their custom functions.
pub fn standard_registry() -> Result<Registry, RegistryError> {
    let mut registry = Registry::new();
    registry.register_function(AMORTIZED_ANNUAL_PAYMENT, amortized_annual_payment);
    registry.register(standard_definitions())?;
    Ok(registry)
}

/// Annual payment on a fully amortizing loan with monthly compounding.
fn amortized_annual_payment(inputs: &FormulaInputs) -> Option<f64> {
    let principal = inputs.get("loanAmount")?;
    let annual_rate = inputs.get("interestRate")?;
    let years = inputs.get("amortizationYears")?;
    if principal < 0.0 || annual_rate < 0.0 || years <= 0.0 {
        return None;
    }

    let n = years * 12.0;
    let r = annual_rate / 100.0 / 12.0;
    let monthly = if r == 0.0 {
        principal / n
    } else {
        principal * r / (1.0 - (1.0 + r).powf(-n))
    };
    let annual = monthly * 12.0;
    annual.is_finite().then_some(annual)
}

fn formula(
    id: &str,
    name: &str,
    human_readable: &str,
    expression: &str,
    operation: Operation,
    output_format: OutputFormat,
) -> FormulaDefinition {
    FormulaDefinition {
        id: id.into(),
        name: name.into(),
        human_readable: human_readable.into(),
        expression: expression.into(),
        operands: Vec::new(),
        dependencies: Vec::new(),
        operation,
        scale: None,
        output_format,
        validation: Vec::new(),
        category: None,
        description: None,
    }
}

fn divide(numerator: &str, denominator: &str) -> Operation {
    Operation::Divide {
        numerator: numerator.into(),
        denominator: denominator.into(),
        require_positive: true,
    }
}

fn deps(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

fn non_negative(message: &str) -> ValidationRule {
    ValidationRule::NonNegative { message: message.into() }
}

pub fn standard_definitions() -> Vec<FormulaDefinition> {
    vec![
        FormulaDefinition {
            operands: vec![
                OperandRef::input("totalRevenue", "Total Revenue"),
                OperandRef::input("vacancyRate", "Vacancy Rate"),
            ],
            scale: Some(0.01),
            validation: vec![non_negative("Vacancy loss cannot be negative")],
            category: Some("income".into()),
            description: Some("Vacancy rate is expressed as a percentage of gross revenue.".into()),
            ..formula(
                "vacancyLoss",
                "Vacancy Loss",
                "Total Revenue x Vacancy Rate",
                "totalRevenue * vacancyRate / 100",
                Operation::Multiply { lhs: "totalRevenue".into(), rhs: "vacancyRate".into() },
                OutputFormat::Currency,
            )
        },
        FormulaDefinition {
            operands: vec![
                OperandRef::input("totalRevenue", "Total Revenue"),
                OperandRef::formula("vacancyLoss", "Vacancy Loss"),
            ],
            dependencies: deps(&["vacancyLoss"]),
            validation: vec![non_negative("Effective gross income is negative")],
            category: Some("income".into()),
            ..formula(
                "effectiveGrossIncome",
                "Effective Gross Income",
                "Total Revenue - Vacancy Loss",
                "totalRevenue - vacancyLoss",
                Operation::Subtract { lhs: "totalRevenue".into(), rhs: "vacancyLoss".into() },
                OutputFormat::Currency,
            )
        },
        FormulaDefinition {
            operands: vec![OperandRef::input("totalExpenses", "Total Expenses")],
            validation: vec![non_negative("Operating expenses cannot be negative")],
            category: Some("expenses".into()),
            ..formula(
                "totalOperatingExpenses",
                "Total Operating Expenses",
                "Sum of operating expense line items",
                "sum(expenses)",
                Operation::Sum { terms: vec!["totalExpenses".into()] },
                OutputFormat::Currency,
            )
        },
        FormulaDefinition {
            operands: vec![
                OperandRef::formula("effectiveGrossIncome", "Effective Gross Income"),
                OperandRef::formula("totalOperatingExpenses", "Total Operating Expenses"),
            ],
            dependencies: deps(&["effectiveGrossIncome", "totalOperatingExpenses"]),
            validation: vec![ValidationRule::Min {
                limit: 0.0,
                severity: Severity::Warning,
                message: "Operating expenses exceed effective gross income".into(),
            }],
            category: Some("income".into()),
            ..formula(
                "netOperatingIncome",
                "Net Operating Income",
                "Effective Gross Income - Total Operating Expenses",
                "effectiveGrossIncome - totalOperatingExpenses",
                Operation::Subtract {
                    lhs: "effectiveGrossIncome".into(),
                    rhs: "totalOperatingExpenses".into(),
                },
                OutputFormat::Currency,
            )
        },
        FormulaDefinition {
            operands: vec![
                OperandRef::formula("totalOperatingExpenses", "Total Operating Expenses"),
                OperandRef::formula("effectiveGrossIncome", "Effective Gross Income"),
            ],
            dependencies: deps(&["totalOperatingExpenses", "effectiveGrossIncome"]),
            scale: Some(100.0),
            validation: vec![
                ValidationRule::Max {
                    limit: 70.0,
                    severity: Severity::Warning,
                    message: "Expense ratio above 70% is unusually high".into(),
                },
                ValidationRule::Max {
                    limit: 100.0,
                    severity: Severity::Error,
                    message: "Expense ratio above 100%: expenses exceed income".into(),
                },
            ],
            category: Some("ratios".into()),
            ..formula(
                "expenseRatio",
                "Expense Ratio",
                "Total Operating Expenses / Effective Gross Income",
                "totalOperatingExpenses / effectiveGrossIncome * 100",
                divide("totalOperatingExpenses", "effectiveGrossIncome"),
                OutputFormat::Percentage,
            )
        },
        FormulaDefinition {
            operands: vec![
                OperandRef::formula("netOperatingIncome", "Net Operating Income"),
                OperandRef::input("capRate", "Cap Rate"),
            ],
            dependencies: deps(&["netOperatingIncome"]),
            scale: Some(100.0),
            validation: vec![non_negative("Property value is negative")],
            category: Some("valuation".into()),
            description: Some("Direct capitalization; cap rate is a percentage.".into()),
            ..formula(
                "propertyValue",
                "Property Value",
                "Net Operating Income / Cap Rate",
                "netOperatingIncome / (capRate / 100)",
                divide("netOperatingIncome", "capRate"),
                OutputFormat::Currency,
            )
        },
        FormulaDefinition {
            operands: vec![
                OperandRef::formula("propertyValue", "Property Value"),
                OperandRef::input("squareFootage", "Square Footage"),
            ],
            dependencies: deps(&["propertyValue"]),
            category: Some("valuation".into()),
            ..formula(
                "pricePerSquareFoot",
                "Price per Square Foot",
                "Property Value / Square Footage",
                "propertyValue / squareFootage",
                divide("propertyValue", "squareFootage"),
                OutputFormat::Currency,
            )
        },
        FormulaDefinition {
            operands: vec![
                OperandRef::formula("propertyValue", "Property Value"),
                OperandRef::input("unitCount", "Unit Count"),
            ],
            dependencies: deps(&["propertyValue"]),
            category: Some("valuation".into()),
            ..formula(
                "pricePerUnit",
                "Price per Unit",
                "Property Value / Unit Count",
                "propertyValue / unitCount",
                divide("propertyValue", "unitCount"),
                OutputFormat::Currency,
            )
        },
        FormulaDefinition {
            operands: vec![
                OperandRef::formula("propertyValue", "Property Value"),
                OperandRef::input("totalRevenue", "Total Revenue"),
            ],
            dependencies: deps(&["propertyValue"]),
            category: Some("ratios".into()),
            ..formula(
                "grossRentMultiplier",
                "Gross Rent Multiplier",
                "Property Value / Total Revenue",
                "propertyValue / totalRevenue",
                divide("propertyValue", "totalRevenue"),
                OutputFormat::Ratio,
            )
        },
        FormulaDefinition {
            operands: vec![
                OperandRef::input("loanAmount", "Loan Amount"),
                OperandRef::input("interestRate", "Interest Rate"),
                OperandRef::input("amortizationYears", "Amortization (years)"),
            ],
            category: Some("financing".into()),
            description: Some("Fully amortizing loan, monthly payments.".into()),
            ..formula(
                "annualDebtService",
                "Annual Debt Service",
                "12 x monthly payment on the loan",
                "12 * P * r / (1 - (1 + r)^-n)",
                Operation::Custom { function: AMORTIZED_ANNUAL_PAYMENT.into() },
                OutputFormat::Currency,
            )
        },
        FormulaDefinition {
            operands: vec![
                OperandRef::formula("netOperatingIncome", "Net Operating Income"),
                OperandRef::formula("annualDebtService", "Annual Debt Service"),
            ],
            dependencies: deps(&["netOperatingIncome", "annualDebtService"]),
            validation: vec![
                ValidationRule::Min {
                    limit: 1.25,
                    severity: Severity::Warning,
                    message: "DSCR below the typical 1.25x lender minimum".into(),
                },
                ValidationRule::Min {
                    limit: 1.0,
                    severity: Severity::Error,
                    message: "NOI does not cover debt service".into(),
                },
            ],
            category: Some("financing".into()),
            ..formula(
                "debtServiceCoverageRatio",
                "Debt Service Coverage Ratio",
                "Net Operating Income / Annual Debt Service",
                "netOperatingIncome / annualDebtService",
                divide("netOperatingIncome", "annualDebtService"),
                OutputFormat::Ratio,
            )
        },
        FormulaDefinition {
            operands: vec![
                OperandRef::formula("netOperatingIncome", "Net Operating Income"),
                OperandRef::formula("annualDebtService", "Annual Debt Service"),
            ],
            dependencies: deps(&["netOperatingIncome", "annualDebtService"]),
            category: Some("financing".into()),
            ..formula(
                "cashFlowAfterDebtService",
                "Cash Flow After Debt Service",
                "Net Operating Income - Annual Debt Service",
                "netOperatingIncome - annualDebtService",
                Operation::Subtract {
                    lhs: "netOperatingIncome".into(),
                    rhs: "annualDebtService".into(),
                },
                OutputFormat::Currency,
            )
        },
    ]
}
