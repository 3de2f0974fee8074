//! Pay components and per-employee salary structure entries.
//!
//! A [`SalaryStructureEntry`] binds one [`PayComponent`] to one employee via a
//! [`CalculationRule`]: a fixed amount, a percentage of another component, or
//! a formula over other components.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier of a pay component.
pub type ComponentId = i64;

/// Whether a component adds to or subtracts from pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Adds to gross pay.
    Earning,
    /// Subtracts from gross pay.
    Deduction,
}

/// A named pay component such as "Basic Salary" or "Pension".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayComponent {
    /// Unique identifier.
    pub id: ComponentId,
    /// Display name, copied onto payslip lines.
    pub name: String,
    /// Earning or deduction.
    pub kind: ComponentKind,
    /// Whether a Fixed amount for this component is paid prorated by
    /// attendance (e.g. base salary) rather than verbatim.
    #[serde(default)]
    pub prorate: bool,
}

/// One token of a formula.
///
/// Multi-digit literals arrive split into one `Number` token per character and
/// are concatenated back together by the evaluator.
///
/// # Example
///
/// ```
/// use payroll_engine::models::FormulaToken;
///
/// let token: FormulaToken = serde_json::from_str(r#"{"type":"component","value":"1"}"#).unwrap();
/// assert_eq!(token, FormulaToken::Component("1".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FormulaToken {
    /// A reference to another component by id.
    Component(String),
    /// A digit or decimal point of a literal.
    Number(String),
    /// One of `+ - * /`.
    Operator(String),
    /// `(` or `)`.
    Parenthesis(String),
}

/// How a component's value is derived for an employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "calculation_type", rename_all = "snake_case")]
pub enum CalculationRule {
    /// A configured monthly amount.
    Fixed {
        /// The amount.
        amount: Decimal,
    },
    /// A percentage of another component's static value.
    Percentage {
        /// The percentage (50 means half).
        percent: Decimal,
        /// The component the percentage applies to.
        based_on: ComponentId,
    },
    /// An arithmetic formula over other components.
    Formula {
        /// The formula tokens.
        tokens: Vec<FormulaToken>,
    },
}

impl CalculationRule {
    /// Returns the short name used in breakdowns and logs.
    pub fn type_name(&self) -> &'static str {
        match self {
            CalculationRule::Fixed { .. } => "fixed",
            CalculationRule::Percentage { .. } => "percentage",
            CalculationRule::Formula { .. } => "formula",
        }
    }
}

/// The rule that computes one component for one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryStructureEntry {
    /// The employee this entry belongs to.
    pub employee_id: String,
    /// The component being computed.
    pub component_id: ComponentId,
    /// The calculation rule.
    #[serde(flatten)]
    pub rule: CalculationRule,
}

impl SalaryStructureEntry {
    /// Returns the component ids this entry reads from, in token order.
    ///
    /// Component tokens whose value is not a valid id are ignored here; the
    /// evaluator reports them when the formula runs.
    pub fn dependencies(&self) -> Vec<ComponentId> {
        match &self.rule {
            CalculationRule::Fixed { .. } => Vec::new(),
            CalculationRule::Percentage { based_on, .. } => vec![*based_on],
            CalculationRule::Formula { tokens } => {
                let mut deps = Vec::new();
                for token in tokens {
                    let FormulaToken::Component(raw) = token else {
                        continue;
                    };
                    if let Ok(id) = raw.trim().parse::<ComponentId>() {
                        if !deps.contains(&id) {
                            deps.push(id);
                        }
                    }
                }
                deps
            }
        }
    }
}
