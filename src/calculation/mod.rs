//! Calculation logic for the payroll engine.
//!
//! This module contains the formula evaluator, dependency resolution between
//! structure entries, the run-scoped calculation context with its static
//! value map, proration of monthly amounts, overtime pay and the component
//! calculator that turns a salary structure into payslip line drafts.

mod component;
mod context;
mod dependency;
mod formula;
mod overtime;
mod proration;

pub use component::{EmployeeComputation, SkippedComponent, compute_employee_lines};
pub use context::{EmployeeInputs, RunContext, StaticValues, percentage_of};
pub use dependency::resolve_order;
pub use formula::{FormulaEvaluation, MAX_FORMULA_DEPTH, evaluate_formula, render_formula};
pub use overtime::{OvertimeResult, calculate_overtime};
pub use proration::{
    Proration, daily_rate, hourly_rate, prorate_monthly, round_for_presentation,
};
