//! Component calculator.
//!
//! Turns one employee's salary structure into payslip line drafts. Static
//! values are resolved once per employee in resolver order; each targeted
//! component then produces exactly one line, either with its amount and
//! breakdown or with a zero amount and an error breakdown.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use rust_decimal::Decimal;

use crate::error::EngineError;
use crate::models::{
    Breakdown, BreakdownDetail, CalculationRule, ComponentId, LineDraft, PayComponent,
    SalaryStructureEntry,
};

use super::context::{EmployeeInputs, RunContext, StaticValues};
use super::dependency::resolve_order;
use super::overtime::calculate_overtime;
use super::proration::prorate_monthly;

/// A targeted component that produced no line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedComponent {
    /// The component.
    pub component_id: ComponentId,
    /// Why it was skipped.
    pub reason: String,
}

/// Lines computed for one employee.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeeComputation {
    /// One draft per computed component, in resolver order.
    pub lines: Vec<LineDraft>,
    /// Targeted components that were not computed.
    pub skipped: Vec<SkippedComponent>,
}

impl EmployeeComputation {
    /// Number of lines that carry an error breakdown.
    pub fn error_count(&self) -> usize {
        self.lines.iter().filter(|l| l.is_error()).count()
    }
}

struct LineFailure {
    stage: &'static str,
    message: String,
}

impl LineFailure {
    fn new(stage: &'static str, error: &EngineError) -> Self {
        Self {
            stage,
            message: error.to_string(),
        }
    }
}

/// Computes the lines of the `targets` components for one employee.
///
/// `entries` must be the employee's own structure entries. Static values are
/// resolved over all of them, so a targeted component may depend on one that
/// is not targeted.
pub fn compute_employee_lines(
    run: &RunContext<'_>,
    inputs: &EmployeeInputs,
    entries: &[SalaryStructureEntry],
    components: &BTreeMap<ComponentId, PayComponent>,
    targets: &[ComponentId],
) -> EmployeeComputation {
    let mut computation = EmployeeComputation::default();

    let index: HashMap<ComponentId, &SalaryStructureEntry> =
        entries.iter().rev().map(|e| (e.component_id, e)).collect();

    let mut targeted: Vec<ComponentId> = Vec::new();
    let mut seen = HashSet::new();
    for id in targets {
        if !seen.insert(*id) {
            continue;
        }
        if !components.contains_key(id) {
            computation.skipped.push(SkippedComponent {
                component_id: *id,
                reason: "component is not configured".to_string(),
            });
        } else if !index.contains_key(id) {
            computation.skipped.push(SkippedComponent {
                component_id: *id,
                reason: "employee has no salary structure entry".to_string(),
            });
        } else {
            targeted.push(*id);
        }
    }

    let order = match resolve_order(entries) {
        Ok(order) => order,
        Err(err) => {
            let message = err.to_string();
            for id in targeted {
                let (Some(component), Some(entry)) = (components.get(&id), index.get(&id)) else {
                    continue;
                };
                computation.lines.push(LineDraft {
                    component_id: Some(id),
                    name: component.name.clone(),
                    line_type: component.kind,
                    amount: Decimal::ZERO,
                    breakdown: Breakdown::error(
                        "dependency_resolution",
                        Some(entry.rule.type_name()),
                        message.clone(),
                    ),
                });
            }
            return computation;
        }
    };

    let statics = StaticValues::resolve(entries, &order);
    let targeted: HashSet<ComponentId> = targeted.into_iter().collect();

    for id in order.iter().filter(|id| targeted.contains(id)) {
        let (Some(component), Some(entry)) = (components.get(id), index.get(id)) else {
            continue;
        };
        let breakdown = calculate_line(run, inputs, component, entry, &statics);
        computation.lines.push(match breakdown {
            Ok((amount, breakdown)) => LineDraft {
                component_id: Some(*id),
                name: component.name.clone(),
                line_type: component.kind,
                amount,
                breakdown,
            },
            Err(failure) => LineDraft {
                component_id: Some(*id),
                name: component.name.clone(),
                line_type: component.kind,
                amount: Decimal::ZERO,
                breakdown: Breakdown::error(
                    failure.stage,
                    Some(entry.rule.type_name()),
                    failure.message,
                ),
            },
        });
    }

    computation
}

fn calculate_line(
    run: &RunContext<'_>,
    inputs: &EmployeeInputs,
    component: &PayComponent,
    entry: &SalaryStructureEntry,
    statics: &StaticValues,
) -> Result<(Decimal, Breakdown), LineFailure> {
    let id = component.id;
    if let Some(err) = statics.failure(id) {
        let stage = match entry.rule {
            CalculationRule::Formula { .. } => "formula",
            _ => "static_value",
        };
        return Err(LineFailure::new(stage, err));
    }
    let static_value = statics.get(id).ok_or_else(|| {
        LineFailure::new(
            "static_value",
            &EngineError::CalculationError {
                message: format!("component {} has no static value", id),
            },
        )
    })?;

    if let Some(kind) = run.overtime.role_of(id) {
        let result = calculate_overtime(
            kind,
            &entry.rule,
            static_value,
            run.overtime.rate_divisor,
            inputs,
        )
        .map_err(|e| LineFailure::new("overtime", &e))?;
        return Ok((
            result.amount,
            Breakdown::new(result.detail).with_defaults(result.defaults),
        ));
    }

    match &entry.rule {
        CalculationRule::Fixed { amount } if component.prorate => {
            let mut defaults = Vec::new();
            if inputs.attendance.is_empty() {
                defaults.push("no attendance in cycle; regular hours defaulted to 0".to_string());
            }
            let p = prorate_monthly(
                *amount,
                run.calendar_days,
                inputs.scheduled_hours,
                inputs.attendance.regular_hours,
            )
            .map_err(|e| LineFailure::new("proration", &e))?;
            Ok((
                p.payable,
                Breakdown::new(BreakdownDetail::Prorated {
                    monthly_amount: p.monthly_amount,
                    calendar_days: p.calendar_days,
                    daily_rate: p.daily_rate,
                    scheduled_hours: p.scheduled_hours,
                    hourly_rate: p.hourly_rate,
                    regular_hours: p.regular_hours,
                    payable: p.payable,
                })
                .with_defaults(defaults),
            ))
        }
        CalculationRule::Fixed { amount } => Ok((
            *amount,
            Breakdown::new(BreakdownDetail::Fixed { amount: *amount }),
        )),
        CalculationRule::Percentage { percent, based_on } => {
            let base_value = statics.get(*based_on).unwrap_or(Decimal::ZERO);
            Ok((
                static_value,
                Breakdown::new(BreakdownDetail::Percentage {
                    based_on: *based_on,
                    base_value,
                    percent: *percent,
                    payable: static_value,
                }),
            ))
        }
        CalculationRule::Formula { .. } => {
            let evaluation = statics.formula(id).ok_or_else(|| {
                LineFailure::new(
                    "formula",
                    &EngineError::CalculationError {
                        message: format!("component {} has no formula evaluation", id),
                    },
                )
            })?;
            let defaults = evaluation
                .defaults
                .iter()
                .map(|d| format!("component {} has no value; defaulted to 0", d))
                .collect();
            Ok((
                evaluation.value,
                Breakdown::new(BreakdownDetail::Formula {
                    expression: evaluation.expression.clone(),
                    references: evaluation
                        .references
                        .iter()
                        .map(|(k, v)| (k.to_string(), *v))
                        .collect(),
                    payable: evaluation.value,
                })
                .with_defaults(defaults),
            ))
        }
    }
}
