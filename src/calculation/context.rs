//! Calculation context scoped to a single run.
//!
//! A [`RunContext`] holds what every employee of a cycle or group run shares;
//! [`EmployeeInputs`] holds one employee's attendance and overtime; and
//! [`StaticValues`] memoizes each component's static value, filled strictly in
//! resolver order. Nothing here outlives the run.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::config::OvertimeSettings;
use crate::error::EngineError;
use crate::models::{
    ApprovalStatus, AttendanceAggregate, AttendanceFact, CalculationRule, ComponentId,
    OvertimeKind, OvertimeRecord, PayCycle, SalaryStructureEntry,
};

use super::formula::{FormulaEvaluation, evaluate_formula};

/// Inputs shared by every employee of one run.
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    /// The cycle being computed.
    pub cycle: &'a PayCycle,
    /// Inclusive days in the cycle.
    pub calendar_days: i64,
    /// Reserved overtime components.
    pub overtime: &'a OvertimeSettings,
}

impl<'a> RunContext<'a> {
    /// Builds the context for a cycle.
    pub fn new(cycle: &'a PayCycle, overtime: &'a OvertimeSettings) -> Self {
        Self {
            cycle,
            calendar_days: cycle.calendar_days(),
            overtime,
        }
    }
}

/// One employee's time data for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeInputs {
    /// The employee.
    pub employee_id: String,
    /// Scheduled hours per day from the shift assignment.
    pub scheduled_hours: Decimal,
    /// Attendance folded over the cycle.
    pub attendance: AttendanceAggregate,
    /// Approved overtime hours per kind within the cycle.
    pub approved_overtime: HashMap<OvertimeKind, Decimal>,
}

impl EmployeeInputs {
    /// Folds the employee's attendance and approved overtime over the cycle.
    pub fn collect<'f>(
        employee_id: &str,
        scheduled_hours: Decimal,
        cycle: &PayCycle,
        attendance: impl IntoIterator<Item = &'f AttendanceFact>,
        overtime: impl IntoIterator<Item = &'f OvertimeRecord>,
    ) -> Self {
        let attendance = AttendanceAggregate::from_facts(
            attendance
                .into_iter()
                .filter(|f| f.employee_id == employee_id),
            cycle.start_date,
            cycle.end_date,
        );

        let mut approved_overtime = HashMap::new();
        for record in overtime {
            if record.employee_id == employee_id
                && record.status == ApprovalStatus::Approved
                && cycle.contains_date(record.date)
            {
                *approved_overtime.entry(record.kind).or_insert(Decimal::ZERO) += record.hours;
            }
        }

        Self {
            employee_id: employee_id.to_string(),
            scheduled_hours,
            attendance,
            approved_overtime,
        }
    }

    /// Approved hours of a kind, or `None` when no approved record exists.
    pub fn approved_hours(&self, kind: OvertimeKind) -> Option<Decimal> {
        self.approved_overtime.get(&kind).copied()
    }
}

/// Returns `base * percent / 100`, or `None` on overflow.
pub fn percentage_of(base: Decimal, percent: Decimal) -> Option<Decimal> {
    base.checked_mul(percent)?.checked_div(Decimal::ONE_HUNDRED)
}

/// Static values of one employee's components, memoized by component id.
///
/// Dependents always read from here; prorated payable amounts never enter it.
#[derive(Debug, Default)]
pub struct StaticValues {
    values: HashMap<ComponentId, Decimal>,
    formulas: HashMap<ComponentId, FormulaEvaluation>,
    failures: HashMap<ComponentId, EngineError>,
}

impl StaticValues {
    /// Resolves every entry in `order`, which must be a resolver order over
    /// `entries`.
    pub fn resolve(entries: &[SalaryStructureEntry], order: &[ComponentId]) -> Self {
        let index: HashMap<ComponentId, &SalaryStructureEntry> =
            entries.iter().rev().map(|e| (e.component_id, e)).collect();

        let mut statics = StaticValues::default();
        for id in order {
            let Some(entry) = index.get(id) else {
                continue;
            };
            match &entry.rule {
                CalculationRule::Fixed { amount } => {
                    statics.values.insert(*id, *amount);
                }
                CalculationRule::Percentage { percent, based_on } => {
                    match statics.values.get(based_on).copied() {
                        Some(base) => match percentage_of(base, *percent) {
                            Some(value) => {
                                statics.values.insert(*id, value);
                            }
                            None => {
                                statics.failures.insert(
                                    *id,
                                    EngineError::CalculationError {
                                        message: "percentage overflow".to_string(),
                                    },
                                );
                            }
                        },
                        None => {
                            statics.failures.insert(
                                *id,
                                EngineError::CalculationError {
                                    message: format!(
                                        "base component {} has no value for this employee",
                                        based_on
                                    ),
                                },
                            );
                        }
                    }
                }
                CalculationRule::Formula { tokens } => {
                    match evaluate_formula(tokens, &statics.values) {
                        Ok(evaluation) => {
                            statics.values.insert(*id, evaluation.value);
                            statics.formulas.insert(*id, evaluation);
                        }
                        Err(err) => {
                            statics.failures.insert(*id, err);
                        }
                    }
                }
            }
        }
        statics
    }

    /// The static value of a component, if it resolved.
    pub fn get(&self, id: ComponentId) -> Option<Decimal> {
        self.values.get(&id).copied()
    }

    /// The formula evaluation that produced a component's value.
    pub fn formula(&self, id: ComponentId) -> Option<&FormulaEvaluation> {
        self.formulas.get(&id)
    }

    /// Why a component failed to resolve.
    pub fn failure(&self, id: ComponentId) -> Option<&EngineError> {
        self.failures.get(&id)
    }

    /// All resolved values.
    pub fn values(&self) -> &HashMap<ComponentId, Decimal> {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::resolve_order;
    use crate::models::{CycleStatus, DayStatus, FormulaToken};
    use chrono::{NaiveDate, Utc};
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn january() -> PayCycle {
        PayCycle {
            id: Uuid::nil(),
            name: "January 2025".to_string(),
            start_date: date(1),
            end_date: date(31),
            status: CycleStatus::Review,
            group_ids: vec![1],
            created_at: Utc::now(),
            finalized_at: None,
            paid_at: None,
        }
    }

    fn entry(id: ComponentId, rule: CalculationRule) -> SalaryStructureEntry {
        SalaryStructureEntry {
            employee_id: "emp_001".to_string(),
            component_id: id,
            rule,
        }
    }

    #[test]
    fn test_static_values_follow_resolver_order() {
        let entries = vec![
            entry(
                3,
                CalculationRule::Formula {
                    tokens: vec![
                        FormulaToken::Component("1".to_string()),
                        FormulaToken::Operator("/".to_string()),
                        FormulaToken::Number("2".to_string()),
                    ],
                },
            ),
            entry(
                4,
                CalculationRule::Percentage {
                    percent: dec("50"),
                    based_on: 1,
                },
            ),
            entry(
                1,
                CalculationRule::Fixed {
                    amount: dec("3100"),
                },
            ),
        ];
        let order = resolve_order(&entries).unwrap();
        let statics = StaticValues::resolve(&entries, &order);

        assert_eq!(statics.get(1), Some(dec("3100")));
        assert_eq!(statics.get(3), Some(dec("1550")));
        assert_eq!(statics.get(4), Some(dec("1550")));
        assert_eq!(statics.formula(3).unwrap().expression, "3100 / 2");
    }

    #[test]
    fn test_percentage_of_missing_base_fails_only_that_component() {
        let entries = vec![
            entry(
                2,
                CalculationRule::Percentage {
                    percent: dec("10"),
                    based_on: 42,
                },
            ),
            entry(1, CalculationRule::Fixed { amount: dec("100") }),
        ];
        let order = resolve_order(&entries).unwrap();
        let statics = StaticValues::resolve(&entries, &order);
        assert!(statics.failure(2).is_some());
        assert_eq!(statics.get(2), None);
        assert_eq!(statics.get(1), Some(dec("100")));
    }

    #[test]
    fn test_repeated_resolution_yields_same_values() {
        let entries = vec![
            entry(
                2,
                CalculationRule::Percentage {
                    percent: dec("12.5"),
                    based_on: 1,
                },
            ),
            entry(1, CalculationRule::Fixed { amount: dec("4000") }),
        ];
        let order = resolve_order(&entries).unwrap();
        let first = StaticValues::resolve(&entries, &order);
        let second = StaticValues::resolve(&entries, &resolve_order(&entries).unwrap());
        assert_eq!(first.values(), second.values());
    }

    #[test]
    fn test_inputs_collect_only_approved_overtime_in_cycle() {
        let overtime = vec![
            OvertimeRecord {
                id: 1,
                employee_id: "emp_001".to_string(),
                date: date(10),
                hours: dec("6"),
                kind: OvertimeKind::Regular,
                status: ApprovalStatus::Approved,
            },
            OvertimeRecord {
                id: 2,
                employee_id: "emp_001".to_string(),
                date: date(11),
                hours: dec("4"),
                kind: OvertimeKind::Regular,
                status: ApprovalStatus::Approved,
            },
            OvertimeRecord {
                id: 3,
                employee_id: "emp_001".to_string(),
                date: date(12),
                hours: dec("3"),
                kind: OvertimeKind::Regular,
                status: ApprovalStatus::Pending,
            },
            OvertimeRecord {
                id: 4,
                employee_id: "emp_002".to_string(),
                date: date(12),
                hours: dec("3"),
                kind: OvertimeKind::Regular,
                status: ApprovalStatus::Approved,
            },
        ];
        let attendance = vec![AttendanceFact {
            employee_id: "emp_001".to_string(),
            date: date(2),
            status: DayStatus::Present,
            regular_hours: dec("8"),
            scheduled_hours: dec("8"),
            punch_in: None,
            punch_out: None,
        }];

        let inputs = EmployeeInputs::collect("emp_001", dec("8"), &january(), &attendance, &overtime);
        assert_eq!(inputs.approved_hours(OvertimeKind::Regular), Some(dec("10")));
        assert_eq!(inputs.approved_hours(OvertimeKind::Holiday), None);
        assert_eq!(inputs.attendance.regular_hours, dec("8"));
    }
}
