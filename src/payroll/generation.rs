//! Payslip generation and assembly.
//!
//! A run is planned against a read snapshot of the store and applied inside a
//! single transaction. Planning never fails as a whole: an employee without a
//! shift is excluded, and component failures become error lines.

use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::calculation::{EmployeeInputs, RunContext, SkippedComponent, compute_employee_lines};
use crate::config::EngineSettings;
use crate::models::{
    ComponentId, LineDraft, PayCycle, PayGroup, Payslip, PayslipStatus,
};
use crate::settlement::{CollectedItem, collect_all, held_elsewhere};
use crate::store::Tables;

/// What a run recomputes.
#[derive(Debug, Clone, Copy)]
pub enum RunScope<'a> {
    /// Every component of every attached group, plus settlement items.
    Cycle,
    /// The components of one group only.
    Group(&'a PayGroup),
}

impl RunScope<'_> {
    fn targets(&self, tables: &Tables, cycle: &PayCycle) -> Vec<ComponentId> {
        let mut seen = HashSet::new();
        match self {
            RunScope::Cycle => cycle
                .group_ids
                .iter()
                .filter_map(|id| tables.groups.get(id))
                .flat_map(|g| g.component_ids.iter().copied())
                .filter(|id| seen.insert(*id))
                .collect(),
            RunScope::Group(group) => group
                .component_ids
                .iter()
                .copied()
                .filter(|id| seen.insert(*id))
                .collect(),
        }
    }
}

/// The computed result for one employee, not yet written.
#[derive(Debug, Clone)]
pub struct EmployeePlan {
    employee_id: String,
    outcome: PlanOutcome,
}

#[derive(Debug, Clone)]
enum PlanOutcome {
    Computed {
        lines: Vec<LineDraft>,
        settlement: Vec<CollectedItem>,
        skipped: Vec<SkippedComponent>,
    },
    Excluded {
        reason: String,
    },
}

/// Per-employee result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeRunStatus {
    /// Every line computed.
    Ok,
    /// At least one line carries an error breakdown.
    Error,
    /// Not computed at all.
    Excluded,
}

/// What happened to one employee in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeeRunDetail {
    /// The employee.
    pub employee_id: String,
    /// Outcome.
    pub status: EmployeeRunStatus,
    /// The payslip written, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payslip_id: Option<Uuid>,
    /// Lines written.
    pub lines: usize,
    /// Lines carrying an error breakdown.
    pub error_lines: usize,
    /// Why the employee was excluded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Targeted components that produced no line.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedComponent>,
}

/// Summary returned by cycle generation and group runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Employees whose lines all computed.
    pub processed: usize,
    /// Employees excluded or with at least one error line.
    pub errors: usize,
    /// Eligible employees considered.
    pub total: usize,
    /// One entry per eligible employee.
    pub details: Vec<EmployeeRunDetail>,
}

/// Computes lines for every eligible employee of the cycle.
///
/// Static values are always resolved over the employee's whole structure, so a
/// group run still sees components owned by other groups.
pub fn plan_run(
    tables: &Tables,
    cycle: &PayCycle,
    settings: &EngineSettings,
    scope: &RunScope<'_>,
) -> Vec<EmployeePlan> {
    let targets = scope.targets(tables, cycle);
    let run = RunContext::new(cycle, &settings.overtime);

    tables
        .eligible_employees(cycle)
        .map(|employee| {
            let Some(scheduled_hours) = employee.scheduled_hours() else {
                warn!(
                    cycle_id = %cycle.id,
                    employee_id = %employee.id,
                    "Employee has no shift assignment, excluded from run"
                );
                return EmployeePlan {
                    employee_id: employee.id.clone(),
                    outcome: PlanOutcome::Excluded {
                        reason: "no shift assignment".to_string(),
                    },
                };
            };

            let inputs = EmployeeInputs::collect(
                &employee.id,
                scheduled_hours,
                cycle,
                &tables.attendance,
                &tables.overtime,
            );
            let entries = tables.structure_of(&employee.id);
            let computation =
                compute_employee_lines(&run, &inputs, &entries, &tables.components, &targets);
            if computation.error_count() > 0 {
                warn!(
                    cycle_id = %cycle.id,
                    employee_id = %employee.id,
                    error_lines = computation.error_count(),
                    "Lines recorded with errors"
                );
            }

            let settlement = match scope {
                RunScope::Cycle => collect_all(tables, &employee.id, cycle),
                RunScope::Group(_) => Vec::new(),
            };

            EmployeePlan {
                employee_id: employee.id.clone(),
                outcome: PlanOutcome::Computed {
                    lines: computation.lines,
                    settlement,
                    skipped: computation.skipped,
                },
            }
        })
        .collect()
}

/// Writes planned lines, replacing the lines in scope.
///
/// A cycle-scope run replaces each payslip's lines and processed items
/// entirely and drops payslips of employees no longer computed. A group run
/// replaces only lines whose component belongs to the group.
pub fn apply_plans(
    tables: &mut Tables,
    cycle: &PayCycle,
    scope: &RunScope<'_>,
    plans: Vec<EmployeePlan>,
) -> RunSummary {
    let mut summary = RunSummary {
        total: plans.len(),
        ..RunSummary::default()
    };

    if let RunScope::Cycle = scope {
        let computed: HashSet<&str> = plans
            .iter()
            .filter(|p| matches!(p.outcome, PlanOutcome::Computed { .. }))
            .map(|p| p.employee_id.as_str())
            .collect();
        let stale: HashSet<Uuid> = tables
            .payslips
            .values()
            .filter(|p| p.cycle_id == cycle.id && !computed.contains(p.employee_id.as_str()))
            .map(|p| p.id)
            .collect();
        if !stale.is_empty() {
            debug!(cycle_id = %cycle.id, count = stale.len(), "Dropping stale payslips");
            tables.payslips.retain(|id, _| !stale.contains(id));
            tables.lines.retain(|l| !stale.contains(&l.payslip_id));
            tables
                .processed_items
                .retain(|i| !stale.contains(&i.payslip_id));
        }
    }

    let group_components: HashSet<ComponentId> = match scope {
        RunScope::Cycle => HashSet::new(),
        RunScope::Group(group) => group.component_ids.iter().copied().collect(),
    };
    // Another cycle may have claimed a source since the plan was read.
    let held = held_elsewhere(tables, cycle.id);

    for plan in plans {
        match plan.outcome {
            PlanOutcome::Excluded { reason } => {
                summary.errors += 1;
                summary.details.push(EmployeeRunDetail {
                    employee_id: plan.employee_id,
                    status: EmployeeRunStatus::Excluded,
                    payslip_id: None,
                    lines: 0,
                    error_lines: 0,
                    reason: Some(reason),
                    skipped: Vec::new(),
                });
            }
            PlanOutcome::Computed {
                lines,
                settlement,
                skipped,
            } => {
                let settlement: Vec<CollectedItem> = settlement
                    .into_iter()
                    .filter(|item| !held.contains(&item.source_key()))
                    .collect();
                let error_lines = lines.iter().filter(|l| l.is_error()).count();
                let line_count = lines.len() + settlement.len();
                let payslip_id = upsert_payslip(tables, cycle.id, &plan.employee_id);

                match scope {
                    RunScope::Cycle => {
                        tables.lines.retain(|l| l.payslip_id != payslip_id);
                        tables.processed_items.retain(|i| i.payslip_id != payslip_id);
                    }
                    RunScope::Group(_) => {
                        tables.lines.retain(|l| {
                            l.payslip_id != payslip_id
                                || !l
                                    .component_id
                                    .is_some_and(|c| group_components.contains(&c))
                        });
                    }
                }

                tables
                    .lines
                    .extend(lines.into_iter().map(|l| l.into_line(payslip_id)));
                for item in settlement {
                    let (line, processed) = item.into_parts(payslip_id);
                    tables.lines.push(line);
                    tables.processed_items.push(processed);
                }
                tables.refresh_totals(payslip_id);

                let status = if error_lines > 0 {
                    summary.errors += 1;
                    EmployeeRunStatus::Error
                } else {
                    summary.processed += 1;
                    EmployeeRunStatus::Ok
                };
                summary.details.push(EmployeeRunDetail {
                    employee_id: plan.employee_id,
                    status,
                    payslip_id: Some(payslip_id),
                    lines: line_count,
                    error_lines,
                    reason: None,
                    skipped,
                });
            }
        }
    }

    summary
}

fn upsert_payslip(tables: &mut Tables, cycle_id: Uuid, employee_id: &str) -> Uuid {
    if let Some(existing) = tables.payslip_for(cycle_id, employee_id) {
        return existing.id;
    }
    let payslip = Payslip {
        id: Uuid::new_v4(),
        cycle_id,
        employee_id: employee_id.to_string(),
        gross: Default::default(),
        deductions: Default::default(),
        net: Default::default(),
        status: PayslipStatus::Draft,
        updated_at: Utc::now(),
    };
    let id = payslip.id;
    tables.payslips.insert(id, payslip);
    id
}

/// Sets the status of every payslip of a cycle.
pub fn set_payslip_status(tables: &mut Tables, cycle_id: Uuid, status: PayslipStatus) -> usize {
    let mut count = 0;
    for payslip in tables.payslips.values_mut() {
        if payslip.cycle_id == cycle_id {
            payslip.status = status;
            count += 1;
        }
    }
    count
}
