//! Audit gate: data-quality checks over a cycle's eligible employees.
//!
//! Detection produces findings keyed by (employee, flag type, description).
//! Recording inserts only findings that are not already open with the same
//! key; flags are never deleted and never closed automatically.

use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{ApprovalStatus, AuditFlag, ComponentId, FlagStatus, FlagType, PayCycle};
use crate::store::Tables;

/// One detected issue, before it is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// The employee.
    pub employee_id: String,
    /// The check.
    pub flag_type: FlagType,
    /// What is wrong.
    pub description: String,
}

/// Result of recording an audit pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    /// The cycle.
    pub cycle_id: Uuid,
    /// Findings detected in this pass.
    pub detected: usize,
    /// Flags newly inserted by this pass.
    pub inserted: Vec<AuditFlag>,
    /// Open flags on the cycle after the pass.
    pub open_flags: usize,
    /// True when no flag is open.
    pub clear: bool,
}

/// Runs every check against the cycle.
pub fn detect(tables: &Tables, cycle: &PayCycle) -> Vec<Finding> {
    let group_components: Vec<ComponentId> = {
        let mut seen = HashSet::new();
        cycle
            .group_ids
            .iter()
            .filter_map(|id| tables.groups.get(id))
            .flat_map(|g| g.component_ids.iter().copied())
            .filter(|id| seen.insert(*id))
            .collect()
    };

    let mut findings = Vec::new();
    for employee in tables.eligible_employees(cycle) {
        let mut push = |flag_type: FlagType, description: String| {
            findings.push(Finding {
                employee_id: employee.id.clone(),
                flag_type,
                description,
            })
        };

        let attendance: Vec<_> = tables
            .attendance
            .iter()
            .filter(|a| a.employee_id == employee.id && cycle.contains_date(a.date))
            .collect();

        if attendance.is_empty() {
            push(
                FlagType::MissingAttendance,
                format!(
                    "No attendance recorded between {} and {}",
                    cycle.start_date, cycle.end_date
                ),
            );
        }

        for record in tables.overtime.iter().filter(|o| {
            o.employee_id == employee.id
                && o.status == ApprovalStatus::Pending
                && cycle.contains_date(o.date)
        }) {
            push(
                FlagType::UnapprovedOvertime,
                format!(
                    "Overtime record {} ({} hours on {}) is pending approval",
                    record.id, record.hours, record.date
                ),
            );
        }

        let assigned: HashSet<ComponentId> = tables
            .structure
            .iter()
            .filter(|s| s.employee_id == employee.id)
            .map(|s| s.component_id)
            .collect();
        for component_id in group_components.iter().filter(|c| !assigned.contains(c)) {
            let name = tables
                .components
                .get(component_id)
                .map(|c| c.name.as_str())
                .unwrap_or("unconfigured");
            push(
                FlagType::MissingStructureComponent,
                format!(
                    "No salary structure entry for component {} ({})",
                    component_id, name
                ),
            );
        }

        for fact in attendance.iter().filter(|a| a.is_missing_punch_out()) {
            push(
                FlagType::MissingPunchOut,
                format!("Missing punch-out on {}", fact.date),
            );
        }

        if !employee.has_bank_details {
            push(
                FlagType::MissingBankDetails,
                "No bank details on file".to_string(),
            );
        }
    }
    findings
}

/// Inserts findings that are not already open with the same key.
pub fn record(tables: &mut Tables, cycle_id: Uuid, findings: &[Finding]) -> Vec<AuditFlag> {
    let mut inserted = Vec::new();
    for finding in findings {
        let already_open = tables.flags.iter().any(|f| {
            f.is_open_with_key(
                cycle_id,
                &finding.employee_id,
                finding.flag_type,
                &finding.description,
            )
        });
        if already_open {
            continue;
        }
        let flag = AuditFlag {
            id: Uuid::new_v4(),
            cycle_id,
            employee_id: finding.employee_id.clone(),
            flag_type: finding.flag_type,
            description: finding.description.clone(),
            status: FlagStatus::Open,
            created_at: Utc::now(),
            resolved_at: None,
            resolution_note: None,
        };
        tables.flags.push(flag.clone());
        inserted.push(flag);
    }
    inserted
}

/// Number of open flags on a cycle.
pub fn open_flag_count(tables: &Tables, cycle_id: Uuid) -> usize {
    tables
        .flags
        .iter()
        .filter(|f| f.cycle_id == cycle_id && f.status == FlagStatus::Open)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AttendanceFact, CalculationRule, ComponentKind, CycleStatus, DayStatus, Employee,
        OvertimeKind, OvertimeRecord, PayComponent, PayGroup, SalaryStructureEntry,
        ShiftAssignment,
    };
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn cycle() -> PayCycle {
        PayCycle {
            id: Uuid::new_v4(),
            name: "January 2025".to_string(),
            start_date: date(1),
            end_date: date(31),
            status: CycleStatus::Auditing,
            group_ids: vec![1],
            created_at: Utc::now(),
            finalized_at: None,
            paid_at: None,
        }
    }

    fn employee(id: &str, bank: bool) -> Employee {
        Employee {
            id: id.to_string(),
            name: id.to_string(),
            active: true,
            payroll_exempt: false,
            joined_on: date(1),
            shift: Some(ShiftAssignment {
                name: "Day".to_string(),
                scheduled_hours: Decimal::from(8),
            }),
            has_bank_details: bank,
        }
    }

    fn tables() -> Tables {
        let mut tables = Tables::default();
        tables.components.insert(
            1,
            PayComponent {
                id: 1,
                name: "Basic Salary".to_string(),
                kind: ComponentKind::Earning,
                prorate: true,
            },
        );
        tables.components.insert(
            2,
            PayComponent {
                id: 2,
                name: "Provident Fund".to_string(),
                kind: ComponentKind::Deduction,
                prorate: false,
            },
        );
        tables.groups.insert(
            1,
            PayGroup {
                id: 1,
                name: "Core".to_string(),
                component_ids: vec![1, 2],
            },
        );
        tables.employees = vec![employee("emp_001", true), employee("emp_002", false)];
        tables.structure = vec![
            SalaryStructureEntry {
                employee_id: "emp_001".to_string(),
                component_id: 1,
                rule: CalculationRule::Fixed {
                    amount: Decimal::from(3100),
                },
            },
            SalaryStructureEntry {
                employee_id: "emp_001".to_string(),
                component_id: 2,
                rule: CalculationRule::Fixed {
                    amount: Decimal::from(100),
                },
            },
        ];
        tables.attendance = vec![AttendanceFact {
            employee_id: "emp_001".to_string(),
            date: date(2),
            status: DayStatus::Present,
            regular_hours: Decimal::from(8),
            scheduled_hours: Decimal::from(8),
            punch_in: date(2).and_hms_opt(9, 0, 0),
            punch_out: None,
        }];
        tables.overtime = vec![OvertimeRecord {
            id: 9,
            employee_id: "emp_001".to_string(),
            date: date(3),
            hours: Decimal::from(2),
            kind: OvertimeKind::Regular,
            status: ApprovalStatus::Pending,
        }];
        tables
    }

    fn count(findings: &[Finding], employee: &str, flag_type: FlagType) -> usize {
        findings
            .iter()
            .filter(|f| f.employee_id == employee && f.flag_type == flag_type)
            .count()
    }

    #[test]
    fn test_detects_each_check() {
        let tables = tables();
        let findings = detect(&tables, &cycle());

        assert_eq!(count(&findings, "emp_001", FlagType::MissingPunchOut), 1);
        assert_eq!(count(&findings, "emp_001", FlagType::UnapprovedOvertime), 1);
        assert_eq!(count(&findings, "emp_001", FlagType::MissingAttendance), 0);
        assert_eq!(count(&findings, "emp_001", FlagType::MissingBankDetails), 0);
        assert_eq!(count(&findings, "emp_002", FlagType::MissingAttendance), 1);
        assert_eq!(count(&findings, "emp_002", FlagType::MissingBankDetails), 1);
        assert_eq!(
            count(&findings, "emp_002", FlagType::MissingStructureComponent),
            2
        );
    }

    #[test]
    fn test_ineligible_employees_are_not_checked() {
        let mut tables = tables();
        tables.employees[1].payroll_exempt = true;
        let findings = detect(&tables, &cycle());
        assert!(findings.iter().all(|f| f.employee_id == "emp_001"));
    }

    #[test]
    fn test_recording_twice_inserts_no_duplicates() {
        let mut tables = tables();
        let cycle = cycle();
        let findings = detect(&tables, &cycle);

        let first = record(&mut tables, cycle.id, &findings);
        let second = record(&mut tables, cycle.id, &findings);
        assert_eq!(first.len(), findings.len());
        assert!(second.is_empty());
        assert_eq!(open_flag_count(&tables, cycle.id), findings.len());
    }

    #[test]
    fn test_resolved_flag_is_raised_again_when_still_detected() {
        let mut tables = tables();
        let cycle = cycle();
        let findings = detect(&tables, &cycle);
        record(&mut tables, cycle.id, &findings);
        tables.flags[0].status = FlagStatus::Resolved;

        let again = record(&mut tables, cycle.id, &findings);
        assert_eq!(again.len(), 1);
        assert_eq!(tables.flags.len(), findings.len() + 1);
    }
}
