//! In-process relational store.
//!
//! [`Tables`] holds every table the engine reads or writes. [`PayrollStore`]
//! guards them behind a read/write lock and applies writes transactionally: a
//! transaction runs against a working copy which replaces the committed
//! tables only if the closure succeeds and the integrity checks pass.

mod locks;
mod seed;

use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    AttendanceFact, AuditFlag, ComponentId, Employee, ExpenseReimbursement, GroupId,
    HrCaseDeduction, LoanInstallment, OvertimeRecord, PayComponent, PayCycle, PayGroup, Payslip,
    PayslipLine, PayslipTotals, ProcessedItem, SalaryStructureEntry,
};

pub use locks::LockRegistry;
pub use seed::StoreSeed;

/// All tables of the store.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    /// Pay components by id.
    pub components: BTreeMap<ComponentId, PayComponent>,
    /// Pay groups by id.
    pub groups: BTreeMap<GroupId, PayGroup>,
    /// Employees in seed order.
    pub employees: Vec<Employee>,
    /// Salary structure entries.
    pub structure: Vec<SalaryStructureEntry>,
    /// Attendance facts.
    pub attendance: Vec<AttendanceFact>,
    /// Overtime records.
    pub overtime: Vec<OvertimeRecord>,
    /// Loan installments.
    pub loans: Vec<LoanInstallment>,
    /// HR case deductions.
    pub hr_cases: Vec<HrCaseDeduction>,
    /// Expense claims.
    pub expenses: Vec<ExpenseReimbursement>,
    /// Pay cycles by id.
    pub cycles: BTreeMap<Uuid, PayCycle>,
    /// Payslips by id.
    pub payslips: BTreeMap<Uuid, Payslip>,
    /// Payslip lines.
    pub lines: Vec<PayslipLine>,
    /// Settlement markers.
    pub processed_items: Vec<ProcessedItem>,
    /// Audit flags in insertion order.
    pub flags: Vec<AuditFlag>,
}

impl Tables {
    /// Builds tables from seed data.
    pub fn from_seed(seed: StoreSeed) -> Self {
        Self {
            components: seed.components.into_iter().map(|c| (c.id, c)).collect(),
            groups: seed.groups.into_iter().map(|g| (g.id, g)).collect(),
            employees: seed.employees,
            structure: seed.structure,
            attendance: seed.attendance,
            overtime: seed.overtime,
            loans: seed.loans,
            hr_cases: seed.hr_cases,
            expenses: seed.expenses,
            ..Self::default()
        }
    }

    /// Looks up a cycle.
    pub fn cycle(&self, id: Uuid) -> EngineResult<&PayCycle> {
        self.cycles
            .get(&id)
            .ok_or_else(|| EngineError::not_found("Cycle", id))
    }

    /// Looks up a cycle for update.
    pub fn cycle_mut(&mut self, id: Uuid) -> EngineResult<&mut PayCycle> {
        self.cycles
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found("Cycle", id))
    }

    /// Looks up a group.
    pub fn group(&self, id: GroupId) -> EngineResult<&PayGroup> {
        self.groups
            .get(&id)
            .ok_or_else(|| EngineError::not_found("Group", id))
    }

    /// Employees eligible for a cycle, in seed order.
    pub fn eligible_employees<'a>(
        &'a self,
        cycle: &'a PayCycle,
    ) -> impl Iterator<Item = &'a Employee> + 'a {
        self.employees
            .iter()
            .filter(move |e| e.is_eligible_for(cycle))
    }

    /// An employee's salary structure entries.
    pub fn structure_of(&self, employee_id: &str) -> Vec<SalaryStructureEntry> {
        self.structure
            .iter()
            .filter(|s| s.employee_id == employee_id)
            .cloned()
            .collect()
    }

    /// The payslip of an employee in a cycle.
    pub fn payslip_for(&self, cycle_id: Uuid, employee_id: &str) -> Option<&Payslip> {
        self.payslips
            .values()
            .find(|p| p.cycle_id == cycle_id && p.employee_id == employee_id)
    }

    /// Ids of every payslip in a cycle.
    pub fn payslip_ids_of(&self, cycle_id: Uuid) -> HashSet<Uuid> {
        self.payslips
            .values()
            .filter(|p| p.cycle_id == cycle_id)
            .map(|p| p.id)
            .collect()
    }

    /// The lines of one payslip.
    pub fn lines_of(&self, payslip_id: Uuid) -> impl Iterator<Item = &PayslipLine> {
        self.lines.iter().filter(move |l| l.payslip_id == payslip_id)
    }

    /// Recomputes a payslip's totals from its current lines.
    pub fn refresh_totals(&mut self, payslip_id: Uuid) {
        let lines: Vec<_> = self.lines_of(payslip_id).cloned().collect();
        let totals = PayslipTotals::from_lines(&lines);
        if let Some(payslip) = self.payslips.get_mut(&payslip_id) {
            payslip.gross = totals.gross;
            payslip.deductions = totals.deductions;
            payslip.net = totals.net;
            payslip.updated_at = Utc::now();
        }
    }

    /// Checks cross-table invariants.
    pub fn check_integrity(&self) -> EngineResult<()> {
        let mut keys = HashSet::new();
        for payslip in self.payslips.values() {
            if !keys.insert((payslip.cycle_id, payslip.employee_id.as_str())) {
                return Err(EngineError::FatalTransaction {
                    message: format!(
                        "duplicate payslip for employee {} in cycle {}",
                        payslip.employee_id, payslip.cycle_id
                    ),
                });
            }
            if !self.cycles.contains_key(&payslip.cycle_id) {
                return Err(EngineError::FatalTransaction {
                    message: format!("payslip {} references a missing cycle", payslip.id),
                });
            }
        }
        if let Some(line) = self
            .lines
            .iter()
            .find(|l| !self.payslips.contains_key(&l.payslip_id))
        {
            return Err(EngineError::FatalTransaction {
                message: format!("line {} references a missing payslip", line.id),
            });
        }
        if let Some(item) = self
            .processed_items
            .iter()
            .find(|i| !self.payslips.contains_key(&i.payslip_id))
        {
            return Err(EngineError::FatalTransaction {
                message: format!("processed item {} references a missing payslip", item.id),
            });
        }
        let lines: HashSet<(Uuid, Uuid)> =
            self.lines.iter().map(|l| (l.id, l.payslip_id)).collect();
        if let Some(item) = self
            .processed_items
            .iter()
            .find(|i| !lines.contains(&(i.line_id, i.payslip_id)))
        {
            return Err(EngineError::FatalTransaction {
                message: format!("processed item {} references a missing line", item.id),
            });
        }
        Ok(())
    }
}

/// The shared store.
#[derive(Debug)]
pub struct PayrollStore {
    tables: RwLock<Tables>,
    cycle_locks: LockRegistry<Uuid>,
    group_locks: LockRegistry<(Uuid, GroupId)>,
}

impl PayrollStore {
    /// Creates a store holding the seed data.
    pub fn new(seed: StoreSeed) -> Self {
        Self {
            tables: RwLock::new(Tables::from_seed(seed)),
            cycle_locks: LockRegistry::new("cycle"),
            group_locks: LockRegistry::new("group run"),
        }
    }

    /// Runs a read-only query against the committed tables.
    pub fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> EngineResult<R> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(f(&tables))
    }

    /// Runs `f` as one all-or-nothing write.
    ///
    /// Nothing is committed if `f` fails or leaves the tables inconsistent.
    pub fn transaction<R>(&self, f: impl FnOnce(&mut Tables) -> EngineResult<R>) -> EngineResult<R> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let mut working = tables.clone();
        let result = f(&mut working)?;
        working.check_integrity()?;
        *tables = working;
        Ok(result)
    }

    /// Runs `f` holding the cycle's lock.
    pub fn with_cycle_lock<R>(
        &self,
        cycle_id: Uuid,
        f: impl FnOnce() -> EngineResult<R>,
    ) -> EngineResult<R> {
        self.cycle_locks.with(&cycle_id, f)
    }

    /// Runs `f` holding the (cycle, group) run lock.
    pub fn with_group_lock<R>(
        &self,
        cycle_id: Uuid,
        group_id: GroupId,
        f: impl FnOnce() -> EngineResult<R>,
    ) -> EngineResult<R> {
        self.group_locks.with(&(cycle_id, group_id), f)
    }
}

fn poisoned() -> EngineError {
    EngineError::FatalTransaction {
        message: "store lock poisoned".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CycleStatus, PayslipStatus};
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    fn cycle() -> PayCycle {
        PayCycle {
            id: Uuid::new_v4(),
            name: "January 2025".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            status: CycleStatus::Draft,
            group_ids: vec![1],
            created_at: Utc::now(),
            finalized_at: None,
            paid_at: None,
        }
    }

    fn payslip(cycle_id: Uuid, employee_id: &str) -> Payslip {
        Payslip {
            id: Uuid::new_v4(),
            cycle_id,
            employee_id: employee_id.to_string(),
            gross: Decimal::ZERO,
            deductions: Decimal::ZERO,
            net: Decimal::ZERO,
            status: PayslipStatus::Draft,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_transaction_commits_on_success() {
        let store = PayrollStore::new(StoreSeed::default());
        let cycle = cycle();
        let id = cycle.id;
        store
            .transaction(|t| {
                t.cycles.insert(cycle.id, cycle);
                Ok(())
            })
            .unwrap();
        assert!(store.read(|t| t.cycle(id).is_ok()).unwrap());
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let store = PayrollStore::new(StoreSeed::default());
        let cycle = cycle();
        let result: EngineResult<()> = store.transaction(|t| {
            t.cycles.insert(cycle.id, cycle);
            Err(EngineError::validation("name", "rejected"))
        });
        assert!(result.is_err());
        assert!(store.read(|t| t.cycles.is_empty()).unwrap());
    }

    #[test]
    fn test_duplicate_payslip_aborts_transaction() {
        let store = PayrollStore::new(StoreSeed::default());
        let cycle = cycle();
        let cycle_id = cycle.id;
        let result = store.transaction(|t| {
            t.cycles.insert(cycle.id, cycle);
            for _ in 0..2 {
                let p = payslip(cycle_id, "emp_001");
                t.payslips.insert(p.id, p);
            }
            Ok(())
        });
        assert!(matches!(result, Err(EngineError::FatalTransaction { .. })));
        assert!(store.read(|t| t.payslips.is_empty()).unwrap());
    }

    #[test]
    fn test_missing_cycle_is_not_found() {
        let tables = Tables::default();
        assert!(matches!(
            tables.cycle(Uuid::nil()),
            Err(EngineError::NotFound { resource: "Cycle", .. })
        ));
    }
}
