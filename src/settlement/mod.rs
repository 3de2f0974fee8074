//! Settlement of external source records through payslips.
//!
//! Collection is read-only: each [`SettlementCollector`] selects the ready
//! source rows of one employee and turns them into a line draft plus the data
//! for a processed item. Source rows change state only in
//! [`finalize_cycle_items`], once per processed item, and only while the
//! item is still `processed` and its source is still ready. A source carried
//! by a `processed` item of one cycle is not collected by any other cycle.

mod expense;
mod hr_case;
mod loan;

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::models::{
    Breakdown, LineDraft, PayCycle, PayslipLine, ProcessedItem, ProcessedItemStatus, SourceKind,
};
use crate::store::Tables;

pub use expense::ExpenseCollector;
pub use hr_case::HrCaseCollector;
pub use loan::LoanCollector;

/// A ready source record turned into a payslip line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedItem {
    /// The line to add to the payslip.
    pub line: LineDraft,
    /// Kind of source record.
    pub source: SourceKind,
    /// Identifier of the source record.
    pub source_id: i64,
    /// Amount carried onto the payslip.
    pub amount: Decimal,
}

impl CollectedItem {
    /// Attaches the item to a payslip, yielding its line and processed item.
    pub fn into_parts(self, payslip_id: Uuid) -> (PayslipLine, ProcessedItem) {
        let line = self.line.into_line(payslip_id);
        let item = ProcessedItem {
            id: Uuid::new_v4(),
            payslip_id,
            line_id: line.id,
            source: self.source,
            source_id: self.source_id,
            amount: self.amount,
            status: ProcessedItemStatus::Processed,
        };
        (line, item)
    }

    /// The source record this item points at.
    pub fn source_key(&self) -> (SourceKind, i64) {
        (self.source, self.source_id)
    }
}

/// Reads and settles one kind of source record.
pub trait SettlementCollector: Send + Sync {
    /// The kind of source record handled.
    fn kind(&self) -> SourceKind;

    /// Returns the employee's ready records as payslip items without
    /// modifying anything.
    fn collect(&self, tables: &Tables, employee_id: &str, cycle: &PayCycle)
    -> Vec<CollectedItem>;

    /// Moves the item's source record to its settled state.
    ///
    /// Returns false, changing nothing, when the source no longer exists or is
    /// no longer ready.
    fn settle(&self, tables: &mut Tables, item: &ProcessedItem, cycle: &PayCycle) -> bool;
}

static COLLECTORS: [&dyn SettlementCollector; 3] =
    [&LoanCollector, &HrCaseCollector, &ExpenseCollector];

/// Every registered collector.
pub fn collectors() -> &'static [&'static dyn SettlementCollector] {
    &COLLECTORS
}

fn collector_for(kind: SourceKind) -> Option<&'static dyn SettlementCollector> {
    collectors().iter().copied().find(|c| c.kind() == kind)
}

/// Source records carried by a still-processed item of any other cycle.
pub fn held_elsewhere(tables: &Tables, cycle_id: Uuid) -> HashSet<(SourceKind, i64)> {
    tables
        .processed_items
        .iter()
        .filter(|item| item.status == ProcessedItemStatus::Processed)
        .filter(|item| {
            tables
                .payslips
                .get(&item.payslip_id)
                .is_some_and(|p| p.cycle_id != cycle_id)
        })
        .map(|item| (item.source, item.source_id))
        .collect()
}

/// Collects every ready source record of an employee that no other cycle
/// already carries.
pub fn collect_all(tables: &Tables, employee_id: &str, cycle: &PayCycle) -> Vec<CollectedItem> {
    let held = held_elsewhere(tables, cycle.id);
    collectors()
        .iter()
        .flat_map(|c| c.collect(tables, employee_id, cycle))
        .filter(|item| !held.contains(&item.source_key()))
        .collect()
}

/// Outcome of settling a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SettlementSummary {
    /// Items whose source was settled.
    pub settled: usize,
    /// Items released because their source was no longer ready; their lines
    /// were zeroed.
    pub skipped: usize,
}

/// Settles every still-processed item of a cycle's payslips.
///
/// An item whose source can no longer be settled is released: its line drops
/// to zero with a settlement error breakdown and the payslip totals are
/// recomputed, so nothing is deducted or paid twice.
pub fn finalize_cycle_items(tables: &mut Tables, cycle: &PayCycle) -> SettlementSummary {
    let payslip_ids = tables.payslip_ids_of(cycle.id);
    let pending: Vec<usize> = tables
        .processed_items
        .iter()
        .enumerate()
        .filter(|(_, item)| {
            item.status == ProcessedItemStatus::Processed && payslip_ids.contains(&item.payslip_id)
        })
        .map(|(index, _)| index)
        .collect();

    let mut summary = SettlementSummary::default();
    let mut touched = HashSet::new();
    for index in pending {
        let item = tables.processed_items[index].clone();
        let settled = collector_for(item.source)
            .map(|collector| collector.settle(tables, &item, cycle))
            .unwrap_or(false);
        if settled {
            tables.processed_items[index].status = ProcessedItemStatus::Finalized;
            summary.settled += 1;
        } else {
            warn!(
                cycle_id = %cycle.id,
                source = ?item.source,
                source_id = item.source_id,
                "Source no longer ready, releasing item"
            );
            release(tables, &item);
            tables.processed_items[index].status = ProcessedItemStatus::Released;
            touched.insert(item.payslip_id);
            summary.skipped += 1;
        }
    }
    for payslip_id in touched {
        tables.refresh_totals(payslip_id);
    }
    summary
}

fn release(tables: &mut Tables, item: &ProcessedItem) {
    if let Some(line) = tables.lines.iter_mut().find(|l| l.id == item.line_id) {
        line.amount = Decimal::ZERO;
        line.breakdown = Breakdown::error(
            "settlement",
            None,
            format!(
                "{:?} {} was settled elsewhere; {} not applied",
                item.source, item.source_id, item.amount
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BreakdownDetail, CycleStatus, ExpenseReimbursement, ExpenseStatus, HrCaseDeduction,
        HrCaseStatus, InstallmentStatus, LoanInstallment, Payslip, PayslipStatus,
    };
    use chrono::{NaiveDate, Utc};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn cycle() -> PayCycle {
        PayCycle {
            id: Uuid::new_v4(),
            name: "January 2025".to_string(),
            start_date: date(1, 1),
            end_date: date(1, 31),
            status: CycleStatus::Review,
            group_ids: vec![1],
            created_at: Utc::now(),
            finalized_at: None,
            paid_at: None,
        }
    }

    fn tables() -> Tables {
        Tables {
            loans: vec![
                LoanInstallment {
                    id: 1,
                    employee_id: "emp_001".to_string(),
                    loan_reference: "LN-100".to_string(),
                    due_date: date(1, 25),
                    amount: dec("200"),
                    status: InstallmentStatus::Pending,
                },
                LoanInstallment {
                    id: 2,
                    employee_id: "emp_001".to_string(),
                    loan_reference: "LN-100".to_string(),
                    due_date: date(2, 25),
                    amount: dec("200"),
                    status: InstallmentStatus::Pending,
                },
            ],
            hr_cases: vec![HrCaseDeduction {
                id: 1,
                employee_id: "emp_001".to_string(),
                case_reference: "HR-7".to_string(),
                amount: dec("75.50"),
                status: HrCaseStatus::Approved,
                synced: false,
            }],
            expenses: vec![ExpenseReimbursement {
                id: 1,
                employee_id: "emp_001".to_string(),
                description: "Client travel".to_string(),
                amount: dec("120"),
                status: ExpenseStatus::Processed,
                payslip_id: None,
            }],
            ..Tables::default()
        }
    }

    fn attach(tables: &mut Tables, cycle: &PayCycle, items: Vec<CollectedItem>) -> Uuid {
        let payslip = Payslip {
            id: Uuid::new_v4(),
            cycle_id: cycle.id,
            employee_id: "emp_001".to_string(),
            gross: Decimal::ZERO,
            deductions: Decimal::ZERO,
            net: Decimal::ZERO,
            status: PayslipStatus::Draft,
            updated_at: Utc::now(),
        };
        let payslip_id = payslip.id;
        tables.cycles.insert(cycle.id, cycle.clone());
        tables.payslips.insert(payslip.id, payslip);
        for item in items {
            let (line, processed) = item.into_parts(payslip_id);
            tables.lines.push(line);
            tables.processed_items.push(processed);
        }
        payslip_id
    }

    #[test]
    fn test_collection_is_read_only() {
        let tables = tables();
        let before = tables.clone();
        let items = collect_all(&tables, "emp_001", &cycle());

        assert_eq!(items.len(), 3);
        assert_eq!(tables.loans, before.loans);
        assert_eq!(tables.hr_cases, before.hr_cases);
        assert_eq!(tables.expenses, before.expenses);
    }

    #[test]
    fn test_collects_only_ready_records() {
        let tables = tables();
        let items = collect_all(&tables, "emp_001", &cycle());
        let loans: Vec<_> = items
            .iter()
            .filter(|i| i.source == SourceKind::LoanInstallment)
            .collect();
        assert_eq!(loans.len(), 1);
        assert_eq!(loans[0].source_id, 1);
        assert!(collect_all(&tables, "emp_002", &cycle()).is_empty());
    }

    #[test]
    fn test_finalize_settles_each_source_once() {
        let mut tables = tables();
        let cycle = cycle();
        let items = collect_all(&tables, "emp_001", &cycle);
        let payslip_id = attach(&mut tables, &cycle, items);

        let first = finalize_cycle_items(&mut tables, &cycle);
        assert_eq!(first.settled, 3);
        assert_eq!(tables.loans[0].status, InstallmentStatus::Paid);
        assert_eq!(tables.loans[1].status, InstallmentStatus::Pending);
        assert_eq!(tables.hr_cases[0].status, HrCaseStatus::Closed);
        assert!(tables.hr_cases[0].synced);
        assert_eq!(tables.expenses[0].status, ExpenseStatus::Reimbursed);
        assert_eq!(tables.expenses[0].payslip_id, Some(payslip_id));
        assert!(
            tables
                .processed_items
                .iter()
                .all(|i| i.status == ProcessedItemStatus::Finalized)
        );

        let second = finalize_cycle_items(&mut tables, &cycle);
        assert_eq!(second, SettlementSummary::default());
    }

    #[test]
    fn test_source_settled_elsewhere_is_released() {
        let mut tables = tables();
        let cycle = cycle();
        let items = collect_all(&tables, "emp_001", &cycle);
        let payslip_id = attach(&mut tables, &cycle, items);
        tables.loans[0].status = InstallmentStatus::Paid;

        let summary = finalize_cycle_items(&mut tables, &cycle);
        assert_eq!(summary.settled, 2);
        assert_eq!(summary.skipped, 1);
        let loan_item = tables
            .processed_items
            .iter()
            .find(|i| i.source == SourceKind::LoanInstallment)
            .unwrap();
        assert_eq!(loan_item.status, ProcessedItemStatus::Released);

        let line = tables.lines.iter().find(|l| l.id == loan_item.line_id).unwrap();
        assert_eq!(line.amount, Decimal::ZERO);
        match &line.breakdown.detail {
            BreakdownDetail::Error { stage, .. } => assert_eq!(stage, "settlement"),
            other => panic!("Expected settlement error breakdown, got {:?}", other),
        }

        // Only the HR case is deducted; the expense is paid.
        let payslip = &tables.payslips[&payslip_id];
        assert_eq!(payslip.gross, dec("120"));
        assert_eq!(payslip.deductions, dec("75.50"));
        assert_eq!(payslip.net, dec("44.50"));
        assert!(tables.check_integrity().is_ok());
    }

    #[test]
    fn test_sources_held_by_another_cycle_are_not_collected() {
        let mut tables = tables();
        let first = cycle();
        let items = collect_all(&tables, "emp_001", &first);
        attach(&mut tables, &first, items);

        let second = PayCycle {
            id: Uuid::new_v4(),
            group_ids: vec![1, 2],
            ..first.clone()
        };
        assert!(collect_all(&tables, "emp_001", &second).is_empty());
        // The owning cycle still sees its own items on regeneration.
        assert_eq!(collect_all(&tables, "emp_001", &first).len(), 3);

        finalize_cycle_items(&mut tables, &first);
        assert!(collect_all(&tables, "emp_001", &second).is_empty());
    }
}
