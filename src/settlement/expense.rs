//! Processed expense claims reimbursed through pay.

use crate::models::{
    Breakdown, BreakdownDetail, ComponentKind, ExpenseStatus, LineDraft, PayCycle, ProcessedItem,
    SourceKind,
};
use crate::store::Tables;

use super::{CollectedItem, SettlementCollector};

/// Pays processed claims not yet linked to a payslip. Settling marks the claim
/// reimbursed and links it to the payslip that paid it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpenseCollector;

impl SettlementCollector for ExpenseCollector {
    fn kind(&self) -> SourceKind {
        SourceKind::ExpenseReimbursement
    }

    fn collect(
        &self,
        tables: &Tables,
        employee_id: &str,
        _cycle: &PayCycle,
    ) -> Vec<CollectedItem> {
        tables
            .expenses
            .iter()
            .filter(|e| e.employee_id == employee_id && e.is_ready())
            .map(|e| CollectedItem {
                line: LineDraft {
                    component_id: None,
                    name: format!("Expense reimbursement ({})", e.description),
                    line_type: ComponentKind::Earning,
                    amount: e.amount,
                    breakdown: Breakdown::new(BreakdownDetail::ExpenseReimbursement {
                        expense_id: e.id,
                        description: e.description.clone(),
                        amount: e.amount,
                    }),
                },
                source: SourceKind::ExpenseReimbursement,
                source_id: e.id,
                amount: e.amount,
            })
            .collect()
    }

    fn settle(&self, tables: &mut Tables, item: &ProcessedItem, _cycle: &PayCycle) -> bool {
        let Some(expense) = tables
            .expenses
            .iter_mut()
            .find(|e| e.id == item.source_id && e.is_ready())
        else {
            return false;
        };
        expense.status = ExpenseStatus::Reimbursed;
        expense.payslip_id = Some(item.payslip_id);
        true
    }
}
