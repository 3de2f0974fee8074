//! Loan installments deducted from pay.

use crate::models::{
    Breakdown, BreakdownDetail, ComponentKind, InstallmentStatus, LineDraft, PayCycle,
    ProcessedItem, SourceKind,
};
use crate::store::Tables;

use super::{CollectedItem, SettlementCollector};

/// Deducts installments due on or before the cycle end.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoanCollector;

impl SettlementCollector for LoanCollector {
    fn kind(&self) -> SourceKind {
        SourceKind::LoanInstallment
    }

    fn collect(
        &self,
        tables: &Tables,
        employee_id: &str,
        cycle: &PayCycle,
    ) -> Vec<CollectedItem> {
        tables
            .loans
            .iter()
            .filter(|l| l.employee_id == employee_id && l.is_ready(cycle.end_date))
            .map(|l| CollectedItem {
                line: LineDraft {
                    component_id: None,
                    name: format!("Loan installment ({})", l.loan_reference),
                    line_type: ComponentKind::Deduction,
                    amount: l.amount,
                    breakdown: Breakdown::new(BreakdownDetail::LoanInstallment {
                        installment_id: l.id,
                        loan_reference: l.loan_reference.clone(),
                        due_date: l.due_date,
                        amount: l.amount,
                    }),
                },
                source: SourceKind::LoanInstallment,
                source_id: l.id,
                amount: l.amount,
            })
            .collect()
    }

    fn settle(&self, tables: &mut Tables, item: &ProcessedItem, cycle: &PayCycle) -> bool {
        match tables
            .loans
            .iter_mut()
            .find(|l| l.id == item.source_id && l.is_ready(cycle.end_date))
        {
            Some(installment) => {
                installment.status = InstallmentStatus::Paid;
                true
            }
            None => false,
        }
    }
}
