//! Approved HR case deductions.

use crate::models::{
    Breakdown, BreakdownDetail, ComponentKind, HrCaseStatus, LineDraft, PayCycle, ProcessedItem,
    SourceKind,
};
use crate::store::Tables;

use super::{CollectedItem, SettlementCollector};

/// Deducts approved, unsynced HR case amounts; settling closes the case.
#[derive(Debug, Clone, Copy, Default)]
pub struct HrCaseCollector;

impl SettlementCollector for HrCaseCollector {
    fn kind(&self) -> SourceKind {
        SourceKind::HrCaseDeduction
    }

    fn collect(
        &self,
        tables: &Tables,
        employee_id: &str,
        _cycle: &PayCycle,
    ) -> Vec<CollectedItem> {
        tables
            .hr_cases
            .iter()
            .filter(|d| d.employee_id == employee_id && d.is_ready())
            .map(|d| CollectedItem {
                line: LineDraft {
                    component_id: None,
                    name: format!("HR case deduction ({})", d.case_reference),
                    line_type: ComponentKind::Deduction,
                    amount: d.amount,
                    breakdown: Breakdown::new(BreakdownDetail::HrCaseDeduction {
                        deduction_id: d.id,
                        case_reference: d.case_reference.clone(),
                        amount: d.amount,
                    }),
                },
                source: SourceKind::HrCaseDeduction,
                source_id: d.id,
                amount: d.amount,
            })
            .collect()
    }

    fn settle(&self, tables: &mut Tables, item: &ProcessedItem, _cycle: &PayCycle) -> bool {
        let Some(deduction) = tables
            .hr_cases
            .iter_mut()
            .find(|d| d.id == item.source_id && d.is_ready())
        else {
            return false;
        };
        deduction.status = HrCaseStatus::Closed;
        deduction.synced = true;
        true
    }
}
