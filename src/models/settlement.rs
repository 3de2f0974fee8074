//! External source records that payslips settle, and the processed-item
//! markers linking them to payslips.
//!
//! Each source record exposes an `is_ready` predicate (due, approved or
//! processed and not yet settled). The engine only reads them while computing;
//! their terminal state is written once, when the owning cycle is finalized.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a loan installment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    /// Not yet repaid.
    Pending,
    /// Repaid through payroll.
    Paid,
}

/// One scheduled repayment of an employee loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanInstallment {
    /// Unique identifier.
    pub id: i64,
    /// The borrowing employee.
    pub employee_id: String,
    /// The loan this installment belongs to.
    pub loan_reference: String,
    /// When the installment falls due.
    pub due_date: NaiveDate,
    /// Amount deducted from pay.
    pub amount: Decimal,
    /// Repayment state.
    pub status: InstallmentStatus,
}

impl LoanInstallment {
    /// Due on or before `as_of` and not yet paid.
    pub fn is_ready(&self, as_of: NaiveDate) -> bool {
        self.status == InstallmentStatus::Pending && self.due_date <= as_of
    }
}

/// Status of an HR case deduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HrCaseStatus {
    /// Under investigation; nothing to deduct yet.
    Open,
    /// Deduction approved.
    Approved,
    /// Deducted and closed.
    Closed,
}

/// A deduction raised by an HR case (damages, disciplinary fines).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HrCaseDeduction {
    /// Unique identifier.
    pub id: i64,
    /// The employee.
    pub employee_id: String,
    /// The HR case the deduction belongs to.
    pub case_reference: String,
    /// Amount deducted from pay.
    pub amount: Decimal,
    /// Case state.
    pub status: HrCaseStatus,
    /// Whether the deduction was synced back to the HR case.
    #[serde(default)]
    pub synced: bool,
}

impl HrCaseDeduction {
    /// Approved and not yet synced.
    pub fn is_ready(&self) -> bool {
        self.status == HrCaseStatus::Approved && !self.synced
    }
}

/// Status of an expense claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    /// Submitted, not yet approved.
    Submitted,
    /// Approved and processed by finance, awaiting payout.
    Processed,
    /// Paid out through a payslip.
    Reimbursed,
}

/// An expense claim reimbursed through payroll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseReimbursement {
    /// Unique identifier.
    pub id: i64,
    /// The claimant.
    pub employee_id: String,
    /// What the expense was for.
    pub description: String,
    /// Amount added to pay.
    pub amount: Decimal,
    /// Claim state.
    pub status: ExpenseStatus,
    /// The payslip that reimbursed the claim.
    #[serde(default)]
    pub payslip_id: Option<Uuid>,
}

impl ExpenseReimbursement {
    /// Processed and not linked to a payslip.
    pub fn is_ready(&self) -> bool {
        self.status == ExpenseStatus::Processed && self.payslip_id.is_none()
    }
}

/// The kind of source record a processed item points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// A [`LoanInstallment`].
    LoanInstallment,
    /// An [`HrCaseDeduction`].
    HrCaseDeduction,
    /// An [`ExpenseReimbursement`].
    ExpenseReimbursement,
}

/// Settlement state of a processed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessedItemStatus {
    /// Included in a draft payslip; source untouched.
    Processed,
    /// Source settled at cycle finalization.
    Finalized,
    /// Source was no longer ready at finalization; the line was zeroed.
    Released,
}

/// Links a payslip to one source record it pays or deducts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedItem {
    /// Unique identifier.
    pub id: Uuid,
    /// The payslip.
    pub payslip_id: Uuid,
    /// The payslip line carrying the amount.
    pub line_id: Uuid,
    /// Kind of source record.
    pub source: SourceKind,
    /// Identifier of the source record.
    pub source_id: i64,
    /// Amount carried onto the payslip.
    pub amount: Decimal,
    /// Settlement state.
    pub status: ProcessedItemStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    #[test]
    fn test_installment_ready_when_due_and_pending() {
        let mut installment = LoanInstallment {
            id: 1,
            employee_id: "emp_001".to_string(),
            loan_reference: "LN-1".to_string(),
            due_date: date(1, 31),
            amount: Decimal::from(200),
            status: InstallmentStatus::Pending,
        };
        assert!(installment.is_ready(date(1, 31)));
        assert!(!installment.is_ready(date(1, 30)));
        installment.status = InstallmentStatus::Paid;
        assert!(!installment.is_ready(date(1, 31)));
    }

    #[test]
    fn test_hr_case_ready_only_when_approved_and_unsynced() {
        let mut deduction = HrCaseDeduction {
            id: 1,
            employee_id: "emp_001".to_string(),
            case_reference: "HR-7".to_string(),
            amount: Decimal::from(50),
            status: HrCaseStatus::Open,
            synced: false,
        };
        assert!(!deduction.is_ready());
        deduction.status = HrCaseStatus::Approved;
        assert!(deduction.is_ready());
        deduction.synced = true;
        assert!(!deduction.is_ready());
    }

    #[test]
    fn test_expense_ready_only_when_processed_and_unlinked() {
        let mut claim = ExpenseReimbursement {
            id: 1,
            employee_id: "emp_001".to_string(),
            description: "Taxi".to_string(),
            amount: Decimal::from(30),
            status: ExpenseStatus::Submitted,
            payslip_id: None,
        };
        assert!(!claim.is_ready());
        claim.status = ExpenseStatus::Processed;
        assert!(claim.is_ready());
        claim.payslip_id = Some(Uuid::nil());
        assert!(!claim.is_ready());
    }
}
