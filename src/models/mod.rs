//! Core data models for the payroll engine.
//!
//! This module contains all the domain models used throughout the engine.

mod attendance;
mod audit;
mod component;
mod cycle;
mod employee;
mod payslip;
mod settlement;

pub use attendance::{
    ApprovalStatus, AttendanceAggregate, AttendanceFact, DayStatus, OvertimeKind, OvertimeRecord,
};
pub use audit::{AuditFlag, FlagStatus, FlagType};
pub use component::{
    CalculationRule, ComponentId, ComponentKind, FormulaToken, PayComponent, SalaryStructureEntry,
};
pub use cycle::{CycleStatus, GroupId, PayCycle, PayGroup};
pub use employee::{Employee, ShiftAssignment};
pub use payslip::{
    BREAKDOWN_SCHEMA_VERSION, Breakdown, BreakdownDetail, LineDraft, Payslip, PayslipLine,
    PayslipStatus, PayslipTotals,
};
pub use settlement::{
    ExpenseReimbursement, ExpenseStatus, HrCaseDeduction, HrCaseStatus, InstallmentStatus,
    LoanInstallment, ProcessedItem, ProcessedItemStatus, SourceKind,
};
