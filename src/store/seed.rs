//! Seed data loaded into a fresh store.

use serde::{Deserialize, Serialize};

use crate::models::{
    AttendanceFact, Employee, ExpenseReimbursement, HrCaseDeduction, LoanInstallment,
    OvertimeRecord, PayComponent, PayGroup, SalaryStructureEntry,
};

/// Configuration and external source records as read from `seed.yaml`.
///
/// Every table is optional in the file and defaults to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSeed {
    /// Pay components.
    #[serde(default)]
    pub components: Vec<PayComponent>,
    /// Pay groups.
    #[serde(default)]
    pub groups: Vec<PayGroup>,
    /// Employees.
    #[serde(default)]
    pub employees: Vec<Employee>,
    /// Salary structure entries.
    #[serde(default)]
    pub structure: Vec<SalaryStructureEntry>,
    /// Attendance facts.
    #[serde(default)]
    pub attendance: Vec<AttendanceFact>,
    /// Overtime records.
    #[serde(default)]
    pub overtime: Vec<OvertimeRecord>,
    /// Loan installments.
    #[serde(default)]
    pub loans: Vec<LoanInstallment>,
    /// HR case deductions.
    #[serde(default)]
    pub hr_cases: Vec<HrCaseDeduction>,
    /// Expense claims.
    #[serde(default)]
    pub expenses: Vec<ExpenseReimbursement>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_empty_seed() {
        let seed: StoreSeed = serde_yaml::from_str("{}").unwrap();
        assert_eq!(seed, StoreSeed::default());
    }

    #[test]
    fn test_partial_seed_parses() {
        let yaml = r#"
components:
  - id: 1
    name: Basic Salary
    kind: earning
    prorate: true
groups:
  - id: 10
    name: Core
    component_ids: [1]
"#;
        let seed: StoreSeed = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(seed.components.len(), 1);
        assert!(seed.components[0].prorate);
        assert_eq!(seed.groups[0].component_ids, vec![1]);
        assert!(seed.employees.is_empty());
    }
}
