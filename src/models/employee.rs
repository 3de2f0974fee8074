//! Employee model and shift assignment.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PayCycle;

/// The shift an employee is scheduled on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftAssignment {
    /// The shift's name (e.g. "Day 9-5").
    pub name: String,
    /// Scheduled working hours per day.
    pub scheduled_hours: Decimal,
}

/// Represents an employee paid through pay cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Unique identifier for the employee.
    pub id: String,
    /// Full name.
    pub name: String,
    /// Whether the employee is currently employed.
    #[serde(default = "default_true")]
    pub active: bool,
    /// Employees exempt from payroll are never paid through cycles.
    #[serde(default)]
    pub payroll_exempt: bool,
    /// First day of employment.
    pub joined_on: NaiveDate,
    /// The employee's shift, if one has been assigned.
    #[serde(default)]
    pub shift: Option<ShiftAssignment>,
    /// Whether bank details are on file. The details themselves live elsewhere.
    #[serde(default)]
    pub has_bank_details: bool,
}

fn default_true() -> bool {
    true
}

impl Employee {
    /// Returns true if the employee should be paid in the given cycle:
    /// active, not payroll-exempt and joined on or before the cycle end.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{NaiveDate, Utc};
    /// use payroll_engine::models::{CycleStatus, Employee, PayCycle};
    /// use uuid::Uuid;
    ///
    /// let cycle = PayCycle {
    ///     id: Uuid::nil(),
    ///     name: "January".to_string(),
    ///     start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
    ///     end_date: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
    ///     status: CycleStatus::Draft,
    ///     group_ids: vec![1],
    ///     created_at: Utc::now(),
    ///     finalized_at: None,
    ///     paid_at: None,
    /// };
    /// let employee = Employee {
    ///     id: "emp_001".to_string(),
    ///     name: "Ada".to_string(),
    ///     active: true,
    ///     payroll_exempt: false,
    ///     joined_on: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
    ///     shift: None,
    ///     has_bank_details: true,
    /// };
    /// assert!(employee.is_eligible_for(&cycle));
    /// ```
    pub fn is_eligible_for(&self, cycle: &PayCycle) -> bool {
        self.active && !self.payroll_exempt && self.joined_on <= cycle.end_date
    }

    /// Returns the scheduled hours per day, if a shift is assigned.
    pub fn scheduled_hours(&self) -> Option<Decimal> {
        self.shift.as_ref().map(|s| s.scheduled_hours)
    }
}
