//! Attendance facts and overtime records.
//!
//! Both are produced by external collaborators (punch capture, overtime
//! approval) and are read-only to the engine.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The kind of day an attendance fact records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    /// Worked a normal day.
    Present,
    /// Worked part of the day.
    HalfDay,
    /// Did not attend.
    Absent,
    /// On approved leave.
    Leave,
    /// Public holiday.
    Holiday,
    /// Rostered day off.
    Weekend,
}

/// One employee-day of attendance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceFact {
    /// The employee.
    pub employee_id: String,
    /// The day.
    pub date: NaiveDate,
    /// The kind of day.
    pub status: DayStatus,
    /// Regular (non-overtime) hours credited for the day.
    #[serde(default)]
    pub regular_hours: Decimal,
    /// Hours the shift scheduled for the day.
    #[serde(default)]
    pub scheduled_hours: Decimal,
    /// First punch of the day.
    #[serde(default)]
    pub punch_in: Option<NaiveDateTime>,
    /// Last punch of the day.
    #[serde(default)]
    pub punch_out: Option<NaiveDateTime>,
}

impl AttendanceFact {
    /// Returns true if the employee punched in but never punched out.
    pub fn is_missing_punch_out(&self) -> bool {
        self.punch_in.is_some() && self.punch_out.is_none()
    }
}

/// Which reserved overtime component an overtime record pays into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OvertimeKind {
    /// Overtime on a working day.
    Regular,
    /// Overtime on a public holiday.
    Holiday,
}

/// Approval state of an overtime record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Awaiting a decision.
    Pending,
    /// Approved and payable.
    Approved,
    /// Rejected.
    Rejected,
}

/// Overtime worked by an employee on a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeRecord {
    /// Unique identifier.
    pub id: i64,
    /// The employee.
    pub employee_id: String,
    /// The day the overtime was worked.
    pub date: NaiveDate,
    /// Overtime hours.
    pub hours: Decimal,
    /// Regular or holiday overtime.
    pub kind: OvertimeKind,
    /// Approval state.
    pub status: ApprovalStatus,
}

/// Attendance folded over a cycle for one employee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceAggregate {
    /// Number of facts in the range.
    pub fact_count: usize,
    /// Sum of regular hours.
    pub regular_hours: Decimal,
    /// Count of days per status.
    pub day_counts: BTreeMap<DayStatus, u32>,
}

impl AttendanceAggregate {
    /// Folds the facts of one employee that fall within `[start, end]`.
    pub fn from_facts<'a>(
        facts: impl IntoIterator<Item = &'a AttendanceFact>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        let mut aggregate = AttendanceAggregate::default();
        for fact in facts {
            if fact.date < start || fact.date > end {
                continue;
            }
            aggregate.fact_count += 1;
            aggregate.regular_hours += fact.regular_hours;
            *aggregate.day_counts.entry(fact.status).or_insert(0) += 1;
        }
        aggregate
    }

    /// Returns true if no attendance was recorded in the range.
    pub fn is_empty(&self) -> bool {
        self.fact_count == 0
    }
}
