//! Pay cycles, their lifecycle status and pay groups.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ComponentId;

/// Identifier of a pay group.
pub type GroupId = i64;

/// Lifecycle status of a pay cycle.
///
/// The only legal moves are:
///
/// ```text
/// Draft -> Auditing -> Review -> Finalized -> Paid
///            ^   |       |
///            |   v       |
///          Draft  <------+ (Review -> Auditing)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    /// Being set up; nothing computed.
    Draft,
    /// Data-quality checks and draft computation.
    Auditing,
    /// Payslips generated and open for review.
    Review,
    /// Settlement side effects committed; payslips immutable.
    Finalized,
    /// Terminal.
    Paid,
}

impl CycleStatus {
    /// Returns true if `to` is a directed edge from `self`.
    ///
    /// # Example
    ///
    /// ```
    /// use payroll_engine::models::CycleStatus;
    ///
    /// assert!(CycleStatus::Review.can_transition_to(CycleStatus::Auditing));
    /// assert!(!CycleStatus::Draft.can_transition_to(CycleStatus::Review));
    /// assert!(!CycleStatus::Paid.can_transition_to(CycleStatus::Draft));
    /// ```
    pub fn can_transition_to(self, to: CycleStatus) -> bool {
        use CycleStatus::*;
        matches!(
            (self, to),
            (Draft, Auditing)
                | (Auditing, Review)
                | (Auditing, Draft)
                | (Review, Finalized)
                | (Review, Auditing)
                | (Finalized, Paid)
        )
    }

    /// Returns true while lines may still be recomputed.
    pub fn accepts_recomputation(self) -> bool {
        matches!(self, CycleStatus::Auditing | CycleStatus::Review)
    }

    /// Returns the lowercase name used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            CycleStatus::Draft => "draft",
            CycleStatus::Auditing => "auditing",
            CycleStatus::Review => "review",
            CycleStatus::Finalized => "finalized",
            CycleStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named set of components that can be attached to cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayGroup {
    /// Unique identifier.
    pub id: GroupId,
    /// Display name.
    pub name: String,
    /// The components computed when the group runs.
    pub component_ids: Vec<ComponentId>,
}

/// A bounded pay period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayCycle {
    /// Unique identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// First day of the cycle (inclusive).
    pub start_date: NaiveDate,
    /// Last day of the cycle (inclusive).
    pub end_date: NaiveDate,
    /// Current lifecycle status.
    pub status: CycleStatus,
    /// Groups attached to this cycle, sorted and unique.
    pub group_ids: Vec<GroupId>,
    /// When the cycle was created.
    pub created_at: DateTime<Utc>,
    /// When the cycle entered Finalized.
    #[serde(default)]
    pub finalized_at: Option<DateTime<Utc>>,
    /// When the cycle entered Paid.
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

impl PayCycle {
    /// Checks if a date falls within the cycle, inclusive of both ends.
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Returns the inclusive number of calendar days in the cycle.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::{NaiveDate, Utc};
    /// use payroll_engine::models::{CycleStatus, PayCycle};
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
    /// assert_eq!(cycle.calendar_days(), 31);
    /// ```
    pub fn calendar_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}
