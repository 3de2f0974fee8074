//! Audit flags raised against a cycle by data-quality checks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The data-quality check that raised a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagType {
    /// No attendance recorded in the cycle.
    MissingAttendance,
    /// Overtime in the cycle awaiting approval.
    UnapprovedOvertime,
    /// A component of the cycle's groups has no structure entry.
    MissingStructureComponent,
    /// A punch-in without a punch-out.
    MissingPunchOut,
    /// No bank details on file.
    MissingBankDetails,
}

/// Whether a flag still needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagStatus {
    /// Needs attention.
    Open,
    /// Explicitly resolved by an operator.
    Resolved,
}

/// A detected data-quality issue for one employee in one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFlag {
    /// Unique identifier.
    pub id: Uuid,
    /// The cycle.
    pub cycle_id: Uuid,
    /// The employee.
    pub employee_id: String,
    /// The check that raised the flag.
    pub flag_type: FlagType,
    /// What exactly is wrong. Part of the de-duplication key.
    pub description: String,
    /// Open or resolved.
    pub status: FlagStatus,
    /// When the flag was raised.
    pub created_at: DateTime<Utc>,
    /// When the flag was resolved.
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    /// Operator note recorded on resolution.
    #[serde(default)]
    pub resolution_note: Option<String>,
}

impl AuditFlag {
    /// Returns true if the flag is open and has the given key.
    pub fn is_open_with_key(
        &self,
        cycle_id: Uuid,
        employee_id: &str,
        flag_type: FlagType,
        description: &str,
    ) -> bool {
        self.status == FlagStatus::Open
            && self.cycle_id == cycle_id
            && self.employee_id == employee_id
            && self.flag_type == flag_type
            && self.description == description
    }
}
