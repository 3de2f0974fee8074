//! Request types for the payroll engine API.
//!
//! This module defines the JSON request bodies and query strings accepted by
//! the cycle, audit and flag endpoints.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{CycleStatus, FlagStatus, GroupId};
use crate::payroll::NewCycle;

/// Request body for `POST /cycles`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCycleRequest {
    /// Display name of the cycle.
    pub name: String,
    /// The first day of the cycle (inclusive).
    pub start_date: NaiveDate,
    /// The last day of the cycle (inclusive).
    pub end_date: NaiveDate,
    /// Groups whose components the cycle computes.
    pub group_ids: Vec<GroupId>,
}

impl From<CreateCycleRequest> for NewCycle {
    fn from(req: CreateCycleRequest) -> Self {
        NewCycle {
            name: req.name,
            start_date: req.start_date,
            end_date: req.end_date,
            group_ids: req.group_ids,
        }
    }
}

/// Request body for `POST /cycles/:id/transition`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRequest {
    /// The requested status.
    pub status: CycleStatus,
}

/// Request body for `POST /flags/:id/resolve`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolveFlagRequest {
    /// Operator note stored on the flag.
    #[serde(default)]
    pub note: Option<String>,
}

/// Query string for `GET /cycles/:id/audit/flags`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlagQuery {
    /// Only flags with this status.
    #[serde(default)]
    pub status: Option<FlagStatus>,
}
