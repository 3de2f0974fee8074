//! HTTP API module for the payroll engine.
//!
//! This module provides the REST endpoints for creating pay cycles, moving
//! them through their lifecycle, running pay groups, auditing and reading
//! payslips.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{CreateCycleRequest, FlagQuery, ResolveFlagRequest, TransitionRequest};
pub use response::{ApiError, ApiErrorResponse, HealthResponse, PayslipLineView, PayslipView};
pub use state::AppState;
