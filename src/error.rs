//! Error types for the payroll engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur while configuring, computing,
//! settling and auditing pay cycles.

use thiserror::Error;
use uuid::Uuid;

use crate::models::CycleStatus;

/// The main error type for the payroll engine.
///
/// Variants fall into five families: validation of malformed requests,
/// missing resources, conflicts with the current state, calculation failures
/// (recorded per payslip line, never aborting a batch) and fatal store
/// failures that roll back a whole request.
///
/// # Example
///
/// ```
/// use payroll_engine::error::EngineError;
/// use payroll_engine::models::CycleStatus;
///
/// let error = EngineError::InvalidTransition {
///     from: CycleStatus::Draft,
///     to: CycleStatus::Paid,
/// };
/// assert_eq!(error.to_string(), "Invalid cycle transition from 'draft' to 'paid'");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A request was malformed or violated an input rule.
    #[error("Validation failed for '{field}': {message}")]
    Validation {
        /// The offending field.
        field: String,
        /// A description of what made the field invalid.
        message: String,
    },

    /// A referenced resource does not exist.
    #[error("{resource} not found: {id}")]
    NotFound {
        /// The kind of resource (e.g. "Cycle", "Group").
        resource: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// A cycle with the same date range and group set already exists.
    #[error("A cycle for {start_date}..{end_date} over the same groups already exists: {existing}")]
    DuplicateCycle {
        /// Start of the requested range.
        start_date: chrono::NaiveDate,
        /// End of the requested range.
        end_date: chrono::NaiveDate,
        /// The cycle that already covers the range.
        existing: Uuid,
    },

    /// The requested status change is not an edge of the cycle state machine.
    #[error("Invalid cycle transition from '{from}' to '{to}'")]
    InvalidTransition {
        /// Current status.
        from: CycleStatus,
        /// Requested status.
        to: CycleStatus,
    },

    /// The cycle no longer accepts recomputation of the group.
    #[error("Group {group_id} of cycle {cycle_id} is already processed (cycle is {status})")]
    GroupAlreadyProcessed {
        /// The cycle.
        cycle_id: Uuid,
        /// The group.
        group_id: i64,
        /// The cycle's current status.
        status: CycleStatus,
    },

    /// The audit flag was already resolved.
    #[error("Audit flag {flag_id} is already resolved")]
    FlagAlreadyResolved {
        /// The flag.
        flag_id: Uuid,
    },

    /// Open audit flags block the requested transition.
    #[error("Cycle {cycle_id} has {open_flags} open audit flag(s)")]
    AuditNotClear {
        /// The cycle.
        cycle_id: Uuid,
        /// Number of open flags.
        open_flags: usize,
    },

    /// A formula failed to evaluate.
    #[error("Formula '{formula}' failed: {message}")]
    FormulaError {
        /// The rendered formula.
        formula: String,
        /// A description of the failure.
        message: String,
    },

    /// Component dependencies form a cycle.
    #[error("Circular dependency detected at component {component_id}")]
    CircularDependency {
        /// The component that closes the cycle.
        component_id: i64,
    },

    /// A general calculation error occurred.
    #[error("Calculation error: {message}")]
    CalculationError {
        /// A description of the calculation error.
        message: String,
    },

    /// The store failed during an atomic write; nothing was committed.
    #[error("Transaction aborted: {message}")]
    FatalTransaction {
        /// A description of the failure.
        message: String,
    },
}

impl EngineError {
    /// Builds a [`EngineError::Validation`] error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Builds a [`EngineError::NotFound`] error.
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Returns true for errors that are recorded on a payslip line instead of
    /// aborting the request.
    pub fn is_calculation(&self) -> bool {
        matches!(
            self,
            Self::FormulaError { .. }
                | Self::CircularDependency { .. }
                | Self::CalculationError { .. }
        )
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_displays_path() {
        let error = EngineError::ConfigNotFound {
            path: "/missing/engine.yaml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration file not found: /missing/engine.yaml"
        );
    }

    #[test]
    fn test_not_found_displays_resource_and_id() {
        let error = EngineError::not_found("Group", 7);
        assert_eq!(error.to_string(), "Group not found: 7");
    }

    #[test]
    fn test_invalid_transition_names_both_states() {
        let error = EngineError::InvalidTransition {
            from: CycleStatus::Finalized,
            to: CycleStatus::Finalized,
        };
        assert_eq!(
            error.to_string(),
            "Invalid cycle transition from 'finalized' to 'finalized'"
        );
    }

    #[test]
    fn test_formula_error_names_formula() {
        let error = EngineError::FormulaError {
            formula: "{1} / 0".to_string(),
            message: "division by zero".to_string(),
        };
        assert_eq!(error.to_string(), "Formula '{1} / 0' failed: division by zero");
    }

    #[test]
    fn test_circular_dependency_names_component() {
        let error = EngineError::CircularDependency { component_id: 4 };
        assert_eq!(
            error.to_string(),
            "Circular dependency detected at component 4"
        );
    }

    #[test]
    fn test_calculation_family() {
        assert!(EngineError::CircularDependency { component_id: 1 }.is_calculation());
        assert!(
            EngineError::CalculationError {
                message: "x".to_string()
            }
            .is_calculation()
        );
        assert!(!EngineError::validation("name", "empty").is_calculation());
    }

    #[test]
    fn test_errors_implement_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<EngineError>();
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn returns_not_found() -> EngineResult<()> {
            Err(EngineError::not_found("Cycle", "abc"))
        }

        fn propagates_error() -> EngineResult<()> {
            returns_not_found()?;
            Ok(())
        }

        assert!(propagates_error().is_err());
    }
}
