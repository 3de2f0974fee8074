//! Application state for the payroll engine API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::sync::Arc;

use crate::config::ConfigLoader;
use crate::payroll::PayrollService;

/// Shared application state.
///
/// Holds the payroll service, which owns the settings and the store. Cloning
/// the state clones the handle, not the store.
#[derive(Clone)]
pub struct AppState {
    service: Arc<PayrollService>,
}

impl AppState {
    /// Creates application state from loaded configuration.
    pub fn new(config: ConfigLoader) -> Self {
        Self::from_service(PayrollService::from_config(config))
    }

    /// Wraps an existing service.
    pub fn from_service(service: PayrollService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    /// Returns the payroll service.
    pub fn service(&self) -> &PayrollService {
        &self.service
    }

    /// Returns a shared handle to the service for work moved off the request
    /// task.
    pub fn shared_service(&self) -> Arc<PayrollService> {
        Arc::clone(&self.service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        // Verify AppState can be cloned (required for axum state)
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_clones_share_the_service() {
        let state = AppState::new(ConfigLoader::load("./config/payroll").unwrap());
        let clone = state.clone();
        assert!(std::ptr::eq(state.service(), clone.service()));
    }
}
