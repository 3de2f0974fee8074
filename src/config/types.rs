//! Configuration types for the payroll engine.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from `engine.yaml`.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::{ComponentId, OvertimeKind};

/// Metadata identifying the deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineMetadata {
    /// The organisation whose payroll is run.
    pub organisation: String,
    /// Configuration version or effective date.
    pub version: String,
}

/// Reserved overtime components and how their per-hour rate is derived.
#[derive(Debug, Clone, Deserialize)]
pub struct OvertimeSettings {
    /// Component paying approved regular overtime.
    pub regular_component_id: ComponentId,
    /// Component paying approved holiday overtime.
    pub holiday_component_id: ComponentId,
    /// Divisor turning an overtime component's static value into a per-hour
    /// rate.
    #[serde(default = "default_rate_divisor")]
    pub rate_divisor: Decimal,
}

fn default_rate_divisor() -> Decimal {
    Decimal::ONE_HUNDRED
}

impl OvertimeSettings {
    /// Returns the overtime role of a component, if it has one.
    pub fn role_of(&self, component_id: ComponentId) -> Option<OvertimeKind> {
        if component_id == self.regular_component_id {
            Some(OvertimeKind::Regular)
        } else if component_id == self.holiday_component_id {
            Some(OvertimeKind::Holiday)
        } else {
            None
        }
    }
}

/// How amounts are presented to API consumers.
#[derive(Debug, Clone, Deserialize)]
pub struct PresentationSettings {
    /// Decimal places amounts are rounded to when presented.
    #[serde(default = "default_decimal_places")]
    pub decimal_places: u32,
}

fn default_decimal_places() -> u32 {
    2
}

impl Default for PresentationSettings {
    fn default() -> Self {
        Self {
            decimal_places: default_decimal_places(),
        }
    }
}

/// Audit gate behaviour.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditSettings {
    /// Refuse Auditing -> Review while the cycle has open flags.
    #[serde(default)]
    pub block_review_on_open_flags: bool,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    /// Returns `host:port`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The complete engine configuration loaded from `engine.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    /// Deployment metadata.
    pub metadata: EngineMetadata,
    /// Overtime roles.
    pub overtime: OvertimeSettings,
    /// Presentation rounding.
    #[serde(default)]
    pub presentation: PresentationSettings,
    /// Audit gate behaviour.
    #[serde(default)]
    pub audit: AuditSettings,
    /// HTTP listener.
    #[serde(default)]
    pub server: ServerSettings,
}
