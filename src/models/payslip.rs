//! Payslips, payslip lines and the line breakdown schema.
//!
//! Every [`PayslipLine`] carries a [`Breakdown`]: a versioned, tagged record
//! of where the amount came from (inputs, rule, intermediate values) or of
//! the error that replaced it. Downstream consumers match on `source` and
//! check `version` before reading the remaining fields.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ComponentId, ComponentKind, OvertimeKind};

/// Current version of the breakdown schema.
pub const BREAKDOWN_SCHEMA_VERSION: u32 = 1;

/// The source-specific part of a breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum BreakdownDetail {
    /// A Fixed amount paid verbatim.
    Fixed {
        /// The configured amount.
        amount: Decimal,
    },
    /// A Fixed monthly amount prorated by attendance.
    Prorated {
        /// The configured (static) monthly amount.
        monthly_amount: Decimal,
        /// Inclusive days in the cycle.
        calendar_days: i64,
        /// `monthly_amount / calendar_days`.
        daily_rate: Decimal,
        /// Scheduled hours per day from the shift.
        scheduled_hours: Decimal,
        /// `daily_rate / scheduled_hours`.
        hourly_rate: Decimal,
        /// Regular hours attended in the cycle.
        regular_hours: Decimal,
        /// `hourly_rate * regular_hours`.
        payable: Decimal,
    },
    /// A percentage of another component's static value.
    Percentage {
        /// The base component.
        based_on: ComponentId,
        /// The base's static value.
        base_value: Decimal,
        /// The configured percentage.
        percent: Decimal,
        /// `base_value * percent / 100`.
        payable: Decimal,
    },
    /// A formula over other components' static values.
    Formula {
        /// The infix expression with references substituted.
        expression: String,
        /// The static value used for each referenced component, keyed by id.
        references: BTreeMap<String, Decimal>,
        /// The evaluated result.
        payable: Decimal,
    },
    /// Approved overtime hours at a per-hour rate derived from a static value.
    Overtime {
        /// Regular or holiday overtime.
        overtime_kind: OvertimeKind,
        /// The rule that produced the static value.
        rule: String,
        /// The component's static value.
        static_value: Decimal,
        /// Divisor turning the static value into a per-hour rate.
        rate_divisor: Decimal,
        /// `static_value / rate_divisor`.
        hourly_rate: Decimal,
        /// Approved overtime hours of this kind in the cycle.
        approved_hours: Decimal,
        /// `hourly_rate * approved_hours`.
        payable: Decimal,
    },
    /// A due loan installment.
    LoanInstallment {
        /// The installment.
        installment_id: i64,
        /// The loan.
        loan_reference: String,
        /// When the installment fell due.
        due_date: NaiveDate,
        /// The deducted amount.
        amount: Decimal,
    },
    /// An approved HR case deduction.
    HrCaseDeduction {
        /// The deduction.
        deduction_id: i64,
        /// The HR case.
        case_reference: String,
        /// The deducted amount.
        amount: Decimal,
    },
    /// A processed expense claim.
    ExpenseReimbursement {
        /// The claim.
        expense_id: i64,
        /// What the expense was for.
        description: String,
        /// The reimbursed amount.
        amount: Decimal,
    },
    /// The calculation failed; the line amount is zero.
    Error {
        /// Where the failure happened (e.g. "dependency_resolution").
        stage: String,
        /// The rule being applied, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rule: Option<String>,
        /// The error message.
        message: String,
    },
}

/// The audit trail stored with every payslip line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakdown {
    /// Schema version, see [`BREAKDOWN_SCHEMA_VERSION`].
    pub version: u32,
    /// Source-specific details.
    #[serde(flatten)]
    pub detail: BreakdownDetail,
    /// Inputs that were missing and replaced by a default.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defaults: Vec<String>,
}

impl Breakdown {
    /// Wraps a detail in the current schema version.
    pub fn new(detail: BreakdownDetail) -> Self {
        Self {
            version: BREAKDOWN_SCHEMA_VERSION,
            detail,
            defaults: Vec::new(),
        }
    }

    /// Attaches recorded defaults.
    pub fn with_defaults(mut self, defaults: Vec<String>) -> Self {
        self.defaults = defaults;
        self
    }

    /// Builds an error breakdown.
    pub fn error(stage: &str, rule: Option<&str>, message: impl Into<String>) -> Self {
        Self::new(BreakdownDetail::Error {
            stage: stage.to_string(),
            rule: rule.map(str::to_string),
            message: message.into(),
        })
    }

    /// Returns true if this breakdown records a failure.
    pub fn is_error(&self) -> bool {
        matches!(self.detail, BreakdownDetail::Error { .. })
    }
}

/// A single earning or deduction on a payslip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayslipLine {
    /// Unique identifier.
    pub id: Uuid,
    /// The owning payslip.
    pub payslip_id: Uuid,
    /// The component that produced the line; `None` for settlement lines.
    pub component_id: Option<ComponentId>,
    /// Display name.
    pub name: String,
    /// Earning or deduction.
    #[serde(rename = "type")]
    pub line_type: ComponentKind,
    /// Amount at full precision.
    pub amount: Decimal,
    /// How the amount was obtained.
    pub breakdown: Breakdown,
}

/// A computed line not yet attached to a payslip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDraft {
    /// The component that produced the line; `None` for settlement lines.
    pub component_id: Option<ComponentId>,
    /// Display name.
    pub name: String,
    /// Earning or deduction.
    pub line_type: ComponentKind,
    /// Amount at full precision.
    pub amount: Decimal,
    /// How the amount was obtained.
    pub breakdown: Breakdown,
}

impl LineDraft {
    /// Returns true if the line records a failure.
    pub fn is_error(&self) -> bool {
        self.breakdown.is_error()
    }

    /// Attaches the draft to a payslip.
    pub fn into_line(self, payslip_id: Uuid) -> PayslipLine {
        PayslipLine {
            id: Uuid::new_v4(),
            payslip_id,
            component_id: self.component_id,
            name: self.name,
            line_type: self.line_type,
            amount: self.amount,
            breakdown: self.breakdown,
        }
    }
}

/// Lifecycle of a payslip, following its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayslipStatus {
    /// Recomputable.
    Draft,
    /// Immutable; settlement committed.
    Finalized,
    /// Paid out.
    Paid,
}

/// One employee's pay for one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payslip {
    /// Unique identifier.
    pub id: Uuid,
    /// The cycle.
    pub cycle_id: Uuid,
    /// The employee.
    pub employee_id: String,
    /// Sum of earning lines.
    pub gross: Decimal,
    /// Sum of deduction lines.
    pub deductions: Decimal,
    /// `gross - deductions`.
    pub net: Decimal,
    /// Lifecycle state.
    pub status: PayslipStatus,
    /// When the lines were last replaced.
    pub updated_at: DateTime<Utc>,
}

/// Aggregated totals over a set of lines.
///
/// # Example
///
/// ```
/// use payroll_engine::models::PayslipTotals;
/// use rust_decimal::Decimal;
///
/// let totals = PayslipTotals::from_lines(&[]);
/// assert_eq!(totals.net, Decimal::ZERO);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayslipTotals {
    /// Sum of earning lines.
    pub gross: Decimal,
    /// Sum of deduction lines.
    pub deductions: Decimal,
    /// `gross - deductions`.
    pub net: Decimal,
}

impl PayslipTotals {
    /// Sums the lines at full precision.
    pub fn from_lines(lines: &[PayslipLine]) -> Self {
        let gross: Decimal = lines
            .iter()
            .filter(|l| l.line_type == ComponentKind::Earning)
            .map(|l| l.amount)
            .sum();
        let deductions: Decimal = lines
            .iter()
            .filter(|l| l.line_type == ComponentKind::Deduction)
            .map(|l| l.amount)
            .sum();
        Self {
            gross,
            deductions,
            net: gross - deductions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line(kind: ComponentKind, amount: &str) -> PayslipLine {
        PayslipLine {
            id: Uuid::new_v4(),
            payslip_id: Uuid::nil(),
            component_id: Some(1),
            name: "Basic".to_string(),
            line_type: kind,
            amount: dec(amount),
            breakdown: Breakdown::new(BreakdownDetail::Fixed {
                amount: dec(amount),
            }),
        }
    }

    #[test]
    fn test_totals_split_earnings_and_deductions() {
        let lines = vec![
            line(ComponentKind::Earning, "2000"),
            line(ComponentKind::Earning, "155"),
            line(ComponentKind::Deduction, "200.50"),
        ];
        let totals = PayslipTotals::from_lines(&lines);
        assert_eq!(totals.gross, dec("2155"));
        assert_eq!(totals.deductions, dec("200.50"));
        assert_eq!(totals.net, dec("1954.50"));
    }

    #[test]
    fn test_breakdown_serializes_version_and_source_tag() {
        let breakdown = Breakdown::new(BreakdownDetail::Percentage {
            based_on: 1,
            base_value: dec("3100"),
            percent: dec("50"),
            payable: dec("1550"),
        });
        let json = serde_json::to_value(&breakdown).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["source"], "percentage");
        assert_eq!(json["based_on"], 1);
        assert_eq!(json["payable"], "1550");
        assert!(json.get("defaults").is_none());
    }

    #[test]
    fn test_error_breakdown_round_trips() {
        let breakdown = Breakdown::error("formula", Some("formula"), "division by zero")
            .with_defaults(vec!["component 7 defaulted to 0".to_string()]);
        let json = serde_json::to_string(&breakdown).unwrap();
        let parsed: Breakdown = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_error());
        assert_eq!(parsed, breakdown);
    }

    #[test]
    fn test_line_type_serializes_as_type() {
        let json = serde_json::to_value(line(ComponentKind::Deduction, "10")).unwrap();
        assert_eq!(json["type"], "deduction");
    }
}
