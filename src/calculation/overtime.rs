//! Overtime pay for the reserved regular and holiday overtime components.
//!
//! The per-hour rate is the overtime component's static value (Fixed,
//! Percentage or Formula, always computed off static values) divided by the
//! configured rate divisor. It is never derived from a prorated amount.

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{BreakdownDetail, CalculationRule, OvertimeKind};

use super::context::EmployeeInputs;

/// The outcome of an overtime calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OvertimeResult {
    /// `hourly_rate * approved_hours`.
    pub amount: Decimal,
    /// Breakdown detail for the payslip line.
    pub detail: BreakdownDetail,
    /// Inputs that were missing and defaulted.
    pub defaults: Vec<String>,
}

/// Computes overtime pay for one reserved overtime component.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use payroll_engine::calculation::{EmployeeInputs, calculate_overtime};
/// use payroll_engine::models::{AttendanceAggregate, CalculationRule, OvertimeKind};
/// use rust_decimal::Decimal;
///
/// let inputs = EmployeeInputs {
///     employee_id: "emp_001".to_string(),
///     scheduled_hours: Decimal::from(8),
///     attendance: AttendanceAggregate::default(),
///     approved_overtime: HashMap::from([(OvertimeKind::Regular, Decimal::from(10))]),
/// };
/// let rule = CalculationRule::Percentage { percent: Decimal::from(50), based_on: 1 };
/// let result = calculate_overtime(
///     OvertimeKind::Regular,
///     &rule,
///     Decimal::from(1550),
///     Decimal::ONE_HUNDRED,
///     &inputs,
/// )
/// .unwrap();
/// assert_eq!(result.amount, Decimal::from(155));
/// ```
pub fn calculate_overtime(
    kind: OvertimeKind,
    rule: &CalculationRule,
    static_value: Decimal,
    rate_divisor: Decimal,
    inputs: &EmployeeInputs,
) -> EngineResult<OvertimeResult> {
    if rate_divisor.is_zero() {
        return Err(EngineError::CalculationError {
            message: "overtime rate divisor is zero".to_string(),
        });
    }

    let mut defaults = Vec::new();
    let approved_hours = match inputs.approved_hours(kind) {
        Some(hours) => hours,
        None => {
            defaults.push(format!(
                "no approved {} overtime in cycle; hours defaulted to 0",
                kind_name(kind)
            ));
            Decimal::ZERO
        }
    };

    let hourly_rate = static_value
        .checked_div(rate_divisor)
        .ok_or_else(|| EngineError::CalculationError {
            message: "overtime rate overflow".to_string(),
        })?;
    let amount = hourly_rate
        .checked_mul(approved_hours)
        .ok_or_else(|| EngineError::CalculationError {
            message: "overtime amount overflow".to_string(),
        })?;

    Ok(OvertimeResult {
        amount,
        detail: BreakdownDetail::Overtime {
            overtime_kind: kind,
            rule: rule.type_name().to_string(),
            static_value,
            rate_divisor,
            hourly_rate,
            approved_hours,
            payable: amount,
        },
        defaults,
    })
}

fn kind_name(kind: OvertimeKind) -> &'static str {
    match kind {
        OvertimeKind::Regular => "regular",
        OvertimeKind::Holiday => "holiday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttendanceAggregate;
    use std::collections::HashMap;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn inputs(regular: Option<&str>, holiday: Option<&str>) -> EmployeeInputs {
        let mut approved_overtime = HashMap::new();
        if let Some(h) = regular {
            approved_overtime.insert(OvertimeKind::Regular, dec(h));
        }
        if let Some(h) = holiday {
            approved_overtime.insert(OvertimeKind::Holiday, dec(h));
        }
        EmployeeInputs {
            employee_id: "emp_001".to_string(),
            scheduled_hours: dec("8"),
            attendance: AttendanceAggregate::default(),
            approved_overtime,
        }
    }

    fn half_of_base() -> CalculationRule {
        CalculationRule::Percentage {
            percent: dec("50"),
            based_on: 1,
        }
    }

    #[test]
    fn test_regular_overtime_example() {
        let result = calculate_overtime(
            OvertimeKind::Regular,
            &half_of_base(),
            dec("1550"),
            dec("100"),
            &inputs(Some("10"), None),
        )
        .unwrap();

        assert_eq!(result.amount, dec("155"));
        assert!(result.defaults.is_empty());
        match result.detail {
            BreakdownDetail::Overtime {
                hourly_rate,
                approved_hours,
                ref rule,
                ..
            } => {
                assert_eq!(hourly_rate, dec("15.5"));
                assert_eq!(approved_hours, dec("10"));
                assert_eq!(rule, "percentage");
            }
            other => panic!("Expected overtime detail, got {:?}", other),
        }
    }

    #[test]
    fn test_holiday_overtime_uses_holiday_hours_only() {
        let result = calculate_overtime(
            OvertimeKind::Holiday,
            &CalculationRule::Fixed {
                amount: dec("2000"),
            },
            dec("2000"),
            dec("100"),
            &inputs(Some("10"), Some("3")),
        )
        .unwrap();
        assert_eq!(result.amount, dec("60"));
    }

    #[test]
    fn test_missing_overtime_defaults_to_zero_and_is_recorded() {
        let result = calculate_overtime(
            OvertimeKind::Regular,
            &half_of_base(),
            dec("1550"),
            dec("100"),
            &inputs(None, None),
        )
        .unwrap();
        assert_eq!(result.amount, Decimal::ZERO);
        assert_eq!(result.defaults.len(), 1);
        assert!(result.defaults[0].contains("regular"));
    }

    #[test]
    fn test_zero_divisor_is_an_error() {
        let result = calculate_overtime(
            OvertimeKind::Regular,
            &half_of_base(),
            dec("1550"),
            Decimal::ZERO,
            &inputs(Some("1"), None),
        );
        assert!(result.is_err());
    }
}
