//! Proration of monthly amounts into per-cycle payable amounts.
//!
//! `daily_rate = monthly / calendar_days`, `hourly_rate = daily_rate /
//! scheduled_hours`, `payable = hourly_rate * regular_hours`. Every step keeps
//! full precision; rounding is applied only by [`round_for_presentation`].

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{EngineError, EngineResult};

/// The intermediate values of a proration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proration {
    /// The static monthly amount.
    pub monthly_amount: Decimal,
    /// Inclusive days in the cycle.
    pub calendar_days: i64,
    /// `monthly_amount / calendar_days`.
    pub daily_rate: Decimal,
    /// Scheduled hours per day.
    pub scheduled_hours: Decimal,
    /// `daily_rate / scheduled_hours`.
    pub hourly_rate: Decimal,
    /// Regular hours attended.
    pub regular_hours: Decimal,
    /// `hourly_rate * regular_hours`.
    pub payable: Decimal,
}

/// Returns `monthly / calendar_days`.
pub fn daily_rate(monthly: Decimal, calendar_days: i64) -> EngineResult<Decimal> {
    if calendar_days <= 0 {
        return Err(EngineError::CalculationError {
            message: format!("cycle spans {} calendar days", calendar_days),
        });
    }
    monthly
        .checked_div(Decimal::from(calendar_days))
        .ok_or_else(|| EngineError::CalculationError {
            message: "daily rate overflow".to_string(),
        })
}

/// Returns `daily_rate / scheduled_hours`.
pub fn hourly_rate(daily_rate: Decimal, scheduled_hours: Decimal) -> EngineResult<Decimal> {
    if scheduled_hours <= Decimal::ZERO {
        return Err(EngineError::CalculationError {
            message: format!("shift schedules {} hours per day", scheduled_hours),
        });
    }
    daily_rate
        .checked_div(scheduled_hours)
        .ok_or_else(|| EngineError::CalculationError {
            message: "hourly rate overflow".to_string(),
        })
}

/// Prorates a monthly amount by attended regular hours.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::prorate_monthly;
/// use rust_decimal::Decimal;
///
/// let p = prorate_monthly(Decimal::from(3100), 31, Decimal::from(8), Decimal::from(160)).unwrap();
/// assert_eq!(p.daily_rate, Decimal::from(100));
/// assert_eq!(p.hourly_rate, Decimal::new(125, 1));
/// assert_eq!(p.payable, Decimal::from(2000));
/// ```
pub fn prorate_monthly(
    monthly_amount: Decimal,
    calendar_days: i64,
    scheduled_hours: Decimal,
    regular_hours: Decimal,
) -> EngineResult<Proration> {
    let daily = daily_rate(monthly_amount, calendar_days)?;
    let hourly = hourly_rate(daily, scheduled_hours)?;
    let payable = hourly
        .checked_mul(regular_hours)
        .ok_or_else(|| EngineError::CalculationError {
            message: "prorated amount overflow".to_string(),
        })?;

    Ok(Proration {
        monthly_amount,
        calendar_days,
        daily_rate: daily,
        scheduled_hours,
        hourly_rate: hourly,
        regular_hours,
        payable,
    })
}

/// Rounds an amount half away from zero to `decimal_places`.
pub fn round_for_presentation(amount: Decimal, decimal_places: u32) -> Decimal {
    amount.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointAwayFromZero)
}
