//! Billing calculator
//!
//! Pure fare computation shared by the exit flow, live estimates, and
//! payment settlement. There is exactly one rule:
//!
//! 1. `raw = whole minutes between entry and exit / 60`, floored at 0
//! 2. `billable = max(raw, minimum_charge_hours)`
//! 3. `amount = rate_per_hour * ceil(billable)`
//! 4. clamp to `maximum_daily_rate` when set
//! 5. round to 2 decimals, half away from zero

use crate::error::AppError;
use crate::models::RateConfig;
use crate::AppResult;
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Decimal places for money and displayed hours
pub const MONEY_SCALE: u32 = 2;

/// Largest amount a money column holds, in hundredths
const MAX_MONEY_CENTS: i64 = 999_999_999_999;

/// Largest storable money value
pub fn max_money() -> Decimal {
    Decimal::new(MAX_MONEY_CENTS, MONEY_SCALE)
}

/// Check that a caller-supplied amount fits a money column unchanged
///
/// Trailing zeros are ignored, so `2000.500` passes while `2000.005` and
/// anything above [`max_money`] fail with `Validation`.
pub fn validate_money(field: &str, value: Decimal) -> AppResult<()> {
    if value.normalize().scale() > MONEY_SCALE {
        return Err(AppError::Validation(format!(
            "{} allows at most {} decimal places (got {})",
            field, MONEY_SCALE, value
        )));
    }
    if value.abs() > max_money() {
        return Err(AppError::Validation(format!(
            "{} exceeds the maximum of {} (got {})",
            field,
            max_money(),
            value
        )));
    }
    Ok(())
}

/// Itemized fare for one stay
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingBreakdown {
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,

    /// Whole minutes parked
    pub minutes_parked: i64,

    /// Exact parked hours, not rounded
    pub hours_parked: Decimal,

    /// Parked hours after the minimum-charge floor
    pub billable_hours: Decimal,

    /// Billable hours rounded up to whole hours
    pub charged_hours: Decimal,

    pub rate_per_hour: Decimal,
    pub minimum_charge_hours: i32,
    pub maximum_daily_rate: Option<Decimal>,

    /// Whether the daily maximum reduced the amount
    pub daily_cap_applied: bool,

    /// Payable amount, rounded to 2 decimals
    pub total_amount: Decimal,
}

impl BillingBreakdown {
    /// Parked hours rounded for display
    pub fn hours_parked_rounded(&self) -> Decimal {
        round_2dp(self.hours_parked)
    }
}

/// Round half away from zero to 2 decimals
#[inline]
pub fn round_2dp(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Whole minutes between two instants, truncated toward zero
#[inline]
pub fn minutes_between(entry: DateTime<Utc>, exit: DateTime<Utc>) -> i64 {
    (exit - entry).num_minutes()
}

/// Exact parked hours, never negative
pub fn parked_hours(entry: DateTime<Utc>, exit: DateTime<Utc>) -> Decimal {
    let minutes = minutes_between(entry, exit).max(0);
    Decimal::from(minutes) / Decimal::from(60)
}

/// Compute the fare for a stay under a rate config
///
/// Fails with `Validation` if `exit` precedes `entry`.
pub fn calculate(
    entry: DateTime<Utc>,
    exit: DateTime<Utc>,
    rate: &RateConfig,
) -> AppResult<BillingBreakdown> {
    if exit < entry {
        return Err(AppError::Validation(format!(
            "Exit time {} precedes entry time {}",
            exit, entry
        )));
    }

    let minutes_parked = minutes_between(entry, exit).max(0);
    let hours_parked = parked_hours(entry, exit);
    let billable_hours = hours_parked.max(Decimal::from(rate.minimum_charge_hours));
    let charged_hours = billable_hours.ceil();

    let mut amount = rate.rate_per_hour * charged_hours;
    let mut daily_cap_applied = false;
    if let Some(cap) = rate.maximum_daily_rate {
        if amount > cap {
            amount = cap;
            daily_cap_applied = true;
        }
    }

    let total_amount = round_2dp(amount);
    if total_amount > max_money() {
        return Err(AppError::Calculation(format!(
            "Fare {} exceeds the storable maximum of {}",
            total_amount,
            max_money()
        )));
    }

    Ok(BillingBreakdown {
        entry_time: entry,
        exit_time: exit,
        minutes_parked,
        hours_parked,
        billable_hours,
        charged_hours,
        rate_per_hour: rate.rate_per_hour,
        minimum_charge_hours: rate.minimum_charge_hours,
        maximum_daily_rate: rate.maximum_daily_rate,
        daily_cap_applied,
        total_amount,
    })
}
