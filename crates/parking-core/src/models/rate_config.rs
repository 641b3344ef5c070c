//! Rate configuration model
//!
//! The fare schedule for one vehicle type. At most one config per vehicle
//! type is active; a replacement supersedes the previous one by
//! deactivation, never deletion.

use crate::billing::validate_money;
use crate::error::AppError;
use crate::AppResult;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Rate configuration entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateConfig {
    /// Unique identifier
    pub id: i64,

    /// Vehicle type this schedule applies to
    pub vehicle_type_id: i64,

    /// Price of one hour
    pub rate_per_hour: Decimal,

    /// Hours charged at minimum, however short the stay
    pub minimum_charge_hours: i32,

    /// Upper bound on a single charge
    pub maximum_daily_rate: Option<Decimal>,

    /// Whether this is the vehicle type's current schedule
    pub active: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl RateConfig {
    /// Validate fare terms
    ///
    /// - `rate_per_hour` must be positive
    /// - both amounts must fit a money column: 2 decimals, at most
    ///   9999999999.99
    /// - `minimum_charge_hours` must be at least 1
    /// - `maximum_daily_rate`, when present, must not be below `rate_per_hour`
    pub fn validate_terms(
        rate_per_hour: Decimal,
        minimum_charge_hours: i32,
        maximum_daily_rate: Option<Decimal>,
    ) -> AppResult<()> {
        if rate_per_hour <= Decimal::ZERO {
            return Err(AppError::Validation(format!(
                "Rate per hour must be greater than zero (got {})",
                rate_per_hour
            )));
        }
        validate_money("Rate per hour", rate_per_hour)?;

        if minimum_charge_hours < 1 {
            return Err(AppError::Validation(format!(
                "Minimum charge hours must be at least 1 (got {})",
                minimum_charge_hours
            )));
        }

        if let Some(max) = maximum_daily_rate {
            validate_money("Maximum daily rate", max)?;
            if max < rate_per_hour {
                return Err(AppError::Validation(format!(
                    "Maximum daily rate {} is below the hourly rate {}",
                    max, rate_per_hour
                )));
            }
        }

        Ok(())
    }
}

impl Default for RateConfig {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            vehicle_type_id: 0,
            rate_per_hour: Decimal::ONE,
            minimum_charge_hours: 1,
            maximum_daily_rate: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Insert payload for a new rate config
///
/// New configs are always stored active.
#[derive(Debug, Clone)]
pub struct NewRateConfig {
    pub vehicle_type_id: i64,
    pub rate_per_hour: Decimal,
    pub minimum_charge_hours: i32,
    pub maximum_daily_rate: Option<Decimal>,
}
