//! Rate configuration DTOs
//!
//! Request and response types for fare schedule endpoints.

use chrono::{DateTime, Utc};
use parking_core::models::RateConfig;
use parking_services::CreateRateConfigRequest;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Rate config creation request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RateConfigCreateRequest {
    #[validate(range(min = 1))]
    pub vehicle_type_id: i64,

    /// Price per started hour
    pub rate_per_hour: Decimal,

    /// Minimum billed hours (default from server configuration)
    #[validate(range(min = 1, message = "Minimum charge must be at least one hour"))]
    pub minimum_charge_hours: Option<i32>,

    /// Cap on a single session's charge
    pub maximum_daily_rate: Option<Decimal>,
}

impl RateConfigCreateRequest {
    /// Convert to the service request
    pub fn to_service_request(&self) -> CreateRateConfigRequest {
        CreateRateConfigRequest {
            vehicle_type_id: self.vehicle_type_id,
            rate_per_hour: self.rate_per_hour,
            minimum_charge_hours: self.minimum_charge_hours,
            maximum_daily_rate: self.maximum_daily_rate,
        }
    }
}

/// Rate config listing filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RateConfigFilterParams {
    pub vehicle_type_id: Option<i64>,
}

/// Rate config response
#[derive(Debug, Clone, Serialize)]
pub struct RateConfigResponse {
    pub id: i64,
    pub vehicle_type_id: i64,
    pub rate_per_hour: Decimal,
    pub minimum_charge_hours: i32,
    pub maximum_daily_rate: Option<Decimal>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RateConfig> for RateConfigResponse {
    fn from(config: RateConfig) -> Self {
        Self {
            id: config.id,
            vehicle_type_id: config.vehicle_type_id,
            rate_per_hour: config.rate_per_hour,
            minimum_charge_hours: config.minimum_charge_hours,
            maximum_daily_rate: config.maximum_daily_rate,
            active: config.active,
            created_at: config.created_at,
            updated_at: config.updated_at,
        }
    }
}
