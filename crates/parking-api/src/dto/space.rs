//! Parking space DTOs

use chrono::{DateTime, Utc};
use parking_core::models::{ParkingSpace, SpaceFilter};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Space registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSpaceRequest {
    /// Letters followed by digits, e.g. "A12"; case-insensitive
    #[validate(length(min = 1, max = 20, message = "Space number is required"))]
    pub space_number: String,

    #[validate(range(min = 1))]
    pub vehicle_type_id: i64,
}

/// Manual occupancy request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OccupySpaceRequest {
    #[validate(length(min = 1, max = 20, message = "License plate is required"))]
    pub license_plate: String,
}

/// Space listing filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpaceListParams {
    pub vehicle_type_id: Option<i64>,

    /// Only active, unoccupied spaces
    #[serde(default)]
    pub only_available: bool,
}

impl From<&SpaceListParams> for SpaceFilter {
    fn from(params: &SpaceListParams) -> Self {
        SpaceFilter {
            vehicle_type_id: params.vehicle_type_id,
            only_available: params.only_available,
        }
    }
}

/// Space response
#[derive(Debug, Clone, Serialize)]
pub struct SpaceResponse {
    pub id: i64,
    pub space_number: String,
    pub vehicle_type_id: i64,
    pub occupied: bool,
    pub active: bool,
    pub available: bool,
    pub occupied_by_plate: Option<String>,
    pub occupied_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<ParkingSpace> for SpaceResponse {
    fn from(space: ParkingSpace) -> Self {
        Self {
            available: space.is_available(),
            id: space.id,
            space_number: space.space_number,
            vehicle_type_id: space.vehicle_type_id,
            occupied: space.occupied,
            active: space.active,
            occupied_by_plate: space.occupied_by_plate,
            occupied_at: space.occupied_at,
            updated_at: space.updated_at,
        }
    }
}
