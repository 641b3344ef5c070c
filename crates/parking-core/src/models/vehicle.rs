//! Vehicle and vehicle type models
//!
//! Vehicles are registered by an external collaborator; the parking core only
//! looks them up by plate and reads their type for space eligibility and fares.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Vehicle category (car, motorcycle, truck...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleType {
    /// Unique identifier
    pub id: i64,

    /// Display name
    pub name: String,

    /// Soft-delete flag
    pub active: bool,
}

/// Registered vehicle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    /// Unique identifier
    pub id: i64,

    /// Normalized (trimmed, uppercase) license plate
    pub license_plate: String,

    /// Vehicle type reference
    pub vehicle_type_id: i64,

    /// Soft-delete flag
    pub active: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Vehicle {
    /// Normalize a license plate for lookup and storage
    ///
    /// Plates are compared trimmed and uppercased.
    pub fn normalize_plate(plate: &str) -> String {
        plate.trim().to_uppercase()
    }
}
