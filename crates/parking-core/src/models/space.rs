//! Parking space model
//!
//! A space is either free or held by exactly one vehicle. Occupancy changes
//! only through [`ParkingSpace::occupy`] and [`ParkingSpace::free`], which
//! enforce the lifecycle guards:
//!
//! - `occupy` requires the space to be active and free
//! - `free` requires the space to be occupied
//! - `deactivate` is refused while the space is occupied

use crate::error::AppError;
use crate::models::Vehicle;
use crate::AppResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Parking space entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParkingSpace {
    /// Unique identifier
    pub id: i64,

    /// Normalized space number (e.g. "A12")
    pub space_number: String,

    /// Vehicle type this space accepts
    pub vehicle_type_id: i64,

    /// Whether a vehicle currently holds the space
    pub occupied: bool,

    /// Soft-delete flag; inactive spaces are never allocated
    pub active: bool,

    /// Plate of the occupying vehicle
    pub occupied_by_plate: Option<String>,

    /// When the current occupancy started
    pub occupied_at: Option<DateTime<Utc>>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ParkingSpace {
    /// Validate and normalize a space number
    ///
    /// Accepts one or more ASCII letters followed by one or more digits,
    /// case-insensitive, surrounding whitespace ignored. Returns the
    /// uppercase form.
    pub fn normalize_number(raw: &str) -> AppResult<String> {
        let normalized = raw.trim().to_uppercase();

        if normalized.is_empty() {
            return Err(AppError::Validation(
                "Space number is required".to_string(),
            ));
        }

        let letters = normalized
            .chars()
            .take_while(|c| c.is_ascii_uppercase())
            .count();
        let digits = normalized[letters..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .count();

        if letters == 0 || digits == 0 || letters + digits != normalized.len() {
            return Err(AppError::Validation(format!(
                "Invalid space number '{}': expected letters followed by digits (e.g. A12)",
                raw.trim()
            )));
        }

        Ok(normalized)
    }

    /// Check if the space can be handed to a vehicle
    #[inline]
    pub fn is_available(&self) -> bool {
        self.active && !self.occupied
    }

    /// Check if the space accepts the given vehicle type
    #[inline]
    pub fn accepts(&self, vehicle_type_id: i64) -> bool {
        self.vehicle_type_id == vehicle_type_id
    }

    /// Assign the space to a vehicle
    pub fn occupy(&mut self, plate: &str, at: DateTime<Utc>) -> AppResult<()> {
        let plate = Vehicle::normalize_plate(plate);
        if plate.is_empty() {
            return Err(AppError::Validation(
                "License plate is required to occupy a space".to_string(),
            ));
        }

        if !self.is_available() {
            return Err(AppError::State(format!(
                "Space {} is not available",
                self.space_number
            )));
        }

        self.occupied = true;
        self.occupied_by_plate = Some(plate);
        self.occupied_at = Some(at);
        self.updated_at = at;
        Ok(())
    }

    /// Release the space
    pub fn free(&mut self, at: DateTime<Utc>) -> AppResult<()> {
        if !self.occupied {
            return Err(AppError::State(format!(
                "Space {} is not occupied",
                self.space_number
            )));
        }

        self.occupied = false;
        self.occupied_by_plate = None;
        self.occupied_at = None;
        self.updated_at = at;
        Ok(())
    }

    /// Return the space to the allocatable pool
    pub fn activate(&mut self, at: DateTime<Utc>) {
        if !self.active {
            self.active = true;
            self.updated_at = at;
        }
    }

    /// Withdraw the space from allocation
    pub fn deactivate(&mut self, at: DateTime<Utc>) -> AppResult<()> {
        if self.occupied {
            return Err(AppError::State(format!(
                "Space {} cannot be deactivated while occupied",
                self.space_number
            )));
        }

        if self.active {
            self.active = false;
            self.updated_at = at;
        }
        Ok(())
    }
}

impl Default for ParkingSpace {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            space_number: String::new(),
            vehicle_type_id: 0,
            occupied: false,
            active: true,
            occupied_by_plate: None,
            occupied_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Insert payload for a new space
#[derive(Debug, Clone)]
pub struct NewParkingSpace {
    /// Already-normalized space number
    pub space_number: String,

    /// Eligible vehicle type
    pub vehicle_type_id: i64,
}

/// Filter for space listings
#[derive(Debug, Clone, Copy, Default)]
pub struct SpaceFilter {
    /// Restrict to one vehicle type
    pub vehicle_type_id: Option<i64>,

    /// Only active, unoccupied spaces
    pub only_available: bool,
}

/// Per-vehicle-type capacity snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpaceAvailability {
    pub vehicle_type_id: i64,
    pub vehicle_type: String,
    pub total: i64,
    pub active: i64,
    pub occupied: i64,
    pub available: i64,
}
