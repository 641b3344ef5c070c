//! Session DTOs
//!
//! Request types for vehicle entry, exit, and history endpoints. Responses
//! reuse the service result records directly.

use parking_core::AppResult;
use parking_services::SessionLookup;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Vehicle entry request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EntryRequest {
    /// Plate of a pre-registered vehicle
    #[validate(length(min = 1, max = 20, message = "License plate is required"))]
    pub license_plate: String,
}

/// Vehicle exit request
///
/// Exactly one of the three identifiers must be given.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ExitRequest {
    #[validate(length(max = 20))]
    pub license_plate: Option<String>,

    #[validate(range(min = 1))]
    pub session_id: Option<i64>,

    #[validate(length(max = 40))]
    pub ticket_code: Option<String>,
}

impl ExitRequest {
    /// Resolve the identifier the caller supplied
    pub fn lookup(&self) -> AppResult<SessionLookup> {
        SessionLookup::from_parts(
            self.license_plate.as_deref(),
            self.session_id,
            self.ticket_code.as_deref(),
        )
    }
}

/// Query parameters for a vehicle's completed sessions
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct HistoryParams {
    #[serde(default = "default_history_limit")]
    #[validate(range(min = 1))]
    pub limit: i64,
}

fn default_history_limit() -> i64 {
    20
}

impl Default for HistoryParams {
    fn default() -> Self {
        Self {
            limit: default_history_limit(),
        }
    }
}
