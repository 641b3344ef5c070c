//! Parking session model
//!
//! A session records one stay of one vehicle in one space. It starts
//! `Active` at entry and moves exactly once to `Completed` at exit; the
//! transition is not reversible and sessions are never deleted.

use crate::error::AppError;
use crate::AppResult;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ticket code prefix
pub const TICKET_PREFIX: &str = "T";

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Vehicle is inside the lot
    Active,
    /// Exit registered
    Completed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Parking session entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParkingSession {
    /// Unique identifier
    pub id: i64,

    /// Parked vehicle
    pub vehicle_id: i64,

    /// Occupied space
    pub space_id: i64,

    /// When the vehicle entered
    pub entry_time: DateTime<Utc>,

    /// When the vehicle left; set iff the session is no longer active
    pub exit_time: Option<DateTime<Utc>>,

    /// Operator who registered the entry
    pub operator_entry_id: i64,

    /// Operator who registered the exit
    pub operator_exit_id: Option<i64>,

    /// Active flag
    pub active: bool,

    /// Human-presentable code, assigned right after the row is created
    pub ticket_code: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ParkingSession {
    /// Current lifecycle state
    pub fn status(&self) -> SessionStatus {
        if self.active {
            SessionStatus::Active
        } else {
            SessionStatus::Completed
        }
    }

    /// Check if an exit may still be registered
    #[inline]
    pub fn can_register_exit(&self) -> bool {
        self.active && self.exit_time.is_none()
    }

    /// Register the vehicle's exit
    ///
    /// One-way transition: fails with `State` if the session is already
    /// closed, and with `Validation` if `at` precedes the entry time.
    pub fn mark_exit(&mut self, operator_id: i64, at: DateTime<Utc>) -> AppResult<()> {
        if !self.active || self.exit_time.is_some() {
            return Err(AppError::State(format!(
                "Session {} is already closed",
                self.id
            )));
        }

        if at < self.entry_time {
            return Err(AppError::Validation(format!(
                "Exit time {} precedes entry time {} for session {}",
                at, self.entry_time, self.id
            )));
        }

        self.exit_time = Some(at);
        self.operator_exit_id = Some(operator_id);
        self.active = false;
        self.updated_at = at;
        Ok(())
    }

    /// Derive the ticket code for a session
    ///
    /// Format: `T-<YYYYMMDDHHmm>-<NNN>` where the timestamp is the creation
    /// time in the lot's display timezone and `NNN` is the last three digits
    /// of the id, zero-padded.
    pub fn ticket_code_for(id: i64, created_at: DateTime<Utc>, tz: Tz) -> String {
        format!(
            "{}-{}-{:03}",
            TICKET_PREFIX,
            created_at.with_timezone(&tz).format("%Y%m%d%H%M"),
            id.rem_euclid(1000)
        )
    }

    /// Assign the ticket code derived from this session's id and creation time
    pub fn assign_ticket_code(&mut self, tz: Tz) -> &str {
        let code = Self::ticket_code_for(self.id, self.created_at, tz);
        self.ticket_code.insert(code)
    }

    /// Exit time, or `now` while the session is still open
    pub fn effective_exit(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.exit_time.unwrap_or(now)
    }
}

impl Default for ParkingSession {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            vehicle_id: 0,
            space_id: 0,
            entry_time: now,
            exit_time: None,
            operator_entry_id: 0,
            operator_exit_id: None,
            active: true,
            ticket_code: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Insert payload for a new session
#[derive(Debug, Clone)]
pub struct NewParkingSession {
    pub vehicle_id: i64,
    pub space_id: i64,
    pub entry_time: DateTime<Utc>,
    pub operator_entry_id: i64,
}
