//! Operator model
//!
//! The acting principal for every state-mutating operation. Identity and
//! credentials live with the authentication collaborator; the parking core
//! only needs the id and a printable name.

use serde::{Deserialize, Serialize};

/// Lot operator (attendant or administrator)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operator {
    /// Unique identifier
    pub id: i64,

    /// Login name
    pub username: String,

    /// Full name shown on receipts
    pub full_name: String,

    /// Soft-delete flag
    pub active: bool,
}
