//! Payment model
//!
//! Settlement record for a completed session, at most one per session.
//!
//! Status transitions:
//!
//! | from      | to        | allowed |
//! |-----------|-----------|---------|
//! | Pending   | Paid      | yes     |
//! | Pending   | Cancelled | yes     |
//! | Paid      | any       | no      |
//! | Cancelled | any       | no      |

use crate::error::AppError;
use crate::AppResult;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the customer paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    CreditCard,
    DebitCard,
    Transfer,
    Other,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::CreditCard => write!(f, "credit_card"),
            PaymentMethod::DebitCard => write!(f, "debit_card"),
            PaymentMethod::Transfer => write!(f, "transfer"),
            PaymentMethod::Other => write!(f, "other"),
        }
    }
}

impl PaymentMethod {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Some(PaymentMethod::Cash),
            "credit_card" => Some(PaymentMethod::CreditCard),
            "debit_card" => Some(PaymentMethod::DebitCard),
            "transfer" => Some(PaymentMethod::Transfer),
            "other" => Some(PaymentMethod::Other),
            _ => None,
        }
    }
}

/// Payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Created, not yet settled
    #[default]
    Pending,
    /// Settled
    Paid,
    /// Voided before settlement
    Cancelled,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl PaymentStatus {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "cancelled" => Some(PaymentStatus::Cancelled),
            _ => None,
        }
    }

    /// Check if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    /// Check the transition table
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Paid)
                | (PaymentStatus::Pending, PaymentStatus::Cancelled)
        )
    }
}

/// Payment entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier
    pub id: i64,

    /// Settled session (unique)
    pub parking_session_id: i64,

    /// Amount charged
    pub total_amount: Decimal,

    /// Hours parked, rounded to 2 decimals
    pub hours_parked: Decimal,

    /// Hourly rate in force at settlement (snapshot)
    pub rate_applied: Decimal,

    /// Payment method
    pub payment_method: PaymentMethod,

    /// Current status
    pub status: PaymentStatus,

    /// Operator who took the payment
    pub operator_id: i64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// When the payment was settled
    pub paid_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Settle the payment
    pub fn mark_paid(&mut self, at: DateTime<Utc>) -> AppResult<()> {
        if !self.status.can_transition_to(PaymentStatus::Paid) {
            return Err(AppError::State(format!(
                "Payment {} cannot be settled (status: {})",
                self.id, self.status
            )));
        }

        self.status = PaymentStatus::Paid;
        self.paid_at = Some(at);
        Ok(())
    }

    /// Void the payment
    pub fn cancel(&mut self) -> AppResult<()> {
        if self.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "Payment {} is not cancellable (status: {})",
                self.id, self.status
            )));
        }

        self.status = PaymentStatus::Cancelled;
        Ok(())
    }
}

impl Default for Payment {
    fn default() -> Self {
        Self {
            id: 0,
            parking_session_id: 0,
            total_amount: Decimal::ZERO,
            hours_parked: Decimal::ZERO,
            rate_applied: Decimal::ZERO,
            payment_method: PaymentMethod::Cash,
            status: PaymentStatus::Pending,
            operator_id: 0,
            created_at: Utc::now(),
            paid_at: None,
        }
    }
}

/// Insert payload for a new payment; stored as `Pending`
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub parking_session_id: i64,
    pub total_amount: Decimal,
    pub hours_parked: Decimal,
    pub rate_applied: Decimal,
    pub payment_method: PaymentMethod,
    pub operator_id: i64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        use PaymentStatus::*;

        assert!(Pending.can_transition_to(Paid));
        assert!(Pending.can_transition_to(Cancelled));
        for from in [Paid, Cancelled] {
            for to in [Pending, Paid, Cancelled] {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn test_mark_paid() {
        let now = Utc::now();
        let mut p = Payment::default();
        p.mark_paid(now).unwrap();
        assert_eq!(p.status, PaymentStatus::Paid);
        assert_eq!(p.paid_at, Some(now));

        assert!(matches!(p.mark_paid(now), Err(AppError::State(_))));
        assert!(matches!(p.cancel(), Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_cancel() {
        let mut p = Payment::default();
        p.cancel().unwrap();
        assert_eq!(p.status, PaymentStatus::Cancelled);
        assert!(p.paid_at.is_none());
        assert!(p.status.is_terminal());

        assert!(matches!(p.cancel(), Err(AppError::Conflict(_))));
        assert!(matches!(p.mark_paid(Utc::now()), Err(AppError::State(_))));
    }

    #[test]
    fn test_parse_method_and_status() {
        assert_eq!(
            PaymentMethod::from_str("Credit_Card"),
            Some(PaymentMethod::CreditCard)
        );
        assert_eq!(PaymentMethod::from_str("bitcoin"), None);
        assert_eq!(PaymentStatus::from_str("PAID"), Some(PaymentStatus::Paid));
        assert_eq!(PaymentStatus::Cancelled.to_string(), "cancelled");
    }
}
