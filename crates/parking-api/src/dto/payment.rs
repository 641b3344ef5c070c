//! Payment DTOs

use chrono::{DateTime, Utc};
use parking_core::models::{Payment, PaymentMethod};
use parking_core::{AppError, AppResult};
use parking_services::{PaymentLookup, ProcessPaymentRequest};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Payment request for a completed session
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PaymentCreateRequest {
    #[validate(range(min = 1))]
    pub parking_session_id: Option<i64>,

    /// One of cash, credit_card, debit_card, transfer, other
    pub payment_method: Option<String>,

    /// Pre-computed amount; the fare is calculated when absent
    pub total_amount: Option<Decimal>,
}

impl PaymentCreateRequest {
    /// Convert to the service request, parsing the payment method
    pub fn to_service_request(&self, operator_id: Option<i64>) -> AppResult<ProcessPaymentRequest> {
        let payment_method = match self.payment_method.as_deref() {
            None => None,
            Some(raw) => Some(PaymentMethod::from_str(raw).ok_or_else(|| {
                AppError::Validation(format!("Unknown payment method '{}'", raw))
            })?),
        };

        Ok(ProcessPaymentRequest {
            session_id: self.parking_session_id,
            payment_method,
            operator_id,
            total_amount: self.total_amount,
        })
    }
}

/// Payment lookup query, exactly one key
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentQuery {
    pub id: Option<i64>,
    pub parking_session_id: Option<i64>,
}

impl PaymentQuery {
    pub fn lookup(&self) -> AppResult<PaymentLookup> {
        PaymentLookup::from_parts(self.id, self.parking_session_id)
    }
}

/// Payment response
#[derive(Debug, Clone, Serialize)]
pub struct PaymentResponse {
    pub id: i64,
    pub parking_session_id: i64,
    pub total_amount: Decimal,
    pub hours_parked: Decimal,
    pub rate_applied: Decimal,
    pub payment_method: String,
    pub status: String,
    pub operator_id: i64,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            parking_session_id: payment.parking_session_id,
            total_amount: payment.total_amount,
            hours_parked: payment.hours_parked,
            rate_applied: payment.rate_applied,
            payment_method: payment.payment_method.to_string(),
            status: payment.status.to_string(),
            operator_id: payment.operator_id,
            created_at: payment.created_at,
            paid_at: payment.paid_at,
        }
    }
}
