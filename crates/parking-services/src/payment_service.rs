//! Payment service
//!
//! Settles completed sessions. A payment is inserted as `Pending` and moved
//! to `Paid` in the same transaction; only a `Pending` payment can be
//! cancelled. The unique index on the session id backs the one-payment-per-
//! session rule when two settlements race.

use parking_core::{
    billing,
    models::{NewPayment, Payment, PaymentMethod},
    traits::{ParkingStore, ParkingTx, PaymentStore, SessionStore},
    AppError, AppResult, Clock,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::session_service::{find_active_rate, find_operator, find_vehicle, find_vehicle_type};

/// Settlement request; every field but the amount is required
#[derive(Debug, Clone, Default)]
pub struct ProcessPaymentRequest {
    pub session_id: Option<i64>,
    pub payment_method: Option<PaymentMethod>,
    pub operator_id: Option<i64>,
    /// Overrides the computed fare when present
    pub total_amount: Option<Decimal>,
}

/// Payment lookup key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentLookup {
    ById(i64),
    BySession(i64),
}

impl PaymentLookup {
    /// Exactly one of the two identifiers must be given
    pub fn from_parts(id: Option<i64>, parking_session_id: Option<i64>) -> AppResult<Self> {
        match (id, parking_session_id) {
            (Some(id), None) => Ok(PaymentLookup::ById(id)),
            (None, Some(session_id)) => Ok(PaymentLookup::BySession(session_id)),
            (None, None) => Err(AppError::Validation(
                "Payment id or parking session id is required".to_string(),
            )),
            (Some(_), Some(_)) => Err(AppError::Validation(
                "Provide either payment id or parking session id, not both".to_string(),
            )),
        }
    }
}

/// Payment service
pub struct PaymentService<S: ParkingStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: ParkingStore> PaymentService<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Settle a completed session
    ///
    /// # Errors
    ///
    /// - `Validation` for a missing session, method or operator, or an
    ///   amount that is negative or does not fit a money column
    /// - `NotFound` for an unknown session or operator
    /// - `Conflict` if the session already has a payment
    /// - `State` if the session is still active
    /// - `Calculation` if the vehicle type has no active rate config
    #[instrument(skip(self))]
    pub async fn process_payment(&self, request: ProcessPaymentRequest) -> AppResult<Payment> {
        let session_id = request
            .session_id
            .ok_or_else(|| AppError::Validation("Parking session is required".to_string()))?;
        let payment_method = request
            .payment_method
            .ok_or_else(|| AppError::Validation("Payment method is required".to_string()))?;
        let operator_id = request
            .operator_id
            .ok_or_else(|| AppError::Validation("Operator is required".to_string()))?;
        if let Some(amount) = request.total_amount {
            if amount < Decimal::ZERO {
                return Err(AppError::Validation(format!(
                    "Payment amount cannot be negative (got {})",
                    amount
                )));
            }
            billing::validate_money("Payment amount", amount)?;
        }

        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let session = tx.lock_session(session_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("Parking session {} not found", session_id))
        })?;

        if let Some(existing) = tx.find_payment_by_session(session_id).await? {
            warn!(
                "Session {} already settled by payment {}",
                session_id, existing.id
            );
            return Err(AppError::Conflict(format!(
                "Session {} already has a payment",
                session_id
            )));
        }

        let exit_time = match session.exit_time {
            Some(exit) if !session.active => exit,
            _ => {
                return Err(AppError::State(format!(
                    "Session {} is still active; register the exit first",
                    session_id
                )))
            }
        };

        let vehicle = find_vehicle(&mut tx, session.vehicle_id).await?;
        let vehicle_type = find_vehicle_type(&mut tx, vehicle.vehicle_type_id).await?;
        let rate = find_active_rate(&mut tx, &vehicle_type).await?;
        let operator = find_operator(&mut tx, operator_id).await?;

        let bill = billing::calculate(session.entry_time, exit_time, &rate)?;
        let total_amount = request
            .total_amount
            .map(billing::round_2dp)
            .unwrap_or(bill.total_amount);

        let mut payment = tx
            .insert_payment(&NewPayment {
                parking_session_id: session.id,
                total_amount,
                hours_parked: bill.hours_parked_rounded(),
                rate_applied: rate.rate_per_hour,
                payment_method,
                operator_id: operator.id,
                created_at: now,
            })
            .await?;
        payment.mark_paid(now)?;
        let payment = tx.update_payment(&payment).await?;

        tx.commit().await?;

        info!(
            "Payment {} settled session {}: {} by {}",
            payment.id, session_id, payment.total_amount, payment.payment_method
        );
        Ok(payment)
    }

    #[instrument(skip(self))]
    pub async fn get_payment(&self, lookup: PaymentLookup) -> AppResult<Payment> {
        let mut tx = self.store.begin().await?;
        match lookup {
            PaymentLookup::ById(id) => tx
                .find_payment(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Payment {} not found", id))),
            PaymentLookup::BySession(session_id) => tx
                .find_payment_by_session(session_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("No payment for parking session {}", session_id))
                }),
        }
    }

    /// Void a pending payment
    ///
    /// Fails with `Conflict` unless the payment is `Pending`.
    #[instrument(skip(self))]
    pub async fn cancel_payment(&self, id: i64) -> AppResult<Payment> {
        let mut tx = self.store.begin().await?;

        let mut payment = tx
            .lock_payment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payment {} not found", id)))?;
        payment.cancel()?;
        let payment = tx.update_payment(&payment).await?;
        tx.commit().await?;

        info!("Payment {} cancelled", id);
        Ok(payment)
    }
}
