//! Payment repository implementation
//!
//! Method and status are stored as their lowercase string forms.

use super::{db_error, PgParkingTx};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_core::{
    models::{NewPayment, Payment, PaymentMethod, PaymentStatus},
    traits::PaymentStore,
    AppError, AppResult,
};
use rust_decimal::Decimal;
use tracing::{debug, instrument};

const PAYMENT_COLUMNS: &str = "id, parking_session_id, total_amount, hours_parked, \
     rate_applied, payment_method, status, operator_id, created_at, paid_at";

#[async_trait]
impl PaymentStore for PgParkingTx {
    #[instrument(skip(self, payment), fields(session_id = payment.parking_session_id))]
    async fn insert_payment(&mut self, payment: &NewPayment) -> AppResult<Payment> {
        debug!(
            "Recording {} payment of {}",
            payment.payment_method, payment.total_amount
        );

        let row = sqlx::query_as::<sqlx::Postgres, PaymentRow>(&format!(
            r#"
            INSERT INTO payments (
                parking_session_id, total_amount, hours_parked, rate_applied,
                payment_method, status, operator_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(payment.parking_session_id)
        .bind(payment.total_amount)
        .bind(payment.hours_parked)
        .bind(payment.rate_applied)
        .bind(payment.payment_method.to_string())
        .bind(PaymentStatus::Pending.to_string())
        .bind(payment.operator_id)
        .bind(payment.created_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_error("creating payment"))?;

        row.try_into()
    }

    #[instrument(skip(self))]
    async fn find_payment(&mut self, id: i64) -> AppResult<Option<Payment>> {
        let row = sqlx::query_as::<sqlx::Postgres, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("finding payment"))?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self))]
    async fn lock_payment(&mut self, id: i64) -> AppResult<Option<Payment>> {
        let row = sqlx::query_as::<sqlx::Postgres, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("locking payment"))?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self))]
    async fn find_payment_by_session(&mut self, session_id: i64) -> AppResult<Option<Payment>> {
        let row = sqlx::query_as::<sqlx::Postgres, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE parking_session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("finding payment by session"))?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self, payment), fields(payment_id = payment.id))]
    async fn update_payment(&mut self, payment: &Payment) -> AppResult<Payment> {
        let row = sqlx::query_as::<sqlx::Postgres, PaymentRow>(&format!(
            r#"
            UPDATE payments
            SET status = $2,
                paid_at = $3
            WHERE id = $1
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(payment.id)
        .bind(payment.status.to_string())
        .bind(payment.paid_at)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("updating payment"))?
        .ok_or_else(|| AppError::NotFound(format!("Payment {} not found", payment.id)))?;

        row.try_into()
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: i64,
    parking_session_id: i64,
    total_amount: Decimal,
    hours_parked: Decimal,
    rate_applied: Decimal,
    payment_method: String,
    status: String,
    operator_id: i64,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = AppError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let payment_method = PaymentMethod::from_str(&row.payment_method).ok_or_else(|| {
            AppError::Internal(format!(
                "Payment {} has unknown method '{}'",
                row.id, row.payment_method
            ))
        })?;
        let status = PaymentStatus::from_str(&row.status).ok_or_else(|| {
            AppError::Internal(format!(
                "Payment {} has unknown status '{}'",
                row.id, row.status
            ))
        })?;

        Ok(Self {
            id: row.id,
            parking_session_id: row.parking_session_id,
            total_amount: row.total_amount,
            hours_parked: row.hours_parked,
            rate_applied: row.rate_applied,
            payment_method,
            status,
            operator_id: row.operator_id,
            created_at: row.created_at,
            paid_at: row.paid_at,
        })
    }
}
