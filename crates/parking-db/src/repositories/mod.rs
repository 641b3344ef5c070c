//! PostgreSQL store
//!
//! [`PgParkingStore`] hands out [`PgParkingTx`] handles wrapping a sqlx
//! transaction. The per-entity trait implementations live in the sibling
//! modules; all of them run their queries on the same transaction, so a
//! service operation commits or rolls back as a whole.

pub mod directory_repo;
pub mod payment_repo;
pub mod rate_config_repo;
pub mod session_repo;
pub mod space_repo;

use async_trait::async_trait;
use parking_core::traits::{ParkingStore, ParkingTx};
use parking_core::{AppError, AppResult, ErrorKind};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, error, warn};

/// PostgreSQL implementation of ParkingStore
#[derive(Clone)]
pub struct PgParkingStore {
    pool: PgPool,
}

impl PgParkingStore {
    /// Create a new store over a pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ParkingStore for PgParkingStore {
    type Tx = PgParkingTx;

    async fn begin(&self) -> AppResult<PgParkingTx> {
        let tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        Ok(PgParkingTx { tx })
    }
}

/// Open PostgreSQL transaction
///
/// Rolled back on drop unless [`ParkingTx::commit`] was called.
pub struct PgParkingTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ParkingTx for PgParkingTx {
    async fn commit(self) -> AppResult<()> {
        self.tx.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        debug!("Transaction committed");
        Ok(())
    }
}

/// Build a `map_err` closure that converts and logs a sqlx error
///
/// Constraint violations are expected under contention and are logged at
/// `warn`; everything else is an infrastructure failure.
pub(crate) fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| {
        let err = AppError::from(e);
        match err.kind() {
            ErrorKind::Infrastructure => error!("Database error {}: {}", context, err),
            _ => warn!("Constraint rejected {}: {}", context, err),
        }
        err
    }
}
