//! Rate configuration repository implementation

use super::{db_error, PgParkingTx};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_core::{
    models::{NewRateConfig, RateConfig},
    traits::RateConfigStore,
    AppError, AppResult,
};
use rust_decimal::Decimal;
use tracing::{debug, instrument};

const RATE_CONFIG_COLUMNS: &str = "id, vehicle_type_id, rate_per_hour, minimum_charge_hours, \
     maximum_daily_rate, active, created_at, updated_at";

#[async_trait]
impl RateConfigStore for PgParkingTx {
    #[instrument(skip(self, config), fields(vehicle_type_id = config.vehicle_type_id))]
    async fn insert_rate_config(&mut self, config: &NewRateConfig) -> AppResult<RateConfig> {
        debug!("Creating rate config at {}/hour", config.rate_per_hour);

        let row = sqlx::query_as::<sqlx::Postgres, RateConfigRow>(&format!(
            r#"
            INSERT INTO rate_configs (
                vehicle_type_id, rate_per_hour, minimum_charge_hours,
                maximum_daily_rate, active
            )
            VALUES ($1, $2, $3, $4, TRUE)
            RETURNING {RATE_CONFIG_COLUMNS}
            "#
        ))
        .bind(config.vehicle_type_id)
        .bind(config.rate_per_hour)
        .bind(config.minimum_charge_hours)
        .bind(config.maximum_daily_rate)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_error("creating rate config"))?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn find_rate_config(&mut self, id: i64) -> AppResult<Option<RateConfig>> {
        let row = sqlx::query_as::<sqlx::Postgres, RateConfigRow>(&format!(
            "SELECT {RATE_CONFIG_COLUMNS} FROM rate_configs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("finding rate config"))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_active_rate_config(
        &mut self,
        vehicle_type_id: i64,
    ) -> AppResult<Option<RateConfig>> {
        let row = sqlx::query_as::<sqlx::Postgres, RateConfigRow>(&format!(
            "SELECT {RATE_CONFIG_COLUMNS} FROM rate_configs \
             WHERE vehicle_type_id = $1 AND active"
        ))
        .bind(vehicle_type_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("finding active rate config"))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn list_rate_configs(
        &mut self,
        vehicle_type_id: Option<i64>,
    ) -> AppResult<Vec<RateConfig>> {
        let rows = sqlx::query_as::<sqlx::Postgres, RateConfigRow>(&format!(
            r#"
            SELECT {RATE_CONFIG_COLUMNS}
            FROM rate_configs
            WHERE ($1::BIGINT IS NULL OR vehicle_type_id = $1)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(vehicle_type_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error("listing rate configs"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn deactivate_rate_configs(&mut self, vehicle_type_id: i64) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE rate_configs
            SET active = FALSE, updated_at = NOW()
            WHERE vehicle_type_id = $1 AND active
            "#,
        )
        .bind(vehicle_type_id)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("deactivating rate configs"))?;

        debug!("Deactivated {} rate config(s)", result.rows_affected());
        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn set_rate_config_active(&mut self, id: i64, active: bool) -> AppResult<RateConfig> {
        let row = sqlx::query_as::<sqlx::Postgres, RateConfigRow>(&format!(
            r#"
            UPDATE rate_configs
            SET active = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {RATE_CONFIG_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("updating rate config"))?
        .ok_or_else(|| AppError::NotFound(format!("Rate config {} not found", id)))?;

        Ok(row.into())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct RateConfigRow {
    id: i64,
    vehicle_type_id: i64,
    rate_per_hour: Decimal,
    minimum_charge_hours: i32,
    maximum_daily_rate: Option<Decimal>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RateConfigRow> for RateConfig {
    fn from(row: RateConfigRow) -> Self {
        Self {
            id: row.id,
            vehicle_type_id: row.vehicle_type_id,
            rate_per_hour: row.rate_per_hour,
            minimum_charge_hours: row.minimum_charge_hours,
            maximum_daily_rate: row.maximum_daily_rate,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
