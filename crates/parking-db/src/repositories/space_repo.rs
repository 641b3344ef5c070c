//! Parking space repository implementation
//!
//! Allocation locks the first free space with `FOR UPDATE SKIP LOCKED`, so
//! two concurrent entries for the same vehicle type never receive the same
//! space: the second transaction skips the row the first one holds.

use super::{db_error, PgParkingTx};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_core::{
    models::{NewParkingSpace, ParkingSpace, SpaceFilter},
    traits::SpaceStore,
    AppError, AppResult,
};
use tracing::{debug, instrument};

const SPACE_COLUMNS: &str = "id, space_number, vehicle_type_id, occupied, active, \
     occupied_by_plate, occupied_at, created_at, updated_at";

#[async_trait]
impl SpaceStore for PgParkingTx {
    #[instrument(skip(self, space))]
    async fn insert_space(&mut self, space: &NewParkingSpace) -> AppResult<ParkingSpace> {
        debug!("Creating parking space {}", space.space_number);

        let row = sqlx::query_as::<sqlx::Postgres, SpaceRow>(&format!(
            "INSERT INTO parking_spaces (space_number, vehicle_type_id) VALUES ($1, $2) \
             RETURNING {SPACE_COLUMNS}"
        ))
        .bind(&space.space_number)
        .bind(space.vehicle_type_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_error("creating parking space"))?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn find_space(&mut self, id: i64) -> AppResult<Option<ParkingSpace>> {
        let row = sqlx::query_as::<sqlx::Postgres, SpaceRow>(&format!(
            "SELECT {SPACE_COLUMNS} FROM parking_spaces WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("finding parking space"))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn lock_space(&mut self, id: i64) -> AppResult<Option<ParkingSpace>> {
        let row = sqlx::query_as::<sqlx::Postgres, SpaceRow>(&format!(
            "SELECT {SPACE_COLUMNS} FROM parking_spaces WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("locking parking space"))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_space_by_number(&mut self, space_number: &str) -> AppResult<Option<ParkingSpace>> {
        let row = sqlx::query_as::<sqlx::Postgres, SpaceRow>(&format!(
            "SELECT {SPACE_COLUMNS} FROM parking_spaces WHERE space_number = $1"
        ))
        .bind(space_number)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("finding parking space by number"))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn list_spaces(&mut self, filter: SpaceFilter) -> AppResult<Vec<ParkingSpace>> {
        let rows = sqlx::query_as::<sqlx::Postgres, SpaceRow>(&format!(
            r#"
            SELECT {SPACE_COLUMNS}
            FROM parking_spaces
            WHERE ($1::BIGINT IS NULL OR vehicle_type_id = $1)
                AND (NOT $2 OR (active AND NOT occupied))
            ORDER BY id
            "#
        ))
        .bind(filter.vehicle_type_id)
        .bind(filter.only_available)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error("listing parking spaces"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn lock_first_available_space(
        &mut self,
        vehicle_type_id: i64,
    ) -> AppResult<Option<ParkingSpace>> {
        let row = sqlx::query_as::<sqlx::Postgres, SpaceRow>(&format!(
            r#"
            SELECT {SPACE_COLUMNS}
            FROM parking_spaces
            WHERE vehicle_type_id = $1
                AND active
                AND NOT occupied
            ORDER BY id
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#
        ))
        .bind(vehicle_type_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("locking available parking space"))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self, space), fields(space_id = space.id))]
    async fn update_space(&mut self, space: &ParkingSpace) -> AppResult<ParkingSpace> {
        let row = sqlx::query_as::<sqlx::Postgres, SpaceRow>(&format!(
            r#"
            UPDATE parking_spaces
            SET occupied = $2,
                active = $3,
                occupied_by_plate = $4,
                occupied_at = $5,
                updated_at = $6
            WHERE id = $1
            RETURNING {SPACE_COLUMNS}
            "#
        ))
        .bind(space.id)
        .bind(space.occupied)
        .bind(space.active)
        .bind(&space.occupied_by_plate)
        .bind(space.occupied_at)
        .bind(space.updated_at)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("updating parking space"))?
        .ok_or_else(|| AppError::NotFound(format!("Parking space {} not found", space.id)))?;

        Ok(row.into())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct SpaceRow {
    id: i64,
    space_number: String,
    vehicle_type_id: i64,
    occupied: bool,
    active: bool,
    occupied_by_plate: Option<String>,
    occupied_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SpaceRow> for ParkingSpace {
    fn from(row: SpaceRow) -> Self {
        Self {
            id: row.id,
            space_number: row.space_number,
            vehicle_type_id: row.vehicle_type_id,
            occupied: row.occupied,
            active: row.active,
            occupied_by_plate: row.occupied_by_plate,
            occupied_at: row.occupied_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
