//! Directory lookups: vehicle types, vehicles, operators

use super::{db_error, PgParkingTx};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_core::{
    models::{Operator, Vehicle, VehicleType},
    traits::DirectoryStore,
    AppResult,
};
use tracing::{debug, instrument};

const VEHICLE_COLUMNS: &str =
    "id, license_plate, vehicle_type_id, active, created_at, updated_at";

#[async_trait]
impl DirectoryStore for PgParkingTx {
    #[instrument(skip(self))]
    async fn find_vehicle_type(&mut self, id: i64) -> AppResult<Option<VehicleType>> {
        let row = sqlx::query_as::<sqlx::Postgres, VehicleTypeRow>(
            "SELECT id, name, active FROM vehicle_types WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("finding vehicle type"))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn lock_vehicle_type(&mut self, id: i64) -> AppResult<Option<VehicleType>> {
        let row = sqlx::query_as::<sqlx::Postgres, VehicleTypeRow>(
            "SELECT id, name, active FROM vehicle_types WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("locking vehicle type"))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn list_vehicle_types(&mut self) -> AppResult<Vec<VehicleType>> {
        let rows = sqlx::query_as::<sqlx::Postgres, VehicleTypeRow>(
            "SELECT id, name, active FROM vehicle_types ORDER BY id",
        )
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error("listing vehicle types"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn insert_vehicle_type(&mut self, name: &str) -> AppResult<VehicleType> {
        debug!("Registering vehicle type {}", name);

        let row = sqlx::query_as::<sqlx::Postgres, VehicleTypeRow>(
            "INSERT INTO vehicle_types (name) VALUES ($1) RETURNING id, name, active",
        )
        .bind(name)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_error("inserting vehicle type"))?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn find_vehicle(&mut self, id: i64) -> AppResult<Option<Vehicle>> {
        let row = sqlx::query_as::<sqlx::Postgres, VehicleRow>(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("finding vehicle"))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_vehicle_by_plate(&mut self, plate: &str) -> AppResult<Option<Vehicle>> {
        debug!("Finding vehicle by plate: {}", plate);

        let row = sqlx::query_as::<sqlx::Postgres, VehicleRow>(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE license_plate = $1"
        ))
        .bind(Vehicle::normalize_plate(plate))
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("finding vehicle by plate"))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn lock_vehicle(&mut self, id: i64) -> AppResult<Option<Vehicle>> {
        let row = sqlx::query_as::<sqlx::Postgres, VehicleRow>(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("locking vehicle"))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn insert_vehicle(&mut self, plate: &str, vehicle_type_id: i64) -> AppResult<Vehicle> {
        let row = sqlx::query_as::<sqlx::Postgres, VehicleRow>(&format!(
            "INSERT INTO vehicles (license_plate, vehicle_type_id) VALUES ($1, $2) \
             RETURNING {VEHICLE_COLUMNS}"
        ))
        .bind(Vehicle::normalize_plate(plate))
        .bind(vehicle_type_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_error("inserting vehicle"))?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn find_operator(&mut self, id: i64) -> AppResult<Option<Operator>> {
        let row = sqlx::query_as::<sqlx::Postgres, OperatorRow>(
            "SELECT id, username, full_name, active FROM operators WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("finding operator"))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn insert_operator(&mut self, username: &str, full_name: &str) -> AppResult<Operator> {
        let row = sqlx::query_as::<sqlx::Postgres, OperatorRow>(
            "INSERT INTO operators (username, full_name) VALUES ($1, $2) \
             RETURNING id, username, full_name, active",
        )
        .bind(username)
        .bind(full_name)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_error("inserting operator"))?;

        Ok(row.into())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VehicleTypeRow {
    id: i64,
    name: String,
    active: bool,
}

impl From<VehicleTypeRow> for VehicleType {
    fn from(row: VehicleTypeRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            active: row.active,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VehicleRow {
    id: i64,
    license_plate: String,
    vehicle_type_id: i64,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<VehicleRow> for Vehicle {
    fn from(row: VehicleRow) -> Self {
        Self {
            id: row.id,
            license_plate: row.license_plate,
            vehicle_type_id: row.vehicle_type_id,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OperatorRow {
    id: i64,
    username: String,
    full_name: String,
    active: bool,
}

impl From<OperatorRow> for Operator {
    fn from(row: OperatorRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            full_name: row.full_name,
            active: row.active,
        }
    }
}
