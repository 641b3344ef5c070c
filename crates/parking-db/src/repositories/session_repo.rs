//! Parking session repository implementation
//!
//! The partial unique index `uq_parking_sessions_active_vehicle` backs the
//! one-active-session-per-vehicle rule; a racing insert surfaces as
//! `AppError::Conflict`.

use super::{db_error, PgParkingTx};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_core::{
    models::{NewParkingSession, ParkingSession},
    traits::SessionStore,
    AppError, AppResult,
};
use tracing::{debug, instrument};

const SESSION_COLUMNS: &str = "id, vehicle_id, space_id, entry_time, exit_time, \
     operator_entry_id, operator_exit_id, active, ticket_code, created_at, updated_at";

#[async_trait]
impl SessionStore for PgParkingTx {
    #[instrument(skip(self, session), fields(vehicle_id = session.vehicle_id))]
    async fn insert_session(&mut self, session: &NewParkingSession) -> AppResult<ParkingSession> {
        debug!("Creating session in space {}", session.space_id);

        let row = sqlx::query_as::<sqlx::Postgres, SessionRow>(&format!(
            r#"
            INSERT INTO parking_sessions (
                vehicle_id, space_id, entry_time, operator_entry_id,
                active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, TRUE, $3, $3)
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(session.vehicle_id)
        .bind(session.space_id)
        .bind(session.entry_time)
        .bind(session.operator_entry_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_error("creating parking session"))?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn find_session(&mut self, id: i64) -> AppResult<Option<ParkingSession>> {
        let row = sqlx::query_as::<sqlx::Postgres, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM parking_sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("finding parking session"))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn lock_session(&mut self, id: i64) -> AppResult<Option<ParkingSession>> {
        let row = sqlx::query_as::<sqlx::Postgres, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM parking_sessions WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("locking parking session"))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_session_by_ticket(&mut self, ticket_code: &str) -> AppResult<Option<ParkingSession>> {
        let row = sqlx::query_as::<sqlx::Postgres, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM parking_sessions WHERE ticket_code = $1"
        ))
        .bind(ticket_code)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("finding parking session by ticket"))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn lock_session_by_ticket(&mut self, ticket_code: &str) -> AppResult<Option<ParkingSession>> {
        let row = sqlx::query_as::<sqlx::Postgres, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM parking_sessions WHERE ticket_code = $1 FOR UPDATE"
        ))
        .bind(ticket_code)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("locking parking session by ticket"))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_active_session_for_vehicle(
        &mut self,
        vehicle_id: i64,
    ) -> AppResult<Option<ParkingSession>> {
        let row = sqlx::query_as::<sqlx::Postgres, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM parking_sessions WHERE vehicle_id = $1 AND active"
        ))
        .bind(vehicle_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("finding active session"))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn lock_active_sessions_for_vehicle(
        &mut self,
        vehicle_id: i64,
    ) -> AppResult<Vec<ParkingSession>> {
        let rows = sqlx::query_as::<sqlx::Postgres, SessionRow>(&format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM parking_sessions
            WHERE vehicle_id = $1 AND active
            ORDER BY id
            FOR UPDATE
            "#
        ))
        .bind(vehicle_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error("locking active sessions"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn list_active_sessions(&mut self) -> AppResult<Vec<ParkingSession>> {
        let rows = sqlx::query_as::<sqlx::Postgres, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM parking_sessions WHERE active ORDER BY entry_time, id"
        ))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error("listing active sessions"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn list_completed_sessions_for_vehicle(
        &mut self,
        vehicle_id: i64,
        limit: i64,
    ) -> AppResult<Vec<ParkingSession>> {
        let rows = sqlx::query_as::<sqlx::Postgres, SessionRow>(&format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM parking_sessions
            WHERE vehicle_id = $1 AND NOT active
            ORDER BY exit_time DESC, id DESC
            LIMIT $2
            "#
        ))
        .bind(vehicle_id)
        .bind(limit)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error("listing session history"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, session), fields(session_id = session.id))]
    async fn update_session(&mut self, session: &ParkingSession) -> AppResult<ParkingSession> {
        let row = sqlx::query_as::<sqlx::Postgres, SessionRow>(&format!(
            r#"
            UPDATE parking_sessions
            SET exit_time = $2,
                operator_exit_id = $3,
                active = $4,
                ticket_code = $5,
                updated_at = $6
            WHERE id = $1
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(session.id)
        .bind(session.exit_time)
        .bind(session.operator_exit_id)
        .bind(session.active)
        .bind(&session.ticket_code)
        .bind(session.updated_at)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("updating parking session"))?
        .ok_or_else(|| AppError::NotFound(format!("Parking session {} not found", session.id)))?;

        Ok(row.into())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: i64,
    vehicle_id: i64,
    space_id: i64,
    entry_time: DateTime<Utc>,
    exit_time: Option<DateTime<Utc>>,
    operator_entry_id: i64,
    operator_exit_id: Option<i64>,
    active: bool,
    ticket_code: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SessionRow> for ParkingSession {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.id,
            vehicle_id: row.vehicle_id,
            space_id: row.space_id,
            entry_time: row.entry_time,
            exit_time: row.exit_time,
            operator_entry_id: row.operator_entry_id,
            operator_exit_id: row.operator_exit_id,
            active: row.active,
            ticket_code: row.ticket_code,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
