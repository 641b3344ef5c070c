//! Parking session service
//!
//! Drives the session state machine (Active -> Completed):
//! - Entry: resolve the vehicle, allocate a space, open the session, assign
//!   its ticket code
//! - Exit: close the session, bill it, free the space
//! - Lookups and live fare estimates
//!
//! Each mutating call is one store transaction. Any error before commit
//! drops the transaction, so a failed exit leaves the session open and the
//! space occupied.

use chrono::{DateTime, Utc};
use parking_core::{
    billing::{self, round_2dp, BillingBreakdown},
    models::{
        NewParkingSession, Operator, ParkingSession, ParkingSpace, RateConfig, SessionStatus,
        Vehicle, VehicleType,
    },
    traits::{DirectoryStore, ParkingStore, ParkingTx, RateConfigStore, SessionStore, SpaceStore},
    AppError, AppResult, Clock,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::format::TimeFormatter;
use crate::space_allocator;

/// Most completed sessions returned by one history query
pub const MAX_HISTORY_LIMIT: i64 = 100;

/// Vehicle entry request
#[derive(Debug, Clone, Default)]
pub struct StartSessionRequest {
    pub license_plate: String,
    pub operator_id: Option<i64>,
}

/// How an exit identifies its session; exactly one key is allowed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionLookup {
    Plate(String),
    SessionId(i64),
    Ticket(String),
}

impl SessionLookup {
    /// Build a lookup from optional keys
    ///
    /// Blank strings count as absent. Fails with `Validation` unless exactly
    /// one key is present.
    pub fn from_parts(
        license_plate: Option<&str>,
        session_id: Option<i64>,
        ticket_code: Option<&str>,
    ) -> AppResult<Self> {
        let plate = license_plate
            .map(Vehicle::normalize_plate)
            .filter(|p| !p.is_empty());
        let ticket = ticket_code
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        match (plate, session_id, ticket) {
            (Some(plate), None, None) => Ok(SessionLookup::Plate(plate)),
            (None, Some(id), None) => Ok(SessionLookup::SessionId(id)),
            (None, None, Some(ticket)) => Ok(SessionLookup::Ticket(ticket)),
            (None, None, None) => Err(AppError::Validation(
                "One of license plate, session id or ticket code is required".to_string(),
            )),
            _ => Err(AppError::Validation(
                "Provide only one of license plate, session id or ticket code".to_string(),
            )),
        }
    }
}

/// Vehicle exit request
#[derive(Debug, Clone)]
pub struct EndSessionRequest {
    pub lookup: SessionLookup,
    pub operator_id: Option<i64>,
}

/// Outcome of a registered entry
#[derive(Debug, Clone, Serialize)]
pub struct SessionStartResult {
    pub session_id: i64,
    pub ticket_code: String,
    pub license_plate: String,
    pub vehicle_type: String,
    pub space_number: String,
    pub operator_name: String,
    pub entry_time: DateTime<Utc>,
    pub entry_time_display: String,
}

/// Outcome of a registered exit
#[derive(Debug, Clone, Serialize)]
pub struct SessionEndResult {
    pub session_id: i64,
    pub ticket_code: Option<String>,
    pub license_plate: String,
    pub vehicle_type: String,
    pub space_number: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_time_display: String,
    pub exit_time_display: String,
    /// Parked hours rounded to 2 decimals
    pub hours_parked: Decimal,
    pub total_amount: Decimal,
    pub operator_name: String,
}

/// One row of the active-session board
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: i64,
    pub ticket_code: Option<String>,
    pub license_plate: String,
    pub vehicle_type: String,
    pub space_number: String,
    pub entry_time: DateTime<Utc>,
    pub entry_time_display: String,
    /// Hours since entry, rounded to 2 decimals
    pub elapsed_hours: Decimal,
}

/// Full view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    pub session_id: i64,
    pub ticket_code: Option<String>,
    pub status: SessionStatus,
    pub license_plate: String,
    pub vehicle_type: String,
    pub space_number: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub entry_time_display: String,
    pub exit_time_display: Option<String>,
    pub entry_operator: String,
    pub exit_operator: Option<String>,
    /// Hours parked so far (or in total once completed), rounded to 2 decimals
    pub hours_parked: Decimal,
    /// Fare under the active rate config; `None` when the type has none
    pub amount: Option<Decimal>,
}

/// Fare computed for a session
#[derive(Debug, Clone, Serialize)]
pub struct AmountEstimate {
    pub session_id: i64,
    pub license_plate: String,
    pub vehicle_type: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    /// Parked hours rounded to 2 decimals
    pub hours_parked: Decimal,
    pub billable_hours: Decimal,
    pub charged_hours: Decimal,
    pub rate_per_hour: Decimal,
    pub minimum_charge_hours: i32,
    pub maximum_daily_rate: Option<Decimal>,
    pub daily_cap_applied: bool,
    pub total_amount: Decimal,
    /// The session is still open and `exit_time` is the current time
    pub is_estimate: bool,
}

/// Parking session service
pub struct SessionService<S: ParkingStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    formatter: TimeFormatter,
}

impl<S: ParkingStore> SessionService<S> {
    /// Create a new session service
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, formatter: TimeFormatter) -> Self {
        Self {
            store,
            clock,
            formatter,
        }
    }

    /// Register a vehicle entry
    ///
    /// # Errors
    ///
    /// - `Validation` if the operator is missing or the plate is blank
    /// - `NotFound` for an unknown vehicle or operator
    /// - `State` if the vehicle is deactivated
    /// - `Conflict` if the vehicle already has an active session
    /// - `ResourceExhausted` if no space is free for the vehicle type
    #[instrument(skip(self, request), fields(plate = %request.license_plate))]
    pub async fn start_session(&self, request: StartSessionRequest) -> AppResult<SessionStartResult> {
        let operator_id = request
            .operator_id
            .ok_or_else(|| AppError::Validation("Operator is required".to_string()))?;
        let plate = Vehicle::normalize_plate(&request.license_plate);
        if plate.is_empty() {
            return Err(AppError::Validation("License plate is required".to_string()));
        }

        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let vehicle = tx
            .find_vehicle_by_plate(&plate)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Vehicle {} not found", plate)))?;
        let vehicle = tx
            .lock_vehicle(vehicle.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Vehicle {} not found", plate)))?;
        if !vehicle.active {
            return Err(AppError::State(format!("Vehicle {} is deactivated", plate)));
        }

        let open = tx.lock_active_sessions_for_vehicle(vehicle.id).await?;
        if !open.is_empty() {
            warn!("Vehicle {} already parked (session {})", plate, open[0].id);
            return Err(AppError::Conflict(format!(
                "Vehicle {} is already parked",
                plate
            )));
        }

        let space =
            space_allocator::allocate(&mut tx, vehicle.vehicle_type_id, &vehicle.license_plate, now)
                .await?;

        let operator = find_operator(&mut tx, operator_id).await?;
        let vehicle_type = find_vehicle_type(&mut tx, vehicle.vehicle_type_id).await?;

        let mut session = tx
            .insert_session(&NewParkingSession {
                vehicle_id: vehicle.id,
                space_id: space.id,
                entry_time: now,
                operator_entry_id: operator.id,
            })
            .await?;
        session.assign_ticket_code(self.formatter.timezone());
        let session = tx.update_session(&session).await?;

        tx.commit().await?;

        let ticket_code = session.ticket_code.clone().unwrap_or_default();
        info!(
            "Session {} started: {} in space {} (ticket {})",
            session.id, vehicle.license_plate, space.space_number, ticket_code
        );

        Ok(SessionStartResult {
            session_id: session.id,
            ticket_code,
            license_plate: vehicle.license_plate,
            vehicle_type: vehicle_type.name,
            space_number: space.space_number,
            operator_name: operator.full_name,
            entry_time: session.entry_time,
            entry_time_display: self.formatter.format(session.entry_time),
        })
    }

    /// Register a vehicle exit and bill the stay
    ///
    /// # Errors
    ///
    /// - `Validation` if the operator is missing
    /// - `NotFound` for an unknown vehicle, session id, or operator, and for a
    ///   ticket without an open session
    /// - `Conflict` if a plate or session id has no open session
    /// - `Calculation` if the vehicle type has no active rate config
    #[instrument(skip(self, request), fields(lookup = ?request.lookup))]
    pub async fn end_session(&self, request: EndSessionRequest) -> AppResult<SessionEndResult> {
        let operator_id = request
            .operator_id
            .ok_or_else(|| AppError::Validation("Operator is required".to_string()))?;

        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let mut session = resolve_open_session(&mut tx, &request.lookup).await?;
        let operator = find_operator(&mut tx, operator_id).await?;

        session.mark_exit(operator.id, now)?;

        let vehicle = find_vehicle(&mut tx, session.vehicle_id).await?;
        let vehicle_type = find_vehicle_type(&mut tx, vehicle.vehicle_type_id).await?;
        let rate = find_active_rate(&mut tx, &vehicle_type).await?;
        let bill = billing::calculate(session.entry_time, now, &rate)?;

        let space =
            space_allocator::release(&mut tx, session.space_id, &vehicle.license_plate, now)
                .await?;
        let session = tx.update_session(&session).await?;

        tx.commit().await?;

        info!(
            "Session {} closed: {} left space {} after {} h, charged {}",
            session.id,
            vehicle.license_plate,
            space.space_number,
            bill.hours_parked_rounded(),
            bill.total_amount
        );

        Ok(SessionEndResult {
            session_id: session.id,
            ticket_code: session.ticket_code.clone(),
            license_plate: vehicle.license_plate,
            vehicle_type: vehicle_type.name,
            space_number: space.space_number,
            entry_time: session.entry_time,
            exit_time: now,
            entry_time_display: self.formatter.format(session.entry_time),
            exit_time_display: self.formatter.format(now),
            hours_parked: bill.hours_parked_rounded(),
            total_amount: bill.total_amount,
            operator_name: operator.full_name,
        })
    }

    /// Vehicles currently inside, oldest entry first
    #[instrument(skip(self))]
    pub async fn get_active_sessions(&self) -> AppResult<Vec<SessionSummary>> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let sessions = tx.list_active_sessions().await?;
        let mut summaries = Vec::with_capacity(sessions.len());
        for session in sessions {
            let ctx = SessionContext::load(&mut tx, &session).await?;
            summaries.push(SessionSummary {
                session_id: session.id,
                ticket_code: session.ticket_code.clone(),
                license_plate: ctx.vehicle.license_plate,
                vehicle_type: ctx.vehicle_type.name,
                space_number: ctx.space.space_number,
                entry_time: session.entry_time,
                entry_time_display: self.formatter.format(session.entry_time),
                elapsed_hours: round_2dp(billing::parked_hours(session.entry_time, now)),
            });
        }

        debug!("{} active sessions", summaries.len());
        Ok(summaries)
    }

    /// Active session of a vehicle with its live fare
    ///
    /// Fails with `NotFound` if the vehicle is unknown or not parked.
    #[instrument(skip(self))]
    pub async fn get_session_by_vehicle(&self, license_plate: &str) -> AppResult<SessionDetail> {
        let plate = Vehicle::normalize_plate(license_plate);
        if plate.is_empty() {
            return Err(AppError::Validation("License plate is required".to_string()));
        }

        let mut tx = self.store.begin().await?;
        let vehicle = tx
            .find_vehicle_by_plate(&plate)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Vehicle {} not found", plate)))?;

        let session = tx
            .find_active_session_for_vehicle(vehicle.id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No active session for vehicle {}", plate))
            })?;

        self.detail(&mut tx, session).await
    }

    #[instrument(skip(self))]
    pub async fn get_session(&self, session_id: i64) -> AppResult<SessionDetail> {
        let mut tx = self.store.begin().await?;
        let session = tx
            .find_session(session_id)
            .await?
            .ok_or_else(|| session_not_found(session_id))?;

        self.detail(&mut tx, session).await
    }

    /// Session by ticket code, in any state
    #[instrument(skip(self))]
    pub async fn get_session_by_ticket(&self, ticket_code: &str) -> AppResult<SessionDetail> {
        let mut tx = self.store.begin().await?;
        let session = tx
            .find_session_by_ticket(ticket_code.trim())
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No session with ticket {}", ticket_code.trim()))
            })?;

        self.detail(&mut tx, session).await
    }

    /// Completed sessions of a vehicle, most recent exit first
    #[instrument(skip(self))]
    pub async fn session_history(
        &self,
        license_plate: &str,
        limit: i64,
    ) -> AppResult<Vec<SessionDetail>> {
        if limit < 1 {
            return Err(AppError::Validation(format!(
                "History limit must be at least 1 (got {})",
                limit
            )));
        }
        let plate = Vehicle::normalize_plate(license_plate);

        let mut tx = self.store.begin().await?;
        let vehicle = tx
            .find_vehicle_by_plate(&plate)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Vehicle {} not found", plate)))?;

        let sessions = tx
            .list_completed_sessions_for_vehicle(vehicle.id, limit.min(MAX_HISTORY_LIMIT))
            .await?;
        let mut history = Vec::with_capacity(sessions.len());
        for session in sessions {
            history.push(self.detail(&mut tx, session).await?);
        }
        Ok(history)
    }

    /// Fare for a session under its vehicle type's active rate config
    ///
    /// Open sessions are priced up to now and flagged as estimates; closed
    /// sessions are priced at their recorded exit.
    #[instrument(skip(self))]
    pub async fn calculate_amount(&self, session_id: i64) -> AppResult<AmountEstimate> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let session = tx
            .find_session(session_id)
            .await?
            .ok_or_else(|| session_not_found(session_id))?;
        let vehicle = find_vehicle(&mut tx, session.vehicle_id).await?;
        let vehicle_type = find_vehicle_type(&mut tx, vehicle.vehicle_type_id).await?;
        let rate = find_active_rate(&mut tx, &vehicle_type).await?;

        let bill = billing::calculate(session.entry_time, session.effective_exit(now), &rate)?;

        Ok(AmountEstimate {
            license_plate: vehicle.license_plate,
            vehicle_type: vehicle_type.name,
            is_estimate: session.active,
            ..AmountEstimate::from_breakdown(session.id, &bill)
        })
    }

    async fn detail(
        &self,
        tx: &mut S::Tx,
        session: ParkingSession,
    ) -> AppResult<SessionDetail> {
        let now = self.clock.now();
        let ctx = SessionContext::load(tx, &session).await?;
        let exit = session.effective_exit(now);

        let amount = match tx.find_active_rate_config(ctx.vehicle.vehicle_type_id).await? {
            Some(rate) => Some(billing::calculate(session.entry_time, exit, &rate)?.total_amount),
            None => None,
        };

        Ok(SessionDetail {
            session_id: session.id,
            ticket_code: session.ticket_code.clone(),
            status: session.status(),
            license_plate: ctx.vehicle.license_plate,
            vehicle_type: ctx.vehicle_type.name,
            space_number: ctx.space.space_number,
            entry_time: session.entry_time,
            exit_time: session.exit_time,
            entry_time_display: self.formatter.format(session.entry_time),
            exit_time_display: session.exit_time.map(|t| self.formatter.format(t)),
            entry_operator: ctx.entry_operator.full_name,
            exit_operator: ctx.exit_operator.map(|o| o.full_name),
            hours_parked: round_2dp(billing::parked_hours(session.entry_time, exit)),
            amount,
        })
    }
}

impl AmountEstimate {
    fn from_breakdown(session_id: i64, bill: &BillingBreakdown) -> Self {
        Self {
            session_id,
            license_plate: String::new(),
            vehicle_type: String::new(),
            entry_time: bill.entry_time,
            exit_time: bill.exit_time,
            hours_parked: bill.hours_parked_rounded(),
            billable_hours: bill.billable_hours,
            charged_hours: bill.charged_hours,
            rate_per_hour: bill.rate_per_hour,
            minimum_charge_hours: bill.minimum_charge_hours,
            maximum_daily_rate: bill.maximum_daily_rate,
            daily_cap_applied: bill.daily_cap_applied,
            total_amount: bill.total_amount,
            is_estimate: false,
        }
    }
}

/// Rows a session refers to
struct SessionContext {
    vehicle: Vehicle,
    vehicle_type: VehicleType,
    space: ParkingSpace,
    entry_operator: Operator,
    exit_operator: Option<Operator>,
}

impl SessionContext {
    async fn load<T: ParkingTx>(tx: &mut T, session: &ParkingSession) -> AppResult<Self> {
        let vehicle = find_vehicle(tx, session.vehicle_id).await?;
        let vehicle_type = find_vehicle_type(tx, vehicle.vehicle_type_id).await?;
        let space = tx
            .find_space(session.space_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Parking space {} not found", session.space_id)))?;
        let entry_operator = find_operator(tx, session.operator_entry_id).await?;
        let exit_operator = match session.operator_exit_id {
            Some(id) => Some(find_operator(tx, id).await?),
            None => None,
        };

        Ok(Self {
            vehicle,
            vehicle_type,
            space,
            entry_operator,
            exit_operator,
        })
    }
}

/// Resolve and lock the open session an exit refers to
async fn resolve_open_session<T: ParkingTx>(
    tx: &mut T,
    lookup: &SessionLookup,
) -> AppResult<ParkingSession> {
    match lookup {
        SessionLookup::Plate(plate) => {
            let vehicle = tx
                .find_vehicle_by_plate(plate)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Vehicle {} not found", plate)))?;

            let mut open = tx.lock_active_sessions_for_vehicle(vehicle.id).await?;
            match open.len() {
                0 => Err(AppError::Conflict(format!(
                    "No active session for vehicle {}",
                    plate
                ))),
                1 => Ok(open.remove(0)),
                n => {
                    warn!("Vehicle {} has {} active sessions", plate, n);
                    Err(AppError::Conflict(format!(
                        "Vehicle {} has {} active sessions",
                        plate, n
                    )))
                }
            }
        }
        SessionLookup::SessionId(id) => {
            let session = tx
                .lock_session(*id)
                .await?
                .ok_or_else(|| session_not_found(*id))?;
            if !session.can_register_exit() {
                return Err(AppError::Conflict(format!(
                    "No active session with id {}",
                    id
                )));
            }
            Ok(session)
        }
        SessionLookup::Ticket(code) => tx
            .lock_session_by_ticket(code)
            .await?
            .filter(ParkingSession::can_register_exit)
            .ok_or_else(|| AppError::NotFound(format!("No active session for ticket {}", code))),
    }
}

pub(crate) async fn find_active_rate<T: RateConfigStore>(
    tx: &mut T,
    vehicle_type: &VehicleType,
) -> AppResult<RateConfig> {
    tx.find_active_rate_config(vehicle_type.id)
        .await?
        .ok_or_else(|| {
            warn!("No active rate config for vehicle type {}", vehicle_type.name);
            AppError::Calculation(format!(
                "No active rate configuration for vehicle type {}",
                vehicle_type.name
            ))
        })
}

pub(crate) async fn find_vehicle<T: DirectoryStore>(tx: &mut T, id: i64) -> AppResult<Vehicle> {
    tx.find_vehicle(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Vehicle {} not found", id)))
}

pub(crate) async fn find_vehicle_type<T: DirectoryStore>(
    tx: &mut T,
    id: i64,
) -> AppResult<VehicleType> {
    tx.find_vehicle_type(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Vehicle type {} not found", id)))
}

pub(crate) async fn find_operator<T: DirectoryStore>(tx: &mut T, id: i64) -> AppResult<Operator> {
    tx.find_operator(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Operator {} not found", id)))
}

fn session_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Parking session {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture, Fixture};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn start(plate: &str, operator: i64) -> StartSessionRequest {
        StartSessionRequest {
            license_plate: plate.to_string(),
            operator_id: Some(operator),
        }
    }

    fn exit_by_plate(plate: &str, operator: i64) -> EndSessionRequest {
        EndSessionRequest {
            lookup: SessionLookup::Plate(plate.to_string()),
            operator_id: Some(operator),
        }
    }

    #[test]
    fn test_lookup_requires_exactly_one_key() {
        assert_eq!(
            SessionLookup::from_parts(Some(" abc123 "), None, None).unwrap(),
            SessionLookup::Plate("ABC123".to_string())
        );
        assert_eq!(
            SessionLookup::from_parts(Some("  "), Some(7), None).unwrap(),
            SessionLookup::SessionId(7)
        );
        assert!(matches!(
            SessionLookup::from_parts(None, None, None),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            SessionLookup::from_parts(Some("ABC123"), None, Some("T-1")),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_start_session_allocates_first_space() {
        let f = fixture().await;
        let a1 = f.services.spaces.create_space("A1", f.car).await.unwrap();
        f.services.spaces.create_space("A2", f.car).await.unwrap();

        let started = f
            .services
            .sessions
            .start_session(start(" abc123", f.operator))
            .await
            .unwrap();

        assert_eq!(started.license_plate, "ABC123");
        assert_eq!(started.space_number, "A1");
        assert_eq!(started.vehicle_type, "car");
        assert_eq!(started.operator_name, "Ana Gomez");
        assert_eq!(started.entry_time, f.clock.now());
        assert_eq!(started.entry_time_display, "2025-03-01 08:00");
        assert_eq!(
            started.ticket_code,
            format!("T-202503010800-{:03}", started.session_id % 1000)
        );

        let space = f.services.spaces.get_space(a1).await.unwrap();
        assert!(space.occupied);
        assert_eq!(space.occupied_by_plate.as_deref(), Some("ABC123"));
    }

    #[tokio::test]
    async fn test_start_session_validation_and_lookup_errors() {
        let f = fixture().await;
        f.services.spaces.create_space("A1", f.car).await.unwrap();

        let no_operator = StartSessionRequest {
            license_plate: "ABC123".to_string(),
            operator_id: None,
        };
        assert!(matches!(
            f.services.sessions.start_session(no_operator).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            f.services.sessions.start_session(start("   ", f.operator)).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            f.services.sessions.start_session(start("NOPE00", f.operator)).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.services.sessions.start_session(start("ABC123", 9_999)).await,
            Err(AppError::NotFound(_))
        ));

        // The failed attempt with an unknown operator must not hold the space
        assert_eq!(f.services.spaces.find_available(f.car).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_second_entry_conflicts_without_occupying() {
        let f = fixture().await;
        f.services.spaces.create_space("A1", f.car).await.unwrap();
        let a2 = f.services.spaces.create_space("A2", f.car).await.unwrap();

        f.services
            .sessions
            .start_session(start("ABC123", f.operator))
            .await
            .unwrap();
        let again = f
            .services
            .sessions
            .start_session(start("abc123", f.operator))
            .await;

        assert!(matches!(again, Err(AppError::Conflict(_))));
        assert!(!f.services.spaces.get_space(a2).await.unwrap().occupied);
        assert_eq!(f.services.sessions.get_active_sessions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_no_space_left() {
        let f = fixture().await;
        f.services.spaces.create_space("A1", f.car).await.unwrap();
        f.services.spaces.create_space("M1", f.motorcycle).await.unwrap();

        f.services
            .sessions
            .start_session(start("ABC123", f.operator))
            .await
            .unwrap();
        let result = f
            .services
            .sessions
            .start_session(start("DEF456", f.operator))
            .await;

        assert!(matches!(result, Err(AppError::ResourceExhausted(_))));
    }

    #[tokio::test]
    async fn test_deactivated_vehicle_cannot_enter() {
        let f = fixture().await;
        f.services.spaces.create_space("A1", f.car).await.unwrap();
        let vehicle = f
            .store
            .register_vehicle("OLD111", f.car)
            .await
            .unwrap();
        f.store.set_vehicle_active(vehicle.id, false).await.unwrap();

        assert!(matches!(
            f.services.sessions.start_session(start("OLD111", f.operator)).await,
            Err(AppError::State(_))
        ));
    }

    #[tokio::test]
    async fn test_end_session_bills_and_frees_space() {
        let f = fixture().await;
        let a1 = f.services.spaces.create_space("A1", f.car).await.unwrap();
        f.standard_rate().await;

        let started = f
            .services
            .sessions
            .start_session(start("ABC123", f.operator))
            .await
            .unwrap();
        f.clock.advance(Duration::minutes(130));

        let ended = f
            .services
            .sessions
            .end_session(exit_by_plate("ABC123", f.second_operator))
            .await
            .unwrap();

        assert_eq!(ended.session_id, started.session_id);
        assert_eq!(ended.hours_parked, dec!(2.17));
        assert_eq!(ended.total_amount, dec!(6000));
        assert_eq!(ended.operator_name, "Luis Perez");
        assert_eq!(ended.exit_time_display, "2025-03-01 10:10");
        assert!(!f.services.spaces.get_space(a1).await.unwrap().occupied);

        let detail = f.services.sessions.get_session(started.session_id).await.unwrap();
        assert_eq!(detail.status, SessionStatus::Completed);
        assert_eq!(detail.exit_time, Some(ended.exit_time));
        assert_eq!(detail.exit_operator.as_deref(), Some("Luis Perez"));
    }

    #[tokio::test]
    async fn test_end_session_scenarios() {
        let f = fixture().await;
        f.standard_rate().await;

        for (minutes, expected) in [(40, dec!(2000)), (130, dec!(6000)), (600, dec!(15000))] {
            f.services.spaces.create_space(&format!("S{minutes}"), f.car).await.unwrap();
            f.services
                .sessions
                .start_session(start("ABC123", f.operator))
                .await
                .unwrap();
            f.clock.advance(Duration::minutes(minutes));

            let ended = f
                .services
                .sessions
                .end_session(exit_by_plate("ABC123", f.operator))
                .await
                .unwrap();
            assert_eq!(ended.total_amount, expected, "{minutes} minutes");
        }
    }

    #[tokio::test]
    async fn test_end_session_without_rate_rolls_back() {
        let f = fixture().await;
        let a1 = f.services.spaces.create_space("A1", f.car).await.unwrap();
        let started = f
            .services
            .sessions
            .start_session(start("ABC123", f.operator))
            .await
            .unwrap();

        let result = f
            .services
            .sessions
            .end_session(exit_by_plate("ABC123", f.operator))
            .await;

        assert!(matches!(result, Err(AppError::Calculation(_))));
        assert!(f.services.spaces.get_space(a1).await.unwrap().occupied);
        let detail = f.services.sessions.get_session(started.session_id).await.unwrap();
        assert_eq!(detail.status, SessionStatus::Active);
        assert!(detail.exit_time.is_none());
    }

    #[tokio::test]
    async fn test_end_session_lookup_outcomes() {
        let f = fixture().await;
        f.services.spaces.create_space("A1", f.car).await.unwrap();
        f.standard_rate().await;

        assert!(matches!(
            f.services
                .sessions
                .end_session(exit_by_plate("ZZZ999", f.operator))
                .await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.services
                .sessions
                .end_session(exit_by_plate("ABC123", f.operator))
                .await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            f.services
                .sessions
                .end_session(EndSessionRequest {
                    lookup: SessionLookup::SessionId(424_242),
                    operator_id: Some(f.operator),
                })
                .await,
            Err(AppError::NotFound(_))
        ));

        let started = f
            .services
            .sessions
            .start_session(start("ABC123", f.operator))
            .await
            .unwrap();
        assert!(matches!(
            f.services
                .sessions
                .end_session(EndSessionRequest {
                    lookup: SessionLookup::SessionId(started.session_id),
                    operator_id: None,
                })
                .await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            f.services
                .sessions
                .end_session(EndSessionRequest {
                    lookup: SessionLookup::SessionId(started.session_id),
                    operator_id: Some(9_999),
                })
                .await,
            Err(AppError::NotFound(_))
        ));

        f.services
            .sessions
            .end_session(EndSessionRequest {
                lookup: SessionLookup::SessionId(started.session_id),
                operator_id: Some(f.operator),
            })
            .await
            .unwrap();
        assert!(matches!(
            f.services
                .sessions
                .end_session(EndSessionRequest {
                    lookup: SessionLookup::SessionId(started.session_id),
                    operator_id: Some(f.operator),
                })
                .await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_end_by_ticket_of_completed_session_is_not_found() {
        let f = fixture().await;
        let a1 = f.services.spaces.create_space("A1", f.car).await.unwrap();
        f.standard_rate().await;

        let first = f
            .services
            .sessions
            .start_session(start("ABC123", f.operator))
            .await
            .unwrap();
        f.clock.advance(Duration::minutes(30));
        f.services
            .sessions
            .end_session(EndSessionRequest {
                lookup: SessionLookup::Ticket(first.ticket_code.clone()),
                operator_id: Some(f.operator),
            })
            .await
            .unwrap();

        // Someone else now holds the same space
        f.clock.advance(Duration::minutes(1));
        f.services
            .sessions
            .start_session(start("DEF456", f.operator))
            .await
            .unwrap();
        let before = f.services.spaces.get_space(a1).await.unwrap();

        let result = f
            .services
            .sessions
            .end_session(EndSessionRequest {
                lookup: SessionLookup::Ticket(first.ticket_code),
                operator_id: Some(f.operator),
            })
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        let after = f.services.spaces.get_space(a1).await.unwrap();
        assert_eq!(after.occupied_by_plate, before.occupied_by_plate);
        assert_eq!(after.updated_at, before.updated_at);
    }

    #[tokio::test]
    async fn test_exit_leaves_manually_reassigned_space_alone() {
        let f = fixture().await;
        let a1 = f.services.spaces.create_space("A1", f.car).await.unwrap();
        f.standard_rate().await;

        f.services
            .sessions
            .start_session(start("ABC123", f.operator))
            .await
            .unwrap();
        f.services.spaces.free_space(a1).await.unwrap();
        f.services.spaces.occupy_space(a1, "DEF456").await.unwrap();

        f.services
            .sessions
            .end_session(exit_by_plate("ABC123", f.operator))
            .await
            .unwrap();

        let space = f.services.spaces.get_space(a1).await.unwrap();
        assert_eq!(space.occupied_by_plate.as_deref(), Some("DEF456"));
    }

    #[tokio::test]
    async fn test_active_sessions_ordered_by_entry() {
        let f = fixture().await;
        f.services.spaces.create_space("A1", f.car).await.unwrap();
        f.services.spaces.create_space("A2", f.car).await.unwrap();

        f.services
            .sessions
            .start_session(start("ABC123", f.operator))
            .await
            .unwrap();
        f.clock.advance(Duration::minutes(45));
        f.services
            .sessions
            .start_session(start("DEF456", f.operator))
            .await
            .unwrap();
        f.clock.advance(Duration::minutes(45));

        let active = f.services.sessions.get_active_sessions().await.unwrap();
        let plates: Vec<&str> = active.iter().map(|s| s.license_plate.as_str()).collect();
        assert_eq!(plates, vec!["ABC123", "DEF456"]);
        assert_eq!(active[0].elapsed_hours, dec!(1.5));
        assert_eq!(active[1].elapsed_hours, dec!(0.75));
    }

    #[tokio::test]
    async fn test_session_by_vehicle_has_live_amount() {
        let f = fixture().await;
        f.services.spaces.create_space("A1", f.car).await.unwrap();

        f.services
            .sessions
            .start_session(start("ABC123", f.operator))
            .await
            .unwrap();
        f.clock.advance(Duration::minutes(70));

        let detail = f.services.sessions.get_session_by_vehicle("abc123").await.unwrap();
        assert_eq!(detail.status, SessionStatus::Active);
        assert_eq!(detail.amount, None);

        f.standard_rate().await;
        let detail = f.services.sessions.get_session_by_vehicle("ABC123").await.unwrap();
        assert_eq!(detail.hours_parked, dec!(1.17));
        assert_eq!(detail.amount, Some(dec!(4000)));

        assert!(matches!(
            f.services.sessions.get_session_by_vehicle("DEF456").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_calculate_amount_matches_exit() {
        let f = fixture().await;
        f.services.spaces.create_space("A1", f.car).await.unwrap();
        f.standard_rate().await;

        let started = f
            .services
            .sessions
            .start_session(start("ABC123", f.operator))
            .await
            .unwrap();
        f.clock.advance(Duration::minutes(130));

        let estimate = f
            .services
            .sessions
            .calculate_amount(started.session_id)
            .await
            .unwrap();
        assert!(estimate.is_estimate);
        assert_eq!(estimate.total_amount, dec!(6000));

        let ended = f
            .services
            .sessions
            .end_session(exit_by_plate("ABC123", f.operator))
            .await
            .unwrap();

        // Later reads price the recorded exit, not the current time
        f.clock.advance(Duration::hours(5));
        let settled = f
            .services
            .sessions
            .calculate_amount(started.session_id)
            .await
            .unwrap();
        assert!(!settled.is_estimate);
        assert_eq!(settled.total_amount, ended.total_amount);
        assert_eq!(settled.hours_parked, ended.hours_parked);
        assert_eq!(settled.exit_time, ended.exit_time);
    }

    #[tokio::test]
    async fn test_minimum_charge_boundary() {
        let f = fixture().await;
        f.services.spaces.create_space("A1", f.car).await.unwrap();
        f.services
            .rate_configs
            .create_rate_config(crate::rate_config_service::CreateRateConfigRequest {
                vehicle_type_id: f.car,
                rate_per_hour: dec!(1500),
                minimum_charge_hours: Some(3),
                maximum_daily_rate: None,
            })
            .await
            .unwrap();

        f.services
            .sessions
            .start_session(start("ABC123", f.operator))
            .await
            .unwrap();
        f.clock.advance(Duration::hours(3));

        let ended = f
            .services
            .sessions
            .end_session(exit_by_plate("ABC123", f.operator))
            .await
            .unwrap();
        assert_eq!(ended.total_amount, dec!(4500));
    }

    #[tokio::test]
    async fn test_history_and_ticket_lookup() {
        let f = fixture().await;
        f.services.spaces.create_space("A1", f.car).await.unwrap();
        f.standard_rate().await;

        let mut tickets = Vec::new();
        for minutes in [20, 50] {
            let started = f
                .services
                .sessions
                .start_session(start("ABC123", f.operator))
                .await
                .unwrap();
            tickets.push(started.ticket_code);
            f.clock.advance(Duration::minutes(minutes));
            f.services
                .sessions
                .end_session(exit_by_plate("ABC123", f.operator))
                .await
                .unwrap();
            f.clock.advance(Duration::minutes(1));
        }

        let history = f.services.sessions.session_history("abc123", 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].exit_time > history[1].exit_time);
        assert_eq!(history[0].ticket_code.as_ref(), Some(&tickets[1]));

        let limited = f.services.sessions.session_history("ABC123", 1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert!(matches!(
            f.services.sessions.session_history("ABC123", 0).await,
            Err(AppError::Validation(_))
        ));

        let by_ticket = f
            .services
            .sessions
            .get_session_by_ticket(&tickets[0])
            .await
            .unwrap();
        assert_eq!(by_ticket.status, SessionStatus::Completed);
        assert_eq!(by_ticket.amount, Some(dec!(2000)));
    }
}
