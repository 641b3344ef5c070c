//! Storage traits
//!
//! Every public operation of the lifecycle engine runs inside one store
//! transaction: the service calls [`ParkingStore::begin`], reads and writes
//! through the per-entity traits on the returned [`ParkingTx`], then calls
//! [`ParkingTx::commit`]. Dropping a transaction without committing rolls
//! all of its writes back, so an early `?` return never leaves partial state.
//!
//! `lock_*` methods read a row and hold it exclusively until the transaction
//! ends. Implementations must also enforce the uniqueness rules at insert
//! time and report violations as `AppError::Conflict`:
//!
//! - space numbers are unique
//! - at most one active session per vehicle
//! - ticket codes are unique
//! - at most one payment per session
//! - at most one active rate config per vehicle type

use crate::models::{
    NewParkingSession, NewParkingSpace, NewPayment, NewRateConfig, Operator, ParkingSession,
    ParkingSpace, Payment, RateConfig, SpaceFilter, Vehicle, VehicleType,
};
use crate::AppResult;
use async_trait::async_trait;

/// Entry point to transactional storage
#[async_trait]
pub trait ParkingStore: Send + Sync + 'static {
    /// Transaction handle type
    type Tx: ParkingTx;

    /// Open a transaction
    async fn begin(&self) -> AppResult<Self::Tx>;
}

/// An open unit of work
#[async_trait]
pub trait ParkingTx:
    DirectoryStore + SpaceStore + SessionStore + RateConfigStore + PaymentStore + Send
{
    /// Make every write of this transaction durable
    async fn commit(self) -> AppResult<()>;
}

/// Vehicles, vehicle types, and operators
///
/// Owned by external collaborators; the insert methods exist for
/// administrative seeding.
#[async_trait]
pub trait DirectoryStore: Send {
    async fn find_vehicle_type(&mut self, id: i64) -> AppResult<Option<VehicleType>>;

    /// Lock a vehicle type row; serializes rate config changes for the type
    async fn lock_vehicle_type(&mut self, id: i64) -> AppResult<Option<VehicleType>>;

    async fn list_vehicle_types(&mut self) -> AppResult<Vec<VehicleType>>;

    async fn insert_vehicle_type(&mut self, name: &str) -> AppResult<VehicleType>;

    async fn find_vehicle(&mut self, id: i64) -> AppResult<Option<Vehicle>>;

    /// Find a vehicle by its normalized plate
    async fn find_vehicle_by_plate(&mut self, plate: &str) -> AppResult<Option<Vehicle>>;

    /// Lock a vehicle row; serializes session starts for the vehicle
    async fn lock_vehicle(&mut self, id: i64) -> AppResult<Option<Vehicle>>;

    async fn insert_vehicle(&mut self, plate: &str, vehicle_type_id: i64) -> AppResult<Vehicle>;

    async fn find_operator(&mut self, id: i64) -> AppResult<Option<Operator>>;

    async fn insert_operator(&mut self, username: &str, full_name: &str)
        -> AppResult<Operator>;
}

/// Parking spaces
#[async_trait]
pub trait SpaceStore: Send {
    async fn insert_space(&mut self, space: &NewParkingSpace) -> AppResult<ParkingSpace>;

    async fn find_space(&mut self, id: i64) -> AppResult<Option<ParkingSpace>>;

    async fn lock_space(&mut self, id: i64) -> AppResult<Option<ParkingSpace>>;

    async fn find_space_by_number(&mut self, space_number: &str)
        -> AppResult<Option<ParkingSpace>>;

    /// Spaces matching the filter, ascending by id
    async fn list_spaces(&mut self, filter: SpaceFilter) -> AppResult<Vec<ParkingSpace>>;

    /// Lock the lowest-id active, unoccupied space for a vehicle type
    ///
    /// Spaces already locked by a concurrent transaction are skipped.
    async fn lock_first_available_space(
        &mut self,
        vehicle_type_id: i64,
    ) -> AppResult<Option<ParkingSpace>>;

    async fn update_space(&mut self, space: &ParkingSpace) -> AppResult<ParkingSpace>;
}

/// Parking sessions
#[async_trait]
pub trait SessionStore: Send {
    async fn insert_session(&mut self, session: &NewParkingSession) -> AppResult<ParkingSession>;

    async fn find_session(&mut self, id: i64) -> AppResult<Option<ParkingSession>>;

    async fn lock_session(&mut self, id: i64) -> AppResult<Option<ParkingSession>>;

    async fn find_session_by_ticket(&mut self, ticket_code: &str)
        -> AppResult<Option<ParkingSession>>;

    async fn lock_session_by_ticket(&mut self, ticket_code: &str)
        -> AppResult<Option<ParkingSession>>;

    /// The vehicle's active session, without locking it
    async fn find_active_session_for_vehicle(
        &mut self,
        vehicle_id: i64,
    ) -> AppResult<Option<ParkingSession>>;

    /// Lock every active session of a vehicle
    async fn lock_active_sessions_for_vehicle(
        &mut self,
        vehicle_id: i64,
    ) -> AppResult<Vec<ParkingSession>>;

    /// All active sessions, oldest entry first
    async fn list_active_sessions(&mut self) -> AppResult<Vec<ParkingSession>>;

    /// Completed sessions of a vehicle, newest exit first
    async fn list_completed_sessions_for_vehicle(
        &mut self,
        vehicle_id: i64,
        limit: i64,
    ) -> AppResult<Vec<ParkingSession>>;

    async fn update_session(&mut self, session: &ParkingSession) -> AppResult<ParkingSession>;
}

/// Rate configurations
#[async_trait]
pub trait RateConfigStore: Send {
    /// Insert an active config
    async fn insert_rate_config(&mut self, config: &NewRateConfig) -> AppResult<RateConfig>;

    async fn find_rate_config(&mut self, id: i64) -> AppResult<Option<RateConfig>>;

    async fn find_active_rate_config(
        &mut self,
        vehicle_type_id: i64,
    ) -> AppResult<Option<RateConfig>>;

    /// Configs newest first, optionally for one vehicle type
    async fn list_rate_configs(&mut self, vehicle_type_id: Option<i64>)
        -> AppResult<Vec<RateConfig>>;

    /// Deactivate every active config of a vehicle type; returns how many changed
    async fn deactivate_rate_configs(&mut self, vehicle_type_id: i64) -> AppResult<u64>;

    async fn set_rate_config_active(&mut self, id: i64, active: bool) -> AppResult<RateConfig>;
}

/// Payments
#[async_trait]
pub trait PaymentStore: Send {
    /// Insert a pending payment
    async fn insert_payment(&mut self, payment: &NewPayment) -> AppResult<Payment>;

    async fn find_payment(&mut self, id: i64) -> AppResult<Option<Payment>>;

    async fn lock_payment(&mut self, id: i64) -> AppResult<Option<Payment>>;

    async fn find_payment_by_session(&mut self, session_id: i64) -> AppResult<Option<Payment>>;

    async fn update_payment(&mut self, payment: &Payment) -> AppResult<Payment>;
}
