//! In-memory store
//!
//! Mirrors the PostgreSQL schema closely enough to run the service layer
//! without a database. Transactions are serialized: [`InMemoryParkingStore::begin`]
//! takes an owned async mutex guard and stages writes on a copy of the
//! state, which replaces the shared state on commit. Dropping a
//! [`MemoryTx`] discards the copy.
//!
//! The unique indexes and foreign keys of the migration are checked on
//! every insert and update and reported the way the sqlx conversion
//! reports them (`Conflict` and `NotFound`).

use async_trait::async_trait;
use chrono::Utc;
use parking_core::models::{
    NewParkingSession, NewParkingSpace, NewPayment, NewRateConfig, Operator, ParkingSession,
    ParkingSpace, Payment, PaymentStatus, RateConfig, SpaceFilter, Vehicle, VehicleType,
};
use parking_core::traits::{
    DirectoryStore, ParkingStore, ParkingTx, PaymentStore, RateConfigStore, SessionStore,
    SpaceStore,
};
use parking_core::{AppError, AppResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    vehicle_types: BTreeMap<i64, VehicleType>,
    vehicles: BTreeMap<i64, Vehicle>,
    operators: BTreeMap<i64, Operator>,
    spaces: BTreeMap<i64, ParkingSpace>,
    sessions: BTreeMap<i64, ParkingSession>,
    rate_configs: BTreeMap<i64, RateConfig>,
    payments: BTreeMap<i64, Payment>,
    last_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn require_vehicle_type(&self, id: i64) -> AppResult<()> {
        if self.vehicle_types.contains_key(&id) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Vehicle type {} not found", id)))
        }
    }

    fn require_operator(&self, id: i64) -> AppResult<()> {
        if self.operators.contains_key(&id) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Operator {} not found", id)))
        }
    }

    fn check_active_session_unique(&self, session_id: i64, vehicle_id: i64) -> AppResult<()> {
        let clash = self
            .sessions
            .values()
            .any(|s| s.id != session_id && s.vehicle_id == vehicle_id && s.active);
        if clash {
            return Err(AppError::Conflict(format!(
                "Vehicle {} already has an active session",
                vehicle_id
            )));
        }
        Ok(())
    }

    fn check_active_rate_unique(&self, config_id: i64, vehicle_type_id: i64) -> AppResult<()> {
        let clash = self
            .rate_configs
            .values()
            .any(|c| c.id != config_id && c.vehicle_type_id == vehicle_type_id && c.active);
        if clash {
            return Err(AppError::Conflict(format!(
                "Vehicle type {} already has an active rate config",
                vehicle_type_id
            )));
        }
        Ok(())
    }
}

/// Process-local store with the same guarantees as the PostgreSQL one
#[derive(Clone, Default)]
pub struct InMemoryParkingStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryParkingStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a vehicle type
    pub async fn register_vehicle_type(&self, name: &str) -> AppResult<VehicleType> {
        let mut tx = self.begin().await?;
        let vehicle_type = tx.insert_vehicle_type(name).await?;
        tx.commit().await?;
        Ok(vehicle_type)
    }

    /// Seed a vehicle
    pub async fn register_vehicle(&self, plate: &str, vehicle_type_id: i64) -> AppResult<Vehicle> {
        let mut tx = self.begin().await?;
        let vehicle = tx.insert_vehicle(plate, vehicle_type_id).await?;
        tx.commit().await?;
        Ok(vehicle)
    }

    /// Seed an operator
    pub async fn register_operator(&self, username: &str, full_name: &str) -> AppResult<Operator> {
        let mut tx = self.begin().await?;
        let operator = tx.insert_operator(username, full_name).await?;
        tx.commit().await?;
        Ok(operator)
    }

    /// Flip a vehicle's active flag
    pub async fn set_vehicle_active(&self, id: i64, active: bool) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let vehicle = state
            .vehicles
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Vehicle {} not found", id)))?;
        vehicle.active = active;
        vehicle.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl ParkingStore for InMemoryParkingStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> AppResult<MemoryTx> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryTx { guard, staged })
    }
}

/// Open in-memory transaction
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl ParkingTx for MemoryTx {
    async fn commit(self) -> AppResult<()> {
        let MemoryTx { mut guard, staged } = self;
        *guard = staged;
        debug!("In-memory transaction committed");
        Ok(())
    }
}

#[async_trait]
impl DirectoryStore for MemoryTx {
    async fn find_vehicle_type(&mut self, id: i64) -> AppResult<Option<VehicleType>> {
        Ok(self.staged.vehicle_types.get(&id).cloned())
    }

    async fn lock_vehicle_type(&mut self, id: i64) -> AppResult<Option<VehicleType>> {
        self.find_vehicle_type(id).await
    }

    async fn list_vehicle_types(&mut self) -> AppResult<Vec<VehicleType>> {
        Ok(self.staged.vehicle_types.values().cloned().collect())
    }

    async fn insert_vehicle_type(&mut self, name: &str) -> AppResult<VehicleType> {
        if self.staged.vehicle_types.values().any(|t| t.name == name) {
            return Err(AppError::Conflict(format!(
                "Vehicle type {} already exists",
                name
            )));
        }

        let vehicle_type = VehicleType {
            id: self.staged.next_id(),
            name: name.to_string(),
            active: true,
        };
        self.staged
            .vehicle_types
            .insert(vehicle_type.id, vehicle_type.clone());
        Ok(vehicle_type)
    }

    async fn find_vehicle(&mut self, id: i64) -> AppResult<Option<Vehicle>> {
        Ok(self.staged.vehicles.get(&id).cloned())
    }

    async fn find_vehicle_by_plate(&mut self, plate: &str) -> AppResult<Option<Vehicle>> {
        let plate = Vehicle::normalize_plate(plate);
        Ok(self
            .staged
            .vehicles
            .values()
            .find(|v| v.license_plate == plate)
            .cloned())
    }

    async fn lock_vehicle(&mut self, id: i64) -> AppResult<Option<Vehicle>> {
        self.find_vehicle(id).await
    }

    async fn insert_vehicle(&mut self, plate: &str, vehicle_type_id: i64) -> AppResult<Vehicle> {
        let plate = Vehicle::normalize_plate(plate);
        self.staged.require_vehicle_type(vehicle_type_id)?;
        if self.staged.vehicles.values().any(|v| v.license_plate == plate) {
            return Err(AppError::Conflict(format!(
                "Vehicle {} already exists",
                plate
            )));
        }

        let now = Utc::now();
        let vehicle = Vehicle {
            id: self.staged.next_id(),
            license_plate: plate,
            vehicle_type_id,
            active: true,
            created_at: now,
            updated_at: now,
        };
        self.staged.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(vehicle)
    }

    async fn find_operator(&mut self, id: i64) -> AppResult<Option<Operator>> {
        Ok(self.staged.operators.get(&id).cloned())
    }

    async fn insert_operator(&mut self, username: &str, full_name: &str) -> AppResult<Operator> {
        if self.staged.operators.values().any(|o| o.username == username) {
            return Err(AppError::Conflict(format!(
                "Operator {} already exists",
                username
            )));
        }

        let operator = Operator {
            id: self.staged.next_id(),
            username: username.to_string(),
            full_name: full_name.to_string(),
            active: true,
        };
        self.staged.operators.insert(operator.id, operator.clone());
        Ok(operator)
    }
}

#[async_trait]
impl SpaceStore for MemoryTx {
    async fn insert_space(&mut self, space: &NewParkingSpace) -> AppResult<ParkingSpace> {
        let space_number = ParkingSpace::normalize_number(&space.space_number)?;
        self.staged.require_vehicle_type(space.vehicle_type_id)?;
        if self
            .staged
            .spaces
            .values()
            .any(|s| s.space_number == space_number)
        {
            return Err(AppError::Conflict(format!(
                "Space {} already exists",
                space_number
            )));
        }

        let now = Utc::now();
        let space = ParkingSpace {
            id: self.staged.next_id(),
            space_number,
            vehicle_type_id: space.vehicle_type_id,
            created_at: now,
            updated_at: now,
            ..Default::default()
        };
        self.staged.spaces.insert(space.id, space.clone());
        Ok(space)
    }

    async fn find_space(&mut self, id: i64) -> AppResult<Option<ParkingSpace>> {
        Ok(self.staged.spaces.get(&id).cloned())
    }

    async fn lock_space(&mut self, id: i64) -> AppResult<Option<ParkingSpace>> {
        self.find_space(id).await
    }

    async fn find_space_by_number(&mut self, space_number: &str) -> AppResult<Option<ParkingSpace>> {
        Ok(self
            .staged
            .spaces
            .values()
            .find(|s| s.space_number == space_number)
            .cloned())
    }

    async fn list_spaces(&mut self, filter: SpaceFilter) -> AppResult<Vec<ParkingSpace>> {
        Ok(self
            .staged
            .spaces
            .values()
            .filter(|s| filter.vehicle_type_id.map_or(true, |t| s.accepts(t)))
            .filter(|s| !filter.only_available || s.is_available())
            .cloned()
            .collect())
    }

    async fn lock_first_available_space(
        &mut self,
        vehicle_type_id: i64,
    ) -> AppResult<Option<ParkingSpace>> {
        Ok(self
            .staged
            .spaces
            .values()
            .find(|s| s.accepts(vehicle_type_id) && s.is_available())
            .cloned())
    }

    async fn update_space(&mut self, space: &ParkingSpace) -> AppResult<ParkingSpace> {
        if space.occupied != space.occupied_by_plate.is_some() {
            return Err(AppError::Validation(format!(
                "Space {} occupancy fields are inconsistent",
                space.id
            )));
        }

        let stored = self
            .staged
            .spaces
            .get_mut(&space.id)
            .ok_or_else(|| AppError::NotFound(format!("Parking space {} not found", space.id)))?;
        stored.occupied = space.occupied;
        stored.active = space.active;
        stored.occupied_by_plate = space.occupied_by_plate.clone();
        stored.occupied_at = space.occupied_at;
        stored.updated_at = space.updated_at;
        Ok(stored.clone())
    }
}

#[async_trait]
impl SessionStore for MemoryTx {
    async fn insert_session(&mut self, session: &NewParkingSession) -> AppResult<ParkingSession> {
        if !self.staged.vehicles.contains_key(&session.vehicle_id) {
            return Err(AppError::NotFound(format!(
                "Vehicle {} not found",
                session.vehicle_id
            )));
        }
        if !self.staged.spaces.contains_key(&session.space_id) {
            return Err(AppError::NotFound(format!(
                "Parking space {} not found",
                session.space_id
            )));
        }
        self.staged.require_operator(session.operator_entry_id)?;
        self.staged
            .check_active_session_unique(0, session.vehicle_id)?;

        let created = ParkingSession {
            id: self.staged.next_id(),
            vehicle_id: session.vehicle_id,
            space_id: session.space_id,
            entry_time: session.entry_time,
            exit_time: None,
            operator_entry_id: session.operator_entry_id,
            operator_exit_id: None,
            active: true,
            ticket_code: None,
            created_at: session.entry_time,
            updated_at: session.entry_time,
        };
        self.staged.sessions.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_session(&mut self, id: i64) -> AppResult<Option<ParkingSession>> {
        Ok(self.staged.sessions.get(&id).cloned())
    }

    async fn lock_session(&mut self, id: i64) -> AppResult<Option<ParkingSession>> {
        self.find_session(id).await
    }

    async fn find_session_by_ticket(&mut self, ticket_code: &str) -> AppResult<Option<ParkingSession>> {
        Ok(self
            .staged
            .sessions
            .values()
            .find(|s| s.ticket_code.as_deref() == Some(ticket_code))
            .cloned())
    }

    async fn lock_session_by_ticket(&mut self, ticket_code: &str) -> AppResult<Option<ParkingSession>> {
        self.find_session_by_ticket(ticket_code).await
    }

    async fn find_active_session_for_vehicle(
        &mut self,
        vehicle_id: i64,
    ) -> AppResult<Option<ParkingSession>> {
        Ok(self
            .staged
            .sessions
            .values()
            .find(|s| s.vehicle_id == vehicle_id && s.active)
            .cloned())
    }

    async fn lock_active_sessions_for_vehicle(
        &mut self,
        vehicle_id: i64,
    ) -> AppResult<Vec<ParkingSession>> {
        Ok(self
            .staged
            .sessions
            .values()
            .filter(|s| s.vehicle_id == vehicle_id && s.active)
            .cloned()
            .collect())
    }

    async fn list_active_sessions(&mut self) -> AppResult<Vec<ParkingSession>> {
        let mut sessions: Vec<ParkingSession> = self
            .staged
            .sessions
            .values()
            .filter(|s| s.active)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| (s.entry_time, s.id));
        Ok(sessions)
    }

    async fn list_completed_sessions_for_vehicle(
        &mut self,
        vehicle_id: i64,
        limit: i64,
    ) -> AppResult<Vec<ParkingSession>> {
        let mut sessions: Vec<ParkingSession> = self
            .staged
            .sessions
            .values()
            .filter(|s| s.vehicle_id == vehicle_id && !s.active)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| (b.exit_time, b.id).cmp(&(a.exit_time, a.id)));
        sessions.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(sessions)
    }

    async fn update_session(&mut self, session: &ParkingSession) -> AppResult<ParkingSession> {
        if session.exit_time.is_none() != session.active {
            return Err(AppError::Validation(format!(
                "Session {} exit time does not match its active flag",
                session.id
            )));
        }
        if session.active {
            self.staged
                .check_active_session_unique(session.id, session.vehicle_id)?;
        }
        if let Some(code) = &session.ticket_code {
            let clash = self
                .staged
                .sessions
                .values()
                .any(|s| s.id != session.id && s.ticket_code.as_ref() == Some(code));
            if clash {
                return Err(AppError::Conflict(format!(
                    "Ticket code {} is already in use",
                    code
                )));
            }
        }

        let stored = self.staged.sessions.get_mut(&session.id).ok_or_else(|| {
            AppError::NotFound(format!("Parking session {} not found", session.id))
        })?;
        stored.exit_time = session.exit_time;
        stored.operator_exit_id = session.operator_exit_id;
        stored.active = session.active;
        stored.ticket_code = session.ticket_code.clone();
        stored.updated_at = session.updated_at;
        Ok(stored.clone())
    }
}

#[async_trait]
impl RateConfigStore for MemoryTx {
    async fn insert_rate_config(&mut self, config: &NewRateConfig) -> AppResult<RateConfig> {
        RateConfig::validate_terms(
            config.rate_per_hour,
            config.minimum_charge_hours,
            config.maximum_daily_rate,
        )?;
        self.staged.require_vehicle_type(config.vehicle_type_id)?;
        self.staged
            .check_active_rate_unique(0, config.vehicle_type_id)?;

        let now = Utc::now();
        let created = RateConfig {
            id: self.staged.next_id(),
            vehicle_type_id: config.vehicle_type_id,
            rate_per_hour: config.rate_per_hour,
            minimum_charge_hours: config.minimum_charge_hours,
            maximum_daily_rate: config.maximum_daily_rate,
            active: true,
            created_at: now,
            updated_at: now,
        };
        self.staged.rate_configs.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_rate_config(&mut self, id: i64) -> AppResult<Option<RateConfig>> {
        Ok(self.staged.rate_configs.get(&id).cloned())
    }

    async fn find_active_rate_config(
        &mut self,
        vehicle_type_id: i64,
    ) -> AppResult<Option<RateConfig>> {
        Ok(self
            .staged
            .rate_configs
            .values()
            .find(|c| c.vehicle_type_id == vehicle_type_id && c.active)
            .cloned())
    }

    async fn list_rate_configs(
        &mut self,
        vehicle_type_id: Option<i64>,
    ) -> AppResult<Vec<RateConfig>> {
        let mut configs: Vec<RateConfig> = self
            .staged
            .rate_configs
            .values()
            .filter(|c| vehicle_type_id.map_or(true, |t| c.vehicle_type_id == t))
            .cloned()
            .collect();
        configs.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(configs)
    }

    async fn deactivate_rate_configs(&mut self, vehicle_type_id: i64) -> AppResult<u64> {
        let now = Utc::now();
        let mut changed = 0;
        for config in self.staged.rate_configs.values_mut() {
            if config.vehicle_type_id == vehicle_type_id && config.active {
                config.active = false;
                config.updated_at = now;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn set_rate_config_active(&mut self, id: i64, active: bool) -> AppResult<RateConfig> {
        let vehicle_type_id = self
            .staged
            .rate_configs
            .get(&id)
            .map(|c| c.vehicle_type_id)
            .ok_or_else(|| AppError::NotFound(format!("Rate config {} not found", id)))?;
        if active {
            self.staged.check_active_rate_unique(id, vehicle_type_id)?;
        }

        let stored = self
            .staged
            .rate_configs
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Rate config {} not found", id)))?;
        stored.active = active;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }
}

#[async_trait]
impl PaymentStore for MemoryTx {
    async fn insert_payment(&mut self, payment: &NewPayment) -> AppResult<Payment> {
        if !self.staged.sessions.contains_key(&payment.parking_session_id) {
            return Err(AppError::NotFound(format!(
                "Parking session {} not found",
                payment.parking_session_id
            )));
        }
        self.staged.require_operator(payment.operator_id)?;
        if payment.total_amount.is_sign_negative() {
            return Err(AppError::Validation(
                "Payment amount cannot be negative".to_string(),
            ));
        }
        if self
            .staged
            .payments
            .values()
            .any(|p| p.parking_session_id == payment.parking_session_id)
        {
            return Err(AppError::Conflict(format!(
                "Session {} already has a payment",
                payment.parking_session_id
            )));
        }

        let created = Payment {
            id: self.staged.next_id(),
            parking_session_id: payment.parking_session_id,
            total_amount: payment.total_amount,
            hours_parked: payment.hours_parked,
            rate_applied: payment.rate_applied,
            payment_method: payment.payment_method,
            status: PaymentStatus::Pending,
            operator_id: payment.operator_id,
            created_at: payment.created_at,
            paid_at: None,
        };
        self.staged.payments.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_payment(&mut self, id: i64) -> AppResult<Option<Payment>> {
        Ok(self.staged.payments.get(&id).cloned())
    }

    async fn lock_payment(&mut self, id: i64) -> AppResult<Option<Payment>> {
        self.find_payment(id).await
    }

    async fn find_payment_by_session(&mut self, session_id: i64) -> AppResult<Option<Payment>> {
        Ok(self
            .staged
            .payments
            .values()
            .find(|p| p.parking_session_id == session_id)
            .cloned())
    }

    async fn update_payment(&mut self, payment: &Payment) -> AppResult<Payment> {
        let stored = self
            .staged
            .payments
            .get_mut(&payment.id)
            .ok_or_else(|| AppError::NotFound(format!("Payment {} not found", payment.id)))?;
        stored.status = payment.status;
        stored.paid_at = payment.paid_at;
        Ok(stored.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    async fn seeded() -> (InMemoryParkingStore, VehicleType, Vehicle, Operator) {
        let store = InMemoryParkingStore::new();
        let car = store.register_vehicle_type("car").await.unwrap();
        let vehicle = store.register_vehicle(" abc123 ", car.id).await.unwrap();
        let operator = store.register_operator("ana", "Ana Gomez").await.unwrap();
        (store, car, vehicle, operator)
    }

    async fn insert_space(store: &InMemoryParkingStore, number: &str, type_id: i64) -> ParkingSpace {
        let mut tx = store.begin().await.unwrap();
        let space = tx
            .insert_space(&NewParkingSpace {
                space_number: number.to_string(),
                vehicle_type_id: type_id,
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();
        space
    }

    #[tokio::test]
    async fn test_plates_are_normalized() {
        let (store, car, vehicle, _) = seeded().await;
        assert_eq!(vehicle.license_plate, "ABC123");

        let mut tx = store.begin().await.unwrap();
        let found = tx.find_vehicle_by_plate("abc123").await.unwrap().unwrap();
        assert_eq!(found.id, vehicle.id);
        assert!(matches!(
            tx.insert_vehicle("ABC123", car.id).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let (store, car, _, _) = seeded().await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_space(&NewParkingSpace {
                space_number: "A1".to_string(),
                vehicle_type_id: car.id,
            })
            .await
            .unwrap();
        }

        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_space_by_number("A1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_space_constraints() {
        let (store, car, _, _) = seeded().await;
        insert_space(&store, "A1", car.id).await;

        let mut tx = store.begin().await.unwrap();
        let duplicate = tx
            .insert_space(&NewParkingSpace {
                space_number: "A1".to_string(),
                vehicle_type_id: car.id,
            })
            .await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));

        let unknown_type = tx
            .insert_space(&NewParkingSpace {
                space_number: "B1".to_string(),
                vehicle_type_id: 999,
            })
            .await;
        assert!(matches!(unknown_type, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_first_available_space_is_lowest_id() {
        let (store, car, _, _) = seeded().await;
        let a1 = insert_space(&store, "A1", car.id).await;
        let a2 = insert_space(&store, "A2", car.id).await;

        let mut tx = store.begin().await.unwrap();
        let mut first = tx.lock_first_available_space(car.id).await.unwrap().unwrap();
        assert_eq!(first.id, a1.id);

        first.occupy("ABC123", Utc::now()).unwrap();
        tx.update_space(&first).await.unwrap();
        let next = tx.lock_first_available_space(car.id).await.unwrap().unwrap();
        assert_eq!(next.id, a2.id);
    }

    #[tokio::test]
    async fn test_one_active_session_per_vehicle() {
        let (store, car, vehicle, operator) = seeded().await;
        let space = insert_space(&store, "A1", car.id).await;
        let new_session = NewParkingSession {
            vehicle_id: vehicle.id,
            space_id: space.id,
            entry_time: Utc::now(),
            operator_entry_id: operator.id,
        };

        let mut tx = store.begin().await.unwrap();
        let mut first = tx.insert_session(&new_session).await.unwrap();
        assert!(matches!(
            tx.insert_session(&new_session).await,
            Err(AppError::Conflict(_))
        ));

        assert_eq!(
            tx.find_active_session_for_vehicle(vehicle.id).await.unwrap().unwrap().id,
            first.id
        );

        first
            .mark_exit(operator.id, first.entry_time + Duration::minutes(5))
            .unwrap();
        tx.update_session(&first).await.unwrap();
        assert!(tx.find_active_session_for_vehicle(vehicle.id).await.unwrap().is_none());

        let second = tx.insert_session(&new_session).await.unwrap();
        assert_eq!(
            tx.find_active_session_for_vehicle(vehicle.id).await.unwrap().unwrap().id,
            second.id
        );
    }

    #[tokio::test]
    async fn test_one_active_rate_config_per_type() {
        let (store, car, _, _) = seeded().await;
        let terms = NewRateConfig {
            vehicle_type_id: car.id,
            rate_per_hour: dec!(2000),
            minimum_charge_hours: 1,
            maximum_daily_rate: None,
        };

        let mut tx = store.begin().await.unwrap();
        let first = tx.insert_rate_config(&terms).await.unwrap();
        assert!(matches!(
            tx.insert_rate_config(&terms).await,
            Err(AppError::Conflict(_))
        ));

        assert_eq!(tx.deactivate_rate_configs(car.id).await.unwrap(), 1);
        let second = tx.insert_rate_config(&terms).await.unwrap();
        assert!(matches!(
            tx.set_rate_config_active(first.id, true).await,
            Err(AppError::Conflict(_))
        ));
        assert_eq!(
            tx.find_active_rate_config(car.id).await.unwrap().unwrap().id,
            second.id
        );
    }

    #[tokio::test]
    async fn test_one_payment_per_session() {
        let (store, car, vehicle, operator) = seeded().await;
        let space = insert_space(&store, "A1", car.id).await;

        let mut tx = store.begin().await.unwrap();
        let session = tx
            .insert_session(&NewParkingSession {
                vehicle_id: vehicle.id,
                space_id: space.id,
                entry_time: Utc::now(),
                operator_entry_id: operator.id,
            })
            .await
            .unwrap();
        let payment = NewPayment {
            parking_session_id: session.id,
            total_amount: dec!(2000),
            hours_parked: dec!(0.5),
            rate_applied: dec!(2000),
            payment_method: parking_core::models::PaymentMethod::Cash,
            operator_id: operator.id,
            created_at: Utc::now(),
        };

        let created = tx.insert_payment(&payment).await.unwrap();
        assert_eq!(created.status, PaymentStatus::Pending);
        assert!(matches!(
            tx.insert_payment(&payment).await,
            Err(AppError::Conflict(_))
        ));
    }
}
