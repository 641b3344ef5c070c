//! Parking space allocator
//!
//! Owns the occupancy state of spaces:
//! - Create spaces and validate their numbers
//! - Hand out the first available space for a vehicle type
//! - Occupy and free spaces
//! - Activate and deactivate spaces
//!
//! Allocation order is ascending space id. The allocation helpers take an
//! open transaction so the session service can allocate and occupy inside
//! its own unit of work.

use parking_core::{
    models::{NewParkingSpace, ParkingSpace, SpaceAvailability, SpaceFilter},
    traits::{DirectoryStore, ParkingStore, ParkingTx, SpaceStore},
    AppError, AppResult, Clock,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Space allocator service
pub struct SpaceAllocator<S: ParkingStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: ParkingStore> SpaceAllocator<S> {
    /// Create a new allocator
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Register a new space
    ///
    /// # Errors
    ///
    /// - `Validation` if the number is blank or not letters followed by digits
    /// - `NotFound` if the vehicle type does not exist
    /// - `Conflict` if the normalized number is taken
    #[instrument(skip(self))]
    pub async fn create_space(&self, space_number: &str, vehicle_type_id: i64) -> AppResult<i64> {
        let space_number = ParkingSpace::normalize_number(space_number)?;

        let mut tx = self.store.begin().await?;

        tx.find_vehicle_type(vehicle_type_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Vehicle type {} not found", vehicle_type_id))
            })?;

        if tx.find_space_by_number(&space_number).await?.is_some() {
            warn!("Space number {} already exists", space_number);
            return Err(AppError::Conflict(format!(
                "Space number {} already exists",
                space_number
            )));
        }

        let space = tx
            .insert_space(&NewParkingSpace {
                space_number,
                vehicle_type_id,
            })
            .await?;
        tx.commit().await?;

        info!(
            "Created space {} ({}) for vehicle type {}",
            space.space_number, space.id, vehicle_type_id
        );
        Ok(space.id)
    }

    #[instrument(skip(self))]
    pub async fn get_space(&self, space_id: i64) -> AppResult<ParkingSpace> {
        let mut tx = self.store.begin().await?;
        tx.find_space(space_id)
            .await?
            .ok_or_else(|| space_not_found(space_id))
    }

    #[instrument(skip(self))]
    pub async fn list_spaces(&self, filter: SpaceFilter) -> AppResult<Vec<ParkingSpace>> {
        let mut tx = self.store.begin().await?;
        tx.list_spaces(filter).await
    }

    /// Active, unoccupied spaces eligible for a vehicle type, in allocation order
    #[instrument(skip(self))]
    pub async fn find_available(&self, vehicle_type_id: i64) -> AppResult<Vec<ParkingSpace>> {
        self.list_spaces(SpaceFilter {
            vehicle_type_id: Some(vehicle_type_id),
            only_available: true,
        })
        .await
    }

    /// Capacity per vehicle type
    #[instrument(skip(self))]
    pub async fn availability_summary(&self) -> AppResult<Vec<SpaceAvailability>> {
        let mut tx = self.store.begin().await?;
        let vehicle_types = tx.list_vehicle_types().await?;
        let spaces = tx.list_spaces(SpaceFilter::default()).await?;

        let mut summary: BTreeMap<i64, SpaceAvailability> = vehicle_types
            .into_iter()
            .map(|t| {
                (
                    t.id,
                    SpaceAvailability {
                        vehicle_type_id: t.id,
                        vehicle_type: t.name,
                        total: 0,
                        active: 0,
                        occupied: 0,
                        available: 0,
                    },
                )
            })
            .collect();

        for space in &spaces {
            if let Some(entry) = summary.get_mut(&space.vehicle_type_id) {
                entry.total += 1;
                if space.active {
                    entry.active += 1;
                }
                if space.occupied {
                    entry.occupied += 1;
                }
                if space.is_available() {
                    entry.available += 1;
                }
            }
        }

        Ok(summary.into_values().collect())
    }

    /// Mark a space occupied by a vehicle
    #[instrument(skip(self))]
    pub async fn occupy_space(&self, space_id: i64, plate: &str) -> AppResult<ParkingSpace> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let mut space = lock_space(&mut tx, space_id).await?;
        space.occupy(plate, now)?;
        let space = tx.update_space(&space).await?;
        tx.commit().await?;

        info!("Space {} occupied by {:?}", space.space_number, space.occupied_by_plate);
        Ok(space)
    }

    /// Release an occupied space
    #[instrument(skip(self))]
    pub async fn free_space(&self, space_id: i64) -> AppResult<ParkingSpace> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let mut space = lock_space(&mut tx, space_id).await?;
        space.free(now)?;
        let space = tx.update_space(&space).await?;
        tx.commit().await?;

        info!("Space {} freed", space.space_number);
        Ok(space)
    }

    #[instrument(skip(self))]
    pub async fn activate_space(&self, space_id: i64) -> AppResult<ParkingSpace> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let mut space = lock_space(&mut tx, space_id).await?;
        space.activate(now);
        let space = tx.update_space(&space).await?;
        tx.commit().await?;

        info!("Space {} activated", space.space_number);
        Ok(space)
    }

    /// Withdraw a space from allocation; fails while it is occupied
    #[instrument(skip(self))]
    pub async fn deactivate_space(&self, space_id: i64) -> AppResult<ParkingSpace> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let mut space = lock_space(&mut tx, space_id).await?;
        space.deactivate(now)?;
        let space = tx.update_space(&space).await?;
        tx.commit().await?;

        info!("Space {} deactivated", space.space_number);
        Ok(space)
    }
}

/// Lock the first available space for a vehicle type and occupy it
///
/// Fails with `ResourceExhausted` when the type has no free space.
pub(crate) async fn allocate<T: ParkingTx>(
    tx: &mut T,
    vehicle_type_id: i64,
    plate: &str,
    at: DateTime<Utc>,
) -> AppResult<ParkingSpace> {
    let mut space = tx
        .lock_first_available_space(vehicle_type_id)
        .await?
        .ok_or_else(|| {
            warn!("No available space for vehicle type {}", vehicle_type_id);
            AppError::ResourceExhausted(format!(
                "No available space for vehicle type {}",
                vehicle_type_id
            ))
        })?;

    space.occupy(plate, at)?;
    tx.update_space(&space).await
}

/// Free the space a departing vehicle held
///
/// A space that no longer carries the vehicle's plate was already released
/// by hand and is left as is.
pub(crate) async fn release<T: ParkingTx>(
    tx: &mut T,
    space_id: i64,
    plate: &str,
    at: DateTime<Utc>,
) -> AppResult<ParkingSpace> {
    let mut space = lock_space(tx, space_id).await?;

    if space.occupied_by_plate.as_deref() != Some(plate) {
        warn!(
            "Space {} is not held by {}; leaving occupancy unchanged",
            space.space_number, plate
        );
        return Ok(space);
    }

    space.free(at)?;
    debug!("Released space {}", space.space_number);
    tx.update_space(&space).await
}

async fn lock_space<T: SpaceStore>(tx: &mut T, space_id: i64) -> AppResult<ParkingSpace> {
    tx.lock_space(space_id)
        .await?
        .ok_or_else(|| space_not_found(space_id))
}

fn space_not_found(space_id: i64) -> AppError {
    AppError::NotFound(format!("Parking space {} not found", space_id))
}
