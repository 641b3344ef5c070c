//! Rate configuration service
//!
//! Keeps at most one active fare schedule per vehicle type. Creating or
//! activating a config locks the vehicle type row, deactivates its
//! siblings, and activates the new one in a single transaction.

use parking_core::{
    models::{NewRateConfig, RateConfig},
    traits::{DirectoryStore, ParkingStore, ParkingTx, RateConfigStore},
    AppError, AppResult,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// New fare schedule for a vehicle type
#[derive(Debug, Clone)]
pub struct CreateRateConfigRequest {
    pub vehicle_type_id: i64,
    pub rate_per_hour: Decimal,
    /// Falls back to the configured default when absent
    pub minimum_charge_hours: Option<i32>,
    pub maximum_daily_rate: Option<Decimal>,
}

/// Rate configuration service
pub struct RateConfigService<S: ParkingStore> {
    store: Arc<S>,
    default_minimum_charge_hours: i32,
}

impl<S: ParkingStore> RateConfigService<S> {
    pub fn new(store: Arc<S>, default_minimum_charge_hours: i32) -> Self {
        Self {
            store,
            default_minimum_charge_hours,
        }
    }

    /// Create a config and make it the vehicle type's active schedule
    ///
    /// # Errors
    ///
    /// - `Validation` for a non-positive rate, a minimum below one hour, or a
    ///   daily maximum below the hourly rate
    /// - `NotFound` if the vehicle type does not exist
    #[instrument(skip(self))]
    pub async fn create_rate_config(&self, request: CreateRateConfigRequest) -> AppResult<i64> {
        let minimum_charge_hours = request
            .minimum_charge_hours
            .unwrap_or(self.default_minimum_charge_hours);
        RateConfig::validate_terms(
            request.rate_per_hour,
            minimum_charge_hours,
            request.maximum_daily_rate,
        )?;

        let mut tx = self.store.begin().await?;
        lock_vehicle_type(&mut tx, request.vehicle_type_id).await?;

        let superseded = tx.deactivate_rate_configs(request.vehicle_type_id).await?;
        let config = tx
            .insert_rate_config(&NewRateConfig {
                vehicle_type_id: request.vehicle_type_id,
                rate_per_hour: request.rate_per_hour,
                minimum_charge_hours,
                maximum_daily_rate: request.maximum_daily_rate,
            })
            .await?;

        tx.commit().await?;

        info!(
            "Rate config {} active for vehicle type {} ({} superseded)",
            config.id, config.vehicle_type_id, superseded
        );
        Ok(config.id)
    }

    /// Make an existing config the active one for its vehicle type
    ///
    /// Fails with `Conflict` if the config is already active.
    #[instrument(skip(self))]
    pub async fn activate_rate_config(&self, id: i64) -> AppResult<RateConfig> {
        let mut tx = self.store.begin().await?;

        let config = find_rate_config(&mut tx, id).await?;
        lock_vehicle_type(&mut tx, config.vehicle_type_id).await?;

        // Re-read under the type lock; a concurrent activation may have won
        let config = find_rate_config(&mut tx, id).await?;
        if config.active {
            warn!("Rate config {} is already active", id);
            return Err(AppError::Conflict(format!(
                "Rate config {} is already active",
                id
            )));
        }

        tx.deactivate_rate_configs(config.vehicle_type_id).await?;
        let config = tx.set_rate_config_active(id, true).await?;
        tx.commit().await?;

        info!(
            "Rate config {} activated for vehicle type {}",
            id, config.vehicle_type_id
        );
        Ok(config)
    }

    /// Withdraw a config; its vehicle type is left without an active schedule
    ///
    /// Fails with `State` if the config is not active.
    #[instrument(skip(self))]
    pub async fn deactivate_rate_config(&self, id: i64) -> AppResult<RateConfig> {
        let mut tx = self.store.begin().await?;

        let config = find_rate_config(&mut tx, id).await?;
        lock_vehicle_type(&mut tx, config.vehicle_type_id).await?;
        let config = find_rate_config(&mut tx, id).await?;
        if !config.active {
            return Err(AppError::State(format!("Rate config {} is not active", id)));
        }

        let config = tx.set_rate_config_active(id, false).await?;
        tx.commit().await?;

        info!("Rate config {} deactivated", id);
        Ok(config)
    }

    #[instrument(skip(self))]
    pub async fn get_rate_config(&self, id: i64) -> AppResult<RateConfig> {
        let mut tx = self.store.begin().await?;
        find_rate_config(&mut tx, id).await
    }

    /// Current schedule of a vehicle type
    #[instrument(skip(self))]
    pub async fn get_active_rate_config(&self, vehicle_type_id: i64) -> AppResult<RateConfig> {
        let mut tx = self.store.begin().await?;
        tx.find_active_rate_config(vehicle_type_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No active rate config for vehicle type {}",
                    vehicle_type_id
                ))
            })
    }

    /// All configs, newest first
    #[instrument(skip(self))]
    pub async fn list_rate_configs(&self, vehicle_type_id: Option<i64>) -> AppResult<Vec<RateConfig>> {
        let mut tx = self.store.begin().await?;
        let configs = tx.list_rate_configs(vehicle_type_id).await?;
        debug!("Found {} rate configs", configs.len());
        Ok(configs)
    }
}

async fn lock_vehicle_type<T: ParkingTx>(tx: &mut T, id: i64) -> AppResult<()> {
    tx.lock_vehicle_type(id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("Vehicle type {} not found", id)))
}

async fn find_rate_config<T: RateConfigStore>(tx: &mut T, id: i64) -> AppResult<RateConfig> {
    tx.find_rate_config(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Rate config {} not found", id)))
}
