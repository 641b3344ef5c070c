//! Business logic services for the parking backend
//!
//! This crate orchestrates the parking lot lifecycle on top of the
//! transactional store traits from `parking-core`.
//!
//! # Architecture
//!
//! - Every service is generic over a [`ParkingStore`] and holds it in an `Arc`
//! - Each public operation opens one store transaction and commits it only
//!   when every step succeeded
//! - "Now" comes from an injected [`Clock`]
//! - All operations are instrumented with tracing
//!
//! # Services
//!
//! - `SpaceAllocator` - space registration, occupancy, activation
//! - `SessionService` - vehicle entry/exit, lookups, fare estimates
//! - `RateConfigService` - fare schedules, one active per vehicle type
//! - `PaymentService` - settlement and cancellation

pub mod format;
pub mod payment_service;
pub mod rate_config_service;
pub mod session_service;
pub mod space_allocator;

#[cfg(test)]
mod testing;

pub use format::TimeFormatter;
pub use payment_service::{PaymentLookup, PaymentService, ProcessPaymentRequest};
pub use rate_config_service::{CreateRateConfigRequest, RateConfigService};
pub use session_service::{
    AmountEstimate, EndSessionRequest, SessionDetail, SessionEndResult, SessionLookup,
    SessionService, SessionStartResult, SessionSummary, StartSessionRequest,
};
pub use space_allocator::SpaceAllocator;

use parking_core::config::ParkingConfig;
use parking_core::traits::ParkingStore;
use parking_core::{AppResult, Clock};
use std::sync::Arc;
use tracing::info;

/// All services over one store and clock
pub struct ParkingServices<S: ParkingStore> {
    pub spaces: SpaceAllocator<S>,
    pub sessions: SessionService<S>,
    pub rate_configs: RateConfigService<S>,
    pub payments: PaymentService<S>,
}

impl<S: ParkingStore> ParkingServices<S> {
    /// Wire the services
    ///
    /// Fails with `Config` if the display timezone or datetime format is
    /// invalid.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: &ParkingConfig) -> AppResult<Self> {
        let formatter = TimeFormatter::from_config(config)?;
        info!(
            "Parking services ready (display timezone {})",
            formatter.timezone()
        );

        Ok(Self {
            spaces: SpaceAllocator::new(store.clone(), clock.clone()),
            sessions: SessionService::new(store.clone(), clock.clone(), formatter),
            rate_configs: RateConfigService::new(
                store.clone(),
                config.default_minimum_charge_hours,
            ),
            payments: PaymentService::new(store, clock),
        })
    }
}
