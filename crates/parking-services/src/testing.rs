//! Shared service test fixture

use crate::rate_config_service::CreateRateConfigRequest;
use crate::ParkingServices;
use chrono::{TimeZone, Utc};
use parking_core::config::ParkingConfig;
use parking_core::ManualClock;
use parking_db::InMemoryParkingStore;
use rust_decimal_macros::dec;
use std::sync::Arc;

/// Services over a seeded in-memory store, clock frozen at 2025-03-01 08:00 UTC
///
/// Seeds vehicle types `car` and `motorcycle`, car plates `ABC123` and
/// `DEF456`, and operators Ana Gomez and Luis Perez. No spaces or rate
/// configs exist.
pub(crate) struct Fixture {
    pub services: ParkingServices<InMemoryParkingStore>,
    pub store: Arc<InMemoryParkingStore>,
    pub clock: Arc<ManualClock>,
    pub car: i64,
    pub motorcycle: i64,
    pub operator: i64,
    pub second_operator: i64,
}

impl Fixture {
    /// 2000/hour, 1 hour minimum, 15000 daily maximum for cars
    pub async fn standard_rate(&self) -> i64 {
        self.services
            .rate_configs
            .create_rate_config(CreateRateConfigRequest {
                vehicle_type_id: self.car,
                rate_per_hour: dec!(2000),
                minimum_charge_hours: Some(1),
                maximum_daily_rate: Some(dec!(15000)),
            })
            .await
            .unwrap()
    }
}

pub(crate) async fn fixture() -> Fixture {
    let store = Arc::new(InMemoryParkingStore::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
    ));

    let car = store.register_vehicle_type("car").await.unwrap();
    let motorcycle = store.register_vehicle_type("motorcycle").await.unwrap();
    store.register_vehicle("ABC123", car.id).await.unwrap();
    store.register_vehicle("DEF456", car.id).await.unwrap();
    let operator = store.register_operator("agomez", "Ana Gomez").await.unwrap();
    let second_operator = store.register_operator("lperez", "Luis Perez").await.unwrap();

    let services =
        ParkingServices::new(store.clone(), clock.clone(), &ParkingConfig::default()).unwrap();

    Fixture {
        services,
        store,
        clock,
        car: car.id,
        motorcycle: motorcycle.id,
        operator: operator.id,
        second_operator: second_operator.id,
    }
}
