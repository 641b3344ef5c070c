//! Domain models for the parking backend
//!
//! This module contains all the core domain models used throughout the application.

pub mod operator;
pub mod payment;
pub mod rate_config;
pub mod session;
pub mod space;
pub mod vehicle;

pub use operator::Operator;
pub use payment::{NewPayment, Payment, PaymentMethod, PaymentStatus};
pub use rate_config::{NewRateConfig, RateConfig};
pub use session::{NewParkingSession, ParkingSession, SessionStatus};
pub use space::{NewParkingSpace, ParkingSpace, SpaceAvailability, SpaceFilter};
pub use vehicle::{Vehicle, VehicleType};
