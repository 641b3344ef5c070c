//! Parking Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the parking backend. It includes:
//!
//! - Domain models (ParkingSpace, ParkingSession, RateConfig, Payment, ...)
//!   with guarded lifecycle transitions
//! - The billing calculator shared by exit, estimate, and payment flows
//! - Transactional store traits implemented by `parking-db`
//! - Unified error handling with HTTP response mapping
//! - Application configuration and the clock abstraction

pub mod billing;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use error::{AppError, ErrorKind};

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
