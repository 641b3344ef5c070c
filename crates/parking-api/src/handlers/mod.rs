//! HTTP request handlers
//!
//! Every handler is generic over the store so the same routes serve the
//! PostgreSQL backend and the in-memory one used in tests.

pub mod health;
pub mod payment;
pub mod rate_config;
pub mod session;
pub mod space;

pub use health::configure as configure_health;
pub use payment::configure as configure_payments;
pub use rate_config::configure as configure_rate_configs;
pub use session::configure as configure_sessions;
pub use space::configure as configure_spaces;
