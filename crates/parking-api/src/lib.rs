//! API layer for the parking backend
//!
//! HTTP handlers for vehicle entry and exit, parking spaces, rate
//! configurations, and payments. Handlers are thin: they validate the
//! request shape, call the matching service, and let [`AppError`] render
//! the failure status.

#![forbid(unsafe_code)]

pub mod dto;
pub mod extract;
pub mod handlers;

pub use dto::ApiResponse;
pub use extract::{OperatorId, OPERATOR_HEADER};
pub use handlers::{
    configure_health, configure_payments, configure_rate_configs, configure_sessions,
    configure_spaces,
};

use actix_web::web;
use parking_core::traits::ParkingStore;
use parking_core::AppError;
use tracing::warn;

/// Mount every route under `/api/v1`
///
/// Expects `web::Data<ParkingServices<S>>` to be registered on the app.
pub fn configure<S: ParkingStore>(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .service(
            web::scope("/api/v1")
                .configure(configure_health)
                .configure(configure_sessions::<S>)
                .configure(configure_spaces::<S>)
                .configure(configure_rate_configs::<S>)
                .configure(configure_payments::<S>),
        );
}

/// Malformed JSON bodies become validation errors
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        warn!("Rejected request body: {}", err);
        AppError::Validation(err.to_string()).into()
    })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        warn!("Rejected query string: {}", err);
        AppError::Validation(err.to_string()).into()
    })
}
