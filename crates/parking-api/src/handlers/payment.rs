//! Payment handlers
//!
//! Settlement of completed sessions and payment lookups.

use crate::dto::{ApiResponse, PaymentCreateRequest, PaymentQuery, PaymentResponse};
use crate::extract::OperatorId;
use actix_web::{web, HttpResponse};
use parking_core::traits::ParkingStore;
use parking_core::AppError;
use parking_services::ParkingServices;
use tracing::{info, instrument, warn};
use validator::Validate;

/// Settle a completed session
///
/// POST /api/v1/payments
#[instrument(skip(services, req))]
pub async fn process_payment<S: ParkingStore>(
    services: web::Data<ParkingServices<S>>,
    operator: OperatorId,
    req: web::Json<PaymentCreateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Payment validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let payment = services
        .payments
        .process_payment(req.to_service_request(operator.0)?)
        .await?;

    info!(
        id = payment.id,
        session_id = payment.parking_session_id,
        total = %payment.total_amount,
        "Payment recorded"
    );

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        PaymentResponse::from(payment),
        "Payment processed",
    )))
}

/// Look up a payment by id or by parking session
///
/// GET /api/v1/payments?id= or ?parking_session_id=
#[instrument(skip(services))]
pub async fn get_payment<S: ParkingStore>(
    services: web::Data<ParkingServices<S>>,
    query: web::Query<PaymentQuery>,
) -> Result<HttpResponse, AppError> {
    let payment = services.payments.get_payment(query.lookup()?).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(PaymentResponse::from(payment))))
}

/// POST /api/v1/payments/{id}/cancel
#[instrument(skip(services))]
pub async fn cancel_payment<S: ParkingStore>(
    services: web::Data<ParkingServices<S>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let payment = services.payments.cancel_payment(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        PaymentResponse::from(payment),
        "Payment cancelled",
    )))
}

/// Configure payment routes
pub fn configure<S: ParkingStore>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments")
            .route("", web::post().to(process_payment::<S>))
            .route("", web::get().to(get_payment::<S>))
            .route("/{id}/cancel", web::post().to(cancel_payment::<S>)),
    );
}
