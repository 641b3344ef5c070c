//! Parking session handlers
//!
//! HTTP handlers for vehicle entry, exit, and session queries.

use crate::dto::{ApiResponse, EntryRequest, ExitRequest, HistoryParams};
use crate::extract::OperatorId;
use actix_web::{web, HttpResponse};
use parking_core::traits::ParkingStore;
use parking_core::AppError;
use parking_services::{EndSessionRequest, ParkingServices, StartSessionRequest};
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Register a vehicle entry
///
/// POST /api/v1/sessions/entry
#[instrument(skip(services, req))]
pub async fn register_entry<S: ParkingStore>(
    services: web::Data<ParkingServices<S>>,
    operator: OperatorId,
    req: web::Json<EntryRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Entry validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let req = req.into_inner();
    let result = services
        .sessions
        .start_session(StartSessionRequest {
            license_plate: req.license_plate,
            operator_id: operator.0,
        })
        .await?;

    info!(
        session_id = result.session_id,
        ticket = %result.ticket_code,
        space = %result.space_number,
        "Entry registered"
    );

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        result,
        "Vehicle entry registered",
    )))
}

/// Register a vehicle exit
///
/// POST /api/v1/sessions/exit
#[instrument(skip(services, req))]
pub async fn register_exit<S: ParkingStore>(
    services: web::Data<ParkingServices<S>>,
    operator: OperatorId,
    req: web::Json<ExitRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Exit validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let result = services
        .sessions
        .end_session(EndSessionRequest {
            lookup: req.lookup()?,
            operator_id: operator.0,
        })
        .await?;

    info!(
        session_id = result.session_id,
        total = %result.total_amount,
        "Exit registered"
    );

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        result,
        "Vehicle exit registered",
    )))
}

/// List vehicles currently parked, oldest entry first
///
/// GET /api/v1/sessions/active
#[instrument(skip(services))]
pub async fn list_active_sessions<S: ParkingStore>(
    services: web::Data<ParkingServices<S>>,
) -> Result<HttpResponse, AppError> {
    let sessions = services.sessions.get_active_sessions().await?;
    debug!("Returning {} active sessions", sessions.len());
    Ok(HttpResponse::Ok().json(ApiResponse::success(sessions)))
}

/// Active session of a vehicle with a live fare estimate
///
/// GET /api/v1/sessions/vehicle/{plate}
#[instrument(skip(services))]
pub async fn get_session_by_vehicle<S: ParkingStore>(
    services: web::Data<ParkingServices<S>>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let detail = services.sessions.get_session_by_vehicle(&path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(detail)))
}

/// Completed sessions of a vehicle, newest first
///
/// GET /api/v1/sessions/vehicle/{plate}/history
#[instrument(skip(services))]
pub async fn get_vehicle_history<S: ParkingStore>(
    services: web::Data<ParkingServices<S>>,
    path: web::Path<String>,
    query: web::Query<HistoryParams>,
) -> Result<HttpResponse, AppError> {
    query.validate().map_err(|e| {
        warn!("History query validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let history = services.sessions.session_history(&path, query.limit).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(history)))
}

/// GET /api/v1/sessions/ticket/{code}
#[instrument(skip(services))]
pub async fn get_session_by_ticket<S: ParkingStore>(
    services: web::Data<ParkingServices<S>>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let detail = services.sessions.get_session_by_ticket(&path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(detail)))
}

/// GET /api/v1/sessions/{id}
#[instrument(skip(services))]
pub async fn get_session<S: ParkingStore>(
    services: web::Data<ParkingServices<S>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let detail = services.sessions.get_session(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(detail)))
}

/// Fare for a session; an estimate while the vehicle is still parked
///
/// GET /api/v1/sessions/{id}/amount
#[instrument(skip(services))]
pub async fn calculate_amount<S: ParkingStore>(
    services: web::Data<ParkingServices<S>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let estimate = services.sessions.calculate_amount(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(estimate)))
}

/// Configure session routes
pub fn configure<S: ParkingStore>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/sessions")
            .route("/entry", web::post().to(register_entry::<S>))
            .route("/exit", web::post().to(register_exit::<S>))
            .route("/active", web::get().to(list_active_sessions::<S>))
            .route("/vehicle/{plate}", web::get().to(get_session_by_vehicle::<S>))
            .route(
                "/vehicle/{plate}/history",
                web::get().to(get_vehicle_history::<S>),
            )
            .route("/ticket/{code}", web::get().to(get_session_by_ticket::<S>))
            .route("/{id}", web::get().to(get_session::<S>))
            .route("/{id}/amount", web::get().to(calculate_amount::<S>)),
    );
}
