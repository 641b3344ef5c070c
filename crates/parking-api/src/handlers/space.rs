//! Parking space handlers
//!
//! HTTP handlers for space registration, occupancy, and activation.

use crate::dto::{
    ApiResponse, CreateSpaceRequest, CreatedResponse, OccupySpaceRequest, SpaceListParams,
    SpaceResponse,
};
use actix_web::{web, HttpResponse};
use parking_core::traits::ParkingStore;
use parking_core::AppError;
use parking_services::ParkingServices;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Register a new space
///
/// POST /api/v1/spaces
#[instrument(skip(services, req))]
pub async fn create_space<S: ParkingStore>(
    services: web::Data<ParkingServices<S>>,
    req: web::Json<CreateSpaceRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Space creation validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let id = services
        .spaces
        .create_space(&req.space_number, req.vehicle_type_id)
        .await?;

    info!(id, number = %req.space_number, "Space created");

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        CreatedResponse { id },
        "Parking space created",
    )))
}

/// List spaces
///
/// GET /api/v1/spaces
#[instrument(skip(services))]
pub async fn list_spaces<S: ParkingStore>(
    services: web::Data<ParkingServices<S>>,
    query: web::Query<SpaceListParams>,
) -> Result<HttpResponse, AppError> {
    let spaces = services.spaces.list_spaces((&*query).into()).await?;
    debug!("Returning {} spaces", spaces.len());

    let response: Vec<SpaceResponse> = spaces.into_iter().map(SpaceResponse::from).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}

/// Occupancy counts per vehicle type
///
/// GET /api/v1/spaces/summary
#[instrument(skip(services))]
pub async fn availability_summary<S: ParkingStore>(
    services: web::Data<ParkingServices<S>>,
) -> Result<HttpResponse, AppError> {
    let summary = services.spaces.availability_summary().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(summary)))
}

/// GET /api/v1/spaces/{id}
#[instrument(skip(services))]
pub async fn get_space<S: ParkingStore>(
    services: web::Data<ParkingServices<S>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let space = services.spaces.get_space(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(SpaceResponse::from(space))))
}

/// Mark a space occupied outside the entry flow
///
/// POST /api/v1/spaces/{id}/occupy
#[instrument(skip(services, req))]
pub async fn occupy_space<S: ParkingStore>(
    services: web::Data<ParkingServices<S>>,
    path: web::Path<i64>,
    req: web::Json<OccupySpaceRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Occupy validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let space = services
        .spaces
        .occupy_space(path.into_inner(), &req.license_plate)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        SpaceResponse::from(space),
        "Parking space occupied",
    )))
}

/// POST /api/v1/spaces/{id}/free
#[instrument(skip(services))]
pub async fn free_space<S: ParkingStore>(
    services: web::Data<ParkingServices<S>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let space = services.spaces.free_space(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        SpaceResponse::from(space),
        "Parking space freed",
    )))
}

/// POST /api/v1/spaces/{id}/activate
#[instrument(skip(services))]
pub async fn activate_space<S: ParkingStore>(
    services: web::Data<ParkingServices<S>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let space = services.spaces.activate_space(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(SpaceResponse::from(space))))
}

/// POST /api/v1/spaces/{id}/deactivate
#[instrument(skip(services))]
pub async fn deactivate_space<S: ParkingStore>(
    services: web::Data<ParkingServices<S>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let space = services.spaces.deactivate_space(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(SpaceResponse::from(space))))
}

/// Configure space routes
pub fn configure<S: ParkingStore>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/spaces")
            .route("", web::post().to(create_space::<S>))
            .route("", web::get().to(list_spaces::<S>))
            .route("/summary", web::get().to(availability_summary::<S>))
            .route("/{id}", web::get().to(get_space::<S>))
            .route("/{id}/occupy", web::post().to(occupy_space::<S>))
            .route("/{id}/free", web::post().to(free_space::<S>))
            .route("/{id}/activate", web::post().to(activate_space::<S>))
            .route("/{id}/deactivate", web::post().to(deactivate_space::<S>)),
    );
}
