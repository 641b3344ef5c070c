//! Rate configuration handlers

use crate::dto::{
    ApiResponse, CreatedResponse, RateConfigCreateRequest, RateConfigFilterParams,
    RateConfigResponse,
};
use actix_web::{web, HttpResponse};
use parking_core::traits::ParkingStore;
use parking_core::AppError;
use parking_services::ParkingServices;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Create a rate config; it replaces the vehicle type's active one
///
/// POST /api/v1/rate-configs
#[instrument(skip(services, req))]
pub async fn create_rate_config<S: ParkingStore>(
    services: web::Data<ParkingServices<S>>,
    req: web::Json<RateConfigCreateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Rate config validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    debug!(
        vehicle_type_id = req.vehicle_type_id,
        rate = %req.rate_per_hour,
        "Creating rate config"
    );

    let id = services
        .rate_configs
        .create_rate_config(req.to_service_request())
        .await?;

    info!(id, "Rate config created");

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        CreatedResponse { id },
        "Rate config created",
    )))
}

/// List rate configs, newest first
///
/// GET /api/v1/rate-configs
#[instrument(skip(services))]
pub async fn list_rate_configs<S: ParkingStore>(
    services: web::Data<ParkingServices<S>>,
    filters: web::Query<RateConfigFilterParams>,
) -> Result<HttpResponse, AppError> {
    let configs = services
        .rate_configs
        .list_rate_configs(filters.vehicle_type_id)
        .await?;

    let response: Vec<RateConfigResponse> = configs.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}

/// GET /api/v1/rate-configs/{id}
#[instrument(skip(services))]
pub async fn get_rate_config<S: ParkingStore>(
    services: web::Data<ParkingServices<S>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let config = services.rate_configs.get_rate_config(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(RateConfigResponse::from(config))))
}

/// Active rate config for a vehicle type
///
/// GET /api/v1/rate-configs/active/{vehicle_type_id}
#[instrument(skip(services))]
pub async fn get_active_rate_config<S: ParkingStore>(
    services: web::Data<ParkingServices<S>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let config = services
        .rate_configs
        .get_active_rate_config(path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(RateConfigResponse::from(config))))
}

/// POST /api/v1/rate-configs/{id}/activate
#[instrument(skip(services))]
pub async fn activate_rate_config<S: ParkingStore>(
    services: web::Data<ParkingServices<S>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let config = services
        .rate_configs
        .activate_rate_config(path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        RateConfigResponse::from(config),
        "Rate config activated",
    )))
}

/// POST /api/v1/rate-configs/{id}/deactivate
#[instrument(skip(services))]
pub async fn deactivate_rate_config<S: ParkingStore>(
    services: web::Data<ParkingServices<S>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let config = services
        .rate_configs
        .deactivate_rate_config(path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        RateConfigResponse::from(config),
        "Rate config deactivated",
    )))
}

/// Configure rate config routes
pub fn configure<S: ParkingStore>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/rate-configs")
            .route("", web::post().to(create_rate_config::<S>))
            .route("", web::get().to(list_rate_configs::<S>))
            .route(
                "/active/{vehicle_type_id}",
                web::get().to(get_active_rate_config::<S>),
            )
            .route("/{id}", web::get().to(get_rate_config::<S>))
            .route("/{id}/activate", web::post().to(activate_rate_config::<S>))
            .route("/{id}/deactivate", web::post().to(deactivate_rate_config::<S>)),
    );
}
