//! Request extractors
//!
//! The acting operator is identified upstream by the authentication layer
//! and forwarded in the `X-Operator-Id` header.

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use parking_core::{AppError, AppResult};
use tracing::{debug, warn};

/// Header carrying the acting operator's id
pub const OPERATOR_HEADER: &str = "X-Operator-Id";

/// Operator identity extractor
///
/// A missing or blank header yields `OperatorId(None)` and the service
/// decides whether an operator is required. A header that is not a valid
/// id is rejected with `401 Unauthorized`.
///
/// # Examples
///
/// ```no_run
/// use actix_web::HttpResponse;
/// use parking_api::extract::OperatorId;
///
/// async fn handler(operator: OperatorId) -> HttpResponse {
///     HttpResponse::Ok().body(format!("{:?}", operator.0))
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OperatorId(pub Option<i64>);

impl FromRequest for OperatorId {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            operator_from_request(req)
                .map(OperatorId)
                .map_err(Into::into),
        )
    }
}

fn operator_from_request(req: &HttpRequest) -> AppResult<Option<i64>> {
    let Some(value) = req.headers().get(OPERATOR_HEADER) else {
        debug!("No operator header on request");
        return Ok(None);
    };

    let raw = value.to_str().map_err(|_| {
        warn!("Operator header is not valid ASCII");
        AppError::Unauthorized("Operator header is not readable".to_string())
    })?;

    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    raw.parse::<i64>().map(Some).map_err(|_| {
        warn!(header = raw, "Rejected malformed operator id");
        AppError::Unauthorized(format!("Invalid operator id '{}'", raw))
    })
}
