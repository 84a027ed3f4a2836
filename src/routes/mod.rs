// Route exports
pub mod moderation;
pub mod partners;

use actix_web::{web, HttpResponse};
use std::sync::Arc;

use crate::core::{MatchEngine, Next};
use crate::error::EngineError;
use crate::models::{ErrorResponse, MatchEventType, UserId};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<MatchEngine>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(partners::configure)
            .configure(moderation::configure),
    );
}

/// Map an engine error to its HTTP status
pub(crate) fn engine_error(err: &EngineError) -> HttpResponse {
    let (status, error) = match err {
        EngineError::StoreUnavailable(_) | EngineError::StoreTimeout(_) => {
            (503, "Profile store unavailable")
        }
        EngineError::InvalidInput(_) => (400, "Invalid input"),
        EngineError::Forbidden(_) => (403, "Forbidden"),
    };

    let body = ErrorResponse {
        error: error.to_string(),
        message: err.to_string(),
        status_code: status,
        retryable: err.is_retryable(),
    };

    match status {
        503 => HttpResponse::ServiceUnavailable().json(body),
        403 => HttpResponse::Forbidden().json(body),
        _ => HttpResponse::BadRequest().json(body),
    }
}

pub(crate) fn validation_error(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
        retryable: false,
    })
}

/// Count a card shown to `user`
pub(crate) fn count_view(engine: &MatchEngine, user: &UserId, next: &Next) {
    if let Next::Candidate(_) = next {
        engine.record_event(user, MatchEventType::Viewed);
    }
}
