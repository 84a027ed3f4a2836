use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::core::FindOutcome;
use crate::models::{
    ErrorResponse, FindPartnerRequest, HealthResponse, MatchEventType, MatchesResponse, Profile,
    RecordEventRequest, RespondRequest, SaveProfileRequest, SwipeRequest, UserId, UserQuery,
};
use crate::routes::{count_view, engine_error, validation_error, AppState};

/// Configure queue, like and stats routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/profiles", web::put().to(save_profile))
        .route("/partners/find", web::post().to(find_partner))
        .route("/partners/current", web::get().to(current))
        .route("/partners/like", web::post().to(like))
        .route("/partners/dislike", web::post().to(dislike))
        .route("/partners/restart", web::post().to(restart))
        .route("/partners/end", web::post().to(end_session))
        .route("/likes/inbox", web::get().to(inbox))
        .route("/likes/respond", web::post().to(respond))
        .route("/matches", web::get().to(matches))
        .route("/stats", web::get().to(stats))
        .route("/events", web::post().to(record_event))
        .route("/settings/reset-likes", web::post().to(reset_likes));
}

async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        live_sessions: state.engine.context().sessions.len(),
    })
}

/// Register or update the caller's profile
///
/// PUT /api/v1/profiles
///
/// Request body:
/// ```json
/// { "userId": "string", "name": "string", "hours": 640, "age": 26, "bio": "string" }
/// ```
async fn save_profile(
    state: web::Data<AppState>,
    req: web::Json<SaveProfileRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let req = req.into_inner();
    let profile = Profile {
        user_id: UserId::new(req.user_id),
        name: req.name,
        username: req.username,
        hours: req.hours,
        age: req.age,
        bio: req.bio,
        is_verified: None,
        is_active: true,
        created_at: None,
    };

    match state.engine.save_profile(profile).await {
        Ok(saved) => HttpResponse::Ok().json(saved),
        Err(e) => {
            tracing::error!(error = %e, "Failed to save profile");
            engine_error(&e)
        }
    }
}

/// Start today's like budget over
async fn reset_likes(
    state: web::Data<AppState>,
    req: web::Json<FindPartnerRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let user = UserId::new(req.user_id.as_str());
    let reset = state.engine.reset_like_budget(&user);

    HttpResponse::Ok().json(serde_json::json!({ "userId": user, "reset": reset }))
}

/// Build a fresh queue and return its first card
///
/// POST /api/v1/partners/find
///
/// Request body:
/// ```json
/// { "userId": "string" }
/// ```
async fn find_partner(
    state: web::Data<AppState>,
    req: web::Json<FindPartnerRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let user = UserId::new(req.user_id.as_str());
    tracing::info!(user_id = %user, "Finding partner");

    match state.engine.find_partner(&user).await {
        Ok(outcome) => {
            if let FindOutcome::Candidate(_) = &outcome {
                state.engine.record_event(&user, MatchEventType::Viewed);
            }
            HttpResponse::Ok().json(outcome)
        }
        Err(e) => {
            tracing::error!(user_id = %user, error = %e, "Failed to build partner queue");
            engine_error(&e)
        }
    }
}

async fn current(state: web::Data<AppState>, query: web::Query<UserQuery>) -> impl Responder {
    let user = UserId::new(query.user_id.as_str());
    HttpResponse::Ok().json(state.engine.current(&user).await)
}

/// Like the candidate `targetUserId`
///
/// POST /api/v1/partners/like
///
/// Request body:
/// ```json
/// { "userId": "string", "targetUserId": "string" }
/// ```
async fn like(state: web::Data<AppState>, req: web::Json<SwipeRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let user = UserId::new(req.user_id.as_str());
    let target = UserId::new(req.target_user_id.as_str());

    match state.engine.like(&user, &target).await {
        Ok(swipe) => {
            count_view(&state.engine, &user, &swipe.next);
            HttpResponse::Ok().json(swipe)
        }
        Err(e) => engine_error(&e),
    }
}

async fn dislike(state: web::Data<AppState>, req: web::Json<SwipeRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let user = UserId::new(req.user_id.as_str());
    let swipe = state
        .engine
        .dislike(&user, &UserId::new(req.target_user_id.as_str()))
        .await;

    count_view(&state.engine, &user, &swipe.next);
    HttpResponse::Ok().json(swipe)
}

async fn restart(state: web::Data<AppState>, req: web::Json<FindPartnerRequest>) -> impl Responder {
    let user = UserId::new(req.user_id.as_str());
    let next = state.engine.restart(&user).await;

    count_view(&state.engine, &user, &next);
    HttpResponse::Ok().json(next)
}

async fn end_session(state: web::Data<AppState>, req: web::Json<FindPartnerRequest>) -> impl Responder {
    let user = UserId::new(req.user_id.as_str());
    let ended = state.engine.end_session(&user).await;

    HttpResponse::Ok().json(serde_json::json!({ "userId": user, "ended": ended }))
}

async fn inbox(state: web::Data<AppState>, query: web::Query<UserQuery>) -> impl Responder {
    let user = UserId::new(query.user_id.as_str());
    let pending = state.engine.inbox(&user);

    HttpResponse::Ok().json(serde_json::json!({
        "userId": user,
        "pending": pending,
        "count": pending.len(),
    }))
}

/// Accept or dismiss a pending like
///
/// POST /api/v1/likes/respond
///
/// Request body:
/// ```json
/// { "userId": "string", "likerId": "string", "accept": true }
/// ```
async fn respond(state: web::Data<AppState>, req: web::Json<RespondRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let responder = UserId::new(req.user_id.as_str());
    let liker = UserId::new(req.liker_id.as_str());

    match state.engine.respond(&responder, &liker, req.accept).await {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(e) => engine_error(&e),
    }
}

async fn matches(state: web::Data<AppState>, query: web::Query<UserQuery>) -> impl Responder {
    let user = UserId::new(query.user_id.as_str());
    let partners = state.engine.matches(&user);

    HttpResponse::Ok().json(MatchesResponse {
        user_id: user,
        partners,
    })
}

async fn stats(state: web::Data<AppState>, query: web::Query<UserQuery>) -> impl Responder {
    let user = UserId::new(query.user_id.as_str());
    HttpResponse::Ok().json(state.engine.stats(&user))
}

/// Count an event observed by the client
///
/// POST /api/v1/events
///
/// Request body:
/// ```json
/// { "userId": "string", "eventType": "viewed|liked|passed|matched" }
/// ```
async fn record_event(
    state: web::Data<AppState>,
    req: web::Json<RecordEventRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let event_type = match req.event_type.to_lowercase().as_str() {
        "viewed" => MatchEventType::Viewed,
        "liked" => MatchEventType::Liked,
        "passed" => MatchEventType::Passed,
        "matched" => MatchEventType::Matched,
        _ => {
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "Invalid event type".to_string(),
                message: "Event type must be one of: viewed, liked, passed, matched".to_string(),
                status_code: 400,
                retryable: false,
            });
        }
    };

    let user = UserId::new(req.user_id.as_str());
    state.engine.record_event(&user, event_type);
    tracing::debug!(user_id = %user, ?event_type, "Recorded event");

    HttpResponse::Ok().json(state.engine.stats(&user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EngineContext, EngineSettings, MatchEngine};
    use crate::models::{Profile, UserStats};
    use crate::services::{InMemoryProfileStore, TracingNotifier};
    use actix_web::{test, App};
    use std::sync::Arc;

    fn profile(id: &str, hours: u32) -> Profile {
        Profile {
            user_id: id.into(),
            name: id.to_uppercase(),
            username: None,
            hours,
            age: 21,
            bio: String::new(),
            is_verified: None,
            is_active: true,
            created_at: None,
        }
    }

    fn state() -> AppState {
        let store = InMemoryProfileStore::with_profiles(vec![
            profile("a", 100),
            profile("b", 120),
            profile("c", 400),
        ]);
        AppState {
            engine: Arc::new(MatchEngine::new(
                Arc::new(store),
                Arc::new(TracingNotifier),
                EngineContext::default(),
                EngineSettings::default(),
            )),
        }
    }

    #[actix_web::test]
    async fn test_find_then_like() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/partners/find")
            .set_json(serde_json::json!({ "userId": "a" }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "candidate");
        assert_eq!(body["profile"]["userId"], "b");

        let req = test::TestRequest::post()
            .uri("/api/v1/partners/like")
            .set_json(serde_json::json!({ "userId": "a", "targetUserId": "b" }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["like"]["status"], "pending_created");
        assert_eq!(body["next"]["profile"]["userId"], "c");

        let req = test::TestRequest::get()
            .uri("/api/v1/stats?userId=a")
            .to_request();
        let stats: UserStats = test::call_and_read_body_json(&app, req).await;
        assert_eq!(stats.viewed, 2);
        assert_eq!(stats.likes_given, 1);
    }

    #[actix_web::test]
    async fn test_validation_failure() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/partners/find")
            .set_json(serde_json::json!({ "userId": "" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_unknown_event_type() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/events")
            .set_json(serde_json::json!({ "userId": "a", "eventType": "teleported" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_register_profiles_then_find() {
        let engine = Arc::new(MatchEngine::new(
            Arc::new(InMemoryProfileStore::new()),
            Arc::new(TracingNotifier),
            EngineContext::default(),
            EngineSettings::default(),
        ));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState { engine }))
                .configure(crate::routes::configure_routes),
        )
        .await;

        for (id, hours) in [("a", 100), ("b", 120)] {
            let req = test::TestRequest::put()
                .uri("/api/v1/profiles")
                .set_json(serde_json::json!({ "userId": id, "name": id, "hours": hours, "age": 22 }))
                .to_request();
            let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(body["isActive"], true);
        }

        let req = test::TestRequest::put()
            .uri("/api/v1/profiles")
            .set_json(serde_json::json!({ "userId": "kid", "name": "Kid", "hours": 1, "age": 9 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/v1/partners/find")
            .set_json(serde_json::json!({ "userId": "a" }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "candidate");
        assert_eq!(body["profile"]["userId"], "b");
    }

    #[actix_web::test]
    async fn test_reset_likes() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/settings/reset-likes")
            .set_json(serde_json::json!({ "userId": "a" }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["userId"], "a");
        assert_eq!(body["reset"], false);
    }
}
