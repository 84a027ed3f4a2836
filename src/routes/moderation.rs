use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::models::{
    BanRequest, BanResponse, ModeratorQuery, ModeratorRequest, ReportCountEntry,
    ReportCountsResponse, ReportRequest, UserId, UserQuery,
};
use crate::routes::{engine_error, validation_error, AppState};

/// Configure report and moderator routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/reports", web::post().to(report))
        .route("/moderation/reports", web::get().to(report_counts))
        .route("/moderation/ban", web::post().to(ban))
        .route("/moderation/unban", web::post().to(unban))
        .route("/moderation/clear-reports", web::post().to(clear_reports))
        .route("/moderation/status", web::get().to(ban_status));
}

async fn report(state: web::Data<AppState>, req: web::Json<ReportRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let outcome = state
        .engine
        .report(
            &UserId::new(req.reporter_id.as_str()),
            &UserId::new(req.reported_id.as_str()),
        )
        .await;

    HttpResponse::Ok().json(outcome)
}

/// Reported users, most reported first
///
/// GET /api/v1/moderation/reports?moderatorId={moderatorId}
async fn report_counts(
    state: web::Data<AppState>,
    query: web::Query<ModeratorQuery>,
) -> impl Responder {
    match state
        .engine
        .report_counts(&UserId::new(query.moderator_id.as_str()))
    {
        Ok(counts) => HttpResponse::Ok().json(ReportCountsResponse {
            reports: counts
                .into_iter()
                .map(|(user_id, count)| ReportCountEntry { user_id, count })
                .collect(),
        }),
        Err(e) => engine_error(&e),
    }
}

/// Ban a user
///
/// POST /api/v1/moderation/ban
///
/// Request body:
/// ```json
/// { "moderatorId": "string", "userId": "string", "durationDays": 7 }
/// ```
async fn ban(state: web::Data<AppState>, req: web::Json<BanRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let user = UserId::new(req.user_id.as_str());

    match state
        .engine
        .ban(&UserId::new(req.moderator_id.as_str()), &user, req.duration_days)
        .await
    {
        Ok(banned_until) => HttpResponse::Ok().json(BanResponse {
            user_id: user,
            banned_until,
        }),
        Err(e) => {
            tracing::warn!(user_id = %user, error = %e, "Ban failed");
            engine_error(&e)
        }
    }
}

async fn unban(state: web::Data<AppState>, req: web::Json<ModeratorRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let user = UserId::new(req.user_id.as_str());

    match state
        .engine
        .unban(&UserId::new(req.moderator_id.as_str()), &user)
        .await
    {
        Ok(lifted) => HttpResponse::Ok().json(serde_json::json!({ "userId": user, "lifted": lifted })),
        Err(e) => engine_error(&e),
    }
}

async fn clear_reports(
    state: web::Data<AppState>,
    req: web::Json<ModeratorRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let user = UserId::new(req.user_id.as_str());

    match state
        .engine
        .clear_reports(&UserId::new(req.moderator_id.as_str()), &user)
    {
        Ok(cleared) => HttpResponse::Ok().json(serde_json::json!({ "userId": user, "cleared": cleared })),
        Err(e) => engine_error(&e),
    }
}

async fn ban_status(state: web::Data<AppState>, query: web::Query<UserQuery>) -> impl Responder {
    let user = UserId::new(query.user_id.as_str());
    let banned = state.engine.is_banned(&user);

    HttpResponse::Ok().json(serde_json::json!({ "userId": user, "banned": banned }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EngineContext, EngineSettings, MatchEngine};
    use crate::services::{InMemoryProfileStore, TracingNotifier};
    use actix_web::{http::StatusCode, test, App};
    use std::sync::Arc;

    fn state() -> AppState {
        let settings = EngineSettings {
            moderators: vec!["mod".into()],
            ..Default::default()
        };
        AppState {
            engine: Arc::new(MatchEngine::new(
                Arc::new(InMemoryProfileStore::new()),
                Arc::new(TracingNotifier),
                EngineContext::default(),
                settings,
            )),
        }
    }

    #[actix_web::test]
    async fn test_ban_requires_moderator() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/moderation/ban")
            .set_json(serde_json::json!({ "moderatorId": "u1", "userId": "u2", "durationDays": 3 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri("/api/v1/moderation/ban")
            .set_json(serde_json::json!({ "moderatorId": "mod", "userId": "u2", "durationDays": 3 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/v1/moderation/status?userId=u2")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["banned"], true);
    }

    #[actix_web::test]
    async fn test_reports_listed_for_moderator() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        for reporter in ["r1", "r2"] {
            let req = test::TestRequest::post()
                .uri("/api/v1/reports")
                .set_json(serde_json::json!({ "reporterId": reporter, "reportedId": "x" }))
                .to_request();
            test::call_service(&app, req).await;
        }

        let req = test::TestRequest::get()
            .uri("/api/v1/moderation/reports?moderatorId=mod")
            .to_request();
        let body: ReportCountsResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body.reports.len(), 1);
        assert_eq!(body.reports[0].count, 2);
    }
}
