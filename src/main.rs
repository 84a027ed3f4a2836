use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use duo_match::config::{Settings, StoreBackend};
use duo_match::core::{EngineContext, MatchEngine, RateLimiter, SessionStore};
use duo_match::routes::{self, AppState};
use duo_match::services::{AppwriteProfileStore, InMemoryProfileStore, ProfileStore, TracingNotifier};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

fn init_tracing() {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }
}

fn build_store(settings: &Settings) -> std::io::Result<Arc<dyn ProfileStore>> {
    match settings.store.backend {
        StoreBackend::Memory => {
            info!("Using in-memory profile store");
            Ok(Arc::new(InMemoryProfileStore::new()))
        }
        StoreBackend::Appwrite => {
            let appwrite = &settings.appwrite;
            let store = AppwriteProfileStore::new(
                appwrite.endpoint.clone(),
                appwrite.api_key.clone(),
                appwrite.project_id.clone(),
                appwrite.database_id.clone(),
                appwrite.profiles_collection.clone(),
                Duration::from_millis(settings.store.timeout_ms),
            )
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

            let store = match appwrite.page_size {
                Some(page_size) => store.with_page_size(page_size),
                None => store,
            };

            info!(endpoint = %appwrite.endpoint, collection = %appwrite.profiles_collection, "Appwrite profile store initialized");
            Ok(Arc::new(store))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    init_tracing();

    info!("Starting Duo Match service...");

    let settings = Settings::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    info!("Configuration loaded successfully");

    let store = build_store(&settings)?;

    let context = EngineContext::new(
        Arc::new(RateLimiter::new()),
        SessionStore::new(settings.session.capacity, settings.session_idle()),
    );

    let engine_settings = settings.engine_settings();
    info!(
        find_limit = engine_settings.find_limit,
        like_limit = engine_settings.like_limit,
        moderators = engine_settings.moderators.len(),
        "Engine initialized with weights: {:?}",
        engine_settings.weights
    );

    let engine = Arc::new(MatchEngine::new(
        store,
        Arc::new(TracingNotifier),
        context,
        engine_settings,
    ));

    let housekeeping = engine.clone().spawn_housekeeping(settings.housekeeping_interval());

    let app_state = AppState { engine };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    let result = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await;

    housekeeping.abort();
    result
}
