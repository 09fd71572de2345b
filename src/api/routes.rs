use crate::AppState;
use crate::api::handlers;
use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health))
        .route("/ws/search", get(handlers::search::ws_search))
        .route("/extract-ideas", post(handlers::summarize::extract_ideas))
        .route("/consolidate", post(handlers::consolidate::consolidate))
}

/// CORS for the configured browser origins; unparseable origins are skipped.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any)
}

/// The full application: routes, state, CORS and request tracing.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config_manager.config().server.cors_origins);
    create_router()
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
