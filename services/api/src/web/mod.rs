pub mod analyze;
pub mod rest;
pub mod state;

pub use analyze::analyze_idea_handler;
pub use rest::{delete_chat_handler, get_chat_handler, health_handler};

use axum::{
    http::{header::CONTENT_TYPE, header::InvalidHeaderValue, HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use state::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builds the API routes on top of the shared state.
pub fn api_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/analyze-idea", post(analyze_idea_handler))
        .route(
            "/chats/{chat_id}",
            get(get_chat_handler).delete(delete_chat_handler),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// CORS for the browser front-end at `origin`, including the owner header.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, InvalidHeaderValue> {
    Ok(CorsLayer::new()
        .allow_origin(origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static(analyze::USER_ID_HEADER),
        ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    #[tokio::test]
    async fn preflight_allows_the_owner_header() {
        let app = Router::new()
            .route("/analyze-idea", post(|| async { "ok" }))
            .layer(cors_layer("http://localhost:3000").unwrap());

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/analyze-idea")
                    .header("origin", "http://localhost:3000")
                    .header("access-control-request-method", "POST")
                    .header("access-control-request-headers", "content-type,x-user-id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let allowed = response
            .headers()
            .get("access-control-allow-headers")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        assert!(allowed.contains("x-user-id"));
        assert!(allowed.contains("content-type"));
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:3000"
        );
    }

    #[test]
    fn invalid_origin_is_rejected() {
        assert!(cors_layer("http://bad\norigin").is_err());
    }
}
