//! API Routes
//!
//! Configures the Axum router with all endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, get_profile_handler, health_handler, invalidate_handler,
    invalidate_pattern_handler, list_profiles_handler, stats_handler, update_profile_handler,
    AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /profiles` - List profiles (cached)
/// - `GET /profiles/:id` - Get one profile (cached)
/// - `PUT /profiles/:id` - Update a profile and invalidate affected entries
/// - `DELETE /cache/:key` - Invalidate one cache key
/// - `POST /cache/invalidate` - Invalidate keys matching a pattern
/// - `DELETE /cache` - Clear the cache
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/profiles", get(list_profiles_handler))
        .route(
            "/profiles/:id",
            get(get_profile_handler).put(update_profile_handler),
        )
        .route("/cache", delete(clear_handler))
        .route("/cache/invalidate", post(invalidate_pattern_handler))
        .route("/cache/:key", delete(invalidate_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let state = AppState::from_config(&Config::default()).unwrap();
        create_router(state)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_profile_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/profiles/u1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_profile_not_found() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/profiles/nobody")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bad_pattern_is_bad_request() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/cache/invalidate")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"pattern":"("}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
