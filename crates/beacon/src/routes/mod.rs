//! HTTP route handlers for Beacon.

use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod health;
pub mod socket;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let cors_permissive = state.config.cors_permissive;

    let router = Router::new()
        // Health & Status
        .route("/health", get(health::health_check))
        .route("/stats", get(health::stats))

        // Location relay
        .route(waypoint_common::constants::WS_PATH, get(socket::ws_handler))

        // Add shared state
        .with_state(state);

    let router = if cors_permissive {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router.layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;
    use waypoint_common::Role;

    use crate::config::AppConfig;

    fn test_state() -> AppState {
        let (shutdown, _) = tokio::sync::broadcast::channel(1);
        AppState::new(AppConfig::default(), shutdown)
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (status, body) = get_json(create_router(test_state()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_stats_reflect_hub() {
        let state = test_state();
        let (a, _rx) = state.hub.connect().unwrap();
        state.hub.select_role(&a, Role::Bus).unwrap();

        let (status, body) = get_json(create_router(state), "/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["connections"], 1);
        assert_eq!(body["adminId"], serde_json::Value::Null);
        assert_eq!(body["busId"], a.as_str());
    }

    #[tokio::test]
    async fn test_ws_requires_upgrade() {
        let response = create_router(test_state())
            .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
