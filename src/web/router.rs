//! Web application router and middleware setup.

use crate::web::config::WebConfig;
use crate::web::handlers::{self, AppState};
use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main axum application with all routes and middleware.
pub fn create_app(config: &WebConfig, state: AppState) -> Router {
    let mut app = Router::new()
        .route("/api/metrics", get(handlers::get_metrics))
        .route("/api/health", get(handlers::health_check))
        .with_state(state);

    if config.enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{CycleReport, FieldValue, Fields, Metric, Tags};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_metrics_unavailable_before_first_cycle() {
        let app = create_app(&WebConfig::default(), AppState::new());
        let response = app.oneshot(request("/api/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_metrics_returns_latest_report() {
        let state = AppState::new();
        let mut fields = Fields::new();
        fields.insert("a".to_string(), FieldValue::Float(1.0));
        state
            .publish(CycleReport {
                timestamp: 42,
                duration_ms: 3,
                commands: 1,
                metrics: vec![Metric::new("exec", fields, Tags::new(), chrono::Utc::now()).unwrap()],
                error: None,
            })
            .await;

        let app = create_app(&WebConfig::default(), state);
        let response = app.oneshot(request("/api/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["timestamp"], 42);
        assert_eq!(json["metrics"][0]["name"], "exec");
        assert_eq!(json["metrics"][0]["fields"]["a"], 1.0);
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = create_app(&WebConfig::default().with_cors(false), AppState::new());
        let response = app.oneshot(request("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
