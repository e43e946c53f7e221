use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::errors::{ApiError, MALFORMED_BODY_MESSAGE, MISSING_NAME_MESSAGE, ROUTE_NOT_FOUND_MESSAGE};
use super::state::AppState;
use crate::namespaces::{NamespaceLookup, Pod};

/// Content type of the Prometheus text exposition format
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Body of `POST /namespaces`
#[derive(Debug, Deserialize)]
pub struct CreateNamespaceRequest {
    #[serde(default)]
    pub name: Option<String>,
}

/// Body returned for a namespace that exists but runs no pods
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmptyNamespaceResponse {
    pub name: String,
    pub pods: Vec<Pod>,
    pub message: String,
}

impl EmptyNamespaceResponse {
    pub fn new(name: String) -> Self {
        let message = format!("Namespace '{}' has no Pods", name);
        Self {
            name,
            pods: Vec::new(),
            message,
        }
    }
}

// ============================================================================
// Namespaces
// ============================================================================

pub async fn list_namespaces(State(state): State<AppState>) -> Result<Response, ApiError> {
    let namespaces = state
        .namespaces
        .list_all()
        .await
        .map_err(|e| ApiError::from_namespace(e, state.conflict_status))?;

    Ok(Json(namespaces).into_response())
}

pub async fn get_namespace(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let lookup = state
        .namespaces
        .get(&name)
        .await
        .map_err(|e| ApiError::from_namespace(e, state.conflict_status))?;

    Ok(match lookup {
        NamespaceLookup::Populated(namespace) => Json(namespace).into_response(),
        NamespaceLookup::Empty(name) => Json(EmptyNamespaceResponse::new(name)).into_response(),
    })
}

/// Create a namespace.
///
/// The body is parsed by hand so that a malformed body and a missing name get
/// their own messages instead of the extractor's rejection text.
pub async fn create_namespace(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request: CreateNamespaceRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(MALFORMED_BODY_MESSAGE).with_detail(e.to_string()))?;
    let name = request
        .name
        .ok_or_else(|| ApiError::bad_request(MISSING_NAME_MESSAGE))?;

    let namespace = state
        .namespaces
        .create(&name)
        .await
        .map_err(|e| ApiError::from_namespace(e, state.conflict_status))?;

    info!("Created namespace {}", namespace.name);
    Ok((StatusCode::CREATED, Json(namespace)).into_response())
}

// ============================================================================
// Health & Metrics
// ============================================================================

pub async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    if state.readiness.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

pub async fn render_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        state.metrics.render(),
    )
}

pub async fn not_found() -> ApiError {
    ApiError::not_found(ROUTE_NOT_FOUND_MESSAGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryGateway;
    use crate::namespaces::{Namespace, NamespaceService};
    use crate::server::create_router;
    use crate::server::readiness::Readiness;
    use crate::telemetry::HttpMetrics;
    use axum::{body::Body, http::Request, Router};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn create_test_app(gateway: InMemoryGateway) -> (Router, AppState) {
        let service = NamespaceService::new(Arc::new(gateway));
        let state = AppState::new(service, Readiness::new(), HttpMetrics::new().unwrap());
        (create_router(state.clone()), state)
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/namespaces")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_get_populated_namespace() {
        let (app, _) = create_test_app(
            InMemoryGateway::new().with_pod("default", "nginx", "Running"),
        );

        let response = app.oneshot(get("/namespaces/default")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let namespace: Namespace = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(namespace.pods.len(), 1);
        assert_eq!(namespace.pods[0].status, "Running");
    }

    #[tokio::test]
    async fn test_get_empty_namespace_has_notice() {
        let (app, _) = create_test_app(InMemoryGateway::new().with_namespace("kube-public"));

        let response = app.oneshot(get("/namespaces/kube-public")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({
                "name": "kube-public",
                "pods": [],
                "message": "Namespace 'kube-public' has no Pods"
            })
        );
    }

    #[tokio::test]
    async fn test_get_missing_namespace_is_404() {
        let (app, _) = create_test_app(InMemoryGateway::new());

        let response = app.oneshot(get("/namespaces/ghost")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_json(response).await["message"]
            .as_str()
            .unwrap()
            .contains("ghost"));
    }

    #[tokio::test]
    async fn test_create_namespace() {
        let (app, _) = create_test_app(InMemoryGateway::new());

        let response = app.oneshot(post(r#"{"name": "team-a"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"name": "team-a", "pods": []})
        );
    }

    #[tokio::test]
    async fn test_create_rejects_bodies_with_distinct_messages() {
        let cases = [
            ("not json", MALFORMED_BODY_MESSAGE),
            (r#"{"name": 42}"#, MALFORMED_BODY_MESSAGE),
            ("{}", MISSING_NAME_MESSAGE),
            (r#"{"name": null}"#, MISSING_NAME_MESSAGE),
        ];

        for (body, expected) in cases {
            let (app, _) = create_test_app(InMemoryGateway::new());
            let response = app.oneshot(post(body)).await.unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
            assert_eq!(body_json(response).await["message"], expected, "body: {}", body);
        }
    }

    #[tokio::test]
    async fn test_create_invalid_name_mentions_rfc_1123() {
        let (app, _) = create_test_app(InMemoryGateway::new());

        let response = app.oneshot(post(r#"{"name": "My_NS"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let message = body_json(response).await["message"].as_str().unwrap().to_string();
        assert!(message.contains("My_NS"));
        assert!(message.contains("RFC 1123"));
    }

    #[tokio::test]
    async fn test_readyz_follows_readiness() {
        let (app, state) = create_test_app(InMemoryGateway::new());

        let response = app.clone().oneshot(get("/readyz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        state.readiness.mark_ready();
        let response = app.oneshot(get("/readyz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_healthz_ignores_readiness() {
        let (app, _) = create_test_app(InMemoryGateway::new());

        let response = app.oneshot(get("/healthz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_content_type() {
        let (app, _) = create_test_app(InMemoryGateway::new());

        let response = app.oneshot(get("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            PROMETHEUS_CONTENT_TYPE
        );
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (app, _) = create_test_app(InMemoryGateway::new());

        let response = app.oneshot(get("/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["message"], ROUTE_NOT_FOUND_MESSAGE);
    }
}
