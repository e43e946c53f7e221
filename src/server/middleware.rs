//! Request pipeline wrapped around every route
//!
//! Outermost first:
//!
//! 1. request id (`x-request-id`, generated when absent, echoed back)
//! 2. access log
//! 3. metrics
//! 4. panic recovery
//!
//! Recovery is the innermost stage so that a panicking handler still shows up
//! as a 500 in both the access log and the metrics.

use std::any::Any;
use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::{DefaultOnResponse, MakeSpan, TraceLayer};
use tower_http::LatencyUnit;
use tracing::{Level, Span};
use uuid::Uuid;

use super::errors::ApiError;
use super::METRICS_PATH;
use crate::telemetry::{HttpMetrics, UNMATCHED_PATH};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Wrap `router` in the full request pipeline
pub fn apply(router: Router, metrics: HttpMetrics) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(AccessLogSpan)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(LatencyUnit::Millis),
                    ),
            )
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(middleware::from_fn_with_state(metrics, track_metrics))
            .layer(CatchPanicLayer::custom(handle_panic)),
    )
}

/// Generates UUID v4 request ids
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Access-log span carrying method, path and request id
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessLogSpan;

impl<B> MakeSpan<B> for AccessLogSpan {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> Span {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::info_span!(
            "request",
            method = %request.method(),
            path = %request.uri().path(),
            request_id = %request_id,
        )
    }
}

/// Records request count, status and latency per route template
pub async fn track_metrics(
    State(metrics): State<HttpMetrics>,
    request: Request,
    next: Next,
) -> Response {
    if request.uri().path() == METRICS_PATH {
        return next.run(request).await;
    }

    // Route template, so /namespaces/a and /namespaces/b share a label
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED_PATH.to_owned());
    let method = request.method().to_string();

    metrics.request_started(&method, &path);
    let start = Instant::now();

    let response = next.run(request).await;

    metrics.request_finished(&method, &path, response.status().as_u16(), start.elapsed());
    response
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    ApiError::internal()
        .with_detail(format!("handler panicked: {}", detail))
        .into_response()
}
