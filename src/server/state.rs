use axum::http::StatusCode;

use super::readiness::Readiness;
use crate::namespaces::NamespaceService;
use crate::telemetry::HttpMetrics;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub namespaces: NamespaceService,
    pub readiness: Readiness,
    pub metrics: HttpMetrics,
    /// Status returned when creating a namespace that already exists
    pub conflict_status: StatusCode,
}

impl AppState {
    pub fn new(namespaces: NamespaceService, readiness: Readiness, metrics: HttpMetrics) -> Self {
        Self {
            namespaces,
            readiness,
            metrics,
            conflict_status: StatusCode::BAD_REQUEST,
        }
    }

    pub fn with_conflict_status(mut self, status: StatusCode) -> Self {
        self.conflict_status = status;
        self
    }
}
