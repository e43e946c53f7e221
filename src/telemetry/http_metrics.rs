//! Prometheus metrics for HTTP traffic
//!
//! The recorder is owned by [`HttpMetrics`] and handed to the router, so each
//! server (and each test) gets its own registry instead of a process-global
//! one.

use std::sync::Arc;
use std::time::Duration;

use metrics::{Key, KeyName, Label, Level, Metadata, Recorder, SharedString};
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Requests received, by method and path
pub const REQUESTS_TOTAL: &str = "http_requests_total";
/// Responses sent, by method, path and status
pub const RESPONSE_STATUS: &str = "response_status";
/// Request duration histogram, by method and path
pub const RESPONSE_TIME: &str = "http_response_time_seconds";

/// Path label for requests that matched no route
pub const UNMATCHED_PATH: &str = "unmatched";

/// How often idle histogram buckets are drained
pub const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

// Prometheus client defaults
const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Request counters and latency histogram for the HTTP surface.
///
/// `path` labels are expected to be route templates (`/namespaces/{name}`),
/// never raw request paths.
#[derive(Clone)]
pub struct HttpMetrics {
    recorder: Arc<PrometheusRecorder>,
    handle: PrometheusHandle,
}

impl HttpMetrics {
    /// Create a recorder with the HTTP metric descriptions registered
    pub fn new() -> Result<Self, BuildError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Full(RESPONSE_TIME.to_string()), DURATION_BUCKETS)?
            .build_recorder();
        let handle = recorder.handle();

        recorder.describe_counter(
            KeyName::from(REQUESTS_TOTAL),
            None,
            SharedString::from("Number of HTTP requests."),
        );
        recorder.describe_counter(
            KeyName::from(RESPONSE_STATUS),
            None,
            SharedString::from("Status of HTTP responses."),
        );
        recorder.describe_histogram(
            KeyName::from(RESPONSE_TIME),
            None,
            SharedString::from("Duration of HTTP requests."),
        );

        Ok(Self {
            recorder: Arc::new(recorder),
            handle,
        })
    }

    /// Count a request as it enters the handler chain
    pub fn request_started(&self, method: &str, path: &str) {
        self.recorder
            .register_counter(&Key::from_parts(REQUESTS_TOTAL, labels(method, path)), &metadata())
            .increment(1);
    }

    /// Record the outcome and duration of a finished request
    pub fn request_finished(&self, method: &str, path: &str, status: u16, elapsed: Duration) {
        let route = labels(method, path);

        self.recorder
            .register_histogram(&Key::from_parts(RESPONSE_TIME, route.clone()), &metadata())
            .record(elapsed.as_secs_f64());

        let mut with_status = route;
        with_status.push(Label::new("status", status.to_string()));
        self.recorder
            .register_counter(&Key::from_parts(RESPONSE_STATUS, with_status), &metadata())
            .increment(1);
    }

    /// Prometheus text exposition of everything recorded so far
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Periodically run recorder upkeep until `shutdown` flips to true.
    pub fn spawn_upkeep(
        &self,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let handle = self.handle.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        trace!("running metrics upkeep");
                        handle.run_upkeep();
                    }
                    Ok(_) = shutdown.wait_for(|stop| *stop) => {
                        debug!("Metrics upkeep stopped");
                        break;
                    }
                }
            }
        })
    }
}

fn labels(method: &str, path: &str) -> Vec<Label> {
    vec![
        Label::new("method", method.to_string()),
        Label::new("path", path.to_string()),
    ]
}

fn metadata() -> Metadata<'static> {
    Metadata::new(module_path!(), Level::INFO, Some(module_path!()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_for<'a>(rendered: &'a str, metric: &str, needle: &str) -> Option<&'a str> {
        rendered
            .lines()
            .find(|l| l.starts_with(&format!("{metric}{{")) && l.contains(needle))
    }

    #[test]
    fn test_counts_requests_per_route() {
        let metrics = HttpMetrics::new().unwrap();

        metrics.request_started("GET", "/namespaces/{name}");
        metrics.request_started("GET", "/namespaces/{name}");
        metrics.request_finished("GET", "/namespaces/{name}", 200, Duration::from_millis(3));
        metrics.request_finished("GET", "/namespaces/{name}", 200, Duration::from_millis(7));

        let rendered = metrics.render();
        let requests = line_for(&rendered, REQUESTS_TOTAL, "/namespaces/{name}").unwrap();
        assert!(requests.ends_with(" 2"), "{requests}");

        let statuses = line_for(&rendered, RESPONSE_STATUS, "status=\"200\"").unwrap();
        assert!(statuses.ends_with(" 2"), "{statuses}");

        assert!(rendered.contains(&format!("{RESPONSE_TIME}_bucket")));
        assert!(rendered.contains("# HELP http_requests_total Number of HTTP requests."));
    }

    #[test]
    fn test_separate_recorders_do_not_share_state() {
        let first = HttpMetrics::new().unwrap();
        let second = HttpMetrics::new().unwrap();

        first.request_started("GET", "/healthz");

        assert!(line_for(&first.render(), REQUESTS_TOTAL, "/healthz").is_some());
        assert!(line_for(&second.render(), REQUESTS_TOTAL, "/healthz").is_none());
    }

    #[tokio::test]
    async fn test_upkeep_stops_on_shutdown() {
        let metrics = HttpMetrics::new().unwrap();
        let (tx, rx) = watch::channel(false);

        let task = metrics.spawn_upkeep(Duration::from_millis(10), rx);
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
