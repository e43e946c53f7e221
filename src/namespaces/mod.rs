//! Namespace aggregation
//!
//! [`NamespaceService`] sits between the HTTP handlers and the
//! [`ClusterGateway`]. It assembles namespaces with their pods, validates
//! names before anything reaches the cluster and folds gateway failures into
//! [`NamespaceError`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::gateway::{ClusterGateway, GatewayError};

pub mod types;
pub mod validation;

pub use types::{Namespace, NamespaceLookup, Pod};
pub use validation::{validate_name, NameError, MAX_NAME_LEN};

/// Default upper bound on a single gateway call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Failures of namespace operations, one variant per client-visible outcome
#[derive(Error, Debug)]
pub enum NamespaceError {
    #[error(transparent)]
    Validation(#[from] NameError),

    #[error("Namespace '{0}' not found")]
    NotFound(String),

    #[error("Namespace '{0}' already exists")]
    Conflict(String),

    #[error("Cluster API call {operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("Cluster API call failed: {0}")]
    Internal(GatewayError),
}

impl From<GatewayError> for NamespaceError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound(name) => NamespaceError::NotFound(name),
            GatewayError::AlreadyExists(name) => NamespaceError::Conflict(name),
            other => NamespaceError::Internal(other),
        }
    }
}

/// Namespace operations over a [`ClusterGateway`]
#[derive(Clone)]
pub struct NamespaceService {
    gateway: Arc<dyn ClusterGateway>,
    call_timeout: Duration,
}

impl NamespaceService {
    pub fn new(gateway: Arc<dyn ClusterGateway>) -> Self {
        Self {
            gateway,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Bound every gateway call by `timeout`
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Lists every namespace together with its pods.
    ///
    /// All-or-nothing: namespaces are resolved one after another and the first
    /// failing pod listing aborts the whole operation. Namespaces resolved
    /// before the failure are discarded, never returned as a partial result.
    pub async fn list_all(&self) -> Result<Vec<Namespace>, NamespaceError> {
        let names = self
            .bounded("list_namespaces", self.gateway.list_namespaces())
            .await?
            .map_err(NamespaceError::Internal)?;

        let mut namespaces = Vec::with_capacity(names.len());
        for name in names {
            // A namespace vanishing between the two calls is still a failure
            // of the listing as a whole, not a 404.
            let pods = self
                .bounded("list_pods", self.gateway.list_pods(&name))
                .await?
                .map_err(NamespaceError::Internal)?;
            namespaces.push(Namespace::from_phases(name, pods));
        }

        debug!(count = namespaces.len(), "Listed namespaces");
        Ok(namespaces)
    }

    /// Looks up one namespace and its pods
    pub async fn get(&self, name: &str) -> Result<NamespaceLookup, NamespaceError> {
        let pods = self
            .bounded("list_pods", self.gateway.list_pods(name))
            .await??;

        if pods.is_empty() {
            Ok(NamespaceLookup::Empty(name.to_string()))
        } else {
            Ok(NamespaceLookup::Populated(Namespace::from_phases(name, pods)))
        }
    }

    /// Creates a namespace after checking its name.
    ///
    /// An invalid name is rejected before the gateway is called.
    pub async fn create(&self, name: &str) -> Result<Namespace, NamespaceError> {
        validate_name(name)?;

        self.bounded("create_namespace", self.gateway.create_namespace(name))
            .await??;

        Ok(Namespace::empty(name))
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<Result<T, GatewayError>, NamespaceError> {
        tokio::time::timeout(self.call_timeout, call)
            .await
            .map_err(|_| NamespaceError::Timeout {
                operation,
                timeout: self.call_timeout,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryGateway;

    fn setup(gateway: InMemoryGateway) -> (NamespaceService, Arc<InMemoryGateway>) {
        let gateway = Arc::new(gateway);
        (NamespaceService::new(gateway.clone()), gateway)
    }

    #[tokio::test]
    async fn test_list_all_assembles_pods() {
        let (service, _) = setup(
            InMemoryGateway::new()
                .with_pod("default", "nginx", "Running")
                .with_namespace("kube-system"),
        );

        let namespaces = service.list_all().await.unwrap();

        assert_eq!(
            namespaces,
            vec![
                Namespace {
                    name: "default".to_string(),
                    pods: vec![Pod {
                        name: "nginx".to_string(),
                        status: "Running".to_string(),
                    }],
                },
                Namespace::empty("kube-system"),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_all_stops_at_first_failure() {
        let (service, gateway) = setup(
            InMemoryGateway::new()
                .with_namespace("a")
                .with_namespace("b")
                .with_namespace("c")
                .failing_list_pods("b", "connection reset"),
        );

        let err = service.list_all().await.unwrap_err();

        assert!(matches!(err, NamespaceError::Internal(_)));
        // "c" is never looked at
        assert_eq!(gateway.calls().list_pods, 2);
    }

    #[tokio::test]
    async fn test_list_all_failing_namespace_listing() {
        let (service, gateway) =
            setup(InMemoryGateway::with_defaults().failing_list_namespaces("unauthorized"));

        assert!(matches!(
            service.list_all().await,
            Err(NamespaceError::Internal(_))
        ));
        assert_eq!(gateway.calls().list_pods, 0);
    }

    #[tokio::test]
    async fn test_get_distinguishes_empty_and_populated() {
        let (service, _) = setup(
            InMemoryGateway::new()
                .with_pod("default", "nginx", "Running")
                .with_namespace("kube-system"),
        );

        assert!(matches!(
            service.get("default").await.unwrap(),
            NamespaceLookup::Populated(ns) if ns.pods.len() == 1
        ));
        assert_eq!(
            service.get("kube-system").await.unwrap(),
            NamespaceLookup::Empty("kube-system".to_string())
        );
    }

    #[tokio::test]
    async fn test_get_missing_namespace() {
        let (service, _) = setup(InMemoryGateway::new());
        assert!(matches!(
            service.get("ghost").await,
            Err(NamespaceError::NotFound(name)) if name == "ghost"
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_name_without_calling_gateway() {
        let (service, gateway) = setup(InMemoryGateway::new());

        let too_long = "a".repeat(254);
        for name in ["My_NS", "", "-x", "x-", too_long.as_str()] {
            assert!(matches!(
                service.create(name).await,
                Err(NamespaceError::Validation(_))
            ));
        }
        assert_eq!(gateway.calls().create_namespace, 0);
    }

    #[tokio::test]
    async fn test_create_maps_conflict_and_internal() {
        let (service, _) = setup(InMemoryGateway::with_defaults());
        assert!(matches!(
            service.create("default").await,
            Err(NamespaceError::Conflict(name)) if name == "default"
        ));
        assert_eq!(
            service.create("team-a").await.unwrap(),
            Namespace::empty("team-a")
        );

        let (service, _) = setup(InMemoryGateway::new().failing_create("etcd unavailable"));
        assert!(matches!(
            service.create("team-b").await,
            Err(NamespaceError::Internal(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_gateway_times_out() {
        let gateway = Arc::new(
            InMemoryGateway::with_defaults().with_latency(Duration::from_secs(60)),
        );
        let service =
            NamespaceService::new(gateway).with_call_timeout(Duration::from_secs(5));

        assert!(matches!(
            service.get("default").await,
            Err(NamespaceError::Timeout {
                operation: "list_pods",
                ..
            })
        ));
    }
}
