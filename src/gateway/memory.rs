//! In-process [`ClusterGateway`].
//!
//! Keeps namespaces and pods in memory, counts every call and can be told to
//! fail or stall specific operations. Used as the test double and for running
//! the gateway locally without a cluster (`--in-memory`).

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{ClusterGateway, GatewayError, PodPhases};

/// Snapshot of how many times each gateway operation was invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayCalls {
    pub list_namespaces: usize,
    pub list_pods: usize,
    pub create_namespace: usize,
}

/// Gateway holding its namespaces in memory.
///
/// Namespaces are listed in insertion order.
#[derive(Default)]
pub struct InMemoryGateway {
    namespaces: RwLock<Vec<(String, PodPhases)>>,

    list_namespaces_calls: AtomicUsize,
    list_pods_calls: AtomicUsize,
    create_namespace_calls: AtomicUsize,

    // Injected faults
    list_namespaces_fault: Option<String>,
    list_pods_faults: HashMap<String, String>,
    create_fault: Option<String>,
    latency: Option<Duration>,
    panic_on_list: bool,
}

impl InMemoryGateway {
    /// Create an empty gateway
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway pre-populated with the namespaces every fresh cluster has
    pub fn with_defaults() -> Self {
        Self::new()
            .with_namespace("default")
            .with_namespace("kube-node-lease")
            .with_namespace("kube-public")
            .with_namespace("kube-system")
    }

    /// Add an empty namespace
    pub fn with_namespace(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let namespaces = self.namespaces.get_mut();
        if !namespaces.iter().any(|(n, _)| *n == name) {
            namespaces.push((name, PodPhases::new()));
        }
        self
    }

    /// Add a pod, creating its namespace if needed
    pub fn with_pod(
        mut self,
        namespace: impl Into<String>,
        pod: impl Into<String>,
        phase: impl Into<String>,
    ) -> Self {
        let namespace = namespace.into();
        self = self.with_namespace(namespace.clone());
        if let Some((_, pods)) = self
            .namespaces
            .get_mut()
            .iter_mut()
            .find(|(n, _)| *n == namespace)
        {
            pods.insert(pod.into(), phase.into());
        }
        self
    }

    /// Make `list_namespaces` fail
    pub fn failing_list_namespaces(mut self, message: impl Into<String>) -> Self {
        self.list_namespaces_fault = Some(message.into());
        self
    }

    /// Make `list_pods` fail for one namespace
    pub fn failing_list_pods(
        mut self,
        namespace: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.list_pods_faults.insert(namespace.into(), message.into());
        self
    }

    /// Make `create_namespace` fail with an opaque error
    pub fn failing_create(mut self, message: impl Into<String>) -> Self {
        self.create_fault = Some(message.into());
        self
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Panic inside `list_namespaces`
    pub fn panicking(mut self) -> Self {
        self.panic_on_list = true;
        self
    }

    /// Number of invocations per operation so far
    pub fn calls(&self) -> GatewayCalls {
        GatewayCalls {
            list_namespaces: self.list_namespaces_calls.load(Ordering::SeqCst),
            list_pods: self.list_pods_calls.load(Ordering::SeqCst),
            create_namespace: self.create_namespace_calls.load(Ordering::SeqCst),
        }
    }

    async fn stall(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl ClusterGateway for InMemoryGateway {
    async fn list_namespaces(&self) -> Result<Vec<String>, GatewayError> {
        self.list_namespaces_calls.fetch_add(1, Ordering::SeqCst);
        self.stall().await;

        if self.panic_on_list {
            panic!("in-memory gateway asked to panic");
        }
        if let Some(message) = &self.list_namespaces_fault {
            return Err(GatewayError::Other(message.clone()));
        }

        let namespaces = self.namespaces.read().await;
        Ok(namespaces.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn list_pods(&self, namespace: &str) -> Result<PodPhases, GatewayError> {
        self.list_pods_calls.fetch_add(1, Ordering::SeqCst);
        self.stall().await;

        if let Some(message) = self.list_pods_faults.get(namespace) {
            return Err(GatewayError::Other(message.clone()));
        }

        let namespaces = self.namespaces.read().await;
        namespaces
            .iter()
            .find(|(name, _)| name == namespace)
            .map(|(_, pods)| pods.clone())
            .ok_or_else(|| GatewayError::NotFound(namespace.to_string()))
    }

    async fn create_namespace(&self, name: &str) -> Result<(), GatewayError> {
        self.create_namespace_calls.fetch_add(1, Ordering::SeqCst);
        self.stall().await;

        if let Some(message) = &self.create_fault {
            return Err(GatewayError::Other(message.clone()));
        }

        let mut namespaces = self.namespaces.write().await;
        if namespaces.iter().any(|(n, _)| n == name) {
            return Err(GatewayError::AlreadyExists(name.to_string()));
        }
        namespaces.push((name.to_string(), PodPhases::new()));
        debug!("Created in-memory namespace {}", name);
        Ok(())
    }
}
