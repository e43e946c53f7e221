//! Cluster gateway: the narrow slice of the Kubernetes API the service needs.
//!
//! Handlers never talk to the cluster directly. They go through
//! [`ClusterGateway`], which has a production implementation over `kube`
//! ([`KubeGateway`]) and an in-process one ([`InMemoryGateway`]) used by tests
//! and by `--in-memory` local runs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

pub mod kube_client;
pub mod memory;

pub use kube_client::KubeGateway;
pub use memory::{GatewayCalls, InMemoryGateway};

/// Pod name to pod phase, as reported by the cluster.
pub type PodPhases = BTreeMap<String, String>;

/// Errors reported by a [`ClusterGateway`].
///
/// `NotFound` and `AlreadyExists` are the two conditions callers are expected
/// to branch on. Everything else is opaque to the HTTP layer.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("namespace '{0}' not found")]
    NotFound(String),

    #[error("namespace '{0}' already exists")]
    AlreadyExists(String),

    #[error("failed to connect to the cluster API: {0}")]
    Connection(String),

    #[error("cluster API request failed: {0}")]
    Api(#[from] kube::Error),

    #[error("cluster API request failed: {0}")]
    Other(String),
}

/// Read/create operations against the cluster.
///
/// Every call is one-shot: implementations do no retries and hold no
/// per-request state.
#[async_trait]
pub trait ClusterGateway: Send + Sync {
    /// Lists the names of all namespaces. No pagination.
    async fn list_namespaces(&self) -> Result<Vec<String>, GatewayError>;

    /// Lists pods in `namespace` with their phase.
    ///
    /// Returns [`GatewayError::NotFound`] if the namespace does not exist.
    async fn list_pods(&self, namespace: &str) -> Result<PodPhases, GatewayError>;

    /// Creates a namespace.
    ///
    /// Returns [`GatewayError::AlreadyExists`] if it is already present.
    async fn create_namespace(&self, name: &str) -> Result<(), GatewayError>;
}
