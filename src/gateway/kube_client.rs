//! [`ClusterGateway`] backed by the Kubernetes API.

use std::path::PathBuf;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Pod};
use kube::api::{Api, ListParams, ObjectMeta, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use super::{ClusterGateway, GatewayError, PodPhases};

/// Phase reported for pods whose status carries no phase yet.
const UNKNOWN_PHASE: &str = "Unknown";

/// Gateway talking to a real cluster through `kube`.
///
/// Config discovery and client construction happen on the first call and the
/// resulting client is reused for the lifetime of the process. A failed
/// attempt is not cached, so the next request tries again.
pub struct KubeGateway {
    kubeconfig: Option<PathBuf>,
    client: OnceCell<Client>,
}

impl KubeGateway {
    /// Gateway using `kube`'s standard discovery (in-cluster service account,
    /// then `$KUBECONFIG` / `~/.kube/config`).
    pub fn infer() -> Self {
        Self {
            kubeconfig: None,
            client: OnceCell::new(),
        }
    }

    /// Gateway reading credentials from an explicit kubeconfig file.
    pub fn from_kubeconfig(path: impl Into<PathBuf>) -> Self {
        Self {
            kubeconfig: Some(path.into()),
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> Result<Client, GatewayError> {
        self.client
            .get_or_try_init(|| self.connect())
            .await
            .cloned()
    }

    async fn connect(&self) -> Result<Client, GatewayError> {
        let config = match &self.kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                    GatewayError::Connection(format!(
                        "failed to read kubeconfig {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .map_err(|e| GatewayError::Connection(e.to_string()))?
            }
            None => Config::infer()
                .await
                .map_err(|e| GatewayError::Connection(e.to_string()))?,
        };

        let client =
            Client::try_from(config).map_err(|e| GatewayError::Connection(e.to_string()))?;
        info!("Connected to cluster API");
        Ok(client)
    }
}

/// Maps a `kube` error onto the gateway taxonomy for the namespace `name`.
fn classify(err: kube::Error, name: &str) -> GatewayError {
    if let kube::Error::Api(response) = &err {
        if response.code == 404 {
            return GatewayError::NotFound(name.to_string());
        }
        if response.code == 409 || response.reason == "AlreadyExists" {
            return GatewayError::AlreadyExists(name.to_string());
        }
    }
    GatewayError::Api(err)
}

#[async_trait]
impl ClusterGateway for KubeGateway {
    #[instrument(skip(self))]
    async fn list_namespaces(&self) -> Result<Vec<String>, GatewayError> {
        let namespaces: Api<Namespace> = Api::all(self.client().await?);
        let list = namespaces.list(&ListParams::default()).await?;

        Ok(list
            .items
            .into_iter()
            .filter_map(|ns| ns.metadata.name)
            .collect())
    }

    #[instrument(skip(self))]
    async fn list_pods(&self, namespace: &str) -> Result<PodPhases, GatewayError> {
        let client = self.client().await?;

        // A pod list in a missing namespace is just empty, so check it exists
        let namespaces: Api<Namespace> = Api::all(client.clone());
        namespaces
            .get(namespace)
            .await
            .map_err(|e| classify(e, namespace))?;

        let pods: Api<Pod> = Api::namespaced(client, namespace);
        let list = pods
            .list(&ListParams::default())
            .await
            .map_err(|e| classify(e, namespace))?;

        let phases: PodPhases = list
            .items
            .into_iter()
            .filter_map(|pod| {
                let name = pod.metadata.name?;
                let phase = pod
                    .status
                    .and_then(|s| s.phase)
                    .unwrap_or_else(|| UNKNOWN_PHASE.to_string());
                Some((name, phase))
            })
            .collect();

        debug!(pods = phases.len(), "Listed pods");
        Ok(phases)
    }

    #[instrument(skip(self))]
    async fn create_namespace(&self, name: &str) -> Result<(), GatewayError> {
        let namespaces: Api<Namespace> = Api::all(self.client().await?);

        let ns = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        namespaces
            .create(&PostParams::default(), &ns)
            .await
            .map_err(|e| classify(e, name))?;

        info!("Created namespace {}", name);
        Ok(())
    }
}
