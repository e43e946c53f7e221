//! Response shapes for namespaces and pods.

use serde::{Deserialize, Serialize};

use crate::gateway::PodPhases;

/// A pod and its phase, verbatim from the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pod {
    pub name: String,
    pub status: String,
}

/// A namespace with the pods running in it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub name: String,
    pub pods: Vec<Pod>,
}

impl Namespace {
    /// Namespace without pods
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pods: Vec::new(),
        }
    }

    /// Assemble a namespace from the gateway's pod listing
    pub fn from_phases(name: impl Into<String>, phases: PodPhases) -> Self {
        Self {
            name: name.into(),
            pods: phases
                .into_iter()
                .map(|(name, status)| Pod { name, status })
                .collect(),
        }
    }
}

/// Result of looking up a single namespace.
///
/// An existing namespace without pods is reported separately so the HTTP
/// layer can attach a notice instead of a bare empty list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceLookup {
    Populated(Namespace),
    Empty(String),
}
