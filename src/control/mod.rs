//! Control plane collaborator
//!
//! hpcgame never schedules anything itself. It builds manifests and hands
//! them to a `ControlPlane`, which in production shells out to `kubectl`
//! with the user's kubeconfig. Every call is a single, independent request.

mod kubectl;
mod memory;

pub use kubectl::Kubectl;
pub use memory::InMemoryControlPlane;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::manifest::Manifest;
use crate::volume::VolumeClaim;

#[derive(Error, Debug)]
pub enum ControlPlaneError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{detail}")]
    Rejected { detail: String },

    #[error("cannot run control plane client: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected control plane response: {0}")]
    Malformed(String),
}

pub type ControlResult<T> = std::result::Result<T, ControlPlaneError>;

/// A workload as observed in the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadStatus {
    pub name: String,
    pub image: String,
    pub phase: String,
    pub created: Option<DateTime<Utc>>,
    pub node: Option<String>,
}

/// Create/query/delete operations against the cluster, addressed by name
pub trait ControlPlane {
    fn claim_exists(&self, name: &str) -> ControlResult<bool>;

    /// Submit a workload or claim manifest
    fn apply(&self, manifest: &Manifest) -> ControlResult<()>;

    /// Claims in the current namespace; `is_default` is left unset
    fn list_claims(&self) -> ControlResult<Vec<VolumeClaim>>;

    fn delete_claim(&self, name: &str) -> ControlResult<()>;

    fn list_workloads(&self) -> ControlResult<Vec<WorkloadStatus>>;

    fn delete_workload(&self, name: &str) -> ControlResult<()>;
}
