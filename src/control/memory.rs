//! In-memory control plane
//!
//! Keeps claims and workloads in maps and records every call, so callers can
//! assert on what reached the cluster (and how often).

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{ControlPlane, ControlPlaneError, ControlResult, WorkloadStatus};
use crate::manifest::Manifest;
use crate::volume::VolumeClaim;

#[derive(Debug, Clone, Default)]
pub struct InMemoryControlPlane {
    inner: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    claims: BTreeMap<String, VolumeClaim>,
    workloads: BTreeMap<String, WorkloadStatus>,
    applied: Vec<Manifest>,
    calls: usize,
    reject_applies: Option<String>,
    /// Manifest kind the rejection is limited to; `None` rejects every kind
    reject_kind: Option<&'static str>,
}

impl InMemoryControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing claim
    pub fn with_claim(self, name: &str, size: &str, storage_class: &str) -> Self {
        self.state().claims.insert(
            name.to_string(),
            VolumeClaim {
                name: name.to_string(),
                size: size.to_string(),
                storage_class: storage_class.to_string(),
                access_modes: vec!["ReadWriteMany".to_string()],
                phase: "Bound".to_string(),
                is_default: false,
            },
        );
        self
    }

    /// Make every subsequent `apply` fail with `detail`
    pub fn reject_applies(&self, detail: &str) {
        let mut state = self.state();
        state.reject_applies = Some(detail.to_string());
        state.reject_kind = None;
    }

    /// Make subsequent applies of one manifest kind (e.g. `"PersistentVolumeClaim"`) fail
    pub fn reject_applies_of(&self, kind: &'static str, detail: &str) {
        let mut state = self.state();
        state.reject_applies = Some(detail.to_string());
        state.reject_kind = Some(kind);
    }

    /// Number of calls made through the `ControlPlane` trait
    pub fn call_count(&self) -> usize {
        self.state().calls
    }

    /// Manifests successfully applied, in order
    pub fn applied(&self) -> Vec<Manifest> {
        self.state().applied.clone()
    }

    pub fn has_claim(&self, name: &str) -> bool {
        self.state().claims.contains_key(name)
    }

    pub fn has_workload(&self, name: &str) -> bool {
        self.state().workloads.contains_key(name)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn call(&self) -> MutexGuard<'_, State> {
        let mut state = self.state();
        state.calls += 1;
        state
    }
}

impl ControlPlane for InMemoryControlPlane {
    fn claim_exists(&self, name: &str) -> ControlResult<bool> {
        Ok(self.call().claims.contains_key(name))
    }

    fn apply(&self, manifest: &Manifest) -> ControlResult<()> {
        let mut state = self.call();
        let kind_matches = state.reject_kind.map_or(true, |kind| kind == manifest.kind());
        if let (Some(detail), true) = (&state.reject_applies, kind_matches) {
            return Err(ControlPlaneError::Rejected {
                detail: detail.clone(),
            });
        }

        match manifest {
            Manifest::Pod(pod) => {
                let image = pod
                    .spec
                    .containers
                    .first()
                    .map(|c| c.image.clone())
                    .unwrap_or_default();
                state.workloads.insert(
                    pod.metadata.name.clone(),
                    WorkloadStatus {
                        name: pod.metadata.name.clone(),
                        image,
                        phase: "Pending".to_string(),
                        created: Some(chrono::Utc::now()),
                        node: None,
                    },
                );
            }
            Manifest::PersistentVolumeClaim(pvc) => {
                state.claims.insert(
                    pvc.metadata.name.clone(),
                    VolumeClaim {
                        name: pvc.metadata.name.clone(),
                        size: pvc.spec.resources.requests.storage.clone(),
                        storage_class: pvc.spec.storage_class_name.clone(),
                        access_modes: pvc.spec.access_modes.iter().map(|m| m.to_string()).collect(),
                        phase: "Pending".to_string(),
                        is_default: false,
                    },
                );
            }
        }
        state.applied.push(manifest.clone());
        Ok(())
    }

    fn list_claims(&self) -> ControlResult<Vec<VolumeClaim>> {
        Ok(self.call().claims.values().cloned().collect())
    }

    fn delete_claim(&self, name: &str) -> ControlResult<()> {
        self.call()
            .claims
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ControlPlaneError::NotFound(format!("persistentvolumeclaim \"{}\"", name)))
    }

    fn list_workloads(&self) -> ControlResult<Vec<WorkloadStatus>> {
        Ok(self.call().workloads.values().cloned().collect())
    }

    fn delete_workload(&self, name: &str) -> ControlResult<()> {
        self.call()
            .workloads
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ControlPlaneError::NotFound(format!("pod \"{}\"", name)))
    }
}
