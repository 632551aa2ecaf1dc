//! Workload provisioning
//!
//! The end-to-end flow: resolve the partition from the catalog, validate the
//! request against it, make sure the default volume exists, synthesize the
//! manifest and submit it. Steps already committed are never rolled back; a
//! failed default-volume creation is reported but does not stop submission.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::CatalogCache;
use crate::control::{ControlPlane, ControlPlaneError, WorkloadStatus};
use crate::error::{HpcError, Result};
use crate::manifest::{synthesize, Manifest, ResourceSpec, WorkloadRequest};
use crate::volume::{default_claim_name, DefaultClaim, VolumeManager};

/// What happened to the partition default volume during provisioning
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DefaultClaimStatus {
    Existing { name: String },
    Created { name: String },
    Failed { name: String, error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    pub request: WorkloadRequest,
    pub default_claim: DefaultClaimStatus,
    /// Extra volumes that could not be confirmed to exist
    pub missing_volumes: Vec<String>,
}

/// Validate a request and build its manifest without touching the cluster
pub fn plan(catalog: &mut CatalogCache, partition: &str, spec: ResourceSpec) -> Result<(WorkloadRequest, Manifest)> {
    let partition = catalog.load()?.require(partition)?;
    let request = WorkloadRequest::validate(partition, spec)?;
    let manifest = synthesize(&request, &default_claim_name(&request.partition.name));
    Ok((request, manifest))
}

pub struct Provisioner<'a> {
    catalog: &'a mut CatalogCache,
    control: &'a dyn ControlPlane,
}

impl<'a> Provisioner<'a> {
    pub fn new(catalog: &'a mut CatalogCache, control: &'a dyn ControlPlane) -> Self {
        Self { catalog, control }
    }

    pub fn provision(&mut self, partition: &str, spec: ResourceSpec) -> Result<ProvisionReport> {
        let (request, manifest) = plan(self.catalog, partition, spec)?;
        let volumes = VolumeManager::new(self.control);

        let default_claim = match volumes.ensure_default_claim(&request.partition.name) {
            Ok(DefaultClaim::Existing(name)) => DefaultClaimStatus::Existing { name },
            Ok(DefaultClaim::Created(name)) => DefaultClaimStatus::Created { name },
            Err(e) => {
                warn!(error = %e, "unable to create default volume, continuing");
                DefaultClaimStatus::Failed {
                    name: default_claim_name(&request.partition.name),
                    error: e.to_string(),
                }
            }
        };

        let mut missing_volumes = Vec::new();
        for volume in &request.volumes {
            match volumes.claim_exists(volume) {
                Ok(true) => {}
                Ok(false) => {
                    warn!(volume = %volume, "volume may not exist");
                    missing_volumes.push(volume.clone());
                }
                Err(e) => {
                    warn!(volume = %volume, error = %e, "cannot check volume");
                    missing_volumes.push(volume.clone());
                }
            }
        }

        debug!(workload = %request.name, "submitting workload");
        self.control
            .apply(&manifest)
            .map_err(|e| HpcError::ProvisioningFailed {
                name: request.name.clone(),
                detail: e.to_string(),
            })?;
        info!(workload = %request.name, partition = %request.partition.name, "workload submitted");

        Ok(ProvisionReport {
            request,
            default_claim,
            missing_volumes,
        })
    }
}

pub fn list_workloads(control: &dyn ControlPlane) -> Result<Vec<WorkloadStatus>> {
    control.list_workloads().map_err(|e| HpcError::ProvisioningFailed {
        name: "workload list".to_string(),
        detail: e.to_string(),
    })
}

pub fn delete_workload(control: &dyn ControlPlane, name: &str) -> Result<()> {
    match control.delete_workload(name) {
        Ok(()) => {
            info!(workload = %name, "workload deleted");
            Ok(())
        }
        Err(ControlPlaneError::NotFound(_)) => Err(HpcError::NotFound(format!("container '{}'", name))),
        Err(e) => Err(HpcError::DeletionFailed {
            name: name.to_string(),
            detail: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogSource, MemoryCatalogStore};
    use crate::control::InMemoryControlPlane;

    const CATALOG: &str = r#"[
        {"Name": "x86", "Description": "CPU nodes", "CPULimit": 16, "MemoryLimit": 64,
         "Images": ["ubuntu:22.04"]},
        {"Name": "gpu_a100", "Description": "GPU nodes", "GPUTag": "nvidia.com/gpu",
         "GPUName": "A100", "CPULimit": 32, "MemoryLimit": 256, "Images": ["pytorch/pytorch"]}
    ]"#;

    struct Offline;

    impl CatalogSource for Offline {
        fn fetch(&self) -> Result<Vec<u8>> {
            Err(HpcError::FetchFailed("offline".to_string()))
        }
    }

    fn catalog() -> CatalogCache {
        CatalogCache::new(Offline, MemoryCatalogStore::with_contents(CATALOG, Some(chrono::Utc::now().timestamp())))
    }

    fn spec(cpu: u32) -> ResourceSpec {
        ResourceSpec {
            name: Some("job-1".to_string()),
            cpu,
            ..ResourceSpec::default()
        }
    }

    #[test]
    fn test_plan_uses_partition_defaults() {
        let mut cache = catalog();
        let (request, manifest) = plan(&mut cache, "x86", spec(4)).unwrap();
        assert_eq!(request.memory, 8);
        assert_eq!(request.image, "ubuntu:22.04");
        assert_eq!(manifest.name(), "job-1");
    }

    #[test]
    fn test_plan_unknown_partition() {
        let mut cache = catalog();
        assert!(matches!(plan(&mut cache, "riscv", spec(1)), Err(HpcError::NotFound(_))));
    }

    #[test]
    fn test_plan_without_catalog() {
        let mut cache = CatalogCache::new(Offline, MemoryCatalogStore::new());
        assert!(matches!(plan(&mut cache, "x86", spec(1)), Err(HpcError::CatalogUnavailable(_))));
    }

    #[test]
    fn test_provision_creates_default_claim_then_workload() {
        let mut cache = catalog();
        let control = InMemoryControlPlane::new();
        let report = Provisioner::new(&mut cache, &control)
            .provision("gpu_a100", ResourceSpec { gpu: 1, ..spec(2) })
            .unwrap();

        assert_eq!(
            report.default_claim,
            DefaultClaimStatus::Created {
                name: "gpu-a100-default-pvc".to_string()
            }
        );
        let kinds: Vec<&str> = control.applied().iter().map(|m| m.kind()).collect();
        assert_eq!(kinds, vec!["PersistentVolumeClaim", "Pod"]);
        assert!(control.has_workload("job-1"));
    }

    #[test]
    fn test_provision_twice_creates_default_claim_once() {
        let mut cache = catalog();
        let control = InMemoryControlPlane::new();
        let mut provisioner = Provisioner::new(&mut cache, &control);
        provisioner.provision("x86", spec(1)).unwrap();
        let second = provisioner
            .provision("x86", ResourceSpec { name: Some("job-2".to_string()), ..spec(1) })
            .unwrap();

        assert!(matches!(second.default_claim, DefaultClaimStatus::Existing { .. }));
        let claims = control
            .applied()
            .iter()
            .filter(|m| m.kind() == "PersistentVolumeClaim")
            .count();
        assert_eq!(claims, 1);
    }

    #[test]
    fn test_provision_reports_missing_volumes() {
        let mut cache = catalog();
        let control = InMemoryControlPlane::new().with_claim("datasets", "1Ti", "nfs");
        let report = Provisioner::new(&mut cache, &control)
            .provision("x86", ResourceSpec {
                volumes: vec!["datasets".to_string(), "scratch".to_string()],
                ..spec(1)
            })
            .unwrap();
        assert_eq!(report.missing_volumes, vec!["scratch".to_string()]);
        assert!(control.has_workload("job-1"));
    }

    #[test]
    fn test_provision_validation_failure_touches_nothing() {
        let mut cache = catalog();
        let control = InMemoryControlPlane::new();
        let result = Provisioner::new(&mut cache, &control).provision("x86", spec(17));
        assert!(matches!(result, Err(HpcError::ValidationFailed(_))));
        assert_eq!(control.call_count(), 0);
    }

    #[test]
    fn test_provision_continues_when_default_claim_fails() {
        let mut cache = catalog();
        let control = InMemoryControlPlane::new();
        control.reject_applies_of("PersistentVolumeClaim", "storageclass not allowed");
        let report = Provisioner::new(&mut cache, &control)
            .provision("x86", spec(1))
            .unwrap();

        match &report.default_claim {
            DefaultClaimStatus::Failed { name, error } => {
                assert_eq!(name, "x86-default-pvc");
                assert!(error.contains("storageclass not allowed"));
            }
            other => panic!("unexpected default claim status {:?}", other),
        }
        assert!(control.has_workload("job-1"));
        assert!(!control.has_claim("x86-default-pvc"));
    }

    #[test]
    fn test_provision_submission_rejected() {
        let mut cache = catalog();
        let control = InMemoryControlPlane::new();
        control.reject_applies("exceeded quota: cpu");
        let err = Provisioner::new(&mut cache, &control)
            .provision("x86", spec(1))
            .unwrap_err();
        match err {
            HpcError::ProvisioningFailed { name, detail } => {
                assert_eq!(name, "job-1");
                assert!(detail.contains("exceeded quota"));
            }
            other => panic!("unexpected error {}", other),
        }
    }

    #[test]
    fn test_delete_workload() {
        let mut cache = catalog();
        let control = InMemoryControlPlane::new();
        Provisioner::new(&mut cache, &control).provision("x86", spec(1)).unwrap();

        assert_eq!(list_workloads(&control).unwrap().len(), 1);
        delete_workload(&control, "job-1").unwrap();
        assert!(matches!(delete_workload(&control, "job-1"), Err(HpcError::NotFound(_))));
    }
}
