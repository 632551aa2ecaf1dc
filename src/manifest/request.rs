//! Workload request validation
//!
//! A `ResourceSpec` is what the user asked for; a `WorkloadRequest` is the
//! same thing checked against a partition's limits with every default filled
//! in. Synthesis only ever sees the latter.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::Partition;
use crate::error::{HpcError, Result};
use crate::volume::{default_claim_name, validate_object_name};

/// CPU cores used when the caller does not say
pub const DEFAULT_CPU: u32 = 1;

/// Default memory, in GiB per requested core
pub const MEMORY_GIB_PER_CPU: u32 = 2;

/// Raw, unvalidated resource request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSpec {
    pub name: Option<String>,
    pub cpu: u32,
    /// GiB; `None` means `cpu * 2`
    pub memory: Option<u32>,
    pub gpu: u32,
    pub image: Option<String>,
    /// Extra claim names to mount
    pub volumes: Vec<String>,
}

impl Default for ResourceSpec {
    fn default() -> Self {
        Self {
            name: None,
            cpu: DEFAULT_CPU,
            memory: None,
            gpu: 0,
            image: None,
            volumes: Vec::new(),
        }
    }
}

/// A request that fits its partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkloadRequest {
    pub partition: Partition,
    pub name: String,
    pub cpu: u32,
    /// GiB
    pub memory: u32,
    pub gpu: u32,
    pub image: String,
    pub volumes: Vec<String>,
}

impl WorkloadRequest {
    pub fn validate(partition: &Partition, spec: ResourceSpec) -> Result<Self> {
        let cpu = spec.cpu;
        if cpu == 0 || cpu > partition.cpu_limit {
            return Err(HpcError::ValidationFailed(format!(
                "invalid CPU value: {}, partition '{}' allows 1-{}",
                cpu, partition.name, partition.cpu_limit
            )));
        }

        let memory = match spec.memory {
            Some(memory) => memory,
            None => {
                let memory = cpu.saturating_mul(MEMORY_GIB_PER_CPU);
                info!(memory, "memory not specified, using {} GiB per CPU", MEMORY_GIB_PER_CPU);
                memory
            }
        };
        if memory == 0 || memory > partition.memory_limit {
            return Err(HpcError::ValidationFailed(format!(
                "invalid memory value: {}GiB, partition '{}' allows 1-{}GiB",
                memory, partition.name, partition.memory_limit
            )));
        }

        if spec.gpu > 0 && partition.gpu.is_none() {
            return Err(HpcError::ValidationFailed(format!(
                "partition '{}' has no GPUs, but {} were requested",
                partition.name, spec.gpu
            )));
        }

        let image = match spec.image.map(|i| i.trim().to_string()).filter(|i| !i.is_empty()) {
            Some(image) => image,
            None => partition.default_image().map(str::to_string).ok_or_else(|| {
                HpcError::ValidationFailed(format!(
                    "partition '{}' has no default image, please specify one",
                    partition.name
                ))
            })?,
        };

        let name = spec
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("container-{}", std::process::id()));
        validate_object_name("container", &name)?;

        let volumes = normalize_volumes(&partition.name, spec.volumes)?;

        Ok(Self {
            partition: partition.clone(),
            name,
            cpu,
            memory,
            gpu: spec.gpu,
            image,
            volumes,
        })
    }
}

/// Trim, drop empties and duplicates, and skip the partition's own default
/// claim, which is always mounted anyway
fn normalize_volumes(partition: &str, volumes: Vec<String>) -> Result<Vec<String>> {
    let own_default = default_claim_name(partition);
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for volume in volumes {
        let volume = volume.trim().to_string();
        if volume.is_empty() {
            continue;
        }
        if volume == own_default {
            warn!(volume = %volume, "default volume is always mounted, ignoring it as an extra volume");
            continue;
        }
        if !seen.insert(volume.clone()) {
            warn!(volume = %volume, "volume listed more than once");
            continue;
        }
        validate_object_name("volume", &volume)?;
        out.push(volume);
    }
    Ok(out)
}

/// Split a comma-separated volume list
pub fn split_volume_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}
