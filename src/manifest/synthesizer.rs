//! Workload manifest synthesis

use std::collections::BTreeMap;

use super::request::WorkloadRequest;
use super::types::{
    Capabilities, ClaimSource, Container, Manifest, ObjectMeta, Pod, PodSpec, Quantity,
    ResourceRequirements, SecurityContext, Volume, VolumeMount, API_VERSION,
};

/// Node label that pins a workload to its partition
pub const PARTITION_LABEL: &str = "hpc.lcpu.dev/partition";

/// Mount point (and working directory) of the partition default volume
pub const DEFAULT_MOUNT_PATH: &str = "/partition-data";

/// Manifest-local identifier of the default volume
pub const DEFAULT_VOLUME_ID: &str = "default-data-volume";

/// Extra volumes are mounted at `<root>/<volume name>`
pub const EXTRA_MOUNT_ROOT: &str = "/mnt";

const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
const CONTAINER_NAME: &str = "container";
const COMMAND: [&str; 2] = ["sleep", "infinity"];
const CAPABILITIES: [&str; 2] = ["SYS_PTRACE", "IPC_LOCK"];
const RESTART_POLICY: &str = "Never";

/// Build the workload manifest for a validated request
///
/// Pure: no I/O, and total for any request that passed validation.
/// Requests equal limits for every resource. A GPU entry is emitted only
/// for a non-zero GPU count. The default claim is always mounted at
/// [`DEFAULT_MOUNT_PATH`], which is also the working directory; extra claims
/// get sequential identifiers so arbitrary claim names never clash.
pub fn synthesize(request: &WorkloadRequest, default_claim: &str) -> Manifest {
    let mut resources = BTreeMap::new();
    resources.insert("cpu".to_string(), Quantity::millicores(request.cpu));
    resources.insert("memory".to_string(), Quantity::gibibytes(request.memory));
    if request.gpu > 0 {
        if let Some(tag) = request.partition.gpu_tag() {
            resources.insert(tag.to_string(), Quantity::Count(u64::from(request.gpu)));
        }
    }

    let mut volume_mounts = vec![VolumeMount {
        name: DEFAULT_VOLUME_ID.to_string(),
        mount_path: DEFAULT_MOUNT_PATH.to_string(),
    }];
    let mut volumes = vec![claim_volume(DEFAULT_VOLUME_ID, default_claim)];

    for (i, claim) in request.volumes.iter().enumerate() {
        let id = format!("extra-volume-{}", i);
        volume_mounts.push(VolumeMount {
            name: id.clone(),
            mount_path: format!("{}/{}", EXTRA_MOUNT_ROOT, claim),
        });
        volumes.push(claim_volume(&id, claim));
    }

    let partition = request.partition.name.clone();

    let mut labels = BTreeMap::new();
    labels.insert(MANAGED_BY_LABEL.to_string(), env!("CARGO_PKG_NAME").to_string());
    labels.insert(PARTITION_LABEL.to_string(), partition.clone());

    let mut node_selector = BTreeMap::new();
    node_selector.insert(PARTITION_LABEL.to_string(), partition);

    Manifest::Pod(Pod {
        api_version: API_VERSION.to_string(),
        metadata: ObjectMeta {
            name: request.name.clone(),
            labels,
        },
        spec: PodSpec {
            node_selector,
            containers: vec![Container {
                name: CONTAINER_NAME.to_string(),
                image: request.image.clone(),
                command: COMMAND.iter().map(|s| s.to_string()).collect(),
                working_dir: DEFAULT_MOUNT_PATH.to_string(),
                security_context: Some(SecurityContext {
                    capabilities: Capabilities {
                        add: CAPABILITIES.iter().map(|s| s.to_string()).collect(),
                    },
                }),
                resources: ResourceRequirements {
                    requests: resources.clone(),
                    limits: resources,
                },
                volume_mounts,
            }],
            volumes,
            restart_policy: RESTART_POLICY.to_string(),
        },
    })
}

fn claim_volume(id: &str, claim: &str) -> Volume {
    Volume {
        name: id.to_string(),
        persistent_volume_claim: ClaimSource {
            claim_name: claim.to_string(),
        },
    }
}
