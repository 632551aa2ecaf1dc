//! Workload manifests
//!
//! Turns a resource request into the declarative description the control
//! plane consumes. Validation happens in `request`, synthesis in
//! `synthesizer`; the object model lives in `types`.

mod request;
mod synthesizer;
mod types;

pub use request::{split_volume_list, ResourceSpec, WorkloadRequest, DEFAULT_CPU, MEMORY_GIB_PER_CPU};
pub use synthesizer::{synthesize, DEFAULT_MOUNT_PATH, DEFAULT_VOLUME_ID, EXTRA_MOUNT_ROOT, PARTITION_LABEL};
pub use types::{
    Capabilities, ClaimSource, ClaimSpec, Container, Manifest, ObjectMeta, PersistentVolumeClaim, Pod,
    PodSpec, Quantity, ResourceRequirements, SecurityContext, StorageAmount, StorageRequest, Volume,
    VolumeMount, API_VERSION,
};
