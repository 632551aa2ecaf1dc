//! Persistent volume claims
//!
//! Each partition has one implicit default claim, created lazily and
//! protected from deletion; users may create and delete extra claims
//! alongside it.

mod claim;
mod manager;
mod naming;

pub use claim::{AccessMode, ClaimRequest, VolumeClaim, DEFAULT_CLAIM_SIZE};
pub use manager::{DefaultClaim, VolumeManager};
pub use naming::{
    default_claim_name, default_storage_class, is_protected_claim, validate_object_name, validate_quantity,
    DEFAULT_CLAIM_MARKER, DEFAULT_STORAGE_CLASS_SUFFIX,
};
