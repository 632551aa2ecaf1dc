//! Volume claim types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HpcError;
use crate::manifest::{ClaimSpec, Manifest, ObjectMeta, PersistentVolumeClaim, StorageRequest, API_VERSION};

/// Size of every partition default claim
pub const DEFAULT_CLAIM_SIZE: &str = "200Gi";

/// How a claim may be mounted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessMode {
    ReadWriteOnce,
    ReadOnlyMany,
    #[default]
    ReadWriteMany,
    ReadWriteOncePod,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccessMode::ReadWriteOnce => "ReadWriteOnce",
            AccessMode::ReadOnlyMany => "ReadOnlyMany",
            AccessMode::ReadWriteMany => "ReadWriteMany",
            AccessMode::ReadWriteOncePod => "ReadWriteOncePod",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for AccessMode {
    type Err = HpcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "readwriteonce" | "rwo" => Ok(AccessMode::ReadWriteOnce),
            "readonlymany" | "rox" => Ok(AccessMode::ReadOnlyMany),
            "readwritemany" | "rwx" => Ok(AccessMode::ReadWriteMany),
            "readwriteoncepod" | "rwop" => Ok(AccessMode::ReadWriteOncePod),
            _ => Err(HpcError::ValidationFailed(format!(
                "unknown access mode '{}' (expected ReadWriteOnce, ReadOnlyMany, ReadWriteMany or ReadWriteOncePod)",
                s
            ))),
        }
    }
}

/// A claim as observed in the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeClaim {
    pub name: String,
    /// Requested size, e.g. `10Gi`
    pub size: String,
    pub storage_class: String,
    pub access_modes: Vec<String>,
    /// Phase reported by the cluster (`Pending`, `Bound`, ...)
    pub phase: String,
    /// Name matches the protected default pattern
    #[serde(default)]
    pub is_default: bool,
}

/// Everything needed to ask for a new claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRequest {
    pub name: String,
    pub size: String,
    pub storage_class: String,
    pub access_mode: AccessMode,
}

impl ClaimRequest {
    pub fn to_manifest(&self) -> Manifest {
        Manifest::PersistentVolumeClaim(PersistentVolumeClaim {
            api_version: API_VERSION.to_string(),
            metadata: ObjectMeta::named(&self.name),
            spec: ClaimSpec {
                storage_class_name: self.storage_class.clone(),
                access_modes: vec![self.access_mode],
                resources: StorageRequest::of(&self.size),
            },
        })
    }
}
