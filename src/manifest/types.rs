//! Typed subset of the control plane's object model
//!
//! Only the fields hpcgame emits are modelled. Serialization goes through
//! serde, so optional pieces (like a GPU entry) are present or absent
//! structurally rather than by string templating.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::volume::AccessMode;

pub const API_VERSION: &str = "v1";

/// Any object hpcgame submits, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Manifest {
    Pod(Pod),
    PersistentVolumeClaim(PersistentVolumeClaim),
}

impl Manifest {
    pub fn kind(&self) -> &'static str {
        match self {
            Manifest::Pod(_) => "Pod",
            Manifest::PersistentVolumeClaim(_) => "PersistentVolumeClaim",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Manifest::Pod(pod) => &pod.metadata.name,
            Manifest::PersistentVolumeClaim(pvc) => &pvc.metadata.name,
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ObjectMeta {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            labels: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    pub api_version: String,
    pub metadata: ObjectMeta,
    pub spec: PodSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    pub node_selector: BTreeMap<String, String>,
    pub containers: Vec<Container>,
    pub volumes: Vec<Volume>,
    pub restart_policy: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    pub working_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_context: Option<SecurityContext>,
    pub resources: ResourceRequirements,
    pub volume_mounts: Vec<VolumeMount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityContext {
    pub capabilities: Capabilities,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub add: Vec<String>,
}

/// A resource amount: a bare count (`2`) or a suffixed string (`4000m`, `8Gi`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Count(u64),
    Text(String),
}

impl Quantity {
    pub fn millicores(cores: u32) -> Self {
        Quantity::Text(format!("{}m", u64::from(cores) * 1000))
    }

    pub fn gibibytes(gib: u32) -> Self {
        Quantity::Text(format!("{}Gi", gib))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Count(n) => write!(f, "{}", n),
            Quantity::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    pub requests: BTreeMap<String, Quantity>,
    pub limits: BTreeMap<String, Quantity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub name: String,
    pub persistent_volume_claim: ClaimSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSource {
    pub claim_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentVolumeClaim {
    pub api_version: String,
    pub metadata: ObjectMeta,
    pub spec: ClaimSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSpec {
    pub storage_class_name: String,
    pub access_modes: Vec<AccessMode>,
    pub resources: StorageRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRequest {
    pub requests: StorageAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageAmount {
    pub storage: String,
}

impl StorageRequest {
    pub fn of(size: &str) -> Self {
        Self {
            requests: StorageAmount {
                storage: size.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_serialization() {
        assert_eq!(serde_json::to_value(Quantity::millicores(4)).unwrap(), "4000m");
        assert_eq!(serde_json::to_value(Quantity::gibibytes(8)).unwrap(), "8Gi");
        assert_eq!(serde_json::to_value(Quantity::Count(2)).unwrap(), 2);
    }

    #[test]
    fn test_manifest_kind_tag() {
        let manifest = Manifest::PersistentVolumeClaim(PersistentVolumeClaim {
            api_version: API_VERSION.to_string(),
            metadata: ObjectMeta::named("data"),
            spec: ClaimSpec {
                storage_class_name: "standard".to_string(),
                access_modes: vec![AccessMode::ReadWriteOnce],
                resources: StorageRequest::of("1Gi"),
            },
        });
        let value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(value["kind"], "PersistentVolumeClaim");
        assert_eq!(value["apiVersion"], "v1");
        assert_eq!(value["spec"]["accessModes"][0], "ReadWriteOnce");
        assert_eq!(manifest.name(), "data");

        let back: Manifest = serde_yaml::from_str(&manifest.to_yaml().unwrap()).unwrap();
        assert_eq!(back, manifest);
    }
}
