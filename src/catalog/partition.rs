//! Partition definitions and the catalog that holds them

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{HpcError, Result};
use crate::volume::default_claim_name;

/// GPU resource offered by a partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuResource {
    /// Extended resource key, e.g. `nvidia.com/gpu`
    pub tag: String,
    /// Display name, e.g. `NVIDIA A100`
    pub name: String,
}

/// A named pool of cluster resources
///
/// Partitions only come into existence by deserializing a catalog payload,
/// which enforces `cpu_limit >= 1`, `memory_limit >= 1` and that the GPU tag
/// and display name are either both present or both absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "PartitionRecord")]
pub struct Partition {
    pub name: String,
    pub description: String,
    /// CPU core limit
    pub cpu_limit: u32,
    /// Memory limit in GiB
    pub memory_limit: u32,
    pub gpu: Option<GpuResource>,
    /// Recommended images, most preferred first
    pub images: Vec<String>,
}

impl Partition {
    pub fn gpu_tag(&self) -> Option<&str> {
        self.gpu.as_ref().map(|g| g.tag.as_str())
    }

    /// First recommended image, used when a request names none
    pub fn default_image(&self) -> Option<&str> {
        self.images.first().map(|s| s.as_str())
    }
}

/// Wire shape of one catalog entry
///
/// Serialized with the published PascalCase names; read from lowercased
/// keys. Absent GPUs are encoded as empty strings and an empty image list
/// may arrive as `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PartitionRecord {
    #[serde(rename(serialize = "Name", deserialize = "name"))]
    name: String,
    #[serde(rename(serialize = "Description", deserialize = "description"), default)]
    description: String,
    #[serde(rename(serialize = "GPUTag", deserialize = "gputag"), default)]
    gpu_tag: String,
    #[serde(rename(serialize = "GPUName", deserialize = "gpuname"), default)]
    gpu_name: String,
    #[serde(rename(serialize = "Images", deserialize = "images"), default)]
    images: Option<Vec<String>>,
    #[serde(rename(serialize = "CPULimit", deserialize = "cpulimit"))]
    cpu_limit: i64,
    #[serde(rename(serialize = "MemoryLimit", deserialize = "memorylimit"))]
    memory_limit: i64,
}

/// Field names match case-insensitively, so `CPULimit`, `cpuLimit` and
/// `cpulimit` are the same key
impl TryFrom<Map<String, Value>> for Partition {
    type Error = String;

    fn try_from(fields: Map<String, Value>) -> std::result::Result<Self, Self::Error> {
        let folded: Map<String, Value> = fields
            .into_iter()
            .map(|(key, value)| (key.to_lowercase(), value))
            .collect();
        let record: PartitionRecord = serde_json::from_value(Value::Object(folded)).map_err(|e| e.to_string())?;
        Partition::try_from(record)
    }
}

impl TryFrom<PartitionRecord> for Partition {
    type Error = String;

    fn try_from(record: PartitionRecord) -> std::result::Result<Self, Self::Error> {
        if record.name.trim().is_empty() {
            return Err("partition with empty name".to_string());
        }
        let cpu_limit = positive_limit(&record.name, "CPULimit", record.cpu_limit)?;
        let memory_limit = positive_limit(&record.name, "MemoryLimit", record.memory_limit)?;

        let gpu = match (record.gpu_tag.is_empty(), record.gpu_name.is_empty()) {
            (true, true) => None,
            (false, false) => Some(GpuResource {
                tag: record.gpu_tag,
                name: record.gpu_name,
            }),
            _ => {
                return Err(format!(
                    "partition '{}': GPUTag and GPUName must be set together",
                    record.name
                ))
            }
        };

        Ok(Partition {
            name: record.name,
            description: record.description,
            cpu_limit,
            memory_limit,
            gpu,
            images: record.images.unwrap_or_default(),
        })
    }
}

impl From<Partition> for PartitionRecord {
    fn from(p: Partition) -> Self {
        let (gpu_tag, gpu_name) = match p.gpu {
            Some(gpu) => (gpu.tag, gpu.name),
            None => (String::new(), String::new()),
        };
        PartitionRecord {
            name: p.name,
            description: p.description,
            gpu_tag,
            gpu_name,
            images: Some(p.images),
            cpu_limit: i64::from(p.cpu_limit),
            memory_limit: i64::from(p.memory_limit),
        }
    }
}

fn positive_limit(partition: &str, field: &str, value: i64) -> std::result::Result<u32, String> {
    u32::try_from(value)
        .ok()
        .filter(|v| *v >= 1)
        .ok_or_else(|| format!("partition '{}': {} must be a positive integer, got {}", partition, field, value))
}

/// The full set of partition definitions, replaced wholesale on refresh
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Catalog {
    partitions: Vec<Partition>,
}

impl Catalog {
    /// Parse a catalog payload (a JSON array of partition records)
    pub fn from_json(payload: &[u8]) -> Result<Self> {
        let partitions: Vec<Partition> = serde_json::from_slice(payload)?;

        let mut seen = HashSet::new();
        for p in &partitions {
            if !seen.insert(p.name.as_str()) {
                return Err(HpcError::Serialization(format!(
                    "duplicate partition name '{}' in catalog",
                    p.name
                )));
            }
        }

        Ok(Self { partitions })
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&Partition> {
        self.partitions.iter().find(|p| p.name == name)
    }

    /// Look up a partition, failing with the list of valid names
    pub fn require(&self, name: &str) -> Result<&Partition> {
        self.find(name).ok_or_else(|| {
            let known: Vec<&str> = self.partitions.iter().map(|p| p.name.as_str()).collect();
            HpcError::NotFound(format!(
                "partition '{}' (available: {})",
                name,
                known.join(", ")
            ))
        })
    }

    /// Groups of partitions whose default claim names collide
    ///
    /// `a_b` and `a-b` both map to `a-b-default-pvc`, so they would share
    /// one default volume.
    pub fn default_claim_aliases(&self) -> Vec<(String, Vec<String>)> {
        let mut by_claim: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for p in &self.partitions {
            by_claim
                .entry(default_claim_name(&p.name))
                .or_default()
                .push(p.name.clone());
        }
        by_claim.into_iter().filter(|(_, names)| names.len() > 1).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"[
        {"Name": "x86", "Description": "General purpose", "GPUTag": "", "GPUName": "",
         "Images": ["ubuntu:22.04", "python:3.12"], "CPULimit": 16, "MemoryLimit": 64},
        {"Name": "gpu_a100", "Description": "A100 nodes", "GPUTag": "nvidia.com/gpu",
         "GPUName": "NVIDIA A100", "Images": null, "CPULimit": 32, "MemoryLimit": 256}
    ]"#;

    #[test]
    fn test_parse_catalog() {
        let catalog = Catalog::from_json(PAYLOAD.as_bytes()).unwrap();
        assert_eq!(catalog.len(), 2);

        let x86 = catalog.find("x86").unwrap();
        assert_eq!(x86.cpu_limit, 16);
        assert_eq!(x86.memory_limit, 64);
        assert!(x86.gpu.is_none());
        assert_eq!(x86.default_image(), Some("ubuntu:22.04"));

        let gpu = catalog.find("gpu_a100").unwrap();
        assert_eq!(gpu.gpu_tag(), Some("nvidia.com/gpu"));
        assert!(gpu.images.is_empty());
    }

    #[test]
    fn test_field_names_are_case_insensitive() {
        let payload = r#"[{"name": "arm", "cpuLimit": 4, "memoryLimit": 8},
                          {"NAME": "gpu", "cpulimit": 2, "MEMORYLIMIT": 4,
                           "gputag": "nvidia.com/gpu", "GpuName": "T4", "IMAGES": ["cuda:12"]}]"#;
        let catalog = Catalog::from_json(payload.as_bytes()).unwrap();
        assert_eq!(catalog.find("arm").unwrap().cpu_limit, 4);

        let gpu = catalog.find("gpu").unwrap();
        assert_eq!(gpu.memory_limit, 4);
        assert_eq!(gpu.gpu_tag(), Some("nvidia.com/gpu"));
        assert_eq!(gpu.default_image(), Some("cuda:12"));
    }

    #[test]
    fn test_reject_zero_cpu_limit() {
        let payload = r#"[{"Name": "bad", "CPULimit": 0, "MemoryLimit": 8}]"#;
        assert!(Catalog::from_json(payload.as_bytes()).is_err());
    }

    #[test]
    fn test_reject_half_gpu() {
        let payload = r#"[{"Name": "bad", "GPUTag": "nvidia.com/gpu", "CPULimit": 4, "MemoryLimit": 8}]"#;
        assert!(Catalog::from_json(payload.as_bytes()).is_err());
    }

    #[test]
    fn test_reject_duplicate_names() {
        let payload = r#"[{"Name": "x", "CPULimit": 1, "MemoryLimit": 1},
                          {"Name": "x", "CPULimit": 2, "MemoryLimit": 2}]"#;
        assert!(matches!(
            Catalog::from_json(payload.as_bytes()),
            Err(HpcError::Serialization(_))
        ));
    }

    #[test]
    fn test_serialize_uses_payload_field_names() {
        let catalog = Catalog::from_json(PAYLOAD.as_bytes()).unwrap();
        let value = serde_json::to_value(catalog.find("gpu_a100").unwrap()).unwrap();
        assert_eq!(value["GPUTag"], "nvidia.com/gpu");
        assert_eq!(value["CPULimit"], 32);
    }

    #[test]
    fn test_require_unknown_partition() {
        let catalog = Catalog::from_json(PAYLOAD.as_bytes()).unwrap();
        let err = catalog.require("riscv").unwrap_err();
        assert!(err.to_string().contains("x86"));
    }

    #[test]
    fn test_default_claim_aliases() {
        let payload = r#"[{"Name": "a_b", "CPULimit": 1, "MemoryLimit": 1},
                          {"Name": "a-b", "CPULimit": 1, "MemoryLimit": 1},
                          {"Name": "c", "CPULimit": 1, "MemoryLimit": 1}]"#;
        let catalog = Catalog::from_json(payload.as_bytes()).unwrap();
        let aliases = catalog.default_claim_aliases();
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases[0].0, "a-b-default-pvc");
        assert_eq!(aliases[0].1, vec!["a_b".to_string(), "a-b".to_string()]);
    }
}
