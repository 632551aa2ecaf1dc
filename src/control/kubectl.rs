//! `kubectl`-backed control plane

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use super::{ControlPlane, ControlPlaneError, ControlResult, WorkloadStatus};
use crate::manifest::Manifest;
use crate::volume::VolumeClaim;

const FALLBACK_NAMESPACE: &str = "default";

/// Runs `kubectl --kubeconfig <file> ...` for every operation
#[derive(Debug)]
pub struct Kubectl {
    binary: PathBuf,
    kubeconfig: PathBuf,
    namespace: OnceLock<String>,
}

impl Kubectl {
    pub fn new(kubeconfig: impl Into<PathBuf>) -> Self {
        Self {
            binary: PathBuf::from("kubectl"),
            kubeconfig: kubeconfig.into(),
            namespace: OnceLock::new(),
        }
    }

    /// Use a specific client binary instead of `kubectl` on `PATH`
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Namespace of the kubeconfig's current context
    pub fn namespace(&self) -> &str {
        self.namespace.get_or_init(|| {
            let namespace = self
                .run(&["config", "view", "--minify", "-o", "jsonpath={..namespace}"], None)
                .ok()
                .filter(|out| out.status.success())
                .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string())
                .filter(|ns| !ns.is_empty())
                .unwrap_or_else(|| FALLBACK_NAMESPACE.to_string());
            debug!(namespace = %namespace, "resolved namespace");
            namespace
        })
    }

    fn run(&self, args: &[&str], stdin: Option<&[u8]>) -> ControlResult<Output> {
        debug!(binary = %self.binary.display(), ?args, "running control plane client");

        let mut cmd = Command::new(&self.binary);
        cmd.arg("--kubeconfig")
            .arg(&self.kubeconfig)
            .args(args)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn()?;
        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input)?;
        }
        Ok(child.wait_with_output()?)
    }

    /// Run a namespaced command and require success
    fn run_ok(&self, args: &[&str], stdin: Option<&[u8]>) -> ControlResult<Output> {
        let namespace = self.namespace().to_string();
        let mut full: Vec<&str> = args.to_vec();
        full.extend(["-n", namespace.as_str()]);

        let output = self.run(&full, stdin)?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(failure(&output))
        }
    }
}

/// Reason the API server attaches to a missing object
const NOT_FOUND_REASON: &str = "(NotFound)";

const MISSING_NAMESPACE: &str = "namespaces \"";

fn failure(output: &Output) -> ControlPlaneError {
    classify_stderr(String::from_utf8_lossy(&output.stderr).trim().to_string())
}

/// Only a server-side `NotFound` for the object itself means it is missing;
/// a missing context or namespace is a failure of the call
fn classify_stderr(stderr: String) -> ControlPlaneError {
    if stderr.contains(NOT_FOUND_REASON) && !stderr.contains(MISSING_NAMESPACE) {
        ControlPlaneError::NotFound(stderr)
    } else {
        ControlPlaneError::Rejected { detail: stderr }
    }
}

impl ControlPlane for Kubectl {
    fn claim_exists(&self, name: &str) -> ControlResult<bool> {
        match self.run_ok(&["get", "pvc", name, "-o", "name"], None) {
            Ok(_) => Ok(true),
            Err(ControlPlaneError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn apply(&self, manifest: &Manifest) -> ControlResult<()> {
        let yaml = manifest
            .to_yaml()
            .map_err(|e| ControlPlaneError::Malformed(e.to_string()))?;
        debug!(kind = manifest.kind(), name = manifest.name(), "applying manifest:\n{}", yaml);

        self.run_ok(&["apply", "-f", "-"], Some(yaml.as_bytes()))?;
        Ok(())
    }

    fn list_claims(&self) -> ControlResult<Vec<VolumeClaim>> {
        let output = self.run_ok(&["get", "pvc", "-o", "json"], None)?;
        parse_claim_list(&output.stdout)
    }

    fn delete_claim(&self, name: &str) -> ControlResult<()> {
        self.run_ok(&["delete", "pvc", name], None)?;
        Ok(())
    }

    fn list_workloads(&self) -> ControlResult<Vec<WorkloadStatus>> {
        let output = self.run_ok(&["get", "pods", "-o", "json"], None)?;
        parse_pod_list(&output.stdout)
    }

    fn delete_workload(&self, name: &str) -> ControlResult<()> {
        self.run_ok(&["delete", "pod", name], None)?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct List<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ItemMeta {
    name: String,
    creation_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ClaimItem {
    metadata: ItemMeta,
    #[serde(default)]
    spec: ClaimItemSpec,
    #[serde(default)]
    status: ItemStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ClaimItemSpec {
    storage_class_name: Option<String>,
    access_modes: Vec<String>,
    resources: ClaimItemResources,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ClaimItemResources {
    requests: ClaimItemRequests,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ClaimItemRequests {
    storage: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ItemStatus {
    phase: String,
}

#[derive(Debug, Deserialize)]
struct PodItem {
    metadata: ItemMeta,
    #[serde(default)]
    spec: PodItemSpec,
    #[serde(default)]
    status: ItemStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PodItemSpec {
    containers: Vec<PodItemContainer>,
    node_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PodItemContainer {
    image: String,
}

fn parse_claim_list(json: &[u8]) -> ControlResult<Vec<VolumeClaim>> {
    let list: List<ClaimItem> =
        serde_json::from_slice(json).map_err(|e| ControlPlaneError::Malformed(e.to_string()))?;

    Ok(list
        .items
        .into_iter()
        .map(|item| VolumeClaim {
            name: item.metadata.name,
            size: item.spec.resources.requests.storage,
            storage_class: item.spec.storage_class_name.unwrap_or_default(),
            access_modes: item.spec.access_modes,
            phase: item.status.phase,
            is_default: false,
        })
        .collect())
}

fn parse_pod_list(json: &[u8]) -> ControlResult<Vec<WorkloadStatus>> {
    let list: List<PodItem> =
        serde_json::from_slice(json).map_err(|e| ControlPlaneError::Malformed(e.to_string()))?;

    Ok(list
        .items
        .into_iter()
        .map(|item| WorkloadStatus {
            name: item.metadata.name,
            image: item
                .spec
                .containers
                .into_iter()
                .next()
                .map(|c| c.image)
                .unwrap_or_default(),
            phase: item.status.phase,
            created: item.metadata.creation_timestamp,
            node: item.spec.node_name,
        })
        .collect())
}
