//! Human-readable output formatting

use crate::catalog::Partition;
use crate::control::WorkloadStatus;
use crate::manifest::{DEFAULT_MOUNT_PATH, EXTRA_MOUNT_ROOT};
use crate::output::formatter::CommandResult;
use crate::provision::{DefaultClaimStatus, ProvisionReport};
use crate::volume::VolumeClaim;

const RULE: &str = "------------------------------------------------";

pub fn format_human(result: &CommandResult) -> String {
    match result {
        CommandResult::Partitions(partitions) => format_partitions(partitions),
        CommandResult::Images(partitions) => {
            let mut output = String::from("Available images by partition:\n");
            output.push_str(RULE);
            output.push('\n');
            for partition in partitions {
                output.push_str(&format!("Partition: {}\n", partition.name));
                for image in &partition.images {
                    output.push_str(&format!("  {}\n", image));
                }
                output.push_str(RULE);
                output.push('\n');
            }
            output.push_str("Note: Custom images are also supported if compatible with the partition");
            output
        }
        CommandResult::Volumes(claims) => format_volumes(claims),
        CommandResult::Workloads(workloads) => format_workloads(workloads),
        CommandResult::Provisioned(report) => format_report(report),
        CommandResult::Manifest(manifest) => manifest
            .to_yaml()
            .unwrap_or_else(|e| format!("cannot render manifest: {}", e)),
        CommandResult::Message(msg) => msg.clone(),
    }
}

fn format_partitions(partitions: &[Partition]) -> String {
    if partitions.is_empty() {
        return "No partitions available".to_string();
    }
    let mut output = String::from("Available partitions:\n");
    output.push_str(RULE);
    output.push('\n');
    for (i, partition) in partitions.iter().enumerate() {
        output.push_str(&format!(
            "[{}] Partition: {}\n\tDescription: {}\n\tCPU Limit: {}\n\tMemory Limit: {}GiB\n",
            i, partition.name, partition.description, partition.cpu_limit, partition.memory_limit
        ));
        if let Some(ref gpu) = partition.gpu {
            output.push_str(&format!("\tAvailable GPU: {}\n", gpu.name));
        }
        output.push_str("\tVerified images (custom images also supported):");
        for (j, image) in partition.images.iter().enumerate() {
            output.push_str(&format!("\n\t\t[{}] {}", j, image));
        }
        output.push('\n');
        output.push_str(RULE);
        output.push('\n');
    }
    output
}

fn format_volumes(claims: &[VolumeClaim]) -> String {
    let mut output = String::from("VOLUME LIST\n");
    output.push_str(&"=".repeat(110));
    output.push('\n');
    output.push_str(&format!(
        "{:<25} {:<10} {:<22} {:<15} {:<10} {}\n",
        "NAME", "SIZE", "STORAGE CLASS", "ACCESS MODE", "STATUS", "NOTES"
    ));
    output.push_str(&"-".repeat(110));
    output.push('\n');
    for claim in claims {
        output.push_str(&format!(
            "{:<25} {:<10} {:<22} {:<15} {:<10} {}\n",
            truncate(&claim.name, 25),
            claim.size,
            truncate(&claim.storage_class, 22),
            claim.access_modes.join(","),
            claim.phase,
            if claim.is_default { "Default volume (cannot be removed)" } else { "" }
        ));
    }
    output.push_str(&"=".repeat(110));
    output
}

fn format_workloads(workloads: &[WorkloadStatus]) -> String {
    if workloads.is_empty() {
        return "No containers found".to_string();
    }
    let mut output = format!(
        "{:<30} {:<35} {:<10} {:<22} {}\n",
        "CONTAINER", "IMAGE", "STATUS", "CREATED", "NODE"
    );
    for workload in workloads {
        let created = workload
            .created
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        output.push_str(&format!(
            "{:<30} {:<35} {:<10} {:<22} {}\n",
            truncate(&workload.name, 30),
            truncate(&workload.image, 35),
            workload.phase,
            created,
            workload.node.as_deref().unwrap_or("-")
        ));
    }
    output
}

fn format_report(report: &ProvisionReport) -> String {
    let request = &report.request;
    let mut output = format!("Container {} creation request submitted\n", request.name);
    output.push_str(&format!(
        "Partition: {}, CPUs: {}, Memory: {}GiB",
        request.partition.name, request.cpu, request.memory
    ));
    if request.gpu > 0 {
        output.push_str(&format!(", GPUs: {}", request.gpu));
    }
    output.push_str(&format!("\nImage: {}\n", request.image));

    match &report.default_claim {
        DefaultClaimStatus::Existing { .. } => {}
        DefaultClaimStatus::Created { name } => {
            output.push_str(&format!("Default volume {} created\n", name));
        }
        DefaultClaimStatus::Failed { name, error } => {
            output.push_str(&format!("Warning: unable to create default volume {}: {}\n", name, error));
        }
    }

    output.push_str("\nVolume mounts:\n");
    output.push_str(&format!(
        "  - Partition default volume mounted at {} (default working directory)\n",
        DEFAULT_MOUNT_PATH
    ));
    for volume in &request.volumes {
        output.push_str(&format!("  - Volume '{}' mounted at {}/{}\n", volume, EXTRA_MOUNT_ROOT, volume));
    }
    for volume in &report.missing_volumes {
        output.push_str(&format!(
            "Warning: volume {} may not exist. Use 'hpcgame volume ls' to list available volumes\n",
            volume
        ));
    }
    output
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    #[test]
    fn test_partition_listing() {
        let catalog = Catalog::from_json(
            br#"[{"Name": "gpu", "Description": "GPU nodes", "GPUTag": "nvidia.com/gpu",
                  "GPUName": "NVIDIA A100", "CPULimit": 8, "MemoryLimit": 32, "Images": ["cuda:12"]}]"#,
        )
        .unwrap();
        let out = format_human(&CommandResult::Partitions(catalog.partitions().to_vec()));
        assert!(out.contains("[0] Partition: gpu"));
        assert!(out.contains("Memory Limit: 32GiB"));
        assert!(out.contains("Available GPU: NVIDIA A100"));
        assert!(out.contains("[0] cuda:12"));
    }

    #[test]
    fn test_volume_table_notes_defaults() {
        let out = format_human(&CommandResult::Volumes(vec![VolumeClaim {
            name: "x86-default-pvc".to_string(),
            size: "200Gi".to_string(),
            storage_class: "x86-default-sc".to_string(),
            access_modes: vec!["ReadWriteMany".to_string()],
            phase: "Bound".to_string(),
            is_default: true,
        }]));
        assert!(out.contains("Default volume (cannot be removed)"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a-very-long-container-name", 10), "a-very-...");
    }
}
