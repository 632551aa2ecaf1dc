//! JSON output formatting

use serde_json::{json, Value};

use crate::output::formatter::CommandResult;

pub fn format_json(result: &CommandResult) -> String {
    let data: Value = match result {
        CommandResult::Partitions(partitions) => serde_json::to_value(partitions).unwrap_or(json!(null)),
        CommandResult::Images(partitions) => {
            let images: Vec<Value> = partitions
                .iter()
                .map(|p| json!({ "partition": p.name, "images": p.images }))
                .collect();
            json!(images)
        }
        CommandResult::Volumes(claims) => serde_json::to_value(claims).unwrap_or(json!(null)),
        CommandResult::Workloads(workloads) => serde_json::to_value(workloads).unwrap_or(json!(null)),
        CommandResult::Provisioned(report) => serde_json::to_value(report).unwrap_or(json!(null)),
        CommandResult::Manifest(manifest) => serde_json::to_value(manifest).unwrap_or(json!(null)),
        CommandResult::Message(s) => json!({ "message": s }),
    };

    serde_json::to_string_pretty(&data).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::VolumeClaim;

    #[test]
    fn test_message_json() {
        let out = format_json(&CommandResult::Message("done".to_string()));
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["message"], "done");
    }

    #[test]
    fn test_volumes_json_carries_default_flag() {
        let out = format_json(&CommandResult::Volumes(vec![VolumeClaim {
            name: "x86-default-pvc".to_string(),
            size: "200Gi".to_string(),
            storage_class: "x86-default-sc".to_string(),
            access_modes: vec!["ReadWriteMany".to_string()],
            phase: "Bound".to_string(),
            is_default: true,
        }]));
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["is_default"], true);
    }
}
