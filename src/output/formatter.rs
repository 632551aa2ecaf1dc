//! Output formatting

use crate::catalog::Partition;
use crate::control::WorkloadStatus;
use crate::manifest::Manifest;
use crate::output::human::format_human;
use crate::output::json::format_json;
use crate::provision::ProvisionReport;
use crate::volume::VolumeClaim;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Anything a command can print
#[derive(Debug, Clone)]
pub enum CommandResult {
    Partitions(Vec<Partition>),
    Images(Vec<Partition>),
    Volumes(Vec<VolumeClaim>),
    Workloads(Vec<WorkloadStatus>),
    Provisioned(Box<ProvisionReport>),
    Manifest(Box<Manifest>),
    Message(String),
}

pub fn format_output(result: &CommandResult, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Human => format_human(result),
        OutputFormat::Json => format_json(result),
    }
}
