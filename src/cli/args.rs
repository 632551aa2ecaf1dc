//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::manifest::{split_volume_list, ResourceSpec, DEFAULT_CPU};

#[derive(Parser)]
#[command(name = "hpcgame")]
#[command(author, version, about = "Provision partition-bound containers and volumes", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: SubCommand,

    /// Output format as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output (`-v` belongs to `create --volumes`)
    #[arg(long, global = true)]
    pub verbose: bool,

    /// State directory (default: ~/.hpcgame)
    #[arg(long, global = true, env = "HPCGAME_HOME", value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// Partition catalog URL
    #[arg(long, global = true, env = "HPCGAME_CATALOG_URL", value_name = "URL")]
    pub catalog_url: Option<String>,

    /// Cluster credentials (default: <home>/kubeconfig)
    #[arg(long, global = true, env = "HPCGAME_KUBECONFIG", value_name = "FILE")]
    pub kubeconfig: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum SubCommand {
    /// List available partitions
    #[command(visible_alias = "partitions")]
    Lspart,

    /// List verified images for each partition
    Images,

    /// Re-download the partition catalog now
    Refresh,

    /// Create a container on a partition
    #[command(visible_alias = "run")]
    Create {
        /// Partition to run on
        #[arg(short, long)]
        partition: String,

        /// CPU cores
        #[arg(short, long, default_value_t = DEFAULT_CPU)]
        cpu: u32,

        /// Memory in GiB (default: 2 per CPU core)
        #[arg(short, long)]
        memory: Option<u32>,

        /// GPU count
        #[arg(short, long, default_value_t = 0)]
        gpu: u32,

        /// Extra volumes to mount, comma separated
        #[arg(short, long, value_name = "NAMES")]
        volumes: Option<String>,

        /// Container image (default: the partition's first verified image)
        #[arg(short, long)]
        image: Option<String>,

        /// Container name (default: container-<pid>)
        #[arg(short, long)]
        name: Option<String>,

        /// Image as a positional argument
        #[arg(value_name = "IMAGE", conflicts_with = "image")]
        image_arg: Option<String>,

        /// Print the manifest instead of submitting it
        #[arg(long)]
        dry_run: bool,
    },

    /// List containers
    #[command(visible_aliases = ["ls", "containers"])]
    Ps,

    /// Delete a container
    #[command(visible_aliases = ["delete", "kill", "stop"])]
    Rm {
        /// Container name
        name: String,
    },

    /// Manage volumes
    Volume {
        #[command(subcommand)]
        command: VolumeCommand,
    },
}

#[derive(Subcommand)]
pub enum VolumeCommand {
    /// List volumes
    #[command(visible_alias = "list")]
    Ls,

    /// Create a volume
    Create {
        /// Volume name
        name: String,

        /// Size, e.g. 10Gi
        size: String,

        /// Storage class
        storage_class: String,

        /// Access mode (ReadWriteOnce, ReadOnlyMany, ReadWriteMany, ReadWriteOncePod)
        #[arg(default_value = "ReadWriteMany")]
        access_mode: String,
    },

    /// Delete a volume
    #[command(visible_alias = "delete")]
    Rm {
        /// Volume name
        name: String,
    },
}

impl SubCommand {
    /// Resource request carried by `create`, if this is one
    pub fn resource_spec(&self) -> Option<(&str, ResourceSpec)> {
        match self {
            SubCommand::Create {
                partition,
                cpu,
                memory,
                gpu,
                volumes,
                image,
                name,
                image_arg,
                ..
            } => Some((
                partition.as_str(),
                ResourceSpec {
                    name: name.clone(),
                    cpu: *cpu,
                    memory: *memory,
                    gpu: *gpu,
                    image: image.clone().or_else(|| image_arg.clone()),
                    volumes: volumes.as_deref().map(split_volume_list).unwrap_or_default(),
                },
            )),
            _ => None,
        }
    }
}
