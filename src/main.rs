//! hpcgame CLI - provision partition-bound containers and volumes

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hpcgame::cli::{Args, SubCommand, VolumeCommand};
use hpcgame::provision::{self, Provisioner};
use hpcgame::volume::{AccessMode, VolumeManager};
use hpcgame::{format_output, CatalogCache, CommandResult, Kubectl, OutputFormat, Settings};

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "hpcgame=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: Args) -> anyhow::Result<()> {
    let format = if args.json { OutputFormat::Json } else { OutputFormat::Human };
    let settings = Settings::resolve(args.home, args.catalog_url, args.kubeconfig)?;
    let cluster = || -> anyhow::Result<Kubectl> { Ok(Kubectl::new(settings.require_kubeconfig()?)) };

    let result = match args.command {
        SubCommand::Lspart => {
            let mut catalog = CatalogCache::from_settings(&settings)?;
            CommandResult::Partitions(catalog.load()?.partitions().to_vec())
        }

        SubCommand::Images => {
            let mut catalog = CatalogCache::from_settings(&settings)?;
            CommandResult::Images(catalog.load()?.partitions().to_vec())
        }

        SubCommand::Refresh => {
            let mut catalog = CatalogCache::from_settings(&settings)?;
            let count = catalog
                .refresh()
                .with_context(|| format!("refreshing catalog from {}", settings.catalog_url))?
                .len();
            CommandResult::Message(format!("Partition catalog refreshed ({} partitions)", count))
        }

        command @ SubCommand::Create { .. } => {
            let dry_run = matches!(command, SubCommand::Create { dry_run: true, .. });
            let (partition, spec) = command
                .resource_spec()
                .context("create command carries no resource request")?;
            let mut catalog = CatalogCache::from_settings(&settings)?;
            if dry_run {
                let (_, manifest) = provision::plan(&mut catalog, partition, spec)?;
                CommandResult::Manifest(Box::new(manifest))
            } else {
                let control = cluster()?;
                let report = Provisioner::new(&mut catalog, &control).provision(partition, spec)?;
                CommandResult::Provisioned(Box::new(report))
            }
        }

        SubCommand::Ps => CommandResult::Workloads(provision::list_workloads(&cluster()?)?),

        SubCommand::Rm { name } => {
            provision::delete_workload(&cluster()?, &name)?;
            CommandResult::Message(format!("Container {} deleted", name))
        }

        SubCommand::Volume { command } => match command {
            VolumeCommand::Ls => {
                let control = cluster()?;
                CommandResult::Volumes(VolumeManager::new(&control).list_claims()?)
            }
            VolumeCommand::Create {
                name,
                size,
                storage_class,
                access_mode,
            } => {
                let mode: AccessMode = access_mode.parse()?;
                let control = cluster()?;
                VolumeManager::new(&control).create_claim(&name, &size, &storage_class, mode)?;
                CommandResult::Message(format!("Volume {} created", name))
            }
            VolumeCommand::Rm { name } => {
                let control = cluster()?;
                VolumeManager::new(&control).delete_claim(&name)?;
                CommandResult::Message(format!("Volume {} deleted", name))
            }
        },
    };

    println!("{}", format_output(&result, &format));
    Ok(())
}
