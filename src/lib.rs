//! hpcgame - partition-aware resource provisioning
//!
//! Users pick a hardware partition from a cached remote catalog, ask for
//! CPU, memory, GPUs and volumes, and get a container submitted to the
//! cluster with the partition's default volume mounted at
//! `/partition-data`.
//!
//! # Example
//!
//! ```no_run
//! use hpcgame::{CatalogCache, Kubectl, Provisioner, ResourceSpec, Settings};
//!
//! let settings = Settings::resolve(None, None, None).unwrap();
//! let mut catalog = CatalogCache::from_settings(&settings).unwrap();
//! let control = Kubectl::new(settings.require_kubeconfig().unwrap());
//! let spec = ResourceSpec { cpu: 4, ..ResourceSpec::default() };
//! let report = Provisioner::new(&mut catalog, &control).provision("x86", spec).unwrap();
//! println!("{}", report.request.name);
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod control;
pub mod error;
pub mod manifest;
pub mod output;
pub mod provision;
pub mod volume;

pub use catalog::{Catalog, CatalogCache, Partition};
pub use config::Settings;
pub use control::{ControlPlane, InMemoryControlPlane, Kubectl};
pub use error::{HpcError, Result};
pub use manifest::{synthesize, Manifest, ResourceSpec, WorkloadRequest};
pub use output::{format_output, CommandResult, OutputFormat};
pub use provision::{Provisioner, ProvisionReport};
pub use volume::VolumeManager;
