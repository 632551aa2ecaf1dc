//! Runtime settings
//!
//! Everything hpcgame keeps on the local machine lives under one state
//! directory (`~/.hpcgame` unless overridden): the cached partition catalog,
//! its refresh timestamp and the cluster credential file.

use std::path::{Path, PathBuf};

use crate::error::{HpcError, Result};

/// Name of the state directory under the user's home
pub const STATE_DIR_NAME: &str = ".hpcgame";

/// Where the partition catalog is published
pub const DEFAULT_CATALOG_URL: &str = "https://hpcgame.pku.edu.cn/oss/images/public/partitions.json";

/// Credential file name inside the state directory
pub const KUBECONFIG_FILE: &str = "kubeconfig";

/// Catalog time-to-live, in seconds
pub const CATALOG_TTL_SECS: i64 = 86_400;

#[derive(Debug, Clone)]
pub struct Settings {
    /// State directory holding the catalog cache and kubeconfig
    pub home: PathBuf,
    /// Remote catalog location
    pub catalog_url: String,
    /// Credential file handed to the control plane client
    pub kubeconfig: PathBuf,
    /// Catalog staleness threshold
    pub catalog_ttl_secs: i64,
}

impl Settings {
    /// Resolve settings from explicit overrides, falling back to defaults.
    ///
    /// The overrides normally come from CLI flags, which clap already
    /// back-fills from `HPCGAME_*` environment variables.
    pub fn resolve(
        home: Option<PathBuf>,
        catalog_url: Option<String>,
        kubeconfig: Option<PathBuf>,
    ) -> Result<Self> {
        let home = match home {
            Some(home) => home,
            None => dirs::home_dir()
                .map(|h| h.join(STATE_DIR_NAME))
                .ok_or_else(|| HpcError::Config("cannot determine user home directory".to_string()))?,
        };
        let kubeconfig = kubeconfig.unwrap_or_else(|| home.join(KUBECONFIG_FILE));

        Ok(Self {
            home,
            catalog_url: catalog_url.unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string()),
            kubeconfig,
            catalog_ttl_secs: CATALOG_TTL_SECS,
        })
    }

    /// Kubeconfig path, checked for existence
    pub fn require_kubeconfig(&self) -> Result<&Path> {
        if !self.kubeconfig.is_file() {
            return Err(HpcError::Config(format!(
                "kubeconfig not found: {} (place your cluster credentials there or pass --kubeconfig)",
                self.kubeconfig.display()
            )));
        }
        Ok(&self.kubeconfig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_with_overrides() {
        let settings = Settings::resolve(
            Some(PathBuf::from("/tmp/hpc")),
            Some("http://localhost/partitions.json".to_string()),
            None,
        )
        .unwrap();
        assert_eq!(settings.home, PathBuf::from("/tmp/hpc"));
        assert_eq!(settings.kubeconfig, PathBuf::from("/tmp/hpc/kubeconfig"));
        assert_eq!(settings.catalog_url, "http://localhost/partitions.json");
        assert_eq!(settings.catalog_ttl_secs, 86_400);
    }

    #[test]
    fn test_resolve_defaults_url() {
        let settings = Settings::resolve(Some(PathBuf::from("/tmp/hpc")), None, None).unwrap();
        assert_eq!(settings.catalog_url, DEFAULT_CATALOG_URL);
    }

    #[test]
    fn test_require_kubeconfig_missing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::resolve(Some(dir.path().to_path_buf()), None, None).unwrap();
        assert!(matches!(settings.require_kubeconfig(), Err(HpcError::Config(_))));

        std::fs::write(dir.path().join(KUBECONFIG_FILE), "apiVersion: v1\n").unwrap();
        assert!(settings.require_kubeconfig().is_ok());
    }
}
