//! Volume lifecycle manager
//!
//! Owns the rules for partition default claims (derived name, lazy creation,
//! never deleted) and for user claims (no reserved names). Every naming rule
//! is checked locally before the control plane is contacted.

use tracing::{debug, info};

use super::claim::{AccessMode, ClaimRequest, VolumeClaim, DEFAULT_CLAIM_SIZE};
use super::naming::{
    default_claim_name, default_storage_class, is_protected_claim, validate_object_name, validate_quantity,
};
use crate::control::{ControlPlane, ControlPlaneError};
use crate::error::{HpcError, Result};

/// Outcome of [`VolumeManager::ensure_default_claim`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultClaim {
    /// Already present, nothing submitted
    Existing(String),
    /// Submitted just now
    Created(String),
}

impl DefaultClaim {
    pub fn name(&self) -> &str {
        match self {
            DefaultClaim::Existing(name) | DefaultClaim::Created(name) => name,
        }
    }
}

pub struct VolumeManager<'a> {
    control: &'a dyn ControlPlane,
}

impl<'a> VolumeManager<'a> {
    pub fn new(control: &'a dyn ControlPlane) -> Self {
        Self { control }
    }

    /// Make sure the partition's default claim exists
    ///
    /// Check-then-create; two racing callers may both submit, which the
    /// control plane treats as an idempotent apply.
    pub fn ensure_default_claim(&self, partition: &str) -> Result<DefaultClaim> {
        let name = default_claim_name(partition);

        let exists = self
            .control
            .claim_exists(&name)
            .map_err(|e| provisioning_failed(&name, e))?;
        if exists {
            debug!(claim = %name, "default volume already exists");
            return Ok(DefaultClaim::Existing(name));
        }

        let request = ClaimRequest {
            name: name.clone(),
            size: DEFAULT_CLAIM_SIZE.to_string(),
            storage_class: default_storage_class(partition),
            access_mode: AccessMode::ReadWriteMany,
        };
        self.control
            .apply(&request.to_manifest())
            .map_err(|e| provisioning_failed(&name, e))?;

        info!(claim = %name, partition, "default volume created");
        Ok(DefaultClaim::Created(name))
    }

    /// Create a user-managed claim
    pub fn create_claim(&self, name: &str, size: &str, storage_class: &str, access_mode: AccessMode) -> Result<()> {
        if is_protected_claim(name) {
            return Err(HpcError::ReservedName(name.to_string()));
        }
        validate_object_name("volume", name)?;
        validate_quantity(size)?;
        if storage_class.trim().is_empty() {
            return Err(HpcError::ValidationFailed("storage class must not be empty".to_string()));
        }

        let request = ClaimRequest {
            name: name.to_string(),
            size: size.to_string(),
            storage_class: storage_class.to_string(),
            access_mode,
        };
        self.control
            .apply(&request.to_manifest())
            .map_err(|e| provisioning_failed(name, e))?;

        info!(claim = %name, size, storage_class, "volume created");
        Ok(())
    }

    /// Delete a user-managed claim; default claims are always refused
    pub fn delete_claim(&self, name: &str) -> Result<()> {
        if is_protected_claim(name) {
            return Err(HpcError::ReservedName(name.to_string()));
        }

        match self.control.delete_claim(name) {
            Ok(()) => {
                info!(claim = %name, "volume deleted");
                Ok(())
            }
            Err(ControlPlaneError::NotFound(_)) => Err(HpcError::NotFound(format!("volume '{}'", name))),
            Err(e) => Err(HpcError::DeletionFailed {
                name: name.to_string(),
                detail: e.to_string(),
            }),
        }
    }

    /// All claims, each marked if it matches the default naming pattern
    pub fn list_claims(&self) -> Result<Vec<VolumeClaim>> {
        let mut claims = self
            .control
            .list_claims()
            .map_err(|e| HpcError::ProvisioningFailed {
                name: "volume list".to_string(),
                detail: e.to_string(),
            })?;

        for claim in &mut claims {
            claim.is_default = is_protected_claim(&claim.name);
        }
        Ok(claims)
    }

    /// Whether a claim exists; used to warn about missing extra volumes
    pub fn claim_exists(&self, name: &str) -> Result<bool> {
        self.control
            .claim_exists(name)
            .map_err(|e| provisioning_failed(name, e))
    }
}

fn provisioning_failed(name: &str, e: ControlPlaneError) -> HpcError {
    HpcError::ProvisioningFailed {
        name: name.to_string(),
        detail: e.to_string(),
    }
}
