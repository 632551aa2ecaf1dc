//! Naming rules for claims and workloads
//!
//! Every partition owns one default claim whose name is derived from the
//! partition name. The derived names carry a marker substring, and any name
//! containing that marker is treated as protected. The check is a plain
//! substring match; `is_protected_claim` is the single place that decides it.

use crate::error::{HpcError, Result};

/// Substring that marks a claim as a partition default
pub const DEFAULT_CLAIM_MARKER: &str = "-default-pvc";

/// Suffix of the storage class backing a partition's default claim
pub const DEFAULT_STORAGE_CLASS_SUFFIX: &str = "-default-sc";

/// Longest object name the control plane accepts
const MAX_NAME_LEN: usize = 253;

const DNS_SUBDOMAIN: &str = r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$";

const QUANTITY: &str = r"^[0-9]+(\.[0-9]+)?(Ki|Mi|Gi|Ti|Pi|Ei|k|M|G|T|P|E)?$";

/// Partition name with underscores replaced by hyphens
fn partition_slug(partition: &str) -> String {
    partition.replace('_', "-")
}

/// Name of the default claim for a partition
///
/// Not injective: `a_b` and `a-b` produce the same name.
pub fn default_claim_name(partition: &str) -> String {
    format!("{}{}", partition_slug(partition), DEFAULT_CLAIM_MARKER)
}

/// Storage class used for a partition's default claim
pub fn default_storage_class(partition: &str) -> String {
    format!("{}{}", partition_slug(partition), DEFAULT_STORAGE_CLASS_SUFFIX)
}

/// Whether user-initiated create/delete must refuse this name
pub fn is_protected_claim(name: &str) -> bool {
    name.contains(DEFAULT_CLAIM_MARKER)
}

/// Check that `name` is a valid object name (lowercase DNS subdomain)
pub fn validate_object_name(kind: &str, name: &str) -> Result<()> {
    let valid = name.len() <= MAX_NAME_LEN
        && regex::Regex::new(DNS_SUBDOMAIN)
            .map(|r| r.is_match(name))
            .unwrap_or(false);

    if !valid {
        return Err(HpcError::ValidationFailed(format!(
            "invalid {} name '{}': use lowercase letters, digits, '-' and '.', starting and ending with a letter or digit",
            kind, name
        )));
    }
    Ok(())
}

/// Check that `size` is a storage quantity such as `10Gi` or `500Mi`
pub fn validate_quantity(size: &str) -> Result<()> {
    let valid = regex::Regex::new(QUANTITY)
        .map(|r| r.is_match(size))
        .unwrap_or(false);

    if !valid {
        return Err(HpcError::ValidationFailed(format!(
            "invalid size '{}': expected a quantity with units, e.g. 10Gi",
            size
        )));
    }
    Ok(())
}
