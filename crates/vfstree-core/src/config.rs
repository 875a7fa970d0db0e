// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Configuration types for the vfstree engine

use serde::{Deserialize, Serialize};

/// Symlink substitutions permitted during one path resolution.
///
/// 40 matches the ELOOP threshold used by common kernels; the bound catches
/// both true cycles and pathological chains.
pub const MAX_SYMLINK_HOPS: u32 = 40;

/// Security policy controlling permission evaluation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SecurityPolicy {
    /// Evaluate POSIX owner/group/other bits on every access
    #[serde(rename = "enforce-posix-permissions")]
    pub enforce_posix_permissions: bool,
    /// uid 0 bypasses checks, except execute on non-executable files
    #[serde(rename = "root-bypass-permissions")]
    pub root_bypass_permissions: bool,
    /// Owner assigned to nodes created without caller credentials
    #[serde(rename = "default-uid")]
    pub default_uid: u32,
    /// Group assigned to nodes created without caller credentials
    #[serde(rename = "default-gid")]
    pub default_gid: u32,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            enforce_posix_permissions: true,
            root_bypass_permissions: true,
            default_uid: 0,
            default_gid: 0,
        }
    }
}

/// Aggregate byte ceiling installed on the root at construction
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct QuotaPolicy {
    /// `None` leaves the root unbounded
    #[serde(rename = "max-bytes")]
    pub max_bytes: Option<u64>,
}

/// Bounds on path-resolution cost
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolutionLimits {
    #[serde(rename = "max-symlink-hops")]
    pub max_symlink_hops: u32,
}

impl Default for ResolutionLimits {
    fn default() -> Self {
        Self {
            max_symlink_hops: MAX_SYMLINK_HOPS,
        }
    }
}

/// Top-level filesystem configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FsConfig {
    pub security: SecurityPolicy,
    pub quota: QuotaPolicy,
    pub resolution: ResolutionLimits,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_permissive_but_checked() {
        let config = FsConfig::default();
        assert!(config.security.enforce_posix_permissions);
        assert!(config.security.root_bypass_permissions);
        assert_eq!(config.quota.max_bytes, None);
        assert_eq!(config.resolution.max_symlink_hops, 40);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = FsConfig {
            quota: QuotaPolicy {
                max_bytes: Some(4096),
            },
            ..FsConfig::default()
        };
        let text = serde_json::to_string(&config).unwrap();
        let back: FsConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back.quota.max_bytes, Some(4096));
        assert_eq!(back.security.default_uid, config.security.default_uid);
    }
}
