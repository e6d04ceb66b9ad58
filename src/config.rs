//! Declarative configuration for a [`crate::block_pool::BlockPool`] and the
//! [`crate::memory_fs::MemoryFileSystem`] instances built over it, loaded
//! from TOML (spec §2.3's ambient config layer).

use serde::Deserialize;

use crate::entry::{CaseSensitivity, EmptyDirectoryName};
use crate::error::{Error, Result};

/// Sizing for one [`crate::block_pool::BlockPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockPoolConfig {
    /// Bytes per block.
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    /// Total blocks the pool will ever allocate before `outOfSpace`.
    #[serde(default = "default_max_blocks")]
    pub max_blocks: usize,
    /// Capacity of the bounded free-list reuse queue.
    #[serde(default = "default_max_free_queue")]
    pub max_free_queue: usize,
}

fn default_block_size() -> usize {
    1024
}

fn default_max_blocks() -> usize {
    4096
}

fn default_max_free_queue() -> usize {
    256
}

impl Default for BlockPoolConfig {
    fn default() -> Self {
        Self {
            block_size: default_block_size(),
            max_blocks: default_max_blocks(),
            max_free_queue: default_max_free_queue(),
        }
    }
}

fn default_case_sensitive() -> bool {
    true
}

fn default_allow_empty_directory_name() -> bool {
    false
}

/// Construction parameters for one [`crate::memory_fs::MemoryFileSystem`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryFileSystemConfig {
    #[serde(default)]
    pub block_pool: BlockPoolConfig,
    #[serde(default = "default_case_sensitive")]
    pub case_sensitive: bool,
    #[serde(default = "default_allow_empty_directory_name")]
    pub allow_empty_directory_name: bool,
}

impl Default for MemoryFileSystemConfig {
    fn default() -> Self {
        Self {
            block_pool: BlockPoolConfig::default(),
            case_sensitive: default_case_sensitive(),
            allow_empty_directory_name: default_allow_empty_directory_name(),
        }
    }
}

impl MemoryFileSystemConfig {
    pub fn case_sensitivity(&self) -> CaseSensitivity {
        if self.case_sensitive {
            CaseSensitivity::CaseSensitive
        } else {
            CaseSensitivity::CaseInsensitive
        }
    }

    pub fn empty_directory_name(&self) -> EmptyDirectoryName {
        if self.allow_empty_directory_name {
            EmptyDirectoryName::Allowed
        } else {
            EmptyDirectoryName::Forbidden
        }
    }
}

/// One named backend to construct and, optionally, mount at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    pub name: String,
    #[serde(default)]
    pub memory_fs: MemoryFileSystemConfig,
    /// Path this backend is mounted at in the composed [`crate::virtual_fs::VirtualFileSystem`].
    pub mount_path: Option<String>,
}

/// Top-level configuration: every backend a process should construct, and
/// where in the virtual namespace each one lands.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct VfsConfig {
    #[serde(default)]
    pub backends: Vec<BackendConfig>,
}

impl VfsConfig {
    /// Parses a TOML document into a [`VfsConfig`].
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::InvalidConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_pool_config_defaults_match_the_quota_exhaustion_scenario_shape() {
        let config = BlockPoolConfig::default();
        assert_eq!(config.block_size, 1024);
    }

    #[test]
    fn quota_scenario_pool_parses_from_toml() {
        let toml = r#"
            [[backends]]
            name = "primary"
            mount_path = "/data"

            [backends.memory_fs.block_pool]
            block_size = 1024
            max_blocks = 3
            max_free_queue = 3
        "#;
        let config = VfsConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.backends.len(), 1);
        let backend = &config.backends[0];
        assert_eq!(backend.name, "primary");
        assert_eq!(backend.mount_path.as_deref(), Some("/data"));
        assert_eq!(backend.memory_fs.block_pool.max_blocks, 3);
        assert!(backend.memory_fs.case_sensitive);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let toml = r#"
            [[backends]]
            name = "primary"
            bogus_field = true
        "#;
        assert!(VfsConfig::from_toml_str(toml).is_err());
    }
}
