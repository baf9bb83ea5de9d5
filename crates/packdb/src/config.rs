use std::path::{Path, PathBuf};

use packdb_store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Global hits between two priority resorts.
pub const DEFAULT_SORT_INTERVAL: u64 = 500;

/// Errors from loading or validating a [`PackedDbConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("sort_interval must be at least 1")]
    ZeroSortInterval,

    #[error("archive extension must not be empty")]
    EmptyExtension,
}

impl From<ConfigError> for StoreError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(e) => StoreError::Io(e),
            other => StoreError::InvalidConfig(other.to_string()),
        }
    }
}

/// Which files in the root directory are archives: `<prefix>*.<extension>`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveNaming {
    pub prefix: String,
    pub extension: String,
}

impl Default for ArchiveNaming {
    fn default() -> Self {
        Self {
            prefix: "pack-".into(),
            extension: "pack".into(),
        }
    }
}

impl ArchiveNaming {
    /// Returns `true` if `file_name` follows the archive naming convention.
    pub fn matches(&self, file_name: &str) -> bool {
        file_name
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_suffix(self.extension.as_str()))
            .is_some_and(|stem| stem.ends_with('.'))
    }
}

/// Configuration for a [`PackedDb`](crate::PackedDb).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedDbConfig {
    /// Directory holding the archives.
    pub root: PathBuf,
    /// Successful lookups between two resorts of the priority list.
    #[serde(default = "default_sort_interval")]
    pub sort_interval: u64,
    #[serde(default)]
    pub naming: ArchiveNaming,
}

fn default_sort_interval() -> u64 {
    DEFAULT_SORT_INTERVAL
}

impl Default for PackedDbConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            sort_interval: DEFAULT_SORT_INTERVAL,
            naming: ArchiveNaming::default(),
        }
    }
}

impl PackedDbConfig {
    /// Default configuration over the given archive directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    pub fn with_sort_interval(mut self, sort_interval: u64) -> Self {
        self.sort_interval = sort_interval;
        self
    }

    pub fn with_naming(mut self, naming: ArchiveNaming) -> Self {
        self.naming = naming;
        self
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sort_interval == 0 {
            return Err(ConfigError::ZeroSortInterval);
        }
        if self.naming.extension.is_empty() {
            return Err(ConfigError::EmptyExtension);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = PackedDbConfig::default();
        assert_eq!(c.root, PathBuf::from("."));
        assert_eq!(c.sort_interval, 500);
        assert_eq!(c.naming.prefix, "pack-");
        assert_eq!(c.naming.extension, "pack");
        c.validate().unwrap();
    }

    #[test]
    fn naming_matches_pack_files_only() {
        let naming = ArchiveNaming::default();
        assert!(naming.matches("pack-1234.pack"));
        assert!(naming.matches("pack-.pack"));
        assert!(!naming.matches("pack-1234.idx"));
        assert!(!naming.matches("pack-1234.pack.tmp"));
        assert!(!naming.matches("other-1234.pack"));
        assert!(!naming.matches("pack-1234pack"));
        assert!(!naming.matches("pack.pack"));
    }

    #[test]
    fn toml_uses_defaults_for_missing_fields() {
        let c = PackedDbConfig::from_toml_str(r#"root = "/var/lib/objects/pack""#).unwrap();
        assert_eq!(c.root, PathBuf::from("/var/lib/objects/pack"));
        assert_eq!(c.sort_interval, DEFAULT_SORT_INTERVAL);
        assert_eq!(c.naming, ArchiveNaming::default());
    }

    #[test]
    fn toml_overrides() {
        let c = PackedDbConfig::from_toml_str(
            r#"
            root = "objects"
            sort_interval = 64

            [naming]
            prefix = "archive-"
            extension = "arc"
            "#,
        )
        .unwrap();
        assert_eq!(c.sort_interval, 64);
        assert!(c.naming.matches("archive-01.arc"));
    }

    #[test]
    fn zero_sort_interval_rejected() {
        let err = PackedDbConfig::from_toml_str("root = \"x\"\nsort_interval = 0").unwrap_err();
        assert!(matches!(err, ConfigError::ZeroSortInterval));
    }

    #[test]
    fn invalid_settings_map_to_store_errors() {
        let err: StoreError = ConfigError::EmptyExtension.into();
        assert!(matches!(err, StoreError::InvalidConfig(_)));
        let io = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert!(matches!(StoreError::from(ConfigError::Io(io)), StoreError::Io(_)));
    }

    #[test]
    fn missing_root_rejected() {
        let err = PackedDbConfig::from_toml_str("sort_interval = 5").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packdb.toml");
        std::fs::write(&path, "root = \"objects/pack\"\nsort_interval = 10\n").unwrap();
        let c = PackedDbConfig::load(&path).unwrap();
        assert_eq!(c, PackedDbConfig::new("objects/pack").with_sort_interval(10));
    }
}
