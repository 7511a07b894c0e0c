//! Configuration snapshot and typed module-config access.
//!
//! The composition root merges configuration sources (programmatic defaults,
//! a YAML file, prefixed environment variables) into one immutable snapshot
//! via figment, with later sources winning. Modules never see the sources —
//! only their own raw JSON section, addressed as `modules.<name>`, through
//! the [`ConfigProvider`] trait.
//!
//! Two loading styles sit on top of the provider:
//!
//! 1. **Lenient** ([`module_config_or_default`]): falls back to
//!    `T::default()` when the section is missing, so modules can exist
//!    without a config entry.
//! 2. **Strict** ([`module_config_required`]): errors when the section is
//!    missing or invalid, for modules that cannot run unconfigured.

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Configuration error for typed config operations.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("module '{module}' has no configuration section")]
    ModuleNotFound { module: String },
    #[error("invalid config for module '{module}': {source}")]
    InvalidConfig {
        module: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Provider of module-specific configuration (raw JSON sections only).
pub trait ConfigProvider: Send + Sync {
    /// Returns the raw JSON section for the module, if any.
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value>;
}

/// Lenient configuration loader that falls back to defaults.
///
/// - Module absent from config → `Ok(T::default())`
/// - Section present but invalid → `Err(ConfigError::InvalidConfig)`
///
/// # Errors
/// Returns `ConfigError::InvalidConfig` if the section exists but cannot be
/// deserialized into `T`.
pub fn module_config_or_default<T: DeserializeOwned + Default>(
    provider: &dyn ConfigProvider,
    module_name: &str,
) -> Result<T, ConfigError> {
    let Some(section) = provider.get_module_config(module_name) else {
        return Ok(T::default());
    };

    serde_json::from_value(section.clone()).map_err(|e| ConfigError::InvalidConfig {
        module: module_name.to_owned(),
        source: e,
    })
}

/// Strict configuration loader that requires the section to be present.
///
/// # Errors
/// Returns `ConfigError::ModuleNotFound` when the module has no section and
/// `ConfigError::InvalidConfig` when the section cannot be deserialized.
pub fn module_config_required<T: DeserializeOwned>(
    provider: &dyn ConfigProvider,
    module_name: &str,
) -> Result<T, ConfigError> {
    let section =
        provider
            .get_module_config(module_name)
            .ok_or_else(|| ConfigError::ModuleNotFound {
                module: module_name.to_owned(),
            })?;

    serde_json::from_value(section.clone()).map_err(|e| ConfigError::InvalidConfig {
        module: module_name.to_owned(),
        source: e,
    })
}

/// Ordered set of configuration sources, merged later-wins into a
/// [`ConfigSnapshot`] by the composition root.
#[derive(Default)]
pub struct ConfigSources {
    defaults: Option<serde_json::Value>,
    file: Option<PathBuf>,
    env_prefix: Option<String>,
}

impl ConfigSources {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Programmatic defaults, lowest precedence.
    #[must_use]
    pub fn with_defaults(mut self, defaults: serde_json::Value) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// A YAML file, overriding defaults. Missing files merge as empty.
    #[must_use]
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Environment variables with the given prefix, highest precedence.
    /// Nesting uses `__` (e.g. `APP_MODULES__CACHE__SIZE`).
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Merge all sources into one immutable snapshot.
    ///
    /// # Errors
    /// Returns the figment error when a source fails to parse or the merged
    /// document cannot be extracted.
    pub fn merge(self) -> Result<ConfigSnapshot, figment::Error> {
        let mut figment = Figment::new();
        if let Some(defaults) = self.defaults {
            figment = figment.merge(Serialized::defaults(defaults));
        }
        if let Some(file) = &self.file {
            figment = figment.merge(Yaml::file(file));
        }
        if let Some(prefix) = &self.env_prefix {
            figment = figment.merge(Env::prefixed(prefix).split("__"));
        }

        let root: serde_json::Value = figment.extract()?;
        Ok(ConfigSnapshot { root })
    }
}

/// Immutable merged configuration, created once at startup.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    root: serde_json::Value,
}

impl ConfigSnapshot {
    /// Snapshot over an already-merged document. Test and embedding helper.
    #[must_use]
    pub fn from_value(root: serde_json::Value) -> Self {
        Self { root }
    }

    /// The whole merged document.
    #[must_use]
    pub fn root(&self) -> &serde_json::Value {
        &self.root
    }
}

impl ConfigProvider for ConfigSnapshot {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
        self.root.get("modules")?.get(module_name)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::{
        module_config_or_default, module_config_required, ConfigError, ConfigProvider,
        ConfigSnapshot, ConfigSources,
    };
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::io::Write;

    #[derive(Debug, PartialEq, Deserialize, Serialize, Default)]
    struct CacheConfig {
        #[serde(default)]
        size: u64,
        #[serde(default)]
        eviction: String,
    }

    fn snapshot(modules: serde_json::Value) -> ConfigSnapshot {
        ConfigSnapshot::from_value(json!({ "modules": modules }))
    }

    #[test]
    fn snapshot_exposes_module_sections() {
        let snap = snapshot(json!({ "cache": { "size": 10 } }));
        assert_eq!(
            snap.get_module_config("cache").unwrap(),
            &json!({ "size": 10 })
        );
        assert!(snap.get_module_config("missing").is_none());
        assert_eq!(snap.root()["modules"]["cache"]["size"], 10);
    }

    #[test]
    fn lenient_loader_defaults_when_section_missing() {
        let snap = snapshot(json!({}));
        let cfg: CacheConfig = module_config_or_default(&snap, "cache").unwrap();
        assert_eq!(cfg, CacheConfig::default());
    }

    #[test]
    fn lenient_loader_errors_on_invalid_section() {
        let snap = snapshot(json!({ "cache": { "size": "not a number" } }));
        let err = module_config_or_default::<CacheConfig>(&snap, "cache").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig { .. }));
    }

    #[test]
    fn strict_loader_requires_section() {
        let snap = snapshot(json!({}));
        let err = module_config_required::<CacheConfig>(&snap, "cache").unwrap_err();
        assert!(matches!(err, ConfigError::ModuleNotFound { .. }));
    }

    #[test]
    fn strict_loader_parses_present_section() {
        let snap = snapshot(json!({ "cache": { "size": 64, "eviction": "lru" } }));
        let cfg: CacheConfig = module_config_required(&snap, "cache").unwrap();
        assert_eq!(cfg.size, 64);
        assert_eq!(cfg.eviction, "lru");
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "modules:\n  cache:\n    size: 128\n"
        )
        .unwrap();

        let snap = ConfigSources::new()
            .with_defaults(json!({
                "modules": { "cache": { "size": 1, "eviction": "lru" } }
            }))
            .with_file(file.path())
            .merge()
            .unwrap();

        let cfg: CacheConfig = module_config_required(&snap, "cache").unwrap();
        assert_eq!(cfg.size, 128);
        assert_eq!(cfg.eviction, "lru");
    }

    #[test]
    fn env_overrides_file_and_defaults() {
        temp_env::with_var("APPTEST_MODULES__CACHE__EVICTION", Some("lfu"), || {
            let snap = ConfigSources::new()
                .with_defaults(json!({
                    "modules": { "cache": { "size": 1, "eviction": "lru" } }
                }))
                .with_env_prefix("APPTEST_")
                .merge()
                .unwrap();

            let cfg: CacheConfig = module_config_required(&snap, "cache").unwrap();
            assert_eq!(cfg.eviction, "lfu");
            assert_eq!(cfg.size, 1);
        });
    }

    #[test]
    fn missing_file_merges_as_empty() {
        let snap = ConfigSources::new()
            .with_defaults(json!({ "modules": { "cache": { "size": 2 } } }))
            .with_file("/definitely/not/there.yaml")
            .merge()
            .unwrap();

        let cfg: CacheConfig = module_config_or_default(&snap, "cache").unwrap();
        assert_eq!(cfg.size, 2);
    }
}
