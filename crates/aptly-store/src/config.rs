//! Configuration and store factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use aptly_core::store::MemoryStore;
use aptly_core::traits::KeyValueStore;

use crate::file::FileStore;

/// Environment variable that forces a file store at the given path.
pub const DATA_DIR_ENV: &str = "APTLY_DATA_DIR";

/// Which key-value backend to use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    File {
        #[serde(default = "default_data_dir")]
        path: String,
    },
    /// Process-local; everything is lost on exit.
    Memory,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File {
            path: default_data_dir(),
        }
    }
}

fn default_data_dir() -> String {
    "./aptly-data".to_string()
}

/// Top-level aptly configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AptlyConfig {
    #[serde(default)]
    pub store: StoreConfig,
    /// Recorded as `createdBy` on schedules made from the CLI.
    #[serde(default = "default_admin_name")]
    pub admin_name: String,
    /// Countdown tick period in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Session length used when a schedule is created without one.
    #[serde(default = "default_duration")]
    pub default_duration_minutes: u32,
}

fn default_admin_name() -> String {
    "admin".to_string()
}
fn default_tick_interval() -> u64 {
    1000
}
fn default_duration() -> u32 {
    30
}

impl Default for AptlyConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            admin_name: default_admin_name(),
            tick_interval_ms: default_tick_interval(),
            default_duration_minutes: default_duration(),
        }
    }
}

/// Sample configuration written by `aptly init`.
pub const SAMPLE_CONFIG: &str = r#"# aptly configuration

admin_name = "admin"
tick_interval_ms = 1000
default_duration_minutes = 30

[store]
type = "file"
path = "./aptly-data"
# Environment variables are expanded, e.g. path = "${HOME}/.local/share/aptly"
"#;

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = lookup(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `aptly.toml` in the current directory
/// 2. `~/.config/aptly/config.toml`
///
/// `APTLY_DATA_DIR` overrides the configured store.
pub fn load_config() -> Result<AptlyConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<AptlyConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("aptly.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = toml::from_str::<AptlyConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        None => AptlyConfig::default(),
    };

    Ok(apply_env(config, &|name| std::env::var(name).ok()))
}

/// Apply the data-dir override and expand `${VAR}` references.
fn apply_env(mut config: AptlyConfig, lookup: &dyn Fn(&str) -> Option<String>) -> AptlyConfig {
    if let Some(dir) = lookup(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
        config.store = StoreConfig::File { path: dir };
    }
    if let StoreConfig::File { path } = &mut config.store {
        *path = resolve_env_vars(path, lookup);
    }
    config
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("aptly"))
}

/// Create a store instance from its configuration.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn KeyValueStore>> {
    match config {
        StoreConfig::File { path } => {
            let store = FileStore::open(path)
                .with_context(|| format!("failed to open data directory: {path}"))?;
            Ok(Arc::new(store))
        }
        StoreConfig::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn resolve_env_vars_basic() {
        let lookup = env(&[("APTLY_TEST_VAR", "hello")]);
        assert_eq!(resolve_env_vars("${APTLY_TEST_VAR}", &lookup), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${APTLY_TEST_VAR}_suffix", &lookup),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("${MISSING}/x", &lookup), "/x");
        assert_eq!(resolve_env_vars("${unclosed", &lookup), "${unclosed");
    }

    #[test]
    fn default_config() {
        let config = AptlyConfig::default();
        assert_eq!(config.admin_name, "admin");
        assert_eq!(config.tick_interval_ms, 1000);
        assert_eq!(config.default_duration_minutes, 30);
        assert_eq!(
            config.store,
            StoreConfig::File {
                path: "./aptly-data".into()
            }
        );
    }

    #[test]
    fn sample_config_parses() {
        let config: AptlyConfig = toml::from_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.admin_name, "admin");
        assert!(matches!(config.store, StoreConfig::File { .. }));
    }

    #[test]
    fn parse_store_variants() {
        let config: AptlyConfig = toml::from_str(
            r#"
admin_name = "registrar"

[store]
type = "memory"
"#,
        )
        .unwrap();
        assert_eq!(config.store, StoreConfig::Memory);
        assert_eq!(config.admin_name, "registrar");

        let config: AptlyConfig = toml::from_str("[store]\ntype = \"file\"\n").unwrap();
        assert_eq!(
            config.store,
            StoreConfig::File {
                path: "./aptly-data".into()
            }
        );
    }

    #[test]
    fn data_dir_env_overrides_store() {
        let config = AptlyConfig {
            store: StoreConfig::Memory,
            ..AptlyConfig::default()
        };
        let config = apply_env(config, &env(&[(DATA_DIR_ENV, "/srv/aptly")]));
        assert_eq!(
            config.store,
            StoreConfig::File {
                path: "/srv/aptly".into()
            }
        );
    }

    #[test]
    fn file_path_expands_env_vars() {
        let config = AptlyConfig {
            store: StoreConfig::File {
                path: "${DATA_HOME}/aptly".into(),
            },
            ..AptlyConfig::default()
        };
        let config = apply_env(config, &env(&[("DATA_HOME", "/var/lib")]));
        assert_eq!(
            config.store,
            StoreConfig::File {
                path: "/var/lib/aptly".into()
            }
        );
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let err = load_config_from(Some(Path::new("/nonexistent/aptly.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn open_file_store_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::File {
            path: dir.path().join("data").display().to_string(),
        };
        let store = open_store(&config).unwrap();
        store.set("users", "[]".into()).unwrap();
        assert!(dir.path().join("data").join("users.json").exists());
    }
}
