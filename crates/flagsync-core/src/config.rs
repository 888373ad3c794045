//! Configuration loading for the offline queue.

use std::{env, fs, io::ErrorKind, path::Path, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::domain::ConfigError;

/// Default location on disk where the config is looked up.
const DEFAULT_CONFIG_PATH: &str = "config/flagsync.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "FLAGSYNC_CONFIG_PATH";

const DEFAULT_NAMESPACE: &str = "flagsync.penalties";
const DEFAULT_STORAGE_DIR: &str = ".flagsync";
const DEFAULT_DELIVERY_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
/// Runtime configuration for the queue, probe and transport.
pub struct SyncConfig {
    /// Key prefix for the queue file; keeps it apart from unrelated data.
    pub namespace: String,
    pub storage_dir: PathBuf,
    /// Where records are POSTed. `None` means no HTTP transport is built.
    pub endpoint: Option<String>,
    pub delivery_timeout_ms: u64,
    /// Optional retry cap; records at the cap are parked, never dropped.
    pub max_attempts: Option<u32>,
    pub probe: Option<ProbeConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
/// Reachability probe settings.
pub struct ProbeConfig {
    /// `host:port` to connect to.
    pub target: String,
    #[serde(default = "default_probe_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_probe_interval_ms() -> u64 {
    5_000
}

fn default_probe_timeout_ms() -> u64 {
    2_000
}

impl ProbeConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            endpoint: None,
            delivery_timeout_ms: DEFAULT_DELIVERY_TIMEOUT_MS,
            max_attempts: None,
            probe: None,
        }
    }
}

impl SyncConfig {
    /// Load from [`CONFIG_PATH_ENV`] or [`DEFAULT_CONFIG_PATH`], falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&resolve_config_path())
    }

    /// Load from `path`. Missing, unreadable or invalid files log and yield defaults.
    pub fn load_from(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                return Self::default();
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                return Self::default();
            }
        };

        let config = match serde_json::from_str::<Self>(&contents) {
            Ok(config) => config,
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to parse config; falling back to defaults"
                );
                return Self::default();
            }
        };

        match config.validate() {
            Ok(()) => {
                info!(
                    path = %path.display(),
                    namespace = %config.namespace,
                    "loaded sync config"
                );
                config
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "invalid config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_namespace(&self.namespace)?;
        if self.delivery_timeout_ms == 0 {
            return Err(ConfigError::Zero {
                field: "delivery_timeout_ms",
            });
        }
        if self.max_attempts == Some(0) {
            return Err(ConfigError::Zero {
                field: "max_attempts",
            });
        }
        if let Some(probe) = &self.probe {
            if probe.interval_ms == 0 {
                return Err(ConfigError::Zero {
                    field: "probe.interval_ms",
                });
            }
            if probe.timeout_ms == 0 {
                return Err(ConfigError::Zero {
                    field: "probe.timeout_ms",
                });
            }
        }
        Ok(())
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_timeout_ms)
    }
}

/// Namespaces become file names, so only a safe charset is allowed.
pub fn validate_namespace(namespace: &str) -> Result<(), ConfigError> {
    let valid = !namespace.is_empty()
        && !namespace.starts_with('.')
        && namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidNamespace(namespace.to_string()))
    }
}

fn resolve_config_path() -> PathBuf {
    env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = SyncConfig::load_from(&dir.path().join("nope.json"));
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flagsync.json");
        fs::write(
            &path,
            r#"{
                "namespace": "rmac.crew7",
                "endpoint": "http://localhost:3000/api/penalties",
                "max_attempts": 10,
                "probe": { "target": "localhost:3000" }
            }"#,
        )
        .unwrap();

        let config = SyncConfig::load_from(&path);
        assert_eq!(config.namespace, "rmac.crew7");
        assert_eq!(config.max_attempts, Some(10));
        assert_eq!(config.storage_dir, PathBuf::from(DEFAULT_STORAGE_DIR));
        let probe = config.probe.unwrap();
        assert_eq!(probe.interval(), Duration::from_secs(5));
        assert_eq!(probe.timeout(), Duration::from_secs(2));
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flagsync.json");
        fs::write(&path, r#"{ "namespace": "../../etc" }"#).unwrap();

        assert_eq!(SyncConfig::load_from(&path), SyncConfig::default());
    }

    #[rstest]
    #[case::dotted("rmac.penalties", true)]
    #[case::dashes_and_underscores("crew_7-back", true)]
    #[case::empty("", false)]
    #[case::traversal("../x", false)]
    #[case::hidden(".hidden", false)]
    #[case::slash("a/b", false)]
    #[case::space("a b", false)]
    fn namespace_validation(#[case] namespace: &str, #[case] ok: bool) {
        assert_eq!(validate_namespace(namespace).is_ok(), ok);
    }

    #[test]
    fn zero_retry_cap_is_rejected() {
        let config = SyncConfig {
            max_attempts: Some(0),
            ..SyncConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Zero { field: "max_attempts" })
        ));
    }
}
