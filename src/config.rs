//! Application-level configuration loading for the result service.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationSeconds, serde_as};
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "REFLEX_BOARD_CONFIG_PATH";
/// Results older than this are pruned and excluded from rankings.
const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);
/// Entries returned per scope by leaderboard queries.
const DEFAULT_LEADERBOARD_SIZE: usize = 10;
const DEFAULT_KEY_PREFIX: &str = "reaction-results";
const DEFAULT_TEST_TYPE: &str = "reaction-time";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Age after which results are pruned.
    pub retention: Duration,
    /// Entries per scope in leaderboard responses.
    pub leaderboard_size: usize,
    /// Blob key prefix for result stores.
    pub key_prefix: String,
    /// Test type served by the legacy `/reaction-result` route.
    pub default_test_type: String,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        retention_secs = app_config.retention.as_secs(),
                        leaderboard_size = app_config.leaderboard_size,
                        "loaded config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Retention window in milliseconds.
    pub fn retention_ms(&self) -> i64 {
        i64::try_from(self.retention.as_millis()).unwrap_or(i64::MAX)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            retention: DEFAULT_RETENTION,
            leaderboard_size: DEFAULT_LEADERBOARD_SIZE,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            default_test_type: DEFAULT_TEST_TYPE.to_string(),
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    #[serde(default)]
    retention_secs: Option<Duration>,
    #[serde(default)]
    leaderboard_size: Option<usize>,
    #[serde(default)]
    key_prefix: Option<String>,
    #[serde(default)]
    default_test_type: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            retention: value.retention_secs.unwrap_or(defaults.retention),
            leaderboard_size: value
                .leaderboard_size
                .filter(|size| *size > 0)
                .unwrap_or(defaults.leaderboard_size),
            key_prefix: value
                .key_prefix
                .filter(|prefix| !prefix.trim().is_empty())
                .unwrap_or(defaults.key_prefix),
            default_test_type: value
                .default_test_type
                .unwrap_or(defaults.default_test_type),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let raw: RawConfig = serde_json::from_str(r#"{"retentionSecs": 3600}"#).unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.retention, Duration::from_secs(3600));
        assert_eq!(config.leaderboard_size, 10);
        assert_eq!(config.key_prefix, "reaction-results");
        assert_eq!(config.default_test_type, "reaction-time");
    }

    #[test]
    fn zero_leaderboard_size_is_ignored() {
        let raw: RawConfig = serde_json::from_str(r#"{"leaderboardSize": 0}"#).unwrap();
        assert_eq!(AppConfig::from(raw).leaderboard_size, 10);
    }

    #[test]
    fn default_retention_is_one_day() {
        assert_eq!(AppConfig::default().retention_ms(), 86_400_000);
    }
}
