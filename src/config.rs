use crate::error::ConfigError;
use crate::pagination::DEFAULT_PAGE_SIZE;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "archive-timeline";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Records revealed per page of the timeline.
    pub page_size: usize,
    /// IANA zone used for display timestamps and calendar-day filters.
    pub display_timezone: String,
    /// Parent of the cache database directory. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
    pub log_level: String,
    /// Fragments read at the same time during ingest.
    pub read_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            display_timezone: "Asia/Tokyo".to_string(),
            data_dir: None,
            log_level: "info".to_string(),
            read_concurrency: 4,
        }
    }
}

impl Config {
    /// Defaults, then the config file if any, then `ARCHIVE_TIMELINE_*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = match config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        cfg.apply_env(|var| env::var(var).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(n) = get("ARCHIVE_TIMELINE_PAGE_SIZE").and_then(|v| v.parse().ok()) {
            self.page_size = n;
        }
        if let Some(tz) = get("ARCHIVE_TIMELINE_DISPLAY_TZ") {
            self.display_timezone = tz;
        }
        if let Some(dir) = get("ARCHIVE_TIMELINE_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = get("ARCHIVE_TIMELINE_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(n) = get("ARCHIVE_TIMELINE_READ_CONCURRENCY").and_then(|v| v.parse().ok()) {
            self.read_concurrency = n;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid(
                "page_size must be at least 1".to_string(),
            ));
        }
        if self.read_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "read_concurrency must be at least 1".to_string(),
            ));
        }
        self.display_tz()?;
        Ok(())
    }

    pub fn display_tz(&self) -> Result<Tz, ConfigError> {
        self.display_timezone.parse::<Tz>().map_err(|_| {
            ConfigError::Invalid(format!(
                "unknown display_timezone `{}`",
                self.display_timezone
            ))
        })
    }

    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join(APP_DIR)))
            .unwrap_or_else(|| PathBuf::from(".").join(APP_DIR))
    }
}

fn config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("ARCHIVE_TIMELINE_CONFIG") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.page_size, 100);
        assert_eq!(cfg.display_tz().unwrap(), chrono_tz::Asia::Tokyo);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "page_size = 25\ndisplay_timezone = \"UTC\"\n").unwrap();

        let cfg = Config::from_file(&path).unwrap();
        assert_eq!(cfg.page_size, 25);
        assert_eq!(cfg.display_tz().unwrap(), chrono_tz::UTC);
        assert_eq!(cfg.read_concurrency, 4);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn test_malformed_file_is_reported() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "page_size = \"many\"").unwrap();
        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("ARCHIVE_TIMELINE_PAGE_SIZE", "50"),
            ("ARCHIVE_TIMELINE_DISPLAY_TZ", " Europe/Berlin "),
            ("ARCHIVE_TIMELINE_DATA_DIR", "/tmp/archive"),
            ("ARCHIVE_TIMELINE_READ_CONCURRENCY", "not-a-number"),
            ("ARCHIVE_TIMELINE_LOG_LEVEL", ""),
        ]);
        let mut cfg = Config::default();
        cfg.apply_env(|var| vars.get(var).map(|v| v.to_string()));

        assert_eq!(cfg.page_size, 50);
        assert_eq!(cfg.display_timezone, "Europe/Berlin");
        assert_eq!(cfg.resolved_data_dir(), PathBuf::from("/tmp/archive"));
        assert_eq!(cfg.read_concurrency, 4);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cfg = Config {
            page_size: 0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = Config {
            display_timezone: "Mars/Olympus".to_string(),
            ..Config::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }
}
