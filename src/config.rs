//! Bot configuration and environment variable handling.
//!
//! All tunables of the distribution pipeline live in one immutable
//! [`BotConfig`] value that is passed into each component's constructor.
//! Configuration can be loaded from environment variables or from a
//! `classbot.toml` file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Error produced while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(String),

    #[error("Failed to parse config file: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Immutable runtime configuration for the distribution pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// URL of the school website page publishing the weekly lesson tables
    pub schedule_url: String,
    /// Keyword identifying day headings on the schedule page
    #[serde(default = "default_heading_keyword")]
    pub heading_keyword: String,
    /// Token marking a channel message as a homework post
    #[serde(default = "default_homework_marker")]
    pub homework_marker: String,
    /// Phrase printed before the attachment link list in a digest section
    #[serde(default = "default_attachment_phrase")]
    pub attachment_phrase: String,
    /// Emoji users press to request a homework refresh on a posted digest
    #[serde(default = "default_refresh_emoji")]
    pub refresh_emoji: String,
    /// Minutes between daily distribution ticks
    #[serde(default = "default_distribution_interval_min")]
    pub distribution_interval_min: u64,
    /// Hours between weekly distribution ticks
    #[serde(default = "default_weekly_interval_hours")]
    pub weekly_interval_hours: u64,
    /// Maximum number of messages scanned per channel history read
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Timeout for the schedule page request, in seconds
    #[serde(default = "default_http_timeout_sec")]
    pub http_timeout_sec: u64,
}

fn default_heading_keyword() -> String {
    "Schedule".to_string()
}

fn default_homework_marker() -> String {
    "hw".to_string()
}

fn default_attachment_phrase() -> String {
    "Attached files:".to_string()
}

fn default_refresh_emoji() -> String {
    "\u{1F504}".to_string()
}

fn default_distribution_interval_min() -> u64 {
    15
}

fn default_weekly_interval_hours() -> u64 {
    12
}

fn default_history_limit() -> usize {
    200
}

fn default_http_timeout_sec() -> u64 {
    30
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            schedule_url: String::new(),
            heading_keyword: default_heading_keyword(),
            homework_marker: default_homework_marker(),
            attachment_phrase: default_attachment_phrase(),
            refresh_emoji: default_refresh_emoji(),
            distribution_interval_min: default_distribution_interval_min(),
            weekly_interval_hours: default_weekly_interval_hours(),
            history_limit: default_history_limit(),
            http_timeout_sec: default_http_timeout_sec(),
        }
    }
}

impl BotConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `SCHEDULE_URL` (required): URL of the schedule page
    /// - `SCHEDULE_HEADING_KEYWORD` (optional, default: "Schedule")
    /// - `HOMEWORK_MARKER` (optional, default: "hw")
    /// - `REFRESH_EMOJI` (optional, default: 🔄)
    /// - `DISTRIBUTION_INTERVAL_MIN` (optional, default: 15)
    /// - `WEEKLY_INTERVAL_HOURS` (optional, default: 12)
    /// - `HISTORY_LIMIT` (optional, default: 200)
    /// - `HTTP_TIMEOUT_SEC` (optional, default: 30)
    ///
    /// # Errors
    /// Returns an error if required variables are not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let schedule_url = std::env::var("SCHEDULE_URL")
            .map_err(|_| ConfigError::Invalid("SCHEDULE_URL environment variable not set".into()))?;

        let mut config = Self {
            schedule_url,
            ..Default::default()
        };

        if let Ok(v) = std::env::var("SCHEDULE_HEADING_KEYWORD") {
            config.heading_keyword = v;
        }
        if let Ok(v) = std::env::var("HOMEWORK_MARKER") {
            config.homework_marker = v;
        }
        if let Ok(v) = std::env::var("REFRESH_EMOJI") {
            config.refresh_emoji = v;
        }
        if let Some(v) = parse_env("DISTRIBUTION_INTERVAL_MIN") {
            config.distribution_interval_min = v;
        }
        if let Some(v) = parse_env("WEEKLY_INTERVAL_HOURS") {
            config.weekly_interval_hours = v;
        }
        if let Some(v) = parse_env("HISTORY_LIMIT") {
            config.history_limit = v;
        }
        if let Some(v) = parse_env("HTTP_TIMEOUT_SEC") {
            config.http_timeout_sec = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: BotConfig =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default location, falling back to env.
    ///
    /// Searches for `classbot.toml` in the current and parent directory.
    pub fn from_default_location() -> Result<Self, ConfigError> {
        let search_paths = [
            PathBuf::from("classbot.toml"),
            PathBuf::from("../classbot.toml"),
        ];

        for path in &search_paths {
            if path.exists() {
                return Self::from_file(path);
            }
        }

        Self::from_env()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.schedule_url.is_empty() {
            return Err(ConfigError::Invalid("schedule_url must not be empty".into()));
        }
        if self.homework_marker.is_empty() {
            return Err(ConfigError::Invalid(
                "homework_marker must not be empty".into(),
            ));
        }
        if self.distribution_interval_min == 0 {
            return Err(ConfigError::Invalid(
                "distribution_interval_min must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Interval between daily distribution ticks.
    pub fn distribution_interval(&self) -> Duration {
        Duration::from_secs(self.distribution_interval_min * 60)
    }

    /// Interval between weekly distribution ticks.
    pub fn weekly_interval(&self) -> Duration {
        Duration::from_secs(self.weekly_interval_hours * 3600)
    }

    /// Timeout applied to the schedule page request.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_sec)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_toml() {
        let toml = r#"
schedule_url = "https://school.example/timetable"
"#;
        let config: BotConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.schedule_url, "https://school.example/timetable");
        assert_eq!(config.heading_keyword, "Schedule");
        assert_eq!(config.distribution_interval_min, 15);
        assert_eq!(config.history_limit, 200);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
schedule_url = "https://school.example/timetable"
heading_keyword = "Timetable"
homework_marker = "homework"
refresh_emoji = "♻"
distribution_interval_min = 30
weekly_interval_hours = 6
history_limit = 50
http_timeout_sec = 10
"#;
        let config: BotConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.heading_keyword, "Timetable");
        assert_eq!(config.homework_marker, "homework");
        assert_eq!(config.distribution_interval().as_secs(), 30 * 60);
        assert_eq!(config.weekly_interval().as_secs(), 6 * 3600);
        assert_eq!(config.history_limit, 50);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "schedule_url = \"https://school.example/tt\"").unwrap();

        let config = BotConfig::from_file(file.path()).unwrap();
        assert_eq!(config.schedule_url, "https://school.example/tt");
    }

    #[test]
    fn test_empty_url_rejected() {
        let config = BotConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = BotConfig {
            schedule_url: "https://school.example".into(),
            distribution_interval_min: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
