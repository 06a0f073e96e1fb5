//! `pagewatch.toml` parsing.
//!
//! The file is optional and every key has a default, so an absent file or a
//! partial one both work. Values that would make the poller misbehave (zero
//! interval, zero timeouts, webhook without URL) are rejected up front.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use engine_logging::engine_info;
use log::LevelFilter;
use pagewatch_core::DiffLimits;
use pagewatch_engine::{BlockExtractor, FetchSettings, PollSettings, DEFAULT_USER_AGENT};
use serde::Deserialize;
use thiserror::Error;

use crate::logging::LogDestination;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub poll_interval_secs: u64,
    pub max_concurrent_fetches: usize,
    pub snapshot_path: PathBuf,
    pub fetch: FetchConfig,
    pub extract: ExtractConfig,
    pub diff: DiffConfig,
    pub log: LogConfig,
    pub sink: SinkConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            max_concurrent_fetches: 8,
            snapshot_path: PathBuf::from("pagewatch_state.json"),
            fetch: FetchConfig::default(),
            extract: ExtractConfig::default(),
            diff: DiffConfig::default(),
            log: LogConfig::default(),
            sink: SinkConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
    pub redirect_limit: usize,
    pub max_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let settings = FetchSettings::default();
        Self {
            request_timeout_secs: settings.request_timeout.as_secs(),
            connect_timeout_secs: settings.connect_timeout.as_secs(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            redirect_limit: settings.redirect_limit,
            max_bytes: settings.max_bytes,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// CSS selector of the monitored block.
    pub selector: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            selector: BlockExtractor::DEFAULT_SELECTOR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    pub max_lines: usize,
    pub max_chars: usize,
    pub excerpt_chars: usize,
}

impl Default for DiffConfig {
    fn default() -> Self {
        let limits = DiffLimits::default();
        Self {
            max_lines: limits.max_lines,
            max_chars: limits.max_chars,
            excerpt_chars: limits.excerpt_chars,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    /// Also write the log to this file when set.
    pub file: Option<PathBuf>,
    pub terminal: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            terminal: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Log,
    Webhook,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub kind: SinkKind,
    pub url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::Log,
            url: None,
            timeout_secs: 10,
        }
    }
}

impl AppConfig {
    /// Loads and validates `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                engine_info!("No config at {:?}, using defaults", path);
                Self::default()
            }
            Err(err) => return Err(ConfigError::Io(err)),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid("poll_interval_secs must be > 0".into()));
        }
        if self.fetch.request_timeout_secs == 0 || self.fetch.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid("fetch timeouts must be > 0".into()));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(ConfigError::Invalid("max_concurrent_fetches must be > 0".into()));
        }
        if self.diff.max_lines == 0 || self.diff.max_chars == 0 {
            return Err(ConfigError::Invalid("diff limits must be > 0".into()));
        }
        if self.sink.kind == SinkKind::Webhook && self.sink.url.is_none() {
            return Err(ConfigError::Invalid("webhook sink requires sink.url".into()));
        }
        BlockExtractor::new(&self.extract.selector)
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        self.level_filter()?;
        Ok(())
    }

    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(&self.log.level)
            .map_err(|_| ConfigError::Invalid(format!("unknown log level '{}'", self.log.level)))
    }

    pub fn log_destination(&self) -> LogDestination {
        match (&self.log.file, self.log.terminal) {
            (Some(file), true) => LogDestination::Both(file.clone()),
            (Some(file), false) => LogDestination::File(file.clone()),
            (None, _) => LogDestination::Terminal,
        }
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_secs(self.fetch.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.fetch.request_timeout_secs),
            user_agent: self.fetch.user_agent.clone(),
            redirect_limit: self.fetch.redirect_limit,
            max_bytes: self.fetch.max_bytes,
            ..FetchSettings::default()
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_concurrent_fetches: self.max_concurrent_fetches,
            diff_limits: DiffLimits {
                max_lines: self.diff.max_lines,
                max_chars: self.diff.max_chars,
                excerpt_chars: self.diff.excerpt_chars,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = AppConfig::load(&temp.path().join("nope.toml")).unwrap();
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.fetch.request_timeout_secs, 10);
        assert_eq!(config.extract.selector, "div.post");
        assert_eq!(config.poll_settings().diff_limits, DiffLimits::default());
        assert!(matches!(config.log_destination(), LogDestination::Terminal));
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let config = AppConfig::parse(
            r#"
            poll_interval_secs = 300
            snapshot_path = "/var/lib/pagewatch/state.json"

            [fetch]
            user_agent = "MyWatcher/1.0"

            [sink]
            kind = "webhook"
            url = "http://localhost:9000/hook"
            "#,
        )
        .unwrap();
        config.validate().unwrap();

        assert_eq!(config.poll_settings().interval, Duration::from_secs(300));
        assert_eq!(config.fetch_settings().user_agent, "MyWatcher/1.0");
        assert_eq!(config.fetch_settings().request_timeout, Duration::from_secs(10));
        assert_eq!(config.sink.kind, SinkKind::Webhook);
        assert_eq!(config.max_concurrent_fetches, 8);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = AppConfig::parse("poll_interval_secs = 0").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn webhook_without_url_is_rejected() {
        let config = AppConfig::parse("[sink]\nkind = \"webhook\"").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn bad_selector_and_level_are_rejected() {
        let config = AppConfig::parse("[extract]\nselector = \"div[\"").unwrap();
        assert!(config.validate().is_err());
        let config = AppConfig::parse("[log]\nlevel = \"chatty\"").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            AppConfig::parse("poll_interval_secs = "),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn log_file_without_terminal() {
        let config = AppConfig::parse("[log]\nfile = \"watch.log\"\nterminal = false").unwrap();
        assert!(matches!(config.log_destination(), LogDestination::File(_)));
    }
}
