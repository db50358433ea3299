//! TOML-based application configuration.
//!
//! Stores:
//! - Scheduled trigger times
//! - Daily goal and progress bar shape
//! - AI endpoints, models, timeouts and persona
//! - Challenge defaults
//! - The point catalog
//!
//! Configuration is stored at `~/.config/dailyforge/config.toml`.
//! Credentials never live here; they come from the environment.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use super::{data_dir, DATE_FORMAT};
use crate::catalog::Catalog;
use crate::error::ConfigError;

/// Times of the three daily triggers, `HH:MM` local time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_morning")]
    pub morning: String,
    #[serde(default = "default_midday")]
    pub midday: String,
    #[serde(default = "default_evening")]
    pub evening: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalConfig {
    #[serde(default = "default_daily_target")]
    pub daily_target: f64,
    #[serde(default = "default_bar_length")]
    pub bar_length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiConfig {
    /// Name the persona addresses the user by.
    #[serde(default = "default_user_name")]
    pub user_name: String,
    #[serde(default = "default_text_base_url")]
    pub text_base_url: String,
    #[serde(default = "default_text_model")]
    pub text_model: String,
    #[serde(default = "default_google_base_url")]
    pub google_base_url: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_speech_model")]
    pub speech_model: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_text_timeout")]
    pub text_timeout_secs: u64,
    #[serde(default = "default_image_timeout")]
    pub image_timeout_secs: u64,
    #[serde(default = "default_speech_timeout")]
    pub speech_timeout_secs: u64,
    /// Overrides the built-in mentor persona.
    #[serde(default)]
    pub persona: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanConfig {
    /// End date given to challenges defined without an explicit `До:` date.
    #[serde(default = "default_challenge_end")]
    pub challenge_default_end: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/dailyforge/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Database file; defaults to `dailyforge.db` next to the config.
    #[serde(default)]
    pub database: Option<PathBuf>,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub goal: GoalConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub plan: PlanConfig,
    #[serde(default)]
    pub catalog: Catalog,
}

// Default functions
fn default_morning() -> String {
    "09:00".into()
}
fn default_midday() -> String {
    "12:00".into()
}
fn default_evening() -> String {
    "21:00".into()
}
fn default_daily_target() -> f64 {
    100.0
}
fn default_bar_length() -> usize {
    20
}
fn default_user_name() -> String {
    "Артем".into()
}
fn default_text_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_text_model() -> String {
    "mistralai/mistral-7b-instruct:free".into()
}
fn default_google_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn default_image_model() -> String {
    "imagen-3.0-generate-002".into()
}
fn default_speech_model() -> String {
    "gemini-2.5-flash-preview-tts".into()
}
fn default_voice() -> String {
    "Kore".into()
}
fn default_text_timeout() -> u64 {
    30
}
fn default_image_timeout() -> u64 {
    60
}
fn default_speech_timeout() -> u64 {
    20
}
fn default_challenge_end() -> String {
    "2050-01-01".into()
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            morning: default_morning(),
            midday: default_midday(),
            evening: default_evening(),
        }
    }
}

impl Default for GoalConfig {
    fn default() -> Self {
        Self {
            daily_target: default_daily_target(),
            bar_length: default_bar_length(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            user_name: default_user_name(),
            text_base_url: default_text_base_url(),
            text_model: default_text_model(),
            google_base_url: default_google_base_url(),
            image_model: default_image_model(),
            speech_model: default_speech_model(),
            voice: default_voice(),
            text_timeout_secs: default_text_timeout(),
            image_timeout_secs: default_image_timeout(),
            speech_timeout_secs: default_speech_timeout(),
            persona: None,
        }
    }
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            challenge_default_end: default_challenge_end(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            schedule: ScheduleConfig::default(),
            goal: GoalConfig::default(),
            ai: AiConfig::default(),
            plan: PlanConfig::default(),
            catalog: Catalog::default(),
        }
    }
}

/// Parse `HH:MM` (or `HH:MM:SS`) into a time of day.
pub(crate) fn parse_time(key: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|e| ConfigError::InvalidValue {
            key: key.into(),
            message: format!("'{value}': {e}"),
        })
}

impl ScheduleConfig {
    pub fn morning_time(&self) -> Result<NaiveTime, ConfigError> {
        parse_time("schedule.morning", &self.morning)
    }

    pub fn midday_time(&self) -> Result<NaiveTime, ConfigError> {
        parse_time("schedule.midday", &self.midday)
    }

    pub fn evening_time(&self) -> Result<NaiveTime, ConfigError> {
        parse_time("schedule.evening", &self.evening)
    }
}

impl PlanConfig {
    pub fn challenge_end(&self) -> Result<NaiveDate, ConfigError> {
        NaiveDate::parse_from_str(&self.challenge_default_end, DATE_FORMAT).map_err(|e| {
            ConfigError::InvalidValue {
                key: "plan.challenge_default_end".into(),
                message: format!("'{}': {e}", self.challenge_default_end),
            }
        })
    }
}

impl Config {
    /// Default location: `<data_dir>/config.toml`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        data_dir()
            .map(|dir| dir.join("config.toml"))
            .map_err(|e| ConfigError::LoadFailed {
                path: PathBuf::from("~/.config/dailyforge"),
                message: e.to_string(),
            })
    }

    /// Load from `path`, or write and return defaults when the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed or fails
    /// validation, or if the default config cannot be written.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)
                    .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::SaveFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Check every value that is parsed lazily elsewhere.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.schedule.morning_time()?;
        self.schedule.midday_time()?;
        self.schedule.evening_time()?;
        self.plan.challenge_end()?;

        if !(self.goal.daily_target > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "goal.daily_target".into(),
                message: "must be positive".into(),
            });
        }
        if self.goal.bar_length == 0 {
            return Err(ConfigError::InvalidValue {
                key: "goal.bar_length".into(),
                message: "must be at least 1".into(),
            });
        }

        for (key, value) in [
            ("ai.text_base_url", &self.ai.text_base_url),
            ("ai.google_base_url", &self.ai.google_base_url),
        ] {
            Url::parse(value).map_err(|e| ConfigError::InvalidValue {
                key: key.into(),
                message: e.to_string(),
            })?;
        }

        self.catalog.validate()
    }

    /// Database path: explicit setting, else `dailyforge.db` beside the config.
    pub fn database_path(&self, config_path: &Path) -> PathBuf {
        match &self.database {
            Some(path) => path.clone(),
            None => config_path
                .parent()
                .map(|dir| dir.join("dailyforge.db"))
                .unwrap_or_else(|| PathBuf::from("dailyforge.db")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        parsed.validate().unwrap();
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [schedule]
            morning = "07:30"

            [goal]
            daily_target = 150
            "#,
        )
        .unwrap();
        assert_eq!(
            parsed.schedule.morning_time().unwrap(),
            NaiveTime::from_hms_opt(7, 30, 0).unwrap()
        );
        assert_eq!(parsed.schedule.evening, "21:00");
        assert_eq!(parsed.goal.daily_target, 150.0);
        assert_eq!(parsed.goal.bar_length, 20);
        assert_eq!(parsed.catalog, Catalog::default());
    }

    #[test]
    fn invalid_time_is_rejected() {
        let mut cfg = Config::default();
        cfg.schedule.midday = "noon".into();
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "schedule.midday"));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let mut cfg = Config::default();
        cfg.ai.text_base_url = "not a url".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
        assert_eq!(Config::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn load_from_unparseable_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "schedule = [").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseFailed(_))
        ));
    }

    #[test]
    fn database_path_defaults_next_to_config() {
        let cfg = Config::default();
        assert_eq!(
            cfg.database_path(Path::new("/tmp/forge/config.toml")),
            PathBuf::from("/tmp/forge/dailyforge.db")
        );
    }
}
