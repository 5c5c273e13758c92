use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SETTINGS_ENV: &str = "TWEET_BOT_SETTINGS";
const DEFAULT_SETTINGS_FILE: &str = "bot.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Where the bot reads its tweets and images from, and how it talks to X.
///
/// Every field has a default, so a missing `bot.toml` behaves like the
/// classic layout: `tweets.json` and `assets/` next to the binary's cwd.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub tweets_file: PathBuf,
    pub media_dir: PathBuf,
    /// Probability of attaching an image when any are available.
    pub image_chance: f64,
    pub api_base: String,
    pub upload_base: String,
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tweets_file: PathBuf::from("tweets.json"),
            media_dir: PathBuf::from("assets"),
            image_chance: 0.5,
            api_base: "https://api.x.com".into(),
            upload_base: "https://upload.twitter.com".into(),
            timeout_secs: 30,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(|name| std::env::var(name).ok(), Path::new("."))
    }

    /// `TWEET_BOT_SETTINGS` (resolved against `cwd`) must exist when set.
    /// Otherwise `cwd/bot.toml` is used if present, else the defaults.
    pub fn load_from(
        env: impl Fn(&str) -> Option<String>,
        cwd: &Path,
    ) -> Result<Self, SettingsError> {
        if let Some(path) = env(SETTINGS_ENV) {
            return Self::from_file(&cwd.join(path));
        }

        let default_path = cwd.join(DEFAULT_SETTINGS_FILE);
        if default_path.is_file() {
            return Self::from_file(&default_path);
        }

        tracing::debug!("No {DEFAULT_SETTINGS_FILE} found, using defaults");
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let settings: Settings =
            toml::from_str(&content).map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;

        tracing::info!("Settings loaded from {}", path.display());
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(0.0..=1.0).contains(&self.image_chance) {
            return Err(SettingsError::Invalid(format!(
                "'image_chance' must be between 0.0 and 1.0, got {}",
                self.image_chance
            )));
        }
        if self.timeout_secs == 0 {
            return Err(SettingsError::Invalid("'timeout_secs' must be positive".into()));
        }
        if self.api_base.trim().is_empty() {
            return Err(SettingsError::Invalid("'api_base' is empty".into()));
        }
        if self.upload_base.trim().is_empty() {
            return Err(SettingsError::Invalid("'upload_base' is empty".into()));
        }
        Ok(())
    }
}
