//! Settings snapshot and persistence.
//!
//! The pipeline only ever sees an immutable [`Settings`] value. Hosts load
//! and save it through [`Loader`] and [`Saver`]; [`FileStore`] does this for
//! `.toml` and `.json` files.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};

pub const DEFAULT_LENGTH_MAX: usize = 20;
pub const DEFAULT_NOTIFICATION_HEADER: &str = "Are.na";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Bearer token; empty means unauthenticated (public content only).
    pub arena_access_token: String,
    /// Title used for transient notifications.
    pub notification_header: String,
    /// Prepend a title card when embedding a channel.
    pub enable_channel_block: bool,
    /// Max items per line, kept as entered. See [`Settings::max_items`].
    pub length_max: String,
    /// User slug for `random:personal`.
    pub user_slug: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            arena_access_token: String::new(),
            notification_header: DEFAULT_NOTIFICATION_HEADER.to_owned(),
            enable_channel_block: true,
            length_max: DEFAULT_LENGTH_MAX.to_string(),
            user_slug: String::new(),
        }
    }
}

impl Settings {
    pub const KEYS: [&'static str; 5] = [
        "arena_access_token",
        "notification_header",
        "enable_channel_block",
        "length_max",
        "user_slug",
    ];

    /// Item cap per line. Falls back to 20 on anything that isn't a positive integer.
    pub fn max_items(&self) -> usize {
        match self.length_max.trim().parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => DEFAULT_LENGTH_MAX,
        }
    }

    /// Set one field by name, as a settings form would.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "arena_access_token" | "token" => self.arena_access_token = value.trim().to_owned(),
            "notification_header" => self.notification_header = value.to_owned(),
            "enable_channel_block" => {
                self.enable_channel_block = match value.trim().to_lowercase().as_str() {
                    "true" | "yes" | "on" | "1" => true,
                    "false" | "no" | "off" | "0" => false,
                    _ => {
                        return Err(ConfigError::InvalidValue {
                            key: key.to_owned(),
                            value: value.to_owned(),
                        });
                    }
                }
            }
            "length_max" => self.length_max = value.trim().to_owned(),
            "user_slug" => self.user_slug = value.trim().to_owned(),
            _ => return Err(ConfigError::UnknownKey(key.to_owned())),
        }
        Ok(())
    }

    /// Copy with the access token hidden, for display
    pub fn masked(&self) -> Self {
        let mut masked = self.clone();
        if !masked.arena_access_token.is_empty() {
            masked.arena_access_token = "********".to_owned();
        }
        masked
    }

    /// Loads the settings from the provided loader.
    pub async fn load(loader: &impl Loader) -> Result<Self, ConfigError> {
        loader.load().await
    }

    /// Saves the settings using the provided saver.
    pub async fn save(&self, saver: &impl Saver) -> Result<(), ConfigError> {
        saver.save(self).await
    }
}

/// The trait for loading settings.
pub trait Loader {
    fn load(&self) -> impl Future<Output = Result<Settings, ConfigError>> + Send;
}

/// The trait for saving settings.
pub trait Saver {
    fn save(&self, settings: &Settings) -> impl Future<Output = Result<(), ConfigError>> + Send;
}

/// An implementation of [`Loader`] and [`Saver`] that reads and writes a settings file.
///
/// The format follows the file extension: `.toml` or `.json`.
/// A missing file loads as [`Settings::default`].
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn format(&self) -> Result<Format, ConfigError> {
        match self.path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Format::Toml),
            Some("json") => Ok(Format::Json),
            _ => Err(ConfigError::UnsupportedFormat {
                path: self.path.clone(),
            }),
        }
    }
}

enum Format {
    Toml,
    Json,
}

impl Loader for FileStore {
    async fn load(&self) -> Result<Settings, ConfigError> {
        let format = self.format()?;
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no settings file, using defaults");
            return Ok(Settings::default());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        match format {
            Format::Toml => Ok(toml::from_str(&contents)?),
            Format::Json => Ok(serde_json::from_str(&contents)?),
        }
    }
}

impl Saver for FileStore {
    async fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        let contents = match self.format()? {
            Format::Toml => toml::to_string_pretty(settings)?,
            Format::Json => serde_json::to_string_pretty(settings)?,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}
