//! Configuration management for edc-stream.
//!
//! Handles:
//! - Account identity and credentials
//! - Storage mode and output locations
//! - Configured streams (publisher name + stream id)
//!
//! Configuration is TOML:
//!
//! ```toml
//! [account]
//! machine_name = "acme"
//! user_name = "me@example.com"
//! password_encoded = "c2VjcmV0"
//!
//! [edc]
//! storage = "files"
//! out_box = "./out"
//!
//! [[stream]]
//! name = "Twitter Stream"
//! id = "1"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::{EdcError, Result};
use crate::model::StorageMode;

/// Configuration file looked up in the working directory when `-c` is not given.
pub const DEFAULT_CONFIG_FILENAME: &str = "edc_config.toml";

/// Default capacity of the queue between the receive loop and the sink worker.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Account identity and credentials.
    pub account: AccountConfig,
    /// Storage settings.
    #[serde(default)]
    pub edc: EdcConfig,
    /// Database settings, required for database storage.
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    /// Configured streams.
    #[serde(default, rename = "stream", alias = "streams")]
    pub streams: Vec<StreamConfig>,
}

impl Config {
    /// Resolve the configuration path and load it.
    ///
    /// An explicit path must exist. Without one, `./edc_config.toml` is
    /// tried first, then `<config dir>/edc-stream/config.toml`.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => resolve_default_path()?,
        };
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EdcError::config(format!("config file not found: {}", path.display()))
            } else {
                EdcError::io(format!("Failed to read config file: {}", path.display()), e)
            }
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            EdcError::InvalidConfig { message, .. } => EdcError::InvalidConfig {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| EdcError::InvalidConfig {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })
    }

    /// Check every field a session needs, before any connection attempt.
    pub fn validate(&self) -> Result<()> {
        self.account.base_url()?;
        self.account.credentials()?;

        if self.streams.is_empty() {
            return Err(EdcError::config("no stream is configured"));
        }
        for stream in &self.streams {
            stream.validate()?;
        }

        match self.edc.storage {
            StorageMode::Files => {
                if self.edc.out_box.is_none() {
                    return Err(EdcError::config("edc.out_box is required for file storage"));
                }
            }
            StorageMode::Database => {
                if self.database.is_none() {
                    return Err(EdcError::config(
                        "[database] section is required for database storage",
                    ));
                }
            }
        }

        self.edc.idle_timeout()?;
        if let Some(database) = &self.database {
            database.busy_timeout()?;
        }
        if self.edc.channel_capacity == 0 {
            return Err(EdcError::config("edc.channel_capacity must be at least 1"));
        }

        Ok(())
    }

    /// Select a stream by name, or the first configured stream.
    pub fn stream(&self, name: Option<&str>) -> Result<&StreamConfig> {
        match name {
            Some(name) => self
                .streams
                .iter()
                .find(|s| s.name == name || s.publisher() == name)
                .ok_or_else(|| EdcError::config(format!("no stream named '{name}' is configured"))),
            None => self
                .streams
                .first()
                .ok_or_else(|| EdcError::config("no stream is configured")),
        }
    }

    /// Streaming endpoint for a configured stream.
    pub fn endpoint(&self, stream: &StreamConfig) -> Result<String> {
        Ok(format!(
            "{}/data_collectors/{}/stream.xml",
            self.account.base_url()?,
            stream.id
        ))
    }
}

/// Account identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Host prefix: the endpoint is `https://<machine_name>.gnip.com`.
    #[serde(default)]
    pub machine_name: Option<String>,
    /// Explicit base URL, overrides `machine_name`.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Basic-auth user name.
    #[serde(default)]
    pub user_name: String,
    /// Plain-text password.
    #[serde(default)]
    pub password: Option<Secret>,
    /// Base64-obscured password, preferred over `password`.
    #[serde(default)]
    pub password_encoded: Option<Secret>,
}

impl AccountConfig {
    /// Base URL of the collector, without a trailing slash.
    pub fn base_url(&self) -> Result<String> {
        if let Some(url) = self.base_url.as_deref().filter(|u| !u.trim().is_empty()) {
            return Ok(url.trim().trim_end_matches('/').to_string());
        }
        match self.machine_name.as_deref().map(str::trim) {
            Some(machine) if !machine.is_empty() => Ok(format!("https://{machine}.gnip.com")),
            _ => Err(EdcError::config(
                "account.machine_name (or account.base_url) is required",
            )),
        }
    }

    /// Resolve basic-auth credentials.
    pub fn credentials(&self) -> Result<Credentials> {
        if self.user_name.trim().is_empty() {
            return Err(EdcError::config("account.user_name is required"));
        }

        let password = match (&self.password_encoded, &self.password) {
            (Some(encoded), _) => decode_password(encoded.expose())?,
            (None, Some(plain)) => plain.clone(),
            (None, None) => {
                return Err(EdcError::config(
                    "account.password or account.password_encoded is required",
                ))
            }
        };

        Ok(Credentials {
            user_name: self.user_name.clone(),
            password,
        })
    }
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdcConfig {
    /// `files` or `database`.
    #[serde(default)]
    pub storage: StorageMode,
    /// Output directory for file storage.
    #[serde(default)]
    pub out_box: Option<PathBuf>,
    /// Idle timeout such as `"90s"`; absent disables it.
    #[serde(default)]
    pub idle_timeout: Option<String>,
    /// Queue capacity between the receive loop and the sink worker.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for EdcConfig {
    fn default() -> Self {
        Self {
            storage: StorageMode::default(),
            out_box: None,
            idle_timeout: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl EdcConfig {
    /// Parsed idle timeout.
    pub fn idle_timeout(&self) -> Result<Option<Duration>> {
        parse_duration_opt("edc.idle_timeout", self.idle_timeout.as_deref())
    }
}

/// SQLite database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file.
    pub path: PathBuf,
    /// How long a write waits on a locked database, such as `"5s"`.
    #[serde(default)]
    pub busy_timeout: Option<String>,
}

impl DatabaseConfig {
    /// Parsed busy timeout.
    pub fn busy_timeout(&self) -> Result<Option<Duration>> {
        parse_duration_opt("database.busy_timeout", self.busy_timeout.as_deref())
    }
}

/// One configured stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Display name; its first word is the publisher.
    #[serde(alias = "Name")]
    pub name: String,
    /// Stream identifier used in the endpoint path.
    #[serde(alias = "ID")]
    pub id: String,
}

impl StreamConfig {
    /// Publisher: first whitespace-delimited token of the name.
    #[must_use]
    pub fn publisher(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or_default()
    }

    fn validate(&self) -> Result<()> {
        if self.publisher().is_empty() {
            return Err(EdcError::config("stream name must not be empty"));
        }
        if self.id.trim().is_empty() {
            return Err(EdcError::config(format!(
                "stream '{}' has no id",
                self.name
            )));
        }
        Ok(())
    }
}

/// Opaque secret value. Never printed by `Debug` or `Display`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The secret value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[redacted]")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[redacted]")
    }
}

/// Basic-auth credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User name.
    pub user_name: String,
    /// Password.
    pub password: Secret,
}

/// Obscure a password with base64.
///
/// This is an encoding, not encryption: anyone with the config file can
/// recover the password.
#[must_use]
pub fn encode_password(password: &str) -> String {
    STANDARD.encode(password.as_bytes())
}

/// Reverse [`encode_password`].
pub fn decode_password(encoded: &str) -> Result<Secret> {
    // Values written by line-wrapping encoders carry newlines.
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| EdcError::config(format!("account.password_encoded is not valid base64: {e}")))?;
    let password = String::from_utf8(bytes)
        .map_err(|_| EdcError::config("account.password_encoded does not decode to UTF-8"))?;
    Ok(Secret(password))
}

/// Get the user-level configuration path.
pub fn default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| EdcError::config("cannot determine the user configuration directory"))?;

    Ok(config_dir.join("edc-stream").join("config.toml"))
}

/// Path `Config::load(None)` would read.
pub fn resolve_default_path() -> Result<PathBuf> {
    let local = PathBuf::from(DEFAULT_CONFIG_FILENAME);
    if local.exists() {
        return Ok(local);
    }
    if let Ok(user) = default_config_path() {
        if user.exists() {
            return Ok(user);
        }
    }
    Err(EdcError::config(format!(
        "no configuration found: pass -c <config> or create ./{DEFAULT_CONFIG_FILENAME}"
    )))
}

fn parse_duration_opt(field: &str, value: Option<&str>) -> Result<Option<Duration>> {
    value
        .map(|raw| {
            humantime::parse_duration(raw.trim())
                .map_err(|e| EdcError::config(format!("{field} '{raw}' is not a duration: {e}")))
        })
        .transpose()
}

// Default value functions for serde
fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}
