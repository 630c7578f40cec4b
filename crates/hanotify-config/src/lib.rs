//! Configuration for hanotify.
//!
//! TOML profiles, token resolution (env + keyring + plaintext), and
//! translation to `hanotify_core::ConnectionConfig`. Notification
//! templates live in the same file and back [`ConfigTemplateStore`].

mod templates;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use hanotify_core::{ConnectionConfig, ReconnectConfig, Template};

pub use templates::ConfigTemplateStore;

/// Keyring service name for stored tokens.
pub const KEYRING_SERVICE: &str = "hanotify";

/// Prefix for environment overrides, e.g. `HANOTIFY_DEFAULTS__OUTPUT`.
pub const ENV_PREFIX: &str = "HANOTIFY_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named hub profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,

    /// Notification templates, referenced from payloads by id or name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub templates: Vec<Template>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
            templates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Master switch for posting notifications.
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,

    #[serde(default = "default_fallback_title")]
    pub fallback_title: String,

    #[serde(default = "default_image_timeout")]
    pub image_timeout_secs: u64,

    #[serde(default = "default_reconnect_initial")]
    pub reconnect_initial_secs: u64,

    #[serde(default = "default_reconnect_max")]
    pub reconnect_max_secs: u64,

    /// How often `run` re-reads the config file.
    #[serde(default = "default_reload_interval")]
    pub reload_interval_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            notifications_enabled: true,
            fallback_title: default_fallback_title(),
            image_timeout_secs: default_image_timeout(),
            reconnect_initial_secs: default_reconnect_initial(),
            reconnect_max_secs: default_reconnect_max(),
            reload_interval_secs: default_reload_interval(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_true() -> bool {
    true
}
fn default_fallback_title() -> String {
    hanotify_core::dispatch::DEFAULT_FALLBACK_TITLE.into()
}
fn default_image_timeout() -> u64 {
    10
}
fn default_reconnect_initial() -> u64 {
    1
}
fn default_reconnect_max() -> u64 {
    60
}
fn default_reload_interval() -> u64 {
    5
}

impl Defaults {
    pub fn reconnect(&self) -> ReconnectConfig {
        let initial = Duration::from_secs(self.reconnect_initial_secs.max(1));
        ReconnectConfig {
            initial_delay: initial,
            max_delay: Duration::from_secs(self.reconnect_max_secs).max(initial),
        }
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout_secs.max(1))
    }

    pub fn reload_interval(&self) -> Duration {
        Duration::from_secs(self.reload_interval_secs.max(1))
    }
}

/// A named hub profile.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Hub address on the local network (e.g. "http://homeassistant.local:8123").
    pub lan_url: Option<String>,

    /// Hub address reachable from anywhere.
    pub wan_url: Option<String>,

    /// Long-lived access token (plaintext; prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable holding the token.
    pub token_env: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub prefer_lan: bool,

    /// Accept invalid TLS certificates for REST calls and images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Custom CA certificate for REST calls and images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,
}

impl Config {
    /// Pick a profile: explicit name, then `default_profile`, then "default".
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default")
            .to_string();
        match self.profiles.get(&name) {
            Some(profile) => Ok((name, profile)),
            None => Err(ConfigError::ProfileNotFound { name }),
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "hanotify", "hanotify").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("hanotify");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from `path` + environment. A missing file yields
/// the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML at `path`, creating parent directories.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution ────────────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/token"))
}

/// Resolve the hub token: `token_env` variable, then the system keyring,
/// then plaintext. `None` means connect without authenticating.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    // 1. Profile's token_env → env var lookup
    if let Some(ref env_name) = profile.token_env {
        if let Ok(val) = std::env::var(env_name) {
            if !val.trim().is_empty() {
                return Some(SecretString::from(val));
            }
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    profile
        .token
        .as_ref()
        .filter(|t| !t.trim().is_empty())
        .map(|t| SecretString::from(t.clone()))
}

/// Store a token in the system keyring for `profile_name`.
pub fn store_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(token)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build the supervisor's `ConnectionConfig` from a profile.
pub fn profile_to_connection_config(profile: &Profile, profile_name: &str) -> ConnectionConfig {
    ConnectionConfig {
        lan_url: profile.lan_url.clone(),
        wan_url: profile.wan_url.clone(),
        token: resolve_token(profile, profile_name),
        enabled: profile.enabled,
        prefer_lan: profile.prefer_lan,
    }
}
