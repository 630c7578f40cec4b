//! CLI error types with miette diagnostics.
//!
//! Maps core and config errors into user-facing errors with help text.

use miette::Diagnostic;
use thiserror::Error;

use hanotify_config::ConfigError;
use hanotify_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to hub at {url}")]
    #[diagnostic(
        code(hanotify::connection_failed),
        help(
            "Check that the hub is running and reachable.\n\
             Inspect the address with: hanotify resolve"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Hub address '{value}' is not usable: {reason}")]
    #[diagnostic(
        code(hanotify::invalid_endpoint),
        help("Fix lan_url / wan_url in your profile, e.g. http://homeassistant.local:8123")
    )]
    InvalidEndpoint { value: String, reason: String },

    #[error("No hub address configured for profile '{profile}'")]
    #[diagnostic(
        code(hanotify::no_endpoint),
        help("Set lan_url or wan_url with: hanotify config init")
    )]
    NoEndpoint { profile: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed")]
    #[diagnostic(
        code(hanotify::auth_failed),
        help(
            "Verify the long-lived access token.\n\
             Run: hanotify config set-token --profile {profile}"
        )
    )]
    AuthFailed { profile: String },

    #[error("No access token configured for profile '{profile}'")]
    #[diagnostic(
        code(hanotify::no_token),
        help(
            "Store one with: hanotify config set-token --profile {profile}\n\
             Or point token_env at an environment variable holding it."
        )
    )]
    NoToken { profile: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(code(hanotify::not_found))]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    // ── Actions ──────────────────────────────────────────────────────

    #[error("Action failed: {message}")]
    #[diagnostic(code(hanotify::action_failed))]
    ActionFailed { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(hanotify::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(hanotify::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: hanotify config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(hanotify::config))]
    Config(ConfigError),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(hanotify::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    #[diagnostic(code(hanotify::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoToken { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. }
            | Self::InvalidEndpoint { .. }
            | Self::NoEndpoint { .. }
            | Self::Json(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::AuthenticationFailed { message: _ } => CliError::AuthFailed {
                profile: "current".into(),
            },

            CoreError::InvalidEndpoint { value, reason } => {
                CliError::InvalidEndpoint { value, reason }
            }

            CoreError::InvalidPayload { message } => CliError::Validation {
                field: "payload".into(),
                reason: message,
            },

            CoreError::ActionFailed { message } => CliError::ActionFailed { message },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::TemplateStore { message }
            | CoreError::Presentation { message }
            | CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

impl From<hanotify_api::Error> for CliError {
    fn from(err: hanotify_api::Error) -> Self {
        CoreError::from(err).into()
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound {
                name,
                available: "(none)".into(),
            },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config(other),
        }
    }
}
