//! Command handlers and the helpers they share.

pub mod action;
pub mod config_cmd;
pub mod render;
pub mod resolve;
pub mod run;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hanotify_api::HubRestClient;
use hanotify_api::transport::{TlsMode, TransportConfig};
use hanotify_config::{Config, ConfigError, ConfigTemplateStore, Defaults, Profile};
use hanotify_core::endpoint::{resolve_effective_base, rest_base_url};
use hanotify_core::{
    EventPayload, ImageLoader, NetworkType, NotificationDispatcher, Notifier, StaticPermission,
};

use crate::cli::{Cli, Command, CompletionsArgs, GlobalOpts, NetworkArg};
use crate::error::CliError;

pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Run(args) => run::handle(&args, global).await,
        Command::Resolve(args) => resolve::handle(&args, global),
        Command::Render(args) => render::handle(&args, global).await,
        Command::Action(args) => action::handle(&args, global).await,
        Command::Config(args) => config_cmd::handle(args, global),
        Command::Completions(args) => {
            completions(&args);
            Ok(())
        }
    }
}

fn completions(args: &CompletionsArgs) {
    use clap::CommandFactory;

    let mut cmd = Cli::command();
    clap_complete::generate(args.shell, &mut cmd, "hanotify", &mut std::io::stdout());
}

// ── Config ───────────────────────────────────────────────────────────

/// `--config`, or the platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(hanotify_config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(hanotify_config::load_config_from(&config_file(global))?)
}

/// Profile named by `--profile`, else the config's default.
pub fn select_profile<'a>(
    cfg: &'a Config,
    global: &GlobalOpts,
) -> Result<(String, &'a Profile), CliError> {
    cfg.profile(global.profile.as_deref()).map_err(|e| match e {
        ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound {
            name,
            available: available_profiles(cfg),
        },
        other => other.into(),
    })
}

pub fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

pub fn network_type(arg: NetworkArg) -> NetworkType {
    match arg {
        NetworkArg::Unknown => NetworkType::Unknown,
        NetworkArg::Wifi => NetworkType::Wifi,
        NetworkArg::Cellular => NetworkType::Cellular,
        NetworkArg::Other => NetworkType::Other,
        NetworkArg::Offline => NetworkType::Offline,
    }
}

// ── HTTP ─────────────────────────────────────────────────────────────

/// Transport settings for REST calls and image downloads.
pub fn transport(profile: Option<&Profile>, defaults: &Defaults) -> TransportConfig {
    let tls = match profile {
        Some(p) if p.insecure == Some(true) => TlsMode::DangerAcceptInvalid,
        Some(Profile {
            ca_cert: Some(path),
            ..
        }) => TlsMode::CustomCa(path.clone()),
        _ => TlsMode::System,
    };
    TransportConfig {
        tls,
        timeout: defaults.image_timeout(),
    }
}

/// REST client for the profile's hub. Needs an address and a token.
pub fn rest_client(
    name: &str,
    profile: &Profile,
    network: NetworkType,
    http: reqwest::Client,
) -> Result<HubRestClient, CliError> {
    let Some((base, _)) = resolve_effective_base(
        profile.lan_url.as_deref(),
        profile.wan_url.as_deref(),
        profile.prefer_lan && network.lan_reachable(),
    ) else {
        return Err(CliError::NoEndpoint {
            profile: name.into(),
        });
    };
    let Some(token) = hanotify_config::resolve_token(profile, name) else {
        return Err(CliError::NoToken {
            profile: name.into(),
        });
    };
    Ok(HubRestClient::from_reqwest(&rest_base_url(base), http, token)?)
}

// ── Dispatch ─────────────────────────────────────────────────────────

/// Dispatcher wired to the config file's templates and defaults.
pub fn dispatcher(
    cfg: &Config,
    templates: Arc<ConfigTemplateStore>,
    notifier: Arc<dyn Notifier>,
    http: reqwest::Client,
) -> NotificationDispatcher {
    let images = ImageLoader::new(http).with_timeout(cfg.defaults.image_timeout());
    let dispatcher = NotificationDispatcher::new(
        templates,
        notifier,
        Arc::new(StaticPermission(cfg.defaults.notifications_enabled)),
        images,
    );
    dispatcher.set_fallback_title(cfg.defaults.fallback_title.clone());
    dispatcher
}

/// Read an event data object from a file, or stdin for `-`.
pub fn read_payload(path: &Path) -> Result<EventPayload, CliError> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)?
    };
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    let serde_json::Value::Object(data) = value else {
        return Err(CliError::Validation {
            field: "payload".into(),
            reason: "expected a JSON object".into(),
        });
    };
    Ok(EventPayload::from_event(data)?)
}
