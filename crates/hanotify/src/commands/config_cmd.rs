//! Config subcommand handlers.

use dialoguer::{Confirm, Input, Select};

use hanotify_config::{Config, Profile};
use hanotify_core::endpoint::resolve_endpoint;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{config_file, load, select_profile};

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn optional(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Copy of the config that is safe to print.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.token.is_some() {
            profile.token = Some("********".into());
        }
    }
    cfg
}

fn prompt_token() -> Result<String, CliError> {
    let token = rpassword::prompt_password("Long-lived access token: ").map_err(prompt_err)?;
    let token = token.trim().to_string();
    if token.is_empty() {
        return Err(CliError::Validation {
            field: "token".into(),
            reason: "token cannot be empty".into(),
        });
    }
    Ok(token)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config_file(global).display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = redacted(&load(global)?);
            let out = output::render_single(
                global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("# {e}")),
                |c| c.profiles.keys().cloned().collect::<Vec<_>>().join("\n"),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Init => init(global),

        ConfigCommand::SetToken => {
            let cfg = load(global)?;
            let (name, _) = select_profile(&cfg, global)?;
            let token = prompt_token()?;
            hanotify_config::store_token(&name, &token)?;
            eprintln!("✓ Token stored in system keyring for profile '{name}'");
            Ok(())
        }
    }
}

// ── Init: interactive wizard ────────────────────────────────────────

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let path = config_file(global);
    eprintln!("hanotify configuration wizard");
    eprintln!("   Config path: {}\n", path.display());

    let mut cfg = load(global)?;

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default(global.profile.clone().unwrap_or_else(|| "default".into()))
        .interact_text()
        .map_err(prompt_err)?;

    let lan_url = optional(
        Input::new()
            .with_prompt("LAN address (blank to skip)")
            .default("http://homeassistant.local:8123".into())
            .allow_empty(true)
            .interact_text()
            .map_err(prompt_err)?,
    );
    let wan_url = optional(
        Input::new()
            .with_prompt("WAN address (blank to skip)")
            .allow_empty(true)
            .interact_text()
            .map_err(prompt_err)?,
    );

    if lan_url.is_none() && wan_url.is_none() {
        return Err(CliError::Validation {
            field: "address".into(),
            reason: "at least one of LAN or WAN address is required".into(),
        });
    }
    for url in [&lan_url, &wan_url].into_iter().flatten() {
        resolve_endpoint(Some(url.as_str()), None, true)?;
    }

    let prefer_lan = if lan_url.is_some() && wan_url.is_some() {
        Confirm::new()
            .with_prompt("Prefer the LAN address when reachable?")
            .default(true)
            .interact()
            .map_err(prompt_err)?
    } else {
        true
    };

    let token = prompt_token()?;
    let store_choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let store_selection = Select::new()
        .with_prompt("Where to store the token?")
        .items(store_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let plaintext_token = if store_selection == 0 {
        hanotify_config::store_token(&profile_name, &token)?;
        eprintln!("   ✓ Token stored in system keyring");
        None
    } else {
        Some(token)
    };

    cfg.profiles.insert(
        profile_name.clone(),
        Profile {
            lan_url,
            wan_url,
            token: plaintext_token,
            token_env: None,
            enabled: true,
            prefer_lan,
            insecure: None,
            ca_cert: None,
        },
    );
    cfg.default_profile = Some(profile_name.clone());

    hanotify_config::save_config_to(&cfg, &path)?;

    eprintln!("\n✓ Configuration written to {}", path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Check it: hanotify resolve");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_answers_are_absent() {
        assert_eq!(optional("  ".into()), None);
        assert_eq!(optional(" http://h ".into()).as_deref(), Some("http://h"));
    }

    #[test]
    fn show_hides_plaintext_tokens() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "home".into(),
            Profile {
                token: Some("secret".into()),
                ..Profile::default()
            },
        );
        cfg.profiles.insert("cabin".into(), Profile::default());

        let shown = redacted(&cfg);
        assert_eq!(shown.profiles["home"].token.as_deref(), Some("********"));
        assert_eq!(shown.profiles["cabin"].token, None);
    }
}
