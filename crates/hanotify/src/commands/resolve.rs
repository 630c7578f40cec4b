//! `hanotify resolve`: show where `run` would connect.

use serde::Serialize;

use hanotify_core::ConnectionConfig;

use crate::cli::{GlobalOpts, ResolveArgs};
use crate::error::CliError;
use crate::output;

use super::{load, network_type, select_profile};

#[derive(Debug, Serialize)]
struct Resolution {
    profile: String,
    network: String,
    enabled: bool,
    url: Option<String>,
    source: Option<String>,
}

pub fn handle(args: &ResolveArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = load(global)?;
    let (name, profile) = select_profile(&cfg, global)?;
    let network = network_type(args.network);

    // The token does not affect the address, so skip the keyring.
    let connection = ConnectionConfig {
        lan_url: profile.lan_url.clone(),
        wan_url: profile.wan_url.clone(),
        token: None,
        enabled: profile.enabled,
        prefer_lan: profile.prefer_lan,
    };
    let endpoint = connection.endpoint(network)?;

    let resolution = Resolution {
        profile: name,
        network: network.to_string(),
        enabled: profile.enabled,
        url: endpoint.as_ref().map(|e| e.url.to_string()),
        source: endpoint.as_ref().map(|e| e.source.to_string()),
    };

    let out = output::render_single(
        global.output,
        &resolution,
        |r| match (&r.url, &r.source) {
            (Some(url), Some(source)) if r.enabled => format!("{url} ({source})"),
            (Some(url), Some(source)) => format!("{url} ({source}, disabled)"),
            _ => "none".into(),
        },
        |r| r.url.clone().unwrap_or_else(|| "none".into()),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
