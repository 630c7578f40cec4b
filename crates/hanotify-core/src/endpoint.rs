// ── Hub endpoint resolution ──
//
// Picks LAN or WAN and turns a user-entered hub address into the
// WebSocket URL of the event API. Everything here is pure.

use hanotify_api::WEBSOCKET_PATH;
use url::Url;

use crate::error::CoreError;

/// Which configured address an endpoint came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum EndpointSource {
    Lan,
    Wan,
}

/// A resolved WebSocket endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: Url,
    pub source: EndpointSource,
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Choose between the LAN and WAN base addresses.
///
/// The preferred one wins when present, the other one is the fallback.
/// Blank strings count as absent.
pub fn resolve_effective_base<'a>(
    lan: Option<&'a str>,
    wan: Option<&'a str>,
    prefer_lan: bool,
) -> Option<(&'a str, EndpointSource)> {
    let lan = present(lan).map(|v| (v, EndpointSource::Lan));
    let wan = present(wan).map(|v| (v, EndpointSource::Wan));
    if prefer_lan { lan.or(wan) } else { wan.or(lan) }
}

/// Rewrite a base address into the hub's WebSocket URL.
///
/// `https://` becomes `wss://`, `http://` becomes `ws://`, a bare host is
/// assumed to be `wss://`. Trailing slashes are dropped and the event API
/// path is appended unless it is already there, so the result is stable
/// under repeated application.
pub fn normalize_ws_url(base: &str) -> String {
    let trimmed = base.trim();
    let lower = trimmed.to_ascii_lowercase();

    let with_scheme = if lower.starts_with("wss://") || lower.starts_with("ws://") {
        trimmed.to_string()
    } else if lower.starts_with("https://") {
        format!("wss://{}", &trimmed["https://".len()..])
    } else if lower.starts_with("http://") {
        format!("ws://{}", &trimmed["http://".len()..])
    } else {
        format!("wss://{trimmed}")
    };

    let stripped = with_scheme.trim_end_matches('/');
    let root = stripped.strip_suffix(WEBSOCKET_PATH).unwrap_or(stripped);
    format!("{}{WEBSOCKET_PATH}", root.trim_end_matches('/'))
}

/// Effective WebSocket URL for the given settings, or `None` when neither
/// address is configured.
pub fn resolve_effective_url(lan: Option<&str>, wan: Option<&str>, prefer_lan: bool) -> Option<String> {
    resolve_effective_base(lan, wan, prefer_lan).map(|(base, _)| normalize_ws_url(base))
}

/// Resolve and parse the endpoint. `Ok(None)` means nothing is configured.
pub fn resolve_endpoint(
    lan: Option<&str>,
    wan: Option<&str>,
    prefer_lan: bool,
) -> Result<Option<Endpoint>, CoreError> {
    let Some((base, source)) = resolve_effective_base(lan, wan, prefer_lan) else {
        return Ok(None);
    };
    let raw = normalize_ws_url(base);
    let url = Url::parse(&raw).map_err(|e| CoreError::InvalidEndpoint {
        value: base.to_string(),
        reason: e.to_string(),
    })?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(CoreError::InvalidEndpoint {
            value: base.to_string(),
            reason: "missing host".into(),
        });
    }
    Ok(Some(Endpoint { url, source }))
}

/// HTTP base URL of the hub for REST calls, derived from the same
/// user-entered address: `wss://` maps back to `https://`, `ws://` to
/// `http://`, and the event API path is removed.
pub fn rest_base_url(base: &str) -> String {
    let ws = normalize_ws_url(base);
    let root = ws.strip_suffix(WEBSOCKET_PATH).unwrap_or(&ws);
    if let Some(rest) = root.strip_prefix("wss://") {
        format!("https://{rest}")
    } else if let Some(rest) = root.strip_prefix("ws://") {
        format!("http://{rest}")
    } else {
        root.to_string()
    }
}
