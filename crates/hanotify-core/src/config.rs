// ── Runtime connection configuration ──
//
// Snapshots handed to the supervisor by the configuration stream. The
// core never reads config files; hanotify-config builds these.

use secrecy::{ExposeSecret, SecretString};

use crate::endpoint::{Endpoint, resolve_endpoint};
use crate::error::CoreError;

/// One snapshot of the connection settings.
#[derive(Debug, Clone, Default)]
pub struct ConnectionConfig {
    /// Hub address on the local network, e.g. `http://hub.local:8123`.
    pub lan_url: Option<String>,
    /// Hub address reachable from anywhere (reverse proxy, cloud relay).
    pub wan_url: Option<String>,
    /// Long-lived access token. `None` connects without authenticating.
    pub token: Option<SecretString>,
    /// Master switch for the connection.
    pub enabled: bool,
    /// Try the LAN address first.
    pub prefer_lan: bool,
}

impl ConnectionConfig {
    /// Endpoint to use on `network`. LAN is only preferred when the
    /// network can reach it. Ignores `enabled`.
    pub fn endpoint(&self, network: NetworkType) -> Result<Option<Endpoint>, CoreError> {
        resolve_endpoint(
            self.lan_url.as_deref(),
            self.wan_url.as_deref(),
            self.prefer_lan && network.lan_reachable(),
        )
    }
}

impl PartialEq for ConnectionConfig {
    fn eq(&self, other: &Self) -> bool {
        self.lan_url == other.lan_url
            && self.wan_url == other.wan_url
            && same_token(self.token.as_ref(), other.token.as_ref())
            && self.enabled == other.enabled
            && self.prefer_lan == other.prefer_lan
    }
}

impl Eq for ConnectionConfig {}

pub(crate) fn same_token(a: Option<&SecretString>, b: Option<&SecretString>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.expose_secret() == b.expose_secret(),
        _ => false,
    }
}

/// Kind of network the device is currently on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum NetworkType {
    /// Not reported yet.
    #[default]
    Unknown,
    /// Wi-Fi or wired.
    Wifi,
    Cellular,
    Other,
    Offline,
}

impl NetworkType {
    /// Whether a LAN address can be expected to answer on this network.
    pub fn lan_reachable(self) -> bool {
        !matches!(self, Self::Cellular)
    }
}
