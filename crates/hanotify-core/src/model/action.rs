// ── Notification actions ──
//
// Buttons attached to a notification. The payload shape is loose: the
// link or service call may sit in `targetData` or directly on the
// action object, so unknown keys are kept in `extra`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What an action does when triggered.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionKind {
    /// Open a link.
    Url,
    /// Call a hub service.
    HaService,
    /// Anything else; kept verbatim.
    Other(String),
    #[default]
    Unspecified,
}

impl From<String> for ActionKind {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "url" => Self::Url,
            "ha_service" | "service" => Self::HaService,
            "" => Self::Unspecified,
            _ => Self::Other(raw),
        }
    }
}

impl ActionKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Url => "url",
            Self::HaService => "ha_service",
            Self::Other(raw) => raw,
            Self::Unspecified => "",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ActionKind> for String {
    fn from(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Other(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

/// A service call extracted from an `ha_service` action.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCall {
    /// `domain.service`, e.g. `light.turn_on`.
    pub service: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    #[serde(rename = "type", default)]
    pub kind: ActionKind,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "target_data", skip_serializing_if = "Value::is_null")]
    pub target_data: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Action {
    fn lookup(&self, key: &str) -> Option<&Value> {
        self.target_data.get(key).or_else(|| self.extra.get(key))
    }

    /// Link opened by a `url` action.
    pub fn link(&self) -> Option<&str> {
        self.target_data
            .as_str()
            .or_else(|| self.lookup("url").and_then(Value::as_str))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Service call described by an `ha_service` action.
    pub fn service_call(&self) -> Option<ServiceCall> {
        let service = self
            .lookup("service")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| s.contains('.'))?;
        let data = self
            .lookup("data")
            .or_else(|| self.lookup("service_data"))
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        Some(ServiceCall {
            service: service.to_string(),
            data,
        })
    }
}
