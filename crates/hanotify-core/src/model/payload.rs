// ── Event payload ──
//
// The `data` object of an `app_notify` event. Fields arrive camelCase;
// snake_case spellings are accepted as aliases.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use hanotify_api::EventData;

use super::action::Action;
use super::template::TemplateId;
use crate::error::CoreError;

/// Number of characters of `title + body` used when no collapse key is sent.
pub const DEFAULT_COLLAPSE_KEY_CHARS: usize = 48;

// ── Priority ─────────────────────────────────────────────────────────

/// Severity of a notification. Parsed case-insensitively; anything
/// unrecognised is treated as `Info`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    serde::Serialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Priority {
    #[default]
    Info,
    Warning,
    Critical,
}

impl Priority {
    pub fn parse_lenient(raw: &str) -> Self {
        raw.trim().parse().unwrap_or_default()
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse_lenient(&raw))
    }
}

/// How the body text should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BodyFormat {
    #[default]
    Plain,
    Markdown,
}

impl BodyFormat {
    pub fn parse_lenient(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("markdown") {
            Self::Markdown
        } else {
            Self::Plain
        }
    }
}

// ── Payload ──────────────────────────────────────────────────────────

/// A decoded `app_notify` event.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "RawPayload")]
pub struct EventPayload {
    pub title: String,
    pub body: String,
    pub body_format: BodyFormat,
    /// Explicit priority; `None` defers to the template.
    pub priority: Option<Priority>,
    pub persistent: Option<bool>,
    pub popup: Option<bool>,
    pub require_ack: bool,
    /// Explicit channel id, replacing the one derived from priority.
    pub channel: Option<String>,
    pub sound: Option<String>,
    pub vibration_pattern: Option<Vec<u64>>,
    pub actions: Vec<Action>,
    pub image: Option<String>,
    pub timeout_sec: Option<u64>,
    pub collapse_key: String,
    pub group: Option<String>,
    pub template_id: Option<TemplateId>,
    pub template_name: Option<String>,
}

impl EventPayload {
    /// Decode the event `data` object.
    pub fn from_event(data: EventData) -> Result<Self, CoreError> {
        serde_json::from_value(Value::Object(data)).map_err(|e| CoreError::InvalidPayload {
            message: e.to_string(),
        })
    }
}

/// Collapse key used when the event carries none.
pub fn default_collapse_key(title: &str, body: &str) -> String {
    title
        .chars()
        .chain(body.chars())
        .take(DEFAULT_COLLAPSE_KEY_CHARS)
        .collect()
}

/// Wire shape of the payload. Every field decodes on its own, so a
/// badly typed value only loses that field.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    body: Option<String>,
    #[serde(default, alias = "body_format", deserialize_with = "lenient_string")]
    body_format: Option<String>,
    #[serde(default, deserialize_with = "lenient_priority")]
    priority: Option<Priority>,
    #[serde(default, deserialize_with = "lenient_bool")]
    persistent: Option<bool>,
    #[serde(default, deserialize_with = "lenient_bool")]
    popup: Option<bool>,
    #[serde(default, alias = "require_ack", deserialize_with = "lenient_bool")]
    require_ack: Option<bool>,
    #[serde(default, deserialize_with = "lenient_string")]
    channel: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    sound: Option<String>,
    #[serde(
        default,
        alias = "vibration_pattern",
        alias = "vibration",
        deserialize_with = "lenient_vibration"
    )]
    vibration_pattern: Option<Vec<u64>>,
    #[serde(default, deserialize_with = "lenient_actions")]
    actions: Option<Vec<Action>>,
    #[serde(default, deserialize_with = "lenient_string")]
    image: Option<String>,
    #[serde(default, alias = "timeout_sec", deserialize_with = "lenient_u64")]
    timeout_sec: Option<u64>,
    #[serde(default, alias = "collapse_key", deserialize_with = "lenient_string")]
    collapse_key: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    group: Option<String>,
    #[serde(default, alias = "template_id", deserialize_with = "lenient_template_id")]
    template_id: Option<TemplateId>,
    #[serde(default, alias = "template_name", deserialize_with = "lenient_string")]
    template_name: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<RawPayload> for EventPayload {
    fn from(raw: RawPayload) -> Self {
        let title = raw.title.unwrap_or_default();
        let body = raw.body.unwrap_or_default();
        let collapse_key = non_blank(raw.collapse_key)
            .unwrap_or_else(|| default_collapse_key(&title, &body));

        Self {
            body_format: raw
                .body_format
                .as_deref()
                .map(BodyFormat::parse_lenient)
                .unwrap_or_default(),
            priority: raw.priority,
            persistent: raw.persistent,
            popup: raw.popup,
            require_ack: raw.require_ack.unwrap_or(false),
            channel: non_blank(raw.channel),
            sound: non_blank(raw.sound),
            vibration_pattern: raw.vibration_pattern.filter(|p| !p.is_empty()),
            actions: raw.actions.unwrap_or_default(),
            image: non_blank(raw.image),
            timeout_sec: raw.timeout_sec.filter(|t| *t > 0),
            collapse_key,
            group: non_blank(raw.group),
            template_id: raw.template_id,
            template_name: non_blank(raw.template_name),
            title,
            body,
        }
    }
}

// ── Lenient field decoding ───────────────────────────────────────────
//
// Templated hub automations send scalars in whatever shape the template
// produced: `"true"` for booleans, `"30"` for numbers, `42` for a title.

fn as_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_u64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.and_then(as_string))
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(as_bool))
}

fn lenient_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(as_u64))
}

fn lenient_priority<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Priority>, D::Error> {
    Ok(lenient_string(d)?.map(|raw| Priority::parse_lenient(&raw)))
}

/// Entries that are not non-negative integers are skipped.
fn lenient_vibration<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u64>>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Array(items)) => Some(items.iter().filter_map(as_u64).collect()),
        _ => None,
    })
}

/// Actions that fail to decode are skipped; a non-list is no actions.
fn lenient_actions<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<Action>>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match serde_json::from_value(item) {
                    Ok(action) => Some(action),
                    Err(e) => {
                        tracing::debug!(error = %e, "skipping undecodable action");
                        None
                    }
                })
                .collect(),
        ),
        _ => None,
    })
}

/// Template ids may come in as numbers or numeric strings.
fn lenient_template_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<TemplateId>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::action::ActionKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parse(value: Value) -> EventPayload {
        let Value::Object(map) = value else {
            panic!("test payload must be an object")
        };
        EventPayload::from_event(map).unwrap()
    }

    #[test]
    fn camel_case_fields() {
        let p = parse(json!({
            "title": "Leak",
            "body": "**Basement**",
            "bodyFormat": "MarkDown",
            "priority": "CRITICAL",
            "persistent": true,
            "popup": true,
            "requireAck": true,
            "channel": "pumps",
            "vibrationPattern": [0, 200, 100],
            "timeoutSec": 30,
            "collapseKey": "leak-1",
            "group": "water",
            "templateId": 7,
            "actions": [{"type": "url", "title": "Open", "url": "https://x.test"}]
        }));

        assert_eq!(p.title, "Leak");
        assert_eq!(p.body_format, BodyFormat::Markdown);
        assert_eq!(p.priority, Some(Priority::Critical));
        assert_eq!(p.persistent, Some(true));
        assert!(p.require_ack);
        assert_eq!(p.channel.as_deref(), Some("pumps"));
        assert_eq!(p.vibration_pattern, Some(vec![0, 200, 100]));
        assert_eq!(p.timeout_sec, Some(30));
        assert_eq!(p.collapse_key, "leak-1");
        assert_eq!(p.template_id, Some(7));
        assert_eq!(p.actions.len(), 1);
        assert_eq!(p.actions[0].kind, ActionKind::Url);
    }

    #[test]
    fn snake_case_aliases() {
        let p = parse(json!({
            "title": "T",
            "collapse_key": "k",
            "timeout_sec": 5,
            "body_format": "markdown",
            "require_ack": true,
            "vibration": [100],
            "template_id": "12",
            "template_name": "alarm"
        }));
        assert_eq!(p.collapse_key, "k");
        assert_eq!(p.timeout_sec, Some(5));
        assert_eq!(p.body_format, BodyFormat::Markdown);
        assert!(p.require_ack);
        assert_eq!(p.vibration_pattern, Some(vec![100]));
        assert_eq!(p.template_id, Some(12));
        assert_eq!(p.template_name.as_deref(), Some("alarm"));
    }

    #[test]
    fn collapse_key_defaults_to_title_and_body_prefix() {
        let p = parse(json!({"title": "Hi", "body": "there"}));
        assert_eq!(p.collapse_key, "Hithere");

        let long = "x".repeat(100);
        let p = parse(json!({"title": "T", "body": long}));
        assert_eq!(p.collapse_key.chars().count(), DEFAULT_COLLAPSE_KEY_CHARS);

        let p = parse(json!({"title": "A", "body": "B", "collapseKey": "  "}));
        assert_eq!(p.collapse_key, "AB");
    }

    #[test]
    fn unknown_priority_is_info_and_null_is_absent() {
        assert_eq!(parse(json!({"priority": "urgent"})).priority, Some(Priority::Info));
        assert_eq!(parse(json!({"priority": null})).priority, None);
        assert_eq!(parse(json!({})).priority, None);
    }

    #[test]
    fn empty_payload_is_valid() {
        let p = parse(json!({}));
        assert_eq!(p.title, "");
        assert_eq!(p.body, "");
        assert_eq!(p.collapse_key, "");
        assert!(p.actions.is_empty());
        assert_eq!(p.body_format, BodyFormat::Plain);
    }

    #[test]
    fn stringly_typed_scalars_are_coerced() {
        let p = parse(json!({
            "title": 42,
            "body": true,
            "persistent": "true",
            "popup": "False",
            "requireAck": 1,
            "timeoutSec": "30",
            "templateId": "7"
        }));
        assert_eq!(p.title, "42");
        assert_eq!(p.body, "true");
        assert_eq!(p.persistent, Some(true));
        assert_eq!(p.popup, Some(false));
        assert!(p.require_ack);
        assert_eq!(p.timeout_sec, Some(30));
        assert_eq!(p.template_id, Some(7));
    }

    #[test]
    fn unusable_fields_become_absent() {
        let p = parse(json!({
            "title": {"nested": true},
            "body": "Front door",
            "persistent": "maybe",
            "popup": [true],
            "priority": 3,
            "timeoutSec": -5,
            "image": {"url": "x"},
            "channel": null
        }));
        assert_eq!(p.title, "");
        assert_eq!(p.body, "Front door");
        assert_eq!(p.persistent, None);
        assert_eq!(p.popup, None);
        assert_eq!(p.priority, Some(Priority::Info));
        assert_eq!(p.timeout_sec, None);
        assert_eq!(p.image, None);
        assert_eq!(p.channel, None);
    }

    #[test]
    fn bad_vibration_entries_are_skipped() {
        let p = parse(json!({"vibrationPattern": [0, -1, "200", 1.5, "x", 300]}));
        assert_eq!(p.vibration_pattern, Some(vec![0, 200, 300]));

        let p = parse(json!({"vibrationPattern": [-1, "x"]}));
        assert_eq!(p.vibration_pattern, None);

        let p = parse(json!({"vibrationPattern": "0,200"}));
        assert_eq!(p.vibration_pattern, None);
    }

    #[test]
    fn actions_decode_one_by_one() {
        let p = parse(json!({"title": "Door", "actions": "none"}));
        assert!(p.actions.is_empty());
        assert_eq!(p.title, "Door");

        let p = parse(json!({
            "actions": [
                "not an object",
                {"type": "url", "title": "Open", "url": "https://x.test"},
                {"type": 5, "title": "Broken"}
            ]
        }));
        assert_eq!(p.actions.len(), 1);
        assert_eq!(p.actions[0].title, "Open");
    }
}
