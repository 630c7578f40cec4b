// ── Rendered notifications ──
//
// Output of the dispatcher. Everything the notification surface needs to
// post, update, or cancel a notification.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::action::Action;
use super::payload::Priority;

pub const CHANNEL_INFO: &str = "info";
pub const CHANNEL_WARNING: &str = "warning";
pub const CHANNEL_CRITICAL: &str = "critical";

/// Number of characters kept in the collapsed summary line.
pub const SUMMARY_MAX_CHARS: usize = 160;

/// Stable identity derived from the collapse key. Posting twice with the
/// same id replaces the earlier notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NotificationId(pub i32);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PriorityTier {
    Default,
    High,
    Max,
}

impl From<Priority> for PriorityTier {
    fn from(p: Priority) -> Self {
        match p {
            Priority::Info => Self::Default,
            Priority::Warning => Self::High,
            Priority::Critical => Self::Max,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    Message,
    Alarm,
}

impl From<Priority> for Category {
    fn from(p: Priority) -> Self {
        if p == Priority::Critical {
            Self::Alarm
        } else {
            Self::Message
        }
    }
}

// ── Rich text ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub code: bool,
}

impl TextStyle {
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextSpan {
    pub text: String,
    #[serde(skip_serializing_if = "TextStyle::is_plain")]
    pub style: TextStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Body text as styled spans.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct RichText {
    pub spans: Vec<TextSpan>,
}

impl RichText {
    /// Append text, merging with the previous span when style and link match.
    pub fn push(&mut self, text: &str, style: TextStyle, link: Option<&str>) {
        if text.is_empty() {
            return;
        }
        if let Some(last) = self.spans.last_mut() {
            if last.style == style && last.link.as_deref() == link {
                last.text.push_str(text);
                return;
            }
        }
        self.spans.push(TextSpan {
            text: text.to_string(),
            style,
            link: link.map(str::to_string),
        });
    }

    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn links(&self) -> impl Iterator<Item = &str> {
        self.spans.iter().filter_map(|s| s.link.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.spans.iter().all(|s| s.text.is_empty())
    }
}

// ── Images ───────────────────────────────────────────────────────────

/// A successfully decoded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Container format, e.g. `png`.
    pub format: String,
    /// The encoded bytes as received.
    #[serde(skip)]
    pub bytes: Bytes,
}

// ── Actions ──────────────────────────────────────────────────────────

/// Icon hint for an action button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ActionIcon {
    View,
    Play,
    Send,
}

/// An action bound to its notification. `(notification_id, index)` is
/// unique across everything that is currently posted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionButton {
    pub notification_id: NotificationId,
    pub index: usize,
    pub title: String,
    pub icon: ActionIcon,
    pub action: Action,
}

// ── Notification ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedNotification {
    pub id: NotificationId,
    pub collapse_key: String,
    pub channel: String,
    pub priority: Priority,
    pub tier: PriorityTier,
    pub category: Category,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<RichText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<DecodedImage>,
    pub actions: Vec<ActionButton>,
    /// Sticky until dismissed by an action or acknowledgement.
    pub ongoing: bool,
    pub auto_cancel: bool,
    pub full_screen: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibration_pattern: Option<Vec<u64>>,
    pub require_ack: bool,
    pub received_at: DateTime<Utc>,
}

impl RenderedNotification {
    /// Plain body text, empty when the notification has no body.
    pub fn body_text(&self) -> String {
        self.body.as_ref().map(RichText::plain_text).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_merges_matching_spans() {
        let mut text = RichText::default();
        text.push("a", TextStyle::default(), None);
        text.push("b", TextStyle::default(), None);
        text.push("c", TextStyle { bold: true, ..TextStyle::default() }, None);
        text.push("", TextStyle::default(), None);
        text.push("d", TextStyle::default(), Some("https://d.test"));

        assert_eq!(text.spans.len(), 3);
        assert_eq!(text.spans[0].text, "ab");
        assert_eq!(text.plain_text(), "abcd");
        assert_eq!(text.links().collect::<Vec<_>>(), vec!["https://d.test"]);
    }

    #[test]
    fn tier_and_category_follow_priority() {
        assert_eq!(PriorityTier::from(Priority::Info), PriorityTier::Default);
        assert_eq!(PriorityTier::from(Priority::Warning), PriorityTier::High);
        assert_eq!(PriorityTier::from(Priority::Critical), PriorityTier::Max);
        assert_eq!(Category::from(Priority::Critical), Category::Alarm);
        assert_eq!(Category::from(Priority::Warning), Category::Message);
    }
}
