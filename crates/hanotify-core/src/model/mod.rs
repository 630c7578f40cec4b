// ── Domain model ──

pub mod action;
pub mod notification;
pub mod payload;
pub mod template;

pub use action::{Action, ActionKind, ServiceCall};
pub use notification::{
    ActionButton, ActionIcon, CHANNEL_CRITICAL, CHANNEL_INFO, CHANNEL_WARNING, Category,
    DecodedImage, NotificationId, PriorityTier, RenderedNotification, RichText, SUMMARY_MAX_CHARS,
    TextSpan, TextStyle,
};
pub use payload::{BodyFormat, EventPayload, Priority, default_collapse_key};
pub use template::{Template, TemplateId};
