// ── Notification templates ──

use serde::{Deserialize, Serialize};

use super::payload::Priority;

pub type TemplateId = i64;

/// Stored defaults a payload can refer to by id or name. Fields left as
/// `None` fall through to the built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popup: Option<bool>,
}
