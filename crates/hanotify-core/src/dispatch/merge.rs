// ── Payload / template merge ──

use tracing::debug;

use crate::error::CoreError;
use crate::model::{
    ActionIcon, ActionKind, CHANNEL_CRITICAL, CHANNEL_INFO, CHANNEL_WARNING, EventPayload,
    Priority, Template,
};
use crate::ports::TemplateStore;

/// Effective presentation flags after applying the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub priority: Priority,
    pub persistent: bool,
    pub popup: bool,
}

/// Payload fields win, then template fields, then defaults
/// (`info`, not persistent, no popup).
pub fn merge(payload: &EventPayload, template: Option<&Template>) -> Resolved {
    Resolved {
        priority: payload
            .priority
            .or_else(|| template.and_then(|t| t.priority))
            .unwrap_or_default(),
        persistent: payload
            .persistent
            .or_else(|| template.and_then(|t| t.persistent))
            .unwrap_or(false),
        popup: payload
            .popup
            .or_else(|| template.and_then(|t| t.popup))
            .unwrap_or(false),
    }
}

/// Channel for a priority, unless the payload names one.
pub fn channel_for(priority: Priority, explicit: Option<&str>) -> String {
    if let Some(channel) = explicit {
        return channel.to_string();
    }
    match priority {
        Priority::Info => CHANNEL_INFO,
        Priority::Warning => CHANNEL_WARNING,
        Priority::Critical => CHANNEL_CRITICAL,
    }
    .to_string()
}

pub fn icon_for(kind: &ActionKind) -> ActionIcon {
    match kind {
        ActionKind::Url => ActionIcon::View,
        ActionKind::HaService => ActionIcon::Play,
        ActionKind::Other(_) | ActionKind::Unspecified => ActionIcon::Send,
    }
}

/// Look the payload's template up by id, then by name.
pub async fn resolve_template(
    store: &dyn TemplateStore,
    payload: &EventPayload,
) -> Result<Option<Template>, CoreError> {
    if let Some(id) = payload.template_id {
        if let Some(template) = store.get(id).await? {
            return Ok(Some(template));
        }
        debug!(template_id = id, "no template with this id");
    }
    if let Some(name) = payload.template_name.as_deref() {
        return store.by_name(name).await;
    }
    Ok(None)
}
