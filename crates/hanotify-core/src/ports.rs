// ── Collaborator traits ──
//
// The dispatcher, action router, and image loader talk to the outside
// world only through these traits. The binary supplies the real ones;
// tests supply recording fakes.

use async_trait::async_trait;
use url::Url;

use crate::error::CoreError;
use crate::model::{Action, NotificationId, RenderedNotification, Template, TemplateId};

/// Persistent store of notification templates.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn get(&self, id: TemplateId) -> Result<Option<Template>, CoreError>;
    async fn by_name(&self, name: &str) -> Result<Option<Template>, CoreError>;
}

/// A store with nothing in it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTemplates;

#[async_trait]
impl TemplateStore for NoTemplates {
    async fn get(&self, _id: TemplateId) -> Result<Option<Template>, CoreError> {
        Ok(None)
    }

    async fn by_name(&self, _name: &str) -> Result<Option<Template>, CoreError> {
        Ok(None)
    }
}

/// The platform notification surface.
///
/// Posting with an id that is already shown replaces it.
pub trait Notifier: Send + Sync {
    fn post_notification(&self, notification: &RenderedNotification) -> Result<(), CoreError>;

    /// Show the notification as a full-screen alert.
    fn present_full_screen(&self, notification: &RenderedNotification) -> Result<(), CoreError>;

    fn cancel_notification(&self, id: NotificationId) -> Result<(), CoreError>;
}

/// Whether the user currently allows notifications.
pub trait PermissionGate: Send + Sync {
    fn notifications_permitted(&self) -> bool;
}

/// Fixed answer, for platforms without a permission model.
#[derive(Debug, Clone, Copy)]
pub struct StaticPermission(pub bool);

impl PermissionGate for StaticPermission {
    fn notifications_permitted(&self) -> bool {
        self.0
    }
}

/// Result of running an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: Option<String>,
}

impl ActionOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Runs notification actions.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, action: &Action) -> ActionOutcome;

    async fn open_link(&self, url: &str) -> ActionOutcome;
}

/// Opens `content://` style references the platform knows how to read.
#[async_trait]
pub trait ContentResolver: Send + Sync {
    async fn open(&self, uri: &Url) -> std::io::Result<Vec<u8>>;
}
