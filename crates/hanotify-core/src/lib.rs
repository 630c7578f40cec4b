// hanotify-core: Connection supervision, notification rendering, and action routing
//
// Sits between the raw hub client (`hanotify-api`) and the front-end.
// The supervisor keeps one connection alive and funnels events into a
// channel; the dispatcher turns each event into a notification.

pub mod actions;
pub mod config;
pub mod dispatch;
pub mod endpoint;
pub mod error;
pub mod model;
pub mod ports;
pub mod supervisor;

// ── Primary re-exports ──────────────────────────────────────────────
pub use actions::ActionRouter;
pub use config::{ConnectionConfig, NetworkType};
pub use dispatch::{DispatchContext, Dispatched, ImageLoader, NotificationDispatcher};
pub use endpoint::{
    Endpoint, EndpointSource, normalize_ws_url, resolve_effective_base, resolve_effective_url,
};
pub use error::CoreError;
pub use ports::{
    ActionExecutor, ActionOutcome, ContentResolver, NoTemplates, Notifier, PermissionGate,
    StaticPermission, TemplateStore,
};
pub use supervisor::{ConnectionSupervisor, Connector, HubConnector, LiveConnection, Target};

// ── Model re-exports ────────────────────────────────────────────────
pub use model::{
    Action, ActionButton, ActionKind, EventPayload, NotificationId, Priority,
    RenderedNotification, Template, TemplateId,
};

// Re-export the reconnect settings so callers need not depend on the api crate.
pub use hanotify_api::ReconnectConfig;
