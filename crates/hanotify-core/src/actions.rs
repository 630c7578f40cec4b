// ── Action routing ──
//
// Runs the action behind a notification button and dismisses the
// notification when it succeeds.

use std::sync::Arc;

use tracing::{info, warn};

use crate::model::{ActionButton, NotificationId};
use crate::ports::{ActionExecutor, ActionOutcome, Notifier};

pub struct ActionRouter {
    executor: Arc<dyn ActionExecutor>,
    notifier: Arc<dyn Notifier>,
}

impl ActionRouter {
    pub fn new(executor: Arc<dyn ActionExecutor>, notifier: Arc<dyn Notifier>) -> Self {
        Self { executor, notifier }
    }

    /// Execute a button's action. On success its notification is cancelled;
    /// on failure it stays up.
    pub async fn trigger(&self, button: &ActionButton) -> ActionOutcome {
        let outcome = self.executor.execute(&button.action).await;
        self.settle(button.notification_id, &outcome, &button.title);
        outcome
    }

    /// Open a link on behalf of a notification.
    pub async fn open_link(&self, notification_id: NotificationId, url: &str) -> ActionOutcome {
        let outcome = self.executor.open_link(url).await;
        self.settle(notification_id, &outcome, url);
        outcome
    }

    /// The user acknowledged the alert.
    pub fn acknowledge(&self, notification_id: NotificationId) {
        info!(id = %notification_id, "notification acknowledged");
        self.cancel(notification_id);
    }

    fn settle(&self, id: NotificationId, outcome: &ActionOutcome, what: &str) {
        if outcome.success {
            info!(%id, action = what, "action succeeded");
            self.cancel(id);
        } else {
            warn!(
                %id,
                action = what,
                reason = outcome.message.as_deref().unwrap_or("unknown"),
                "action failed, keeping notification"
            );
        }
    }

    fn cancel(&self, id: NotificationId) {
        if let Err(e) = self.notifier.cancel_notification(id) {
            warn!(%id, error = %e, "failed to cancel notification");
        }
    }
}
