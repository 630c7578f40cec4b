//! Notification dispatch.
//!
//! [`NotificationDispatcher`] turns decoded events into
//! [`RenderedNotification`]s and hands them to the [`Notifier`]:
//!
//! 1. check the permission gate,
//! 2. resolve the template and merge it with the payload,
//! 3. derive channel, tier, category, and the stable id,
//! 4. render the body and load the image (failures drop the image only),
//! 5. post, and optionally present full-screen.
//!
//! Events are processed concurrently. Each event is stamped with an
//! arrival sequence; a notification is only posted if no later event for
//! the same id has been posted first, so the surface always ends up
//! showing the last event that arrived. Ordering is tracked for the most
//! recent [`ORDERING_WINDOW`] arrivals; older entries are pruned.

pub mod id;
pub mod image;
pub mod merge;
pub mod render;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hanotify_api::EventData;

use crate::model::{
    ActionButton, Category, EventPayload, NotificationId, Priority, PriorityTier,
    RenderedNotification,
};
use crate::ports::{Notifier, PermissionGate, TemplateStore};

pub use self::id::notification_id;
pub use self::image::{ImageError, ImageLoader, ImageSource};
pub use self::merge::{Resolved, channel_for, icon_for, merge, resolve_template};
pub use self::render::{autolink, render_body, render_markdown, summary_line};

/// Title used when an event has none.
pub const DEFAULT_FALLBACK_TITLE: &str = "hanotify";

/// Number of most recent arrivals for which last-write-wins is enforced.
pub const ORDERING_WINDOW: u64 = 1024;

/// Sequence of the last posted event for one id.
type PostedSlot = Arc<Mutex<u64>>;

/// Per-event context derived from configuration.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    pub fallback_title: Arc<str>,
    /// Arrival order; later events win for the same notification id.
    pub sequence: u64,
    pub received_at: DateTime<Utc>,
}

/// Outcome of dispatching one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    Posted(Box<RenderedNotification>),
    /// Notifications are not permitted.
    Suppressed,
    /// A later event for the same id was already posted.
    Superseded(NotificationId),
    /// The notification surface rejected it.
    Failed(NotificationId),
}

struct DispatcherInner {
    templates: Arc<dyn TemplateStore>,
    notifier: Arc<dyn Notifier>,
    permissions: Arc<dyn PermissionGate>,
    images: ImageLoader,
    fallback_title: ArcSwap<Arc<str>>,
    next_sequence: AtomicU64,
    latest: DashMap<NotificationId, PostedSlot>,
}

/// Renders events and posts them. Cheap to clone.
#[derive(Clone)]
pub struct NotificationDispatcher {
    inner: Arc<DispatcherInner>,
}

impl NotificationDispatcher {
    pub fn new(
        templates: Arc<dyn TemplateStore>,
        notifier: Arc<dyn Notifier>,
        permissions: Arc<dyn PermissionGate>,
        images: ImageLoader,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                templates,
                notifier,
                permissions,
                images,
                fallback_title: ArcSwap::from_pointee(Arc::from(DEFAULT_FALLBACK_TITLE)),
                next_sequence: AtomicU64::new(1),
                latest: DashMap::new(),
            }),
        }
    }

    /// Replace the title used for events without one. Takes effect for
    /// events stamped afterwards.
    pub fn set_fallback_title(&self, title: impl Into<String>) {
        let title: String = title.into();
        self.inner.fallback_title.store(Arc::new(Arc::from(title)));
    }

    /// Stamp a new arrival. Call in wire order.
    pub fn next_context(&self) -> DispatchContext {
        DispatchContext {
            fallback_title: Arc::clone(&**self.inner.fallback_title.load()),
            sequence: self.inner.next_sequence.fetch_add(1, Ordering::AcqRel),
            received_at: Utc::now(),
        }
    }

    /// Build the notification for a payload without posting it.
    pub async fn render(&self, ctx: &DispatchContext, payload: &EventPayload) -> RenderedNotification {
        let template = match resolve_template(self.inner.templates.as_ref(), payload).await {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "template lookup failed, using defaults");
                None
            }
        };
        let resolved = merge(payload, template.as_ref());
        let id = notification_id(&payload.collapse_key);

        let title = if payload.title.trim().is_empty() {
            ctx.fallback_title.to_string()
        } else {
            payload.title.clone()
        };
        let body = render_body(&payload.body, payload.body_format);
        let summary = body.as_ref().and_then(summary_line);

        let image = match payload.image.as_deref() {
            Some(reference) => self.inner.images.load(reference).await,
            None => None,
        };

        let actions = payload
            .actions
            .iter()
            .enumerate()
            .map(|(index, action)| ActionButton {
                notification_id: id,
                index,
                title: action.title.clone(),
                icon: icon_for(&action.kind),
                action: action.clone(),
            })
            .collect();

        RenderedNotification {
            id,
            collapse_key: payload.collapse_key.clone(),
            channel: channel_for(resolved.priority, payload.channel.as_deref()),
            priority: resolved.priority,
            tier: PriorityTier::from(resolved.priority),
            category: Category::from(resolved.priority),
            title,
            body,
            summary,
            image,
            actions,
            ongoing: resolved.persistent,
            auto_cancel: !resolved.persistent,
            full_screen: resolved.popup && resolved.priority == Priority::Critical,
            group: payload.group.clone(),
            timeout_secs: payload.timeout_sec,
            sound: payload.sound.clone(),
            vibration_pattern: payload.vibration_pattern.clone(),
            require_ack: payload.require_ack,
            received_at: ctx.received_at,
        }
    }

    /// Render and post one event.
    pub async fn show(&self, ctx: &DispatchContext, payload: EventPayload) -> Dispatched {
        if !self.inner.permissions.notifications_permitted() {
            debug!(collapse_key = %payload.collapse_key, "notifications not permitted, dropping event");
            return Dispatched::Suppressed;
        }
        let notification = self.render(ctx, &payload).await;
        self.publish(ctx.sequence, notification)
    }

    fn publish(&self, sequence: u64, notification: RenderedNotification) -> Dispatched {
        let id = notification.id;
        // The shard lock is only held to fetch the slot; the slot's own
        // lock serialises posts for this id.
        let slot = Arc::clone(self.inner.latest.entry(id).or_default().value());
        let outcome = {
            let mut latest = slot.lock().unwrap_or_else(PoisonError::into_inner);
            if *latest > sequence {
                debug!(%id, sequence, newer = *latest, "newer event already posted");
                Some(Dispatched::Superseded(id))
            } else {
                *latest = sequence;
                self.post(&notification).err()
            }
        };
        drop(slot);
        self.prune();

        if let Some(outcome) = outcome {
            return outcome;
        }
        info!(
            %id,
            channel = %notification.channel,
            priority = %notification.priority,
            title = %notification.title,
            "notification posted"
        );
        Dispatched::Posted(Box::new(notification))
    }

    fn post(&self, notification: &RenderedNotification) -> Result<(), Dispatched> {
        let id = notification.id;
        if let Err(e) = self.inner.notifier.post_notification(notification) {
            warn!(%id, error = %e, "failed to post notification");
            return Err(Dispatched::Failed(id));
        }
        if notification.full_screen {
            if let Err(e) = self.inner.notifier.present_full_screen(notification) {
                warn!(%id, error = %e, "failed to present full-screen alert");
            }
        }
        Ok(())
    }

    /// Forget ids last posted outside the ordering window. Slots that are
    /// in use by a concurrent post are kept.
    fn prune(&self) {
        let tracked = u64::try_from(self.inner.latest.len()).unwrap_or(u64::MAX);
        if tracked <= ORDERING_WINDOW {
            return;
        }
        let newest = self
            .inner
            .next_sequence
            .load(Ordering::Acquire)
            .saturating_sub(1);
        self.inner.latest.retain(|_, slot| {
            Arc::strong_count(slot) > 1
                || *slot.lock().unwrap_or_else(PoisonError::into_inner) + ORDERING_WINDOW > newest
        });
    }

    /// Number of ids whose ordering is currently tracked.
    pub fn tracked_ids(&self) -> usize {
        self.inner.latest.len()
    }

    /// Decode an event and dispatch it on its own task.
    ///
    /// Returns `None` for payloads that cannot be decoded.
    pub fn spawn_event(&self, data: EventData) -> Option<JoinHandle<Dispatched>> {
        let payload = match EventPayload::from_event(data) {
            Ok(p) => p,
            Err(e) => {
                debug!(error = %e, "dropping undecodable event");
                return None;
            }
        };
        let ctx = self.next_context();
        let this = self.clone();
        Some(tokio::spawn(async move { this.show(&ctx, payload).await }))
    }

    /// Dispatch events until the channel closes or `cancel` fires.
    pub async fn run(self, mut events: mpsc::Receiver<EventData>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(data) => {
                        self.spawn_event(data);
                    }
                    None => break,
                },
            }
        }
        debug!("notification dispatcher stopped");
    }
}
