//! Connection supervision.
//!
//! [`ConnectionSupervisor`] keeps at most one hub connection alive for the
//! current configuration. It reconnects with bounded exponential backoff,
//! restarts when the effective endpoint or token changes, and forwards
//! every event into a single channel that outlives individual connections.
//!
//! The running flag is only ever flipped with compare-and-set, so
//! concurrent `start` calls collapse into one session.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use arc_swap::ArcSwap;
use futures_util::{Stream, StreamExt};
use secrecy::SecretString;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use hanotify_api::{
    ConnectionClient, ConnectionHandle, DisconnectReceiver, EventData, ReconnectConfig,
    backoff_delay,
};

use crate::config::{ConnectionConfig, NetworkType, same_token};
use crate::endpoint::Endpoint;

/// Buffer between live connections and the dispatcher.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

// ── Connector seam ───────────────────────────────────────────────────

/// A connection that can be asked to close.
pub trait LiveConnection: Send + Sync {
    fn close(&self);
}

impl LiveConnection for ConnectionHandle {
    fn close(&self) {
        ConnectionHandle::close(self);
    }
}

/// A freshly opened connection and its single disconnect notice.
pub struct OpenedConnection {
    pub control: Box<dyn LiveConnection>,
    pub disconnected: DisconnectReceiver,
}

/// Opens physical connections. Swapped out in tests.
pub trait Connector: Send + Sync + 'static {
    fn open(
        &self,
        url: Url,
        token: Option<SecretString>,
        events: mpsc::Sender<EventData>,
    ) -> OpenedConnection;
}

/// Connects to a real hub over WebSocket.
#[derive(Debug, Clone, Copy, Default)]
pub struct HubConnector;

impl Connector for HubConnector {
    fn open(
        &self,
        url: Url,
        token: Option<SecretString>,
        events: mpsc::Sender<EventData>,
    ) -> OpenedConnection {
        let (handle, disconnected) = ConnectionClient::new(url, token).connect(events);
        OpenedConnection {
            control: Box::new(handle),
            disconnected,
        }
    }
}

// ── Target ───────────────────────────────────────────────────────────

/// Where the supervisor connects, and with which credentials.
#[derive(Debug, Clone)]
pub struct Target {
    pub endpoint: Endpoint,
    pub token: Option<SecretString>,
}

impl Target {
    fn same_as(&self, other: &Self) -> bool {
        self.endpoint == other.endpoint && same_token(self.token.as_ref(), other.token.as_ref())
    }
}

// ── Supervisor ───────────────────────────────────────────────────────

type LiveSlot = Arc<Mutex<Option<Box<dyn LiveConnection>>>>;

struct Session {
    generation: u64,
    target: Target,
    cancel: CancellationToken,
    live: LiveSlot,
}

struct SupervisorInner {
    connector: Arc<dyn Connector>,
    reconnect: ReconnectConfig,
    running: AtomicBool,
    generation: AtomicU64,
    config: ArcSwap<ConnectionConfig>,
    network: ArcSwap<NetworkType>,
    session: Mutex<Option<Session>>,
    event_tx: mpsc::Sender<EventData>,
    event_rx: Mutex<Option<mpsc::Receiver<EventData>>>,
}

/// Owns the hub connection lifecycle. Cheap to clone.
#[derive(Clone)]
pub struct ConnectionSupervisor {
    inner: Arc<SupervisorInner>,
}

impl ConnectionSupervisor {
    pub fn new(connector: Arc<dyn Connector>, reconnect: ReconnectConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(SupervisorInner {
                connector,
                reconnect,
                running: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                config: ArcSwap::from_pointee(ConnectionConfig::default()),
                network: ArcSwap::from_pointee(NetworkType::default()),
                session: Mutex::new(None),
                event_tx,
                event_rx: Mutex::new(Some(event_rx)),
            }),
        }
    }

    /// Supervisor that talks to a real hub.
    pub fn for_hub(reconnect: ReconnectConfig) -> Self {
        Self::new(Arc::new(HubConnector), reconnect)
    }

    /// Take the event stream. Only the first call gets it.
    pub fn take_events(&self) -> Option<mpsc::Receiver<EventData>> {
        self.inner
            .event_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Target of the current session, if any.
    pub fn active_target(&self) -> Option<Target> {
        self.inner.lock_session().as_ref().map(|s| s.target.clone())
    }

    /// Connect with `config`. Returns immediately; connecting happens in
    /// the background.
    ///
    /// Disabled configs stop the supervisor. A second `start` while a
    /// session is running is a no-op. Nothing happens if neither address
    /// is configured.
    pub fn start(&self, config: ConnectionConfig) {
        let enabled = config.enabled;
        self.inner.config.store(Arc::new(config));
        if !enabled {
            debug!("connection disabled");
            self.stop();
            return;
        }

        if self
            .inner
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("supervisor already running");
            return;
        }

        match self.inner.resolve_target() {
            Some(target) => self.inner.launch(target),
            None => {
                info!("no hub address configured, staying idle");
                let _ = self.inner.running.compare_exchange(
                    true,
                    false,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
            }
        }
    }

    /// Close the live connection and stop reconnecting. Safe to call any
    /// number of times.
    pub fn stop(&self) {
        let was_running = self
            .inner
            .running
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        let session = self.inner.lock_session().take();
        if let Some(session) = session {
            session.cancel.cancel();
            let live = session
                .live
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(live) = live {
                live.close();
            }
        }
        if was_running {
            info!("hub connection stopped");
        }
    }

    /// Apply a new configuration snapshot, restarting only if the
    /// effective endpoint or token changed.
    pub fn apply_config(&self, config: ConnectionConfig) {
        if !config.enabled || !self.is_running() {
            self.start(config);
            return;
        }
        self.inner.config.store(Arc::new(config));
        self.restart_if_target_changed("configuration changed");
    }

    /// Report the current network type. Moving between cellular and other
    /// networks can change which address is preferred.
    pub fn set_network(&self, network: NetworkType) {
        let previous = self.inner.network.swap(Arc::new(network));
        if *previous == network {
            return;
        }
        debug!(from = %previous, to = %network, "network changed");
        if self.is_running() {
            self.restart_if_target_changed("network changed");
        }
    }

    /// Follow a stream of configuration snapshots until it ends.
    pub async fn follow_config<S>(&self, configs: S)
    where
        S: Stream<Item = ConnectionConfig> + Send,
    {
        let mut configs = std::pin::pin!(configs);
        while let Some(config) = configs.next().await {
            self.apply_config(config);
        }
        debug!("configuration stream ended");
    }

    fn restart_if_target_changed(&self, reason: &str) {
        let desired = self.inner.resolve_target();
        let unchanged = match (&desired, self.active_target()) {
            (Some(desired), Some(current)) => desired.same_as(&current),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return;
        }
        info!(reason, "hub target changed, restarting connection");
        let config = (**self.inner.config.load()).clone();
        self.stop();
        self.start(config);
    }
}

impl SupervisorInner {
    fn lock_session(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve_target(&self) -> Option<Target> {
        let config = self.config.load();
        if !config.enabled {
            return None;
        }
        match config.endpoint(**self.network.load()) {
            Ok(Some(endpoint)) => Some(Target {
                endpoint,
                token: config.token.clone(),
            }),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "ignoring unusable hub address");
                None
            }
        }
    }

    fn launch(self: &Arc<Self>, target: Target) {
        let mut slot = self.lock_session();
        if !self.running.load(Ordering::Acquire) {
            return;
        }
        // A stop/start pair raced this launch and already owns the guard.
        if slot.is_some() {
            debug!("session already launched, skipping");
            return;
        }
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let cancel = CancellationToken::new();
        let live: LiveSlot = Arc::new(Mutex::new(None));
        *slot = Some(Session {
            generation,
            target: target.clone(),
            cancel: cancel.clone(),
            live: Arc::clone(&live),
        });
        drop(slot);

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            inner.session_loop(generation, target, cancel, live).await;
        });
    }

    /// One supervised session: connect, wait for the disconnect, back off,
    /// and go again until cancelled or deconfigured.
    async fn session_loop(
        self: Arc<Self>,
        generation: u64,
        mut target: Target,
        cancel: CancellationToken,
        live: LiveSlot,
    ) {
        let mut attempt: u32 = 0;

        loop {
            let disconnected = {
                let mut slot = live.lock().unwrap_or_else(PoisonError::into_inner);
                if cancel.is_cancelled() {
                    break;
                }
                info!(
                    url = %target.endpoint.url,
                    source = %target.endpoint.source,
                    attempt,
                    "connecting to hub"
                );
                let opened = self.connector.open(
                    target.endpoint.url.clone(),
                    target.token.clone(),
                    self.event_tx.clone(),
                );
                *slot = Some(opened.control);
                opened.disconnected
            };

            let cause = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                cause = disconnected => cause.unwrap_or(None),
            };
            live.lock().unwrap_or_else(PoisonError::into_inner).take();

            let delay = match cause {
                None => {
                    info!("hub connection closed");
                    attempt = 0;
                    backoff_delay(0, &self.reconnect)
                }
                Some(e) => {
                    let delay = backoff_delay(attempt, &self.reconnect);
                    warn!(
                        error = %e,
                        attempt,
                        retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "hub connection lost"
                    );
                    attempt = attempt.saturating_add(1);
                    delay
                }
            };

            if !self.wait(&cancel, delay).await {
                break;
            }

            match self.resolve_target() {
                Some(next) => {
                    target = next;
                    if let Some(session) = self.lock_session().as_mut() {
                        if session.generation == generation {
                            session.target = target.clone();
                        }
                    }
                }
                None => {
                    info!("hub no longer configured, stopping");
                    self.retire(generation);
                    break;
                }
            }
        }
        debug!(generation, "session ended");
    }

    /// Sleep before a retry. `false` if the session was stopped meanwhile.
    async fn wait(&self, cancel: &CancellationToken, delay: Duration) -> bool {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return false,
            () = tokio::time::sleep(delay) => {}
        }
        self.running.load(Ordering::Acquire) && !cancel.is_cancelled()
    }

    /// Drop the session if it is still the current one.
    fn retire(&self, generation: u64) {
        let mut slot = self.lock_session();
        if slot.as_ref().is_some_and(|s| s.generation == generation) {
            *slot = None;
            let _ = self
                .running
                .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    use tokio::sync::oneshot;

    #[derive(Default)]
    struct CountingConnector {
        opens: AtomicUsize,
        closes: Arc<AtomicUsize>,
        pending: Mutex<Vec<oneshot::Sender<Option<hanotify_api::Error>>>>,
    }

    struct CountedLive(Arc<AtomicUsize>);

    impl LiveConnection for CountedLive {
        fn close(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Connector for CountingConnector {
        fn open(
            &self,
            _url: Url,
            _token: Option<SecretString>,
            _events: mpsc::Sender<EventData>,
        ) -> OpenedConnection {
            self.opens.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = oneshot::channel();
            self.pending.lock().unwrap().push(tx);
            OpenedConnection {
                control: Box::new(CountedLive(Arc::clone(&self.closes))),
                disconnected: rx,
            }
        }
    }

    fn lan_config() -> ConnectionConfig {
        ConnectionConfig {
            lan_url: Some("http://hub.local:8123".into()),
            enabled: true,
            prefer_lan: true,
            ..ConnectionConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn late_launch_after_stop_and_restart_is_dropped() {
        let connector = Arc::new(CountingConnector::default());
        let sup = ConnectionSupervisor::new(connector.clone(), ReconnectConfig::default());

        // First caller wins the guard and resolves its target...
        sup.inner.config.store(Arc::new(lan_config()));
        sup.inner
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .unwrap();
        let late = sup.inner.resolve_target().unwrap();

        // ...while another caller stops and starts again.
        sup.stop();
        sup.start(lan_config());
        sup.inner.launch(late);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(connector.opens.load(Ordering::SeqCst), 1);

        sup.stop();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(connector.opens.load(Ordering::SeqCst), 1);
        assert_eq!(connector.closes.load(Ordering::SeqCst), 1);
        assert!(!sup.is_running());
    }
}
