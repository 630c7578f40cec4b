//! Hub WebSocket connection.
//!
//! A [`ConnectionClient`] owns exactly one physical socket. It performs the
//! auth/subscribe handshake, forwards the `data` object of every event
//! frame through an [`mpsc`] channel (preserving wire order), and reports
//! the end of the connection exactly once through a [`DisconnectReceiver`].
//!
//! Reconnection is deliberately *not* handled here: the owner decides
//! whether a dropped connection should be replaced, using
//! [`ReconnectConfig`] and [`backoff_delay`] for pacing.
//!
//! # Example
//!
//! ```rust,ignore
//! use hanotify_api::websocket::ConnectionClient;
//! use tokio::sync::mpsc;
//!
//! let (tx, mut rx) = mpsc::channel(256);
//! let url = "wss://hub.example/api/websocket".parse()?;
//! let (handle, disconnected) = ConnectionClient::new(url, Some(token)).connect(tx);
//!
//! while let Some(data) = rx.recv().await {
//!     println!("{}", data["title"]);
//! }
//!
//! handle.close();
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder, Message};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::protocol::{self, APP_EVENT_TYPE, ClientFrame, EventData, HubFrame};

/// Message ids restart at this value on every connection.
const FIRST_MESSAGE_ID: u64 = 1;

// ── ConnectionState ──────────────────────────────────────────────────

/// Lifecycle of a single connection.
///
/// `Closed` and `Failed` are terminal for the connection; a new
/// [`ConnectionClient`] starts over at `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Authenticating,
    Subscribed,
    Closing,
    Closed,
    Failed,
}

impl ConnectionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for reconnection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 60s.
    pub max_delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) * jitter`
///
/// Jitter is +-25% to spread reconnection storms from many clients, and the
/// result never exceeds `max_delay`.
pub fn backoff_delay(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt.min(30)).unwrap_or(30);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let max = config.max_delay.as_secs_f64();
    let capped = base.min(max);

    // Deterministic "jitter" seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).clamp(0.0, max);

    Duration::from_secs_f64(with_jitter)
}

// ── Disconnect signalling ────────────────────────────────────────────

/// Receives the single end-of-connection notice.
///
/// `None` means a clean close (local `close()` or peer close frame);
/// `Some(err)` is a transport or protocol failure.
pub type DisconnectReceiver = oneshot::Receiver<Option<Error>>;

/// Single-fire disconnect notification shared by the close path and the
/// I/O task.
struct DisconnectSignal {
    closed: AtomicBool,
    tx: Mutex<Option<oneshot::Sender<Option<Error>>>>,
}

impl DisconnectSignal {
    fn new(tx: oneshot::Sender<Option<Error>>) -> Self {
        Self {
            closed: AtomicBool::new(false),
            tx: Mutex::new(Some(tx)),
        }
    }

    /// Claim the notice. Only the first caller gets `true`.
    fn claim(&self) -> bool {
        self.closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Deliver the notice. Call only after a successful [`claim`](Self::claim).
    fn deliver(&self, cause: Option<Error>) {
        let tx = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(tx) = tx {
            // Receiver gone just means nobody is waiting any more.
            let _ = tx.send(cause);
        }
    }

    fn is_fired(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

struct Shared {
    signal: DisconnectSignal,
    cancel: CancellationToken,
    state: watch::Sender<ConnectionState>,
}

impl Shared {
    /// End the connection: the first caller publishes `terminal` and then
    /// delivers the disconnect notice. Returns `false` for later callers.
    fn finish(&self, terminal: ConnectionState, cause: Option<Error>) -> bool {
        if !self.signal.claim() {
            return false;
        }
        self.state.send_replace(terminal);
        self.signal.deliver(cause);
        true
    }

    fn set_state(&self, state: ConnectionState) {
        // The terminal state is owned by `finish` and never overwritten.
        self.state.send_if_modified(|current| {
            if current.is_terminal() {
                return false;
            }
            *current = state;
            true
        });
    }
}

// ── ConnectionHandle ─────────────────────────────────────────────────

/// Owner's handle to a running connection.
pub struct ConnectionHandle {
    shared: Arc<Shared>,
}

impl ConnectionHandle {
    /// Close the connection.
    ///
    /// Idempotent: the first call moves the state to `Closed` and fires
    /// the disconnect notice with `None`; later calls only make sure the
    /// I/O task is cancelled.
    pub fn close(&self) {
        if self.shared.finish(ConnectionState::Closed, None) {
            tracing::debug!("connection closed locally");
        }
        self.shared.cancel.cancel();
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// `true` once the disconnect notice has fired.
    pub fn is_closed(&self) -> bool {
        self.shared.signal.is_fired()
    }
}

// ── ConnectionClient ─────────────────────────────────────────────────

/// One connection to the hub's WebSocket API.
pub struct ConnectionClient {
    url: Url,
    token: Option<SecretString>,
}

impl ConnectionClient {
    pub fn new(url: Url, token: Option<SecretString>) -> Self {
        Self { url, token }
    }

    /// Spawn the I/O task and return immediately.
    ///
    /// Event `data` objects are sent on `events` in the order they arrive.
    /// Must be called from within a Tokio runtime.
    pub fn connect(self, events: mpsc::Sender<EventData>) -> (ConnectionHandle, DisconnectReceiver) {
        let (disconnect_tx, disconnect_rx) = oneshot::channel();
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        let shared = Arc::new(Shared {
            signal: DisconnectSignal::new(disconnect_tx),
            cancel: CancellationToken::new(),
            state,
        });

        let task_shared = Arc::clone(&shared);
        tokio::spawn(async move {
            run_connection(self.url, self.token, events, task_shared).await;
        });

        (ConnectionHandle { shared }, disconnect_rx)
    }
}

// ── I/O task ─────────────────────────────────────────────────────────

async fn run_connection(
    url: Url,
    token: Option<SecretString>,
    events: mpsc::Sender<EventData>,
    shared: Arc<Shared>,
) {
    match connect_and_read(&url, token.as_ref(), &events, &shared).await {
        Ok(()) => {
            if shared.finish(ConnectionState::Closed, None) {
                tracing::info!(url = %url, "hub connection closed");
            }
        }
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "hub connection failed");
            shared.finish(ConnectionState::Failed, Some(e));
        }
    }
}

/// Open the socket, run the handshake and read frames until the
/// connection ends or is cancelled.
async fn connect_and_read(
    url: &Url,
    token: Option<&SecretString>,
    events: &mpsc::Sender<EventData>,
    shared: &Shared,
) -> Result<(), Error> {
    shared.set_state(ConnectionState::Connecting);
    tracing::info!(url = %url, "connecting to hub");

    let uri: tungstenite::http::Uri = url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;

    let (ws_stream, _response) = tokio::select! {
        biased;
        () = shared.cancel.cancelled() => return Ok(()),
        result = tokio_tungstenite::connect_async(ClientRequestBuilder::new(uri)) => {
            result.map_err(|e| Error::WebSocketConnect(e.to_string()))?
        }
    };

    let (mut write, mut read) = ws_stream.split();
    let mut next_id = FIRST_MESSAGE_ID;

    // Without a token there is no auth_ok to wait for: subscribe right away.
    let opening = if let Some(token) = token {
        shared.set_state(ConnectionState::Authenticating);
        ClientFrame::Auth {
            access_token: token.expose_secret(),
        }
        .to_text()?
    } else {
        let frame = subscribe_frame(&mut next_id)?;
        shared.set_state(ConnectionState::Subscribed);
        frame
    };
    write
        .send(Message::text(opening))
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    loop {
        tokio::select! {
            biased;
            () = shared.cancel.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                return Ok(());
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match protocol::parse_frame(text.as_str()) {
                            Ok(HubFrame::AuthOk) => {
                                tracing::debug!("hub accepted token, subscribing");
                                let frame = subscribe_frame(&mut next_id)?;
                                write
                                    .send(Message::text(frame))
                                    .await
                                    .map_err(|e| Error::WebSocketConnect(e.to_string()))?;
                                shared.set_state(ConnectionState::Subscribed);
                            }
                            Ok(HubFrame::AuthInvalid { message }) => {
                                return Err(Error::Authentication { message });
                            }
                            Ok(HubFrame::Result { id, success }) => {
                                if !success {
                                    return Err(Error::Protocol(format!(
                                        "hub rejected command {}",
                                        id.unwrap_or_default()
                                    )));
                                }
                                tracing::debug!(id, "hub acknowledged subscription");
                            }
                            Ok(HubFrame::Event { event_type, data: Some(data) }) => {
                                tracing::trace!(event_type = event_type.as_deref().unwrap_or(""), "event received");
                                if events.send(data).await.is_err() {
                                    tracing::debug!("event receiver dropped, discarding event");
                                }
                            }
                            Ok(HubFrame::Event { data: None, .. }) => {
                                tracing::debug!("event without data object dropped");
                            }
                            Ok(HubFrame::AuthRequired | HubFrame::Other(_)) => {}
                            Err(e) => {
                                tracing::debug!(error = %e, "dropping malformed frame");
                            }
                        }
                    }
                    Some(Ok(Message::Ping(_))) => {
                        // tungstenite answers pings itself
                        tracing::trace!("WebSocket ping");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        shared.set_state(ConnectionState::Closing);
                        if let Some(ref cf) = frame {
                            tracing::info!(
                                code = %cf.code,
                                reason = %cf.reason,
                                "close frame received"
                            );
                        } else {
                            tracing::info!("close frame received (no payload)");
                        }
                        return Ok(());
                    }
                    Some(Err(e)) => {
                        return Err(Error::WebSocketConnect(e.to_string()));
                    }
                    None => {
                        tracing::info!("WebSocket stream ended");
                        return Ok(());
                    }
                    _ => {
                        // Binary, Pong, Frame -- ignore
                    }
                }
            }
        }
    }
}

fn subscribe_frame(next_id: &mut u64) -> Result<String, Error> {
    let id = *next_id;
    *next_id += 1;
    ClientFrame::SubscribeEvents {
        id,
        event_type: APP_EVENT_TYPE,
    }
    .to_text()
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(60));
    }

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig::default();

        let d0 = backoff_delay(0, &config);
        let d1 = backoff_delay(1, &config);
        let d2 = backoff_delay(2, &config);

        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn backoff_never_exceeds_max_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        };

        for attempt in 0..100 {
            let d = backoff_delay(attempt, &config);
            assert!(d <= Duration::from_secs(10), "attempt {attempt}: {d:?}");
        }
    }

    #[test]
    fn subscribe_ids_strictly_increase() {
        let mut next = FIRST_MESSAGE_ID;
        let first: serde_json::Value = serde_json::from_str(&subscribe_frame(&mut next).unwrap()).unwrap();
        let second: serde_json::Value = serde_json::from_str(&subscribe_frame(&mut next).unwrap()).unwrap();
        assert_eq!(first["id"], 1);
        assert_eq!(second["id"], 2);
    }

    #[test]
    fn disconnect_signal_fires_once() {
        let (tx, mut rx) = oneshot::channel();
        let (state, _) = watch::channel(ConnectionState::Subscribed);
        let shared = Shared {
            signal: DisconnectSignal::new(tx),
            cancel: CancellationToken::new(),
            state,
        };

        assert!(shared.finish(ConnectionState::Closed, None));
        assert!(!shared.finish(
            ConnectionState::Failed,
            Some(Error::WebSocketConnect("late".into()))
        ));
        assert!(shared.signal.is_fired());
        assert_eq!(*shared.state.borrow(), ConnectionState::Closed);
        assert!(matches!(rx.try_recv(), Ok(None)));
    }

    #[test]
    fn terminal_states() {
        assert!(ConnectionState::Closed.is_terminal());
        assert!(ConnectionState::Failed.is_terminal());
        assert!(!ConnectionState::Subscribed.is_terminal());
        assert!(!ConnectionState::Closing.is_terminal());
    }
}
