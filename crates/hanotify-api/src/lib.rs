// hanotify-api: Async client for the hub WebSocket event API and REST services

pub mod error;
pub mod protocol;
pub mod rest;
pub mod transport;
pub mod websocket;

pub use error::Error;
pub use protocol::{APP_EVENT_TYPE, EventData, WEBSOCKET_PATH};
pub use rest::HubRestClient;
pub use websocket::{
    ConnectionClient, ConnectionHandle, ConnectionState, DisconnectReceiver, ReconnectConfig,
    backoff_delay,
};
