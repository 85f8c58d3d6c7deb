//! Queue-to-client relay for position frames.
//!
//! A relay session long-polls a [`MessageQueue`] for batches of hex-encoded
//! frames, decodes each one and forwards a [`ClientRecord`] to its client.
//! Every received batch is deleted afterwards, whatever the outcome of its
//! messages. A bad frame costs only that frame; a failed client write ends
//! the session.
//!
//! For local runs the queue is an [`InMemoryQueue`] fed by [`UdpIngest`], and
//! clients connect over websockets to a [`RelayServer`].

pub mod client;
pub mod error;
pub mod ingest;
pub mod queue;
pub mod session;
pub mod websocket;

pub use client::{ChannelClient, ClientChannel, ClientRecord};
pub use error::{QueueError, RelayError, Result};
pub use ingest::UdpIngest;
pub use queue::{
    DeleteOutcome, InMemoryQueue, MessageQueue, QueueMessage, ReceiveConfig, DEFAULT_MAX_MESSAGES,
    DEFAULT_WAIT,
};
pub use session::{relay_message, RelayConfig, RelaySession, SessionStats};
pub use websocket::{RelayServer, RelayServerHandle, WebSocketClient};
