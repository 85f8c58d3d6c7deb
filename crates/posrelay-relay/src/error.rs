/// Errors raised by a message queue.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The queue is at capacity; the message was not stored.
    #[error("queue full ({capacity} messages)")]
    Full { capacity: usize },

    /// The queue backend failed a receive or delete call.
    #[error("queue backend error: {0}")]
    Backend(String),
}

/// Errors that can occur while relaying frames to a client.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The queued frame could not be decoded.
    #[error("frame error: {0}")]
    Frame(#[from] posrelay_frame::FrameError),

    /// A queue message body is not valid hex.
    #[error("message body is not hex: {0}")]
    BodyEncoding(#[from] hex::FromHexError),

    /// Writing to the client failed; the session ends.
    #[error("client send failed: {0}")]
    ClientSend(String),

    /// Queue receive or delete failed.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// Transport error on the ingest socket.
    #[error("transport error: {0}")]
    Transport(#[from] posrelay_transport::TransportError),

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The websocket server could not start.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;
