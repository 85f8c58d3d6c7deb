use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{ClientChannel, ClientRecord};
use crate::error::{RelayError, Result};
use crate::queue::MessageQueue;
use crate::session::{RelayConfig, RelaySession};

/// Client channel over the sending half of an upgraded websocket. Records
/// go out as JSON text.
pub struct WebSocketClient {
    sink: SplitSink<WebSocket, Message>,
}

impl WebSocketClient {
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self { sink }
    }
}

impl ClientChannel for WebSocketClient {
    async fn send(&mut self, record: &ClientRecord) -> Result<()> {
        let text = serde_json::to_string(record)?;
        self.sink
            .send(Message::Text(text))
            .await
            .map_err(|err| RelayError::ClientSend(err.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.sink.send(Message::Close(None)).await;
        let _ = self.sink.close().await;
    }
}

struct ServerState<Q> {
    queue: Arc<Q>,
    config: RelayConfig,
    allowed_origin: Option<String>,
    cancel: CancellationToken,
    next_session: AtomicU64,
}

/// Serves `GET /ws`; every accepted client gets its own relay session over
/// the shared queue.
pub struct RelayServer<Q> {
    listen: SocketAddr,
    queue: Arc<Q>,
    config: RelayConfig,
    allowed_origin: Option<String>,
}

impl<Q> RelayServer<Q>
where
    Q: MessageQueue + 'static,
{
    pub fn new(listen: SocketAddr, queue: Arc<Q>) -> Self {
        Self {
            listen,
            queue,
            config: RelayConfig::default(),
            allowed_origin: None,
        }
    }

    /// Reject upgrades whose `Origin` header is not exactly `origin`.
    pub fn with_allowed_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_origin = Some(origin.into());
        self
    }

    /// Override session config.
    pub fn with_config(mut self, config: RelayConfig) -> Self {
        self.config = config;
        self
    }

    /// Bind and start serving. Cancelling `cancel` stops the server and
    /// every session.
    pub async fn spawn(self, cancel: CancellationToken) -> Result<RelayServerHandle> {
        let listener = TcpListener::bind(self.listen).await?;
        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, "relay server listening");

        let state = Arc::new(ServerState {
            queue: self.queue,
            config: self.config,
            allowed_origin: self.allowed_origin,
            cancel: cancel.clone(),
            next_session: AtomicU64::new(1),
        });

        let app = Router::new()
            .route("/ws", get(upgrade_handler::<Q>))
            .with_state(state);

        let shutdown = cancel.clone();
        let task = tokio::spawn(async move {
            let server = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await });
            if let Err(err) = server.await {
                warn!(error = %err, "relay server exited with error");
            }
        });

        Ok(RelayServerHandle {
            address: local_addr,
            cancel,
            task,
        })
    }
}

/// Handle for the running relay server.
pub struct RelayServerHandle {
    address: SocketAddr,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RelayServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// Stop serving and wait for the server task.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.task.await {
            warn!(error = %err, "relay server task failed");
        }
    }
}

fn origin_allowed(allowed: Option<&str>, headers: &HeaderMap) -> bool {
    match allowed {
        None => true,
        Some(allowed) => headers
            .get(header::ORIGIN)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|origin| origin == allowed),
    }
}

async fn upgrade_handler<Q>(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<Arc<ServerState<Q>>>,
) -> Response
where
    Q: MessageQueue + 'static,
{
    if !origin_allowed(state.allowed_origin.as_deref(), &headers) {
        let origin = headers
            .get(header::ORIGIN)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("<none>");
        warn!(origin, "rejecting websocket upgrade from disallowed origin");
        return StatusCode::FORBIDDEN.into_response();
    }
    ws.on_upgrade(move |socket| client_session(socket, state))
}

async fn client_session<Q>(socket: WebSocket, state: Arc<ServerState<Q>>)
where
    Q: MessageQueue + 'static,
{
    let session_id = state.next_session.fetch_add(1, Ordering::Relaxed);
    info!(session_id, "client connected");

    let (sink, stream) = socket.split();
    let cancel = state.cancel.child_token();
    tokio::spawn(watch_client(session_id, stream, cancel.clone()));

    let session = RelaySession::new(
        Arc::clone(&state.queue),
        WebSocketClient::new(sink),
        state.config.clone(),
    );
    match session.run(cancel.clone()).await {
        Ok(stats) => info!(session_id, forwarded = stats.forwarded, "client session closed"),
        Err(err) => info!(session_id, error = %err, "client session ended"),
    }
    cancel.cancel();
}

/// Read the client's half of the socket and cancel its session once the
/// client closes or the connection drops. Inbound data is ignored.
async fn watch_client(
    session_id: u64,
    mut stream: SplitStream<WebSocket>,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            next = stream.next() => next,
        };
        match next {
            Some(Ok(Message::Close(_))) | None => break,
            Some(Err(err)) => {
                debug!(session_id, error = %err, "client read failed");
                break;
            }
            Some(Ok(_)) => {}
        }
    }
    info!(session_id, "client went away");
    cancel.cancel();
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::HeaderValue;
    use futures_util::StreamExt;
    use posrelay_frame::{encode_position, PositionSample};
    use tokio::time::timeout;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;
    use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
    use tokio_tungstenite::tungstenite::Error as WsError;

    use super::*;
    use crate::queue::{InMemoryQueue, ReceiveConfig};

    fn fast_config() -> RelayConfig {
        RelayConfig {
            receive: ReceiveConfig {
                max_messages: 10,
                wait: Duration::from_millis(100),
            },
            ..RelayConfig::default()
        }
    }

    #[test]
    fn origin_check() {
        let mut headers = HeaderMap::new();
        assert!(origin_allowed(None, &headers));
        assert!(!origin_allowed(Some("https://map.example"), &headers));

        headers.insert(header::ORIGIN, HeaderValue::from_static("https://map.example"));
        assert!(origin_allowed(Some("https://map.example"), &headers));
        assert!(!origin_allowed(Some("https://other.example"), &headers));
    }

    #[tokio::test]
    async fn websocket_client_receives_relayed_records() {
        let queue = Arc::new(InMemoryQueue::new());
        let cancel = CancellationToken::new();
        let handle = RelayServer::new("127.0.0.1:0".parse().unwrap(), Arc::clone(&queue))
            .with_config(fast_config())
            .spawn(cancel.clone())
            .await
            .unwrap();
        let url = format!("ws://{}/ws", handle.local_addr());

        let (mut socket, _response) = connect_async(&url).await.unwrap();

        let sample = PositionSample::new(2, 40.0, -74.0);
        queue
            .push(hex::encode(encode_position(&sample, 1)))
            .unwrap();

        let received = timeout(Duration::from_secs(5), socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        match received {
            WsMessage::Text(payload) => {
                let record: ClientRecord = serde_json::from_str(&payload).unwrap();
                assert_eq!(record.sysid, 2);
                assert_eq!(record.lat, 40.0);
                assert_eq!(record.lon, -74.0);
                assert!(record.timestamp > 0);
            }
            other => panic!("unexpected message: {other:?}"),
        }

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn closed_client_stops_taking_batches() {
        let queue = Arc::new(InMemoryQueue::new());
        let handle = RelayServer::new("127.0.0.1:0".parse().unwrap(), Arc::clone(&queue))
            .with_config(fast_config())
            .spawn(CancellationToken::new())
            .await
            .unwrap();
        let url = format!("ws://{}/ws", handle.local_addr());

        let (mut socket, _response) = connect_async(&url).await.unwrap();
        socket.close(None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        let sample = PositionSample::new(3, 1.0, 2.0);
        queue
            .push(hex::encode(encode_position(&sample, 1)))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(queue.pending(), 1);
        assert_eq!(queue.in_flight(), 0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn disallowed_origin_is_forbidden() {
        let queue = Arc::new(InMemoryQueue::new());
        let handle = RelayServer::new("127.0.0.1:0".parse().unwrap(), queue)
            .with_allowed_origin("https://map.example")
            .spawn(CancellationToken::new())
            .await
            .unwrap();
        let url = format!("ws://{}/ws", handle.local_addr());

        let mut request = url.as_str().into_client_request().unwrap();
        request
            .headers_mut()
            .insert("Origin", "https://evil.example".parse().unwrap());
        match connect_async(request).await {
            Err(WsError::Http(response)) => assert_eq!(response.status(), 403),
            Err(err) => panic!("expected 403, got {err}"),
            Ok(_) => panic!("upgrade from a disallowed origin succeeded"),
        }

        let mut request = url.as_str().into_client_request().unwrap();
        request
            .headers_mut()
            .insert("Origin", "https://map.example".parse().unwrap());
        assert!(connect_async(request).await.is_ok());

        handle.shutdown().await;
    }
}
