use std::sync::Arc;

use posrelay_transport::{AsyncUdpEndpoint, MAX_DATAGRAM_SIZE};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::queue::InMemoryQueue;

/// Feeds the in-memory queue from a UDP socket.
///
/// Every datagram becomes one message whose body is the datagram in hex.
/// Nothing is decoded here; bad frames are dropped by the relay session.
pub struct UdpIngest {
    endpoint: AsyncUdpEndpoint,
    queue: Arc<InMemoryQueue>,
}

impl UdpIngest {
    /// Bind the ingest socket on `addr`.
    pub async fn bind(addr: &str, queue: Arc<InMemoryQueue>) -> Result<Self> {
        let endpoint = AsyncUdpEndpoint::bind(addr).await?;
        Ok(Self { endpoint, queue })
    }

    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.endpoint.local_addr()
    }

    /// Receive until `cancel` fires. Returns the number of enqueued messages.
    pub async fn run(self, cancel: CancellationToken) -> Result<u64> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let mut enqueued = 0u64;
        loop {
            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                received = self.endpoint.recv_from(&mut buf) => received,
            };
            let (len, from) = match received {
                Ok(received) => received,
                Err(err) => {
                    warn!(error = %err, "ingest receive failed");
                    continue;
                }
            };
            match self.queue.push(hex::encode(&buf[..len])) {
                Ok(id) => {
                    enqueued += 1;
                    debug!(id, %from, len, "datagram enqueued");
                }
                Err(err) => warn!(%from, error = %err, "dropping datagram"),
            }
        }
        info!(enqueued, "ingest stopped");
        Ok(enqueued)
    }
}
