use std::sync::Arc;

use posrelay_frame::{decode_position, unix_millis, DecoderConfig};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{ClientChannel, ClientRecord};
use crate::error::{RelayError, Result};
use crate::queue::{MessageQueue, ReceiveConfig};

/// Settings of one relay session.
#[derive(Debug, Clone, Default)]
pub struct RelayConfig {
    pub receive: ReceiveConfig,
    pub decoder: DecoderConfig,
}

/// Counters for a finished (or running) session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub batches: u64,
    pub forwarded: u64,
    pub dropped: u64,
    pub deleted: u64,
}

/// Turn one queue message body into a client record.
///
/// The body is hex text of a raw frame. `received_at_ms` becomes the
/// record's timestamp.
pub fn relay_message(
    body: &str,
    config: &DecoderConfig,
    received_at_ms: u64,
) -> Result<ClientRecord> {
    let raw = hex::decode(body.trim())?;
    let sample = decode_position(&raw, config, received_at_ms)?;
    Ok(ClientRecord::from(&sample))
}

/// Relay loop for one connected client.
///
/// Each iteration receives a batch, forwards every decodable frame and then
/// deletes the whole batch, whatever happened to its messages.
pub struct RelaySession<Q, C> {
    queue: Arc<Q>,
    client: C,
    config: RelayConfig,
    stats: SessionStats,
}

impl<Q, C> RelaySession<Q, C>
where
    Q: MessageQueue,
    C: ClientChannel,
{
    pub fn new(queue: Arc<Q>, client: C, config: RelayConfig) -> Self {
        Self {
            queue,
            client,
            config,
            stats: SessionStats::default(),
        }
    }

    /// Run until `cancel` fires or the client fails.
    ///
    /// Queue errors are logged and the loop goes on. A client send failure
    /// closes the client and is returned.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<SessionStats> {
        let result = loop {
            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => break Ok(()),
                received = self.queue.receive_batch(
                    self.config.receive.max_messages,
                    self.config.receive.wait,
                ) => received,
            };

            let batch = match received {
                Ok(batch) => batch,
                Err(err) => {
                    warn!(error = %err, "queue receive failed");
                    continue;
                }
            };
            if batch.is_empty() {
                debug!("no messages available");
                continue;
            }
            self.stats.batches += 1;

            let decoder = self.config.decoder;
            let mut failure = None;
            for message in &batch {
                let record = match relay_message(&message.body, &decoder, unix_millis()) {
                    Ok(record) => record,
                    Err(err) => {
                        self.stats.dropped += 1;
                        warn!(id = message.id, error = %err, "dropping message");
                        continue;
                    }
                };
                if let Err(err) = self.client.send(&record).await {
                    failure = Some(err);
                    break;
                }
                self.stats.forwarded += 1;
            }

            let receipts: Vec<String> = batch.iter().map(|m| m.receipt.clone()).collect();
            match self.queue.delete_batch(&receipts).await {
                Ok(outcome) => {
                    self.stats.deleted += outcome.deleted as u64;
                    if !outcome.failed.is_empty() {
                        warn!(failed = outcome.failed.len(), "some deletes failed");
                    }
                }
                Err(err) => warn!(error = %err, "queue delete failed"),
            }

            if let Some(err) = failure {
                break Err(err);
            }
        };

        self.client.close().await;
        match result {
            Ok(()) => {
                info!(
                    forwarded = self.stats.forwarded,
                    dropped = self.stats.dropped,
                    "relay session stopped"
                );
                Ok(self.stats)
            }
            Err(err) => {
                warn!(error = %err, forwarded = self.stats.forwarded, "relay session ended");
                Err(err)
            }
        }
    }
}
