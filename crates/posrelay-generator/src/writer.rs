use bytes::Bytes;
use posrelay_transport::PacketSink;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::error::{GeneratorError, Result};

/// Frames written before the writer stopped, and why it stopped early.
pub type WriterResult = std::result::Result<u64, (u64, GeneratorError)>;

/// Default number of encoded frames that may wait for the writer.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Configuration for the single-writer task.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Bound of the producer-to-writer channel. A full channel makes
    /// producers wait. Default: 64.
    pub channel_capacity: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Producer handle: hands finished frames to the writer.
#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: mpsc::Sender<Bytes>,
}

impl FrameSender {
    /// Queue one frame, waiting while the channel is full.
    ///
    /// Fails with [`GeneratorError::WriterClosed`] once the writer has stopped.
    pub async fn send(&self, frame: Bytes) -> Result<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| GeneratorError::WriterClosed)
    }
}

/// Sole owner of the packet sink. Frames are written strictly one at a time,
/// in the order they arrive on the channel.
pub struct FrameWriter<S> {
    sink: S,
    rx: mpsc::Receiver<Bytes>,
}

/// Create a writer for `sink` and the sender producers use to reach it.
pub fn frame_channel<S: PacketSink>(
    sink: S,
    config: &WriterConfig,
) -> (FrameSender, FrameWriter<S>) {
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    (FrameSender { tx }, FrameWriter { sink, rx })
}

impl<S: PacketSink> FrameWriter<S> {
    /// Write frames until every sender is dropped or `cancel` fires.
    ///
    /// Returns the number of frames written. The first transport failure
    /// stops the writer and is returned with the count reached before it.
    /// Dropping the receiver then fails every producer's next send.
    pub async fn run(mut self, cancel: CancellationToken) -> WriterResult {
        let destination = self.sink.describe();
        debug!(%destination, "frame writer started");
        let mut written = 0u64;

        loop {
            let frame = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                frame = self.rx.recv() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
            };

            if let Err(err) = self.sink.send_packet(&frame).await {
                error!(%destination, error = %err, written, "write failed, stopping frame writer");
                return Err((written, err.into()));
            }
            written += 1;
            trace!(%destination, size = frame.len(), "frame written");
        }

        info!(%destination, written, "frame writer stopped");
        Ok(written)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use posrelay_transport::TransportError;

    use super::*;

    /// Records packets; optionally fails once `fail_after` packets were accepted.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingSink {
        pub packets: Arc<Mutex<Vec<Vec<u8>>>>,
        pub fail_after: Option<usize>,
    }

    impl PacketSink for RecordingSink {
        async fn send_packet(&mut self, packet: &[u8]) -> posrelay_transport::Result<()> {
            let mut packets = self.packets.lock().unwrap();
            if self.fail_after.is_some_and(|limit| packets.len() >= limit) {
                return Err(TransportError::Write(io::ErrorKind::BrokenPipe.into()));
            }
            packets.push(packet.to_vec());
            Ok(())
        }

        fn describe(&self) -> String {
            "memory://recording".to_string()
        }
    }

    #[tokio::test]
    async fn writes_in_arrival_order_until_senders_drop() {
        let sink = RecordingSink::default();
        let packets = Arc::clone(&sink.packets);
        let (sender, writer) = frame_channel(sink, &WriterConfig::default());
        let task = tokio::spawn(writer.run(CancellationToken::new()));

        for i in 0..5u8 {
            sender.send(Bytes::from(vec![i; 3])).await.unwrap();
        }
        drop(sender);

        assert_eq!(task.await.unwrap().unwrap(), 5);
        let packets = packets.lock().unwrap();
        let firsts: Vec<u8> = packets.iter().map(|p| p[0]).collect();
        assert_eq!(firsts, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn cancellation_stops_writer() {
        let (sender, writer) = frame_channel(RecordingSink::default(), &WriterConfig::default());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(writer.run(cancel.clone()));

        cancel.cancel();
        assert_eq!(task.await.unwrap().unwrap(), 0);
        assert!(matches!(
            sender.send(Bytes::from_static(b"late")).await,
            Err(GeneratorError::WriterClosed)
        ));
    }

    #[tokio::test]
    async fn transport_failure_closes_channel() {
        let sink = RecordingSink {
            fail_after: Some(2),
            ..RecordingSink::default()
        };
        let (sender, writer) = frame_channel(sink, &WriterConfig::default());
        let task = tokio::spawn(writer.run(CancellationToken::new()));

        for _ in 0..3 {
            sender.send(Bytes::from_static(b"frame")).await.unwrap();
        }

        let (written, err) = task.await.unwrap().unwrap_err();
        assert_eq!(written, 2);
        assert!(matches!(err, GeneratorError::Transport(TransportError::Write(_))));
        assert!(matches!(
            sender.send(Bytes::from_static(b"after")).await,
            Err(GeneratorError::WriterClosed)
        ));
    }

    #[tokio::test]
    async fn zero_capacity_is_clamped() {
        let config = WriterConfig {
            channel_capacity: 0,
        };
        let (sender, writer) = frame_channel(RecordingSink::default(), &config);
        let task = tokio::spawn(writer.run(CancellationToken::new()));
        sender.send(Bytes::from_static(b"x")).await.unwrap();
        drop(sender);
        assert_eq!(task.await.unwrap().unwrap(), 1);
    }
}
