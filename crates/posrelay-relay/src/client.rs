use std::future::Future;

use posrelay_frame::PositionSample;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{RelayError, Result};

/// Record forwarded to a live client, one per decoded frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub sysid: u8,
    /// Relay receipt time, unix seconds.
    pub timestamp: u64,
    pub lat: f64,
    pub lon: f64,
}

impl From<&PositionSample> for ClientRecord {
    fn from(sample: &PositionSample) -> Self {
        Self {
            sysid: sample.sys_id,
            timestamp: sample.timestamp_secs(),
            lat: sample.latitude,
            lon: sample.longitude,
        }
    }
}

/// Outbound half of a client connection.
pub trait ClientChannel: Send {
    /// Deliver one record. An error ends the relay session.
    fn send(&mut self, record: &ClientRecord) -> impl Future<Output = Result<()>> + Send;

    /// Close the connection. Best effort.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Client backed by an in-process channel, for embedding and tests.
#[derive(Debug, Clone)]
pub struct ChannelClient {
    tx: mpsc::Sender<ClientRecord>,
}

impl ChannelClient {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ClientRecord>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl ClientChannel for ChannelClient {
    async fn send(&mut self, record: &ClientRecord) -> Result<()> {
        self.tx
            .send(record.clone())
            .await
            .map_err(|_| RelayError::ClientSend("client channel closed".into()))
    }

    async fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_from_sample_uses_receipt_seconds() {
        let sample = PositionSample::new(3, 51.5084, -0.1278).with_timestamp_ms(1_700_000_123_999);
        let record = ClientRecord::from(&sample);
        assert_eq!(record.sysid, 3);
        assert_eq!(record.timestamp, 1_700_000_123);
        assert_eq!(record.lat, 51.5084);
        assert_eq!(record.lon, -0.1278);
    }

    #[test]
    fn record_json_shape() {
        let record = ClientRecord {
            sysid: 2,
            timestamp: 10,
            lat: 40.0,
            lon: -74.0,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"sysid": 2, "timestamp": 10, "lat": 40.0, "lon": -74.0})
        );
    }

    #[tokio::test]
    async fn channel_client_fails_after_receiver_drops() {
        let (mut client, rx) = ChannelClient::new(1);
        drop(rx);
        let record = ClientRecord {
            sysid: 1,
            timestamp: 0,
            lat: 0.0,
            lon: 0.0,
        };
        assert!(matches!(
            client.send(&record).await,
            Err(RelayError::ClientSend(_))
        ));
    }
}
