use std::future::Future;

use crate::error::Result;

/// Anything that can carry one encoded frame per call.
///
/// The generator's writer task owns exactly one sink, so implementations do
/// not need to be shareable; `&mut self` keeps writes strictly sequential.
pub trait PacketSink: Send {
    /// Transmit one complete packet.
    fn send_packet(&mut self, packet: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Human-readable destination, for logs.
    fn describe(&self) -> String;
}
