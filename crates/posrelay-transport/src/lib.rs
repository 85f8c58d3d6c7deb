//! Datagram packet transport.
//!
//! Frames travel one per datagram over UDP. This crate provides:
//! - [`UdpEndpoint`], a blocking socket for one-shot senders and listeners
//! - `AsyncUdpEndpoint` and the [`PacketSink`] seam (behind the `async`
//!   feature), used by long-running producers and ingest loops
//!
//! Delivery is unreliable by nature: nothing here retries or acknowledges.

pub mod error;
#[cfg(feature = "async")]
pub mod traits;
pub mod udp;
#[cfg(feature = "async")]
pub mod udp_async;

pub use error::{Result, TransportError};
#[cfg(feature = "async")]
pub use traits::PacketSink;
pub use udp::{UdpEndpoint, MAX_DATAGRAM_SIZE};
#[cfg(feature = "async")]
pub use udp_async::AsyncUdpEndpoint;
