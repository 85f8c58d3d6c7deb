//! Vehicle position telemetry over MAVLink2-style frames.
//!
//! # Crate Structure
//!
//! - [`frame`]: the `GLOBAL_POSITION_INT` frame codec and its checksum
//! - [`transport`]: UDP packet transport
//! - [`generator`]: simulated sources behind a single writer (behind `generator` feature)
//! - [`relay`]: queue-to-client relay and websocket server (behind `relay` feature)

/// Re-export frame types.
pub mod frame {
    pub use posrelay_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use posrelay_transport::*;
}

/// Re-export generator types (requires `generator` feature).
#[cfg(feature = "generator")]
pub mod generator {
    pub use posrelay_generator::*;
}

/// Re-export relay types (requires `relay` feature).
#[cfg(feature = "relay")]
pub mod relay {
    pub use posrelay_relay::*;
}
