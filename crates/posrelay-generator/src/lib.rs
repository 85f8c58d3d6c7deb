//! Simulated position sources.
//!
//! Every source runs as its own task on a fixed cadence, keeps private drift
//! state, and encodes its frames locally. Finished frames go over a bounded
//! channel to a single writer task that owns the transport, so writes are
//! strictly sequential and a slow transport pushes back on producers instead
//! of blocking them on a lock.

pub mod config;
pub mod error;
pub mod fleet;
pub mod source;
pub mod writer;

pub use config::{load_fleet, parse_fleet, FleetConfig, SequenceMode};
pub use error::{GeneratorError, Result};
pub use fleet::{Fleet, FleetReport, SourceOutcome};
pub use source::{default_fleet, direction_sign, DriftState, SourceConfig};
pub use writer::{frame_channel, FrameSender, FrameWriter, WriterConfig, WriterResult};
