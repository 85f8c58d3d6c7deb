//! Position frame codec.
//!
//! This is the core layer of posrelay. A position sample travels as a
//! fixed-size, MAVLink2-style frame:
//! - A 10-byte header (magic 0xFD, payload length, flags, sequence, system
//!   and component ids, 3-byte little-endian message id)
//! - A 28-byte `GLOBAL_POSITION_INT` payload, packed from a declarative
//!   field table
//! - A 2-byte little-endian checksum, extended with a per-message extra byte
//!
//! Encoding never fails. Decoding fails per buffer with a [`FrameError`] and
//! keeps no state between calls.

pub mod codec;
pub mod crc;
pub mod error;
pub mod message;
pub mod sample;

pub use codec::{
    decode_frame, decode_position, encode_frame, encode_position, DecoderConfig, Frame,
    FrameHeader, CHECKSUM_SIZE, COMPONENT_ID, HEADER_SIZE, MAGIC,
};
pub use error::{FrameError, Malformed, Result};
pub use message::{MessageSpec, GLOBAL_POSITION_INT, GLOBAL_POSITION_INT_ID};
pub use sample::{unix_millis, PositionSample};

/// Wire size of an encoded position frame.
pub const POSITION_FRAME_SIZE: usize = HEADER_SIZE + 28 + CHECKSUM_SIZE;
