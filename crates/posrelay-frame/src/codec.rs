use bytes::{BufMut, Bytes, BytesMut};

use crate::crc::{checksum_of, extend};
use crate::error::{FrameError, Malformed, Result};
use crate::message::{lookup, MessageSpec, GLOBAL_POSITION_INT};
use crate::sample::PositionSample;

/// Frame start marker.
pub const MAGIC: u8 = 0xFD;

/// Header: magic (1) + len (1) + incompat (1) + compat (1) + seq (1)
/// + sysid (1) + compid (1) + msgid (3) = 10 bytes.
pub const HEADER_SIZE: usize = 10;

/// Trailing checksum size.
pub const CHECKSUM_SIZE: usize = 2;

/// Component id stamped on every encoded frame.
pub const COMPONENT_ID: u8 = 1;

const LEN_OFFSET: usize = 1;
const SEQ_OFFSET: usize = 4;
const SYSID_OFFSET: usize = 5;
const COMPID_OFFSET: usize = 6;
const MSGID_OFFSET: usize = 7;

/// Parsed frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub payload_len: u8,
    pub incompat_flags: u8,
    pub compat_flags: u8,
    pub sequence: u8,
    pub system_id: u8,
    pub component_id: u8,
    /// 24-bit message id.
    pub message_id: u32,
}

/// A validated frame of a supported message type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: Bytes,
    /// Checksum as carried on the wire.
    pub checksum: u16,
}

impl Frame {
    /// Layout of this frame's message.
    pub fn spec(&self) -> &'static MessageSpec {
        // decode_frame only builds frames for known ids.
        lookup(self.header.message_id).unwrap_or(&GLOBAL_POSITION_INT)
    }

    /// The total wire size of this frame (header + payload + checksum).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len() + CHECKSUM_SIZE
    }
}

/// Configuration for frame decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Recompute and compare the trailing checksum. Default: true.
    ///
    /// Disable only to accept frames from producers with broken checksums,
    /// matching receivers that never looked at the trailer.
    pub verify_checksum: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            verify_checksum: true,
        }
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌───────┬─────┬──────────┬────────┬─────┬───────┬────────┬───────────┬─────────┬──────────┐
/// │ Magic │ Len │ Incompat │ Compat │ Seq │ SysID │ CompID │ MsgID     │ Payload │ Checksum │
/// │ 0xFD  │ 1B  │ 0x00     │ 0x00   │ 1B  │ 1B    │ 1B     │ (3B LE)   │ Len B   │ (2B LE)  │
/// └───────┴─────┴──────────┴────────┴─────┴───────┴────────┴───────────┴─────────┴──────────┘
/// ```
///
/// The checksum covers everything after the magic byte and is then extended
/// with the message's extra byte.
pub fn encode_frame(
    spec: &MessageSpec,
    sequence: u8,
    system_id: u8,
    payload: &[u8],
    dst: &mut BytesMut,
) {
    debug_assert_eq!(payload.len(), spec.payload_len);

    let start = dst.len();
    dst.reserve(HEADER_SIZE + payload.len() + CHECKSUM_SIZE);
    dst.put_u8(MAGIC);
    dst.put_u8(payload.len() as u8);
    dst.put_u8(0x00); // incompat flags
    dst.put_u8(0x00); // compat flags
    dst.put_u8(sequence);
    dst.put_u8(system_id);
    dst.put_u8(COMPONENT_ID);
    dst.put_slice(&spec.id.to_le_bytes()[..3]);
    dst.put_slice(payload);

    let checksum = extend(checksum_of(&dst[start + 1..]), spec.crc_extra);
    dst.put_u16_le(checksum);
}

/// Encode a position sample as a complete `GLOBAL_POSITION_INT` frame.
///
/// Latitude and longitude are scaled by 1e7 and truncated toward zero; the
/// sample's millisecond clock goes out as its low 32 bits.
pub fn encode_position(sample: &PositionSample, sequence: u8) -> Bytes {
    let spec = &GLOBAL_POSITION_INT;
    let payload = spec.pack(&sample.wire_values());
    let mut dst = BytesMut::with_capacity(HEADER_SIZE + spec.payload_len + CHECKSUM_SIZE);
    encode_frame(spec, sequence, sample.sys_id, &payload, &mut dst);
    dst.freeze()
}

/// Decode one frame from a buffer holding exactly one datagram.
///
/// Checks run in a fixed order: length, message id, magic and declared
/// length, then checksum (if enabled). An unsupported message id is reported
/// before anything past the header is looked at. Bytes after the checksum are
/// ignored.
pub fn decode_frame(src: &[u8], config: &DecoderConfig) -> Result<Frame> {
    if src.len() < HEADER_SIZE {
        return Err(Malformed::TooShort {
            len: src.len(),
            needed: HEADER_SIZE,
        }
        .into());
    }

    let payload_len = usize::from(src[LEN_OFFSET]);
    let total = HEADER_SIZE + payload_len + CHECKSUM_SIZE;
    if src.len() < total {
        return Err(Malformed::TooShort {
            len: src.len(),
            needed: total,
        }
        .into());
    }

    let message_id = u32::from_le_bytes([
        src[MSGID_OFFSET],
        src[MSGID_OFFSET + 1],
        src[MSGID_OFFSET + 2],
        0,
    ]);
    let spec = lookup(message_id).ok_or(FrameError::UnsupportedMessageType(message_id))?;

    if src[0] != MAGIC {
        return Err(Malformed::BadMagic(src[0]).into());
    }
    if payload_len != spec.payload_len {
        return Err(Malformed::LengthMismatch {
            declared: payload_len,
            expected: spec.payload_len,
        }
        .into());
    }

    let body_end = HEADER_SIZE + payload_len;
    let checksum = u16::from_le_bytes([src[body_end], src[body_end + 1]]);
    if config.verify_checksum {
        let computed = extend(checksum_of(&src[1..body_end]), spec.crc_extra);
        if computed != checksum {
            return Err(FrameError::ChecksumMismatch {
                received: checksum,
                computed,
            });
        }
    }

    Ok(Frame {
        header: FrameHeader {
            payload_len: src[LEN_OFFSET],
            incompat_flags: src[2],
            compat_flags: src[3],
            sequence: src[SEQ_OFFSET],
            system_id: src[SYSID_OFFSET],
            component_id: src[COMPID_OFFSET],
            message_id,
        },
        payload: Bytes::copy_from_slice(&src[HEADER_SIZE..body_end]),
        checksum,
    })
}

/// Decode a position sample, stamping it with the caller's receipt time.
///
/// The decoder has no clock of its own: the same buffer and `received_at_ms`
/// always yield the same sample.
pub fn decode_position(
    src: &[u8],
    config: &DecoderConfig,
    received_at_ms: u64,
) -> Result<PositionSample> {
    let frame = decode_frame(src, config)?;
    Ok(PositionSample::from_frame(&frame, received_at_ms))
}

impl PositionSample {
    /// Build a sample from a decoded frame.
    pub fn from_frame(frame: &Frame, received_at_ms: u64) -> Self {
        let values = frame.spec().unpack(&frame.payload);
        Self::from_wire_values(frame.header.system_id, received_at_ms, &values)
    }
}
