/// Why a buffer could not be treated as a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Malformed {
    /// The buffer ends before the header, payload or checksum does.
    #[error("buffer too short ({len} bytes, need {needed})")]
    TooShort { len: usize, needed: usize },

    /// The first byte is not the frame start marker.
    #[error("invalid frame magic 0x{0:02X} (expected 0xFD)")]
    BadMagic(u8),

    /// The declared payload length does not match the message layout.
    #[error("declared payload length {declared} does not match message length {expected}")]
    LengthMismatch { declared: usize, expected: usize },
}

/// Errors that can occur while decoding a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The buffer is truncated or internally inconsistent.
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] Malformed),

    /// The frame carries a message type this codec does not speak.
    #[error("unsupported message type {0}")]
    UnsupportedMessageType(u32),

    /// The trailing checksum does not match the frame contents.
    #[error("checksum mismatch (frame 0x{received:04X}, computed 0x{computed:04X})")]
    ChecksumMismatch { received: u16, computed: u16 },
}

pub type Result<T> = std::result::Result<T, FrameError>;
