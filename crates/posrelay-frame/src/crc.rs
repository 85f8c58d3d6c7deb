//! Running 16-bit frame checksum.
//!
//! This is the MAVLink `crc_accumulate` step (CRC-16/MCRF4XX family), but the
//! fold starts from [`CRC_SEED`] = 0 instead of the usual `0xFFFF`. With a zero
//! seed and no final XOR the result matches CRC-16/KERMIT. The paired generator
//! emits zero-seeded checksums, so the seed must stay as it is.

/// Initial value of the running checksum.
pub const CRC_SEED: u16 = 0x0000;

/// Fold one byte into the running checksum.
pub fn accumulate(crc: u16, byte: u8) -> u16 {
    let mut tmp = byte ^ (crc & 0xFF) as u8;
    tmp ^= tmp << 4;
    let tmp = u16::from(tmp);
    (crc >> 8) ^ (tmp << 8) ^ (tmp << 3) ^ (tmp >> 4)
}

/// Checksum of a byte sequence, starting from [`CRC_SEED`].
pub fn checksum_of(bytes: &[u8]) -> u16 {
    accumulate_all(CRC_SEED, bytes)
}

/// Continue a running checksum over more bytes.
pub fn accumulate_all(crc: u16, bytes: &[u8]) -> u16 {
    bytes.iter().fold(crc, |crc, &byte| accumulate(crc, byte))
}

/// Fold the message-specific extra byte into a finished checksum.
///
/// The extra byte binds the checksum to one payload layout; the value on the
/// wire is always the extended one.
pub fn extend(crc: u16, extra: u8) -> u16 {
    accumulate(crc, extra)
}
