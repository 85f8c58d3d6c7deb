//! Declarative payload layouts.
//!
//! Each supported message is described by a [`MessageSpec`]: its id, payload
//! length, checksum extra byte, and a table of [`FieldSpec`]s. Packing and
//! unpacking are driven entirely by the table, so no code outside this module
//! does offset arithmetic.
//!
//! Only `GLOBAL_POSITION_INT` (id 33) is supported.

/// Wire representation of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    U16,
    I16,
    U32,
    I32,
}

impl WireType {
    /// Width in bytes.
    pub const fn width(self) -> usize {
        match self {
            WireType::U16 | WireType::I16 => 2,
            WireType::U32 | WireType::I32 => 4,
        }
    }
}

/// Byte order of a field on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

/// One field of a payload layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    /// Field name, for diagnostics.
    pub name: &'static str,
    /// Byte offset relative to the payload start.
    pub offset: usize,
    /// Integer representation on the wire.
    pub wire: WireType,
    /// Byte order on the wire.
    pub order: ByteOrder,
    /// Wire value = semantic value * scale, truncated toward zero.
    pub scale: f64,
}

impl FieldSpec {
    const fn le(name: &'static str, offset: usize, wire: WireType, scale: f64) -> Self {
        Self {
            name,
            offset,
            wire,
            order: ByteOrder::Little,
            scale,
        }
    }

    /// Byte range occupied by this field inside the payload.
    pub const fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.wire.width()
    }

    /// Scale `value` and write it into `payload`.
    ///
    /// The float-to-integer conversion truncates toward zero and saturates at
    /// the bounds of the wire type.
    pub fn write(&self, payload: &mut [u8], value: f64) {
        let scaled = value * self.scale;
        let dst = &mut payload[self.range()];
        match self.wire {
            WireType::U16 => put(dst, self.order, (scaled as u16).to_le_bytes()),
            WireType::I16 => put(dst, self.order, (scaled as i16).to_le_bytes()),
            WireType::U32 => put(dst, self.order, (scaled as u32).to_le_bytes()),
            WireType::I32 => put(dst, self.order, (scaled as i32).to_le_bytes()),
        }
    }

    /// Read this field from `payload` and undo the scale.
    pub fn read(&self, payload: &[u8]) -> f64 {
        let src = &payload[self.range()];
        let raw = match self.wire {
            WireType::U16 => f64::from(u16::from_le_bytes(take(src, self.order))),
            WireType::I16 => f64::from(i16::from_le_bytes(take(src, self.order))),
            WireType::U32 => f64::from(u32::from_le_bytes(take(src, self.order))),
            WireType::I32 => f64::from(i32::from_le_bytes(take(src, self.order))),
        };
        raw / self.scale
    }
}

fn put<const N: usize>(dst: &mut [u8], order: ByteOrder, mut le: [u8; N]) {
    if order == ByteOrder::Big {
        le.reverse();
    }
    dst.copy_from_slice(&le);
}

fn take<const N: usize>(src: &[u8], order: ByteOrder) -> [u8; N] {
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(src);
    if order == ByteOrder::Big {
        bytes.reverse();
    }
    bytes
}

/// Layout and checksum parameters of one message type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MessageSpec {
    /// 24-bit message id.
    pub id: u32,
    pub name: &'static str,
    /// Exact payload length in bytes.
    pub payload_len: usize,
    /// Extra byte folded into the checksum.
    pub crc_extra: u8,
    /// Fields in wire order.
    pub fields: &'static [FieldSpec],
}

impl MessageSpec {
    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Pack semantic values (in table order) into a zeroed payload buffer.
    ///
    /// Missing trailing values leave their fields zeroed; extra values are
    /// ignored.
    pub fn pack(&self, values: &[f64]) -> Vec<u8> {
        let mut payload = vec![0u8; self.payload_len];
        for (field, value) in self.fields.iter().zip(values) {
            field.write(&mut payload, *value);
        }
        payload
    }

    /// Unpack every field of `payload` into semantic values, in table order.
    ///
    /// `payload` must be at least `payload_len` bytes.
    pub fn unpack(&self, payload: &[u8]) -> Vec<f64> {
        self.fields.iter().map(|field| field.read(payload)).collect()
    }
}

/// `GLOBAL_POSITION_INT` message id.
pub const GLOBAL_POSITION_INT_ID: u32 = 33;

/// Latitude/longitude wire scale (degrees * 1e7).
pub const DEGREES_E7: f64 = 1e7;

const GLOBAL_POSITION_INT_FIELDS: [FieldSpec; 9] = [
    FieldSpec::le("time_boot_ms", 0, WireType::U32, 1.0),
    FieldSpec::le("lat", 4, WireType::I32, DEGREES_E7),
    FieldSpec::le("lon", 8, WireType::I32, DEGREES_E7),
    FieldSpec::le("alt", 12, WireType::I32, 1.0),
    FieldSpec::le("relative_alt", 16, WireType::I32, 1.0),
    FieldSpec::le("vx", 20, WireType::I16, 1.0),
    FieldSpec::le("vy", 22, WireType::I16, 1.0),
    FieldSpec::le("vz", 24, WireType::I16, 1.0),
    FieldSpec::le("hdg", 26, WireType::U16, 1.0),
];

/// Fused position estimate: the only message this crate speaks.
pub const GLOBAL_POSITION_INT: MessageSpec = MessageSpec {
    id: GLOBAL_POSITION_INT_ID,
    name: "GLOBAL_POSITION_INT",
    payload_len: 28,
    crc_extra: 104,
    fields: &GLOBAL_POSITION_INT_FIELDS,
};

/// Resolve a message id to its layout.
pub fn lookup(id: u32) -> Option<&'static MessageSpec> {
    match id {
        GLOBAL_POSITION_INT_ID => Some(&GLOBAL_POSITION_INT),
        _ => None,
    }
}
