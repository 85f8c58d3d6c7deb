use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// One position report for one source system.
///
/// `timestamp_ms` is whatever clock the holder assigned: the producer's wall
/// clock before encoding, the receiver's receipt time after decoding. The two
/// are never round-tripped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    /// Source system id.
    pub sys_id: u8,
    /// Unix time in milliseconds.
    pub timestamp_ms: u64,
    /// Degrees, WGS84.
    pub latitude: f64,
    /// Degrees, WGS84.
    pub longitude: f64,
    /// Millimeters above mean sea level.
    pub altitude_mm: i32,
    /// Millimeters above ground.
    pub relative_altitude_mm: i32,
    /// Ground speed north, cm/s.
    pub vx: i16,
    /// Ground speed east, cm/s.
    pub vy: i16,
    /// Ground speed down, cm/s.
    pub vz: i16,
    /// Centidegrees. The builder wraps into 0..=35999; decoded samples carry
    /// the wire value unchanged, which may be out of range.
    pub heading_cdeg: u16,
}

impl PositionSample {
    /// A stationary sample at `latitude`/`longitude` with every other field zeroed.
    pub fn new(sys_id: u8, latitude: f64, longitude: f64) -> Self {
        Self {
            sys_id,
            timestamp_ms: 0,
            latitude,
            longitude,
            altitude_mm: 0,
            relative_altitude_mm: 0,
            vx: 0,
            vy: 0,
            vz: 0,
            heading_cdeg: 0,
        }
    }

    pub fn with_timestamp_ms(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    pub fn with_altitude(mut self, altitude_mm: i32, relative_altitude_mm: i32) -> Self {
        self.altitude_mm = altitude_mm;
        self.relative_altitude_mm = relative_altitude_mm;
        self
    }

    pub fn with_velocity(mut self, vx: i16, vy: i16, vz: i16) -> Self {
        self.vx = vx;
        self.vy = vy;
        self.vz = vz;
        self
    }

    /// Heading is wrapped into 0..=35999.
    pub fn with_heading_cdeg(mut self, heading_cdeg: u16) -> Self {
        self.heading_cdeg = heading_cdeg % 36_000;
        self
    }

    /// Timestamp truncated to whole unix seconds.
    pub fn timestamp_secs(&self) -> u64 {
        self.timestamp_ms / 1000
    }

    /// Semantic values in `GLOBAL_POSITION_INT` table order.
    ///
    /// The millisecond clock is wrapped to 32 bits before it is widened, so
    /// the wire value is the low half of the producer clock.
    pub(crate) fn wire_values(&self) -> [f64; 9] {
        [
            f64::from(self.timestamp_ms as u32),
            self.latitude,
            self.longitude,
            f64::from(self.altitude_mm),
            f64::from(self.relative_altitude_mm),
            f64::from(self.vx),
            f64::from(self.vy),
            f64::from(self.vz),
            f64::from(self.heading_cdeg),
        ]
    }

    /// Rebuild from unpacked values in table order. The wire clock is dropped
    /// in favour of `timestamp_ms`.
    pub(crate) fn from_wire_values(sys_id: u8, timestamp_ms: u64, values: &[f64]) -> Self {
        let value = |index: usize| values.get(index).copied().unwrap_or_default();
        Self {
            sys_id,
            timestamp_ms,
            latitude: value(1),
            longitude: value(2),
            altitude_mm: value(3) as i32,
            relative_altitude_mm: value(4) as i32,
            vx: value(5) as i16,
            vy: value(6) as i16,
            vz: value(7) as i16,
            heading_cdeg: value(8) as u16,
        }
    }
}

/// Wall-clock unix time in milliseconds. A clock before the epoch reads as 0.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl fmt::Display for PositionSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sys={} lat={:.7} lon={:.7} alt={}mm rel_alt={}mm vel=({},{},{})cm/s hdg={:.2}",
            self.sys_id,
            self.latitude,
            self.longitude,
            self.altitude_mm,
            self.relative_altitude_mm,
            self.vx,
            self.vy,
            self.vz,
            f64::from(self.heading_cdeg) / 100.0,
        )
    }
}
