use posrelay_frame::PositionSample;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::SequenceMode;

/// Default per-tick drift in degrees (~165 m of latitude).
pub const DEFAULT_DRIFT: f64 = 0.0015;

/// Default altitude in millimeters.
pub const DEFAULT_ALTITUDE_MM: i32 = 20_000;

/// Starting point and motion parameters of one simulated source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// System id stamped on every frame.
    pub id: u8,
    pub lat: f64,
    pub lon: f64,
    /// Drift scale in degrees per tick.
    #[serde(default = "default_drift")]
    pub drift: f64,
    /// Heading in whole degrees. Decides drift direction and the reported heading.
    #[serde(default = "default_heading")]
    pub heading_deg: u16,
    #[serde(default = "default_altitude")]
    pub altitude_mm: i32,
}

fn default_drift() -> f64 {
    DEFAULT_DRIFT
}

fn default_heading() -> u16 {
    90
}

fn default_altitude() -> i32 {
    DEFAULT_ALTITUDE_MM
}

impl SourceConfig {
    pub fn new(id: u8, lat: f64, lon: f64, heading_deg: u16) -> Self {
        Self {
            id,
            lat,
            lon,
            drift: DEFAULT_DRIFT,
            heading_deg,
            altitude_mm: DEFAULT_ALTITUDE_MM,
        }
    }
}

/// The built-in fleet: three sources over London, one each over Lagos,
/// New York and Los Angeles.
pub fn default_fleet() -> Vec<SourceConfig> {
    vec![
        SourceConfig::new(1, 51.5084, -0.1278, 90),
        SourceConfig::new(2, 51.5100, -0.1407, 180),
        SourceConfig::new(3, 51.5033, -0.1195, 270),
        SourceConfig::new(4, 6.5244, 3.3792, 135),
        SourceConfig::new(5, 40.7128, -74.0060, 0),
        SourceConfig::new(6, 34.0522, -118.2437, 180),
    ]
}

/// +1 for headings in 0..=180 degrees, -1 otherwise.
pub fn direction_sign(heading_deg: u16) -> f64 {
    if heading_deg <= 180 {
        1.0
    } else {
        -1.0
    }
}

/// Private, mutable state of one running source.
pub struct DriftState {
    config: SourceConfig,
    lat: f64,
    lon: f64,
    direction: f64,
    rng: StdRng,
    sequence: SequenceMode,
    next_sequence: u8,
}

impl DriftState {
    /// Seed drift from OS entropy.
    pub fn new(config: SourceConfig, sequence: SequenceMode) -> Self {
        Self::with_rng(config, sequence, StdRng::from_entropy())
    }

    /// Deterministic drift, for tests and replays.
    pub fn seeded(config: SourceConfig, sequence: SequenceMode, seed: u64) -> Self {
        Self::with_rng(config, sequence, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: SourceConfig, sequence: SequenceMode, rng: StdRng) -> Self {
        Self {
            lat: config.lat,
            lon: config.lon,
            direction: direction_sign(config.heading_deg),
            config,
            rng,
            sequence,
            next_sequence: 0,
        }
    }

    pub fn sys_id(&self) -> u8 {
        self.config.id
    }

    /// Current position as a sample stamped with `now_ms`.
    pub fn sample(&self, now_ms: u64) -> PositionSample {
        PositionSample::new(self.config.id, self.lat, self.lon)
            .with_timestamp_ms(now_ms)
            .with_altitude(self.config.altitude_mm, 0)
            .with_heading_cdeg(((u32::from(self.config.heading_deg) * 100) % 36_000) as u16)
    }

    /// Sequence number for the next frame.
    pub fn next_sequence(&mut self) -> u8 {
        match self.sequence {
            SequenceMode::Fixed(value) => value,
            SequenceMode::Incrementing => {
                let current = self.next_sequence;
                self.next_sequence = current.wrapping_add(1);
                current
            }
        }
    }

    /// Move one tick: each axis shifts by `(U[0,1) + direction) * drift`.
    pub fn advance(&mut self) {
        let drift = self.config.drift;
        self.lat += (self.rng.gen::<f64>() + self.direction) * drift;
        self.lon += (self.rng.gen::<f64>() + self.direction) * drift;
    }

    pub fn position(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }
}
