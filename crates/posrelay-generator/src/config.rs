use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{GeneratorError, Result};
use crate::source::SourceConfig;
use crate::writer::WriterConfig;

/// How the frame sequence byte is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceMode {
    /// Every frame carries the same sequence number.
    Fixed(u8),
    /// A per-source counter starting at 0 and wrapping at 255.
    Incrementing,
}

impl Default for SequenceMode {
    /// Fixed at 1, which is what existing receivers have always seen.
    fn default() -> Self {
        SequenceMode::Fixed(1)
    }
}

impl FromStr for SequenceMode {
    type Err = String;

    /// `fixed`, `fixed:<n>`, or `incrementing`.
    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        match input.trim() {
            "fixed" => Ok(SequenceMode::default()),
            "incrementing" => Ok(SequenceMode::Incrementing),
            other => match other.strip_prefix("fixed:") {
                Some(value) => value
                    .parse()
                    .map(SequenceMode::Fixed)
                    .map_err(|_| format!("invalid fixed sequence value: {value}")),
                None => Err(format!(
                    "unknown sequence mode {other:?} (expected fixed, fixed:<n> or incrementing)"
                )),
            },
        }
    }
}

/// Runtime settings shared by every source in a fleet.
#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// Time between two frames of the same source. Default: 1 s.
    pub interval: Duration,
    pub sequence: SequenceMode,
    pub writer: WriterConfig,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            sequence: SequenceMode::default(),
            writer: WriterConfig::default(),
        }
    }
}

/// Parse a JSON array of sources.
pub fn parse_fleet(json: &str) -> Result<Vec<SourceConfig>> {
    let sources: Vec<SourceConfig> = serde_json::from_str(json)?;
    validate_fleet(&sources)?;
    Ok(sources)
}

/// Read and parse a fleet file.
pub fn load_fleet(path: &Path) -> Result<Vec<SourceConfig>> {
    let json = std::fs::read_to_string(path).map_err(|source| GeneratorError::FleetFile {
        path: path.to_path_buf(),
        source,
    })?;
    parse_fleet(&json)
}

/// A fleet must be non-empty with unique system ids and finite coordinates.
pub(crate) fn validate_fleet(sources: &[SourceConfig]) -> Result<()> {
    if sources.is_empty() {
        return Err(GeneratorError::InvalidFleet("fleet has no sources".into()));
    }
    let mut seen = HashSet::new();
    for source in sources {
        if !seen.insert(source.id) {
            return Err(GeneratorError::InvalidFleet(format!(
                "duplicate system id {}",
                source.id
            )));
        }
        if !(source.lat.is_finite() && source.lon.is_finite() && source.drift.is_finite()) {
            return Err(GeneratorError::InvalidFleet(format!(
                "source {} has non-finite coordinates",
                source.id
            )));
        }
    }
    Ok(())
}
