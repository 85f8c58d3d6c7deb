use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use posrelay_frame::PositionSample;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct SampleOutput {
    sysid: u8,
    timestamp_ms: u64,
    lat: f64,
    lon: f64,
    alt_mm: i32,
    relative_alt_mm: i32,
    vx: i16,
    vy: i16,
    vz: i16,
    heading_cdeg: u16,
}

impl From<&PositionSample> for SampleOutput {
    fn from(sample: &PositionSample) -> Self {
        Self {
            sysid: sample.sys_id,
            timestamp_ms: sample.timestamp_ms,
            lat: sample.latitude,
            lon: sample.longitude,
            alt_mm: sample.altitude_mm,
            relative_alt_mm: sample.relative_altitude_mm,
            vx: sample.vx,
            vy: sample.vy,
            vz: sample.vz,
            heading_cdeg: sample.heading_cdeg,
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    frame: &'a str,
    size: usize,
    sequence: u8,
    sysid: u8,
    checksum: String,
}

pub fn print_sample(sample: &PositionSample, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&SampleOutput::from(sample))
                    .unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SYSID", "LAT", "LON", "ALT (mm)", "HDG", "TIME (ms)"])
                .add_row(vec![
                    sample.sys_id.to_string(),
                    format!("{:.7}", sample.latitude),
                    format!("{:.7}", sample.longitude),
                    sample.altitude_mm.to_string(),
                    format!("{:.2}", f64::from(sample.heading_cdeg) / 100.0),
                    sample.timestamp_ms.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => println!("{sample}"),
    }
}

/// Print an encoded frame. `raw` is the bare hex string.
pub fn print_frame(frame: &[u8], format: OutputFormat) {
    let encoded = hex::encode(frame);
    let sequence = frame.get(4).copied().unwrap_or_default();
    let sysid = frame.get(5).copied().unwrap_or_default();
    let checksum = match frame {
        [.., lo, hi] => format!("0x{:04x}", u16::from_le_bytes([*lo, *hi])),
        _ => "-".to_string(),
    };

    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                frame: &encoded,
                size: frame.len(),
                sequence,
                sysid,
                checksum,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SYSID", "SEQ", "SIZE", "CHECKSUM", "FRAME"])
                .add_row(vec![
                    sysid.to_string(),
                    sequence.to_string(),
                    frame.len().to_string(),
                    checksum,
                    encoded,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "sys={sysid} seq={sequence} size={} checksum={checksum} frame={encoded}",
                frame.len()
            );
        }
        OutputFormat::Raw => println!("{encoded}"),
    }
}
