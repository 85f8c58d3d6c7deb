use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use posrelay_frame::PositionSample;
use posrelay_generator::SequenceMode;
use tracing::info;

use crate::exit::{CliError, CliResult, INTERNAL};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod generate;
pub mod listen;
pub mod relay;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the simulated fleet against a UDP endpoint.
    Generate(GenerateArgs),
    /// Serve queued frames to websocket clients.
    Relay(RelayArgs),
    /// Encode one frame and print it.
    Encode(EncodeArgs),
    /// Encode one frame and send it over UDP.
    Send(SendArgs),
    /// Decode one hex frame and print the sample.
    Decode(DecodeArgs),
    /// Listen on UDP and print decoded samples.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Generate(args) => generate::run(args),
        Command::Relay(args) => relay::run(args),
        Command::Encode(args) => encode::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// UDP endpoint receiving the frames (host:port).
    #[arg(long, env = "POSRELAY_ENDPOINT", default_value = "127.0.0.1:14550")]
    pub endpoint: String,
    /// JSON fleet file. Default: the built-in six sources.
    #[arg(long, env = "POSRELAY_FLEET", value_name = "FILE")]
    pub fleet: Option<PathBuf>,
    /// Time between frames of one source (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s")]
    pub interval: String,
    /// Sequence numbering: fixed, fixed:<n> or incrementing.
    #[arg(long, default_value = "fixed")]
    pub sequence: SequenceMode,
    /// Frames that may wait for the writer before sources block.
    #[arg(long, default_value_t = posrelay_generator::writer::DEFAULT_CHANNEL_CAPACITY)]
    pub channel_capacity: usize,
}

#[derive(Args, Debug)]
pub struct RelayArgs {
    /// Websocket listen address.
    #[arg(long, env = "POSRELAY_BIND", default_value = "0.0.0.0:1323")]
    pub bind: String,
    /// UDP address whose datagrams feed the queue.
    #[arg(long, env = "POSRELAY_UDP_LISTEN", default_value = "0.0.0.0:14550")]
    pub udp_listen: String,
    /// Only accept websocket upgrades carrying exactly this Origin.
    #[arg(long, env = "POSRELAY_ALLOWED_ORIGIN")]
    pub allowed_origin: Option<String>,
    /// Largest batch taken from the queue at once.
    #[arg(long, default_value_t = posrelay_relay::DEFAULT_MAX_MESSAGES)]
    pub max_batch: usize,
    /// Long-poll wait of one queue receive (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait: String,
    /// Messages the in-memory queue holds before ingest drops datagrams.
    #[arg(long, default_value_t = posrelay_relay::queue::DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,
    /// Accept frames without checking their checksum.
    #[arg(long)]
    pub no_verify_checksum: bool,
}

/// Fields of a single hand-built sample.
#[derive(Args, Debug)]
pub struct SampleArgs {
    /// Source system id.
    #[arg(long, default_value_t = 1)]
    pub sysid: u8,
    /// Latitude in degrees.
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,
    /// Longitude in degrees.
    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,
    /// Altitude in millimeters.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub alt: i32,
    /// Relative altitude in millimeters.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub rel_alt: i32,
    /// Velocity north, east, down in cm/s.
    #[arg(long, value_name = "VX,VY,VZ", value_delimiter = ',', allow_negative_numbers = true)]
    pub velocity: Option<Vec<i16>>,
    /// Heading in centidegrees.
    #[arg(long, default_value_t = 0)]
    pub heading: u16,
    /// Timestamp in unix milliseconds (only the low 32 bits go on the wire).
    #[arg(long, default_value_t = 0)]
    pub timestamp_ms: u64,
    /// Frame sequence number.
    #[arg(long, default_value_t = 1)]
    pub seq: u8,
}

impl SampleArgs {
    pub fn sample(&self) -> CliResult<PositionSample> {
        let (vx, vy, vz) = match self.velocity.as_deref() {
            None => (0, 0, 0),
            Some([vx, vy, vz]) => (*vx, *vy, *vz),
            Some(other) => {
                return Err(CliError::usage(format!(
                    "--velocity takes exactly three values, got {}",
                    other.len()
                )))
            }
        };
        if !(self.lat.is_finite() && self.lon.is_finite()) {
            return Err(CliError::usage("--lat and --lon must be finite"));
        }
        Ok(PositionSample::new(self.sysid, self.lat, self.lon)
            .with_timestamp_ms(self.timestamp_ms)
            .with_altitude(self.alt, self.rel_alt)
            .with_velocity(vx, vy, vz)
            .with_heading_cdeg(self.heading))
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub sample: SampleArgs,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// UDP endpoint to send to (host:port).
    #[arg(long, env = "POSRELAY_ENDPOINT", default_value = "127.0.0.1:14550")]
    pub endpoint: String,
    #[command(flatten)]
    pub sample: SampleArgs,
    /// Print the frame that was sent.
    #[arg(long)]
    pub echo: bool,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame as hex text.
    pub frame: String,
    /// Accept the frame without checking its checksum.
    #[arg(long)]
    pub no_verify_checksum: bool,
    /// Receipt time stamped on the sample (unix ms). Default: now.
    #[arg(long)]
    pub received_at_ms: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// UDP address to bind.
    #[arg(long, env = "POSRELAY_UDP_LISTEN", default_value = "127.0.0.1:14550")]
    pub bind: String,
    /// Exit after printing N samples.
    #[arg(long)]
    pub count: Option<usize>,
    /// Accept frames without checking their checksum.
    #[arg(long)]
    pub no_verify_checksum: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `5s`, `500ms` or a bare number of seconds.
pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

pub(crate) fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("runtime setup failed: {err}")))
}

/// Resolves on SIGINT, or SIGTERM on unix.
pub(crate) async fn shutdown_signal() {
    let interrupt = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn sample_args_build_sample() {
        let args = SampleArgs {
            sysid: 4,
            lat: 6.5244,
            lon: 3.3792,
            alt: 20_000,
            rel_alt: 5,
            velocity: Some(vec![1, -2, 3]),
            heading: 36_100,
            timestamp_ms: 9,
            seq: 1,
        };
        let sample = args.sample().unwrap();
        assert_eq!(sample.sys_id, 4);
        assert_eq!((sample.vx, sample.vy, sample.vz), (1, -2, 3));
        assert_eq!(sample.heading_cdeg, 100);
        assert_eq!(sample.relative_altitude_mm, 5);
    }

    #[test]
    fn sample_args_reject_partial_velocity() {
        let args = SampleArgs {
            sysid: 1,
            lat: 0.0,
            lon: 0.0,
            alt: 0,
            rel_alt: 0,
            velocity: Some(vec![1, 2]),
            heading: 0,
            timestamp_ms: 0,
            seq: 1,
        };
        assert_eq!(args.sample().unwrap_err().code, crate::exit::USAGE);
    }
}
