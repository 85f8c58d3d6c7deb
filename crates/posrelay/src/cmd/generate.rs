use posrelay_generator::{default_fleet, load_fleet, Fleet, FleetConfig, WriterConfig};
use posrelay_transport::AsyncUdpEndpoint;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cmd::{parse_duration, runtime, shutdown_signal, GenerateArgs};
use crate::exit::{generator_error, transport_error, CliError, CliResult, SUCCESS, TRANSPORT_ERROR};

pub fn run(args: GenerateArgs) -> CliResult<i32> {
    let sources = match &args.fleet {
        Some(path) => load_fleet(path).map_err(|err| generator_error("fleet load failed", err))?,
        None => default_fleet(),
    };
    let config = FleetConfig {
        interval: parse_duration(&args.interval)?,
        sequence: args.sequence,
        writer: WriterConfig {
            channel_capacity: args.channel_capacity,
        },
    };
    let fleet =
        Fleet::new(sources, config).map_err(|err| generator_error("invalid fleet", err))?;

    runtime()?.block_on(async move {
        let sink = AsyncUdpEndpoint::connect(&args.endpoint)
            .await
            .map_err(|err| transport_error("connect failed", err))?;
        info!(
            endpoint = %args.endpoint,
            sources = fleet.sources().len(),
            "generating frames"
        );

        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        let signals = tokio::spawn(async move {
            shutdown_signal().await;
            on_signal.cancel();
        });

        let report = fleet
            .run(sink, cancel)
            .await
            .map_err(|err| generator_error("fleet failed", err))?;
        signals.abort();

        for source in report.sources.iter().filter(|s| s.error.is_some()) {
            warn!(sys_id = source.sys_id, sent = source.frames_sent, "source ended early");
        }
        match report.writer_error {
            Some(err) => Err(CliError::new(
                TRANSPORT_ERROR,
                format!("transport write failed: {err}"),
            )),
            None => Ok(SUCCESS),
        }
    })
}
