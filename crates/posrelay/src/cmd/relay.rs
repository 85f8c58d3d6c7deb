use std::net::SocketAddr;
use std::sync::Arc;

use posrelay_frame::DecoderConfig;
use posrelay_relay::{InMemoryQueue, ReceiveConfig, RelayConfig, RelayServer, UdpIngest};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cmd::{parse_duration, runtime, shutdown_signal, RelayArgs};
use crate::exit::{relay_error, CliError, CliResult, SUCCESS};

pub fn run(args: RelayArgs) -> CliResult<i32> {
    let bind: SocketAddr = args
        .bind
        .parse()
        .map_err(|err| CliError::usage(format!("invalid --bind address {}: {err}", args.bind)))?;
    if args.max_batch == 0 {
        return Err(CliError::usage("--max-batch must be at least 1"));
    }
    let config = RelayConfig {
        receive: ReceiveConfig {
            max_messages: args.max_batch,
            wait: parse_duration(&args.wait)?,
        },
        decoder: DecoderConfig {
            verify_checksum: !args.no_verify_checksum,
        },
    };
    if args.no_verify_checksum {
        warn!("checksum verification disabled");
    }

    runtime()?.block_on(async move {
        let queue = Arc::new(InMemoryQueue::with_capacity(args.queue_capacity));
        let cancel = CancellationToken::new();

        let ingest = UdpIngest::bind(&args.udp_listen, Arc::clone(&queue))
            .await
            .map_err(|err| relay_error("ingest bind failed", err))?;
        let mut server = RelayServer::new(bind, queue).with_config(config);
        if let Some(origin) = args.allowed_origin {
            server = server.with_allowed_origin(origin);
        }
        let handle = server
            .spawn(cancel.clone())
            .await
            .map_err(|err| relay_error("server start failed", err))?;
        let ingest_task = tokio::spawn(ingest.run(cancel.clone()));
        info!(ws = %handle.local_addr(), "relay ready");

        shutdown_signal().await;
        handle.shutdown().await;
        match ingest_task.await {
            Ok(Ok(enqueued)) => info!(enqueued, "relay stopped"),
            Ok(Err(err)) => warn!(error = %err, "ingest failed"),
            Err(err) => warn!(error = %err, "ingest task failed"),
        }
        Ok(SUCCESS)
    })
}
