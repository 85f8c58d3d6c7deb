use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use posrelay_frame::{decode_position, unix_millis, DecoderConfig};
use posrelay_transport::{TransportError, UdpEndpoint, MAX_DATAGRAM_SIZE};
use tracing::warn;

use crate::cmd::ListenArgs;
use crate::exit::{transport_error, CliError, CliResult, SUCCESS};
use crate::output::{print_sample, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let endpoint =
        UdpEndpoint::bind(&args.bind).map_err(|err| transport_error("bind failed", err))?;
    endpoint
        .set_read_timeout(Some(POLL_INTERVAL))
        .map_err(|err| transport_error("socket setup failed", err))?;
    let config = DecoderConfig {
        verify_checksum: !args.no_verify_checksum,
    };

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let (len, from) = match endpoint.recv_from(&mut buf) {
            Ok(received) => received,
            Err(TransportError::Io(err))
                if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                continue
            }
            Err(err) => return Err(transport_error("receive failed", err)),
        };

        let sample = match decode_position(&buf[..len], &config, unix_millis()) {
            Ok(sample) => sample,
            Err(err) => {
                warn!(%from, len, error = %err, "dropping datagram");
                continue;
            }
        };

        print_sample(&sample, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                return Ok(SUCCESS);
            }
        }
    }

    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
