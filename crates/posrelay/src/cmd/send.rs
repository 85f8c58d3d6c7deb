use posrelay_frame::encode_position;
use posrelay_transport::UdpEndpoint;
use tracing::info;

use crate::cmd::SendArgs;
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let sample = args.sample.sample()?;
    let frame = encode_position(&sample, args.sample.seq);

    let endpoint = UdpEndpoint::connect(&args.endpoint)
        .map_err(|err| transport_error("connect failed", err))?;
    endpoint
        .send(&frame)
        .map_err(|err| transport_error("send failed", err))?;
    info!(endpoint = %args.endpoint, sys_id = sample.sys_id, size = frame.len(), "frame sent");

    if args.echo {
        print_frame(&frame, format);
    }
    Ok(SUCCESS)
}
