use posrelay_frame::{decode_position, unix_millis, DecoderConfig};

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_sample, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let raw = parse_hex(&args.frame)?;
    let config = DecoderConfig {
        verify_checksum: !args.no_verify_checksum,
    };
    let received_at_ms = args.received_at_ms.unwrap_or_else(unix_millis);

    let sample = decode_position(&raw, &config, received_at_ms)
        .map_err(|err| frame_error("decode failed", err))?;
    print_sample(&sample, format);
    Ok(SUCCESS)
}

/// Hex with optional whitespace and `0x` prefix.
fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let trimmed = input.trim();
    let digits: String = trimmed
        .strip_prefix("0x")
        .unwrap_or(trimmed)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    hex::decode(&digits)
        .map_err(|err| CliError::new(DATA_INVALID, format!("frame is not valid hex: {err}")))
}
