use posrelay_frame::encode_position;

use crate::cmd::EncodeArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let sample = args.sample.sample()?;
    let frame = encode_position(&sample, args.sample.seq);
    print_frame(&frame, format);
    Ok(SUCCESS)
}
