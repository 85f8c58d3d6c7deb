use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("posrelay {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: posrelay");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("POSRELAY_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "rustc: {}",
        option_env!("RUSTC_VERSION").unwrap_or("unknown")
    );
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "features: generator={}, relay={}, cli=true",
        cfg!(feature = "generator"),
        cfg!(feature = "relay"),
    );
    println!(
        "frame: GLOBAL_POSITION_INT id={} crc_extra={}",
        posrelay_frame::GLOBAL_POSITION_INT.id,
        posrelay_frame::GLOBAL_POSITION_INT.crc_extra
    );

    Ok(SUCCESS)
}
