mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "posrelay", version, about = "Vehicle position telemetry relay")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        env = "POSRELAY_LOG_LEVEL",
        default_value = "info",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use posrelay_generator::SequenceMode;

    use super::*;

    #[test]
    fn parses_encode_with_negative_longitude() {
        let cli = Cli::try_parse_from([
            "posrelay", "encode", "--lat", "51.5084", "--lon", "-0.1278", "--heading", "9000",
        ])
        .expect("encode args should parse");

        match cli.command {
            Command::Encode(args) => {
                assert_eq!(args.sample.lon, -0.1278);
                assert_eq!(args.sample.seq, 1);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_generate_sequence_mode() {
        let cli = Cli::try_parse_from([
            "posrelay",
            "generate",
            "--endpoint",
            "127.0.0.1:9",
            "--sequence",
            "incrementing",
        ])
        .expect("generate args should parse");

        match cli.command {
            Command::Generate(args) => assert_eq!(args.sequence, SequenceMode::Incrementing),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_sequence_mode() {
        let err = Cli::try_parse_from(["posrelay", "generate", "--sequence", "random"])
            .expect_err("unknown sequence mode should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn encode_requires_coordinates() {
        let err = Cli::try_parse_from(["posrelay", "encode", "--lat", "1.0"])
            .expect_err("missing --lon should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_relay_flags() {
        let cli = Cli::try_parse_from([
            "posrelay",
            "relay",
            "--allowed-origin",
            "https://map.example",
            "--no-verify-checksum",
            "--wait",
            "500ms",
        ])
        .expect("relay args should parse");
        match cli.command {
            Command::Relay(args) => {
                assert_eq!(args.allowed_origin.as_deref(), Some("https://map.example"));
                assert!(args.no_verify_checksum);
                assert_eq!(args.max_batch, 10);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
