use std::fmt;
use std::io;

use posrelay_frame::FrameError;
use posrelay_generator::GeneratorError;
use posrelay_relay::RelayError;
use posrelay_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused => FAILURE,
        io::ErrorKind::AddrInUse | io::ErrorKind::AddrNotAvailable => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Resolve { .. } => CliError::usage(format!("{context}: {err}")),
        TransportError::Bind { source, .. } | TransportError::Connect { source, .. } => {
            io_error(context, source)
        }
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

/// Every frame error means the input bytes are bad.
pub fn frame_error(context: &str, err: FrameError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn generator_error(context: &str, err: GeneratorError) -> CliError {
    match err {
        GeneratorError::Transport(err) => transport_error(context, err),
        GeneratorError::FleetFile { path, source } => {
            io_error(&format!("{context} ({})", path.display()), source)
        }
        GeneratorError::FleetParse(_) | GeneratorError::InvalidFleet(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        GeneratorError::WriterClosed => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
    }
}

pub fn relay_error(context: &str, err: RelayError) -> CliError {
    match err {
        RelayError::Transport(err) => transport_error(context, err),
        RelayError::Server(source) => io_error(context, source),
        RelayError::Frame(err) => frame_error(context, err),
        RelayError::BodyEncoding(_) | RelayError::Json(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        RelayError::ClientSend(_) | RelayError::Queue(_) => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_errors_are_data_invalid() {
        let err = frame_error("decode failed", FrameError::UnsupportedMessageType(0));
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.starts_with("decode failed: "));
    }

    #[test]
    fn bind_in_use_is_transport_error() {
        let err = transport_error(
            "bind failed",
            TransportError::Bind {
                addr: "127.0.0.1:14550".parse().unwrap(),
                source: io::Error::from(io::ErrorKind::AddrInUse),
            },
        );
        assert_eq!(err.code, TRANSPORT_ERROR);
    }

    #[test]
    fn bad_fleet_is_data_invalid() {
        let err = generator_error("fleet", GeneratorError::InvalidFleet("empty".into()));
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn unresolvable_endpoint_is_usage() {
        let err = transport_error(
            "connect failed",
            TransportError::Resolve {
                endpoint: "nowhere".into(),
                source: io::Error::from(io::ErrorKind::NotFound),
            },
        );
        assert_eq!(err.code, USAGE);
    }
}
