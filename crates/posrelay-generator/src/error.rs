use std::path::PathBuf;

/// Errors that can occur while generating or emitting frames.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// The transport rejected a write.
    #[error("transport error: {0}")]
    Transport(#[from] posrelay_transport::TransportError),

    /// The writer task is gone, so frames can no longer be transmitted.
    #[error("frame writer closed")]
    WriterClosed,

    /// A fleet file could not be read.
    #[error("failed to read fleet file {path}: {source}")]
    FleetFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A fleet file is not valid JSON for a source list.
    #[error("invalid fleet definition: {0}")]
    FleetParse(#[from] serde_json::Error),

    /// The fleet definition is unusable.
    #[error("invalid fleet: {0}")]
    InvalidFleet(String),
}

pub type Result<T> = std::result::Result<T, GeneratorError>;
