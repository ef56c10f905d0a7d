//! Error types for GatiTrack

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// GatiTrack error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Handoff coordination lock not acquired within the bounded wait
    #[error("Handoff lock not acquired within {waited_ms} ms")]
    LockTimeout {
        /// How long the producer waited before giving up
        waited_ms: u64,
    },

    /// Worker thread panicked
    #[error("Thread panicked")]
    ThreadPanic,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
