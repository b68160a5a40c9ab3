use thiserror::Error;

/// Failure to configure or install the global logger.
#[derive(Debug, Error)]
pub enum LoggerError {
    /// Unknown output format; carries the raw input.
    #[error("unknown log format `{0}` (expected text, json or journald)")]
    InvalidFormat(String),
    #[error("journald output needs Linux and the `journald` feature")]
    JournaldNotSupported,
    /// A global `tracing` subscriber is already installed.
    #[error("global logger already installed")]
    AlreadyInitialized,
    #[error("logger setup failed: {0}")]
    InitializationFailed(String),
    /// `level` is not a valid `EnvFilter` directive.
    #[error("invalid log filter `{0}`")]
    InvalidLogLevel(String),
}
