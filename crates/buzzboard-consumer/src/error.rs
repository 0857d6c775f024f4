//! Error types for the consumer binary.
//!
//! Uses `thiserror` for the startup and shutdown failures that are fatal:
//! bad configuration, NATS connectivity, replay files, terminal setup, and
//! releasing the event source.

use buzzboard_core::ConsumerError;

/// Errors that can stop the consumer process.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration is invalid.
    #[error("config error: {0}")]
    Config(String),

    /// Failed to connect to or subscribe on the NATS server.
    #[error("NATS error: {0}")]
    Nats(String),

    /// Failed to open the replay file.
    #[error("replay file error: {0}")]
    Replay(String),

    /// Failed to set up the terminal dashboard or log file.
    #[error("terminal error: {0}")]
    Terminal(String),

    /// The driver loop ended fatally.
    #[error("consumer error: {0}")]
    Consumer(#[from] ConsumerError),
}
