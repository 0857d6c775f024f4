//! Error types for the aggregation engine.
//!
//! Per-event failures ([`DecodeError`], [`ScoreError`], [`StatsError`],
//! [`RenderError`]) are recovered inside the driver loop and only ever
//! surface in logs and [`crate::consumer::EventOutcome`]s. [`SourceError`]
//! and [`ConsumerError`] cover the event source itself, where acquisition and
//! release failures are fatal.

/// A payload that could not be decoded into an author/message record.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The payload is not valid JSON (or not UTF-8).
    #[error("invalid JSON payload: {source}")]
    InvalidJson {
        /// The underlying parse error.
        #[from]
        source: serde_json::Error,
    },

    /// The payload is valid JSON but not an object.
    #[error("expected a JSON object but got {found}")]
    NotAnObject {
        /// JSON type name of what was found instead.
        found: &'static str,
    },
}

/// The scorer could not produce a polarity for a message.
#[derive(Debug, thiserror::Error)]
#[error("scoring failed: {message}")]
pub struct ScoreError {
    /// Description of the failure.
    pub message: String,
}

impl ScoreError {
    /// Create a scoring error from any displayable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The aggregation state refused an update.
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    /// The score was `NaN` or infinite and would poison the author's mean.
    #[error("non-finite sentiment score {score} for author {author}")]
    NonFiniteScore {
        /// Author the score was meant for.
        author: String,
        /// The rejected score.
        score: f64,
    },
}

/// A renderer failed to redraw.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The drawing backend (terminal, window) reported a failure.
    #[error("render backend error: {0}")]
    Backend(String),

    /// I/O failure while writing the frame.
    #[error("render I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

/// Errors raised by an event source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Could not connect to or open the source.
    #[error("failed to open event source: {0}")]
    Connect(String),

    /// Pulling the next record failed mid-stream.
    #[error("failed to pull next record: {0}")]
    Pull(String),

    /// Releasing the source (unsubscribe, close) failed.
    #[error("failed to release event source: {0}")]
    Release(String),
}

/// A per-event failure after the payload decoded successfully.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    /// The scorer failed.
    #[error(transparent)]
    Score(#[from] ScoreError),

    /// The update rule rejected the score.
    #[error(transparent)]
    Update(#[from] StatsError),

    /// The renderer failed after the update was committed.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Fatal errors that end [`crate::consumer::SentimentConsumer::run`].
#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    /// The event source could not be released on shutdown.
    #[error("event source release failed: {source}")]
    Release {
        /// The underlying source error.
        source: SourceError,
    },

    /// `run` was called on a consumer that already reached STOPPED.
    #[error("consumer already stopped; create a new consumer to resume")]
    AlreadyStopped,
}
