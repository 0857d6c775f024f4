//! Incremental per-author aggregation and refresh engine for Buzzboard.
//!
//! Buzzboard consumes a stream of `{author, message}` records, scores each
//! message's sentiment, keeps running per-author aggregates, and redraws a
//! two-panel dashboard after every record.
//!
//! # Architecture
//!
//! ```text
//! EventSource --> Decoder --> Scorer --> AuthorStats::record --> Renderer
//!      ^                                                            |
//!      +-------------------- SentimentConsumer::run ----------------+
//! ```
//!
//! # Modules
//!
//! - [`stats`] -- Aggregation state: counts and sentiment history per author
//! - [`consumer`] -- Driver loop, per-event outcomes, run summaries
//! - [`decode`] -- Payload decoder trait and the JSON decoder
//! - [`sentiment`] -- Scorer trait and the lexicon scorer
//! - [`render`] -- Renderer trait, panel model, log and no-op renderers
//! - [`source`] -- Event source trait and the in-memory source
//! - [`event`] -- Raw and decoded record types
//! - [`error`] -- Error types

pub mod consumer;
pub mod decode;
pub mod error;
pub mod event;
pub mod render;
pub mod sentiment;
pub mod source;
pub mod stats;

pub use consumer::{
    ConsumerState, EventOutcome, RunSummary, SentimentConsumer, Stage, StopReason, log_run_end,
};
pub use decode::{Decoder, JsonDecoder};
pub use error::{
    ConsumerError, DecodeError, ProcessingError, RenderError, ScoreError, SourceError, StatsError,
};
pub use event::{AuthorMessage, DefaultedFields, RawRecord, UNKNOWN_AUTHOR};
pub use render::{LogRenderer, NoOpRenderer, Panel, PanelBar, Renderer, count_panel, sentiment_panel};
pub use sentiment::{LexiconScorer, Scorer};
pub use source::{EventSource, MemorySource};
pub use stats::{AggregateSnapshot, AuthorEntry, AuthorStats};
