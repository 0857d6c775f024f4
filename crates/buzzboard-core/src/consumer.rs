//! Driver loop: pull, decode, score, record, render.
//!
//! [`SentimentConsumer`] owns the [`AuthorStats`] and the three per-event
//! collaborators (decoder, scorer, renderer). [`SentimentConsumer::run`]
//! pulls records from an [`EventSource`] until the shutdown future resolves,
//! the source reports end of stream, or the source fails, then releases the
//! source.
//!
//! Each record goes through [`SentimentConsumer::process_record`], which
//! returns an [`EventOutcome`] instead of propagating errors. No single
//! record can stop the loop:
//!
//! - **Malformed payload**: logged at error level, state untouched, no render.
//! - **Missing fields**: defaulted by the decoder, processed normally.
//! - **Scoring/update/render failure**: logged at error level. A render
//!   failure happens after the update committed; it is not rolled back.
//!
//! The loop is strictly sequential. Shutdown is only observed while waiting
//! for the next record, never in the middle of processing one.

use std::future::Future;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::decode::Decoder;
use crate::error::{ConsumerError, DecodeError, ProcessingError};
use crate::event::{AuthorMessage, RawRecord};
use crate::render::Renderer;
use crate::sentiment::Scorer;
use crate::source::EventSource;
use crate::stats::{AggregateSnapshot, AuthorStats};

/// Lifecycle of a consumer. STOPPED is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    /// Created, `run` not yet called.
    Idle,
    /// Waiting for or processing records.
    Running,
    /// Shutting down: finishing the renderer and releasing the source.
    Stopping,
    /// Done. The consumer cannot be restarted.
    Stopped,
}

/// Per-event processing stage, used to tag failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Payload → author/message.
    Decoding,
    /// Message → polarity.
    Scoring,
    /// Polarity → aggregation state.
    Updating,
    /// Aggregation state → panels.
    Rendering,
}

impl Stage {
    /// Lower-case name for log fields.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Decoding => "decoding",
            Self::Scoring => "scoring",
            Self::Updating => "updating",
            Self::Rendering => "rendering",
        }
    }
}

/// What happened to one record.
#[derive(Debug)]
pub enum EventOutcome {
    /// Recorded and rendered.
    Processed {
        /// Author the event was recorded under.
        author: String,
        /// Sentiment score that was recorded.
        score: f64,
        /// The author's count after this event.
        count: u64,
    },
    /// The payload could not be decoded. State unchanged.
    Malformed(DecodeError),
    /// A later stage failed.
    Failed {
        /// Stage that failed.
        stage: Stage,
        /// Whether the state update had already been committed.
        committed: bool,
        /// The failure.
        error: ProcessingError,
    },
}

impl EventOutcome {
    /// True if the event's contribution is in the aggregation state.
    pub const fn is_committed(&self) -> bool {
        match self {
            Self::Processed { .. } => true,
            Self::Malformed(_) => false,
            Self::Failed { committed, .. } => *committed,
        }
    }
}

/// Why a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown signal fired.
    Interrupted,
    /// The source reported end of stream.
    EndOfStream,
    /// Pulling from the source failed.
    SourceFailed(String),
}

/// Summary returned when a run ends.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Why the loop stopped.
    pub stop_reason: StopReason,
    /// Records pulled from the source.
    pub received: u64,
    /// Records fully processed and rendered.
    pub processed: u64,
    /// Records rejected by the decoder.
    pub malformed: u64,
    /// Records that failed after decoding.
    pub failed: u64,
    /// When the loop entered RUNNING.
    pub started_at: DateTime<Utc>,
    /// When the loop entered STOPPED.
    pub stopped_at: DateTime<Utc>,
    /// Aggregates at shutdown.
    pub snapshot: AggregateSnapshot,
}

/// Running tallies for a [`RunSummary`].
#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    received: u64,
    processed: u64,
    malformed: u64,
    failed: u64,
}

impl Tally {
    fn count(&mut self, outcome: &EventOutcome) {
        self.received = self.received.saturating_add(1);
        match outcome {
            EventOutcome::Processed { .. } => self.processed = self.processed.saturating_add(1),
            EventOutcome::Malformed(_) => self.malformed = self.malformed.saturating_add(1),
            EventOutcome::Failed { .. } => self.failed = self.failed.saturating_add(1),
        }
    }
}

/// Result of racing the shutdown signal against the next pull.
enum Pulled {
    Shutdown,
    Next(Result<Option<RawRecord>, crate::error::SourceError>),
}

/// The aggregation-and-refresh engine.
pub struct SentimentConsumer<D, S, R> {
    stats: AuthorStats,
    decoder: D,
    scorer: S,
    renderer: R,
    state: ConsumerState,
}

impl<D, S, R> SentimentConsumer<D, S, R>
where
    D: Decoder,
    S: Scorer,
    R: Renderer,
{
    /// Create an idle consumer with empty aggregation state.
    pub fn new(decoder: D, scorer: S, renderer: R) -> Self {
        Self {
            stats: AuthorStats::new(),
            decoder,
            scorer,
            renderer,
            state: ConsumerState::Idle,
        }
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> ConsumerState {
        self.state
    }

    /// Read-only view of the aggregation state.
    pub const fn stats(&self) -> &AuthorStats {
        &self.stats
    }

    /// The renderer.
    pub const fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Run until shutdown, end of stream, or a source failure.
    ///
    /// The source is closed on every exit path. Per-event failures are logged
    /// and counted, never returned.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError::AlreadyStopped`] if this consumer already
    /// ran to completion, or [`ConsumerError::Release`] if the source could
    /// not be released.
    pub async fn run<E, F>(
        &mut self,
        mut source: E,
        shutdown: F,
    ) -> Result<RunSummary, ConsumerError>
    where
        E: EventSource,
        F: Future<Output = ()>,
    {
        if self.state == ConsumerState::Stopped {
            // Still honour the release contract for the handed-in source.
            if let Err(e) = source.close().await {
                warn!(error = %e, "failed to release source passed to stopped consumer");
            }
            return Err(ConsumerError::AlreadyStopped);
        }

        let started_at = Utc::now();
        let mut tally = Tally::default();
        self.transition(ConsumerState::Running);
        info!(
            authors = self.stats.author_count(),
            "consumer started, awaiting records"
        );

        tokio::pin!(shutdown);
        let stop_reason = loop {
            let pulled = tokio::select! {
                biased;
                () = &mut shutdown => Pulled::Shutdown,
                next = source.next_record() => Pulled::Next(next),
            };

            match pulled {
                Pulled::Shutdown => {
                    warn!("consumer interrupted");
                    break StopReason::Interrupted;
                }
                Pulled::Next(Ok(Some(record))) => {
                    let outcome = self.process_record(&record);
                    tally.count(&outcome);
                }
                Pulled::Next(Ok(None)) => {
                    info!("event source reached end of stream");
                    break StopReason::EndOfStream;
                }
                Pulled::Next(Err(e)) => {
                    error!(error = %e, "error while consuming records");
                    break StopReason::SourceFailed(e.to_string());
                }
            }
        };

        self.transition(ConsumerState::Stopping);
        info!(reason = ?stop_reason, "consumer stopping");

        if let Err(e) = self.renderer.finish(&self.stats) {
            error!(error = %e, "renderer failed to finish cleanly");
        }

        let released = source.close().await;
        self.transition(ConsumerState::Stopped);

        if let Err(source_err) = released {
            error!(error = %source_err, "failed to release event source");
            return Err(ConsumerError::Release { source: source_err });
        }
        info!("event source released");

        let summary = RunSummary {
            stop_reason,
            received: tally.received,
            processed: tally.processed,
            malformed: tally.malformed,
            failed: tally.failed,
            started_at,
            stopped_at: Utc::now(),
            snapshot: self.stats.snapshot(),
        };
        info!(
            received = summary.received,
            processed = summary.processed,
            malformed = summary.malformed,
            failed = summary.failed,
            "consumer stopped"
        );
        Ok(summary)
    }

    /// Process one record: decode, score, record, render.
    ///
    /// Never fails; the returned [`EventOutcome`] says what happened.
    pub fn process_record(&mut self, record: &RawRecord) -> EventOutcome {
        debug!(
            position = record.position,
            payload = %record.payload_lossy(),
            "received record"
        );

        let message = match self.decoder.decode(&record.payload) {
            Ok(message) => message,
            Err(e) => {
                error!(
                    position = record.position,
                    stage = Stage::Decoding.as_str(),
                    payload = %record.payload_lossy(),
                    error = %e,
                    "invalid message payload, skipping"
                );
                return EventOutcome::Malformed(e);
            }
        };

        if !message.defaulted.is_none() {
            debug!(
                position = record.position,
                author_defaulted = message.defaulted.author,
                message_defaulted = message.defaulted.message,
                "record missing fields, defaults applied"
            );
        }

        let outcome = self.apply(&message);
        if let EventOutcome::Failed {
            stage,
            committed,
            ref error,
        } = outcome
        {
            error!(
                position = record.position,
                author = message.author,
                stage = stage.as_str(),
                committed = committed,
                error = %error,
                "error processing message"
            );
        }
        outcome
    }

    /// Update rule plus refresh for a decoded message.
    fn apply(&mut self, message: &AuthorMessage) -> EventOutcome {
        info!(
            author = message.author,
            text = message.message,
            "processed message"
        );

        let score = match self.scorer.score(&message.message) {
            Ok(score) => score,
            Err(e) => {
                return EventOutcome::Failed {
                    stage: Stage::Scoring,
                    committed: false,
                    error: e.into(),
                };
            }
        };
        info!(author = message.author, score = score, "sentiment score for message");

        let count = match self.stats.record(&message.author, score) {
            Ok(count) => count,
            Err(e) => {
                return EventOutcome::Failed {
                    stage: Stage::Updating,
                    committed: false,
                    error: e.into(),
                };
            }
        };
        info!(
            author = message.author,
            count = count,
            authors = self.stats.author_count(),
            total_events = self.stats.total_events(),
            "updated author counts"
        );

        if let Err(e) = self.renderer.render(&self.stats) {
            return EventOutcome::Failed {
                stage: Stage::Rendering,
                committed: true,
                error: e.into(),
            };
        }
        debug!(author = message.author, "panels refreshed");

        EventOutcome::Processed {
            author: message.author.clone(),
            score,
            count,
        }
    }

    fn transition(&mut self, next: ConsumerState) {
        debug!(from = ?self.state, to = ?next, "consumer state transition");
        self.state = next;
    }
}

/// Log the end-of-run summary, one line per author.
///
/// Call after [`SentimentConsumer::run`] returns; this is the final view of
/// the dashboard once the live display has been torn down.
pub fn log_run_end(summary: &RunSummary) {
    let elapsed_ms = summary
        .stopped_at
        .signed_duration_since(summary.started_at)
        .num_milliseconds();
    info!(
        reason = ?summary.stop_reason,
        received = summary.received,
        processed = summary.processed,
        malformed = summary.malformed,
        failed = summary.failed,
        elapsed_ms = elapsed_ms,
        "consumer run ended"
    );

    if summary.snapshot.counts.is_empty() {
        warn!("consumer ended with no recorded messages");
        return;
    }

    for ((author, count), (_, mean)) in summary
        .snapshot
        .counts
        .iter()
        .zip(summary.snapshot.mean_sentiments.iter())
    {
        info!(
            author = author,
            count = count,
            average_sentiment = mean,
            "final author aggregate"
        );
    }

    match serde_json::to_string(&summary.snapshot) {
        Ok(json) => info!(snapshot = %json, "final aggregate snapshot"),
        Err(e) => warn!(error = %e, "failed to serialize final snapshot"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::decode::JsonDecoder;
    use crate::error::{RenderError, ScoreError};
    use crate::render::NoOpRenderer;
    use crate::source::MemorySource;

    /// Scorer looking messages up in a fixed table; unknown text scores 0.
    struct TableScorer(HashMap<&'static str, f64>);

    impl Scorer for TableScorer {
        fn score(&self, text: &str) -> Result<f64, ScoreError> {
            Ok(self.0.get(text).copied().unwrap_or(0.0))
        }
    }

    fn scenario_scorer() -> TableScorer {
        TableScorer(HashMap::from([("great", 0.8), ("bad", -0.6), ("ok", 0.0)]))
    }

    /// Renderer that counts calls and can be told to fail.
    #[derive(Default)]
    struct CountingRenderer {
        renders: u64,
        finished: bool,
        fail: bool,
    }

    impl Renderer for CountingRenderer {
        fn render(&mut self, _stats: &AuthorStats) -> Result<(), RenderError> {
            self.renders = self.renders.saturating_add(1);
            if self.fail {
                Err(RenderError::Backend("display closed".to_owned()))
            } else {
                Ok(())
            }
        }

        fn finish(&mut self, _stats: &AuthorStats) -> Result<(), RenderError> {
            self.finished = true;
            Ok(())
        }
    }

    fn record(position: u64, payload: &str) -> RawRecord {
        RawRecord::new(position, payload)
    }

    #[test]
    fn processed_outcome_updates_and_renders() {
        let mut consumer =
            SentimentConsumer::new(JsonDecoder, scenario_scorer(), CountingRenderer::default());

        let outcome = consumer.process_record(&record(0, r#"{"author":"a","message":"great"}"#));

        assert!(matches!(
            outcome,
            EventOutcome::Processed { ref author, count: 1, .. } if author == "a"
        ));
        assert_eq!(consumer.stats().count("a"), 1);
        assert_eq!(consumer.renderer().renders, 1);
    }

    #[test]
    fn malformed_payload_leaves_state_unchanged() {
        let mut consumer =
            SentimentConsumer::new(JsonDecoder, scenario_scorer(), CountingRenderer::default());
        consumer.process_record(&record(0, r#"{"author":"a","message":"great"}"#));
        let before = consumer.stats().clone();

        let outcome = consumer.process_record(&record(1, "{not json"));

        assert!(matches!(outcome, EventOutcome::Malformed(_)));
        assert!(!outcome.is_committed());
        assert_eq!(consumer.stats(), &before);
        // No render for a skipped record.
        assert_eq!(consumer.renderer().renders, 1);
    }

    #[test]
    fn non_object_json_is_malformed() {
        let mut consumer = SentimentConsumer::new(JsonDecoder, scenario_scorer(), NoOpRenderer);
        let outcome = consumer.process_record(&record(0, r#"["a", "great"]"#));
        assert!(matches!(outcome, EventOutcome::Malformed(DecodeError::NotAnObject { .. })));
        assert!(consumer.stats().is_empty());
    }

    #[test]
    fn missing_author_goes_to_unknown() {
        let mut consumer = SentimentConsumer::new(JsonDecoder, scenario_scorer(), NoOpRenderer);
        consumer.process_record(&record(0, r#"{"message":"bad"}"#));

        assert_eq!(consumer.stats().count("unknown"), 1);
        assert_eq!(consumer.stats().sentiment_history("unknown").unwrap(), &[-0.6]);
    }

    #[test]
    fn missing_message_scores_empty_text() {
        let seen = std::sync::Mutex::new(Vec::new());
        let scorer = |text: &str| {
            seen.lock().unwrap().push(text.to_owned());
            Ok::<f64, ScoreError>(0.0)
        };
        let mut consumer = SentimentConsumer::new(JsonDecoder, scorer, NoOpRenderer);
        consumer.process_record(&record(0, r#"{"author":"quiet"}"#));

        assert_eq!(consumer.stats().count("quiet"), 1);
        drop(consumer);
        assert_eq!(seen.into_inner().unwrap(), vec![String::new()]);
    }

    #[test]
    fn scorer_failure_is_recovered_without_commit() {
        let scorer = |text: &str| {
            if text == "boom" {
                Err(ScoreError::new("lexicon unavailable"))
            } else {
                Ok(0.5)
            }
        };
        let mut consumer = SentimentConsumer::new(JsonDecoder, scorer, NoOpRenderer);

        let failed = consumer.process_record(&record(0, r#"{"author":"a","message":"boom"}"#));
        let ok = consumer.process_record(&record(1, r#"{"author":"a","message":"fine"}"#));

        assert!(matches!(
            failed,
            EventOutcome::Failed { stage: Stage::Scoring, committed: false, .. }
        ));
        assert!(matches!(ok, EventOutcome::Processed { count: 1, .. }));
        assert_eq!(consumer.stats().count("a"), 1);
    }

    #[test]
    fn non_finite_score_fails_at_update_stage() {
        let scorer = |_: &str| Ok::<f64, ScoreError>(f64::NAN);
        let mut consumer = SentimentConsumer::new(JsonDecoder, scorer, NoOpRenderer);
        let outcome = consumer.process_record(&record(0, r#"{"author":"a","message":"x"}"#));

        assert!(matches!(
            outcome,
            EventOutcome::Failed { stage: Stage::Updating, committed: false, .. }
        ));
        assert!(consumer.stats().is_empty());
    }

    #[test]
    fn render_failure_keeps_committed_update() {
        let renderer = CountingRenderer {
            fail: true,
            ..CountingRenderer::default()
        };
        let mut consumer = SentimentConsumer::new(JsonDecoder, scenario_scorer(), renderer);

        let outcome = consumer.process_record(&record(0, r#"{"author":"b","message":"bad"}"#));

        assert!(matches!(
            outcome,
            EventOutcome::Failed { stage: Stage::Rendering, committed: true, .. }
        ));
        assert!(outcome.is_committed());
        assert_eq!(consumer.stats().count("b"), 1);
    }

    #[tokio::test]
    async fn run_to_end_of_stream_releases_source() {
        let source = MemorySource::from_payloads([
            r#"{"author":"a","message":"great"}"#,
            r#"{"author":"b","message":"bad"}"#,
            r#"{"author":"a","message":"ok"}"#,
        ]);
        let closed = source.closed_flag();
        let mut consumer =
            SentimentConsumer::new(JsonDecoder, scenario_scorer(), CountingRenderer::default());
        assert_eq!(consumer.state(), ConsumerState::Idle);

        let summary = consumer
            .run(source, std::future::pending::<()>())
            .await
            .unwrap();

        assert_eq!(summary.stop_reason, StopReason::EndOfStream);
        assert_eq!(summary.received, 3);
        assert_eq!(summary.processed, 3);
        assert_eq!(
            summary.snapshot.counts,
            vec![("a".to_owned(), 2), ("b".to_owned(), 1)]
        );
        assert!(closed.load(Ordering::SeqCst));
        assert!(consumer.renderer().finished);
        assert_eq!(consumer.renderer().renders, 3);
        assert_eq!(consumer.state(), ConsumerState::Stopped);
    }

    #[tokio::test]
    async fn shutdown_before_first_pull_processes_nothing() {
        let source = MemorySource::from_payloads([r#"{"author":"a","message":"great"}"#]);
        let closed = source.closed_flag();
        let mut consumer = SentimentConsumer::new(JsonDecoder, scenario_scorer(), NoOpRenderer);

        let summary = consumer.run(source, std::future::ready(())).await.unwrap();

        assert_eq!(summary.stop_reason, StopReason::Interrupted);
        assert_eq!(summary.received, 0);
        assert!(consumer.stats().is_empty());
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn source_failure_stops_and_releases() {
        let source = MemorySource::from_payloads([
            r#"{"author":"a","message":"great"}"#,
            r#"{"author":"a","message":"great"}"#,
        ])
        .failing_after(1);
        let closed = source.closed_flag();
        let mut consumer = SentimentConsumer::new(JsonDecoder, scenario_scorer(), NoOpRenderer);

        let summary = consumer
            .run(source, std::future::pending::<()>())
            .await
            .unwrap();

        assert!(matches!(summary.stop_reason, StopReason::SourceFailed(_)));
        assert_eq!(summary.processed, 1);
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn release_failure_is_fatal() {
        let source = MemorySource::new().failing_release("broker unreachable");
        let mut consumer = SentimentConsumer::new(JsonDecoder, scenario_scorer(), NoOpRenderer);

        let err = consumer
            .run(source, std::future::pending::<()>())
            .await
            .unwrap_err();

        assert!(matches!(err, ConsumerError::Release { .. }));
        assert_eq!(consumer.state(), ConsumerState::Stopped);
    }

    #[tokio::test]
    async fn stopped_consumer_cannot_restart() {
        let mut consumer = SentimentConsumer::new(JsonDecoder, scenario_scorer(), NoOpRenderer);
        consumer
            .run(MemorySource::new(), std::future::pending::<()>())
            .await
            .unwrap();

        let again = MemorySource::from_payloads([r#"{"author":"a","message":"ok"}"#]);
        let closed = again.closed_flag();
        let err = consumer
            .run(again, std::future::pending::<()>())
            .await
            .unwrap_err();

        assert!(matches!(err, ConsumerError::AlreadyStopped));
        assert!(closed.load(Ordering::SeqCst));
        assert!(consumer.stats().is_empty());
    }

    #[test]
    fn stage_names() {
        assert_eq!(Stage::Decoding.as_str(), "decoding");
        assert_eq!(Stage::Rendering.as_str(), "rendering");
    }
}
