//! Running per-author aggregates.
//!
//! [`AuthorStats`] holds the two tables the dashboard is built from: how many
//! messages each author has sent, and the sentiment score of every one of
//! those messages in arrival order. Both tables are stored in a single
//! insertion-ordered map of [`AuthorEntry`] values, so an author can never be
//! present in one table and missing from the other, and a count always equals
//! the length of the matching score history.
//!
//! Authors are kept in order of first appearance. Renderers rely on that to
//! keep bar positions stable between refreshes.

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::StatsError;

/// Lowest polarity a stored score may have.
pub const MIN_SCORE: f64 = -1.0;

/// Highest polarity a stored score may have.
pub const MAX_SCORE: f64 = 1.0;

/// Everything recorded for one author.
///
/// Fields are private so the count can only move together with the score
/// history, through [`AuthorStats::record`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorEntry {
    count: u64,
    scores: Vec<f64>,
}

impl AuthorEntry {
    /// Number of recorded messages.
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Sentiment score of each recorded message, oldest first.
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// Arithmetic mean of the recorded scores, `None` if there are none.
    pub fn mean(&self) -> Option<f64> {
        mean_of(&self.scores)
    }
}

/// Aggregation state: message count and sentiment history per author.
///
/// Only [`AuthorStats::record`] mutates it. Entries are never removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorStats {
    entries: IndexMap<String, AuthorEntry>,
    total_events: u64,
}

impl AuthorStats {
    /// Create empty aggregation state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one message by `author` with sentiment `score`.
    ///
    /// Appends the score to the author's history and increments their count
    /// in one step, creating the author's entry on first sight. Finite scores
    /// outside `[-1, 1]` are clamped into range. Returns the author's new
    /// message count.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::NonFiniteScore`] for `NaN` or infinite scores;
    /// the state is left untouched.
    pub fn record(&mut self, author: &str, score: f64) -> Result<u64, StatsError> {
        if !score.is_finite() {
            return Err(StatsError::NonFiniteScore {
                author: author.to_owned(),
                score,
            });
        }
        let score = score.clamp(MIN_SCORE, MAX_SCORE);

        let entry = self.entries.entry(author.to_owned()).or_default();
        entry.scores.push(score);
        entry.count = entry.count.saturating_add(1);
        self.total_events = self.total_events.saturating_add(1);
        Ok(entry.count)
    }

    /// Message count per author, in order of first appearance.
    pub fn counts(&self) -> Vec<(&str, u64)> {
        self.entries
            .iter()
            .map(|(author, entry)| (author.as_str(), entry.count))
            .collect()
    }

    /// Mean sentiment per author, in the same order as [`Self::counts`].
    pub fn mean_sentiments(&self) -> Vec<(&str, f64)> {
        self.entries
            .iter()
            .filter_map(|(author, entry)| entry.mean().map(|mean| (author.as_str(), mean)))
            .collect()
    }

    /// Arithmetic mean of `author`'s recorded scores.
    ///
    /// `None` if the author has never been recorded.
    pub fn average_sentiment(&self, author: &str) -> Option<f64> {
        self.entries.get(author).and_then(AuthorEntry::mean)
    }

    /// Every score recorded for `author`, oldest first.
    pub fn sentiment_history(&self, author: &str) -> Option<&[f64]> {
        self.entries.get(author).map(|entry| entry.scores.as_slice())
    }

    /// Message count for `author`, 0 if never recorded.
    pub fn count(&self, author: &str) -> u64 {
        self.entries.get(author).map_or(0, |entry| entry.count)
    }

    /// The full entry for `author`.
    pub fn entry(&self, author: &str) -> Option<&AuthorEntry> {
        self.entries.get(author)
    }

    /// Iterate over authors and their entries in order of first appearance.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AuthorEntry)> {
        self.entries
            .iter()
            .map(|(author, entry)| (author.as_str(), entry))
    }

    /// Total number of recorded messages across all authors.
    pub const fn total_events(&self) -> u64 {
        self.total_events
    }

    /// Number of distinct authors seen.
    pub fn author_count(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Owned copy of the current aggregates, for logging and summaries.
    pub fn snapshot(&self) -> AggregateSnapshot {
        AggregateSnapshot {
            counts: self
                .counts()
                .into_iter()
                .map(|(author, count)| (author.to_owned(), count))
                .collect(),
            mean_sentiments: self
                .mean_sentiments()
                .into_iter()
                .map(|(author, mean)| (author.to_owned(), mean))
                .collect(),
            total_events: self.total_events,
        }
    }
}

/// Point-in-time copy of the aggregates, detached from the live state.
///
/// Serializes to JSON for the end-of-run log line.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateSnapshot {
    /// Message count per author, first-appearance order.
    pub counts: Vec<(String, u64)>,
    /// Mean sentiment per author, same order as `counts`.
    pub mean_sentiments: Vec<(String, f64)>,
    /// Total recorded messages.
    pub total_events: u64,
}

/// Mean of a slice of scores.
#[allow(clippy::cast_precision_loss)]
fn mean_of(scores: &[f64]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let sum: f64 = scores.iter().sum();
    Some(sum / scores.len() as f64)
}
