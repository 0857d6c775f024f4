//! Event source trait and an in-memory implementation.
//!
//! An [`EventSource`] yields [`RawRecord`]s one at a time. Pulling is the
//! only point where the driver loop waits. The source is released exactly
//! once through [`EventSource::close`], which consumes it, on every exit
//! path of the loop.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::SourceError;
use crate::event::RawRecord;

/// A pull-based stream of raw records.
pub trait EventSource {
    /// Wait for the next record. `Ok(None)` signals end of stream.
    ///
    /// Dropping the returned future before it completes must not lose a
    /// record, since the driver loop races it against shutdown.
    fn next_record(&mut self) -> impl Future<Output = Result<Option<RawRecord>, SourceError>>;

    /// Release the source (unsubscribe, close files, flush connections).
    fn close(self) -> impl Future<Output = Result<(), SourceError>>;
}

/// A finite, in-memory event source.
///
/// Positions are assigned from 0 in push order. Useful for tests and
/// replaying fixed scenarios.
#[derive(Debug, Default)]
pub struct MemorySource {
    records: VecDeque<RawRecord>,
    next_position: u64,
    pull_error_after: Option<u64>,
    release_error: Option<String>,
    closed: Arc<AtomicBool>,
}

impl MemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source yielding each payload in order.
    pub fn from_payloads<I, P>(payloads: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Vec<u8>>,
    {
        let mut source = Self::new();
        for payload in payloads {
            source.push(payload);
        }
        source
    }

    /// Append a payload at the next position.
    pub fn push(&mut self, payload: impl Into<Vec<u8>>) {
        self.records
            .push_back(RawRecord::new(self.next_position, payload));
        self.next_position = self.next_position.saturating_add(1);
    }

    /// Fail with [`SourceError::Pull`] once `delivered` records have been
    /// handed out, instead of reporting end of stream.
    #[must_use]
    pub const fn failing_after(mut self, delivered: u64) -> Self {
        self.pull_error_after = Some(delivered);
        self
    }

    /// Make [`EventSource::close`] fail with [`SourceError::Release`].
    #[must_use]
    pub fn failing_release(mut self, reason: impl Into<String>) -> Self {
        self.release_error = Some(reason.into());
        self
    }

    /// Flag that flips to `true` once the source has been closed.
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    /// Records not yet pulled.
    pub fn remaining(&self) -> usize {
        self.records.len()
    }
}

impl EventSource for MemorySource {
    async fn next_record(&mut self) -> Result<Option<RawRecord>, SourceError> {
        if let Some(limit) = self.pull_error_after {
            let delivered = self
                .next_position
                .saturating_sub(self.records.len() as u64);
            if delivered >= limit {
                return Err(SourceError::Pull(format!(
                    "source failed after {delivered} records"
                )));
            }
        }
        Ok(self.records.pop_front())
    }

    async fn close(self) -> Result<(), SourceError> {
        self.closed.store(true, Ordering::SeqCst);
        match self.release_error {
            Some(reason) => Err(SourceError::Release(reason)),
            None => Ok(()),
        }
    }
}
