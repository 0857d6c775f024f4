//! JSON-lines replay source.
//!
//! Feeds the consumer from a file with one payload per line instead of a
//! live NATS subscription. Blank lines are skipped; the position of each
//! record is its 1-based line number. End of file is end of stream.
//!
//! Lines are handed on as raw bytes. A line that is not valid UTF-8 is a
//! malformed record for the decoder to reject, not a read failure.

use std::path::{Path, PathBuf};

use buzzboard_core::{EventSource, RawRecord, SourceError};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::error::AppError;

/// Event source replaying a JSON-lines file.
#[derive(Debug)]
pub struct JsonLinesSource {
    path: PathBuf,
    reader: BufReader<File>,
    /// Bytes of the line being read; survives a cancelled pull.
    pending: Vec<u8>,
    line_number: u64,
}

impl JsonLinesSource {
    /// Open `path` for replay.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Replay`] if the file cannot be opened.
    pub async fn open(path: &Path) -> Result<Self, AppError> {
        let file = File::open(path)
            .await
            .map_err(|e| AppError::Replay(format!("failed to open {}: {e}", path.display())))?;
        info!(path = %path.display(), "replaying records from file");
        Ok(Self {
            path: path.to_owned(),
            reader: BufReader::new(file),
            pending: Vec::new(),
            line_number: 0,
        })
    }
}

impl EventSource for JsonLinesSource {
    async fn next_record(&mut self) -> Result<Option<RawRecord>, SourceError> {
        loop {
            let read = self
                .reader
                .read_until(b'\n', &mut self.pending)
                .await
                .map_err(|e| {
                    SourceError::Pull(format!(
                        "failed to read {} after line {}: {e}",
                        self.path.display(),
                        self.line_number
                    ))
                })?;
            if read == 0 {
                debug!(path = %self.path.display(), lines = self.line_number, "replay file exhausted");
                return Ok(None);
            }
            self.line_number = self.line_number.saturating_add(1);

            let mut line = std::mem::take(&mut self.pending);
            while matches!(line.last(), Some(b'\n' | b'\r')) {
                line.pop();
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Ok(Some(RawRecord::new(self.line_number, line)));
        }
    }

    async fn close(self) -> Result<(), SourceError> {
        info!(path = %self.path.display(), lines_read = self.line_number, "replay file closed");
        Ok(())
    }
}
