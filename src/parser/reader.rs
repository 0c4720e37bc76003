//! The blocking driver for the Parser State Machine (spec.md §4.1).
//!
//! Generalized from the `CsvChunkParser`/`CsvState`/`Action`
//! design (`examples/johnlogsdon-rust-csv-parser/src/lib.rs`), which parses
//! one `&str` chunk at a time, into an abstract-source-driven reader that
//! refills its own growable buffer. The resumable-continuation shape (one
//! `advance` call may return `NeedMore` and be re-entered after a refill
//! without losing progress) mirrors BurntSushi `csv-core`'s `ReadResult`
//! (`examples/other_examples/c3008a0b_BurntSushi-rust-csv__csv-core-src-reader.rs.rs`).
//!
//! All state-machine transitions live in [`crate::parser::core::Core`];
//! this module only owns the character source and drives the refill loop,
//! so the same transitions can be reused by the async driver.

use crate::config::Configuration;
use crate::error::Result;
use crate::parser::core::{Advance, Core};
use crate::position::Position;
use crate::source::CharSource;

/// The streaming CSV parser. Owns the row-window buffer (via [`Core`]) and
/// the abstract character source (spec.md §6's "external character
/// reader").
pub struct Reader<S> {
    core: Core,
    source: S,
}

impl<S: CharSource> Reader<S> {
    /// Builds a reader over `source` with the given configuration.
    pub fn new(source: S, config: Configuration) -> Self {
        Reader { core: Core::new(config), source }
    }

    /// The dialect/behavior configuration in effect (may have had its
    /// delimiter replaced by auto-detection after the first `read`).
    pub fn configuration(&self) -> &Configuration {
        self.core.configuration()
    }

    /// Mutable access to the configuration, used by [`crate::facade`] to
    /// invoke callback hooks that are not otherwise exposed read-only.
    pub(crate) fn configuration_mut(&mut self) -> &mut Configuration {
        self.core.configuration_mut()
    }

    /// Current stream position.
    pub fn position(&self) -> Position {
        self.core.position()
    }

    /// Number of fields in the most recently read row.
    pub fn count(&self) -> usize {
        self.core.count()
    }

    /// The verbatim row window of the most recently read row.
    pub fn raw_record(&self) -> String {
        self.core.raw_record()
    }

    /// Advances to the next logical row. Returns `false` at end of input.
    pub fn read(&mut self) -> Result<bool> {
        if !self.core.detection_done {
            self.run_delimiter_detection()?;
        }
        loop {
            match self.core.try_advance()? {
                Advance::RowReady => return Ok(true),
                Advance::Eof => return Ok(false),
                Advance::NeedMore => {
                    let mut bytes = 0u64;
                    let n = self.core.buffer_mut().refill(&mut self.source, &mut bytes)?;
                    self.core.record_bytes(bytes);
                    if n == 0 {
                        return self.core.finalize_eof();
                    }
                }
            }
        }
    }

    /// Decodes and returns field `i` of the current row, caching the
    /// result so repeated calls are idempotent (spec.md §8).
    pub fn field(&mut self, i: usize) -> Result<&str> {
        self.core.field(i)
    }

    fn run_delimiter_detection(&mut self) -> Result<()> {
        self.core.detection_done = true;
        if !self.configuration().detect_delimiter() {
            return Ok(());
        }
        if self.core.buffer_mut().is_exhausted() {
            let mut bytes = 0u64;
            self.core.buffer_mut().refill(&mut self.source, &mut bytes)?;
            self.core.record_bytes(bytes);
        }
        let sample = self.core.sample();
        let detector = crate::detect::DetectorConfig::default();
        if let Some(delim) = crate::detect::detect_delimiter(&sample, self.configuration(), &detector)
        {
            self.core.apply_detected_delimiter(delim)?;
        }
        Ok(())
    }
}
