//! The source-agnostic half of the Parser State Machine (spec.md §4.1,
//! §9 "async as a parallel code path"): every transition that does not
//! itself touch the character source lives here, so [`crate::parser::reader::Reader`]
//! and the feature-gated async driver can both drive the exact same state
//! machine, differing only in how they refill the buffer.
//!
//! Simplification versus a literal one-character-at-a-time NFA: because the
//! buffer never discards unconsumed characters mid-match (compaction only
//! moves `[row_start, chars_read)`, never past a partially-matched
//! delimiter or newline), a multi-character delimiter/newline can be
//! compared directly against the buffered slice rather than tracked via a
//! separate progress counter. An [`Advance::NeedMore`] result simply causes
//! the same comparison to be retried from the same position after refill.
//! This is behaviorally identical to per-character resumption.

use crate::buffer::{Buffer, ProcessedBuffer};
use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::field_cache::FieldCache;
use crate::parser::decode::{self, Decoded};
use crate::parser::state::{ParserState, Span};
use crate::position::Position;
use std::rc::Rc;

/// Outcome of one attempt to advance the state machine.
pub(crate) enum Advance {
    /// A full row is ready; its spans are in `self.spans`.
    RowReady,
    /// The buffer ran out of characters; refill and retry.
    NeedMore,
    /// End of input reached with nothing left to emit.
    Eof,
}

enum MatchResult {
    /// Matched; payload is how many characters the match consumed.
    Yes(usize),
    No,
    NeedMore,
}

enum FieldStartCheck {
    Entered,
    NeedMore,
    NotApplicable,
}

/// All per-instance state the parser needs that is independent of how the
/// buffer gets refilled.
pub(crate) struct Core {
    config: Configuration,
    buffer: Buffer,
    processed: ProcessedBuffer,
    field_cache: Option<FieldCache>,
    spans: Vec<Span>,
    state: ParserState,
    position: Position,
    delimiter: Vec<char>,
    in_quotes: bool,
    field_is_bad: bool,
    quote_count: usize,
    at_row_start: bool,
    pending_discard: bool,
    pub(crate) detection_done: bool,
    eof: bool,
}

impl Core {
    pub(crate) fn new(config: Configuration) -> Self {
        let buffer = Buffer::new(config.buffer_size());
        let processed = ProcessedBuffer::new(config.process_field_buffer_size());
        let field_cache = if config.cache_fields() { Some(FieldCache::new()) } else { None };
        let delimiter = config.delimiter().chars().collect();
        Core {
            config,
            buffer,
            processed,
            field_cache,
            spans: Vec::new(),
            state: ParserState::None,
            position: Position::new(),
            delimiter,
            in_quotes: false,
            field_is_bad: false,
            quote_count: 0,
            at_row_start: true,
            pending_discard: false,
            detection_done: false,
            eof: false,
        }
    }

    pub(crate) fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub(crate) fn configuration_mut(&mut self) -> &mut Configuration {
        &mut self.config
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buffer
    }

    pub(crate) fn position(&self) -> Position {
        self.position
    }

    pub(crate) fn count(&self) -> usize {
        self.spans.len()
    }

    pub(crate) fn raw_record(&self) -> String {
        self.buffer.raw_record()
    }

    pub(crate) fn refresh_delimiter(&mut self) {
        self.delimiter = self.config.delimiter().chars().collect();
    }

    /// Folds a refill's reported byte count into the tracked position, when
    /// [`Configuration::count_bytes`] is enabled.
    pub(crate) fn record_bytes(&mut self, bytes: u64) {
        if self.config.count_bytes() {
            self.position.byte += bytes;
        }
    }

    /// Advances the buffer's read cursor by one, tracking it in
    /// `position.char_count`.
    fn advance(&mut self) -> char {
        self.position.char_count += 1;
        self.buffer.advance()
    }

    /// Advances the buffer's read cursor by `n`, tracking it in
    /// `position.char_count`.
    fn advance_by(&mut self, n: usize) {
        self.position.char_count += n as u64;
        self.buffer.advance_by(n);
    }

    /// Decodes and returns field `i` of the current row, caching the
    /// result so repeated calls are idempotent (spec.md §8).
    pub(crate) fn field(&mut self, i: usize) -> Result<&str> {
        if i >= self.spans.len() {
            return Err(Error::MissingField {
                detail: format!(
                    "column index {i} out of range (row has {} columns)",
                    self.spans.len()
                ),
                position: self.position,
            });
        }
        self.ensure_decoded(i)?;
        Ok(self.spans[i].cached.as_ref().expect("decoded above"))
    }

    fn ensure_decoded(&mut self, i: usize) -> Result<()> {
        if self.spans[i].is_processed {
            return Ok(());
        }
        let span = self.spans[i].clone();
        if span.length == 0 {
            self.spans[i].cached = Some(Rc::from(""));
            self.spans[i].is_processed = true;
            return Ok(());
        }

        let raw: Vec<char> = self.buffer.slice(span.start, span.start + span.length).to_vec();

        if span.is_bad {
            if let Some(cb) = self.config.callbacks_mut().bad_data_found.as_mut() {
                let raw_field: String = raw.iter().collect();
                let raw_record = self.buffer.raw_record();
                cb(&raw_field, &raw_record, self.position);
            }
        }

        let decoded = decode::decode_field(
            &raw,
            span.quote_count,
            span.is_bad,
            &self.config,
            &mut self.processed,
        );
        let decoded_string = match decoded {
            Decoded::Borrowed(s) => s.iter().collect::<String>(),
            Decoded::Owned(s) => s,
        };
        let rc: Rc<str> = match &mut self.field_cache {
            Some(cache) => cache.intern(&decoded_string),
            None => Rc::from(decoded_string.as_str()),
        };
        self.spans[i].cached = Some(rc);
        self.spans[i].is_processed = true;
        Ok(())
    }

    pub(crate) fn sample(&self) -> Vec<char> {
        self.buffer.slice(0, self.buffer.chars_read).to_vec()
    }

    pub(crate) fn apply_detected_delimiter(&mut self, delimiter: String) -> Result<()> {
        self.config.set_delimiter(delimiter);
        self.config.revalidate()?;
        self.refresh_delimiter();
        Ok(())
    }

    pub(crate) fn finalize_eof(&mut self) -> Result<bool> {
        self.eof = true;
        if self.pending_discard {
            self.pending_discard = false;
            return Ok(false);
        }
        if self.buffer.buffer_position > self.buffer.row_start || !self.spans.is_empty() {
            self.emit_current_field();
            self.at_row_start = true;
            self.position.row += 1;
            return Ok(true);
        }
        Ok(false)
    }

    /// One state-machine step. May return [`Advance::NeedMore`]; the caller
    /// refills the buffer and calls this again (this is the single
    /// suspension point the async driver also uses).
    pub(crate) fn try_advance(&mut self) -> Result<Advance> {
        if self.eof {
            return Ok(Advance::Eof);
        }

        if self.pending_discard {
            match self.discard_until_newline()? {
                MatchResult::NeedMore => return Ok(Advance::NeedMore),
                _ => self.pending_discard = false,
            }
        }

        loop {
            if self.at_row_start {
                self.buffer.reset_for_new_row();
                self.spans.clear();
                self.quote_count = 0;
                self.field_is_bad = false;
                self.in_quotes = false;
                self.state = ParserState::None;
                self.position.raw_row += 1;
                self.at_row_start = false;
            }

            if self.buffer.is_exhausted() {
                return Ok(Advance::NeedMore);
            }

            match self.state {
                ParserState::BlankLine => match self.consume_blank_line()? {
                    MatchResult::Yes(_) => {
                        self.at_row_start = true;
                        continue;
                    }
                    MatchResult::NeedMore => return Ok(Advance::NeedMore),
                    MatchResult::No => unreachable!("blank line consumption never fails to match"),
                },
                ParserState::Spaces => {
                    if let Some(outcome) = self.consume_leading_spaces()? {
                        return Ok(outcome);
                    }
                }
                _ => {
                    if self.at_field_start() {
                        match self.check_blank_or_comment_start()? {
                            FieldStartCheck::Entered => continue,
                            FieldStartCheck::NeedMore => return Ok(Advance::NeedMore),
                            FieldStartCheck::NotApplicable => {}
                        }
                        if self.enter_spaces_if_trimming() {
                            continue;
                        }
                    }
                    if let Some(outcome) = self.consume_one_step()? {
                        return Ok(outcome);
                    }
                }
            }
        }
    }

    fn at_field_start(&self) -> bool {
        self.buffer.buffer_position == self.buffer.row_start && self.spans.is_empty()
    }

    fn check_blank_or_comment_start(&mut self) -> Result<FieldStartCheck> {
        let c = self.buffer.current();
        if self.config.allow_comments() && c == self.config.comment() {
            self.state = ParserState::BlankLine;
            return Ok(FieldStartCheck::Entered);
        }
        if self.config.ignore_blank_lines() {
            match self.peek_newline()? {
                MatchResult::Yes(_) => {
                    self.state = ParserState::BlankLine;
                    return Ok(FieldStartCheck::Entered);
                }
                MatchResult::NeedMore => return Ok(FieldStartCheck::NeedMore),
                MatchResult::No => {}
            }
        }
        Ok(FieldStartCheck::NotApplicable)
    }

    fn enter_spaces_if_trimming(&mut self) -> bool {
        use crate::config::Trim;
        if matches!(self.config.mode(), crate::config::Mode::Rfc4180)
            && self.config.trim().contains(Trim::TRIM)
        {
            self.state = ParserState::Spaces;
            true
        } else {
            false
        }
    }

    /// Consumes leading whitespace for a trimmed RFC4180 field. On
    /// exhaustion mid-run, returns `None` having left `state == Spaces` so
    /// the caller retries after refill (genuinely resumable, since we only
    /// advance past characters we've fully classified as whitespace).
    fn consume_leading_spaces(&mut self) -> Result<Option<Advance>> {
        let whitespace = self.config.whitespace_chars().to_vec();
        loop {
            if self.buffer.is_exhausted() {
                return Ok(Some(Advance::NeedMore));
            }
            if whitespace.contains(&self.buffer.current()) {
                self.advance();
            } else {
                self.buffer.field_start = self.buffer.buffer_position;
                self.state = ParserState::None;
                return Ok(None);
            }
        }
    }

    /// Looks ahead for a newline at the current position without
    /// consuming it. `MatchResult::Yes(n)` carries the matched length.
    fn peek_newline(&self) -> Result<MatchResult> {
        Ok(match &self.config.newline() {
            Some(nl) => {
                let pattern: Vec<char> = nl.chars().collect();
                try_match(&self.buffer, self.buffer.buffer_position, &pattern)
            }
            None => {
                let pos = self.buffer.buffer_position;
                if pos >= self.buffer.chars_read {
                    return Ok(MatchResult::NeedMore);
                }
                let c = self.buffer.get(pos);
                if c == '\n' {
                    MatchResult::Yes(1)
                } else if c == '\r' {
                    if pos + 1 >= self.buffer.chars_read {
                        if self.eof {
                            MatchResult::Yes(1)
                        } else {
                            MatchResult::NeedMore
                        }
                    } else if self.buffer.get(pos + 1) == '\n' {
                        MatchResult::Yes(2)
                    } else {
                        MatchResult::Yes(1)
                    }
                } else {
                    MatchResult::No
                }
            }
        })
    }

    fn peek_delimiter(&self) -> MatchResult {
        try_match(&self.buffer, self.buffer.buffer_position, &self.delimiter)
    }

    /// Consumes one unit of progress through the current field: either a
    /// delimiter, a newline, or a single data/quote/escape character.
    /// Returns `Some` when the row or buffer state demands the caller
    /// return control (row complete or need more data).
    fn consume_one_step(&mut self) -> Result<Option<Advance>> {
        use crate::config::Mode;

        if !self.in_quotes {
            match self.peek_delimiter() {
                MatchResult::Yes(len) => {
                    self.emit_current_field();
                    self.advance_by(len);
                    self.buffer.field_start = self.buffer.buffer_position;
                    self.quote_count = 0;
                    self.field_is_bad = false;
                    return Ok(None);
                }
                MatchResult::NeedMore => return Ok(Some(Advance::NeedMore)),
                MatchResult::No => {}
            }
            match self.peek_newline()? {
                MatchResult::Yes(len) => {
                    self.emit_current_field();
                    self.advance_by(len);
                    self.at_row_start = true;
                    self.position.row += 1;
                    return Ok(Some(Advance::RowReady));
                }
                MatchResult::NeedMore => return Ok(Some(Advance::NeedMore)),
                MatchResult::No => {}
            }
        }

        match self.config.mode() {
            Mode::NoEscape => {
                self.advance();
            }
            Mode::Escape => {
                let escape = self.config.escape();
                if self.buffer.current() == escape {
                    if self.buffer.buffer_position + 1 >= self.buffer.chars_read {
                        return Ok(Some(Advance::NeedMore));
                    }
                    self.advance_by(2);
                } else {
                    self.advance();
                }
            }
            Mode::Rfc4180 => {
                if let Some(outcome) = self.consume_rfc4180_char()? {
                    return Ok(Some(outcome));
                }
            }
        }

        self.enforce_max_field_size()?;
        Ok(None)
    }

    fn consume_rfc4180_char(&mut self) -> Result<Option<Advance>> {
        let quote = self.config.quote();
        let escape = self.config.escape();
        let pos = self.buffer.buffer_position;
        let c = self.buffer.current();

        if self.at_field_start_of_current_field() && !self.in_quotes && c == quote {
            self.in_quotes = true;
            self.quote_count += 1;
            self.advance();
            return Ok(None);
        }

        if self.in_quotes {
            if c == quote {
                self.quote_count += 1;
                if pos + 1 >= self.buffer.chars_read {
                    return Ok(Some(Advance::NeedMore));
                }
                let next = self.buffer.get(pos + 1);
                if next == quote {
                    self.quote_count += 1;
                    self.advance_by(2);
                } else {
                    self.advance();
                    self.in_quotes = false;
                }
                return Ok(None);
            }
            if escape != quote && c == escape {
                self.quote_count += 1;
                if pos + 1 >= self.buffer.chars_read {
                    return Ok(Some(Advance::NeedMore));
                }
                let next = self.buffer.get(pos + 1);
                if next == quote || next == escape {
                    self.quote_count += 1;
                    self.advance_by(2);
                } else {
                    self.advance();
                }
                return Ok(None);
            }
            match self.peek_newline()? {
                MatchResult::Yes(len) => {
                    self.position.raw_row += 1;
                    if self.config.line_break_in_quoted_field_is_bad_data() {
                        self.field_is_bad = true;
                        self.in_quotes = false;
                        self.emit_current_field();
                        self.advance_by(len);
                        self.spans.push(Span::new(self.buffer.buffer_position, 0, 0, false));
                        self.pending_discard = true;
                        self.at_row_start = true;
                        self.position.row += 1;
                        return Ok(Some(Advance::RowReady));
                    }
                    self.advance_by(len);
                    return Ok(None);
                }
                MatchResult::NeedMore => return Ok(Some(Advance::NeedMore)),
                MatchResult::No => {
                    self.advance();
                    return Ok(None);
                }
            }
        }

        if c == quote {
            self.field_is_bad = true;
        }
        self.advance();
        Ok(None)
    }

    fn at_field_start_of_current_field(&self) -> bool {
        self.buffer.buffer_position == self.buffer.field_start
    }

    fn emit_current_field(&mut self) {
        let start = self.buffer.field_start;
        let end = self.buffer.buffer_position;
        let is_bad = self.field_is_bad;
        let quote_count = self.quote_count;
        self.spans.push(Span::new(start, end - start, quote_count, is_bad));
    }

    fn enforce_max_field_size(&self) -> Result<()> {
        let limit = self.config.max_field_size();
        if limit == 0 {
            return Ok(());
        }
        let len = self.buffer.buffer_position - self.buffer.field_start;
        if len > limit {
            return Err(Error::MaxFieldSizeExceeded { limit, position: self.position });
        }
        Ok(())
    }

    /// Consumes a line that is empty or begins with the comment character,
    /// up to and including its terminating newline.
    fn consume_blank_line(&mut self) -> Result<MatchResult> {
        loop {
            match self.peek_newline()? {
                MatchResult::Yes(len) => {
                    self.advance_by(len);
                    self.state = ParserState::None;
                    return Ok(MatchResult::Yes(len));
                }
                MatchResult::NeedMore => return Ok(MatchResult::NeedMore),
                MatchResult::No => {
                    if self.buffer.is_exhausted() {
                        return Ok(MatchResult::NeedMore);
                    }
                    self.advance();
                }
            }
        }
    }

    fn discard_until_newline(&mut self) -> Result<MatchResult> {
        loop {
            if self.buffer.is_exhausted() {
                return Ok(MatchResult::NeedMore);
            }
            match self.peek_newline()? {
                MatchResult::Yes(len) => {
                    self.advance_by(len);
                    self.position.raw_row += 1;
                    return Ok(MatchResult::Yes(len));
                }
                MatchResult::NeedMore => return Ok(MatchResult::NeedMore),
                MatchResult::No => {
                    self.advance();
                }
            }
        }
    }
}

fn try_match(buffer: &Buffer, pos: usize, pattern: &[char]) -> MatchResult {
    if pattern.is_empty() {
        return MatchResult::No;
    }
    let available = buffer.chars_read.saturating_sub(pos);
    if available < pattern.len() {
        let have = buffer.slice(pos, pos + available);
        if have == &pattern[..available] {
            return MatchResult::NeedMore;
        }
        return MatchResult::No;
    }
    if buffer.slice(pos, pos + pattern.len()) == pattern {
        MatchResult::Yes(pattern.len())
    } else {
        MatchResult::No
    }
}
