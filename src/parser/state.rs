//! The parser's per-row state machine states and the field span type.
//!
//! Named after spec.md §4.1's `None/Spaces/BlankLine/Delimiter/LineEnding/
//! NewLine` states, generalized from `CsvState`
//! (`examples/johnlogsdon-rust-csv-parser/src/lib.rs`), which covered the
//! same ground with different names (`StartOfField`, `InQuotedField`,
//! `QuoteSeen`, `CustomEscapeSeen`, `EndOfRecord`, `Finished`).

/// Where the per-row state machine currently is.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParserState {
    /// Default: reading inside a field in the main loop.
    None,
    /// Consuming leading whitespace of an RFC4180 field (trim enabled).
    Spaces,
    /// Consuming a line that is empty or starts with `comment`.
    BlankLine,
    /// Matching the continuation of a multi-character delimiter.
    Delimiter,
    /// Resolving a `\r` that may be followed by `\n` (auto newline).
    LineEnding,
    /// Matching the continuation of a multi-character configured newline.
    NewLine,
}

impl Default for ParserState {
    fn default() -> Self {
        ParserState::None
    }
}

/// A field's extent within the current row window, prior to quote/escape
/// resolution, plus decode bookkeeping.
///
/// `start`/`length` are offsets into the row window (relative to
/// `row_start`, consistent with spec.md §3's `(start, length, quote_count,
/// is_bad, is_processed)` triple — we store `start` as buffer-absolute
/// internally since the buffer already exposes row-relative slicing via
/// `row_start`).
#[derive(Clone, Debug)]
pub struct Span {
    pub start: usize,
    pub length: usize,
    pub quote_count: usize,
    pub is_bad: bool,
    pub is_processed: bool,
    pub cached: Option<std::rc::Rc<str>>,
}

impl Span {
    pub fn new(start: usize, length: usize, quote_count: usize, is_bad: bool) -> Self {
        Span { start, length, quote_count, is_bad, is_processed: false, cached: None }
    }
}
