//! Configuration — the validated bundle of dialect, behavior, and callback
//! settings consumed by the parser, the reader facade, and the serializer.

use crate::error::{Error, Result};
use crate::position::Position;

/// Which quoting/escaping dialect the parser or serializer follows.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    /// RFC 4180: quotes are structural, doubled quotes (or
    /// `escape`-prefixed quotes when `escape != quote`) are the only
    /// escape mechanism.
    Rfc4180,
    /// A single escape character makes the following character literal;
    /// quotes are not structural.
    Escape,
    /// No escape mechanism at all; only the delimiter and newline split
    /// fields and rows.
    NoEscape,
}

impl Default for Mode {
    fn default() -> Mode {
        Mode::Rfc4180
    }
}

/// Whitespace-trimming behavior, as a small bitset.
///
/// `Trim::NONE` and `Trim::TRIM` are mutually exclusive with nothing;
/// `Trim::INSIDE_QUOTES` composes with `Trim::TRIM` via [`Trim::bitor`] to
/// produce "trim outside and inside quotes".
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Trim(u8);

impl Trim {
    /// No trimming at all.
    pub const NONE: Trim = Trim(0);
    /// Trim leading/trailing whitespace outside of quotes.
    pub const TRIM: Trim = Trim(1 << 0);
    /// Trim leading/trailing whitespace just inside the quote characters
    /// of a quoted field.
    pub const INSIDE_QUOTES: Trim = Trim(1 << 1);

    /// Whether this set of flags includes `other`.
    pub fn contains(self, other: Trim) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any trimming at all is requested.
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl core::ops::BitOr for Trim {
    type Output = Trim;
    fn bitor(self, rhs: Trim) -> Trim {
        Trim(self.0 | rhs.0)
    }
}

/// Write-side formula-injection guard.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum InjectionOptions {
    /// Do nothing.
    #[default]
    None,
    /// Fail the write with [`Error::InjectionDetected`].
    Exception,
    /// Escape the leading injection character inside quotes.
    Escape,
    /// Strip leading injection characters.
    Strip,
}

/// The default set of characters spreadsheet applications treat as a
/// formula prefix.
pub const DEFAULT_INJECTION_CHARACTERS: &[char] = &['=', '+', '-', '@'];

/// The default whitespace characters used by [`Trim`].
pub const DEFAULT_WHITESPACE_CHARS: &[char] = &[' ', '\t'];

/// Result of a `bad_data_found` callback wanting to recover or not. Kept as
/// a type alias so call sites read naturally.
pub type BadDataCallback = Box<dyn FnMut(&str, &str, Position)>;
/// See [`Configuration::missing_field_found`].
pub type MissingFieldCallback = Box<dyn FnMut(&[String], Option<usize>, Position)>;
/// See [`Configuration::reading_exception_occurred`].
pub type ReadingExceptionCallback = Box<dyn FnMut(&Error) -> bool>;
/// See [`Configuration::header_validated`].
pub type HeaderValidatedCallback = Box<dyn FnMut(&[String], Position)>;
/// See [`Configuration::should_skip_record`].
pub type ShouldSkipRecordCallback = Box<dyn FnMut(&[String]) -> bool>;
/// See [`Configuration::prepare_header_for_match`].
pub type PrepareHeaderCallback = Box<dyn FnMut(&str, usize) -> String>;
/// See [`Configuration::get_dynamic_property_name`].
pub type DynamicPropertyNameCallback = Box<dyn FnMut(usize, Position) -> String>;
/// See [`Configuration::should_quote`].
pub type ShouldQuoteCallback = Box<dyn FnMut(&str, Option<&str>, &[String]) -> bool>;

/// The table of user-overridable callback hooks (spec.md §6).
///
/// Every field defaults to `None`, in which case the default behavior
/// documented on each setter method in [`ConfigurationBuilder`] applies.
#[derive(Default)]
pub struct Callbacks {
    /// Normalizer applied to each header name before it is inserted into
    /// the named-index map.
    pub prepare_header_for_match: Option<PrepareHeaderCallback>,
    /// Called with the current row's fields before column-count
    /// validation; returning `true` causes the reader to transparently
    /// skip the row.
    pub should_skip_record: Option<ShouldSkipRecordCallback>,
    /// Called when an indexed or named field access misses.
    pub missing_field_found: Option<MissingFieldCallback>,
    /// Called when a field violates RFC 4180 quoting rules.
    pub bad_data_found: Option<BadDataCallback>,
    /// Called when a structural error (column-count mismatch) occurs.
    /// Returning `true` rethrows; `false` recovers and continues.
    pub reading_exception_occurred: Option<ReadingExceptionCallback>,
    /// Called after `validate_header` with the list of mismatched names.
    pub header_validated: Option<HeaderValidatedCallback>,
    /// Supplies a property name for a given column index, for callers
    /// building dynamic/property-bag records.
    pub get_dynamic_property_name: Option<DynamicPropertyNameCallback>,
    /// Overrides the default `should_quote` predicate used by the
    /// serializer.
    pub should_quote: Option<ShouldQuoteCallback>,
}

impl core::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Callbacks")
            .field("prepare_header_for_match", &self.prepare_header_for_match.is_some())
            .field("should_skip_record", &self.should_skip_record.is_some())
            .field("missing_field_found", &self.missing_field_found.is_some())
            .field("bad_data_found", &self.bad_data_found.is_some())
            .field("reading_exception_occurred", &self.reading_exception_occurred.is_some())
            .field("header_validated", &self.header_validated.is_some())
            .field("get_dynamic_property_name", &self.get_dynamic_property_name.is_some())
            .field("should_quote", &self.should_quote.is_some())
            .finish()
    }
}

/// The validated, immutable-after-construction configuration shared by the
/// parser, the reader facade, and the serializer.
#[derive(Debug)]
pub struct Configuration {
    pub(crate) delimiter: String,
    pub(crate) quote: char,
    pub(crate) escape: char,
    pub(crate) newline: Option<String>,
    pub(crate) comment: char,
    pub(crate) mode: Mode,
    pub(crate) trim: Trim,
    pub(crate) whitespace_chars: Vec<char>,
    pub(crate) allow_comments: bool,
    pub(crate) ignore_blank_lines: bool,
    pub(crate) detect_delimiter: bool,
    pub(crate) detect_delimiter_candidates: Vec<String>,
    pub(crate) count_bytes: bool,
    pub(crate) max_field_size: usize,
    pub(crate) line_break_in_quoted_field_is_bad_data: bool,
    pub(crate) cache_fields: bool,
    pub(crate) has_header_record: bool,
    pub(crate) buffer_size: usize,
    pub(crate) process_field_buffer_size: usize,
    pub(crate) detect_column_count_changes: bool,
    pub(crate) injection_options: InjectionOptions,
    pub(crate) injection_characters: Vec<char>,
    pub(crate) injection_escape_character: char,
    pub(crate) include_raw_record_in_errors: bool,
    pub(crate) callbacks: Callbacks,
}

impl Configuration {
    /// Starts building a configuration with RFC 4180 defaults: `,`
    /// delimiter, `"` quote and escape, auto-detected newline, no
    /// comments, no trimming, a 4096-character initial buffer.
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }

    /// The configured field delimiter.
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// The configured quote character.
    pub fn quote(&self) -> char {
        self.quote
    }

    /// The configured escape character.
    pub fn escape(&self) -> char {
        self.escape
    }

    /// The explicit newline, if one was configured; `None` means "accept
    /// any of `\r\n`, `\r`, `\n`".
    pub fn newline(&self) -> Option<&str> {
        self.newline.as_deref()
    }

    /// The dialect mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The trim behavior.
    pub fn trim(&self) -> Trim {
        self.trim
    }

    /// Whether decoded field strings are interned via the field cache.
    pub fn cache_fields(&self) -> bool {
        self.cache_fields
    }

    /// The character set consulted by [`Trim`].
    pub fn whitespace_chars(&self) -> &[char] {
        &self.whitespace_chars
    }

    /// The comment-line marker, when [`Configuration::allow_comments`] is
    /// enabled.
    pub fn comment(&self) -> char {
        self.comment
    }

    /// Whether lines beginning with `comment` are skipped.
    pub fn allow_comments(&self) -> bool {
        self.allow_comments
    }

    /// Whether all-newline rows are skipped.
    pub fn ignore_blank_lines(&self) -> bool {
        self.ignore_blank_lines
    }

    /// Whether the first row is treated as a header record.
    pub fn has_header_record(&self) -> bool {
        self.has_header_record
    }

    /// Initial capacity, in characters, of the primary row-window buffer.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Initial capacity, in characters, of the processed-field buffer.
    pub fn process_field_buffer_size(&self) -> usize {
        self.process_field_buffer_size
    }

    /// Upper bound on a single field's length, in characters (`0` disables
    /// the check).
    pub fn max_field_size(&self) -> usize {
        self.max_field_size
    }

    /// Whether a newline inside a quoted field is treated as bad data
    /// (and, when so, terminates the row).
    pub fn line_break_in_quoted_field_is_bad_data(&self) -> bool {
        self.line_break_in_quoted_field_is_bad_data
    }

    /// Whether the column count of the first row is latched and enforced
    /// on subsequent rows.
    pub fn detect_column_count_changes(&self) -> bool {
        self.detect_column_count_changes
    }

    /// Whether delimiter auto-detection runs on the first buffer fill.
    pub fn detect_delimiter(&self) -> bool {
        self.detect_delimiter
    }

    /// The candidate delimiters considered by auto-detection.
    pub fn detect_delimiter_candidates(&self) -> &[String] {
        &self.detect_delimiter_candidates
    }

    /// Whether encoded byte counts are tracked for diagnostics.
    pub fn count_bytes(&self) -> bool {
        self.count_bytes
    }

    /// The write-side formula-injection policy.
    pub fn injection_options(&self) -> InjectionOptions {
        self.injection_options
    }

    /// The characters treated as a formula prefix on write.
    pub fn injection_characters(&self) -> &[char] {
        &self.injection_characters
    }

    /// The character prepended to neutralize a formula prefix under
    /// [`InjectionOptions::Escape`].
    pub fn injection_escape_character(&self) -> char {
        self.injection_escape_character
    }

    /// Replaces the delimiter after auto-detection has chosen one
    /// (spec.md §4.3). Only called by [`crate::detect`].
    pub(crate) fn set_delimiter(&mut self, delimiter: String) {
        self.delimiter = delimiter;
    }

    /// Whether error messages may include the raw record they occurred in.
    pub fn include_raw_record_in_errors(&self) -> bool {
        self.include_raw_record_in_errors
    }

    /// Mutable access to the callback table, used internally by the parser,
    /// facade, and serializer to invoke hooks.
    pub(crate) fn callbacks_mut(&mut self) -> &mut Callbacks {
        &mut self.callbacks
    }

    fn validate(&self) -> Result<()> {
        if self.delimiter.is_empty() {
            return Err(Error::InvalidConfiguration(
                "delimiter must be at least one character".into(),
            ));
        }
        if self.delimiter.contains(self.quote) {
            return Err(Error::InvalidConfiguration(
                "delimiter must not contain the quote character".into(),
            ));
        }
        if let Some(nl) = &self.newline {
            if nl.is_empty() {
                return Err(Error::InvalidConfiguration(
                    "newline, if set explicitly, must not be empty".into(),
                ));
            }
            if self.delimiter.contains(nl.as_str()) || nl.contains(self.delimiter.as_str()) {
                return Err(Error::InvalidConfiguration(
                    "delimiter and newline must not overlap".into(),
                ));
            }
        }
        if self.buffer_size == 0 {
            return Err(Error::InvalidConfiguration(
                "buffer_size must be greater than zero".into(),
            ));
        }
        if self.process_field_buffer_size == 0 {
            return Err(Error::InvalidConfiguration(
                "process_field_buffer_size must be greater than zero".into(),
            ));
        }
        if self.detect_delimiter && self.detect_delimiter_candidates.is_empty() {
            return Err(Error::InvalidConfiguration(
                "detect_delimiter_candidates must not be empty when detect_delimiter is enabled"
                    .into(),
            ));
        }
        Ok(())
    }

    /// Re-validates the configuration after delimiter auto-detection has
    /// replaced [`Configuration::delimiter`], per spec.md §4.3.
    pub(crate) fn revalidate(&self) -> Result<()> {
        self.validate()
    }
}

/// Builder for [`Configuration`]. Mirrors `CsvConfig`'s convention of
/// a plain `Default`-derived config struct, widened to a full builder
/// because this configuration has many more knobs.
pub struct ConfigurationBuilder {
    inner: Configuration,
}

impl Default for ConfigurationBuilder {
    fn default() -> ConfigurationBuilder {
        ConfigurationBuilder {
            inner: Configuration {
                delimiter: ",".to_string(),
                quote: '"',
                escape: '"',
                newline: None,
                comment: '#',
                mode: Mode::Rfc4180,
                trim: Trim::NONE,
                whitespace_chars: DEFAULT_WHITESPACE_CHARS.to_vec(),
                allow_comments: false,
                ignore_blank_lines: true,
                detect_delimiter: false,
                detect_delimiter_candidates: vec![",".to_string(), ";".to_string(), "\t".to_string()],
                count_bytes: false,
                max_field_size: 0,
                line_break_in_quoted_field_is_bad_data: false,
                cache_fields: false,
                has_header_record: false,
                buffer_size: 4096,
                process_field_buffer_size: 1024,
                detect_column_count_changes: false,
                injection_options: InjectionOptions::None,
                injection_characters: DEFAULT_INJECTION_CHARACTERS.to_vec(),
                injection_escape_character: '\'',
                include_raw_record_in_errors: true,
                callbacks: Callbacks::default(),
            },
        }
    }
}

macro_rules! setter {
    ($name:ident, $field:ident, $ty:ty) => {
        /// Sets the corresponding [`Configuration`] field.
        pub fn $name(mut self, value: $ty) -> Self {
            self.inner.$field = value;
            self
        }
    };
}

impl ConfigurationBuilder {
    setter!(delimiter_str, delimiter, String);
    setter!(quote, quote, char);
    setter!(escape, escape, char);
    setter!(comment, comment, char);
    setter!(mode, mode, Mode);
    setter!(trim, trim, Trim);
    setter!(whitespace_chars, whitespace_chars, Vec<char>);
    setter!(allow_comments, allow_comments, bool);
    setter!(ignore_blank_lines, ignore_blank_lines, bool);
    setter!(detect_delimiter, detect_delimiter, bool);
    setter!(detect_delimiter_candidates, detect_delimiter_candidates, Vec<String>);
    setter!(count_bytes, count_bytes, bool);
    setter!(max_field_size, max_field_size, usize);
    setter!(
        line_break_in_quoted_field_is_bad_data,
        line_break_in_quoted_field_is_bad_data,
        bool
    );
    setter!(cache_fields, cache_fields, bool);
    setter!(has_header_record, has_header_record, bool);
    setter!(buffer_size, buffer_size, usize);
    setter!(process_field_buffer_size, process_field_buffer_size, usize);
    setter!(detect_column_count_changes, detect_column_count_changes, bool);
    setter!(injection_options, injection_options, InjectionOptions);
    setter!(injection_characters, injection_characters, Vec<char>);
    setter!(injection_escape_character, injection_escape_character, char);
    setter!(include_raw_record_in_errors, include_raw_record_in_errors, bool);

    /// Sets the field delimiter. Must be at least one character and must
    /// not contain the quote character.
    pub fn delimiter(self, delimiter: &str) -> Self {
        self.delimiter_str(delimiter.to_string())
    }

    /// Sets an explicit newline string. When left unset (the default), the
    /// reader accepts any of `\r\n`, `\r`, or `\n`.
    pub fn newline(mut self, newline: impl Into<String>) -> Self {
        self.inner.newline = Some(newline.into());
        self
    }

    /// Installs the `prepare_header_for_match` hook.
    pub fn prepare_header_for_match<F>(mut self, f: F) -> Self
    where
        F: FnMut(&str, usize) -> String + 'static,
    {
        self.inner.callbacks.prepare_header_for_match = Some(Box::new(f));
        self
    }

    /// Installs the `should_skip_record` hook.
    pub fn should_skip_record<F>(mut self, f: F) -> Self
    where
        F: FnMut(&[String]) -> bool + 'static,
    {
        self.inner.callbacks.should_skip_record = Some(Box::new(f));
        self
    }

    /// Installs the `missing_field_found` hook.
    pub fn missing_field_found<F>(mut self, f: F) -> Self
    where
        F: FnMut(&[String], Option<usize>, Position) + 'static,
    {
        self.inner.callbacks.missing_field_found = Some(Box::new(f));
        self
    }

    /// Installs the `bad_data_found` hook.
    pub fn bad_data_found<F>(mut self, f: F) -> Self
    where
        F: FnMut(&str, &str, Position) + 'static,
    {
        self.inner.callbacks.bad_data_found = Some(Box::new(f));
        self
    }

    /// Installs the `reading_exception_occurred` hook. Return `true` to
    /// rethrow, `false` to recover and continue.
    pub fn reading_exception_occurred<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Error) -> bool + 'static,
    {
        self.inner.callbacks.reading_exception_occurred = Some(Box::new(f));
        self
    }

    /// Installs the `header_validated` hook.
    pub fn header_validated<F>(mut self, f: F) -> Self
    where
        F: FnMut(&[String], Position) + 'static,
    {
        self.inner.callbacks.header_validated = Some(Box::new(f));
        self
    }

    /// Installs the `get_dynamic_property_name` hook.
    pub fn get_dynamic_property_name<F>(mut self, f: F) -> Self
    where
        F: FnMut(usize, Position) -> String + 'static,
    {
        self.inner.callbacks.get_dynamic_property_name = Some(Box::new(f));
        self
    }

    /// Installs the `should_quote` hook consulted by the serializer.
    pub fn should_quote<F>(mut self, f: F) -> Self
    where
        F: FnMut(&str, Option<&str>, &[String]) -> bool + 'static,
    {
        self.inner.callbacks.should_quote = Some(Box::new(f));
        self
    }

    /// Validates and finalizes the configuration.
    pub fn build(self) -> Result<Configuration> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}
