//! Error kinds for parsing, serializing, and configuring a [`crate::config::Configuration`].
//!
//! See spec.md §7 for the full propagation policy. In short: decoding-time
//! anomalies (malformed fields) are reported to callbacks and may be
//! swallowed; structural anomalies (column-count drift, oversized fields,
//! invalid configuration) surface as [`Error`] unless a callback recovers.

use crate::position::Position;

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while parsing, serializing, or configuring
/// a reader/writer.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A field violated RFC 4180 quoting rules. Only surfaced as an `Err`
    /// when no `bad_data_found` callback is installed and the caller used
    /// a method that does not tolerate recoverable bad data; the default
    /// path instead routes this through the callback and keeps parsing.
    #[error("malformed field at {position}: {field:?} (raw record: {raw_record:?})")]
    BadData {
        /// The raw (still-encoded) field content.
        field: String,
        /// The raw record the field was found in.
        raw_record: String,
        /// Where in the stream this occurred.
        position: Position,
    },

    /// A requested column index or header name could not be resolved.
    #[error("missing field at {position}: {detail}")]
    MissingField {
        /// Human-readable description of what was missing (index or name).
        detail: String,
        /// Where in the stream this occurred.
        position: Position,
    },

    /// A row had a different number of columns than the first row, and
    /// `detect_column_count_changes` was enabled.
    #[error(
        "inconsistent column count at {position}: expected {expected}, found {actual}"
    )]
    ColumnCountMismatch {
        /// The column count latched from the first row.
        expected: usize,
        /// The column count observed on this row.
        actual: usize,
        /// Where in the stream this occurred.
        position: Position,
    },

    /// A field exceeded `max_field_size`.
    #[error("field at {position} exceeded the maximum field size of {limit} characters")]
    MaxFieldSizeExceeded {
        /// The configured limit that was exceeded.
        limit: usize,
        /// Where in the stream this occurred.
        position: Position,
    },

    /// The dialect/behavior configuration is invalid, detected either at
    /// construction or after delimiter auto-detection.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A write was rejected by the injection sanitizer because
    /// `InjectionOptions::Exception` is configured.
    #[error("potential formula injection detected at {position}: {field:?}")]
    InjectionDetected {
        /// The field that triggered detection.
        field: String,
        /// Where in the output stream this occurred.
        position: Position,
    },

    /// A raw-record-based accessor was called from within a
    /// `bad_data_found` callback. The callback already received the raw
    /// record and field as arguments; re-entering the parser for them is
    /// not supported while the callback is on the stack.
    #[error("cannot access the raw record from within a bad_data_found callback; use the field/raw_record arguments passed to the callback instead")]
    AccessDuringCallback,

    /// The underlying character source or sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The decoded bytes of a field were not valid UTF-8.
    #[error("invalid UTF-8 in field at {position}")]
    InvalidUtf8 {
        /// Where in the stream this occurred.
        position: Position,
    },
}

impl Error {
    /// Returns the [`Position`] associated with this error, if any.
    pub fn position(&self) -> Option<Position> {
        match self {
            Error::BadData { position, .. }
            | Error::MissingField { position, .. }
            | Error::ColumnCountMismatch { position, .. }
            | Error::MaxFieldSizeExceeded { position, .. }
            | Error::InjectionDetected { position, .. }
            | Error::InvalidUtf8 { position } => Some(*position),
            Error::InvalidConfiguration(_)
            | Error::AccessDuringCallback
            | Error::Io(_) => None,
        }
    }
}
