//! Field Post-Processor: turns a raw span plus its parse-time flags into a
//! decoded string (spec.md §4.2).
//!
//! Grounded on `FieldBuilder::append_escaped_quote` and state
//! handlers for quote/escape resolution
//! (`examples/johnlogsdon-rust-csv-parser/src/lib.rs`), generalized from
//! "build as we scan" to "decode a finished span on demand" per spec.md's
//! zero-copy-until-needed model. BurntSushi `csv::Writer`'s quote-doubling
//! (`examples/other_examples/22bfc7c5_BurntSushi-rust-csv__src-writer.rs.rs`)
//! is the mirror-image operation exercised in this crate's serializer.

use crate::buffer::{trim_span, ProcessedBuffer};
use crate::config::{Configuration, Mode};

/// What a span decode produced, before the caller wraps it for caching.
pub enum Decoded<'a> {
    /// The decoded value is exactly the raw span, no copy needed.
    Borrowed(&'a [char]),
    /// The decoded value required stripping/escaping; content is staged in
    /// the caller-provided [`ProcessedBuffer`] scratch space.
    Owned(String),
}

/// Decodes a well-formed RFC4180 field (spec.md §4.2, "RFC 4180,
/// well-formed"). `raw` is the full raw span; `quote_count` is how many
/// quote-or-escape characters the parser observed in it.
pub fn decode_rfc4180<'a>(
    raw: &'a [char],
    quote_count: usize,
    config: &Configuration,
    scratch: &mut ProcessedBuffer,
) -> Decoded<'a> {
    let (mut start, mut len) = (0usize, raw.len());
    if config.trim().contains(crate::config::Trim::TRIM) {
        let (s, l) = trim_span(raw, start, len, config.whitespace_chars());
        start = s;
        len = l;
    }
    if quote_count == 0 {
        return Decoded::Borrowed(&raw[start..start + len]);
    }

    let quote = config.quote();
    let escape = config.escape();
    let is_quoted =
        len >= 2 && raw[start] == quote && raw[start + len - 1] == quote;
    if !is_quoted || len < 2 {
        // Lone quote, or quotes not bracketing the whole span: this is not
        // actually well-formed despite the parser not having flagged it
        // bad (e.g. a single `"` field). Fall back to bad-data decoding.
        return decode_rfc4180_bad(raw, config, scratch, start, len, None);
    }

    let inside = &raw[start + 1..start + len - 1];
    let (inside_start, inside_len) = if config.trim().contains(crate::config::Trim::INSIDE_QUOTES)
    {
        trim_span(inside, 0, inside.len(), config.whitespace_chars())
    } else {
        (0, inside.len())
    };
    let inside = &inside[inside_start..inside_start + inside_len];

    if quote_count <= 2 {
        // The only quotes present are the bracketing pair; nothing to
        // unescape inside.
        return Decoded::Borrowed(inside);
    }

    scratch.clear();
    let mut i = 0;
    while i < inside.len() {
        let c = inside[i];
        if c == escape && i + 1 < inside.len() {
            let next = inside[i + 1];
            if next == quote || next == escape {
                scratch.push(next);
                i += 2;
                continue;
            }
        }
        scratch.push(c);
        i += 1;
    }
    Decoded::Owned(scratch.as_string())
}

/// Decodes a field the parser already flagged as bad data, or one that
/// `decode_rfc4180` discovered was not actually well-formed on inspection
/// (spec.md §4.2, "RFC 4180, bad"; Open Question #1 resolution in
/// DESIGN.md covers the escape-equals-quote termination rule below).
///
/// `start`/`len` let `decode_rfc4180` hand off a sub-range without
/// re-deriving the trim; pass `None` to trim from scratch (the normal
/// entry point used by the parser when it already knows a field is bad).
pub fn decode_rfc4180_bad<'a>(
    raw: &'a [char],
    config: &Configuration,
    scratch: &mut ProcessedBuffer,
    start: usize,
    len: usize,
    trimmed: Option<()>,
) -> Decoded<'a> {
    let (start, len) = if trimmed.is_some() || config.trim().is_none() {
        (start, len)
    } else if config.trim().contains(crate::config::Trim::TRIM) {
        trim_span(raw, start, len, config.whitespace_chars())
    } else {
        (start, len)
    };

    let quote = config.quote();
    let escape = config.escape();
    if len == 0 || raw[start] != quote {
        return Decoded::Borrowed(&raw[start..start + len]);
    }

    scratch.clear();
    let mut i = start + 1;
    let end = start + len;
    // Once an unescaped quote has been seen, an escape-then-quote pair no
    // longer unescapes: it ends escape processing for the rest of the
    // field (Open Question #1) and both characters are copied literally.
    let mut saw_unescaped_quote = false;
    while i < end {
        let c = raw[i];
        if c == escape && i + 1 < end && !saw_unescaped_quote {
            let next = raw[i + 1];
            if next == quote || next == escape {
                scratch.push(next);
                i += 2;
                continue;
            }
        }
        if c == quote {
            saw_unescaped_quote = true;
        }
        scratch.push(c);
        i += 1;
    }
    Decoded::Owned(scratch.as_string())
}

/// Decodes a field under `Mode::Escape` (spec.md §4.2, "Escape mode"): copy
/// through, dropping each character that is exactly `escape` (the
/// following character is taken literally).
pub fn decode_escape<'a>(
    raw: &'a [char],
    config: &Configuration,
    scratch: &mut ProcessedBuffer,
) -> Decoded<'a> {
    let escape = config.escape();
    if !raw.contains(&escape) {
        let (start, len) = if config.trim().contains(crate::config::Trim::TRIM) {
            trim_span(raw, 0, raw.len(), config.whitespace_chars())
        } else {
            (0, raw.len())
        };
        return Decoded::Borrowed(&raw[start..start + len]);
    }
    scratch.clear();
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == escape && i + 1 < raw.len() {
            scratch.push(raw[i + 1]);
            i += 2;
        } else {
            scratch.push(raw[i]);
            i += 1;
        }
    }
    let decoded = scratch.as_string();
    let trimmed = if config.trim().contains(crate::config::Trim::TRIM) {
        decoded.trim_matches(|c| config.whitespace_chars().contains(&c)).to_string()
    } else {
        decoded
    };
    Decoded::Owned(trimmed)
}

/// Decodes a field under `Mode::NoEscape` (spec.md §4.2, "NoEscape mode"):
/// no character is special; only trimming applies.
pub fn decode_no_escape<'a>(raw: &'a [char], config: &Configuration) -> Decoded<'a> {
    let (start, len) = if config.trim().contains(crate::config::Trim::TRIM) {
        trim_span(raw, 0, raw.len(), config.whitespace_chars())
    } else {
        (0, raw.len())
    };
    Decoded::Borrowed(&raw[start..start + len])
}

/// Dispatches to the right decode function for the configured mode and
/// whether the parser flagged this span as bad.
pub fn decode_field<'a>(
    raw: &'a [char],
    quote_count: usize,
    is_bad: bool,
    config: &Configuration,
    scratch: &mut ProcessedBuffer,
) -> Decoded<'a> {
    match config.mode() {
        Mode::Rfc4180 => {
            if is_bad {
                decode_rfc4180_bad(raw, config, scratch, 0, raw.len(), None)
            } else {
                decode_rfc4180(raw, quote_count, config, scratch)
            }
        }
        Mode::Escape => decode_escape(raw, config, scratch),
        Mode::NoEscape => decode_no_escape(raw, config),
    }
}
