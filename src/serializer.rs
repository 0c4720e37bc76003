//! Serializer (spec.md §4.5): writes rows through the same dialect a
//! [`crate::parser::reader::Reader`] would parse back.
//!
//! Grounded on BurntSushi `csv::Writer`'s `should_quote`/quote-doubling
//! (`examples/other_examples/22bfc7c5_BurntSushi-rust-csv__src-writer.rs.rs`),
//! generalized from bytes to chars and from a fixed quoting scheme to the
//! full RFC4180/Escape/NoEscape mode switch; `csv-async`'s `QuoteStyle`
//! (`examples/other_examples/3055d43c_mcronce-csv-async__src-lib.rs.rs`)
//! shapes the `should_quote` predicate.

use crate::config::{Configuration, Mode};
use crate::error::Result;
use crate::injection;
use crate::position::Position;
use std::io::Write;

/// Writes CSV rows to an underlying byte sink, encoding each field per
/// `config.mode()` and sanitizing formula-injection prefixes on the way
/// out.
pub struct Serializer<W> {
    config: Configuration,
    sink: W,
    buffer: String,
    fields_written: Vec<String>,
    at_row_start: bool,
    row: u64,
}

impl<W: Write> Serializer<W> {
    /// Builds a serializer writing to `sink` under `config`.
    pub fn new(sink: W, config: Configuration) -> Self {
        Serializer { config, sink, buffer: String::new(), fields_written: Vec::new(), at_row_start: true, row: 0 }
    }

    /// The configuration in effect.
    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    /// Writes one field of the current row, using the configured or
    /// default `should_quote` predicate.
    pub fn write_field(&mut self, value: &str) -> Result<()> {
        self.write_field_inner(value, None, None)
    }

    /// Writes one field, overriding whether it gets quoted (RFC4180 mode
    /// only; ignored under `Escape`/`NoEscape`).
    pub fn write_field_quoted(&mut self, value: &str, should_quote: bool) -> Result<()> {
        self.write_field_inner(value, Some(should_quote), None)
    }

    /// Writes one field tagged with a declared type, consulted by a
    /// type-aware `should_quote` callback.
    pub fn write_convert_field(&mut self, value: &str, declared_type: &str) -> Result<()> {
        self.write_field_inner(value, None, Some(declared_type))
    }

    fn write_field_inner(
        &mut self,
        value: &str,
        should_quote_override: Option<bool>,
        declared_type: Option<&str>,
    ) -> Result<()> {
        if !self.at_row_start {
            self.buffer.push_str(self.config.delimiter());
        }
        self.at_row_start = false;

        let position = self.position();
        let sanitized = injection::sanitize(value, &self.config, position)?;

        let encoded = if sanitized.already_quoted {
            sanitized.content
        } else {
            let should_quote = self.resolve_should_quote(
                &sanitized.content,
                should_quote_override,
                sanitized.force_quote,
                declared_type,
            );
            match self.config.mode() {
                Mode::Rfc4180 => encode_rfc4180(&sanitized.content, should_quote, &self.config),
                Mode::Escape => encode_escape(&sanitized.content, &self.config),
                Mode::NoEscape => sanitized.content,
            }
        };

        self.buffer.push_str(&encoded);
        self.fields_written.push(value.to_string());
        Ok(())
    }

    fn resolve_should_quote(
        &mut self,
        content: &str,
        override_: Option<bool>,
        forced: bool,
        declared_type: Option<&str>,
    ) -> bool {
        if forced {
            return true;
        }
        if let Some(v) = override_ {
            return v;
        }
        if let Some(cb) = self.config.callbacks_mut().should_quote.as_mut() {
            return cb(content, declared_type, &self.fields_written);
        }
        default_should_quote(content, &self.config)
    }

    /// Terminates the current row: writes the configured newline and
    /// flushes the buffered row to the underlying sink.
    pub fn next_record(&mut self) -> Result<()> {
        let newline = self.config.newline().unwrap_or("\n").to_string();
        self.buffer.push_str(&newline);
        self.sink.write_all(self.buffer.as_bytes())?;
        self.buffer.clear();
        self.fields_written.clear();
        self.at_row_start = true;
        self.row += 1;
        Ok(())
    }

    /// Flushes any buffered row content and the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            self.sink.write_all(self.buffer.as_bytes())?;
            self.buffer.clear();
        }
        self.sink.flush()?;
        Ok(())
    }

    /// Writes a standalone comment line (`comment` marker followed by
    /// `text`), bypassing field encoding entirely.
    pub fn write_comment(&mut self, text: &str) -> Result<()> {
        self.flush()?;
        let newline = self.config.newline().unwrap_or("\n").to_string();
        let comment = self.config.comment();
        let line = format!("{comment}{text}{newline}");
        self.sink.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Writes `names` as a header row.
    pub fn write_header(&mut self, names: &[String]) -> Result<()> {
        for name in names {
            self.write_field(name)?;
        }
        self.next_record()
    }

    /// Consumes the serializer, returning the underlying sink after a
    /// final flush.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.sink)
    }

    fn position(&self) -> Position {
        Position { byte: 0, char_count: 0, row: self.row, raw_row: self.row }
    }
}

fn default_should_quote(content: &str, config: &Configuration) -> bool {
    if content.is_empty() {
        return false;
    }
    let whitespace = config.whitespace_chars();
    let first = content.chars().next().expect("non-empty");
    let last = content.chars().next_back().expect("non-empty");
    if whitespace.contains(&first) || whitespace.contains(&last) {
        return true;
    }
    if content.contains(config.quote()) {
        return true;
    }
    if content.contains(config.delimiter()) {
        return true;
    }
    match config.newline() {
        Some(nl) => content.contains(nl),
        None => content.contains('\n') || content.contains('\r'),
    }
}

fn encode_rfc4180(content: &str, should_quote: bool, config: &Configuration) -> String {
    if !should_quote {
        return content.to_string();
    }
    let quote = config.quote();
    let escape = config.escape();
    let mut escaped = content.to_string();
    if escape != quote {
        escaped = escaped.replace(escape, &format!("{escape}{escape}"));
    }
    escaped = escaped.replace(quote, &format!("{escape}{quote}"));
    format!("{quote}{escaped}{quote}")
}

fn encode_escape(content: &str, config: &Configuration) -> String {
    let escape = config.escape();
    let quote = config.quote();
    let delimiter = config.delimiter();
    let newline_owned;
    let newline: &str = match config.newline() {
        Some(nl) => nl,
        None => {
            newline_owned = "\n".to_string();
            &newline_owned
        }
    };

    let mut out = String::with_capacity(content.len());
    let chars: Vec<char> = content.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let rest: String = chars[i..].iter().collect();
        if rest.starts_with(delimiter) {
            out.push(escape);
            out.push_str(delimiter);
            i += delimiter.chars().count();
        } else if rest.starts_with(newline) {
            out.push(escape);
            out.push_str(newline);
            i += newline.chars().count();
        } else if chars[i] == escape || chars[i] == quote {
            out.push(escape);
            out.push(chars[i]);
            i += 1;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}
