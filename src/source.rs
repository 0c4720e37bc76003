//! The abstract character source the parser pulls from.
//!
//! Spec.md §6 describes the core as operating "on decoded characters from
//! an external character reader" and treats byte counting as advisory.
//! [`CharSource`] is that reader boundary; [`Utf8CharSource`] is the one
//! concrete implementation shipped here, adapting any [`std::io::Read`]
//! (typically wrapped in a [`std::io::BufReader`] by the caller, following
//! BurntSushi `csv::Reader`'s convention of buffering internally so callers
//! don't have to).

use std::io::{self, Read};

/// A source of decoded `char`s, plus an advisory byte count of how many
/// encoded bytes were consumed to produce them.
pub trait CharSource {
    /// Fills as much of `out` as possible with the next characters from the
    /// source. Returns the number of characters written and the number of
    /// underlying bytes consumed to produce them. Returns `(0, 0)` at EOF.
    fn read_chars(&mut self, out: &mut [char]) -> io::Result<(usize, usize)>;
}

/// Decodes UTF-8 bytes from any [`Read`] into `char`s, carrying over a
/// partial multi-byte sequence across calls when a read ends mid-character.
pub struct Utf8CharSource<R> {
    inner: R,
    raw: Vec<u8>,
    /// Number of valid bytes carried over at the front of `raw` from the
    /// previous call (a multi-byte sequence split across reads).
    pending_len: usize,
}

impl<R: Read> Utf8CharSource<R> {
    /// Wraps `inner`, using an internal byte staging buffer of `raw_capacity`
    /// bytes per fill.
    pub fn new(inner: R, raw_capacity: usize) -> Self {
        Utf8CharSource { inner, raw: vec![0u8; raw_capacity.max(64)], pending_len: 0 }
    }

    /// Consumes the adapter, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> CharSource for Utf8CharSource<R> {
    fn read_chars(&mut self, out: &mut [char]) -> io::Result<(usize, usize)> {
        if out.is_empty() {
            return Ok((0, 0));
        }

        // A single underlying read can land exactly on a multi-byte
        // sequence boundary with no complete char ahead of it (e.g. it
        // yields only the leading byte of a sequence). That isn't EOF;
        // keep pulling bytes until a char decodes or the source is
        // genuinely exhausted.
        loop {
            let n = self.inner.read(&mut self.raw[self.pending_len..])?;
            let total_bytes = self.pending_len + n;
            if total_bytes == 0 {
                return Ok((0, 0));
            }
            let available = &self.raw[..total_bytes];

            // `error_len() == Some(_)` means the byte at `valid_up_to` is
            // itself invalid UTF-8, not merely the start of a sequence
            // truncated by the end of this read. In that case emit U+FFFD
            // for it so a stream of garbage bytes still makes forward
            // progress instead of spinning.
            let (valid, invalid_byte) = match std::str::from_utf8(available) {
                Ok(valid) => (valid, false),
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    let valid = std::str::from_utf8(&available[..valid_up_to]).unwrap();
                    (valid, e.error_len().is_some())
                }
            };

            let mut nchars = 0;
            let mut consumed_bytes = 0;
            for ch in valid.chars() {
                if nchars >= out.len() {
                    break;
                }
                out[nchars] = ch;
                nchars += 1;
                consumed_bytes += ch.len_utf8();
            }
            if invalid_byte && nchars < out.len() && consumed_bytes == valid.len() {
                out[nchars] = char::REPLACEMENT_CHARACTER;
                nchars += 1;
                consumed_bytes += 1;
            }

            let leftover_start = consumed_bytes;
            let leftover_len = total_bytes - leftover_start;
            self.raw.copy_within(leftover_start..total_bytes, 0);
            self.pending_len = leftover_len;

            if nchars == 0 {
                if n == 0 {
                    // The underlying reader is truly at EOF with an
                    // incomplete sequence left over; nothing more can
                    // arrive to complete it.
                    return Ok((0, 0));
                }
                continue;
            }
            return Ok((nchars, consumed_bytes));
        }
    }
}

/// An in-memory character source over a string slice, useful for tests and
/// for callers who already have the full input in memory.
pub struct SliceCharSource<'a> {
    chars: std::str::Chars<'a>,
}

impl<'a> SliceCharSource<'a> {
    /// Creates a source that yields the characters of `s` in order.
    pub fn new(s: &'a str) -> Self {
        SliceCharSource { chars: s.chars() }
    }
}

impl<'a> CharSource for SliceCharSource<'a> {
    fn read_chars(&mut self, out: &mut [char]) -> io::Result<(usize, usize)> {
        let mut n = 0;
        let mut bytes = 0;
        for slot in out.iter_mut() {
            match self.chars.next() {
                Some(c) => {
                    *slot = c;
                    bytes += c.len_utf8();
                    n += 1;
                }
                None => break,
            }
        }
        Ok((n, bytes))
    }
}
