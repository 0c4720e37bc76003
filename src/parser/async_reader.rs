//! The async driver for the Parser State Machine (spec.md §9: "async as a
//! parallel code path... a single state machine and two thin drivers").
//!
//! Mirrors [`crate::parser::reader::Reader`] field for field; the only
//! difference is that [`AsyncReader::read`] awaits its source instead of
//! blocking on it. Grounded on `csv-async`'s `AsyncReader`
//! (`examples/other_examples/3055d43c_mcronce-csv-async__src-lib.rs.rs`)
//! for the shape of an async counterpart to a sync CSV reader; kept
//! `futures-core`-only (no `async-trait`) by using a GAT-based associated
//! future on [`AsyncCharSource`], the same technique `csv-async` itself
//! avoids needing only because it is built directly on `tokio`/`async-std`
//! readers rather than a custom source trait.

use crate::config::Configuration;
use crate::error::Result;
use crate::parser::core::{Advance, Core};
use crate::position::Position;
use futures_core::future::Future;
use std::io;

/// An async counterpart to [`crate::source::CharSource`]: fills as much of
/// `out` as possible with the next characters from the source, returning
/// the number of characters written and the number of underlying bytes
/// consumed to produce them. Returns `(0, 0)` at end of input.
pub trait AsyncCharSource {
    /// The future returned by [`AsyncCharSource::read_chars`].
    type ReadFuture<'a>: Future<Output = io::Result<(usize, usize)>> + 'a
    where
        Self: 'a;

    /// Fills `out` from the source.
    fn read_chars<'a>(&'a mut self, out: &'a mut [char]) -> Self::ReadFuture<'a>;
}

/// The streaming CSV parser driven by an [`AsyncCharSource`]. Shares the
/// exact state machine [`crate::parser::reader::Reader`] uses, via
/// [`Core`].
pub struct AsyncReader<S> {
    core: Core,
    source: S,
}

impl<S: AsyncCharSource> AsyncReader<S> {
    /// Builds a reader over `source` with the given configuration.
    pub fn new(source: S, config: Configuration) -> Self {
        AsyncReader { core: Core::new(config), source }
    }

    /// The dialect/behavior configuration in effect.
    pub fn configuration(&self) -> &Configuration {
        self.core.configuration()
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
    pub async fn read(&mut self) -> Result<bool> {
        if !self.core.detection_done {
            self.run_delimiter_detection().await?;
        }
        loop {
            match self.core.try_advance()? {
                Advance::RowReady => return Ok(true),
                Advance::Eof => return Ok(false),
                Advance::NeedMore => {
                    let n = self.refill().await?;
                    if n == 0 {
                        return self.core.finalize_eof();
                    }
                }
            }
        }
    }

    /// Decodes and returns field `i` of the current row.
    pub fn field(&mut self, i: usize) -> Result<&str> {
        self.core.field(i)
    }

    async fn refill(&mut self) -> Result<usize> {
        let spare = self.core.buffer_mut().prepare_spare_capacity();
        let (n, bytes) = self.source.read_chars(spare).await?;
        self.core.buffer_mut().commit_fill(n);
        self.core.record_bytes(bytes as u64);
        Ok(n)
    }

    async fn run_delimiter_detection(&mut self) -> Result<()> {
        self.core.detection_done = true;
        if !self.configuration().detect_delimiter() {
            return Ok(());
        }
        if self.core.buffer_mut().is_exhausted() {
            self.refill().await?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use futures_core::future::Future as _;
    use std::task::{Context, Poll};

    /// An in-memory [`AsyncCharSource`] that always completes immediately,
    /// enough to exercise [`AsyncReader`] without a real async runtime.
    struct ImmediateCharSource<'a> {
        chars: std::str::Chars<'a>,
    }

    impl<'a> ImmediateCharSource<'a> {
        fn new(s: &'a str) -> Self {
            ImmediateCharSource { chars: s.chars() }
        }
    }

    struct ReadCharsFuture<'a, 'b> {
        chars: &'a mut std::str::Chars<'b>,
        out: &'a mut [char],
    }

    impl<'a, 'b> Future for ReadCharsFuture<'a, 'b> {
        type Output = io::Result<(usize, usize)>;
        fn poll(self: std::pin::Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
            let this = self.get_mut();
            let mut n = 0;
            let mut bytes = 0;
            for slot in this.out.iter_mut() {
                match this.chars.next() {
                    Some(c) => {
                        *slot = c;
                        bytes += c.len_utf8();
                        n += 1;
                    }
                    None => break,
                }
            }
            Poll::Ready(Ok((n, bytes)))
        }
    }

    impl<'b> AsyncCharSource for ImmediateCharSource<'b> {
        type ReadFuture<'a>
            = ReadCharsFuture<'a, 'b>
        where
            Self: 'a;

        fn read_chars<'a>(&'a mut self, out: &'a mut [char]) -> Self::ReadFuture<'a> {
            ReadCharsFuture { chars: &mut self.chars, out }
        }
    }

    fn block_on<F: Future>(mut fut: F) -> F::Output {
        use std::task::{RawWaker, RawWakerVTable, Waker};
        fn noop(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            RawWaker::new(std::ptr::null(), &VTABLE)
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
        let waker = unsafe { Waker::from_raw(RawWaker::new(std::ptr::null(), &VTABLE)) };
        let mut cx = Context::from_waker(&waker);
        let mut fut = unsafe { std::pin::Pin::new_unchecked(&mut fut) };
        loop {
            if let Poll::Ready(v) = fut.as_mut().poll(&mut cx) {
                return v;
            }
        }
    }

    #[test]
    fn reads_rows_through_an_async_source() {
        let config = Configuration::builder().build().unwrap();
        let mut r = AsyncReader::new(ImmediateCharSource::new("a,b\n1,2\n"), config);

        assert!(block_on(r.read()).unwrap());
        assert_eq!(r.field(0).unwrap(), "a");
        assert_eq!(r.field(1).unwrap(), "b");
        assert!(block_on(r.read()).unwrap());
        assert_eq!(r.field(0).unwrap(), "1");
        assert_eq!(r.field(1).unwrap(), "2");
        assert!(!block_on(r.read()).unwrap());
    }
}
