//! Position tracking shared by the parser, the reader facade, and error
//! messages.

/// A position within a CSV stream.
///
/// All counters start at `0` except `row` and `raw_row`, which start at
/// `1` once the first row has begun (the default, before any row has been
/// read, is `0`).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Position {
    /// Number of bytes consumed so far. Only meaningful when
    /// [`crate::config::Configuration::count_bytes`] is enabled; otherwise
    /// stays at `0`.
    pub byte: u64,
    /// Number of characters (not bytes) consumed so far.
    pub char_count: u64,
    /// Logical row number, excluding skipped blank/comment lines.
    pub row: u64,
    /// Physical line number, including lines that occur inside quoted
    /// fields.
    pub raw_row: u64,
}

impl Position {
    /// A position at the very start of a stream.
    pub fn new() -> Position {
        Position { byte: 0, char_count: 0, row: 0, raw_row: 0 }
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "row {} (raw line {}, char {})",
            self.row, self.raw_row, self.char_count
        )
    }
}
