//! # csv_engine
//!
//! A streaming, character-oriented CSV parser and serializer with RFC
//! 4180, Escape, and NoEscape dialects, built for large files processed
//! in bounded memory.
//!
//! ## Features
//!
//! - **RFC 4180 compliant**: quoted fields, doubled-quote escaping,
//!   embedded delimiters and newlines.
//! - **Escape and NoEscape dialects**: a single escape character in
//!   place of structural quoting, or no escape mechanism at all.
//! - **Streaming**: a resumable state machine over a growable row-window
//!   buffer, so arbitrarily large files are processed in bounded memory.
//! - **Delimiter auto-detection** over a sampled window of the input.
//! - **A reader facade** with named-field lookup, header capture, and a
//!   column-count consistency invariant, for callers mapping rows onto
//!   typed records.
//! - **A serializer** with the matching encode side, including a
//!   formula-injection sanitizer for spreadsheet-safe output.
//! - **An optional async driver** (`async` feature) reusing the same
//!   parser state machine.
//!
//! ## Usage
//!
//! ```rust
//! use csv_engine::{Configuration, Reader, SliceCharSource};
//!
//! let config = Configuration::builder().build()?;
//! let mut reader = Reader::new(SliceCharSource::new("name,age\nJohn,30\n"), config);
//!
//! while reader.read()? {
//!     let row: Vec<&str> = (0..reader.count())
//!         .map(|i| reader.field(i).unwrap())
//!         .collect();
//!     println!("{:?}", row);
//! }
//! # Ok::<(), csv_engine::Error>(())
//! ```

pub mod buffer;
pub mod config;
pub mod detect;
pub mod error;
pub mod facade;
pub mod field_cache;
pub mod injection;
pub mod parser;
pub mod position;
pub mod serializer;
pub mod source;

pub use config::{Configuration, ConfigurationBuilder, InjectionOptions, Mode, Trim};
pub use error::{Error, Result};
pub use facade::{Facade, StringRecordsIter};
pub use parser::reader::Reader;
pub use position::Position;
pub use serializer::Serializer;
pub use source::{CharSource, SliceCharSource, Utf8CharSource};

#[cfg(feature = "async")]
pub use parser::async_reader::{AsyncCharSource, AsyncReader};
