//! The Parser State Machine and its supporting modules (spec.md §4.1–§4.2).

pub(crate) mod core;
pub mod decode;
pub mod reader;
pub mod state;

#[cfg(feature = "async")]
pub mod async_reader;

pub use reader::Reader;
