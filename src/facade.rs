//! Reader Facade (spec.md §4.4): the row cursor, header/name-index
//! bookkeeping, and column-count invariant layered on top of the raw
//! [`crate::parser::reader::Reader`] state machine.
//!
//! Grounded on the `CsvChunkParser` consumer loop
//! (`examples/johnlogsdon-rust-csv-parser/src/lib.rs`) for the read-then-
//! validate shape, and on BurntSushi `csv::StringRecordsIter`
//! (`examples/other_examples/*BurntSushi-rust-csv*`) for the `records`
//! iterator's `Result<Vec<String>, Error>` item type.

use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::parser::reader::Reader;
use crate::position::Position;
use crate::source::CharSource;
use std::collections::HashMap;

/// Wraps a [`Reader`] with row-cursor semantics: named field lookup,
/// header capture, and the column-count consistency invariant.
pub struct Facade<S: CharSource> {
    reader: Reader<S>,
    current_index: isize,
    header: Option<Vec<String>>,
    name_index: HashMap<String, Vec<usize>>,
    lookup_cache: HashMap<(String, usize), usize>,
    first_column_count: Option<usize>,
    header_auto_pending: bool,
}

impl<S: CharSource> Facade<S> {
    /// Builds a facade over `source` under `config`. If
    /// `config.has_header_record()` is set, the first call to
    /// [`Facade::read`] transparently consumes the first row as the
    /// header instead of returning it as data.
    pub fn new(source: S, config: Configuration) -> Self {
        let header_auto_pending = config.has_header_record();
        Facade {
            reader: Reader::new(source, config),
            current_index: -1,
            header: None,
            name_index: HashMap::new(),
            lookup_cache: HashMap::new(),
            first_column_count: None,
            header_auto_pending,
        }
    }

    /// The configuration in effect.
    pub fn configuration(&self) -> &Configuration {
        self.reader.configuration()
    }

    /// Current stream position.
    pub fn position(&self) -> Position {
        self.reader.position()
    }

    /// Number of fields in the current row.
    pub fn count(&self) -> usize {
        self.reader.count()
    }

    /// The most recently captured header row, if any.
    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    /// Advances the cursor to the next row, applying
    /// `should_skip_record` and the column-count invariant. Returns
    /// `false` at end of input.
    ///
    /// If the configuration has `has_header_record` set and no header has
    /// been captured yet (via this or an explicit [`Facade::read_header`]
    /// call), the first row is consumed as the header before this method
    /// returns the first data row.
    pub fn read(&mut self) -> Result<bool> {
        if self.header_auto_pending {
            self.header_auto_pending = false;
            if !self.read_header()? {
                return Ok(false);
            }
        }
        loop {
            if !self.reader.read()? {
                return Ok(false);
            }
            self.current_index = -1;

            if self.reader.configuration_mut().callbacks_mut().should_skip_record.is_some() {
                let fields = self.collect_fields()?;
                let skip = self
                    .reader
                    .configuration_mut()
                    .callbacks_mut()
                    .should_skip_record
                    .as_mut()
                    .expect("checked above")(&fields);
                if skip {
                    continue;
                }
            }

            if self.reader.configuration().detect_column_count_changes() {
                let count = self.reader.count();
                match self.first_column_count {
                    None => self.first_column_count = Some(count),
                    Some(expected) if expected != count => {
                        let err = Error::ColumnCountMismatch {
                            expected,
                            actual: count,
                            position: self.reader.position(),
                        };
                        let recover = match self
                            .reader
                            .configuration_mut()
                            .callbacks_mut()
                            .reading_exception_occurred
                            .as_mut()
                        {
                            Some(cb) => !cb(&err),
                            None => false,
                        };
                        if !recover {
                            return Err(err);
                        }
                        continue;
                    }
                    Some(_) => {}
                }
            }

            return Ok(true);
        }
    }

    fn collect_fields(&mut self) -> Result<Vec<String>> {
        let mut fields = Vec::with_capacity(self.reader.count());
        for i in 0..self.reader.count() {
            fields.push(self.reader.field(i)?.to_string());
        }
        Ok(fields)
    }

    /// Reads a row and captures it as the header, building the
    /// name-to-indices map via `prepare_header_for_match`.
    pub fn read_header(&mut self) -> Result<bool> {
        self.header_auto_pending = false;
        if !self.read()? {
            return Ok(false);
        }
        let names = self.collect_fields()?;
        self.build_name_index(names);
        Ok(true)
    }

    fn build_name_index(&mut self, names: Vec<String>) {
        self.name_index.clear();
        self.lookup_cache.clear();
        let mut prepared = Vec::with_capacity(names.len());
        for (i, name) in names.into_iter().enumerate() {
            let name = match self
                .reader
                .configuration_mut()
                .callbacks_mut()
                .prepare_header_for_match
                .as_mut()
            {
                Some(cb) => cb(&name, i),
                None => name,
            };
            self.name_index.entry(name.clone()).or_default().push(i);
            prepared.push(name);
        }
        self.header = Some(prepared);
    }

    /// Validates `schema` against the captured header, returning the
    /// names present in `schema` but absent from the header.
    pub fn validate_header(&mut self, schema: &[String]) -> Result<Vec<String>> {
        let missing: Vec<String> =
            schema.iter().filter(|name| !self.name_index.contains_key(*name)).cloned().collect();
        if let Some(cb) =
            self.reader.configuration_mut().callbacks_mut().header_validated.as_mut()
        {
            cb(&missing, self.reader.position());
        }
        Ok(missing)
    }

    /// Returns field `i` of the current row, invoking `missing_field_found`
    /// and returning its error when `i` is out of range.
    pub fn field(&mut self, i: usize) -> Result<&str> {
        if i >= self.reader.count() {
            return Err(self.missing_field_error(format!("index {i}"), Some(i)));
        }
        self.current_index = i as isize;
        self.reader.field(i)
    }

    /// Like [`Facade::field`], but returns `None` instead of an error on a
    /// miss (spec.md §6's non-throwing accessor).
    pub fn try_field(&mut self, i: usize) -> Option<&str> {
        if i >= self.reader.count() {
            return None;
        }
        self.reader.field(i).ok()
    }

    /// Returns the `nth` (0-indexed among duplicates) field named `name`.
    pub fn field_by_name(&mut self, name: &str, nth: usize) -> Result<&str> {
        match self.resolve_name(name, nth) {
            Some(i) => self.field(i),
            None => Err(self.missing_field_error(format!("name {name:?} (nth {nth})"), None)),
        }
    }

    /// Like [`Facade::field_by_name`], but returns `None` instead of an
    /// error on a miss.
    pub fn try_field_by_name(&mut self, name: &str, nth: usize) -> Option<&str> {
        let i = self.resolve_name(name, nth)?;
        self.try_field(i)
    }

    fn resolve_name(&mut self, name: &str, nth: usize) -> Option<usize> {
        let key = (name.to_string(), nth);
        if let Some(&i) = self.lookup_cache.get(&key) {
            return Some(i);
        }
        let i = *self.name_index.get(name)?.get(nth)?;
        self.lookup_cache.insert(key, i);
        Some(i)
    }

    fn missing_field_error(&mut self, detail: String, index: Option<usize>) -> Error {
        let position = self.reader.position();
        if let Some(cb) =
            self.reader.configuration_mut().callbacks_mut().missing_field_found.as_mut()
        {
            let fields: Vec<String> = Vec::new();
            cb(&fields, index, position);
        }
        Error::MissingField { detail, position }
    }

    /// The property name for column `index`: the `get_dynamic_property_name`
    /// callback if installed, else the captured header name, else the
    /// index itself as a string.
    pub fn property_name(&mut self, index: usize) -> String {
        let position = self.reader.position();
        if let Some(cb) = self
            .reader
            .configuration_mut()
            .callbacks_mut()
            .get_dynamic_property_name
            .as_mut()
        {
            return cb(index, position);
        }
        if let Some(header) = &self.header {
            if let Some(name) = header.get(index) {
                return name.clone();
            }
        }
        index.to_string()
    }

    /// Returns field `i` run through `convert`, propagating its error.
    pub fn field_with<T>(
        &mut self,
        i: usize,
        convert: impl FnOnce(&str) -> Result<T>,
    ) -> Result<T> {
        convert(self.field(i)?)
    }

    /// Index of the most recently accessed field via [`Facade::field`]
    /// (`-1` if none has been accessed on the current row).
    pub fn current_index(&self) -> isize {
        self.current_index
    }

    /// A lazy, single-pass iterator over remaining rows, each validated
    /// against `schema`'s column count.
    pub fn records<'a>(&'a mut self, schema: &'a [String]) -> StringRecordsIter<'a, S> {
        StringRecordsIter { facade: self, schema, done: false }
    }
}

/// Iterator returned by [`Facade::records`]. Single-pass: once exhausted
/// (or once the underlying cursor is advanced by it), it cannot be
/// restarted; build a new [`Facade`] cursor instead.
pub struct StringRecordsIter<'a, S: CharSource> {
    facade: &'a mut Facade<S>,
    schema: &'a [String],
    done: bool,
}

impl<'a, S: CharSource> Iterator for StringRecordsIter<'a, S> {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.facade.read() {
            Ok(false) => {
                self.done = true;
                None
            }
            Ok(true) => {
                if self.facade.count() != self.schema.len() {
                    self.done = true;
                    return Some(Err(Error::ColumnCountMismatch {
                        expected: self.schema.len(),
                        actual: self.facade.count(),
                        position: self.facade.position(),
                    }));
                }
                Some(self.facade.collect_fields())
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::source::SliceCharSource;

    fn facade(input: &'static str, config: Configuration) -> Facade<SliceCharSource<'static>> {
        Facade::new(SliceCharSource::new(input), config)
    }

    #[test]
    fn reads_rows_and_resets_cursor_index() {
        let config = Configuration::builder().build().unwrap();
        let mut f = facade("a,b\n1,2\n", config);
        assert!(f.read().unwrap());
        assert_eq!(f.current_index(), -1);
        assert_eq!(f.field(0).unwrap(), "a");
        assert_eq!(f.current_index(), 0);
        assert!(f.read().unwrap());
        assert_eq!(f.current_index(), -1);
        assert_eq!(f.field(1).unwrap(), "2");
    }

    #[test]
    fn header_builds_name_index_and_supports_lookup() {
        let config = Configuration::builder().build().unwrap();
        let mut f = facade("name,age\nalice,30\n", config);
        assert!(f.read_header().unwrap());
        assert!(f.read().unwrap());
        assert_eq!(f.field_by_name("name", 0).unwrap(), "alice");
        assert_eq!(f.field_by_name("age", 0).unwrap(), "30");
        assert!(f.try_field_by_name("missing", 0).is_none());
    }

    #[test]
    fn has_header_record_auto_consumes_the_first_row() {
        let config = Configuration::builder().has_header_record(true).build().unwrap();
        let mut f = facade("name,age\nalice,30\nbob,40\n", config);
        assert!(f.read().unwrap());
        assert_eq!(f.field(0).unwrap(), "alice");
        assert_eq!(f.field_by_name("name", 0).unwrap(), "alice");
        assert!(f.read().unwrap());
        assert_eq!(f.field_by_name("age", 0).unwrap(), "40");
        assert!(!f.read().unwrap());
    }

    #[test]
    fn field_out_of_range_is_a_missing_field_error() {
        let config = Configuration::builder().build().unwrap();
        let mut f = facade("a,b\n", config);
        assert!(f.read().unwrap());
        let err = f.field(5).unwrap_err();
        assert!(matches!(err, Error::MissingField { .. }));
        assert!(f.try_field(5).is_none());
    }

    #[test]
    fn column_count_mismatch_is_rejected_by_default() {
        let config = Configuration::builder().detect_column_count_changes(true).build().unwrap();
        let mut f = facade("a,b\nc,d,e\n", config);
        assert!(f.read().unwrap());
        let err = f.read().unwrap_err();
        assert!(matches!(err, Error::ColumnCountMismatch { .. }));
    }

    #[test]
    fn should_skip_record_callback_filters_rows() {
        let config = Configuration::builder()
            .should_skip_record(|fields| fields.first().map(|s| s.as_str()) == Some("skip"))
            .build()
            .unwrap();
        let mut f = facade("skip,1\nkeep,2\n", config);
        assert!(f.read().unwrap());
        assert_eq!(f.field(0).unwrap(), "keep");
        assert!(!f.read().unwrap());
    }

    #[test]
    fn records_iterator_yields_rows_matching_schema() {
        let config = Configuration::builder().build().unwrap();
        let mut f = facade("a,b\nc,d\n", config);
        let schema = vec!["x".to_string(), "y".to_string()];
        let rows: Vec<Vec<String>> =
            f.records(&schema).collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(rows, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn records_iterator_errors_on_column_count_mismatch() {
        let config = Configuration::builder().build().unwrap();
        let mut f = facade("a,b,c\n", config);
        let schema = vec!["x".to_string(), "y".to_string()];
        let mut it = f.records(&schema);
        let err = it.next().unwrap().unwrap_err();
        assert!(matches!(err, Error::ColumnCountMismatch { .. }));
        assert!(it.next().is_none());
    }

    #[test]
    fn property_name_falls_back_through_header_then_index() {
        let config = Configuration::builder().build().unwrap();
        let mut f = facade("name\nalice\n", config);
        assert!(f.read_header().unwrap());
        assert_eq!(f.property_name(0), "name");
        assert_eq!(f.property_name(5), "5");
    }
}
