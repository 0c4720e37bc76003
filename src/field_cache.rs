//! Interns decoded field strings to cut allocations on inputs with many
//! repeated values (enum-like columns, repeated keys).
//!
//! Spec.md §3 describes this as a component in its own right with no direct
//! direct analogue upstream (which allocates a fresh `String` per field);
//! built fresh in the same idiom — a small, single-purpose struct
//! wrapping a `HashMap`, no external interning crate.

use std::collections::HashMap;
use std::rc::Rc;

/// Interns `&str` content into shared `Rc<str>` handles, keyed by content.
///
/// Only consulted when [`crate::config::Configuration::cache_fields`] is
/// enabled; callers hold a cheaply-clonable `Rc<str>` instead of a fresh
/// heap allocation for values that repeat across rows.
#[derive(Default)]
pub struct FieldCache {
    entries: HashMap<Rc<str>, ()>,
}

impl FieldCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        FieldCache { entries: HashMap::new() }
    }

    /// Returns the interned handle for `value`, inserting it if this is the
    /// first time this exact content has been seen.
    pub fn intern(&mut self, value: &str) -> Rc<str> {
        if let Some((key, _)) = self.entries.get_key_value(value) {
            return Rc::clone(key);
        }
        let key: Rc<str> = Rc::from(value);
        self.entries.insert(Rc::clone(&key), ());
        key
    }

    /// Number of distinct interned values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache currently holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops all interned values. Called when the owner wants to bound
    /// memory growth on very wide enum-like columns across a huge file;
    /// not invoked automatically.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_same_content_returns_equal_pointers() {
        let mut cache = FieldCache::new();
        let a = cache.intern("hello");
        let b = cache.intern("hello");
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn interning_distinct_content_grows_cache() {
        let mut cache = FieldCache::new();
        cache.intern("a");
        cache.intern("b");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn clear_empties_the_cache() {
        let mut cache = FieldCache::new();
        cache.intern("a");
        cache.clear();
        assert!(cache.is_empty());
    }
}
