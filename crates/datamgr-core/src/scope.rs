#![forbid(unsafe_code)]

//! Named, insertion-ordered collections of entries.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::entry::Entry;

/// A named namespace of entries.
///
/// Entries are created on first reference and kept in insertion order.
/// Cloning a `Scope` yields another handle to the same namespace.
#[derive(Clone)]
pub struct Scope {
    name: Rc<str>,
    entries: Rc<RefCell<IndexMap<String, Entry>>>,
}

impl Scope {
    /// Create an empty scope.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Rc::from(name.into()),
            entries: Rc::new(RefCell::new(IndexMap::new())),
        }
    }

    /// Scope name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The entry for `key`, created if absent.
    pub fn entry(&self, key: &str) -> Entry {
        self.entries
            .borrow_mut()
            .entry(key.to_owned())
            .or_insert_with(|| Entry::new(key))
            .clone()
    }

    /// The entry for `key`, if it exists.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<Entry> {
        self.entries.borrow().get(key).cloned()
    }

    /// Whether an entry for `key` exists.
    #[must_use]
    pub fn entry_exists(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }

    /// Snapshot of all entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<Entry> {
        self.entries.borrow().values().cloned().collect()
    }

    /// Remove the entry for `key`. Absent keys are ignored.
    pub fn remove_entry(&self, key: &str) -> Option<Entry> {
        self.entries.borrow_mut().shift_remove(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether the scope has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Whether both handles point at the same scope.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.entries, &other.entries)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("name", &self.name)
            .field("entries", &self.len())
            .finish()
    }
}
