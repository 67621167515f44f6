#![forbid(unsafe_code)]

//! External record lookup for bound entries.
//!
//! A [`RecordEntryHandle`](crate::RecordEntryHandle) initializes its entry
//! from a record found by class name and primary key. Hosts plug their own
//! data layer in through [`RecordSource`]; [`MemoryRecords`] is a simple
//! in-memory implementation.

use std::collections::HashMap;

use serde_json::Value;

/// Finds records by class and primary key.
pub trait RecordSource {
    /// The record `class` with primary key `id`, or `None` if absent.
    fn find(&self, class: &str, id: &Value) -> Option<Value>;
}

/// A source with no records; every lookup misses.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRecords;

impl RecordSource for NoRecords {
    fn find(&self, _class: &str, _id: &Value) -> Option<Value> {
        None
    }
}

/// In-memory records grouped by class.
///
/// Ids are compared by their JSON rendering, so `7` and `"7"` are
/// different keys.
#[derive(Debug, Default, Clone)]
pub struct MemoryRecords {
    classes: HashMap<String, HashMap<String, Value>>,
}

impl MemoryRecords {
    /// Create an empty record set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record, returning the previous one.
    pub fn insert(
        &mut self,
        class: impl Into<String>,
        id: impl Into<Value>,
        record: Value,
    ) -> Option<Value> {
        self.classes
            .entry(class.into())
            .or_default()
            .insert(id.into().to_string(), record)
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, class: impl Into<String>, id: impl Into<Value>, record: Value) -> Self {
        self.insert(class, id, record);
        self
    }

    /// Total number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.values().map(HashMap::len).sum()
    }

    /// Whether no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordSource for MemoryRecords {
    fn find(&self, class: &str, id: &Value) -> Option<Value> {
        self.classes.get(class)?.get(&id.to_string()).cloned()
    }
}
