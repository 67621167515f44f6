#![forbid(unsafe_code)]

//! Lazily-initialized value cells.
//!
//! An [`Entry`] starts unset. The first [`Entry::get`] runs the entry's
//! installed [`Initializer`] with the resolved [`Seed`]; once a value is
//! stored, later reads return it without running anything again.
//!
//! # Invariants
//!
//! 1. "Unset" (`None`) is distinct from any stored value, including
//!    `Value::Null` and empty containers.
//! 2. `get()` never re-runs the initializer once a value is stored.
//! 3. No `RefCell` borrow is held while a seed function or an
//!    [`InitHooks`] callback runs, so both may read or write the entry.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | No value after init | Empty seed and no value supplied during the announcement | [`StoreError::UninitializedValue`] |
//! | Missing record | [`Initializer::Record`] lookup returned nothing | [`StoreError::RecordNotFound`] |

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::error::{StoreError, StoreResult};

/// Default offered to an entry's first initialization.
pub enum Seed<'a> {
    /// No default.
    None,
    /// A literal default.
    Value(Value),
    /// A function computing the default; called at most once.
    Lazy(Box<dyn FnOnce() -> Option<Value> + 'a>),
}

impl<'a> Seed<'a> {
    /// Wrap a function producing the default.
    pub fn lazy<V: Into<Option<Value>>>(f: impl FnOnce() -> V + 'a) -> Self {
        Self::Lazy(Box::new(move || f().into()))
    }

    /// Produce the default value, invoking a lazy seed.
    #[must_use]
    pub fn resolve(self) -> Option<Value> {
        match self {
            Self::None => None,
            Self::Value(value) => Some(value),
            Self::Lazy(f) => f(),
        }
    }
}

impl Default for Seed<'_> {
    fn default() -> Self {
        Self::None
    }
}

impl From<Value> for Seed<'_> {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Option<Value>> for Seed<'_> {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Self::None, Self::Value)
    }
}

impl fmt::Debug for Seed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("Seed::None"),
            Self::Value(v) => f.debug_tuple("Seed::Value").field(v).finish(),
            Self::Lazy(_) => f.write_str("Seed::Lazy(..)"),
        }
    }
}

/// What an entry does the first time it is read.
///
/// Handles install the variant matching their kind when they are created;
/// a fresh entry uses [`Initializer::Identity`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Initializer {
    /// Store the seed, if any. No notification.
    #[default]
    Identity,
    /// Store the seed, if any, then announce the first initialization.
    /// The announcement happens even without a seed, so an observer may
    /// supply the value.
    Announce,
    /// Store an empty array (the seed is ignored) and announce it.
    EmptyArray,
    /// Store the external record `class`/`id` and announce it.
    Record {
        /// Record class name.
        class: String,
        /// Record primary key.
        id: Value,
    },
}

/// Callbacks an entry needs from its surroundings while initializing.
pub trait InitHooks {
    /// Publish the first-initialization notification for `entry`.
    fn announce(&self, entry: &Entry);

    /// Look up an external record by class and id.
    fn find_record(&self, class: &str, id: &Value) -> Option<Value>;
}

/// Hooks that announce nothing and find no records.
impl InitHooks for () {
    fn announce(&self, _entry: &Entry) {}

    fn find_record(&self, _class: &str, _id: &Value) -> Option<Value> {
        None
    }
}

struct EntryState {
    value: Option<Value>,
    public: bool,
    initializer: Initializer,
}

/// A named, lazily-initialized, visibility-tagged value cell.
///
/// Cloning an `Entry` yields another handle to the same cell.
#[derive(Clone)]
pub struct Entry {
    key: Rc<str>,
    state: Rc<RefCell<EntryState>>,
}

impl Entry {
    /// Create an unset, private entry with the identity initializer.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: Rc::from(key.into()),
            state: Rc::new(RefCell::new(EntryState {
                value: None,
                public: false,
                initializer: Initializer::Identity,
            })),
        }
    }

    /// Entry key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether a value has been stored.
    #[must_use]
    pub fn initialized(&self) -> bool {
        self.state.borrow().value.is_some()
    }

    /// Current value without running the initializer.
    #[must_use]
    pub fn value(&self) -> Option<Value> {
        self.state.borrow().value.clone()
    }

    /// Access the current value by reference without cloning.
    pub fn with_value<T>(&self, f: impl FnOnce(Option<&Value>) -> T) -> T {
        f(self.state.borrow().value.as_ref())
    }

    /// Overwrite the stored value unconditionally.
    pub fn set(&self, value: Value) -> &Self {
        self.state.borrow_mut().value = Some(value);
        self
    }

    /// Whether the entry is public.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.state.borrow().public
    }

    /// Mark the entry public or private.
    pub fn set_public(&self, public: bool) -> &Self {
        self.state.borrow_mut().public = public;
        self
    }

    /// The installed initializer.
    #[must_use]
    pub fn initializer(&self) -> Initializer {
        self.state.borrow().initializer.clone()
    }

    /// Replace the installed initializer.
    pub fn install(&self, initializer: Initializer) -> &Self {
        self.state.borrow_mut().initializer = initializer;
        self
    }

    /// Run the installed initializer with the resolved seed.
    ///
    /// # Errors
    ///
    /// [`StoreError::RecordNotFound`] when a record initializer finds nothing.
    pub fn init<'a>(&self, seed: impl Into<Seed<'a>>, hooks: &dyn InitHooks) -> StoreResult<()> {
        let default = seed.into().resolve();
        match self.initializer() {
            Initializer::Identity => {
                if let Some(value) = default {
                    self.set(value);
                }
            }
            Initializer::Announce => {
                if let Some(value) = default {
                    self.set(value);
                }
                hooks.announce(self);
            }
            Initializer::EmptyArray => {
                self.set(Value::Array(Vec::new()));
                hooks.announce(self);
            }
            Initializer::Record { class, id } => {
                let record =
                    hooks
                        .find_record(&class, &id)
                        .ok_or_else(|| StoreError::RecordNotFound {
                            class: class.clone(),
                            id: id.to_string(),
                        })?;
                self.set(record);
                hooks.announce(self);
            }
        }
        Ok(())
    }

    /// Return the stored value, initializing it first if unset.
    ///
    /// # Errors
    ///
    /// - [`StoreError::UninitializedValue`] if initialization produced no value.
    /// - Any error from [`init`](Self::init).
    pub fn get<'a>(&self, seed: impl Into<Seed<'a>>, hooks: &dyn InitHooks) -> StoreResult<Value> {
        if let Some(value) = self.value() {
            return Ok(value);
        }
        self.init(seed, hooks)?;
        self.value().ok_or_else(|| StoreError::UninitializedValue {
            key: self.key().to_owned(),
        })
    }

    /// Whether both handles point at the same cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Entry")
            .field("key", &self.key)
            .field("value", &state.value)
            .field("public", &state.public)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Recorder {
        announced: RefCell<Vec<(String, Option<Value>)>>,
        records: HashMap<(String, String), Value>,
    }

    impl InitHooks for Recorder {
        fn announce(&self, entry: &Entry) {
            self.announced
                .borrow_mut()
                .push((entry.key().to_owned(), entry.value()));
        }

        fn find_record(&self, class: &str, id: &Value) -> Option<Value> {
            self.records.get(&(class.to_owned(), id.to_string())).cloned()
        }
    }

    #[test]
    fn new_entry_is_unset_and_private() {
        let entry = Entry::new("k");
        assert_eq!(entry.key(), "k");
        assert!(!entry.initialized());
        assert!(!entry.is_public());
        assert_eq!(entry.initializer(), Initializer::Identity);
    }

    #[test]
    fn get_initializes_once() {
        let entry = Entry::new("k");
        assert_eq!(entry.get(json!(1), &()).unwrap(), json!(1));
        assert_eq!(entry.get(json!(2), &()).unwrap(), json!(1));
    }

    #[test]
    fn lazy_seed_not_called_after_initialization() {
        let entry = Entry::new("k");
        let calls = Cell::new(0);
        let seed = || {
            calls.set(calls.get() + 1);
            json!("computed")
        };
        assert_eq!(entry.get(Seed::lazy(seed), &()).unwrap(), json!("computed"));
        assert_eq!(entry.get(Seed::lazy(seed), &()).unwrap(), json!("computed"));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn empty_seed_is_uninitialized_error() {
        let entry = Entry::new("k");
        let err = entry.get(Seed::None, &()).unwrap_err();
        assert_eq!(err, StoreError::UninitializedValue { key: "k".into() });

        let lazy_nothing = Seed::lazy(|| None::<Value>);
        assert!(entry.get(lazy_nothing, &()).is_err());
        assert!(!entry.initialized());
    }

    #[test]
    fn null_and_empty_values_count_as_set() {
        let entry = Entry::new("k");
        entry.set(Value::Null);
        assert!(entry.initialized());
        assert_eq!(entry.get(json!("ignored"), &()).unwrap(), Value::Null);

        let list = Entry::new("list");
        list.set(json!([]));
        assert_eq!(list.get(Seed::None, &()).unwrap(), json!([]));
    }

    #[test]
    fn identity_does_not_announce() {
        let hooks = Recorder::default();
        Entry::new("k").get(json!(1), &hooks).unwrap();
        assert!(hooks.announced.borrow().is_empty());
    }

    #[test]
    fn announce_stores_then_notifies() {
        let hooks = Recorder::default();
        let entry = Entry::new("k");
        entry.install(Initializer::Announce);
        assert_eq!(entry.get(json!("v"), &hooks).unwrap(), json!("v"));
        assert_eq!(
            *hooks.announced.borrow(),
            vec![("k".to_owned(), Some(json!("v")))]
        );
    }

    #[test]
    fn announce_without_seed_still_notifies() {
        let hooks = Recorder::default();
        let entry = Entry::new("k");
        entry.install(Initializer::Announce);
        assert_eq!(
            entry.get(Seed::None, &hooks).unwrap_err(),
            StoreError::UninitializedValue { key: "k".into() }
        );
        assert_eq!(*hooks.announced.borrow(), vec![("k".to_owned(), None)]);
        assert!(!entry.initialized());
    }

    #[test]
    fn announce_without_seed_accepts_observer_value() {
        struct Supply;
        impl InitHooks for Supply {
            fn announce(&self, entry: &Entry) {
                if !entry.initialized() {
                    entry.set(json!("supplied"));
                }
            }
            fn find_record(&self, _: &str, _: &Value) -> Option<Value> {
                None
            }
        }

        let entry = Entry::new("k");
        entry.install(Initializer::Announce);
        assert_eq!(entry.get(Seed::None, &Supply).unwrap(), json!("supplied"));
        assert_eq!(entry.get(Seed::None, &Supply).unwrap(), json!("supplied"));
    }

    #[test]
    fn empty_array_ignores_seed() {
        let hooks = Recorder::default();
        let entry = Entry::new("list");
        entry.install(Initializer::EmptyArray);
        assert_eq!(entry.get(json!("seed"), &hooks).unwrap(), json!([]));
        assert_eq!(hooks.announced.borrow().len(), 1);
    }

    #[test]
    fn record_initializer_loads_or_fails() {
        let mut hooks = Recorder::default();
        hooks.records.insert(
            ("User".to_owned(), json!(7).to_string()),
            json!({"id": 7, "name": "Ann"}),
        );

        let found = Entry::new("user");
        found.install(Initializer::Record {
            class: "User".into(),
            id: json!(7),
        });
        assert_eq!(found.get(Seed::None, &hooks).unwrap()["name"], "Ann");

        let missing = Entry::new("ghost");
        missing.install(Initializer::Record {
            class: "User".into(),
            id: json!(8),
        });
        assert_eq!(
            missing.get(Seed::None, &hooks).unwrap_err(),
            StoreError::RecordNotFound {
                class: "User".into(),
                id: "8".into(),
            }
        );
        assert!(!missing.initialized());
        assert_eq!(hooks.announced.borrow().len(), 1);
    }

    #[test]
    fn hooks_may_overwrite_during_announce() {
        struct Override;
        impl InitHooks for Override {
            fn announce(&self, entry: &Entry) {
                entry.set(json!("overridden"));
            }
            fn find_record(&self, _: &str, _: &Value) -> Option<Value> {
                None
            }
        }

        let entry = Entry::new("k");
        entry.install(Initializer::Announce);
        assert_eq!(entry.get(json!("v"), &Override).unwrap(), json!("overridden"));
    }

    #[test]
    fn clones_share_state() {
        let a = Entry::new("k");
        let b = a.clone();
        b.set(json!(3)).set_public(true);
        assert!(a.ptr_eq(&b));
        assert_eq!(a.value(), Some(json!(3)));
        assert!(a.is_public());
        assert!(!a.ptr_eq(&Entry::new("k")));
    }

    mod property {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn first_seed_wins(first in any::<i64>(), rest in proptest::collection::vec(any::<i64>(), 0..8)) {
                let entry = Entry::new("k");
                prop_assert_eq!(entry.get(json!(first), &()).unwrap(), json!(first));
                for other in rest {
                    prop_assert_eq!(entry.get(json!(other), &()).unwrap(), json!(first));
                }
            }
        }
    }
}
