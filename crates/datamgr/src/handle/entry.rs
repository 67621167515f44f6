#![forbid(unsafe_code)]

//! Entry-level handles.
//!
//! Creating any entry handle installs the handle kind's [`Initializer`] on
//! the entry, so the first natural read of the entry is announced on the
//! bus with no previous value:
//!
//! | Handle | Installed initializer |
//! |--------|-----------------------|
//! | [`ReadonlyEntryHandle`], [`MutableEntryHandle`] | [`Initializer::Announce`] |
//! | [`ArrayEntryHandle`] | [`Initializer::EmptyArray`] |
//! | [`RecordEntryHandle`] | [`Initializer::Record`] |
//!
//! The most recently created handle decides which initializer an
//! uninitialized entry will run.

use std::rc::Rc;

use datamgr_bus::{Subscription, Topic, TopicPattern};
use datamgr_core::{Entry, Initializer, Scope, Seed, StoreError, StoreResult, Value};

use crate::runtime::Runtime;

/// Read access to one entry.
#[derive(Clone)]
pub struct ReadonlyEntryHandle {
    runtime: Rc<Runtime>,
    scope: Scope,
    entry: Entry,
}

impl ReadonlyEntryHandle {
    pub(crate) fn new(runtime: Rc<Runtime>, scope: Scope, entry: Entry) -> Self {
        entry.install(Initializer::Announce);
        Self {
            runtime,
            scope,
            entry,
        }
    }

    /// Entry key.
    #[must_use]
    pub fn key(&self) -> &str {
        self.entry.key()
    }

    /// Name of the owning scope.
    #[must_use]
    pub fn scope_name(&self) -> &str {
        self.scope.name()
    }

    /// Topic this entry's notifications are published on.
    #[must_use]
    pub fn topic(&self) -> Topic {
        self.runtime.topic(self.scope.name(), self.entry.key())
    }

    /// Whether the entry is currently public.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.entry.is_public()
    }

    /// Whether the entry holds a value.
    #[must_use]
    pub fn initialized(&self) -> bool {
        self.entry.initialized()
    }

    /// The underlying entry.
    #[must_use]
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Mark the entry public or private.
    pub fn set_public(&self, public: bool) -> &Self {
        self.entry.set_public(public);
        self
    }

    /// The stored value.
    ///
    /// # Errors
    ///
    /// [`StoreError::UninitializedValue`] if the entry is unset and no
    /// subscriber supplied a value when the read was announced.
    pub fn get(&self) -> StoreResult<Value> {
        self.get_with(Seed::None)
    }

    /// The stored value, initialized from `default` if unset.
    ///
    /// # Errors
    ///
    /// See [`get_with`](Self::get_with).
    pub fn get_or(&self, default: impl Into<Value>) -> StoreResult<Value> {
        self.get_with(Seed::Value(default.into()))
    }

    /// The stored value, initialized from `f()` if unset. `f` is not called
    /// when a value is already stored.
    ///
    /// # Errors
    ///
    /// See [`get_with`](Self::get_with).
    pub fn get_or_else<V: Into<Option<Value>>>(&self, f: impl FnOnce() -> V) -> StoreResult<Value> {
        self.get_with(Seed::lazy(f))
    }

    /// The stored value, running the entry's initializer with `seed` if
    /// unset.
    ///
    /// # Errors
    ///
    /// - [`StoreError::UninitializedValue`] if initialization stored nothing.
    /// - [`StoreError::RecordNotFound`] from a record initializer.
    pub fn get_with<'a>(&self, seed: impl Into<Seed<'a>>) -> StoreResult<Value> {
        self.entry.get(seed, &self.runtime.hooks(&self.scope))
    }

    /// Observe every mutation of this entry.
    ///
    /// The callback receives the scope, the entry, and the previous value
    /// (`None` on first initialization). Returning `Some(value)` replaces
    /// the entry's value without a further notification.
    pub fn subscribe(
        &self,
        callback: impl Fn(&Scope, &Entry, Option<&Value>) -> Option<Value> + 'static,
    ) -> Subscription {
        self.runtime
            .subscribe(TopicPattern::exact(self.topic()), callback)
    }

    fn publish(&self, previous: Option<Value>) {
        self.runtime.publish(&self.scope, &self.entry, previous);
    }
}

impl std::fmt::Debug for ReadonlyEntryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadonlyEntryHandle")
            .field("topic", &self.topic().to_string())
            .field("entry", &self.entry)
            .finish()
    }
}

/// Read and write access to one entry.
#[derive(Clone, Debug)]
pub struct MutableEntryHandle {
    inner: ReadonlyEntryHandle,
}

impl MutableEntryHandle {
    pub(crate) fn new(runtime: Rc<Runtime>, scope: Scope, entry: Entry) -> Self {
        Self {
            inner: ReadonlyEntryHandle::new(runtime, scope, entry),
        }
    }

    /// Entry key.
    #[must_use]
    pub fn key(&self) -> &str {
        self.inner.key()
    }

    /// Topic this entry's notifications are published on.
    #[must_use]
    pub fn topic(&self) -> Topic {
        self.inner.topic()
    }

    /// Whether the entry is currently public.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.inner.is_public()
    }

    /// Whether the entry holds a value.
    #[must_use]
    pub fn initialized(&self) -> bool {
        self.inner.initialized()
    }

    /// The underlying entry.
    #[must_use]
    pub fn entry(&self) -> &Entry {
        self.inner.entry()
    }

    /// See [`ReadonlyEntryHandle::get`].
    ///
    /// # Errors
    ///
    /// [`StoreError::UninitializedValue`] if the entry is unset.
    pub fn get(&self) -> StoreResult<Value> {
        self.inner.get()
    }

    /// See [`ReadonlyEntryHandle::get_or`].
    ///
    /// # Errors
    ///
    /// See [`ReadonlyEntryHandle::get_with`].
    pub fn get_or(&self, default: impl Into<Value>) -> StoreResult<Value> {
        self.inner.get_or(default)
    }

    /// See [`ReadonlyEntryHandle::get_or_else`].
    ///
    /// # Errors
    ///
    /// See [`ReadonlyEntryHandle::get_with`].
    pub fn get_or_else<V: Into<Option<Value>>>(&self, f: impl FnOnce() -> V) -> StoreResult<Value> {
        self.inner.get_or_else(f)
    }

    /// See [`ReadonlyEntryHandle::get_with`].
    ///
    /// # Errors
    ///
    /// See [`ReadonlyEntryHandle::get_with`].
    pub fn get_with<'a>(&self, seed: impl Into<Seed<'a>>) -> StoreResult<Value> {
        self.inner.get_with(seed)
    }

    /// Store `value` and publish the mutation.
    ///
    /// Subscribers receive the value stored before this call, or `None` if
    /// the entry was unset.
    pub fn set(&self, value: impl Into<Value>) {
        let previous = self.inner.entry.value();
        self.inner.entry.set(value.into());
        self.inner.publish(previous);
    }

    /// Replace the value with `updater(current)`, initializing the current
    /// value from `seed` if unset. Publishes like [`set`](Self::set).
    ///
    /// # Errors
    ///
    /// Any error from reading the current value; nothing is stored then.
    pub fn update<'a>(
        &self,
        updater: impl FnOnce(Value) -> Value,
        seed: impl Into<Seed<'a>>,
    ) -> StoreResult<()> {
        let current = self.inner.get_with(seed)?;
        self.set(updater(current));
        Ok(())
    }

    /// See [`ReadonlyEntryHandle::set_public`].
    pub fn set_public(&self, public: bool) -> &Self {
        self.inner.set_public(public);
        self
    }

    /// A readonly handle to the same entry.
    #[must_use]
    pub fn readonly(&self) -> ReadonlyEntryHandle {
        let inner = &self.inner;
        ReadonlyEntryHandle::new(
            Rc::clone(&inner.runtime),
            inner.scope.clone(),
            inner.entry.clone(),
        )
    }

    /// See [`ReadonlyEntryHandle::subscribe`].
    pub fn subscribe(
        &self,
        callback: impl Fn(&Scope, &Entry, Option<&Value>) -> Option<Value> + 'static,
    ) -> Subscription {
        self.inner.subscribe(callback)
    }
}

/// Mutable handle for an entry holding an array.
///
/// An unset entry starts as `[]`; that initialization is announced with no
/// previous value before the first merge is published.
#[derive(Clone, Debug)]
pub struct ArrayEntryHandle {
    inner: MutableEntryHandle,
}

impl ArrayEntryHandle {
    pub(crate) fn new(runtime: Rc<Runtime>, scope: Scope, entry: Entry) -> Self {
        let inner = MutableEntryHandle::new(runtime, scope, entry);
        inner.entry().install(Initializer::EmptyArray);
        Self { inner }
    }

    /// Entry key.
    #[must_use]
    pub fn key(&self) -> &str {
        self.inner.key()
    }

    /// The array, initialized to `[]` if unset.
    ///
    /// # Errors
    ///
    /// Never fails for an entry whose initializer is still the array one.
    pub fn get(&self) -> StoreResult<Value> {
        self.inner.get()
    }

    /// Items of the array, initialized to `[]` if unset.
    ///
    /// # Errors
    ///
    /// [`StoreError::ArrayExpected`] if the entry holds something else.
    pub fn items(&self) -> StoreResult<Vec<Value>> {
        match self.inner.get()? {
            Value::Array(items) => Ok(items),
            _ => Err(self.not_an_array()),
        }
    }

    /// Replace the whole array. Publishes like [`MutableEntryHandle::set`].
    pub fn set(&self, items: Vec<Value>) {
        self.inner.set(Value::Array(items));
    }

    /// Append every item of every list, in order, and publish once.
    ///
    /// ```
    /// # use datamgr::Manager;
    /// # use serde_json::json;
    /// let mut dm = Manager::new();
    /// dm.register_scope("page").unwrap();
    /// let header = dm.scope("page").unwrap().mutable().array("header").unwrap();
    /// header.merge([vec![json!("a")], vec![json!("b")]]).unwrap();
    /// header.merge([[json!("c")]]).unwrap();
    /// assert_eq!(header.get().unwrap(), json!(["a", "b", "c"]));
    /// ```
    ///
    /// # Errors
    ///
    /// [`StoreError::ArrayExpected`] if the entry holds something else.
    pub fn merge<L, I>(&self, lists: L) -> StoreResult<()>
    where
        L: IntoIterator<Item = I>,
        I: IntoIterator<Item = Value>,
    {
        let mut items = self.items()?;
        for list in lists {
            items.extend(list);
        }
        self.set(items);
        Ok(())
    }

    /// See [`ReadonlyEntryHandle::subscribe`].
    pub fn subscribe(
        &self,
        callback: impl Fn(&Scope, &Entry, Option<&Value>) -> Option<Value> + 'static,
    ) -> Subscription {
        self.inner.subscribe(callback)
    }

    /// A plain mutable handle to the same entry.
    #[must_use]
    pub fn as_mutable(&self) -> &MutableEntryHandle {
        &self.inner
    }

    fn not_an_array(&self) -> StoreError {
        StoreError::ArrayExpected {
            scope: self.inner.inner.scope_name().to_owned(),
            key: self.key().to_owned(),
        }
    }
}

/// Readonly handle whose entry is loaded from an external record.
#[derive(Clone, Debug)]
pub struct RecordEntryHandle {
    inner: ReadonlyEntryHandle,
    class: String,
    id: Value,
}

impl RecordEntryHandle {
    pub(crate) fn new(
        runtime: Rc<Runtime>,
        scope: Scope,
        entry: Entry,
        class: String,
        id: Value,
    ) -> Self {
        let inner = ReadonlyEntryHandle::new(runtime, scope, entry);
        inner.entry().install(Initializer::Record {
            class: class.clone(),
            id: id.clone(),
        });
        Self { inner, class, id }
    }

    /// Entry key.
    #[must_use]
    pub fn key(&self) -> &str {
        self.inner.key()
    }

    /// Record class the entry is bound to.
    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Record primary key the entry is bound to.
    #[must_use]
    pub fn id(&self) -> &Value {
        &self.id
    }

    /// The record, loaded on first access.
    ///
    /// # Errors
    ///
    /// [`StoreError::RecordNotFound`] if the record source has no match.
    pub fn get(&self) -> StoreResult<Value> {
        self.inner.get()
    }

    /// See [`ReadonlyEntryHandle::subscribe`].
    pub fn subscribe(
        &self,
        callback: impl Fn(&Scope, &Entry, Option<&Value>) -> Option<Value> + 'static,
    ) -> Subscription {
        self.inner.subscribe(callback)
    }

    /// Plain readonly view of the same entry.
    #[must_use]
    pub fn as_readonly(&self) -> &ReadonlyEntryHandle {
        &self.inner
    }
}
