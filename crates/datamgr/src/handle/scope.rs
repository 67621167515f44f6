#![forbid(unsafe_code)]

//! Scope-level handles.

use std::rc::Rc;

use datamgr_bus::Subscription;
use datamgr_core::{Entry, Scope, Seed, StoreError, StoreResult, Value};
use indexmap::IndexMap;

use super::entry::{ArrayEntryHandle, MutableEntryHandle, ReadonlyEntryHandle, RecordEntryHandle};
use super::touch;
use crate::runtime::Runtime;

/// State shared by both scope handle kinds.
#[derive(Clone)]
struct ScopeView {
    runtime: Rc<Runtime>,
    scope: Scope,
    public: bool,
}

impl ScopeView {
    fn touch(&self, key: &str) -> StoreResult<Entry> {
        touch(&self.scope, key, self.public)
    }

    fn all(&self) -> StoreResult<IndexMap<String, Value>> {
        let hooks = self.runtime.hooks(&self.scope);
        self.scope
            .entries()
            .into_iter()
            .filter(|entry| entry.is_public() == self.public)
            .map(|entry| -> StoreResult<(String, Value)> {
                let value = entry.get(Seed::None, &hooks)?;
                Ok((entry.key().to_owned(), value))
            })
            .collect()
    }

    fn model(&self, key: &str, class: &str, id: Value) -> StoreResult<RecordEntryHandle> {
        let entry = self.touch(key)?;
        Ok(RecordEntryHandle::new(
            Rc::clone(&self.runtime),
            self.scope.clone(),
            entry,
            class.to_owned(),
            id,
        ))
    }

    fn subscribe(
        &self,
        callback: impl Fn(&Scope, &Entry, Option<&Value>) -> Option<Value> + 'static,
    ) -> Subscription {
        self.runtime
            .subscribe(self.runtime.scope_pattern(self.scope.name()), callback)
    }
}

impl std::fmt::Debug for ScopeView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeView")
            .field("scope", &self.scope.name())
            .field("public", &self.public)
            .finish()
    }
}

/// Read/write view of a scope.
#[derive(Clone, Debug)]
pub struct MutableScopeHandle {
    view: ScopeView,
}

impl MutableScopeHandle {
    pub(crate) fn new(runtime: Rc<Runtime>, scope: Scope, public: bool) -> Self {
        Self {
            view: ScopeView {
                runtime,
                scope,
                public,
            },
        }
    }

    /// Scope name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.view.scope.name()
    }

    /// Whether this handle has the public view.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.view.public
    }

    /// A readonly handle with the same view.
    #[must_use]
    pub fn readonly(&self) -> ReadonlyScopeHandle {
        ReadonlyScopeHandle { view: self.view.clone() }
    }

    /// Mutable handle for `key`, creating the entry if needed.
    ///
    /// # Errors
    ///
    /// [`StoreError::VisibilityViolation`] if this handle is public and the
    /// entry is private.
    pub fn entry(&self, key: &str) -> StoreResult<MutableEntryHandle> {
        let entry = self.view.touch(key)?;
        Ok(MutableEntryHandle::new(
            Rc::clone(&self.view.runtime),
            self.view.scope.clone(),
            entry,
        ))
    }

    /// Array handle for `key`, creating the entry if needed.
    ///
    /// # Errors
    ///
    /// [`StoreError::VisibilityViolation`] as for [`entry`](Self::entry).
    pub fn array(&self, key: &str) -> StoreResult<ArrayEntryHandle> {
        let entry = self.view.touch(key)?;
        Ok(ArrayEntryHandle::new(
            Rc::clone(&self.view.runtime),
            self.view.scope.clone(),
            entry,
        ))
    }

    /// Handle for `key` bound to the record `class`/`id`.
    ///
    /// # Errors
    ///
    /// [`StoreError::VisibilityViolation`] as for [`entry`](Self::entry).
    /// A missing record is reported by the handle's first read.
    pub fn model(
        &self,
        key: &str,
        class: &str,
        id: impl Into<Value>,
    ) -> StoreResult<RecordEntryHandle> {
        self.view.model(key, class, id.into())
    }

    /// Store `value` under `key` and publish the mutation.
    ///
    /// # Errors
    ///
    /// [`StoreError::VisibilityViolation`] as for [`entry`](Self::entry).
    pub fn set(&self, key: &str, value: impl Into<Value>) -> StoreResult<()> {
        self.entry(key)?.set(value);
        Ok(())
    }

    /// Remove `key`. Returns whether an entry was removed.
    pub fn remove(&self, key: &str) -> bool {
        self.view.scope.remove_entry(key).is_some()
    }

    /// Whether `key` exists.
    #[must_use]
    pub fn exists(&self, key: &str) -> bool {
        self.view.scope.entry_exists(key)
    }

    /// Values of every entry whose visibility equals this handle's view.
    ///
    /// # Errors
    ///
    /// Any error from initializing an unset entry.
    pub fn all(&self) -> StoreResult<IndexMap<String, Value>> {
        self.view.all()
    }

    /// Observe every mutation in this scope (`<root>.<scope>.*`).
    pub fn subscribe(
        &self,
        callback: impl Fn(&Scope, &Entry, Option<&Value>) -> Option<Value> + 'static,
    ) -> Subscription {
        self.view.subscribe(callback)
    }
}

/// Read-mostly view of a scope: new keys may be added, existing ones are
/// never overwritten or removed.
#[derive(Clone, Debug)]
pub struct ReadonlyScopeHandle {
    view: ScopeView,
}

impl ReadonlyScopeHandle {
    pub(crate) fn new(runtime: Rc<Runtime>, scope: Scope, public: bool) -> Self {
        Self {
            view: ScopeView {
                runtime,
                scope,
                public,
            },
        }
    }

    /// Scope name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.view.scope.name()
    }

    /// Whether this handle has the public view.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.view.public
    }

    /// Readonly handle for `key`, creating the entry if needed.
    ///
    /// # Errors
    ///
    /// [`StoreError::VisibilityViolation`] if this handle is public and the
    /// entry is private.
    pub fn entry(&self, key: &str) -> StoreResult<ReadonlyEntryHandle> {
        let entry = self.view.touch(key)?;
        Ok(ReadonlyEntryHandle::new(
            Rc::clone(&self.view.runtime),
            self.view.scope.clone(),
            entry,
        ))
    }

    /// Value of `key`.
    ///
    /// # Errors
    ///
    /// [`StoreError::VisibilityViolation`] as for [`entry`](Self::entry), or
    /// [`StoreError::UninitializedValue`] if the entry holds nothing.
    pub fn value(&self, key: &str) -> StoreResult<Value> {
        self.entry(key)?.get()
    }

    /// Handle for `key` bound to the record `class`/`id`.
    ///
    /// # Errors
    ///
    /// [`StoreError::VisibilityViolation`] as for [`entry`](Self::entry).
    pub fn model(
        &self,
        key: &str,
        class: &str,
        id: impl Into<Value>,
    ) -> StoreResult<RecordEntryHandle> {
        self.view.model(key, class, id.into())
    }

    /// Add a brand-new `key` holding `value`. The entry takes this handle's
    /// visibility and the addition is announced as a first initialization.
    ///
    /// # Errors
    ///
    /// [`StoreError::ReadonlyViolation`] if `key` already exists.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> StoreResult<()> {
        let scope = &self.view.scope;
        if scope.entry_exists(key) {
            return Err(StoreError::ReadonlyViolation {
                scope: scope.name().to_owned(),
                key: key.to_owned(),
                operation: "overwrite",
            });
        }
        let entry = self.view.touch(key)?;
        entry.set(value.into());
        self.view.runtime.publish(scope, &entry, None);
        Ok(())
    }

    /// Always fails: readonly scopes never lose entries.
    ///
    /// # Errors
    ///
    /// [`StoreError::ReadonlyViolation`], unconditionally.
    pub fn remove(&self, key: &str) -> StoreResult<()> {
        Err(StoreError::ReadonlyViolation {
            scope: self.view.scope.name().to_owned(),
            key: key.to_owned(),
            operation: "remove",
        })
    }

    /// Whether `key` exists.
    #[must_use]
    pub fn exists(&self, key: &str) -> bool {
        self.view.scope.entry_exists(key)
    }

    /// Values of every entry whose visibility equals this handle's view.
    ///
    /// # Errors
    ///
    /// Any error from initializing an unset entry.
    pub fn all(&self) -> StoreResult<IndexMap<String, Value>> {
        self.view.all()
    }

    /// Observe every mutation in this scope (`<root>.<scope>.*`).
    pub fn subscribe(
        &self,
        callback: impl Fn(&Scope, &Entry, Option<&Value>) -> Option<Value> + 'static,
    ) -> Subscription {
        self.view.subscribe(callback)
    }
}
