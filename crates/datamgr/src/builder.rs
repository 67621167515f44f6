#![forbid(unsafe_code)]

//! Builder choosing a scope handle's view and mutability.

use std::rc::Rc;

use datamgr_core::{Scope, Seed, StoreResult, Value};
use indexmap::IndexMap;

use crate::handle::{MutableScopeHandle, ReadonlyScopeHandle};
use crate::runtime::Runtime;

/// Builds a handle for one scope. Private by default.
///
/// ```
/// # use datamgr::Manager;
/// let mut dm = Manager::new();
/// dm.register_scope("tasks").unwrap();
/// let private = dm.scope("tasks").unwrap().mutable();
/// let public = dm.scope("tasks").unwrap().public().readonly();
/// assert!(!private.is_public());
/// assert!(public.is_public());
/// ```
#[must_use = "a builder does nothing until mutable() or readonly() is called"]
#[derive(Clone, Debug)]
pub struct ScopeHandleBuilder {
    runtime: Rc<Runtime>,
    scope: Scope,
    public: bool,
}

impl ScopeHandleBuilder {
    pub(crate) fn new(runtime: Rc<Runtime>, scope: Scope) -> Self {
        Self {
            runtime,
            scope,
            public: false,
        }
    }

    /// Use the public view.
    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    /// Use the private view.
    pub fn private(mut self) -> Self {
        self.public = false;
        self
    }

    /// Whether the builder currently has the public view.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.public
    }

    /// Finish with a mutable handle.
    pub fn mutable(self) -> MutableScopeHandle {
        MutableScopeHandle::new(self.runtime, self.scope, self.public)
    }

    /// Finish with a readonly handle.
    pub fn readonly(self) -> ReadonlyScopeHandle {
        ReadonlyScopeHandle::new(self.runtime, self.scope, self.public)
    }

    /// Values of every entry in the scope, whatever their visibility.
    ///
    /// # Errors
    ///
    /// Any error from initializing an unset entry.
    pub fn all(&self) -> StoreResult<IndexMap<String, Value>> {
        let hooks = self.runtime.hooks(&self.scope);
        let mut values = IndexMap::new();
        for entry in self.scope.entries() {
            let value = entry.get(Seed::None, &hooks)?;
            values.insert(entry.key().to_owned(), value);
        }
        Ok(values)
    }
}
