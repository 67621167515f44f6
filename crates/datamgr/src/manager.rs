#![forbid(unsafe_code)]

//! The scope registry and entry point for handles.
//!
//! # Invariants
//!
//! 1. Every registered scope's name equals its registry key.
//! 2. The global scope is registered at construction and cannot be
//!    registered again.
//! 3. Scope lookup never creates a scope; only
//!    [`register_scope`](Manager::register_scope) does.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Duplicate name | `register_scope` twice | [`StoreError::DuplicateScope`] |
//! | Unknown name | `scope`/`lookup` before registration | [`StoreError::UnknownScope`] |
//! | Unset public entry | touched but never given a value | `all_public_values` fails with [`StoreError::UninitializedValue`] |

use std::fmt;
use std::rc::Rc;

use datamgr_bus::{Subscription, TopicPattern};
use datamgr_core::{Entry, Scope, Seed, StoreError, StoreResult, Value};
use indexmap::IndexMap;
use tracing::debug;

use crate::builder::ScopeHandleBuilder;
use crate::handle::ReadonlyScopeHandle;
use crate::records::{NoRecords, RecordSource};
use crate::runtime::Runtime;
use crate::{DEFAULT_GLOBAL_SCOPE, DEFAULT_ROOT};

/// Registry of named scopes sharing one notification bus.
pub struct Manager {
    runtime: Rc<Runtime>,
    scopes: IndexMap<String, Scope>,
    global: Scope,
}

impl Manager {
    /// Manager with the default root, default global scope, and no record
    /// source.
    #[must_use]
    pub fn new() -> Self {
        Self::with_records(NoRecords)
    }

    /// Manager whose bound entries look records up in `records`.
    #[must_use]
    pub fn with_records(records: impl RecordSource + 'static) -> Self {
        Self::from_parts(DEFAULT_ROOT, DEFAULT_GLOBAL_SCOPE, Rc::new(records))
    }

    pub(crate) fn from_parts(root: &str, global: &str, records: Rc<dyn RecordSource>) -> Self {
        let global = Scope::new(global);
        let mut scopes = IndexMap::new();
        scopes.insert(global.name().to_owned(), global.clone());
        debug!(root, global = global.name(), "manager created");
        Self {
            runtime: Rc::new(Runtime::new(root, records)),
            scopes,
            global,
        }
    }

    /// Topic root of every notification.
    #[must_use]
    pub fn root(&self) -> &str {
        self.runtime.root()
    }

    /// Register an empty scope.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateScope`] if `name` is taken.
    pub fn register_scope(&mut self, name: impl Into<String>) -> StoreResult<()> {
        let name = name.into();
        if self.scopes.contains_key(&name) {
            return Err(StoreError::DuplicateScope(name));
        }
        debug!(scope = %name, "scope registered");
        self.scopes.insert(name.clone(), Scope::new(name));
        Ok(())
    }

    /// Builder for a handle to `name`, defaulting to the private view.
    ///
    /// # Errors
    ///
    /// [`StoreError::UnknownScope`] if `name` was never registered.
    pub fn scope(&self, name: &str) -> StoreResult<ScopeHandleBuilder> {
        let scope = self.find(name)?;
        Ok(ScopeHandleBuilder::new(Rc::clone(&self.runtime), scope))
    }

    /// Builder for the global scope.
    pub fn global(&self) -> ScopeHandleBuilder {
        ScopeHandleBuilder::new(Rc::clone(&self.runtime), self.global.clone())
    }

    /// Name of the global scope.
    #[must_use]
    pub fn global_name(&self) -> &str {
        self.global.name()
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn has_scope(&self, name: &str) -> bool {
        self.scopes.contains_key(name)
    }

    /// Private readonly handle for `name`.
    ///
    /// # Errors
    ///
    /// [`StoreError::UnknownScope`] if `name` was never registered.
    pub fn lookup(&self, name: &str) -> StoreResult<ReadonlyScopeHandle> {
        let scope = self.find(name)?;
        Ok(ReadonlyScopeHandle::new(Rc::clone(&self.runtime), scope, false))
    }

    /// Registered scope names in registration order.
    pub fn scope_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.scopes.keys().map(String::as_str)
    }

    /// Observe every mutation of every entry (`<root>.*`) until the returned
    /// guard is dropped; call [`Subscription::detach`] to keep the
    /// subscriber for the manager's lifetime.
    ///
    /// The callback receives the scope, the entry, and the previous value
    /// (`None` on first initialization). Returning `Some(value)` stores it
    /// in the entry without a further notification.
    ///
    /// The scope and entry are the ones captured when the mutation was
    /// published, not looked up again by topic path. If an earlier
    /// subscriber removes the entry during the same dispatch, later
    /// subscribers still receive the removed entry.
    ///
    /// # Examples
    ///
    /// ```
    /// # use datamgr::Manager;
    /// # use serde_json::json;
    /// let mut dm = Manager::new();
    /// dm.register_scope("stats").unwrap();
    /// dm.subscribe(|_scope, _entry, previous| previous.is_none().then(|| json!(0)))
    ///     .detach();
    /// let hits = dm.scope("stats").unwrap().mutable().entry("hits").unwrap();
    /// hits.set(json!(5));
    /// assert_eq!(hits.get().unwrap(), json!(0));
    /// ```
    pub fn subscribe(
        &self,
        callback: impl Fn(&Scope, &Entry, Option<&Value>) -> Option<Value> + 'static,
    ) -> Subscription {
        self.runtime.subscribe(self.runtime.root_pattern(), callback)
    }

    /// Observe the mutations selected by an explicit pattern.
    pub fn subscribe_topic(
        &self,
        pattern: TopicPattern,
        callback: impl Fn(&Scope, &Entry, Option<&Value>) -> Option<Value> + 'static,
    ) -> Subscription {
        self.runtime.subscribe(pattern, callback)
    }

    /// Number of live subscribers on the bus.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.runtime.subscriber_count()
    }

    /// Values of every public entry of every scope, keyed by entry key.
    ///
    /// Keys are not qualified by scope: when two scopes hold a public entry
    /// with the same key, the scope registered last wins.
    ///
    /// # Errors
    ///
    /// Any error from initializing an unset public entry.
    pub fn all_public_values(&self) -> StoreResult<IndexMap<String, Value>> {
        let mut values = IndexMap::new();
        for scope in self.scopes.values() {
            let hooks = self.runtime.hooks(scope);
            for entry in scope.entries() {
                if entry.is_public() {
                    let value = entry.get(Seed::None, &hooks)?;
                    values.insert(entry.key().to_owned(), value);
                }
            }
        }
        Ok(values)
    }

    /// [`all_public_values`](Self::all_public_values) as a JSON object, the
    /// form a host returns to its client.
    ///
    /// # Errors
    ///
    /// As for [`all_public_values`](Self::all_public_values).
    pub fn public_json(&self) -> StoreResult<Value> {
        let values = self.all_public_values()?;
        Ok(Value::Object(values.into_iter().collect()))
    }

    fn find(&self, name: &str) -> StoreResult<Scope> {
        self.scopes
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownScope(name.to_owned()))
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("root", &self.runtime.root())
            .field("scopes", &self.scopes.keys().collect::<Vec<_>>())
            .field("subscribers", &self.runtime.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::MemoryRecords;
    use serde_json::json;
    use std::cell::RefCell;
    use tracing_test::traced_test;

    type Events = Rc<RefCell<Vec<(String, String, Option<Value>)>>>;

    fn manager(scopes: &[&str]) -> Manager {
        let mut dm = Manager::new();
        for name in scopes {
            dm.register_scope(*name).unwrap();
        }
        dm
    }

    fn record_all(dm: &Manager) -> Events {
        let events: Events = Rc::default();
        let sink = Rc::clone(&events);
        dm.subscribe(move |scope, entry, previous| {
            sink.borrow_mut().push((
                scope.name().to_owned(),
                entry.key().to_owned(),
                previous.cloned(),
            ));
            None
        })
        .detach();
        events
    }

    // ---- registry ----

    #[test]
    fn global_scope_exists_from_start() {
        let mut dm = Manager::new();
        assert!(dm.has_scope(DEFAULT_GLOBAL_SCOPE));
        assert_eq!(dm.global_name(), DEFAULT_GLOBAL_SCOPE);
        assert_eq!(
            dm.register_scope(DEFAULT_GLOBAL_SCOPE),
            Err(StoreError::DuplicateScope(DEFAULT_GLOBAL_SCOPE.into()))
        );
    }

    #[test]
    fn duplicate_and_unknown_scopes_fail() {
        let mut dm = manager(&["tasks"]);
        assert_eq!(
            dm.register_scope("tasks"),
            Err(StoreError::DuplicateScope("tasks".into()))
        );
        assert_eq!(
            dm.scope("nope").unwrap_err(),
            StoreError::UnknownScope("nope".into())
        );
        assert!(dm.lookup("nope").is_err());
        assert_eq!(
            dm.scope_names().collect::<Vec<_>>(),
            [DEFAULT_GLOBAL_SCOPE, "tasks"]
        );
    }

    #[test]
    fn builder_defaults_to_private() {
        let dm = manager(&["tasks"]);
        assert!(!dm.scope("tasks").unwrap().is_public());
        assert!(dm.scope("tasks").unwrap().public().is_public());
        assert!(!dm.scope("tasks").unwrap().public().private().is_public());
    }

    #[test]
    fn lookup_is_private_readonly() {
        let dm = manager(&["tasks"]);
        let handle = dm.lookup("tasks").unwrap();
        assert!(!handle.is_public());
        assert_eq!(handle.name(), "tasks");
    }

    #[test]
    fn global_scope_is_usable() {
        let dm = Manager::new();
        dm.global().public().mutable().set("theme", "dark").unwrap();
        assert_eq!(dm.all_public_values().unwrap()["theme"], json!("dark"));
    }

    // ---- end to end ----

    #[test]
    fn tasks_example() {
        let dm = manager(&["tasks"]);
        let private = dm.scope("tasks").unwrap().private().mutable();
        private.entry("t1").unwrap().set("Do chores");
        assert!(dm.all_public_values().unwrap().is_empty());

        let public = dm.scope("tasks").unwrap().public().mutable();
        public.entry("t2").unwrap().set("Buy milk");
        let values = dm.all_public_values().unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values["t2"], json!("Buy milk"));
        assert_eq!(dm.public_json().unwrap(), json!({"t2": "Buy milk"}));
    }

    // ---- lazy initialization ----

    #[test]
    fn lazy_init_once_through_handles() {
        let dm = manager(&["s"]);
        let handle = dm.scope("s").unwrap().mutable().entry("k").unwrap();
        assert_eq!(handle.get_or(1).unwrap(), json!(1));
        assert_eq!(handle.get_or(2).unwrap(), json!(1));
        assert_eq!(handle.get_or_else(|| json!(3)).unwrap(), json!(1));
    }

    #[test]
    fn get_without_default_on_unset_entry_fails() {
        let dm = manager(&["s"]);
        let handle = dm.scope("s").unwrap().mutable().entry("k").unwrap();
        assert_eq!(
            handle.get().unwrap_err(),
            StoreError::UninitializedValue { key: "k".into() }
        );
    }

    #[test]
    fn subscriber_supplies_value_for_unset_read() {
        let dm = manager(&["s"]);
        let events = record_all(&dm);
        dm.subscribe(|_, _, previous| previous.is_none().then(|| json!("from-subscriber")))
            .detach();

        let handle = dm.scope("s").unwrap().readonly().entry("k").unwrap();
        assert_eq!(handle.get().unwrap(), json!("from-subscriber"));
        assert_eq!(handle.get().unwrap(), json!("from-subscriber"));
        assert_eq!(
            *events.borrow(),
            vec![("s".to_owned(), "k".to_owned(), None)]
        );
    }

    #[test]
    fn unset_read_without_answer_is_still_announced() {
        let dm = manager(&["s"]);
        let events = record_all(&dm);
        let handle = dm.scope("s").unwrap().mutable().entry("k").unwrap();
        assert!(handle.get().is_err());
        assert_eq!(events.borrow().len(), 1);
        assert_eq!(events.borrow()[0].2, None);
    }

    #[test]
    fn removed_entry_still_reaches_later_subscribers() {
        let dm = manager(&["s"]);
        let scope = dm.scope("s").unwrap().mutable();
        let remover = scope.clone();
        dm.subscribe(move |_, entry, _| {
            remover.remove(entry.key());
            None
        })
        .detach();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        dm.subscribe(move |scope, entry, _| {
            s.borrow_mut().push((scope.name().to_owned(), entry.value()));
            None
        })
        .detach();

        scope.set("k", 1).unwrap();
        assert!(!scope.exists("k"));
        assert_eq!(*seen.borrow(), vec![("s".to_owned(), Some(json!(1)))]);
    }

    #[test]
    fn readonly_lazy_read_is_announced() {
        let dm = manager(&["s"]);
        let events = record_all(&dm);
        let handle = dm.scope("s").unwrap().readonly().entry("k").unwrap();
        assert_eq!(handle.get_or("first").unwrap(), json!("first"));
        handle.get_or("second").unwrap();
        assert_eq!(
            *events.borrow(),
            vec![("s".to_owned(), "k".to_owned(), None)]
        );
    }

    // ---- notifications ----

    #[test]
    fn previous_values_track_each_set() {
        let dm = manager(&["s"]);
        let events = record_all(&dm);
        let handle = dm.scope("s").unwrap().mutable().entry("k").unwrap();
        handle.set(1);
        handle.set(2);
        handle.set(Value::Null);
        handle.set(3);
        let previous: Vec<Option<Value>> = events.borrow().iter().map(|e| e.2.clone()).collect();
        assert_eq!(
            previous,
            vec![None, Some(json!(1)), Some(json!(2)), Some(Value::Null)]
        );
    }

    #[test]
    fn lazy_init_then_set_reports_initial_value() {
        let dm = manager(&["s"]);
        let events = record_all(&dm);
        let handle = dm.scope("s").unwrap().mutable().entry("k").unwrap();
        handle.get_or(10).unwrap();
        handle.set(11);
        let previous: Vec<Option<Value>> = events.borrow().iter().map(|e| e.2.clone()).collect();
        assert_eq!(previous, vec![None, Some(json!(10))]);
    }

    #[test]
    fn subscriber_override_is_silent() {
        let dm = manager(&["s"]);
        let calls = Rc::new(RefCell::new(0));
        let c = Rc::clone(&calls);
        dm.subscribe(move |_, _, _| {
            *c.borrow_mut() += 1;
            Some(json!("X"))
        })
        .detach();

        let handle = dm.scope("s").unwrap().mutable().entry("k").unwrap();
        handle.set("original");
        assert_eq!(handle.get().unwrap(), json!("X"));
        assert_eq!(*calls.borrow(), 1, "override must not re-notify");
    }

    #[test]
    fn later_subscriber_sees_earlier_override() {
        let dm = manager(&["s"]);
        dm.subscribe(|_, _, _| Some(json!(1))).detach();
        let seen = Rc::new(RefCell::new(None));
        let s = Rc::clone(&seen);
        dm.subscribe(move |_, entry, _| {
            *s.borrow_mut() = entry.value();
            None
        })
        .detach();

        dm.scope("s").unwrap().mutable().set("k", 0).unwrap();
        assert_eq!(*seen.borrow(), Some(json!(1)));
    }

    #[test]
    fn subscription_addressing() {
        let dm = manager(&["a", "b"]);
        let a = dm.scope("a").unwrap().mutable();
        let b = dm.scope("b").unwrap().mutable();

        let hits = Rc::new(RefCell::new(Vec::new()));
        let h = Rc::clone(&hits);
        let _global = dm.subscribe(move |s, e, _| {
            h.borrow_mut().push(format!("global:{}.{}", s.name(), e.key()));
            None
        });
        let h = Rc::clone(&hits);
        let _scope = a.subscribe(move |s, e, _| {
            h.borrow_mut().push(format!("scope:{}.{}", s.name(), e.key()));
            None
        });
        let h = Rc::clone(&hits);
        let x = a.entry("x").unwrap();
        let _entry = x.subscribe(move |s, e, _| {
            h.borrow_mut().push(format!("entry:{}.{}", s.name(), e.key()));
            None
        });

        x.set(1);
        a.set("y", 2).unwrap();
        b.set("x", 3).unwrap();

        assert_eq!(
            *hits.borrow(),
            vec![
                "global:a.x",
                "scope:a.x",
                "entry:a.x",
                "global:a.y",
                "scope:a.y",
                "global:b.x",
            ]
        );
    }

    #[test]
    fn dropped_subscription_stops_delivery() {
        let dm = manager(&["s"]);
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let sub = dm.subscribe(move |_, _, _| {
            *c.borrow_mut() += 1;
            None
        });
        let handle = dm.scope("s").unwrap().mutable().entry("k").unwrap();
        handle.set(1);
        drop(sub);
        handle.set(2);
        assert_eq!(*count.borrow(), 1);
        assert_eq!(dm.subscriber_count(), 0);
    }

    #[test]
    fn subscribe_topic_accepts_parsed_patterns() {
        let dm = manager(&["s"]);
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        dm.subscribe_topic("dm.s.k".parse().unwrap(), move |_, _, _| {
            *c.borrow_mut() += 1;
            None
        })
        .detach();
        let scope = dm.scope("s").unwrap().mutable();
        scope.set("k", 1).unwrap();
        scope.set("other", 1).unwrap();
        assert_eq!(*count.borrow(), 1);
    }

    // ---- visibility ----

    #[test]
    fn public_handle_rejects_private_entry() {
        let dm = manager(&["s"]);
        dm.scope("s").unwrap().mutable().set("secret", 1).unwrap();
        let public = dm.scope("s").unwrap().public().mutable();
        assert!(matches!(
            public.entry("secret"),
            Err(StoreError::VisibilityViolation { .. })
        ));
        assert!(public.array("secret").is_err());
        assert!(public.model("secret", "User", 1).is_err());
        assert!(dm.scope("s").unwrap().public().readonly().value("secret").is_err());
    }

    #[test]
    fn private_handle_demotes_public_entry() {
        let dm = manager(&["s"]);
        dm.scope("s").unwrap().public().mutable().set("k", 1).unwrap();
        assert_eq!(dm.all_public_values().unwrap().len(), 1);

        let private = dm.scope("s").unwrap().mutable().entry("k").unwrap();
        assert!(!private.is_public());
        assert!(dm.all_public_values().unwrap().is_empty());
        assert!(dm.scope("s").unwrap().public().mutable().entry("k").is_err());
    }

    #[test]
    fn readonly_entry_handle_changes_visibility() {
        let dm = manager(&["s"]);
        let scope = dm.scope("s").unwrap().mutable();
        scope.set("k", 1).unwrap();

        let readonly = dm.scope("s").unwrap().readonly().entry("k").unwrap();
        assert!(readonly.set_public(true).is_public());
        assert_eq!(dm.all_public_values().unwrap()["k"], json!(1));

        let mutable = scope.entry("k").unwrap();
        assert!(!mutable.is_public());
        assert!(mutable.set_public(true).readonly().is_public());
    }

    #[test]
    fn all_filters_by_view() {
        let dm = manager(&["s"]);
        let private = dm.scope("s").unwrap().mutable();
        let public = dm.scope("s").unwrap().public().mutable();
        private.set("a", 1).unwrap();
        public.set("b", 2).unwrap();

        assert_eq!(private.all().unwrap().keys().collect::<Vec<_>>(), ["a"]);
        assert_eq!(public.all().unwrap().keys().collect::<Vec<_>>(), ["b"]);
        assert_eq!(dm.scope("s").unwrap().all().unwrap().len(), 2);
    }

    #[test]
    fn unset_public_entry_fails_public_values() {
        let dm = manager(&["s"]);
        dm.scope("s").unwrap().public().mutable().entry("pending").unwrap();
        assert_eq!(
            dm.all_public_values().unwrap_err(),
            StoreError::UninitializedValue {
                key: "pending".into()
            }
        );
    }

    #[test]
    fn public_values_collide_last_scope_wins() {
        let dm = manager(&["first", "second"]);
        dm.scope("first").unwrap().public().mutable().set("k", "one").unwrap();
        dm.scope("second").unwrap().public().mutable().set("k", "two").unwrap();
        assert_eq!(dm.all_public_values().unwrap()["k"], json!("two"));
    }

    // ---- readonly scope ----

    #[test]
    fn readonly_scope_is_add_only() {
        let dm = manager(&["s"]);
        let events = record_all(&dm);
        let ro = dm.scope("s").unwrap().readonly();

        ro.set("new", "v").unwrap();
        assert_eq!(ro.value("new").unwrap(), json!("v"));
        assert_eq!(
            ro.set("new", "w").unwrap_err(),
            StoreError::ReadonlyViolation {
                scope: "s".into(),
                key: "new".into(),
                operation: "overwrite",
            }
        );
        assert!(matches!(
            ro.remove("new"),
            Err(StoreError::ReadonlyViolation { operation: "remove", .. })
        ));
        assert!(matches!(
            ro.remove("missing"),
            Err(StoreError::ReadonlyViolation { .. })
        ));
        assert!(ro.exists("new"));
        assert_eq!(ro.value("new").unwrap(), json!("v"));
        assert_eq!(events.borrow().len(), 1);
        assert_eq!(events.borrow()[0].2, None);
    }

    #[test]
    fn readonly_set_takes_handle_visibility() {
        let dm = manager(&["s"]);
        dm.scope("s").unwrap().public().readonly().set("k", 1).unwrap();
        assert_eq!(dm.all_public_values().unwrap()["k"], json!(1));
    }

    #[test]
    fn mutable_scope_removes_entries() {
        let dm = manager(&["s"]);
        let scope = dm.scope("s").unwrap().mutable();
        scope.set("k", 1).unwrap();
        assert!(scope.remove("k"));
        assert!(!scope.remove("k"));
        assert!(!scope.exists("k"));
        assert!(scope.readonly().set("k", 2).is_ok());
    }

    // ---- update / merge ----

    #[test]
    fn update_composes_get_and_set() {
        let dm = manager(&["s"]);
        let events = record_all(&dm);
        let counter = dm.scope("s").unwrap().mutable().entry("n").unwrap();
        counter
            .update(|v| json!(v.as_i64().unwrap_or(0) + 1), json!(0))
            .unwrap();
        counter
            .update(|v| json!(v.as_i64().unwrap_or(0) + 1), json!(100))
            .unwrap();
        assert_eq!(counter.get().unwrap(), json!(2));
        let previous: Vec<Option<Value>> = events.borrow().iter().map(|e| e.2.clone()).collect();
        assert_eq!(previous, vec![None, Some(json!(0)), Some(json!(1))]);
    }

    #[test]
    fn update_without_value_fails_and_stores_nothing() {
        let dm = manager(&["s"]);
        let handle = dm.scope("s").unwrap().mutable().entry("n").unwrap();
        assert!(handle.update(|v| v, Seed::None).is_err());
        assert!(!handle.initialized());
    }

    #[test]
    fn merge_concatenates_and_announces_default() {
        let dm = manager(&["page"]);
        let events = record_all(&dm);
        let header = dm.scope("page").unwrap().mutable().array("header").unwrap();

        header.merge([vec![json!("x")]]).unwrap();
        assert_eq!(header.get().unwrap(), json!(["x"]));
        header.merge([vec![json!("y")]]).unwrap();
        assert_eq!(header.get().unwrap(), json!(["x", "y"]));

        let previous: Vec<Option<Value>> = events.borrow().iter().map(|e| e.2.clone()).collect();
        assert_eq!(previous, vec![None, Some(json!([])), Some(json!(["x"]))]);
    }

    #[test]
    fn merge_multiple_lists_in_order() {
        let dm = manager(&["page"]);
        let list = dm.scope("page").unwrap().mutable().array("l").unwrap();
        list.merge([vec![json!(1), json!(2)], vec![], vec![json!(3)]])
            .unwrap();
        assert_eq!(list.items().unwrap(), vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn merge_into_non_array_fails() {
        let dm = manager(&["page"]);
        let scope = dm.scope("page").unwrap().mutable();
        scope.set("title", "hello").unwrap();
        let err = scope.array("title").unwrap().merge([[json!(1)]]).unwrap_err();
        assert_eq!(
            err,
            StoreError::ArrayExpected {
                scope: "page".into(),
                key: "title".into(),
            }
        );
        assert_eq!(scope.entry("title").unwrap().get().unwrap(), json!("hello"));
    }

    // ---- records ----

    #[test]
    fn model_loads_record_lazily() {
        let mut dm = Manager::with_records(
            MemoryRecords::new().with("User", 1, json!({"id": 1, "name": "Ann"})),
        );
        dm.register_scope("users").unwrap();
        let events = record_all(&dm);

        let user = dm.scope("users").unwrap().public().readonly().model("me", "User", 1).unwrap();
        assert!(events.borrow().is_empty(), "lookup waits for the first read");
        assert_eq!(user.get().unwrap()["name"], "Ann");
        assert_eq!(user.class(), "User");
        assert_eq!(user.id(), &json!(1));
        assert_eq!(events.borrow().len(), 1);
        assert_eq!(events.borrow()[0].2, None);
        assert_eq!(dm.all_public_values().unwrap()["me"]["id"], json!(1));
    }

    #[test]
    fn model_missing_record_propagates() {
        let dm = manager(&["users"]);
        let ghost = dm.scope("users").unwrap().mutable().model("ghost", "User", 404).unwrap();
        assert_eq!(
            ghost.get().unwrap_err(),
            StoreError::RecordNotFound {
                class: "User".into(),
                id: "404".into(),
            }
        );
        assert!(!ghost.as_readonly().initialized());
    }

    // ---- logging ----

    #[test]
    #[traced_test]
    fn registration_and_publication_are_logged() {
        let dm = manager(&["logged"]);
        dm.scope("logged").unwrap().mutable().set("k", 1).unwrap();
        assert!(logs_contain("scope registered"));
        assert!(logs_contain("entry mutation published"));
    }
}
