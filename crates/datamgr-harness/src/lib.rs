#![forbid(unsafe_code)]

//! Fixtures for exercising datamgr end to end.
//!
//! - [`NotificationLog`] records every notification a manager publishes.
//! - [`manager_with`] builds a manager with a list of scopes registered.
//! - [`strategies`] holds proptest generators for handle operation
//!   sequences.

use std::cell::RefCell;
use std::rc::Rc;

use datamgr::{Manager, Subscription, TopicPattern, Value};

/// Install a test-writer `tracing` subscriber honoring `RUST_LOG`.
/// Safe to call from every test.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A manager with `scopes` registered after the global scope.
///
/// # Panics
///
/// If a name repeats.
#[must_use]
pub fn manager_with(scopes: &[&str]) -> Manager {
    let mut dm = Manager::new();
    for scope in scopes {
        dm.register_scope(*scope)
            .unwrap_or_else(|err| panic!("fixture scope {scope}: {err}"));
    }
    dm
}

/// One observed notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Observed {
    /// `<scope>.<key>`.
    pub path: String,
    /// Value before the mutation, `None` on first initialization.
    pub previous: Option<Value>,
    /// Entry value when the callback ran.
    pub current: Option<Value>,
}

/// Records notifications until dropped.
pub struct NotificationLog {
    seen: Rc<RefCell<Vec<Observed>>>,
    _subscription: Subscription,
}

impl NotificationLog {
    /// Record every notification of `dm`.
    #[must_use]
    pub fn attach(dm: &Manager) -> Self {
        let seen: Rc<RefCell<Vec<Observed>>> = Rc::default();
        let sink = Rc::clone(&seen);
        let subscription = dm.subscribe(move |scope, entry, previous| {
            sink.borrow_mut().push(Observed {
                path: format!("{}.{}", scope.name(), entry.key()),
                previous: previous.cloned(),
                current: entry.value(),
            });
            None
        });
        Self {
            seen,
            _subscription: subscription,
        }
    }

    /// Record notifications matching `pattern` only.
    #[must_use]
    pub fn attach_topic(dm: &Manager, pattern: TopicPattern) -> Self {
        let seen: Rc<RefCell<Vec<Observed>>> = Rc::default();
        let sink = Rc::clone(&seen);
        let subscription = dm.subscribe_topic(pattern, move |scope, entry, previous| {
            sink.borrow_mut().push(Observed {
                path: format!("{}.{}", scope.name(), entry.key()),
                previous: previous.cloned(),
                current: entry.value(),
            });
            None
        });
        Self {
            seen,
            _subscription: subscription,
        }
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn entries(&self) -> Vec<Observed> {
        self.seen.borrow().clone()
    }

    /// Recorded `<scope>.<key>` paths in order.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.seen.borrow().iter().map(|o| o.path.clone()).collect()
    }

    /// Recorded previous values in order.
    #[must_use]
    pub fn previous_values(&self) -> Vec<Option<Value>> {
        self.seen.borrow().iter().map(|o| o.previous.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.seen.borrow_mut().clear();
    }
}

/// proptest generators.
pub mod strategies {
    use proptest::prelude::*;

    /// One handle operation against a fixed set of scopes and keys.
    #[derive(Debug, Clone)]
    pub enum Op {
        Set { scope: usize, key: usize, public: bool, value: i64 },
        GetOr { scope: usize, key: usize, public: bool, value: i64 },
        ReadonlySet { scope: usize, key: usize, public: bool, value: i64 },
        Merge { scope: usize, key: usize, public: bool, items: Vec<i64> },
        Remove { scope: usize, key: usize },
    }

    /// Scope names ops index into.
    pub const SCOPES: [&str; 2] = ["alpha", "beta"];

    /// Entry keys ops index into.
    pub const KEYS: [&str; 3] = ["a", "b", "c"];

    fn target() -> impl Strategy<Value = (usize, usize, bool)> {
        (0..SCOPES.len(), 0..KEYS.len(), any::<bool>())
    }

    pub fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => (target(), any::<i64>()).prop_map(|((scope, key, public), value)| Op::Set {
                scope,
                key,
                public,
                value
            }),
            3 => (target(), any::<i64>()).prop_map(|((scope, key, public), value)| Op::GetOr {
                scope,
                key,
                public,
                value
            }),
            2 => (target(), any::<i64>()).prop_map(|((scope, key, public), value)| {
                Op::ReadonlySet {
                    scope,
                    key,
                    public,
                    value,
                }
            }),
            2 => (target(), prop::collection::vec(any::<i64>(), 0..4)).prop_map(
                |((scope, key, public), items)| Op::Merge {
                    scope,
                    key,
                    public,
                    items
                }
            ),
            1 => (0..SCOPES.len(), 0..KEYS.len()).prop_map(|(scope, key)| Op::Remove { scope, key }),
        ]
    }

    pub fn ops() -> impl Strategy<Value = Vec<Op>> {
        prop::collection::vec(op(), 0..40)
    }
}
