#![forbid(unsafe_code)]

//! Shared state behind every handle: topic root, bus, and record source.

use std::fmt;
use std::rc::Rc;

use datamgr_bus::{NotificationBus, Subscription, Topic, TopicPattern};
use datamgr_core::{Entry, InitHooks, Scope, Value};
use tracing::{debug, debug_span, trace};

use crate::records::RecordSource;

/// Message carried on the bus for one entry mutation.
pub(crate) struct Notification {
    scope: Scope,
    entry: Entry,
    previous: Option<Value>,
}

pub(crate) struct Runtime {
    root: String,
    bus: NotificationBus<Notification, Value>,
    records: Rc<dyn RecordSource>,
}

impl Runtime {
    pub(crate) fn new(root: impl Into<String>, records: Rc<dyn RecordSource>) -> Self {
        Self {
            root: root.into(),
            bus: NotificationBus::new(),
            records,
        }
    }

    pub(crate) fn root(&self) -> &str {
        &self.root
    }

    pub(crate) fn topic(&self, scope: &str, key: &str) -> Topic {
        Topic::new([self.root.as_str(), scope, key])
    }

    pub(crate) fn root_pattern(&self) -> TopicPattern {
        TopicPattern::prefix([self.root.as_str()])
    }

    pub(crate) fn scope_pattern(&self, scope: &str) -> TopicPattern {
        TopicPattern::prefix([self.root.as_str(), scope])
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.bus.subscriber_count()
    }

    /// Register a `(scope, entry, previous)` callback for `pattern`.
    pub(crate) fn subscribe(
        &self,
        pattern: TopicPattern,
        callback: impl Fn(&Scope, &Entry, Option<&Value>) -> Option<Value> + 'static,
    ) -> Subscription {
        debug!(pattern = %pattern, "subscriber registered");
        self.bus.subscribe(pattern, move |_topic, note: &Notification| {
            callback(&note.scope, &note.entry, note.previous.as_ref())
        })
    }

    /// Announce a mutation of `entry`. Replies are written straight into the
    /// entry, so they never trigger another notification.
    pub(crate) fn publish(&self, scope: &Scope, entry: &Entry, previous: Option<Value>) -> usize {
        let topic = self.topic(scope.name(), entry.key());
        let _span = debug_span!("dm_publish", topic = %topic).entered();
        let initial = previous.is_none();
        let note = Notification {
            scope: scope.clone(),
            entry: entry.clone(),
            previous,
        };
        let delivered = self.bus.publish(&topic, &note, |value| {
            debug!(topic = %topic, "subscriber replaced entry value");
            entry.set(value);
        });
        trace!(topic = %topic, delivered, initial, "entry mutation published");
        delivered
    }

    /// Initialization hooks bound to `scope`.
    pub(crate) fn hooks<'a>(&'a self, scope: &'a Scope) -> ScopeHooks<'a> {
        ScopeHooks {
            runtime: self,
            scope,
        }
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("root", &self.root)
            .field("subscribers", &self.bus.subscriber_count())
            .finish()
    }
}

/// [`InitHooks`] that publish on the scope's topic and consult the
/// runtime's record source.
pub(crate) struct ScopeHooks<'a> {
    runtime: &'a Runtime,
    scope: &'a Scope,
}

impl InitHooks for ScopeHooks<'_> {
    fn announce(&self, entry: &Entry) {
        self.runtime.publish(self.scope, entry, None);
    }

    fn find_record(&self, class: &str, id: &Value) -> Option<Value> {
        self.runtime.records.find(class, id)
    }
}
