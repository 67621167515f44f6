#![forbid(unsafe_code)]

//! Synchronous notification bus with reply hand-back.
//!
//! A [`NotificationBus<M, R>`] delivers a message of type `M` to every
//! subscriber whose [`TopicPattern`] matches the published [`Topic`]. A
//! subscriber may answer with `Some(R)`; the publisher receives each answer
//! through its `on_reply` callback before the next subscriber runs, which
//! lets later subscribers observe the effect of earlier replies.
//!
//! # Architecture
//!
//! The bus uses `Rc<RefCell<..>>` for single-threaded shared ownership, the
//! same model as the rest of datamgr. Callbacks are snapshotted before a
//! dispatch, so a subscriber may subscribe, unsubscribe, or publish again
//! without a `RefCell` conflict.
//!
//! # Failure Modes
//!
//! - Subscriber panic: propagates to the caller of `publish()`.
//! - Bus dropped while a [`Subscription`] is alive: dropping the guard is a
//!   no-op (it only holds a `Weak` reference).

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::topic::{Topic, TopicPattern};

type Callback<M, R> = Rc<dyn Fn(&Topic, &M) -> Option<R>>;

struct Slot<M, R> {
    id: u64,
    pattern: TopicPattern,
    callback: Callback<M, R>,
}

struct BusInner<M, R> {
    next_id: u64,
    slots: Vec<Slot<M, R>>,
}

impl<M, R> BusInner<M, R> {
    fn remove(&mut self, id: u64) {
        self.slots.retain(|slot| slot.id != id);
    }
}

/// Topic-addressed, synchronous publish/subscribe bus.
pub struct NotificationBus<M, R = ()> {
    inner: Rc<RefCell<BusInner<M, R>>>,
}

impl<M, R> Clone for NotificationBus<M, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<M, R> fmt::Debug for NotificationBus<M, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl<M: 'static, R: 'static> Default for NotificationBus<M, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M, R> NotificationBus<M, R> {
    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().slots.len()
    }
}

impl<M: 'static, R: 'static> NotificationBus<M, R> {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(BusInner {
                next_id: 1,
                slots: Vec::new(),
            })),
        }
    }

    /// Register `callback` for every topic matched by `pattern`.
    ///
    /// The callback stays registered until the returned [`Subscription`] is
    /// dropped, or for the bus lifetime once it is detached.
    pub fn subscribe(
        &self,
        pattern: TopicPattern,
        callback: impl Fn(&Topic, &M) -> Option<R> + 'static,
    ) -> Subscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.slots.push(Slot {
                id,
                pattern,
                callback: Rc::new(callback),
            });
            id
        };
        let weak: Weak<RefCell<BusInner<M, R>>> = Rc::downgrade(&self.inner);
        Subscription {
            id,
            release: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.borrow_mut().remove(id);
                }
            })),
        }
    }

    /// Deliver `message` to every subscriber matching `topic`.
    ///
    /// Replies are passed to `on_reply` in subscriber order, each one before
    /// the following subscriber is invoked. Returns how many subscribers
    /// were invoked.
    pub fn publish(&self, topic: &Topic, message: &M, mut on_reply: impl FnMut(R)) -> usize {
        let matching: Vec<Callback<M, R>> = self
            .inner
            .borrow()
            .slots
            .iter()
            .filter(|slot| slot.pattern.matches(topic))
            .map(|slot| Rc::clone(&slot.callback))
            .collect();
        for callback in &matching {
            if let Some(reply) = callback(topic, message) {
                on_reply(reply);
            }
        }
        matching.len()
    }
}

/// RAII guard for a bus subscriber.
///
/// Dropping the guard unsubscribes. Call [`detach`](Self::detach) to keep
/// the subscriber registered for as long as the bus lives.
#[must_use = "dropping a Subscription unsubscribes immediately; call detach() to keep it"]
pub struct Subscription {
    id: u64,
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Identifier assigned by the bus.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Keep the subscriber registered for the lifetime of the bus.
    pub fn detach(mut self) {
        self.release = None;
    }

    /// Unsubscribe now. Equivalent to dropping the guard.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("attached", &self.release.is_some())
            .finish()
    }
}
