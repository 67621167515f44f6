#![forbid(unsafe_code)]

//! Topic-addressed notification bus for datamgr.
//!
//! - [`Topic`]: a hierarchical address such as `dm.tasks.t1`, stored as
//!   segments so that a segment may itself contain dots.
//! - [`TopicPattern`]: an exact topic or a trailing-wildcard prefix
//!   (`dm.tasks.*`, `dm.*`).
//! - [`NotificationBus`]: synchronous fan-out to every subscriber whose
//!   pattern matches, in registration order.
//! - [`Subscription`]: RAII guard that removes its subscriber on drop.
//!
//! # Invariants
//!
//! 1. Subscribers are invoked in registration order.
//! 2. A dispatch only reaches subscribers registered before it started.
//! 3. Each reply is handed to the publisher before the next subscriber runs.
//! 4. Dropping a [`Subscription`] removes the callback before the next
//!    dispatch; [`Subscription::detach`] keeps it for the bus lifetime.

pub mod bus;
pub mod topic;

pub use bus::{NotificationBus, Subscription};
pub use topic::{PatternError, Topic, TopicPattern};
