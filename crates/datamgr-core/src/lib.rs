#![forbid(unsafe_code)]

//! Storage primitives for datamgr.
//!
//! - [`Entry`]: a named, lazily-initialized, visibility-tagged value cell.
//! - [`Scope`]: an insertion-ordered set of entries under one name.
//! - [`Seed`]: the default value (or a function producing it) offered to an
//!   entry's first initialization.
//! - [`Initializer`]: the strategy an entry runs on first initialization.
//! - [`StoreError`]: every contract violation the store reports.
//!
//! Both [`Entry`] and [`Scope`] are cheap `Rc` handles; clones share state.
//! Neither type is `Send`, so the store cannot be shared across threads.

pub mod entry;
pub mod error;
pub mod scope;

pub use entry::{Entry, InitHooks, Initializer, Seed};
pub use error::{StoreError, StoreResult};
pub use scope::Scope;

/// Stored value type.
pub use serde_json::Value;
