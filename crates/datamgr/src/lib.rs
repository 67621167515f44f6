#![forbid(unsafe_code)]

//! Request-scoped reactive key-value store.
//!
//! Values live in named scopes. Each entry is computed lazily on first
//! read, carries a public/private visibility flag, and announces every
//! mutation on a topic `<root>.<scope>.<entry>`. Subscribers may answer a
//! notification with a replacement value, which is stored before the
//! mutating call returns.
//!
//! # Usage
//!
//! ```
//! use datamgr::{Manager, Value};
//! use serde_json::json;
//!
//! let mut dm = Manager::new();
//! dm.register_scope("tasks").unwrap();
//!
//! let private = dm.scope("tasks").unwrap().private().mutable();
//! private.entry("t1").unwrap().set(json!("Do chores"));
//! assert!(dm.all_public_values().unwrap().is_empty());
//!
//! let public = dm.scope("tasks").unwrap().public().mutable();
//! public.entry("t2").unwrap().set(json!("Buy milk"));
//! let values = dm.all_public_values().unwrap();
//! assert_eq!(values.len(), 1);
//! assert_eq!(values["t2"], Value::from("Buy milk"));
//! ```
//!
//! # Handles
//!
//! [`Manager::scope`] returns a [`ScopeHandleBuilder`]; choose a view with
//! `.public()` / `.private()` (private is the default), then finish with
//! `.mutable()` or `.readonly()`.
//!
//! | Handle | Reads | Writes |
//! |--------|-------|--------|
//! | [`MutableScopeHandle`] | `entry`, `all` | `set`, `remove`, `array` |
//! | [`ReadonlyScopeHandle`] | `entry`, `value`, `all` | `set` on new keys only |
//! | [`MutableEntryHandle`] | `get` | `set`, `update` |
//! | [`ArrayEntryHandle`] | `get` | `merge` |
//! | [`ReadonlyEntryHandle`] / [`RecordEntryHandle`] | `get` | none |
//!
//! # Visibility
//!
//! The first handle to touch a key stamps the entry with its view flag.
//! A public handle touching a private entry fails with
//! [`StoreError::VisibilityViolation`]; a private handle touching a public
//! entry demotes it to private.
//!
//! # Threading
//!
//! Everything is single-threaded (`Rc`/`RefCell`); none of the types are
//! `Send`. Create one [`Manager`] per request.

pub mod builder;
pub mod config;
pub mod handle;
pub mod manager;
pub mod records;
mod runtime;

pub use builder::ScopeHandleBuilder;
pub use config::{ConfigError, ManagerConfig};
pub use handle::{
    ArrayEntryHandle, MutableEntryHandle, MutableScopeHandle, ReadonlyEntryHandle,
    ReadonlyScopeHandle, RecordEntryHandle,
};
pub use manager::Manager;
pub use records::{MemoryRecords, NoRecords, RecordSource};

pub use datamgr_bus::{PatternError, Subscription, Topic, TopicPattern};
pub use datamgr_core::{Entry, Initializer, Scope, Seed, StoreError, StoreResult, Value};

/// Topic root used when none is configured.
pub const DEFAULT_ROOT: &str = "dm";

/// Name of the scope every manager registers at construction.
pub const DEFAULT_GLOBAL_SCOPE: &str = "__GLOBAL";
