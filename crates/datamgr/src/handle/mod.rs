#![forbid(unsafe_code)]

//! Visibility-checked views over scopes and entries.
//!
//! # Touch Rule
//!
//! Every handle operation that hands out an entry applies the same rule:
//!
//! 1. A missing key is created and stamped with the handle's view flag.
//! 2. An existing private entry touched through a public handle fails with
//!    [`StoreError::VisibilityViolation`].
//! 3. Otherwise the entry is re-stamped with the handle's view flag, so a
//!    private handle demotes a public entry.

mod entry;
mod scope;

pub use entry::{ArrayEntryHandle, MutableEntryHandle, ReadonlyEntryHandle, RecordEntryHandle};
pub use scope::{MutableScopeHandle, ReadonlyScopeHandle};

use datamgr_core::{Entry, Scope, StoreError, StoreResult};
use tracing::debug;

/// Resolve `key` in `scope` for a handle whose view flag is `public`.
pub(crate) fn touch(scope: &Scope, key: &str, public: bool) -> StoreResult<Entry> {
    let entry = match scope.find(key) {
        None => scope.entry(key),
        Some(entry) if public && !entry.is_public() => {
            debug!(scope = scope.name(), key, "public handle refused private entry");
            return Err(StoreError::VisibilityViolation {
                scope: scope.name().to_owned(),
                key: key.to_owned(),
            });
        }
        Some(entry) => entry,
    };
    entry.set_public(public);
    Ok(entry)
}
