#![forbid(unsafe_code)]

//! Declarative manager setup.
//!
//! A [`ManagerConfig`] names the topic root, the global scope, and the
//! scopes to register at boot:
//!
//! ```json
//! { "root": "dm", "global_scope": "__GLOBAL", "scopes": ["tasks", "page"] }
//! ```
//!
//! JSON is always accepted. TOML files need the `config-file` feature.

use std::rc::Rc;

#[cfg(feature = "config-file")]
use std::path::{Path, PathBuf};

use datamgr_core::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::manager::Manager;
use crate::records::{NoRecords, RecordSource};
use crate::{DEFAULT_GLOBAL_SCOPE, DEFAULT_ROOT};

/// Errors from loading a config or building a manager from it.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "config-file")]
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[cfg(feature = "config-file")]
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid {field} name {name:?}: {reason}")]
    InvalidName {
        field: &'static str,
        name: String,
        reason: &'static str,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Boot-time description of a [`Manager`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerConfig {
    /// First topic segment of every notification.
    pub root: String,
    /// Scope registered before all others.
    pub global_scope: String,
    /// Scopes registered in order after the global one.
    pub scopes: Vec<String>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            root: DEFAULT_ROOT.to_owned(),
            global_scope: DEFAULT_GLOBAL_SCOPE.to_owned(),
            scopes: Vec::new(),
        }
    }
}

impl ManagerConfig {
    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Parse a TOML config. Missing fields take their defaults.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Read a config file; `.json` files are parsed as JSON, anything else
    /// as TOML.
    #[cfg(feature = "config-file")]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }

    /// Append a scope name.
    #[must_use]
    pub fn with_scope(mut self, name: impl Into<String>) -> Self {
        self.scopes.push(name.into());
        self
    }

    /// Check every configured name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_name("root", &self.root)?;
        check_name("global scope", &self.global_scope)?;
        for scope in &self.scopes {
            check_name("scope", scope)?;
        }
        Ok(())
    }

    /// Build a manager without a record source.
    pub fn build(&self) -> Result<Manager, ConfigError> {
        self.build_with_records(NoRecords)
    }

    /// Build a manager whose bound entries look records up in `records`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidName`] for an unusable name, or
    /// [`StoreError::DuplicateScope`] (wrapped) when a scope is listed
    /// twice or repeats the global scope.
    pub fn build_with_records(
        &self,
        records: impl RecordSource + 'static,
    ) -> Result<Manager, ConfigError> {
        self.validate()?;
        let mut manager = Manager::from_parts(&self.root, &self.global_scope, Rc::new(records));
        for scope in &self.scopes {
            manager.register_scope(scope.as_str())?;
        }
        Ok(manager)
    }
}

fn check_name(field: &'static str, name: &str) -> Result<(), ConfigError> {
    let reason = if name.is_empty() {
        "empty"
    } else if name == "*" {
        "reserved for wildcard subscriptions"
    } else {
        return Ok(());
    };
    Err(ConfigError::InvalidName {
        field,
        name: name.to_owned(),
        reason,
    })
}
