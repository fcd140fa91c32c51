//! Namespace prefixing.
//!
//! Every storage key and every server action name is written as
//! `namespace-key`, so that several toolkits can share one page and one
//! storage origin without colliding.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Key used when no key is given.
const GLOBAL_KEY: &str = "global";

/// An immutable namespace, set once at initialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    /// Create a namespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The bare namespace.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix `key`, falling back to `global` when the key is absent or empty.
    pub fn apply(&self, key: Option<&str>) -> String {
        let key = key.filter(|k| !k.is_empty()).unwrap_or(GLOBAL_KEY);
        format!("{}-{}", self.0, key)
    }

    /// The prefix every namespaced key starts with.
    pub fn prefix(&self) -> String {
        format!("{}-", self.0)
    }

    /// Check whether `key` was produced by this namespace.
    ///
    /// Ownership is a prefix test, so `acme` also owns every key of a
    /// namespace such as `acme-pro`. Sites sharing a store should not pick
    /// one name that is the other plus a dash and a suffix.
    pub fn owns(&self, key: &str) -> bool {
        key.strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.starts_with('-'))
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
