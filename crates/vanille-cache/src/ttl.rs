//! The expiring cache.

use crate::{Clock, KeyValueStore, StoreError, SystemClock};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use vanille_core::Namespace;

/// When an entry stops being readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Never,
    /// Milliseconds since the Unix epoch.
    At(u64),
}

impl Expiry {
    fn is_past(self, now_millis: u64) -> bool {
        match self {
            Self::Never => false,
            Self::At(at) => now_millis >= at,
        }
    }
}

/// Stored as `false` for entries that never expire, or a millisecond timestamp.
impl Serialize for Expiry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Never => serializer.serialize_bool(false),
            Self::At(at) => serializer.serialize_u64(*at),
        }
    }
}

impl<'de> Deserialize<'de> for Expiry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Flag(bool),
            At(u64),
        }

        Ok(match Option::<Repr>::deserialize(deserializer)? {
            Some(Repr::At(at)) => Self::At(at),
            Some(Repr::Flag(_)) | None => Self::Never,
        })
    }
}

/// One stored value with its expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: Value,
    #[serde(rename = "ttl")]
    pub expires_at: Expiry,
}

/// Namespaced wrapper over a [`KeyValueStore`] with lazy expiry.
///
/// Expiry is only checked when an entry is read: an expired entry is deleted
/// by the `get` that finds it. There is no background sweep.
#[derive(Clone)]
pub struct TtlCache {
    namespace: Namespace,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl TtlCache {
    pub fn new(namespace: Namespace, store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(namespace, store, Arc::new(SystemClock))
    }

    pub fn with_clock(
        namespace: Namespace,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            namespace,
            store,
            clock,
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn key(&self, key: &str) -> String {
        self.namespace.apply(Some(key))
    }

    /// Store `value` under `key`. Without a TTL (or with a zero TTL) the entry
    /// never expires.
    pub fn put<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let expires_at = match ttl.filter(|t| !t.is_zero()) {
            Some(ttl) => {
                let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
                Expiry::At(self.clock.now_millis().saturating_add(millis))
            }
            None => Expiry::Never,
        };
        let entry = CacheEntry {
            value: serde_json::to_value(value)?,
            expires_at,
        };
        self.store.set_item(&self.key(key), &serde_json::to_string(&entry)?)
    }

    /// Read the raw value under `key`, deleting it if it has expired or
    /// cannot be decoded.
    pub fn get_value(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let key = self.key(key);
        let Some(raw) = self.store.get_item(&key)? else {
            return Ok(None);
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(%key, error = %e, "dropping undecodable cache entry");
                self.store.remove_item(&key)?;
                return Ok(None);
            }
        };

        if entry.expires_at.is_past(self.clock.now_millis()) {
            tracing::debug!(%key, "cache entry expired");
            self.store.remove_item(&key)?;
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    /// Read and decode the value under `key`. A value of the wrong shape reads
    /// as absent but is left in place.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(value) = self.get_value(key)? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                tracing::warn!(key, error = %e, "cache entry has unexpected shape");
                Ok(None)
            }
        }
    }

    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.store.remove_item(&self.key(key))
    }

    /// Clear the entire underlying store, including keys written by other
    /// namespaces. Use [`TtlCache::purge_namespace`] to clear only this one.
    pub fn purge_all(&self) -> Result<(), StoreError> {
        tracing::debug!(namespace = %self.namespace, "purging entire store");
        self.store.clear()
    }

    /// Remove every key carrying this cache's namespace. Returns how many
    /// were removed.
    ///
    /// Keys of a namespace that extends this one with a dash (`acme-pro` for
    /// `acme`) match the prefix and are removed as well.
    pub fn purge_namespace(&self) -> Result<usize, StoreError> {
        let keys: Vec<String> = self
            .store
            .keys()?
            .into_iter()
            .filter(|k| self.namespace.owns(k))
            .collect();
        for key in &keys {
            self.store.remove_item(key)?;
        }
        Ok(keys.len())
    }
}
