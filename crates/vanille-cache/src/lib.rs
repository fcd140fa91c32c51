//! Namespaced, expiring key/value cache.
//!
//! Short-lived UI state ("which tab was active") has to survive a page reload
//! without living forever. [`TtlCache`] stores values under namespaced keys in
//! a string-valued [`KeyValueStore`], tagging each with an optional expiry that
//! is checked lazily on read.

mod clock;
mod file;
mod store;
mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use file::FileStore;
pub use store::{KeyValueStore, MemoryStore, StoreError};
pub use ttl::{CacheEntry, Expiry, TtlCache};
