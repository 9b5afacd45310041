//! The Storage Contract
//!
//! [`KvStore`] is the operation set every backend exposes. Callers depend on
//! the trait (usually as `Arc<dyn KvStore>`) and never on a concrete backend,
//! so the in-process [`MemoryStore`](crate::MemoryStore) and the network-backed
//! [`RespStore`](crate::RespStore) are interchangeable.
//!
//! ## Semantics shared by all backends
//!
//! | Operation   | Result                                                    |
//! |-------------|-----------------------------------------------------------|
//! | `get`       | value if present and unexpired, otherwise `None`          |
//! | `set`       | overwrites value *and* expiration (no TTL = never expires)|
//! | `increment` | `current + amount`, keeps the existing expiration         |
//! | `decrement` | `current - amount`, keeps the existing expiration         |
//! | `del`       | `true` if an unexpired key was removed                    |
//! | `expire`    | `true` if an unexpired key got a new expiration           |
//! | `ttl`       | remaining whole seconds (rounded up) or [`NO_TTL`]        |
//! | `clean`     | number of keys removed, expired ones included             |
//!
//! All inputs are validated before the backend is touched (see
//! [`validation`](crate::validation)).

use crate::error::Result;
use crate::value::Value;
use async_trait::async_trait;

/// Returned by [`KvStore::ttl`] when a key has no expiration.
///
/// **This value is also returned for a key that does not exist.** The two
/// cases are deliberately conflated for compatibility with the in-process
/// store's historical behaviour; backends that can tell them apart (such as
/// Redis, which answers `-2` for missing keys) fold both into `-1`. Use
/// [`MemoryStore::ttl_state`](crate::MemoryStore::ttl_state) when the
/// distinction matters.
pub const NO_TTL: i64 = -1;

/// Uniform key-value storage interface.
///
/// Every method may suspend: the in-process store completes immediately,
/// network adapters wait on the wire.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Opens the backend. A no-op for in-process stores.
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    /// Releases the backend. A no-op for in-process stores.
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Returns the value stored at `key`, or `None` if it is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Stores `value` at `key`, expiring after `ttl_secs` seconds if given.
    async fn set(&self, key: &str, value: Value, ttl_secs: Option<u64>) -> Result<()>;

    /// Adds `amount` to the integer at `key` and returns the new value.
    ///
    /// A missing or expired key starts from `0` and never expires.
    async fn increment(&self, key: &str, amount: i64) -> Result<i64>;

    /// Subtracts `amount` from the integer at `key` and returns the new value.
    async fn decrement(&self, key: &str, amount: i64) -> Result<i64>;

    /// Removes `key`. Returns whether it existed.
    async fn del(&self, key: &str) -> Result<bool>;

    /// Sets the expiration of an existing key. Returns `false` if the key is
    /// absent or already expired.
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool>;

    /// Returns the remaining lifetime of `key` in seconds, or [`NO_TTL`].
    async fn ttl(&self, key: &str) -> Result<i64>;

    /// Removes every key and returns how many were removed.
    async fn clean(&self) -> Result<u64>;

    /// Increments `key` by one.
    async fn incr(&self, key: &str) -> Result<i64> {
        self.increment(key, 1).await
    }

    /// Decrements `key` by one.
    async fn decr(&self, key: &str) -> Result<i64> {
        self.decrement(key, 1).await
    }
}
