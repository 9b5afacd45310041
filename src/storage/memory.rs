//! In-Process Store
//!
//! [`MemoryStore`] is the in-memory backend of the storage contract. It owns
//! an [`EntryTable`] and the [`ExpirySweeper`] that cleans it, validates every
//! input before touching the table, and tears both down when destroyed or
//! dropped.

use crate::error::Result;
use crate::storage::{EntryTable, ExpirySweeper, MemoryStoreConfig, StorageStats, TtlState};
use crate::store::KvStore;
use crate::validation::{validate_amount, validate_key, validate_optional_ttl, validate_ttl};
use crate::value::Value;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// In-memory key-value store with TTL support and active expiry.
///
/// Every operation completes without suspending. The inherent methods are
/// synchronous; the [`KvStore`] implementation wraps them for callers that
/// work against the contract.
///
/// # Example
///
/// ```
/// use unikv::{MemoryStore, MemoryStoreConfig, Value};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> unikv::Result<()> {
/// let store = MemoryStore::with_config(MemoryStoreConfig::default().with_max_size(1_000));
///
/// store.set("name", "Ariz", None)?;
/// assert_eq!(store.get("name")?, Some(Value::from("Ariz")));
///
/// store.set("hits", 5, Some(60))?;
/// assert_eq!(store.increment("hits", 1)?, 6);
/// assert_eq!(store.ttl("hits")?, 60);
///
/// store.destroy().await;
/// # Ok(())
/// # }
/// ```
pub struct MemoryStore {
    /// The entry table, shared with the sweeper task
    table: Arc<EntryTable>,

    /// Handle to the background sweep, taken on destroy
    sweeper: Mutex<Option<ExpirySweeper>>,

    /// Configuration the store was built with
    config: MemoryStoreConfig,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("table", &self.table)
            .field("config", &self.config)
            .finish()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates a store with default configuration.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime; the sweep needs one.
    pub fn new() -> Self {
        Self::with_config(MemoryStoreConfig::default())
    }

    /// Creates a store with custom configuration.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime; the sweep needs one.
    pub fn with_config(config: MemoryStoreConfig) -> Self {
        let table = Arc::new(EntryTable::new(config.max_size));
        let sweeper = ExpirySweeper::start(Arc::clone(&table), config.sweep_interval);

        Self {
            table,
            sweeper: Mutex::new(Some(sweeper)),
            config,
        }
    }

    /// Returns the configuration the store was built with.
    pub fn config(&self) -> &MemoryStoreConfig {
        &self.config
    }

    /// Returns the value stored at `key`, or `None` if absent or expired.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        validate_key(key)?;
        Ok(self.table.get(key))
    }

    /// Stores `value` at `key`, replacing any previous value and expiration.
    ///
    /// With `ttl_secs` the entry expires that many seconds from now; without
    /// it the entry never expires.
    pub fn set(&self, key: &str, value: impl Into<Value>, ttl_secs: Option<u64>) -> Result<()> {
        validate_key(key)?;
        let ttl = validate_optional_ttl(ttl_secs)?;

        self.table.set(key.to_string(), value.into(), ttl)?;
        Ok(())
    }

    /// Adds `amount` to the integer at `key`, keeping its expiration.
    pub fn increment(&self, key: &str, amount: i64) -> Result<i64> {
        validate_key(key)?;
        let amount = validate_amount(amount)?;

        self.table.update_counter(key, |n| n.checked_add(amount))
    }

    /// Subtracts `amount` from the integer at `key`, keeping its expiration.
    pub fn decrement(&self, key: &str, amount: i64) -> Result<i64> {
        validate_key(key)?;
        let amount = validate_amount(amount)?;

        self.table.update_counter(key, |n| n.checked_sub(amount))
    }

    /// Removes `key`. Returns whether a live entry was removed.
    pub fn del(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        Ok(self.table.delete(key))
    }

    /// Sets the expiration of an existing, unexpired key.
    pub fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool> {
        validate_key(key)?;
        let ttl = validate_ttl(ttl_secs)?;

        Ok(self.table.expire(key, ttl))
    }

    /// Returns the remaining seconds (rounded up) before `key` expires, or
    /// [`NO_TTL`](crate::NO_TTL) if it never expires *or does not exist*.
    pub fn ttl(&self, key: &str) -> Result<i64> {
        Ok(self.ttl_state(key)?.as_secs())
    }

    /// Like [`ttl`](Self::ttl), but tells a missing key from a persistent one.
    pub fn ttl_state(&self, key: &str) -> Result<TtlState> {
        validate_key(key)?;
        Ok(self.table.ttl_state(key))
    }

    /// Removes every entry and returns how many there were.
    pub fn clean(&self) -> u64 {
        let removed = self.table.clear();
        debug!(removed = removed, "Store cleaned");
        removed
    }

    /// Runs an expiry sweep right away and returns how many entries it removed.
    pub fn remove_expired(&self) -> u64 {
        self.table.remove_expired()
    }

    /// Returns the number of entries, including expired ones not yet removed.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StorageStats {
        self.table.stats()
    }

    /// Returns true while the background sweep is running.
    pub fn is_sweeping(&self) -> bool {
        self.lock_sweeper()
            .as_ref()
            .is_some_and(ExpirySweeper::is_running)
    }

    fn lock_sweeper(&self) -> std::sync::MutexGuard<'_, Option<ExpirySweeper>> {
        self.sweeper.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stops the background sweep, waits for it to finish and discards all
    /// entries.
    ///
    /// The store stays usable afterwards, with lazy expiry only. Calling this
    /// more than once is harmless.
    pub async fn destroy(&self) {
        let sweeper = self.lock_sweeper().take();
        if let Some(sweeper) = sweeper {
            sweeper.shutdown().await;
        }

        let removed = self.table.clear();
        debug!(removed = removed, "Store destroyed");
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        if let Some(sweeper) = self.lock_sweeper().take() {
            sweeper.stop();
        }
        self.table.clear();
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        MemoryStore::get(self, key)
    }

    async fn set(&self, key: &str, value: Value, ttl_secs: Option<u64>) -> Result<()> {
        MemoryStore::set(self, key, value, ttl_secs)
    }

    async fn increment(&self, key: &str, amount: i64) -> Result<i64> {
        MemoryStore::increment(self, key, amount)
    }

    async fn decrement(&self, key: &str, amount: i64) -> Result<i64> {
        MemoryStore::decrement(self, key, amount)
    }

    async fn del(&self, key: &str) -> Result<bool> {
        MemoryStore::del(self, key)
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool> {
        MemoryStore::expire(self, key, ttl_secs)
    }

    async fn ttl(&self, key: &str) -> Result<i64> {
        MemoryStore::ttl(self, key)
    }

    async fn clean(&self) -> Result<u64> {
        Ok(MemoryStore::clean(self))
    }
}
