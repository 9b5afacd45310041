//! Entry Table with Expiry Support
//!
//! This module implements the storage table behind the in-process store: a
//! map from key to [`Entry`] guarded by a single `RwLock`, with lazy expiry,
//! counter updates that keep an entry's expiration, and an optional capacity
//! bound.
//!
//! ## Design Decisions
//!
//! 1. **One table, one lock**: the capacity bound needs an exact entry count,
//!    so the check and the insert happen under the same write lock.
//! 2. **Read fast path**: lookups take a read lock and only upgrade to a write
//!    lock when they find an expired entry to remove.
//! 3. **Lazy expiry**: every lookup compares `expires_at` with the current
//!    instant and deletes the entry on the spot if it has passed.
//! 4. **Mockable clock**: instants come from `tokio::time`, so tests can pause
//!    and advance time instead of sleeping.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 EntryTable                   │
//! │   RwLock<HashMap<String, Entry>>             │
//! │   ┌─────────┐ ┌─────────┐ ┌─────────┐        │
//! │   │ "a" → E │ │ "b" → E │ │ "c" → E │  ...   │
//! │   └─────────┘ └─────────┘ └─────────┘        │
//! └──────────────────────────────────────────────┘
//!        ▲ lazy check on access   ▲ remove_expired() from the sweeper
//! ```

use crate::error::{Result, StoreError};
use crate::value::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Represents a stored value with optional expiry time.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// The actual value stored
    pub value: Value,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
}

impl Entry {
    /// Creates a new entry without expiry.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Creates a new entry that expires `ttl` from now.
    pub fn with_ttl(value: Value, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Some(Instant::now() + ttl),
        }
    }

    /// Checks if this entry has expired.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    #[inline]
    fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    /// Describes the remaining lifetime of this entry.
    pub fn ttl_state(&self) -> TtlState {
        match self.expires_at {
            None => TtlState::Persistent,
            Some(exp) => {
                let now = Instant::now();
                if now >= exp {
                    TtlState::Missing
                } else {
                    TtlState::Expires(exp - now)
                }
            }
        }
    }
}

/// Remaining lifetime of a key, with "missing" and "no expiration" kept apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlState {
    /// The key does not exist (or has just expired).
    Missing,
    /// The key exists and never expires.
    Persistent,
    /// The key exists and expires after this duration.
    Expires(Duration),
}

impl TtlState {
    /// Converts to the contract's integer form: whole seconds rounded up, or
    /// [`NO_TTL`](crate::NO_TTL) for both `Missing` and `Persistent`.
    pub fn as_secs(&self) -> i64 {
        match self {
            TtlState::Missing | TtlState::Persistent => crate::NO_TTL,
            TtlState::Expires(remaining) => {
                let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
                i64::try_from(secs).unwrap_or(i64::MAX)
            }
        }
    }
}

/// The table holding every entry of an in-process store.
///
/// Designed to be shared through an `Arc` between the store and its sweeper.
/// All operations are thread-safe.
///
/// # Example
///
/// ```
/// use unikv::storage::EntryTable;
/// use unikv::Value;
/// use std::time::Duration;
///
/// let table = EntryTable::new(None);
///
/// table.set("name".into(), Value::from("Ariz"), None).unwrap();
/// assert_eq!(table.get("name"), Some(Value::from("Ariz")));
///
/// table.set("session".into(), Value::from("abc123"), Some(Duration::from_secs(60))).unwrap();
/// ```
pub struct EntryTable {
    /// Key to entry mapping
    data: RwLock<HashMap<String, Entry>>,

    /// Upper bound on the number of entries (None = unbounded)
    max_size: Option<usize>,

    /// Statistics: total GET operations
    get_count: AtomicU64,

    /// Statistics: total write operations (set, increment, decrement)
    set_count: AtomicU64,

    /// Statistics: total DEL operations
    del_count: AtomicU64,

    /// Statistics: number of expired keys removed, lazily or by a sweep
    expired_count: AtomicU64,
}

impl std::fmt::Debug for EntryTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryTable")
            .field("keys", &self.len())
            .field("max_size", &self.max_size)
            .field("get_count", &self.get_count.load(Ordering::Relaxed))
            .field("set_count", &self.set_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for EntryTable {
    fn default() -> Self {
        Self::new(None)
    }
}

impl EntryTable {
    /// Creates an empty table, optionally bounded to `max_size` entries.
    pub fn new(max_size: Option<usize>) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            max_size,
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Entry>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Entry>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_expired(&self, count: u64) {
        self.expired_count.fetch_add(count, Ordering::Relaxed);
    }

    /// Fails with `StoreFull` if inserting one more key would exceed `max_size`.
    fn ensure_capacity(&self, data: &HashMap<String, Entry>) -> Result<()> {
        match self.max_size {
            Some(max_size) if data.len() >= max_size => Err(StoreError::StoreFull { max_size }),
            _ => Ok(()),
        }
    }

    /// Looks up a live entry and projects it through `f`.
    ///
    /// An expired entry is removed and reported as absent.
    fn lookup<T>(&self, key: &str, f: impl Fn(&Entry) -> T) -> Option<T> {
        // Fast path: read lock only
        {
            let data = self.read();
            match data.get(key) {
                Some(entry) if !entry.is_expired() => return Some(f(entry)),
                Some(_) => {}
                None => return None,
            }
        }

        // Key exists but is expired - need write lock to remove it
        let mut data = self.write();
        match data.get(key) {
            Some(entry) if entry.is_expired() => {
                data.remove(key);
                self.record_expired(1);
                None
            }
            // Race: another thread may have replaced the key meanwhile
            Some(entry) => Some(f(entry)),
            None => None,
        }
    }

    /// Gets the value for a key.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.get_count.fetch_add(1, Ordering::Relaxed);
        self.lookup(key, |entry| entry.value.clone())
    }

    /// Gets a copy of the full entry for a key (including expiry).
    pub fn get_entry(&self, key: &str) -> Option<Entry> {
        self.lookup(key, Entry::clone)
    }

    /// Sets a key-value pair, replacing any previous value and expiration.
    ///
    /// # Returns
    ///
    /// Returns `true` if a new key was created, `false` if an existing key was updated.
    ///
    /// # Errors
    ///
    /// `StoreFull` if the key is new and the table is at capacity.
    pub fn set(&self, key: String, value: Value, ttl: Option<Duration>) -> Result<bool> {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let entry = match ttl {
            Some(ttl) => Entry::with_ttl(value, ttl),
            None => Entry::new(value),
        };

        let mut data = self.write();
        let is_new = !data.contains_key(&key);
        if is_new {
            self.ensure_capacity(&data)?;
        }
        data.insert(key, entry);

        Ok(is_new)
    }

    /// Applies `op` to the integer stored at `key` and returns the result.
    ///
    /// - A live entry must hold an `Integer` (or `Null`, read as 0). Its
    ///   expiration is left untouched.
    /// - A missing or expired key starts from 0 and the new entry never expires.
    /// - `op` returning `None` means the result is out of range.
    ///
    /// No mutation happens on error, apart from dropping an expired entry.
    pub fn update_counter(&self, key: &str, op: impl FnOnce(i64) -> Option<i64>) -> Result<i64> {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let mut data = self.write();
        let now = Instant::now();

        if let Some(entry) = data.get_mut(key) {
            if !entry.is_expired_at(now) {
                let current = entry.value.counter().ok_or(StoreError::NotInteger)?;
                let updated = op(current).ok_or(StoreError::NotInteger)?;
                entry.value = Value::Integer(updated);
                return Ok(updated);
            }

            data.remove(key);
            self.record_expired(1);
        }

        let updated = op(0).ok_or(StoreError::NotInteger)?;
        self.ensure_capacity(&data)?;
        data.insert(key.to_string(), Entry::new(Value::Integer(updated)));

        Ok(updated)
    }

    /// Deletes a key.
    ///
    /// # Returns
    ///
    /// Returns `true` if a live key was deleted, `false` if it didn't exist or
    /// had already expired.
    pub fn delete(&self, key: &str) -> bool {
        self.del_count.fetch_add(1, Ordering::Relaxed);

        match self.write().remove(key) {
            Some(entry) if entry.is_expired() => {
                self.record_expired(1);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Checks if a key exists (and is not expired).
    pub fn exists(&self, key: &str) -> bool {
        self.read().get(key).is_some_and(|e| !e.is_expired())
    }

    /// Sets an expiry time on an existing key, replacing any previous one.
    ///
    /// # Returns
    ///
    /// Returns `true` if the expiry was set, `false` if the key doesn't exist
    /// or has expired.
    pub fn expire(&self, key: &str, ttl: Duration) -> bool {
        let mut data = self.write();

        if let Some(entry) = data.get_mut(key) {
            if entry.is_expired() {
                data.remove(key);
                self.record_expired(1);
                return false;
            }
            entry.expires_at = Some(Instant::now() + ttl);
            true
        } else {
            false
        }
    }

    /// Returns the remaining lifetime of a key.
    pub fn ttl_state(&self, key: &str) -> TtlState {
        self.lookup(key, Entry::ttl_state)
            .unwrap_or(TtlState::Missing)
    }

    /// Removes every entry, expired or not.
    ///
    /// # Returns
    ///
    /// Returns the number of entries removed.
    pub fn clear(&self) -> u64 {
        let mut data = self.write();
        let removed = data.len() as u64;
        data.clear();
        removed
    }

    /// Removes every expired entry.
    ///
    /// This is called by the background expiry sweeper.
    ///
    /// # Returns
    ///
    /// Returns the number of keys that were cleaned up.
    pub fn remove_expired(&self) -> u64 {
        let now = Instant::now();
        let mut data = self.write();
        let before = data.len();

        data.retain(|_, entry| !entry.is_expired_at(now));

        let removed = (before - data.len()) as u64;
        if removed > 0 {
            self.record_expired(removed);
        }
        removed
    }

    /// Returns the number of entries, including expired ones not yet removed.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the configured capacity, if any.
    pub fn max_size(&self) -> Option<usize> {
        self.max_size
    }

    /// Returns table statistics.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.len() as u64,
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }
}

/// Table statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of keys currently stored
    pub keys: u64,
    /// Total GET operations
    pub get_ops: u64,
    /// Total write operations
    pub set_ops: u64,
    /// Total DEL operations
    pub del_ops: u64,
    /// Total expired keys removed
    pub expired: u64,
}
