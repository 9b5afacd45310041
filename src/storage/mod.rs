//! Storage Engine Module
//!
//! This module provides the in-process backend of the storage contract: a
//! thread-safe entry table with TTL support, the background sweeper that
//! cleans it, and the [`MemoryStore`] facade that validates input and ties
//! the two together.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      MemoryStore                            │
//! │        (validation, capacity config, teardown)              │
//! │  ┌───────────────────────────────────────────────────────┐  │
//! │  │                    EntryTable                         │  │
//! │  │   RwLock<HashMap<String, Entry { value, expires_at }>> │  │
//! │  └───────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │
//!              ┌─────────────┴─────────────┐
//!              │     ExpirySweeper         │
//!              │  (Background Tokio Task)  │
//!              └───────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **RwLock**: Multiple concurrent readers, exclusive writers
//! - **TTL Support**: Keys can have time-to-live expiry
//! - **Lazy Expiry**: Expired keys are removed on access
//! - **Active Expiry**: Background sweeper removes orphaned expired keys
//! - **Capacity Guard**: Optional cap on the number of entries
//!
//! ## Example
//!
//! ```
//! use unikv::storage::EntryTable;
//! use unikv::Value;
//! use std::time::Duration;
//!
//! let table = EntryTable::new(None);
//!
//! table.set("name".into(), Value::from("Ariz"), None).unwrap();
//! assert_eq!(table.get("name"), Some(Value::from("Ariz")));
//!
//! table
//!     .set("session".into(), Value::from("token123"), Some(Duration::from_secs(3600)))
//!     .unwrap();
//! assert!(table.exists("session"));
//! ```

pub mod config;
pub mod engine;
pub mod expiry;
pub mod memory;

// Re-export commonly used types
pub use config::MemoryStoreConfig;
pub use engine::{Entry, EntryTable, StorageStats, TtlState};
pub use expiry::ExpirySweeper;
pub use memory::MemoryStore;
