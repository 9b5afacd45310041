//! # unikv - One Key-Value Contract, Several Backends
//!
//! unikv defines a small storage contract ([`KvStore`]) and ships two
//! interchangeable backends for it: an in-process store with TTL support and
//! an adapter for Redis-compatible servers. Callers program against the
//! trait and pick the backend at startup.
//!
//! ## Features
//!
//! - **Uniform Contract**: `get`, `set`, `increment`, `decrement`, `del`,
//!   `expire`, `ttl`, `clean` behave the same on every backend
//! - **TTL Support**: Keys expire lazily on access and actively in the background
//! - **TTL-Preserving Counters**: Incrementing a key keeps its expiration
//! - **Capacity Guard**: Optional cap on the number of in-process entries
//! - **Stable Error Tags**: Every failure maps to a fixed identifier
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Arc<dyn KvStore>                                 │
//! │                               │                                         │
//! │                  ┌────────────┴────────────┐                            │
//! │                  ▼                         ▼                            │
//! │  ┌───────────────────────────┐   ┌───────────────────────────┐          │
//! │  │       MemoryStore         │   │        RespStore          │          │
//! │  │   validation + config     │   │   validation + mapping    │          │
//! │  │  ┌─────────────────────┐  │   │  ┌─────────────────────┐  │          │
//! │  │  │     EntryTable      │  │   │  │     Connection      │  │          │
//! │  │  │  RwLock<HashMap>    │  │   │  │  BufWriter + RESP   │  │          │
//! │  │  └─────────▲───────────┘  │   │  └─────────┬───────────┘  │          │
//! │  │            │              │   │            │              │          │
//! │  │  ┌─────────┴───────────┐  │   │            ▼              │          │
//! │  │  │   ExpirySweeper     │  │   │    Redis-compatible       │          │
//! │  │  │ (Background Task)   │  │   │        server             │          │
//! │  │  └─────────────────────┘  │   │                           │          │
//! │  └───────────────────────────┘   └───────────────────────────┘          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use unikv::{KvStore, MemoryStore, MemoryStoreConfig, Value, NO_TTL};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> unikv::Result<()> {
//! let store: Arc<dyn KvStore> = Arc::new(MemoryStore::with_config(
//!     MemoryStoreConfig::default().with_max_size(10_000),
//! ));
//! store.connect().await?;
//!
//! store.set("user:101", Value::from("Ariz"), None).await?;
//! store.set("visits", Value::from(5), Some(3600)).await?;
//!
//! assert_eq!(store.incr("visits").await?, 6);
//! assert_eq!(store.ttl("visits").await?, 3600);
//! assert_eq!(store.ttl("user:101").await?, NO_TTL);
//!
//! store.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`store`]: The [`KvStore`] trait shared by all backends
//! - [`storage`]: In-process store, entry table and expiry sweeper
//! - [`remote`]: Adapter for Redis-compatible servers
//! - [`protocol`]: RESP types and parser used by the adapter
//! - [`validation`]: Key, TTL and amount checks
//! - [`error`]: The error taxonomy and its stable tags
//!
//! ## Design Highlights
//!
//! ### Lazy + Active Expiry
//!
//! Keys with TTL are expired in two ways:
//! 1. **Lazy**: When a key is accessed, we check if it's expired
//! 2. **Active**: A background task periodically removes expired keys
//!
//! This ensures memory is reclaimed even for keys that are never accessed again.
//!
//! ### Validate First
//!
//! Every operation validates its input before touching storage, so a rejected
//! call never leaves partial state behind.

pub mod error;
pub mod protocol;
pub mod remote;
pub mod storage;
pub mod store;
pub mod validation;
pub mod value;

// Re-export commonly used types for convenience
pub use error::{Result, StoreError};
pub use remote::{RespStore, RespStoreConfig};
pub use storage::{MemoryStore, MemoryStoreConfig, TtlState};
pub use store::{KvStore, NO_TTL};
pub use value::Value;

/// Version of unikv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
