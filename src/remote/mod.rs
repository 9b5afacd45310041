//! Network Adapter Module
//!
//! [`RespStore`] forwards the storage contract to a Redis-compatible server
//! over TCP.
//!
//! ```text
//!   KvStore call ──> validation ──> RespStore ──> Connection ──> [server]
//!                                       ▲             │
//!                                       └── reply ────┘
//! ```
//!
//! - `connection`: RESP framing over any async byte stream
//! - `store`: the contract mapping, lifecycle and value encoding

pub mod connection;
pub mod store;

#[cfg(test)]
mod test_server;

pub use connection::{Connection, ConnectionError};
pub use store::{ReplyError, RespStore, RespStoreConfig};
