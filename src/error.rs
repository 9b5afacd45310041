//! Error Taxonomy
//!
//! Every backend reports failures through [`StoreError`]. Each variant maps to
//! a stable string tag (see [`StoreError::tag`]) so callers can match on
//! identifiers that never change between releases, independent of the
//! human-readable message.
//!
//! ## Categories
//!
//! - **Input errors** (`InvalidKey`, `InvalidTtl`, `InvalidAmount`): caller
//!   misuse, detected before any mutation.
//! - **Type errors** (`NotInteger`): the stored value cannot take part in a
//!   counter operation.
//! - **Capacity errors** (`StoreFull`): the in-process store reached its
//!   configured `max_size`.
//! - **Lifecycle errors** (`ConnectionFailed`, `ClosingConnectionFailed`):
//!   network adapters only. The underlying failure is kept as the
//!   [`source`](std::error::Error::source).
//! - **Transport errors** (`Transport`): network adapters only, raised when an
//!   established connection breaks or the server replies with something the
//!   contract cannot express.

use thiserror::Error;

/// Boxed cause carried by lifecycle and transport errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by every [`KvStore`](crate::KvStore) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connecting to the backing server failed.
    #[error("connection failed")]
    ConnectionFailed(#[source] BoxError),

    /// Closing the connection to the backing server failed.
    #[error("closing connection failed")]
    ClosingConnectionFailed(#[source] BoxError),

    /// The increment/decrement amount is out of range.
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    /// The key is empty, too long or contains a null character.
    #[error("invalid key")]
    InvalidKey,

    /// The TTL is zero or exceeds the supported maximum.
    #[error("invalid ttl: {0} seconds")]
    InvalidTtl(u64),

    /// The stored value is not an integer, or the result is out of range.
    #[error("value is not an integer or out of range")]
    NotInteger,

    /// A new key cannot be inserted because the store is at capacity.
    #[error("store is full ({max_size} entries)")]
    StoreFull {
        /// The configured maximum number of entries
        max_size: usize,
    },

    /// I/O or protocol failure on an established connection.
    #[error("transport failure")]
    Transport(#[source] BoxError),
}

impl StoreError {
    /// Returns the stable identifier for this error.
    ///
    /// ```
    /// use unikv::StoreError;
    ///
    /// assert_eq!(StoreError::InvalidKey.tag(), "invalid_key");
    /// assert_eq!(StoreError::StoreFull { max_size: 2 }.tag(), "store_full");
    /// ```
    pub fn tag(&self) -> &'static str {
        match self {
            StoreError::ConnectionFailed(_) => "connection_failed",
            StoreError::ClosingConnectionFailed(_) => "closing_connection_failed",
            StoreError::InvalidAmount(_) => "invalid_amount",
            StoreError::InvalidKey => "invalid_key",
            StoreError::InvalidTtl(_) => "invalid_ttl",
            StoreError::NotInteger => "not_integer",
            StoreError::StoreFull { .. } => "store_full",
            StoreError::Transport(_) => "transport_failed",
        }
    }

    /// Returns `true` for errors caused by malformed caller input.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidKey | StoreError::InvalidTtl(_) | StoreError::InvalidAmount(_)
        )
    }

    /// Returns `true` if the store rejected a new key for lack of capacity.
    pub fn is_store_full(&self) -> bool {
        matches!(self, StoreError::StoreFull { .. })
    }

    pub(crate) fn transport(err: impl Into<BoxError>) -> Self {
        StoreError::Transport(err.into())
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
