//! Network-Backed Store
//!
//! [`RespStore`] implements the storage contract against any server that
//! speaks RESP2 (Redis, Valkey, KeyDB, FlashKV, ...). Each contract operation
//! becomes exactly one round trip, except `clean`, which needs two.
//!
//! | Operation   | Command                | Reply mapping                   |
//! |-------------|------------------------|---------------------------------|
//! | `get`       | `GET key`              | null → `None`                   |
//! | `set`       | `SET key value [EX s]` | `+OK`                           |
//! | `increment` | `INCRBY key n`         | new value                       |
//! | `decrement` | `DECRBY key n`         | new value                       |
//! | `del`       | `DEL key`              | `1` → `true`                    |
//! | `expire`    | `EXPIRE key s`         | `1` → `true`                    |
//! | `ttl`       | `TTL key`              | `-2` (missing) → [`NO_TTL`]     |
//! | `clean`     | `KEYS *`, `DEL k...`   | number deleted                  |
//!
//! Values travel as bulk strings. Integers, booleans and null are written as
//! their literal text (`42`, `true`, `null`) and read back the same way, so a
//! text value that looks like one of those literals comes back typed.
//!
//! A failed round trip drops the connection; there is no automatic
//! reconnect or retry. Call [`connect`](KvStore::connect) again to recover.
//! An operation cancelled while waiting for its reply counts as a failed
//! round trip: the next call drops the connection and reports a transport
//! error instead of reading the stale reply.

use crate::error::{Result, StoreError};
use crate::protocol::RespValue;
use crate::remote::connection::Connection;
use crate::store::{KvStore, NO_TTL};
use crate::validation::{validate_amount, validate_key, validate_optional_ttl, validate_ttl};
use crate::value::Value;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:6379";

/// Default time allowed for the TCP handshake
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// TTL reply for a key that does not exist
const TTL_MISSING: i64 = -2;

/// Configuration for a [`RespStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RespStoreConfig {
    /// Server address, `host:port` (default: 127.0.0.1:6379)
    pub addr: String,

    /// Time allowed for the TCP handshake (default: 5 seconds)
    pub connect_timeout: Duration,
}

impl Default for RespStoreConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl RespStoreConfig {
    /// Creates a configuration for the server at `addr`.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Self::default()
        }
    }

    /// Sets the time allowed for the TCP handshake.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Failures reported by the server, or replies the contract cannot express.
///
/// Carried as the [`source`](std::error::Error::source) of
/// [`StoreError::Transport`] and the lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    /// The server answered with an error reply
    #[error("server error: {0}")]
    Server(String),

    /// The reply type does not fit the command
    #[error("unexpected {kind} reply to {command}")]
    Unexpected {
        /// Command that received the reply
        command: &'static str,

        /// RESP type of the reply, as named by [`RespValue::kind`]
        kind: &'static str,
    },

    /// A command was issued without an open connection
    #[error("not connected")]
    NotConnected,
}

/// Key-value store backed by a RESP server.
///
/// # Example
///
/// ```no_run
/// use unikv::{KvStore, RespStore, RespStoreConfig, Value};
///
/// # #[tokio::main]
/// # async fn main() -> unikv::Result<()> {
/// let store = RespStore::new(RespStoreConfig::new("127.0.0.1:6379"));
/// store.connect().await?;
///
/// store.set("greeting", Value::from("hello"), Some(60)).await?;
/// assert_eq!(store.get("greeting").await?, Some(Value::from("hello")));
///
/// store.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RespStore {
    /// Configuration the store was built with
    config: RespStoreConfig,

    /// The open connection; commands are serialized through this lock
    conn: Mutex<Option<Connection<TcpStream>>>,
}

impl RespStore {
    /// Creates an unconnected store.
    pub fn new(config: RespStoreConfig) -> Self {
        Self {
            config,
            conn: Mutex::new(None),
        }
    }

    /// Returns the configuration the store was built with.
    pub fn config(&self) -> &RespStoreConfig {
        &self.config
    }

    /// Returns true while a connection is open.
    pub async fn is_connected(&self) -> bool {
        self.conn.lock().await.is_some()
    }

    /// Sends one command and returns its reply, with error replies mapped.
    ///
    /// Any connection error, including a request abandoned by an earlier
    /// cancelled call, drops the connection.
    async fn call(&self, args: Vec<Bytes>) -> Result<RespValue> {
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| StoreError::transport(ReplyError::NotConnected))?;

        match conn.request(&RespValue::command(args)).await {
            Ok(RespValue::Error(msg)) => Err(server_error(msg)),
            Ok(reply) => Ok(reply),
            Err(e) => {
                warn!(addr = %self.config.addr, error = %e, "Connection to server lost");
                *guard = None;
                Err(StoreError::transport(e))
            }
        }
    }

    async fn call_integer(&self, command: &'static str, args: Vec<Bytes>) -> Result<i64> {
        match self.call(args).await? {
            RespValue::Integer(n) => Ok(n),
            other => Err(unexpected(command, &other)),
        }
    }
}

#[async_trait]
impl KvStore for RespStore {
    /// Opens the TCP connection and checks it with `PING`.
    ///
    /// Does nothing if a connection is already open.
    async fn connect(&self) -> Result<()> {
        let mut guard = self.conn.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let addr = &self.config.addr;
        let stream = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(addr.as_str()))
            .await
            .map_err(|elapsed| StoreError::ConnectionFailed(Box::new(elapsed)))?
            .map_err(|e| StoreError::ConnectionFailed(Box::new(e)))?;

        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "Could not disable Nagle's algorithm");
        }

        let mut conn = Connection::new(stream);
        match conn.request(&RespValue::command(["PING"])).await {
            Ok(RespValue::Error(msg)) => {
                return Err(StoreError::ConnectionFailed(Box::new(ReplyError::Server(msg))));
            }
            Ok(_) => {}
            Err(e) => return Err(StoreError::ConnectionFailed(Box::new(e))),
        }

        info!(addr = %addr, "Connected to server");
        *guard = Some(conn);
        Ok(())
    }

    /// Sends `QUIT` and drops the connection.
    ///
    /// Does nothing if no connection is open.
    async fn close(&self) -> Result<()> {
        let Some(mut conn) = self.conn.lock().await.take() else {
            return Ok(());
        };

        let reply = conn
            .request(&RespValue::command(["QUIT"]))
            .await
            .map_err(|e| StoreError::ClosingConnectionFailed(Box::new(e)))?;
        if let RespValue::Error(msg) = reply {
            return Err(StoreError::ClosingConnectionFailed(Box::new(
                ReplyError::Server(msg),
            )));
        }

        // The server closes its side after QUIT
        if let Err(e) = conn.shutdown().await {
            debug!(error = %e, "Shutdown after QUIT failed");
        }

        info!(addr = %self.config.addr, "Disconnected from server");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        validate_key(key)?;

        match self.call(vec![Bytes::from_static(b"GET"), arg(key)]).await? {
            RespValue::Null => Ok(None),
            RespValue::BulkString(data) => Ok(Some(decode_value(data))),
            other => Err(unexpected("GET", &other)),
        }
    }

    async fn set(&self, key: &str, value: Value, ttl_secs: Option<u64>) -> Result<()> {
        validate_key(key)?;
        let ttl = validate_optional_ttl(ttl_secs)?;

        let mut args = vec![Bytes::from_static(b"SET"), arg(key), encode_value(value)];
        if let Some(ttl) = ttl {
            args.push(Bytes::from_static(b"EX"));
            args.push(Bytes::from(ttl.as_secs().to_string()));
        }

        match self.call(args).await? {
            RespValue::SimpleString(_) => Ok(()),
            other => Err(unexpected("SET", &other)),
        }
    }

    async fn increment(&self, key: &str, amount: i64) -> Result<i64> {
        validate_key(key)?;
        let amount = validate_amount(amount)?;

        let args = vec![
            Bytes::from_static(b"INCRBY"),
            arg(key),
            Bytes::from(amount.to_string()),
        ];
        self.call_integer("INCRBY", args).await
    }

    async fn decrement(&self, key: &str, amount: i64) -> Result<i64> {
        validate_key(key)?;
        let amount = validate_amount(amount)?;

        let args = vec![
            Bytes::from_static(b"DECRBY"),
            arg(key),
            Bytes::from(amount.to_string()),
        ];
        self.call_integer("DECRBY", args).await
    }

    async fn del(&self, key: &str) -> Result<bool> {
        validate_key(key)?;

        let removed = self
            .call_integer("DEL", vec![Bytes::from_static(b"DEL"), arg(key)])
            .await?;
        Ok(removed > 0)
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool> {
        validate_key(key)?;
        let ttl = validate_ttl(ttl_secs)?;

        let args = vec![
            Bytes::from_static(b"EXPIRE"),
            arg(key),
            Bytes::from(ttl.as_secs().to_string()),
        ];
        Ok(self.call_integer("EXPIRE", args).await? == 1)
    }

    async fn ttl(&self, key: &str) -> Result<i64> {
        validate_key(key)?;

        let ttl = self
            .call_integer("TTL", vec![Bytes::from_static(b"TTL"), arg(key)])
            .await?;
        Ok(if ttl == TTL_MISSING { NO_TTL } else { ttl })
    }

    async fn clean(&self) -> Result<u64> {
        let keys = match self
            .call(vec![Bytes::from_static(b"KEYS"), Bytes::from_static(b"*")])
            .await?
        {
            RespValue::Array(keys) => keys,
            other => return Err(unexpected("KEYS", &other)),
        };

        if keys.is_empty() {
            return Ok(0);
        }

        let mut args = Vec::with_capacity(keys.len() + 1);
        args.push(Bytes::from_static(b"DEL"));
        for key in keys {
            match key {
                RespValue::BulkString(key) => args.push(key),
                other => return Err(unexpected("KEYS", &other)),
            }
        }

        let removed = self.call_integer("DEL", args).await?;
        debug!(removed = removed, "Server keyspace cleaned");
        Ok(removed.max(0) as u64)
    }
}

fn arg(s: &str) -> Bytes {
    Bytes::copy_from_slice(s.as_bytes())
}

fn unexpected(command: &'static str, reply: &RespValue) -> StoreError {
    StoreError::transport(ReplyError::Unexpected {
        command,
        kind: reply.kind(),
    })
}

/// Maps an error reply onto the taxonomy.
///
/// Counter failures (`ERR value is not an integer or out of range`,
/// `ERR increment or decrement would overflow`) become
/// [`StoreError::NotInteger`]; everything else is a transport failure.
fn server_error(msg: String) -> StoreError {
    if msg.contains("not an integer") || msg.contains("would overflow") {
        StoreError::NotInteger
    } else {
        StoreError::transport(ReplyError::Server(msg))
    }
}

/// Writes a value as its wire text.
fn encode_value(value: Value) -> Bytes {
    match value {
        Value::Null => Bytes::from_static(b"null"),
        Value::Bool(true) => Bytes::from_static(b"true"),
        Value::Bool(false) => Bytes::from_static(b"false"),
        Value::Integer(n) => Bytes::from(n.to_string()),
        Value::Text(s) => Bytes::from(s),
        Value::Bytes(b) => b,
    }
}

/// Reads a value back from its wire text.
fn decode_value(data: Bytes) -> Value {
    if let Ok(text) = std::str::from_utf8(&data) {
        return match text {
            "null" => Value::Null,
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => match text.parse::<i64>() {
                // Only canonical literals; "007" and "+5" stay text
                Ok(n) if n.to_string() == text => Value::Integer(n),
                _ => Value::Text(text.to_string()),
            },
        };
    }
    Value::Bytes(data)
}
