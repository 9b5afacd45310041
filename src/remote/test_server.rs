//! In-memory RESP server for adapter tests.
//!
//! Speaks just enough of the Redis command set to exercise [`RespStore`]
//! over a real loopback socket.
//!
//! [`RespStore`]: crate::RespStore

use crate::protocol::RespValue;
use crate::remote::connection::Connection;
use bytes::Bytes;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};

type Db = HashMap<Bytes, (Bytes, Option<Instant>)>;

#[derive(Clone, Copy)]
enum Mode {
    /// Executes commands
    Normal,
    /// Answers every command with an auth error
    Rejecting,
    /// Answers PING, then hangs up on the next command
    HangingUp,
    /// Executes commands, waiting before every reply
    Delaying(Duration),
}

/// Starts a working server and returns its address.
pub(crate) async fn spawn() -> SocketAddr {
    spawn_with(Mode::Normal).await
}

/// Starts a server that refuses every command.
pub(crate) async fn spawn_rejecting() -> SocketAddr {
    spawn_with(Mode::Rejecting).await
}

/// Starts a server that drops the connection after the handshake.
pub(crate) async fn spawn_hanging_up() -> SocketAddr {
    spawn_with(Mode::HangingUp).await
}

/// Starts a working server that holds each reply for `delay`.
pub(crate) async fn spawn_delaying(delay: Duration) -> SocketAddr {
    spawn_with(Mode::Delaying(delay)).await
}

async fn spawn_with(mode: Mode) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let db = Arc::new(Mutex::new(Db::new()));

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve(stream, Arc::clone(&db), mode));
        }
    });

    addr
}

async fn serve(stream: TcpStream, db: Arc<Mutex<Db>>, mode: Mode) {
    let mut conn = Connection::new(stream);
    let mut handshake_done = false;

    while let Ok(request) = conn.read_reply().await {
        let Some(args) = request.into_array() else {
            break;
        };
        let args: Vec<Bytes> = args
            .into_iter()
            .filter_map(|arg| match arg {
                RespValue::BulkString(b) => Some(b),
                _ => None,
            })
            .collect();
        let name = args
            .first()
            .map(|n| String::from_utf8_lossy(n).to_ascii_uppercase())
            .unwrap_or_default();

        let reply = match mode {
            Mode::Rejecting => RespValue::error("NOAUTH Authentication required."),
            Mode::HangingUp if handshake_done => break,
            _ => execute(&db, &name, args.get(1..).unwrap_or_default()),
        };
        handshake_done = true;

        if let Mode::Delaying(delay) = mode {
            tokio::time::sleep(delay).await;
        }

        if conn.send(&reply).await.is_err() || name == "QUIT" {
            break;
        }
    }
}

fn execute(db: &Mutex<Db>, name: &str, args: &[Bytes]) -> RespValue {
    let now = Instant::now();
    let mut db = db.lock().unwrap();
    db.retain(|_, (_, expires_at)| expires_at.map_or(true, |at| at > now));

    match (name, args) {
        ("PING", _) => RespValue::simple_string("PONG"),
        ("QUIT", _) => RespValue::ok(),
        ("GET", [key]) => match db.get(key) {
            Some((value, _)) => RespValue::BulkString(value.clone()),
            None => RespValue::Null,
        },
        ("SET", [key, value]) => {
            db.insert(key.clone(), (value.clone(), None));
            RespValue::ok()
        }
        ("SET", [key, value, ex, secs]) if ex.eq_ignore_ascii_case(b"EX") => {
            let Some(secs) = parse_int(secs) else {
                return RespValue::error("ERR value is not an integer or out of range");
            };
            let expires_at = now + Duration::from_secs(secs as u64);
            db.insert(key.clone(), (value.clone(), Some(expires_at)));
            RespValue::ok()
        }
        ("INCRBY" | "DECRBY", [key, amount]) => {
            let current = match db.get(key) {
                Some((value, _)) => parse_int(value),
                None => Some(0),
            };
            let (Some(current), Some(amount)) = (current, parse_int(amount)) else {
                return RespValue::error("ERR value is not an integer or out of range");
            };
            let result = if name == "INCRBY" {
                current.checked_add(amount)
            } else {
                current.checked_sub(amount)
            };
            let Some(result) = result else {
                return RespValue::error("ERR increment or decrement would overflow");
            };

            let expires_at = db.get(key).and_then(|(_, at)| *at);
            db.insert(key.clone(), (Bytes::from(result.to_string()), expires_at));
            RespValue::Integer(result)
        }
        ("DEL", keys) if !keys.is_empty() => {
            let removed = keys.iter().filter(|key| db.remove(*key).is_some()).count();
            RespValue::Integer(removed as i64)
        }
        ("EXPIRE", [key, secs]) => match (db.get_mut(key), parse_int(secs)) {
            (Some(entry), Some(secs)) => {
                entry.1 = Some(now + Duration::from_secs(secs as u64));
                RespValue::Integer(1)
            }
            _ => RespValue::Integer(0),
        },
        ("TTL", [key]) => match db.get(key) {
            None => RespValue::Integer(-2),
            Some((_, None)) => RespValue::Integer(-1),
            Some((_, Some(at))) => {
                let millis = at.saturating_duration_since(now).as_millis();
                RespValue::Integer(millis.div_ceil(1000) as i64)
            }
        },
        ("KEYS", [pattern]) if pattern[..] == b"*"[..] => RespValue::Array(
            db.keys()
                .map(|key| RespValue::BulkString(key.clone()))
                .collect(),
        ),
        _ => RespValue::error(format!("ERR unknown command '{}'", name)),
    }
}

fn parse_int(data: &[u8]) -> Option<i64> {
    std::str::from_utf8(data).ok()?.parse().ok()
}
