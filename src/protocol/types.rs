//! RESP (Redis Serialization Protocol) Data Types
//!
//! The network adapter writes commands as arrays of bulk strings and reads
//! back one reply per command. Each RESP type starts with a prefix byte:
//!
//! - `+` Simple String
//! - `-` Error
//! - `:` Integer
//! - `$` Bulk String
//! - `*` Array
//!
//! All types are terminated with CRLF (`\r\n`).
//!
//! ## Examples
//!
//! Command: `*2\r\n$3\r\nGET\r\n$4\r\nname\r\n`
//! Status reply: `+OK\r\n`
//! Error reply: `-ERR value is not an integer or out of range\r\n`
//! Null reply: `$-1\r\n`

use bytes::Bytes;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A value in the RESP protocol, used for outgoing commands and incoming
/// replies alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Status reply such as `OK` or `PONG`.
    /// Format: `+<string>\r\n`
    SimpleString(String),

    /// Error reply; the first word is the error kind (`ERR`, `WRONGTYPE`, ...).
    /// Format: `-<error message>\r\n`
    Error(String),

    /// 64-bit signed integer.
    /// Format: `:<integer>\r\n`
    Integer(i64),

    /// Binary-safe string.
    /// Format: `$<length>\r\n<data>\r\n`
    BulkString(Bytes),

    /// Null bulk string (`$-1\r\n`) or null array (`*-1\r\n`)
    Null,

    /// Ordered list of values.
    /// Format: `*<count>\r\n<element1><element2>...`
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Builds a command: an array of bulk strings.
    ///
    /// # Example
    /// ```
    /// use unikv::protocol::RespValue;
    ///
    /// let cmd = RespValue::command(["SET", "name", "Ariz"]);
    /// assert_eq!(cmd.serialize(), b"*3\r\n$3\r\nSET\r\n$4\r\nname\r\n$4\r\nAriz\r\n");
    /// ```
    pub fn command<I, A>(args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Bytes>,
    {
        RespValue::Array(
            args.into_iter()
                .map(|arg| RespValue::BulkString(arg.into()))
                .collect(),
        )
    }

    /// Creates a simple string.
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    /// Creates an error reply.
    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    /// Creates a bulk string.
    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(data.into())
    }

    /// The `+OK` status reply.
    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    /// Serializes the value to bytes for sending over the wire.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the value into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            RespValue::SimpleString(s) => {
                buf.push(prefix::SIMPLE_STRING);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            RespValue::Error(s) => {
                buf.push(prefix::ERROR);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            RespValue::Integer(n) => {
                buf.push(prefix::INTEGER);
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(CRLF);
            }
            RespValue::BulkString(data) => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            RespValue::Null => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
            RespValue::Array(values) => {
                buf.push(prefix::ARRAY);
                buf.extend_from_slice(values.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                for value in values {
                    value.serialize_into(buf);
                }
            }
        }
    }

    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, RespValue::Null)
    }

    /// Returns the message of an error reply.
    pub fn as_error(&self) -> Option<&str> {
        match self {
            RespValue::Error(msg) => Some(msg),
            _ => None,
        }
    }

    /// Returns the text of a simple string, or of a UTF-8 bulk string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RespValue::SimpleString(s) => Some(s),
            RespValue::BulkString(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Returns the inner integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RespValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Consumes self and returns the inner array if this is an Array variant.
    pub fn into_array(self) -> Option<Vec<RespValue>> {
        match self {
            RespValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RespValue::SimpleString(_) => "simple string",
            RespValue::Error(_) => "error",
            RespValue::Integer(_) => "integer",
            RespValue::BulkString(_) => "bulk string",
            RespValue::Null => "null",
            RespValue::Array(_) => "array",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_serialize() {
        let value = RespValue::command(["GET", "name"]);
        assert_eq!(value.serialize(), b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n");
    }

    #[test]
    fn test_command_is_binary_safe() {
        let value = RespValue::command(vec![
            Bytes::from_static(b"SET"),
            Bytes::from_static(b"k"),
            Bytes::from_static(b"a\r\nb"),
        ]);
        assert_eq!(
            value.serialize(),
            b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$4\r\na\r\nb\r\n"
        );
    }

    #[test]
    fn test_error_serialize() {
        let value = RespValue::error("ERR unknown command");
        assert_eq!(value.serialize(), b"-ERR unknown command\r\n");
    }

    #[test]
    fn test_integer_serialize() {
        assert_eq!(RespValue::Integer(1000).serialize(), b":1000\r\n");
        assert_eq!(RespValue::Integer(-42).serialize(), b":-42\r\n");
    }

    #[test]
    fn test_null_serialize() {
        assert_eq!(RespValue::Null.serialize(), b"$-1\r\n");
    }

    #[test]
    fn test_nested_array_serialize() {
        let value = RespValue::Array(vec![
            RespValue::Integer(1),
            RespValue::Array(vec![RespValue::Integer(2), RespValue::Integer(3)]),
        ]);
        assert_eq!(value.serialize(), b"*2\r\n:1\r\n*2\r\n:2\r\n:3\r\n");
    }

    #[test]
    fn test_accessors() {
        assert_eq!(RespValue::ok().as_str(), Some("OK"));
        assert_eq!(RespValue::bulk_string("v").as_str(), Some("v"));
        assert_eq!(RespValue::error("ERR x").as_error(), Some("ERR x"));
        assert_eq!(RespValue::Integer(3).as_integer(), Some(3));
        assert_eq!(RespValue::Null.kind(), "null");
        assert!(RespValue::Null.is_null());
    }
}
