//! Incremental RESP Reply Parser
//!
//! Replies arrive over TCP in arbitrary fragments, so the parser never blocks
//! and never consumes partial input. It reads from a buffer and returns either:
//!
//! - `Ok(Some((value, consumed)))` - a complete value, `consumed` bytes were used
//! - `Ok(None)` - the reply is incomplete, wait for more data
//! - `Err(ParseError)` - the peer sent something that is not RESP
//!
//! The caller appends incoming data to a buffer, calls [`RespParser::parse`],
//! and advances the buffer by `consumed` once a value comes back.
//!
//! Parsing happens in two passes. A framing scan walks the buffer without
//! allocating and remembers how far it got, so each new read only scans the
//! new bytes. Once the scan finds the end of a reply, the reply is decoded
//! in a single pass.

use crate::protocol::types::{prefix, RespValue, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur during RESP parsing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Unknown type prefix byte
    #[error("unknown type prefix: {0:#04x}")]
    UnknownPrefix(u8),

    /// Invalid integer format
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Invalid UTF-8 in a line
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Bulk string length is negative (but not -1 for null)
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// Array length is negative (but not -1 for null)
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// Protocol violation (missing CRLF, nesting too deep)
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// A bulk string exceeds the maximum allowed size
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array nesting depth
pub const MAX_NESTING_DEPTH: usize = 32;

/// An incremental RESP parser.
///
/// # Example
///
/// ```
/// use unikv::protocol::{RespParser, RespValue};
/// use bytes::{Buf, BytesMut};
///
/// let mut parser = RespParser::new();
/// let mut buffer = BytesMut::from(&b"$4\r\nAriz\r\n+OK"[..]);
///
/// let (value, consumed) = parser.parse(&buffer).unwrap().unwrap();
/// buffer.advance(consumed);
/// assert_eq!(value, RespValue::bulk_string("Ariz"));
///
/// // The status reply is still missing its CRLF
/// assert!(parser.parse(&buffer).unwrap().is_none());
/// ```
#[derive(Debug, Default)]
pub struct RespParser {
    /// Current nesting depth (for array parsing)
    depth: usize,

    /// Bytes at the front of the buffer already framed by the scan
    scanned: usize,

    /// Elements still expected by each open array, innermost last
    open_arrays: Vec<usize>,
}

impl RespParser {
    /// Creates a new parser instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to parse one RESP value from the front of `buf`.
    ///
    /// After `Ok(None)`, call again with the same buffer plus newly received
    /// bytes; scanning resumes where it stopped. The parser starts over
    /// after it returns a value or an error, or after [`reset`](Self::reset).
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        let frame_len = match self.scan(buf) {
            Ok(Some(len)) => len,
            Ok(None) => return Ok(None),
            Err(e) => {
                self.reset();
                return Err(e);
            }
        };

        self.reset();
        self.parse_value(&buf[..frame_len])
    }

    /// Forgets any partially scanned reply.
    pub fn reset(&mut self) {
        self.depth = 0;
        self.scanned = 0;
        self.open_arrays.clear();
    }

    /// Finds the length of the first complete value in `buf`.
    ///
    /// Continues from `self.scanned`. Bulk payloads are skipped by their
    /// declared length, never searched.
    fn scan(&mut self, buf: &[u8]) -> ParseResult<Option<usize>> {
        loop {
            let rest = buf.get(self.scanned..).unwrap_or_default();
            let Some(&first) = rest.first() else {
                return Ok(None);
            };

            let (used, children) = match first {
                prefix::SIMPLE_STRING | prefix::ERROR | prefix::INTEGER => {
                    match find_crlf(&rest[1..]) {
                        Some(pos) => (1 + pos + CRLF.len(), 0),
                        None => return Ok(None),
                    }
                }
                prefix::BULK_STRING => {
                    let Some((length, header)) = read_header(rest)? else {
                        return Ok(None);
                    };
                    let total = header + checked_bulk_len(length)?.map_or(0, |n| n + CRLF.len());
                    if rest.len() < total {
                        return Ok(None);
                    }
                    (total, 0)
                }
                prefix::ARRAY => {
                    let Some((count, header)) = read_header(rest)? else {
                        return Ok(None);
                    };
                    if count < -1 {
                        return Err(ParseError::InvalidArrayLength(count));
                    }
                    if count >= 0 && self.open_arrays.len() >= MAX_NESTING_DEPTH {
                        return Err(nesting_error());
                    }
                    (header, count.max(0) as usize)
                }
                other => return Err(ParseError::UnknownPrefix(other)),
            };

            self.scanned += used;
            if children > 0 {
                self.open_arrays.push(children);
                continue;
            }

            // A value ended; close every array it completes
            loop {
                let Some(remaining) = self.open_arrays.last_mut() else {
                    return Ok(Some(self.scanned));
                };
                *remaining -= 1;
                if *remaining > 0 {
                    break;
                }
                self.open_arrays.pop();
            }
        }
    }

    fn parse_value(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        let Some(&first) = buf.first() else {
            return Ok(None);
        };

        match first {
            prefix::SIMPLE_STRING => Ok(read_line(buf)?
                .map(|(line, used)| (RespValue::SimpleString(line.to_string()), used))),
            prefix::ERROR => {
                Ok(read_line(buf)?.map(|(line, used)| (RespValue::Error(line.to_string()), used)))
            }
            prefix::INTEGER => match read_line(buf)? {
                Some((line, used)) => Ok(Some((RespValue::Integer(parse_int(line)?), used))),
                None => Ok(None),
            },
            prefix::BULK_STRING => self.parse_bulk_string(buf),
            prefix::ARRAY => self.parse_array(buf),
            other => Err(ParseError::UnknownPrefix(other)),
        }
    }

    /// Parses a bulk string: `$<length>\r\n<data>\r\n`
    fn parse_bulk_string(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        let Some((length, header)) = read_header(buf)? else {
            return Ok(None);
        };
        let Some(length) = checked_bulk_len(length)? else {
            return Ok(Some((RespValue::Null, header)));
        };

        let total = header + length + CRLF.len();
        if buf.len() < total {
            return Ok(None);
        }
        if &buf[header + length..total] != CRLF {
            return Err(ParseError::ProtocolError(
                "bulk string missing trailing CRLF".to_string(),
            ));
        }

        let data = Bytes::copy_from_slice(&buf[header..header + length]);
        Ok(Some((RespValue::BulkString(data), total)))
    }

    /// Parses an array: `*<count>\r\n<elements...>`
    fn parse_array(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        let Some((count, mut consumed)) = read_header(buf)? else {
            return Ok(None);
        };

        if count == -1 {
            return Ok(Some((RespValue::Null, consumed)));
        }
        if count < 0 {
            return Err(ParseError::InvalidArrayLength(count));
        }

        if self.depth >= MAX_NESTING_DEPTH {
            return Err(nesting_error());
        }

        // Cap the preallocation; the count comes from the peer
        let mut elements = Vec::with_capacity((count as usize).min(1024));

        self.depth += 1;
        for _ in 0..count {
            match self.parse_value(&buf[consumed..])? {
                Some((value, used)) => {
                    elements.push(value);
                    consumed += used;
                }
                None => {
                    self.depth -= 1;
                    return Ok(None);
                }
            }
        }
        self.depth -= 1;

        Ok(Some((RespValue::Array(elements), consumed)))
    }
}

/// Reads the line following the prefix byte.
///
/// Returns the line content and the bytes used, prefix and CRLF included.
fn read_line(buf: &[u8]) -> ParseResult<Option<(&str, usize)>> {
    match find_crlf(&buf[1..]) {
        Some(pos) => {
            let line = std::str::from_utf8(&buf[1..1 + pos])
                .map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;
            Ok(Some((line, 1 + pos + CRLF.len())))
        }
        None => Ok(None),
    }
}

/// Reads a `<prefix><integer>\r\n` header.
fn read_header(buf: &[u8]) -> ParseResult<Option<(i64, usize)>> {
    match read_line(buf)? {
        Some((line, used)) => Ok(Some((parse_int(line)?, used))),
        None => Ok(None),
    }
}

/// Checks a declared bulk length; `None` is the null bulk string.
fn checked_bulk_len(length: i64) -> ParseResult<Option<usize>> {
    if length == -1 {
        return Ok(None);
    }
    if length < 0 {
        return Err(ParseError::InvalidBulkLength(length));
    }

    let length = length as usize;
    if length > MAX_BULK_SIZE {
        return Err(ParseError::MessageTooLarge {
            size: length,
            max: MAX_BULK_SIZE,
        });
    }
    Ok(Some(length))
}

fn nesting_error() -> ParseError {
    ParseError::ProtocolError(format!(
        "maximum nesting depth exceeded: {}",
        MAX_NESTING_DEPTH
    ))
}

fn parse_int(line: &str) -> ParseResult<i64> {
    line.parse()
        .map_err(|_| ParseError::InvalidInteger(line.to_string()))
}

/// Finds the position of CRLF in the buffer.
///
/// Returns the position of `\r` if found, or None if CRLF is not present.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|window| window == CRLF)
}

/// Parses a single RESP value from bytes with a fresh parser.
pub fn parse_message(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    RespParser::new().parse(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_string() {
        let (value, consumed) = parse_message(b"+OK\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::SimpleString("OK".to_string()));
        assert_eq!(consumed, 5);
    }

    #[test]
    fn test_parse_incomplete_line() {
        assert!(parse_message(b"+OK").unwrap().is_none());
        assert!(parse_message(b"+OK\r").unwrap().is_none());
        assert!(parse_message(b":12").unwrap().is_none());
        assert!(parse_message(b"").unwrap().is_none());
    }

    #[test]
    fn test_parse_error() {
        let input = b"-ERR value is not an integer or out of range\r\n";
        let (value, consumed) = parse_message(input).unwrap().unwrap();
        assert_eq!(
            value.as_error(),
            Some("ERR value is not an integer or out of range")
        );
        assert_eq!(consumed, input.len());
    }

    #[test]
    fn test_parse_integer() {
        let (value, consumed) = parse_message(b":1000\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::Integer(1000));
        assert_eq!(consumed, 7);

        let (value, _) = parse_message(b":-2\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::Integer(-2));
    }

    #[test]
    fn test_parse_bulk_string() {
        let (value, consumed) = parse_message(b"$5\r\nhello\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::BulkString(Bytes::from("hello")));
        assert_eq!(consumed, 11);
    }

    #[test]
    fn test_parse_null_bulk_string() {
        let (value, consumed) = parse_message(b"$-1\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::Null);
        assert_eq!(consumed, 5);
    }

    #[test]
    fn test_parse_empty_bulk_string() {
        let (value, consumed) = parse_message(b"$0\r\n\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::BulkString(Bytes::new()));
        assert_eq!(consumed, 6);
    }

    #[test]
    fn test_parse_bulk_string_incomplete() {
        assert!(parse_message(b"$5\r\nhel").unwrap().is_none());
        assert!(parse_message(b"$5\r\nhello").unwrap().is_none());
    }

    #[test]
    fn test_parse_bulk_string_bad_terminator() {
        assert!(matches!(
            parse_message(b"$2\r\nhello\r\n"),
            Err(ParseError::ProtocolError(_))
        ));
        assert!(matches!(
            parse_message(b"$-5\r\n"),
            Err(ParseError::InvalidBulkLength(-5))
        ));
    }

    #[test]
    fn test_binary_safe_bulk_string() {
        let (value, _) = parse_message(b"$5\r\nhel\x00o\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::BulkString(Bytes::from(&b"hel\x00o"[..])));
    }

    #[test]
    fn test_parse_array() {
        let input = b"*2\r\n$1\r\na\r\n$1\r\nb\r\n";
        let (value, consumed) = parse_message(input).unwrap().unwrap();
        assert_eq!(
            value,
            RespValue::Array(vec![RespValue::bulk_string("a"), RespValue::bulk_string("b")])
        );
        assert_eq!(consumed, input.len());
    }

    #[test]
    fn test_parse_null_and_empty_array() {
        assert_eq!(parse_message(b"*-1\r\n").unwrap().unwrap().0, RespValue::Null);
        assert_eq!(
            parse_message(b"*0\r\n").unwrap().unwrap().0,
            RespValue::Array(vec![])
        );
    }

    #[test]
    fn test_parse_array_incomplete() {
        assert!(parse_message(b"*2\r\n$1\r\na\r\n").unwrap().is_none());
        assert!(parse_message(b"*2\r\n").unwrap().is_none());
    }

    #[test]
    fn test_parse_nested_array() {
        let (value, _) = parse_message(b"*2\r\n:1\r\n*2\r\n:2\r\n:3\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(
            value,
            RespValue::Array(vec![
                RespValue::Integer(1),
                RespValue::Array(vec![RespValue::Integer(2), RespValue::Integer(3)]),
            ])
        );
    }

    #[test]
    fn test_nesting_limit() {
        let input = b"*1\r\n".repeat(MAX_NESTING_DEPTH + 1);
        assert!(matches!(
            parse_message(&input),
            Err(ParseError::ProtocolError(_))
        ));
    }

    #[test]
    fn test_unknown_prefix() {
        assert_eq!(
            parse_message(b"@invalid\r\n"),
            Err(ParseError::UnknownPrefix(b'@'))
        );
    }

    #[test]
    fn test_parse_invalid_integer() {
        assert!(matches!(
            parse_message(b":not_a_number\r\n"),
            Err(ParseError::InvalidInteger(_))
        ));
    }

    #[test]
    fn test_resumes_scan_across_reads() {
        let input = b"*3\r\n$5\r\nalpha\r\n$4\r\nbeta\r\n$5\r\ngamma\r\n";
        let mut parser = RespParser::new();

        // Two elements are framed; the scan stops at the third
        let partial = &input[..input.len() - 4];
        assert!(parser.parse(partial).unwrap().is_none());
        assert_eq!(parser.scanned, 25);
        assert_eq!(parser.open_arrays, vec![1]);

        // Feeding byte by byte never rescans the framed prefix
        for end in partial.len() + 1..input.len() {
            assert!(parser.parse(&input[..end]).unwrap().is_none());
            assert_eq!(parser.scanned, 25);
        }

        let (value, consumed) = parser.parse(input).unwrap().unwrap();
        assert_eq!(consumed, input.len());
        assert_eq!(
            value,
            RespValue::Array(vec![
                RespValue::bulk_string("alpha"),
                RespValue::bulk_string("beta"),
                RespValue::bulk_string("gamma"),
            ])
        );
        assert_eq!(parser.scanned, 0);
        assert!(parser.open_arrays.is_empty());
    }

    #[test]
    fn test_bulk_payload_is_skipped_by_length() {
        // CRLF inside the payload does not end the frame
        let input = b"*2\r\n$4\r\na\r\nb\r\n:7\r\n";
        let mut parser = RespParser::new();

        assert!(parser.parse(&input[..12]).unwrap().is_none());
        let (value, consumed) = parser.parse(input).unwrap().unwrap();
        assert_eq!(consumed, input.len());
        assert_eq!(
            value,
            RespValue::Array(vec![RespValue::bulk_string("a\r\nb"), RespValue::Integer(7)])
        );
    }

    #[test]
    fn test_error_resets_scan() {
        let mut parser = RespParser::new();
        assert!(parser.parse(b"*2\r\n:1\r\n").unwrap().is_none());
        assert!(matches!(
            parser.parse(b"*2\r\n:1\r\n?\r\n"),
            Err(ParseError::UnknownPrefix(b'?'))
        ));

        let (value, _) = parser.parse(b"+OK\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::ok());
    }

    #[test]
    fn test_parser_reuse_across_messages() {
        let mut parser = RespParser::new();
        let input = b"*1\r\n:1\r\n+OK\r\n";

        let (first, used) = parser.parse(input).unwrap().unwrap();
        assert_eq!(first, RespValue::Array(vec![RespValue::Integer(1)]));

        let (second, _) = parser.parse(&input[used..]).unwrap().unwrap();
        assert_eq!(second, RespValue::ok());
    }
}
