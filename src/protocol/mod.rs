//! RESP Protocol Implementation
//!
//! The Redis Serialization Protocol (RESP2) as spoken by the network adapter:
//! commands go out as arrays of bulk strings, replies come back as any RESP
//! type.
//!
//! ## Modules
//!
//! - `types`: Defines the `RespValue` enum and serialization
//! - `parser`: Incremental parser for incoming replies
//!
//! ## Example
//!
//! ```
//! use unikv::protocol::{parse_message, RespValue};
//!
//! let request = RespValue::command(["GET", "name"]).serialize();
//! assert_eq!(request, b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n");
//!
//! let (reply, consumed) = parse_message(b"$4\r\nAriz\r\n").unwrap().unwrap();
//! assert_eq!(reply.as_str(), Some("Ariz"));
//! assert_eq!(consumed, 10);
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{parse_message, ParseError, ParseResult, RespParser};
pub use types::RespValue;
