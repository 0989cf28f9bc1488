//! Turns framed responses into typed values without touching the network.
//!
//! [`Lexer`] splits one response into tokens; [`ResponseParser`] applies the
//! grammar for the responses this client meets while logging in, opening a
//! mailbox and fetching.
//!
//! # Example
//!
//! ```
//! use simplymail_imap::Status;
//! use simplymail_imap::parser::{Response, ResponseParser, UntaggedResponse};
//!
//! let input = b"* OK IMAP4rev1 server ready\r\n";
//! let response = ResponseParser::parse(input).unwrap();
//!
//! match response {
//!     Response::Untagged(UntaggedResponse::Status { status: Status::Ok, text, .. }) => {
//!         assert!(text.contains("IMAP4rev1"));
//!     }
//!     _ => panic!("Expected untagged OK"),
//! }
//! ```

pub mod lexer;
pub mod response;

pub use lexer::{Lexer, Token};
pub use response::{
    FetchItem, MessagePart, Response, ResponseParser, UntaggedResponse, message_content,
};
