//! # simplymail-mime
//!
//! MIME generation for outgoing mail.
//!
//! ## Features
//!
//! - **Message building**: required `From`/`To`/`Subject`, generated
//!   `Date`, `Message-ID` and MIME headers, caller headers in stable order
//! - **Multipart**: a plain body gives a single-part message; adding an HTML
//!   body gives `multipart/alternative` with a boundary that occurs in
//!   neither body
//! - **Encoding**: Quoted-Printable bodies, RFC 2047 encoded headers
//!
//! ## Quick Start
//!
//! ```
//! use simplymail_mime::MessageBuilder;
//!
//! let message = MessageBuilder::new()
//!     .header("From", "sender@example.com")
//!     .header("To", "recipient@example.com")
//!     .header("Subject", "Test Message")
//!     .text_body("Hello, World!")
//!     .build()?;
//!
//! let wire = message.to_bytes();
//! assert!(wire.ends_with(b"\r\n\r\nHello, World!\r\n"));
//! # Ok::<(), simplymail_mime::Error>(())
//! ```
//!
//! ### Encoding
//!
//! ```
//! use simplymail_mime::encoding::{encode_quoted_printable, encode_rfc2047};
//!
//! assert_eq!(encode_quoted_printable("Héllo"), "H=C3=A9llo");
//! assert_eq!(encode_rfc2047("Héllo", "utf-8"), "=?utf-8?B?SMOpbGxv?=");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod builder;
mod content_type;
mod error;
mod header;
mod message;

pub mod encoding;

pub use builder::{MessageBuilder, generate_boundary};
pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Body, Message, Part, TransferEncoding};
