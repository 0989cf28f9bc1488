//! # simplymail
//!
//! Blocking mail operations with flat, message-only error types.
//!
//! - [`fetch_inbox_top`]: the newest message in `INBOX`, or `None`
//! - [`send_plain_text_email`] and [`send_html_email`]: submit one message
//!   and return the server's final reply as an [`SmtpResponse`]
//! - [`check_imap`] and [`check_smtp`]: verify that credentials are accepted
//!
//! Every call opens its own connection on its own single-threaded runtime
//! and closes it before returning, so calls from different threads never
//! share anything. The `*_with_config` variants take an [`ImapConfig`] or
//! [`SmtpConfig`] for custom timeouts and security modes.
//!
//! Failures are reported as [`ImapError`] and [`SmtpError`]: closed enums
//! whose variants carry only a message.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::collections::HashMap;
//!
//! if let Some(message) = simplymail::fetch_inbox_top("imap.example.com", 993, "me", "pw")? {
//!     println!("{message}");
//! }
//!
//! let headers = HashMap::from([
//!     ("From".to_string(), "me@example.com".to_string()),
//!     ("To".to_string(), "you@example.com".to_string()),
//!     ("Subject".to_string(), "Hello".to_string()),
//! ]);
//! let reply = simplymail::send_plain_text_email("smtp.example.com", "me", "pw", &headers, "Hi!")?;
//! assert_eq!(reply.severity, 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
mod imap;
mod runtime;
mod smtp;

pub use error::{ImapError, SmtpError};
pub use imap::{check_imap, check_imap_with_config, fetch_inbox_top, fetch_inbox_top_with_config};
pub use smtp::{
    check_smtp, check_smtp_with_config, send_html_email, send_html_email_with_config,
    send_plain_text_email, send_plain_text_email_with_config,
};

pub use simplymail_imap::{Config as ImapConfig, Security as ImapSecurity};
pub use simplymail_smtp::{Config as SmtpConfig, Security as SmtpSecurity, SmtpResponse};
