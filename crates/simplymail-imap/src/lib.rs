//! # simplymail-imap
//!
//! A small IMAP client (RFC 3501) built for one job: log in, open a mailbox
//! and fetch its newest message.
//!
//! ## Features
//!
//! - **Type-state connection management**: Compile-time enforcement of valid
//!   IMAP state transitions (`NotAuthenticated` → `Authenticated` → `Selected`)
//! - **TLS via rustls**: implicit TLS (port 993) or STARTTLS, verified against
//!   the platform root store
//! - **Literal-aware framing**: [`ResponseDecoder`] consumes `{n}` literals as
//!   exactly `n` raw bytes, CRLFs included, before resuming line mode
//! - **Sans-I/O parser**: Protocol parsing separated from network I/O
//!
//! ## Quick Start
//!
//! ```ignore
//! use simplymail_imap::{Client, Config};
//! use simplymail_imap::connection::connect;
//!
//! #[tokio::main]
//! async fn main() -> simplymail_imap::Result<()> {
//!     let config = Config::new("imap.example.com");
//!     let stream = connect(&config).await?;
//!
//!     let greeting = Client::from_stream(stream, config.io_timeout).await?;
//!     let client = greeting.login("user@example.com", "password").await?;
//!
//!     let mut client = client.examine("INBOX").await?;
//!     println!("Messages: {}", client.selected().exists());
//!
//!     if let Some(message) = client.fetch_newest().await? {
//!         println!("{}", String::from_utf8_lossy(&message));
//!     }
//!
//!     client.logout().await
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! greeting ── * OK ──────→ NotAuthenticated ── login() ──→ Authenticated
//!          └─ * PREAUTH ─────────────────────────────────→ Authenticated
//!
//! Authenticated ── examine() ──→ Selected ── fetch_newest()
//! ```
//!
//! ## Modules
//!
//! - [`command`]: IMAP command builders and types
//! - [`connection`]: Connection management and type-state client
//! - [`parser`]: Sans-I/O response parser
//! - [`types`]: Core IMAP types (flags, capabilities, identifiers, etc.)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use command::{Command, FetchAttribute, TagGenerator};
pub use connection::{
    Authenticated, Client, Config, ConfigBuilder, FramedStream, Greeting, ImapStream,
    NotAuthenticated, ResponseAccumulator, ResponseDecoder, Security, Selected,
};
pub use error::{Error, Result};
pub use parser::{FetchItem, Response, ResponseParser, UntaggedResponse};
pub use types::{
    Capability, Flag, Flags, MailboxStatus, ResponseCode, SeqNum, Status, Tag, Uid, UidValidity,
};
