//! # simplymail-smtp
//!
//! A small SMTP submission client (RFC 5321) built for one job: deliver a
//! single message to an authenticated relay.
//!
//! ## Features
//!
//! - **Type-state connection management**: the compiler rejects commands
//!   issued in the wrong session state
//! - **TLS**: implicit TLS (port 465) and STARTTLS, verified against the
//!   platform root store
//! - **Authentication**: PLAIN, with LOGIN as a fallback
//! - **Sans-I/O reply parsing**: [`parser::ReplyAccumulator`] turns lines
//!   into [`Reply`] values, and [`SmtpResponse`] exposes the three code digits
//!
//! ## Quick Start
//!
//! ```ignore
//! use simplymail_smtp::{Address, Client, Config};
//! use simplymail_smtp::connection::open;
//!
//! #[tokio::main]
//! async fn main() -> simplymail_smtp::Result<()> {
//!     let config = Config::from_server("smtp.example.com:587")?;
//!     let stream = open(&config).await?;
//!
//!     let client = Client::from_stream(stream).await?;
//!     let client = client.ehlo(&config.client_hostname).await?;
//!     let client = client.starttls(&config.client_hostname).await?;
//!     let client = client.authenticate("user@example.com", "password").await?;
//!
//!     let client = client
//!         .mail_from(Address::new("sender@example.com")?, None)
//!         .await?;
//!     let client = client.rcpt_to(Address::new("rcpt@example.com")?).await?;
//!     let client = client.data().await?;
//!
//!     let (client, reply) = client
//!         .send_message(b"Subject: Test\r\n\r\nHello, World!\r\n")
//!         .await?;
//!     println!("{}", simplymail_smtp::SmtpResponse::from(&reply));
//!     client.quit().await
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    Authenticated, Client, Completed, Config, ConfigBuilder, Data, Ehlo, Greeted,
    MailTransaction, RecipientAdded, Security, ServerInfo, SessionState, SmtpConnection,
    SmtpStream, TlsState,
};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Extension, Mailbox, Reply, ReplyCode, SmtpResponse};
