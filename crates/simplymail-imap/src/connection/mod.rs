//! IMAP connection management.
//!
//! This module provides connection handling for IMAP servers, including:
//! - Configuration (host, port, security mode, timeouts)
//! - TLS/plaintext stream abstraction
//! - Framed I/O with literal-aware response decoding
//! - Type-state connection wrapper
//! - One-shot sessions for fetching the newest message

mod client;
mod config;
mod framed;
mod session;
mod stream;

pub use client::{Authenticated, Client, Greeting, NotAuthenticated, Selected};
pub use config::{Config, ConfigBuilder, Security};
pub use framed::{FramedStream, ResponseAccumulator, ResponseDecoder};
pub use session::{check_login, fetch_newest, open};
pub use stream::{ImapStream, connect, connect_plain, connect_tls, create_tls_connector};
