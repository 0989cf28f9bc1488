//! SMTP connection management with type-state pattern.

mod client;
mod config;
mod stream;

pub use client::{
    Authenticated, Client, Completed, Data, Ehlo, Greeted, MailTransaction, RecipientAdded,
    SessionState, SmtpConnection, State,
};
pub use config::{Config, ConfigBuilder, Security};
pub use stream::{SmtpStream, TlsState, connect, connect_tls, open};

use crate::types::{AuthMechanism, Extension};
use std::collections::HashSet;

/// Server capabilities from EHLO response.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Server hostname from greeting.
    pub hostname: String,
    /// Supported extensions.
    pub extensions: HashSet<Extension>,
}

impl ServerInfo {
    /// Checks if the server supports an extension.
    #[must_use]
    pub fn supports(&self, ext: &Extension) -> bool {
        self.extensions.contains(ext)
    }

    /// Checks if STARTTLS is supported.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.supports(&Extension::StartTls)
    }

    /// Returns `Some` if SIZE was advertised, holding the limit if one was given.
    #[must_use]
    pub fn size_limit(&self) -> Option<Option<usize>> {
        self.extensions.iter().find_map(|ext| match ext {
            Extension::Size(limit) => Some(*limit),
            _ => None,
        })
    }

    /// Returns supported authentication mechanisms.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<AuthMechanism> {
        self.extensions
            .iter()
            .find_map(|ext| match ext {
                Extension::Auth(mechanisms) => Some(mechanisms.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_info_lookups() {
        let info = ServerInfo {
            hostname: "mx.example.com".into(),
            extensions: [
                Extension::parse("SIZE 1000"),
                Extension::parse("AUTH LOGIN PLAIN XOAUTH2"),
                Extension::parse("STARTTLS"),
            ]
            .into_iter()
            .collect(),
        };
        assert!(info.supports_starttls());
        assert_eq!(info.size_limit(), Some(Some(1000)));
        assert_eq!(
            info.auth_mechanisms(),
            vec![AuthMechanism::Login, AuthMechanism::Plain]
        );

        let bare = ServerInfo::default();
        assert!(!bare.supports_starttls());
        assert_eq!(bare.size_limit(), None);
        assert!(bare.auth_mechanisms().is_empty());
    }
}
