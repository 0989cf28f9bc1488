//! Errors raised while building a message.

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a message cannot be built.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required header was not supplied.
    #[error("Missing required header: {0}")]
    MissingHeader(String),

    /// No plain-text body was supplied.
    #[error("Message has no text body")]
    MissingBody,

    /// A header name or value would break the header block.
    #[error("Invalid MIME header: {0}")]
    InvalidHeader(String),
}
