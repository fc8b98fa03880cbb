//! Client error taxonomy.

use thiserror::Error;

/// Result type for the sync client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the sync client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or IO failure while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// RESP2 framing or parse error.
    #[error("protocol error")]
    Protocol,
    /// Server returned an error reply.
    #[error("server error: {}", String::from_utf8_lossy(.message))]
    Server { message: Vec<u8> },
    /// Server rejected the AUTH password.
    #[error("authentication rejected: {}", String::from_utf8_lossy(.message))]
    Auth { message: Vec<u8> },
    /// Response type did not match the expected command response.
    #[error("unexpected response")]
    UnexpectedResponse,
    /// Host/port could not be resolved into a socket address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    /// The connection was explicitly closed.
    #[error("connection closed")]
    Closed,
}

impl ClientError {
    /// Returns the server message for error replies.
    pub fn server_message(&self) -> Option<&[u8]> {
        match self {
            ClientError::Server { message } | ClientError::Auth { message } => Some(message),
            _ => None,
        }
    }

    /// True when the socket can no longer be trusted for further commands.
    pub(crate) fn is_transport_failure(&self) -> bool {
        matches!(self, ClientError::Io(_) | ClientError::Protocol)
    }
}
