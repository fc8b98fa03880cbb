//! Per-connection client options.

use std::time::Duration;

/// A client-side option applied to an open connection.
///
/// Socket options take effect immediately; `ClientName` is sent to the
/// server as `CLIENT SETNAME`.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientOption {
    /// Socket read timeout. `None` blocks indefinitely.
    ReadTimeout(Option<Duration>),
    /// Socket write timeout. `None` blocks indefinitely.
    WriteTimeout(Option<Duration>),
    /// Disable Nagle's algorithm when true.
    TcpNoDelay(bool),
    /// Connection name reported by `CLIENT LIST`.
    ClientName(String),
}

impl ClientOption {
    /// Stable identifier used in configuration files and logs.
    pub fn key(&self) -> &'static str {
        match self {
            ClientOption::ReadTimeout(_) => "read_timeout",
            ClientOption::WriteTimeout(_) => "write_timeout",
            ClientOption::TcpNoDelay(_) => "tcp_nodelay",
            ClientOption::ClientName(_) => "client_name",
        }
    }
}
