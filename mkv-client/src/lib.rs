//! # MultiKV Sync Client
//!
//! Purpose: Provide a lightweight, synchronous Redis-compatible client that
//! the connection manager drives. One `Connection` is one TCP socket.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `Connection` hides framing and socket details.
//! 2. **Open Vocabulary**: Any command name reaches the server through
//!    `Connection::execute`; typed helpers are thin wrappers over it.
//! 3. **Minimal Allocation**: Reuse buffers for RESP framing and parsing.
//! 4. **Pass-Through Replies**: The nil reply is surfaced as `Value::Nil`,
//!    never folded into an empty payload.

mod args;
mod connection;
mod error;
mod options;
mod persistent;
mod resp;

pub use args::{Command, ToArg};
pub use connection::{ConnectMode, Connection};
pub use error::{ClientError, ClientResult};
pub use options::ClientOption;
pub use persistent::parked_count;
pub use resp::Value;
