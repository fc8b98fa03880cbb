//! # MultiKV Connection Manager
//!
//! Purpose: Open one store connection per configured name, keep track of
//! the active one, and forward arbitrary commands to it. Two cache-aside
//! helpers ("remember") sit on top of the active connection.
//!
//! ## Design Principles
//! 1. **Registry Pattern**: `ConnectionRegistry` is the sole owner of every
//!    connection; the active connection is a name into that map.
//! 2. **Strategy Pattern**: `Store` and `Connector` decouple the registry
//!    from the TCP client so any store handle can be plugged in.
//! 3. **Open Vocabulary**: `CommandDispatcher::execute` forwards any command
//!    name; typed helpers delegate to it.
//! 4. **Pass-Through Failures**: Store errors surface unchanged, wrapped
//!    only to say which stage produced them.
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use mkv_manager::{CommandDispatcher, ManagerConfig};
//!
//! let config = ManagerConfig::load("servers.toml")?;
//! let mut redis = CommandDispatcher::from_config(&config)?;
//!
//! let profile = redis.string_remember("profile:42", Duration::from_secs(60), || {
//!     "expensive".to_string()
//! })?;
//! redis.select(Some("sessions"))?;
//! redis.execute("PING", &[])?;
//! # let _ = profile;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod config;
mod dispatcher;
mod error;
mod registry;
mod store;

#[cfg(test)]
mod testing;

pub use config::{
    ClientOptions, ManagerConfig, ServerSpec, DEFAULT_CONNECTION, DEFAULT_PORT, DEFAULT_TIMEOUT,
};
pub use dispatcher::CommandDispatcher;
pub use error::{ConfigError, ManagerError, ManagerResult, RememberError};
pub use registry::ConnectionRegistry;
pub use store::{Connector, Store, TcpConnector};

pub use mkv_client::{ClientError, ClientOption, Command, ConnectMode, Connection, ToArg, Value};
