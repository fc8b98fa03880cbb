//! # Store Abstraction
//!
//! `Store` is the surface the dispatcher needs from an open connection;
//! `Connector` turns a `ServerSpec` into a ready-to-use store (connected,
//! authenticated, database selected, options applied).
//!
//! Both traits follow the strategy pattern so the registry is not tied to
//! the TCP client. `Connection` and `TcpConnector` are the production pair.

use std::time::Duration;

use mkv_client::{ClientOption, ClientResult, ConnectMode, Connection, Value};
use tracing::debug;

use crate::config::{ClientOptions, ServerSpec};
use crate::error::{ManagerError, ManagerResult};

/// An open, configured store handle.
pub trait Store {
    /// Sends `name` with positional `args`, returning the reply unchanged.
    fn execute(&mut self, name: &str, args: &[Vec<u8>]) -> ClientResult<Value>;

    /// Plain-value read. `None` only for the store's nil reply.
    fn get(&mut self, key: &[u8]) -> ClientResult<Option<Vec<u8>>>;

    /// Plain-value write with expiry; a zero TTL means no expiry.
    fn set_ex(&mut self, key: &[u8], value: &[u8], ttl: Duration) -> ClientResult<()>;

    /// Hash-field read. `None` only for the store's nil reply.
    fn hget(&mut self, hash: &[u8], field: &[u8]) -> ClientResult<Option<Vec<u8>>>;

    /// Hash-field write. Returns true when the field was created.
    fn hset(&mut self, hash: &[u8], field: &[u8], value: &[u8]) -> ClientResult<bool>;

    /// Releases the underlying resources, persistent ones included.
    fn close(&mut self);
}

impl Store for Connection {
    fn execute(&mut self, name: &str, args: &[Vec<u8>]) -> ClientResult<Value> {
        Connection::execute(self, name, args)
    }

    fn get(&mut self, key: &[u8]) -> ClientResult<Option<Vec<u8>>> {
        Connection::get(self, key)
    }

    fn set_ex(&mut self, key: &[u8], value: &[u8], ttl: Duration) -> ClientResult<()> {
        Connection::set_ex(self, key, value, ttl)
    }

    fn hget(&mut self, hash: &[u8], field: &[u8]) -> ClientResult<Option<Vec<u8>>> {
        Connection::hget(self, hash, field)
    }

    fn hset(&mut self, hash: &[u8], field: &[u8], value: &[u8]) -> ClientResult<bool> {
        Connection::hset(self, hash, field, value)
    }

    fn close(&mut self) {
        Connection::close(self)
    }
}

/// Opens a store handle for one server entry.
pub trait Connector {
    type Store: Store;

    /// Opens and configures a store for `spec`.
    ///
    /// # Errors
    ///
    /// Connection, authentication, database selection and option failures
    /// are returned as-is; nothing is retried.
    fn open(
        &self,
        spec: &ServerSpec,
        options: &ClientOptions,
        timeout: Duration,
    ) -> ManagerResult<Self::Store>;
}

/// Opens `mkv_client::Connection`s over TCP.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Store = Connection;

    fn open(
        &self,
        spec: &ServerSpec,
        options: &ClientOptions,
        timeout: Duration,
    ) -> ManagerResult<Connection> {
        let mode = if spec.persistent {
            ConnectMode::Persistent
        } else {
            ConnectMode::Transient
        };
        let connect_error = |source| ManagerError::Connect {
            name: spec.name.clone(),
            source,
        };

        let mut conn =
            Connection::open(&spec.host, spec.port, timeout, mode).map_err(connect_error)?;

        if let Some(password) = spec.auth_password() {
            conn.auth(password).map_err(|source| ManagerError::Auth {
                name: spec.name.clone(),
                source,
            })?;
        }

        conn.select_db(spec.database).map_err(connect_error)?;

        for option in options.iter() {
            apply_option(&mut conn, option).map_err(connect_error)?;
        }

        debug!(
            name = %spec.name,
            endpoint = conn.endpoint(),
            database = spec.database,
            ?mode,
            "connection ready"
        );
        Ok(conn)
    }
}

fn apply_option(conn: &mut Connection, option: &ClientOption) -> ClientResult<()> {
    debug!(endpoint = conn.endpoint(), option = option.key(), "applying client option");
    conn.set_option(option)
}
