//! # Connection Registry
//!
//! Purpose: Own one open store per configured name and remember which one
//! is current.
//!
//! ## Design Principles
//! 1. **Single Owner**: The registry owns every store; callers borrow them.
//! 2. **Fixed Membership**: Entries are only added at construction.
//! 3. **Named Current**: The current connection is stored as a key into the
//!    map, so it can never dangle and is never unset.
//! 4. **Fail Fast**: Unknown names are `NotFound`; only an empty or omitted
//!    name falls back to `default`.

use std::collections::BTreeMap;
use std::time::Duration;

use mkv_client::Connection;
use tracing::{debug, info};

use crate::config::{ClientOptions, ManagerConfig, ServerSpec, DEFAULT_CONNECTION};
use crate::error::{ConfigError, ManagerError, ManagerResult};
use crate::store::{Connector, Store, TcpConnector};

/// Name → store map with a current selection.
pub struct ConnectionRegistry<S: Store = Connection> {
    connections: BTreeMap<String, S>,
    current: String,
}

impl ConnectionRegistry<Connection> {
    /// Opens a TCP connection for every spec.
    ///
    /// # Errors
    ///
    /// Fails on the first spec that cannot be validated, connected,
    /// authenticated or configured, and with `NotFound` when no spec is
    /// named `default`.
    pub fn new(
        specs: &[ServerSpec],
        options: &ClientOptions,
        timeout: Duration,
    ) -> ManagerResult<Self> {
        Self::with_connector(specs, options, timeout, &TcpConnector)
    }

    /// Opens every server of a loaded configuration.
    ///
    /// # Errors
    ///
    /// Same as [`ConnectionRegistry::new`].
    pub fn from_config(config: &ManagerConfig) -> ManagerResult<Self> {
        Self::new(&config.servers, &config.options, config.timeout)
    }
}

impl<S: Store> ConnectionRegistry<S> {
    /// Opens a store for every spec through `connector`.
    ///
    /// # Errors
    ///
    /// Same as [`ConnectionRegistry::new`], plus `ConfigError::Duplicate`
    /// when two specs share a name.
    pub fn with_connector<C>(
        specs: &[ServerSpec],
        options: &ClientOptions,
        timeout: Duration,
        connector: &C,
    ) -> ManagerResult<Self>
    where
        C: Connector<Store = S>,
    {
        let mut connections = BTreeMap::new();
        for spec in specs {
            spec.validate()?;
            if connections.contains_key(&spec.name) {
                return Err(ConfigError::Duplicate(spec.name.clone()).into());
            }
            debug!(name = %spec.name, host = %spec.host, port = spec.port, "opening connection");
            let store = connector.open(spec, options, timeout)?;
            connections.insert(spec.name.clone(), store);
        }

        let registry = Self::from_stores(connections)?;
        info!(
            connections = registry.len(),
            options = options.len(),
            "connection registry ready"
        );
        Ok(registry)
    }

    /// Wraps already-open stores; `default` becomes current.
    ///
    /// # Errors
    ///
    /// Returns `NotFound("default")` when no store is named `default`.
    pub fn from_stores(connections: BTreeMap<String, S>) -> ManagerResult<Self> {
        if !connections.contains_key(DEFAULT_CONNECTION) {
            return Err(ManagerError::NotFound(DEFAULT_CONNECTION.to_string()));
        }
        Ok(ConnectionRegistry {
            connections,
            current: DEFAULT_CONNECTION.to_string(),
        })
    }

    /// Makes `name` current and returns it.
    ///
    /// `None` and `Some("")` select `default`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a non-empty name that is not registered; the
    /// current selection is left unchanged.
    pub fn select(&mut self, name: Option<&str>) -> ManagerResult<&mut S> {
        let name = resolve_name(name);
        if !self.connections.contains_key(name) {
            return Err(ManagerError::NotFound(name.to_string()));
        }
        if self.current != name {
            debug!(from = %self.current, to = name, "switching current connection");
            self.current = name.to_string();
        }
        Ok(self.current_mut())
    }

    /// Name of the current connection.
    pub fn current_name(&self) -> &str {
        &self.current
    }

    pub fn current(&self) -> &S {
        self.connections
            .get(&self.current)
            .expect("current connection is always registered")
    }

    pub fn current_mut(&mut self) -> &mut S {
        self.connections
            .get_mut(&self.current)
            .expect("current connection is always registered")
    }

    /// Looks up a connection without changing the current one.
    pub fn get(&self, name: &str) -> Option<&S> {
        self.connections.get(name)
    }

    /// Read-only view of every connection, ordered by name.
    pub fn all_connections(&self) -> &BTreeMap<String, S> {
        &self.connections
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.connections.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Closes every connection, persistent ones included.
    ///
    /// Entries stay registered; later commands on them fail.
    pub fn close_all(&mut self) {
        for (name, store) in self.connections.iter_mut() {
            debug!(name = %name, "closing connection");
            store.close();
        }
    }
}

impl<S: Store> std::fmt::Debug for ConnectionRegistry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connections", &self.connections.keys().collect::<Vec<_>>())
            .field("current", &self.current)
            .finish()
    }
}

fn resolve_name(name: Option<&str>) -> &str {
    match name {
        Some(name) if !name.is_empty() => name,
        _ => DEFAULT_CONNECTION,
    }
}
