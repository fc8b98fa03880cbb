//! # Command Dispatcher
//!
//! Purpose: Forward commands to the registry's current connection and
//! provide cache-aside ("remember") helpers on top of it.
//!
//! ## Design Principles
//! 1. **Generic Pass-Through**: `execute` does not interpret the command
//!    name; any command the store understands is valid.
//! 2. **Thin Wrappers**: Typed helpers (`get`, `incr`, `hset`, ...) build a
//!    `Command` and go through `execute`.
//! 3. **Miss Means Nil**: The remember helpers treat only the store's nil
//!    reply as a miss. Empty strings and `"0"` are cached values.
//! 4. **No Coordination**: Concurrent misses each run their producer; there
//!    is no single-flight and no locking.

use std::convert::Infallible;
use std::time::Duration;

use mkv_client::{ClientError, Command, Connection, ToArg, Value};
use tracing::debug;

use crate::config::ManagerConfig;
use crate::error::{ManagerError, ManagerResult, RememberError};
use crate::registry::ConnectionRegistry;
use crate::store::Store;

/// Dispatches commands to the current connection of a registry.
#[derive(Debug)]
pub struct CommandDispatcher<S: Store = Connection> {
    registry: ConnectionRegistry<S>,
}

impl CommandDispatcher<Connection> {
    /// Builds the registry for `config` and wraps it.
    ///
    /// # Errors
    ///
    /// Same as [`ConnectionRegistry::new`].
    pub fn from_config(config: &ManagerConfig) -> ManagerResult<Self> {
        Ok(Self::new(ConnectionRegistry::from_config(config)?))
    }
}

impl<S: Store> CommandDispatcher<S> {
    pub fn new(registry: ConnectionRegistry<S>) -> Self {
        CommandDispatcher { registry }
    }

    pub fn registry(&self) -> &ConnectionRegistry<S> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ConnectionRegistry<S> {
        &mut self.registry
    }

    pub fn into_registry(self) -> ConnectionRegistry<S> {
        self.registry
    }

    /// Switches the current connection. See [`ConnectionRegistry::select`].
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown non-empty name.
    pub fn select(&mut self, name: Option<&str>) -> ManagerResult<&mut S> {
        self.registry.select(name)
    }

    /// Sends `method` with positional `args` to the current connection and
    /// returns the store's reply unchanged, nil included.
    ///
    /// # Errors
    ///
    /// Any store failure, error replies included, as `ManagerError::Command`.
    pub fn execute(&mut self, method: &str, args: &[Vec<u8>]) -> ManagerResult<Value> {
        debug!(
            connection = self.registry.current_name(),
            method,
            argc = args.len(),
            "dispatching command"
        );
        Ok(self.registry.current_mut().execute(method, args)?)
    }

    /// Sends a prebuilt `Command` through [`CommandDispatcher::execute`].
    ///
    /// # Errors
    ///
    /// Same as [`CommandDispatcher::execute`].
    pub fn query(&mut self, command: &Command) -> ManagerResult<Value> {
        self.execute(command.name(), command.arguments())
    }

    /// Returns the cached value for `key`, or stores and returns the
    /// producer's value with the given TTL.
    ///
    /// The producer runs at most once, and only when GET replies nil.
    ///
    /// # Errors
    ///
    /// Store failures on the read or the write.
    pub fn string_remember<K, F, V>(
        &mut self,
        key: K,
        ttl: Duration,
        producer: F,
    ) -> ManagerResult<Vec<u8>>
    where
        K: AsRef<[u8]>,
        F: FnOnce() -> V,
        V: Into<Vec<u8>>,
    {
        self.try_string_remember(key, ttl, || Ok::<V, Infallible>(producer()))
            .map_err(store_error)
    }

    /// [`CommandDispatcher::string_remember`] with a fallible producer.
    ///
    /// # Errors
    ///
    /// `RememberError::Producer` when the producer fails (nothing is
    /// written), `RememberError::Store` for store failures.
    pub fn try_string_remember<K, F, V, E>(
        &mut self,
        key: K,
        ttl: Duration,
        producer: F,
    ) -> Result<Vec<u8>, RememberError<E>>
    where
        K: AsRef<[u8]>,
        F: FnOnce() -> Result<V, E>,
        V: Into<Vec<u8>>,
    {
        let key = key.as_ref();
        let connection = self.registry.current_name().to_string();
        let store = self.registry.current_mut();

        if let Some(value) = store.get(key).map_err(ManagerError::from)? {
            debug!(connection = %connection, key = %String::from_utf8_lossy(key), "remember hit");
            return Ok(value);
        }

        debug!(connection = %connection, key = %String::from_utf8_lossy(key), "remember miss");
        let value: Vec<u8> = producer().map_err(RememberError::Producer)?.into();
        store.set_ex(key, &value, ttl).map_err(ManagerError::from)?;
        Ok(value)
    }

    /// Hash-field version of [`CommandDispatcher::string_remember`].
    ///
    /// No expiry is attached; TTL management of the hash is up to the
    /// caller.
    ///
    /// # Errors
    ///
    /// Store failures on the read or the write.
    pub fn hash_remember<H, K, F, V>(
        &mut self,
        hash: H,
        field: K,
        producer: F,
    ) -> ManagerResult<Vec<u8>>
    where
        H: AsRef<[u8]>,
        K: AsRef<[u8]>,
        F: FnOnce() -> V,
        V: Into<Vec<u8>>,
    {
        self.try_hash_remember(hash, field, || Ok::<V, Infallible>(producer()))
            .map_err(store_error)
    }

    /// [`CommandDispatcher::hash_remember`] with a fallible producer.
    ///
    /// # Errors
    ///
    /// `RememberError::Producer` when the producer fails (nothing is
    /// written), `RememberError::Store` for store failures.
    pub fn try_hash_remember<H, K, F, V, E>(
        &mut self,
        hash: H,
        field: K,
        producer: F,
    ) -> Result<Vec<u8>, RememberError<E>>
    where
        H: AsRef<[u8]>,
        K: AsRef<[u8]>,
        F: FnOnce() -> Result<V, E>,
        V: Into<Vec<u8>>,
    {
        let (hash, field) = (hash.as_ref(), field.as_ref());
        let hash_name = String::from_utf8_lossy(hash);
        let connection = self.registry.current_name().to_string();
        let store = self.registry.current_mut();

        if let Some(value) = store.hget(hash, field).map_err(ManagerError::from)? {
            debug!(connection = %connection, hash = %hash_name, "hash remember hit");
            return Ok(value);
        }

        debug!(connection = %connection, hash = %hash_name, "hash remember miss");
        let value: Vec<u8> = producer().map_err(RememberError::Producer)?.into();
        store.hset(hash, field, &value).map_err(ManagerError::from)?;
        Ok(value)
    }

    // ========== Typed wrappers over `execute` ==========

    /// GET. `None` for the nil reply.
    pub fn get(&mut self, key: impl ToArg) -> ManagerResult<Option<Vec<u8>>> {
        optional_bytes(self.query(&Command::new("GET").arg(key))?)
    }

    /// SET without expiry.
    pub fn set(&mut self, key: impl ToArg, value: impl ToArg) -> ManagerResult<()> {
        self.query(&Command::new("SET").arg(key).arg(value))?;
        Ok(())
    }

    /// SET with `EX seconds`.
    pub fn set_ex(
        &mut self,
        key: impl ToArg,
        value: impl ToArg,
        seconds: u64,
    ) -> ManagerResult<()> {
        self.query(&Command::new("SET").arg(key).arg(value).arg("EX").arg(seconds))?;
        Ok(())
    }

    /// DEL. Returns the number of keys removed.
    pub fn del<I, K>(&mut self, keys: I) -> ManagerResult<i64>
    where
        I: IntoIterator<Item = K>,
        K: ToArg,
    {
        integer(self.query(&Command::new("DEL").args(keys))?)
    }

    pub fn exists(&mut self, key: impl ToArg) -> ManagerResult<bool> {
        Ok(integer(self.query(&Command::new("EXISTS").arg(key))?)? > 0)
    }

    /// EXPIRE. True when the timeout was set.
    pub fn expire(&mut self, key: impl ToArg, seconds: u64) -> ManagerResult<bool> {
        Ok(integer(self.query(&Command::new("EXPIRE").arg(key).arg(seconds))?)? == 1)
    }

    /// TTL in seconds, with the store's `-1` (no expiry) and `-2` (missing)
    /// passed through.
    pub fn ttl(&mut self, key: impl ToArg) -> ManagerResult<i64> {
        integer(self.query(&Command::new("TTL").arg(key))?)
    }

    pub fn incr(&mut self, key: impl ToArg) -> ManagerResult<i64> {
        integer(self.query(&Command::new("INCR").arg(key))?)
    }

    /// HGET. `None` for the nil reply.
    pub fn hget(&mut self, hash: impl ToArg, field: impl ToArg) -> ManagerResult<Option<Vec<u8>>> {
        optional_bytes(self.query(&Command::new("HGET").arg(hash).arg(field))?)
    }

    /// HSET. True when the field was created.
    pub fn hset(
        &mut self,
        hash: impl ToArg,
        field: impl ToArg,
        value: impl ToArg,
    ) -> ManagerResult<bool> {
        let command = Command::new("HSET").arg(hash).arg(field).arg(value);
        Ok(integer(self.query(&command)?)? > 0)
    }

    /// HDEL. Returns the number of fields removed.
    pub fn hdel(&mut self, hash: impl ToArg, field: impl ToArg) -> ManagerResult<i64> {
        integer(self.query(&Command::new("HDEL").arg(hash).arg(field))?)
    }

    /// PING, returning the store's reply unchanged.
    pub fn ping(&mut self) -> ManagerResult<Value> {
        self.execute("PING", &[])
    }
}

fn store_error(err: RememberError<Infallible>) -> ManagerError {
    match err {
        RememberError::Store(err) => err,
        RememberError::Producer(never) => match never {},
    }
}

fn optional_bytes(value: Value) -> ManagerResult<Option<Vec<u8>>> {
    match value {
        Value::Nil => Ok(None),
        Value::Bulk(data) => Ok(Some(data)),
        _ => Err(ClientError::UnexpectedResponse.into()),
    }
}

fn integer(value: Value) -> ManagerResult<i64> {
    value
        .as_integer()
        .ok_or_else(|| ClientError::UnexpectedResponse.into())
}
