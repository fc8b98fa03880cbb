//! # Server Configuration
//!
//! Purpose: Turn a TOML document into typed server specs and client options.
//!
//! Layout: every top-level table is a server entry keyed by its connection
//! name. Three keys are reserved:
//! - `options`: client options applied to every connection,
//! - `timeout`: construction-time connect timeout in seconds,
//! - `cluster`: pulled out and kept verbatim; cluster clients are not built here.
//!
//! ```toml
//! timeout = 2.5
//!
//! [options]
//! read_timeout = 1.0
//! client_name = "billing"
//!
//! [default]
//! host = "127.0.0.1"
//! port = 6379
//! database = 0
//!
//! [sessions]
//! host = "10.0.0.7"
//! password = "secret"
//! database = 2
//! persistent = true
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use mkv_client::ClientOption;
use serde::Deserialize;

use crate::error::ConfigError;

/// Name of the connection selected at construction and on empty lookups.
pub const DEFAULT_CONNECTION: &str = "default";

/// Connect timeout used when the configuration does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Port used when a server entry omits one.
pub const DEFAULT_PORT: u16 = 6379;

const RESERVED_CLUSTER: &str = "cluster";
const RESERVED_OPTIONS: &str = "options";
const RESERVED_TIMEOUT: &str = "timeout";

/// One named server entry. Immutable once read.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerSpec {
    pub name: String,
    pub host: String,
    pub port: u16,
    /// `None` (or empty) skips AUTH.
    pub password: Option<String>,
    /// Logical database index passed to SELECT.
    pub database: i64,
    /// Open with `pconnect` instead of `connect`.
    pub persistent: bool,
}

impl ServerSpec {
    /// Creates a spec with default port, database 0 and no password.
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        ServerSpec {
            name: name.into(),
            host: host.into(),
            port: DEFAULT_PORT,
            password: None,
            database: 0,
            persistent: false,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_database(mut self, database: i64) -> Self {
        self.database = database;
        self
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Password to authenticate with, ignoring empty strings.
    pub fn auth_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|password| !password.is_empty())
    }

    /// Checks the fields a connection cannot be opened without.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::invalid("name", "connection name cannot be empty"));
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::invalid(
                format!("{}.host", self.name),
                "host cannot be empty",
            ));
        }
        if self.port == 0 {
            return Err(ConfigError::invalid(
                format!("{}.port", self.name),
                "port must be between 1 and 65535",
            ));
        }
        if self.database < 0 {
            return Err(ConfigError::invalid(
                format!("{}.database", self.name),
                "database index cannot be negative",
            ));
        }
        Ok(())
    }
}

// Hand-written so the password never ends up in logs.
impl fmt::Debug for ServerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerSpec")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .field("persistent", &self.persistent)
            .finish()
    }
}

/// Server entry as written in the file, before defaults are applied.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawServer {
    host: Option<String>,
    port: Option<u16>,
    password: Option<String>,
    #[serde(default)]
    database: i64,
    #[serde(default)]
    persistent: bool,
}

impl RawServer {
    fn into_spec(self, name: &str) -> Result<ServerSpec, ConfigError> {
        let host = self
            .host
            .ok_or_else(|| ConfigError::invalid(format!("{}.host", name), "host is required"))?;
        let spec = ServerSpec {
            name: name.to_string(),
            host,
            port: self.port.unwrap_or(DEFAULT_PORT),
            password: self.password,
            database: self.database,
            persistent: self.persistent,
        };
        spec.validate()?;
        Ok(spec)
    }
}

/// Client options applied to every connection.
///
/// Keyed by option identifier; setting the same identifier twice keeps the
/// last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientOptions {
    entries: BTreeMap<&'static str, ClientOption>,
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the option with the same identifier.
    pub fn set(&mut self, option: ClientOption) -> &mut Self {
        self.entries.insert(option.key(), option);
        self
    }

    pub fn with(mut self, option: ClientOption) -> Self {
        self.set(option);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ClientOption> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClientOption> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses the reserved `options` table.
    ///
    /// # Errors
    ///
    /// Unknown identifiers and mistyped values are rejected.
    pub fn from_table(table: &toml::Table) -> Result<Self, ConfigError> {
        let mut options = ClientOptions::new();
        for (key, value) in table {
            let field = format!("{}.{}", RESERVED_OPTIONS, key);
            let option = match key.as_str() {
                "read_timeout" => ClientOption::ReadTimeout(optional_seconds(&field, value)?),
                "write_timeout" => ClientOption::WriteTimeout(optional_seconds(&field, value)?),
                "tcp_nodelay" => ClientOption::TcpNoDelay(
                    value
                        .as_bool()
                        .ok_or_else(|| ConfigError::invalid(&field, "expected a boolean"))?,
                ),
                "client_name" => ClientOption::ClientName(
                    value
                        .as_str()
                        .ok_or_else(|| ConfigError::invalid(&field, "expected a string"))?
                        .to_string(),
                ),
                _ => return Err(ConfigError::invalid(field, "unknown client option")),
            };
            options.set(option);
        }
        Ok(options)
    }
}

impl FromIterator<ClientOption> for ClientOptions {
    fn from_iter<I: IntoIterator<Item = ClientOption>>(iter: I) -> Self {
        let mut options = ClientOptions::new();
        for option in iter {
            options.set(option);
        }
        options
    }
}

/// Everything needed to build a registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerConfig {
    /// Server entries in name order.
    pub servers: Vec<ServerSpec>,
    pub options: ClientOptions,
    /// Connect timeout for every connection.
    pub timeout: Duration,
    /// Reserved `cluster` entry, carried but never used.
    pub cluster: Option<toml::Value>,
}

impl ManagerConfig {
    /// Builds a config from already-typed parts with the default timeout.
    pub fn new(servers: Vec<ServerSpec>) -> Self {
        ManagerConfig {
            servers,
            options: ClientOptions::new(),
            timeout: DEFAULT_TIMEOUT,
            cluster: None,
        }
    }

    /// Loads and parses a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not describe a
    /// valid server list.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parses a TOML configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid TOML, unknown server fields, missing
    /// hosts, or bad option values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let mut table: toml::Table = text
            .parse()
            .map_err(|err: toml::de::Error| ConfigError::Parse(err.to_string()))?;

        let cluster = table.remove(RESERVED_CLUSTER);

        let options = match table.remove(RESERVED_OPTIONS) {
            Some(toml::Value::Table(options)) => ClientOptions::from_table(&options)?,
            Some(_) => return Err(ConfigError::invalid(RESERVED_OPTIONS, "expected a table")),
            None => ClientOptions::new(),
        };

        let timeout = match table.remove(RESERVED_TIMEOUT) {
            Some(value) => seconds(RESERVED_TIMEOUT, &value)?,
            None => DEFAULT_TIMEOUT,
        };

        let mut servers = Vec::with_capacity(table.len());
        for (name, value) in table {
            if !value.is_table() {
                return Err(ConfigError::invalid(&name, "server entry must be a table"));
            }
            let raw: RawServer = value
                .try_into()
                .map_err(|err: toml::de::Error| ConfigError::invalid(&name, err.message()))?;
            servers.push(raw.into_spec(&name)?);
        }

        Ok(ManagerConfig {
            servers,
            options,
            timeout,
            cluster,
        })
    }
}

fn seconds(field: &str, value: &toml::Value) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::invalid(field, "expected a non-negative number of seconds");
    match value {
        toml::Value::Integer(secs) if *secs >= 0 => Ok(Duration::from_secs(*secs as u64)),
        // Rejects negative, NaN and values too large for a `Duration`.
        toml::Value::Float(secs) => Duration::try_from_secs_f64(*secs).map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

// Zero disables the socket timeout.
fn optional_seconds(
    field: &str,
    value: &toml::Value,
) -> Result<Option<Duration>, ConfigError> {
    let duration = seconds(field, value)?;
    Ok(if duration.is_zero() { None } else { Some(duration) })
}
