//! In-memory `Store` used by unit tests.

use std::collections::HashMap;
use std::time::Duration;

use mkv_client::{ClientError, ClientResult, Value};

use crate::config::{ClientOptions, ServerSpec};
use crate::error::{ManagerError, ManagerResult};
use crate::store::{Connector, Store};

/// Store backed by hash maps; records every command it sees.
#[derive(Debug)]
pub(crate) struct MemoryStore {
    pub spec: ServerSpec,
    pub options: ClientOptions,
    pub timeout: Duration,
    pub closed: bool,
    /// Command names in arrival order.
    pub log: Vec<String>,
    /// key -> (value, ttl)
    pub strings: HashMap<Vec<u8>, (Vec<u8>, Option<Duration>)>,
    pub hashes: HashMap<Vec<u8>, HashMap<Vec<u8>, Vec<u8>>>,
    /// When set, every command fails with this server message.
    pub fail_with: Option<Vec<u8>>,
}

impl MemoryStore {
    pub fn new(spec: ServerSpec) -> Self {
        MemoryStore {
            spec,
            options: ClientOptions::new(),
            timeout: Duration::ZERO,
            closed: false,
            log: Vec::new(),
            strings: HashMap::new(),
            hashes: HashMap::new(),
            fail_with: None,
        }
    }

    fn record(&mut self, name: &str) -> ClientResult<()> {
        self.log.push(name.to_ascii_uppercase());
        if self.closed {
            return Err(ClientError::Closed);
        }
        match &self.fail_with {
            Some(message) => Err(ClientError::Server {
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Number of logged commands named `name`.
    pub fn count(&self, name: &str) -> usize {
        self.log.iter().filter(|entry| entry.as_str() == name).count()
    }
}

impl Store for MemoryStore {
    fn execute(&mut self, name: &str, args: &[Vec<u8>]) -> ClientResult<Value> {
        self.record(name)?;
        let wrong_args = || ClientError::Server {
            message: format!("ERR wrong number of arguments for '{}'", name).into_bytes(),
        };
        match name.to_ascii_uppercase().as_str() {
            "PING" => Ok(Value::Simple(b"PONG".to_vec())),
            "GET" => {
                let key = args.first().ok_or_else(wrong_args)?;
                Ok(match self.strings.get(key) {
                    Some((value, _)) => Value::Bulk(value.clone()),
                    None => Value::Nil,
                })
            }
            "SET" => {
                let (key, value) = match args {
                    [key, value, ..] => (key.clone(), value.clone()),
                    _ => return Err(wrong_args()),
                };
                let ttl = match args.get(2..4) {
                    Some([flag, secs]) if flag.as_slice() == b"EX" => std::str::from_utf8(secs)
                        .ok()
                        .and_then(|secs| secs.parse().ok())
                        .map(Duration::from_secs),
                    _ => None,
                };
                self.strings.insert(key, (value, ttl));
                Ok(Value::Simple(b"OK".to_vec()))
            }
            "DEL" => {
                let removed = args.iter().filter(|key| self.strings.remove(*key).is_some()).count();
                Ok(Value::Integer(removed as i64))
            }
            "HGET" => match args {
                [hash, field] => Ok(self
                    .hashes
                    .get(hash)
                    .and_then(|fields| fields.get(field))
                    .map(|value| Value::Bulk(value.clone()))
                    .unwrap_or(Value::Nil)),
                _ => Err(wrong_args()),
            },
            "HSET" => match args {
                [hash, field, value] => {
                    let created = self
                        .hashes
                        .entry(hash.clone())
                        .or_default()
                        .insert(field.clone(), value.clone())
                        .is_none();
                    Ok(Value::Integer(created as i64))
                }
                _ => Err(wrong_args()),
            },
            _ => Err(ClientError::Server {
                message: format!("ERR unknown command '{}'", name).into_bytes(),
            }),
        }
    }

    fn get(&mut self, key: &[u8]) -> ClientResult<Option<Vec<u8>>> {
        self.record("GET")?;
        Ok(self.strings.get(key).map(|(value, _)| value.clone()))
    }

    fn set_ex(&mut self, key: &[u8], value: &[u8], ttl: Duration) -> ClientResult<()> {
        self.record("SET")?;
        let ttl = if ttl.is_zero() { None } else { Some(ttl) };
        self.strings.insert(key.to_vec(), (value.to_vec(), ttl));
        Ok(())
    }

    fn hget(&mut self, hash: &[u8], field: &[u8]) -> ClientResult<Option<Vec<u8>>> {
        self.record("HGET")?;
        Ok(self.hashes.get(hash).and_then(|fields| fields.get(field)).cloned())
    }

    fn hset(&mut self, hash: &[u8], field: &[u8], value: &[u8]) -> ClientResult<bool> {
        self.record("HSET")?;
        Ok(self
            .hashes
            .entry(hash.to_vec())
            .or_default()
            .insert(field.to_vec(), value.to_vec())
            .is_none())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Connector producing `MemoryStore`s. Rejects AUTH when `password` is set
/// and the `ServerSpec` password differs.
#[derive(Debug, Default)]
pub(crate) struct MemoryConnector {
    pub password: Option<String>,
}

impl Connector for MemoryConnector {
    type Store = MemoryStore;

    fn open(
        &self,
        spec: &ServerSpec,
        options: &ClientOptions,
        timeout: Duration,
    ) -> ManagerResult<MemoryStore> {
        if let (Some(expected), Some(given)) = (self.password.as_deref(), spec.auth_password()) {
            if expected != given {
                return Err(ManagerError::Auth {
                    name: spec.name.clone(),
                    source: ClientError::Auth {
                        message: b"WRONGPASS invalid password".to_vec(),
                    },
                });
            }
        }
        let mut store = MemoryStore::new(spec.clone());
        store.options = options.clone();
        store.timeout = timeout;
        Ok(store)
    }
}
