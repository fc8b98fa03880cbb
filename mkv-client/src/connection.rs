//! # Synchronous Connection API
//!
//! Purpose: Expose a compact, blocking API for issuing Redis-compatible
//! commands over one RESP2 socket.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `Connection` hides framing and socket details.
//! 2. **Generic Dispatch**: `execute` forwards any command name; typed
//!    helpers (`get`, `set_ex`, `hget`, `hset`, ...) build on it.
//! 3. **Fail Fast**: Protocol violations surface immediately as errors.
//! 4. **RAII Lifecycle**: Dropping a persistent connection parks its socket;
//!    dropping a transient one closes it.

use std::io::{BufReader, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, warn};

use crate::args::Command;
use crate::error::{ClientError, ClientResult};
use crate::options::ClientOption;
use crate::persistent;
use crate::resp::{encode_command, read_response, Value};

/// How a connection's socket is treated once the handle goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectMode {
    /// Socket is closed when the connection is dropped.
    Transient,
    /// Socket is parked for reuse by the next `pconnect` to the same
    /// endpoint; it is only closed by `Connection::close`.
    Persistent,
}

/// Blocking connection to a single store endpoint.
pub struct Connection {
    transport: Option<Transport>,
    endpoint: String,
    mode: ConnectMode,
    // Set on IO/protocol failure so the socket is never parked.
    broken: bool,
}

impl Connection {
    /// Opens a transient connection.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> ClientResult<Self> {
        Self::open(host, port, timeout, ConnectMode::Transient)
    }

    /// Opens a persistent connection, reusing a parked socket when one
    /// exists for `host:port`.
    pub fn pconnect(host: &str, port: u16, timeout: Duration) -> ClientResult<Self> {
        Self::open(host, port, timeout, ConnectMode::Persistent)
    }

    /// Opens a connection in the given mode.
    ///
    /// `timeout` bounds the TCP connect and becomes the initial socket
    /// read/write timeout. A zero timeout means no timeout.
    pub fn open(host: &str, port: u16, timeout: Duration, mode: ConnectMode) -> ClientResult<Self> {
        let endpoint = format!("{}:{}", host, port);
        let reused = match mode {
            ConnectMode::Persistent => persistent::take(&endpoint),
            ConnectMode::Transient => None,
        };

        let transport = match reused {
            Some(transport) => {
                debug!(endpoint = %endpoint, "reusing parked persistent socket");
                transport.set_timeouts(non_zero(timeout))?;
                transport
            }
            None => {
                debug!(endpoint = %endpoint, ?mode, "opening socket");
                Transport::open(host, port, non_zero(timeout))?
            }
        };

        Ok(Connection {
            transport: Some(transport),
            endpoint,
            mode,
            broken: false,
        })
    }

    /// `host:port` this connection was opened against.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn mode(&self) -> ConnectMode {
        self.mode
    }

    /// True once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }

    /// Authenticates with a password.
    ///
    /// A rejection is reported as `ClientError::Auth`, never retried.
    pub fn auth(&mut self, password: &str) -> ClientResult<()> {
        match self.raw(&[b"AUTH".as_slice(), password.as_bytes()])? {
            Value::Simple(_) => Ok(()),
            Value::Error(message) => Err(ClientError::Auth { message }),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Selects the logical database index.
    pub fn select_db(&mut self, index: i64) -> ClientResult<()> {
        match self.execute("SELECT", &[index.to_string()])? {
            Value::Simple(_) => Ok(()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Applies a client option to this connection.
    pub fn set_option(&mut self, option: &ClientOption) -> ClientResult<()> {
        match option {
            ClientOption::ReadTimeout(timeout) => {
                self.transport()?.stream().set_read_timeout(timeout.and_then(non_zero))?;
            }
            ClientOption::WriteTimeout(timeout) => {
                self.transport()?.stream().set_write_timeout(timeout.and_then(non_zero))?;
            }
            ClientOption::TcpNoDelay(enabled) => {
                self.transport()?.stream().set_nodelay(*enabled)?;
            }
            ClientOption::ClientName(name) => {
                match self.execute("CLIENT", &["SETNAME", name.as_str()])? {
                    Value::Simple(_) => {}
                    _ => return Err(ClientError::UnexpectedResponse),
                }
            }
        }
        Ok(())
    }

    /// Sends `name` with positional `args` and returns the reply unchanged.
    ///
    /// A top-level error reply becomes `ClientError::Server`; every other
    /// reply, the nil sentinel included, is returned as-is.
    pub fn execute<A: AsRef<[u8]>>(&mut self, name: &str, args: &[A]) -> ClientResult<Value> {
        let mut frame: Vec<&[u8]> = Vec::with_capacity(args.len() + 1);
        frame.push(name.as_bytes());
        frame.extend(args.iter().map(AsRef::as_ref));
        match self.raw(&frame)? {
            Value::Error(message) => Err(ClientError::Server { message }),
            value => Ok(value),
        }
    }

    /// Sends a prebuilt `Command`.
    pub fn query(&mut self, command: &Command) -> ClientResult<Value> {
        match self.raw(&command.to_frame())? {
            Value::Error(message) => Err(ClientError::Server { message }),
            value => Ok(value),
        }
    }

    /// Fetches a value by key.
    ///
    /// Returns `Ok(None)` only for the nil reply; an empty value is
    /// `Ok(Some(vec![]))`.
    pub fn get(&mut self, key: &[u8]) -> ClientResult<Option<Vec<u8>>> {
        match self.execute("GET", &[key])? {
            Value::Bulk(data) => Ok(Some(data)),
            Value::Nil => Ok(None),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Sets a value and attaches an expiration.
    ///
    /// Whole seconds use `EX`, sub-second precision uses `PX`, and a zero
    /// TTL writes the value without expiry.
    pub fn set_ex(&mut self, key: &[u8], value: &[u8], ttl: Duration) -> ClientResult<()> {
        let reply = if ttl.is_zero() {
            self.execute("SET", &[key, value])?
        } else if ttl.subsec_millis() == 0 {
            let seconds = ttl.as_secs().to_string();
            self.execute("SET", &[key, value, b"EX".as_slice(), seconds.as_bytes()])?
        } else {
            let millis = ttl.as_millis().to_string();
            self.execute("SET", &[key, value, b"PX".as_slice(), millis.as_bytes()])?
        };
        match reply {
            Value::Simple(_) => Ok(()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Fetches a hash field. `Ok(None)` when the hash or field is missing.
    pub fn hget(&mut self, hash: &[u8], field: &[u8]) -> ClientResult<Option<Vec<u8>>> {
        match self.execute("HGET", &[hash, field])? {
            Value::Bulk(data) => Ok(Some(data)),
            Value::Nil => Ok(None),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Sets a hash field. Returns true when the field was newly created.
    pub fn hset(&mut self, hash: &[u8], field: &[u8], value: &[u8]) -> ClientResult<bool> {
        match self.execute("HSET", &[hash, field, value])? {
            Value::Integer(created) => Ok(created > 0),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Pings the server. Returns the raw response payload.
    pub fn ping(&mut self) -> ClientResult<Vec<u8>> {
        match self.execute::<&[u8]>("PING", &[])? {
            Value::Simple(text) | Value::Bulk(text) => Ok(text),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Closes the socket, persistent or not. Idempotent.
    ///
    /// `QUIT` is sent best-effort; failures are logged and swallowed since
    /// the socket is discarded either way.
    pub fn close(&mut self) {
        let Some(mut transport) = self.transport.take() else {
            return;
        };
        if let Err(err) = transport.exec(&[b"QUIT"]) {
            warn!(endpoint = %self.endpoint, error = %err, "QUIT failed while closing");
        }
        debug!(endpoint = %self.endpoint, "connection closed");
    }

    fn transport(&self) -> ClientResult<&Transport> {
        self.transport.as_ref().ok_or(ClientError::Closed)
    }

    fn raw<A: AsRef<[u8]>>(&mut self, frame: &[A]) -> ClientResult<Value> {
        let transport = self.transport.as_mut().ok_or(ClientError::Closed)?;
        let response = transport.exec(frame);
        if let Err(err) = &response {
            if err.is_transport_failure() {
                // The stream may hold a partial reply; never reuse it.
                self.broken = true;
            }
        }
        response
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let transport = match self.transport.take() {
            Some(transport) => transport,
            None => return,
        };

        if self.mode == ConnectMode::Persistent && !self.broken {
            persistent::park(&self.endpoint, transport);
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint)
            .field("mode", &self.mode)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Single TCP socket with reusable buffers.
///
/// The buffers are stored on the transport to avoid per-call allocations.
pub(crate) struct Transport {
    // Buffered reader reduces syscalls while still allowing direct writes.
    reader: BufReader<TcpStream>,
    line_buf: Vec<u8>,
    write_buf: Vec<u8>,
}

impl Transport {
    fn open(host: &str, port: u16, timeout: Option<Duration>) -> ClientResult<Self> {
        let addr = resolve(host, port)?;
        let stream = match timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout)?,
            None => TcpStream::connect(addr)?,
        };
        // Disable Nagle to keep request latency low for small payloads.
        stream.set_nodelay(true)?;

        let transport = Transport {
            reader: BufReader::new(stream),
            line_buf: Vec::with_capacity(128),
            write_buf: Vec::with_capacity(256),
        };
        transport.set_timeouts(timeout)?;
        Ok(transport)
    }

    fn stream(&self) -> &TcpStream {
        self.reader.get_ref()
    }

    fn set_timeouts(&self, timeout: Option<Duration>) -> ClientResult<()> {
        self.stream().set_read_timeout(timeout)?;
        self.stream().set_write_timeout(timeout)?;
        Ok(())
    }

    fn exec<A: AsRef<[u8]>>(&mut self, args: &[A]) -> ClientResult<Value> {
        self.write_buf.clear();
        encode_command(args, &mut self.write_buf);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buf)?;
        stream.flush()?;

        read_response(&mut self.reader, &mut self.line_buf)
    }
}

fn resolve(host: &str, port: u16) -> ClientResult<SocketAddr> {
    let invalid = || ClientError::InvalidAddress(format!("{}:{}", host, port));
    (host, port)
        .to_socket_addrs()
        .map_err(|_| invalid())?
        .next()
        .ok_or_else(invalid)
}

// std sockets reject zero durations; treat zero as "no timeout".
fn non_zero(timeout: Duration) -> Option<Duration> {
    if timeout.is_zero() {
        None
    } else {
        Some(timeout)
    }
}
