//! Threaded in-memory RESP2 server for integration tests.
//!
//! Supports the handful of commands the manager issues plus a few extras
//! for pass-through checks. Every received command is logged so tests can
//! assert on what went over the wire.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

// Same as the store's default `databases` setting.
const DATABASES: i64 = 16;

#[derive(Default)]
struct Db {
    strings: HashMap<Vec<u8>, Vec<u8>>,
    hashes: HashMap<Vec<u8>, HashMap<Vec<u8>, Vec<u8>>>,
}

#[derive(Default)]
struct State {
    dbs: HashMap<i64, Db>,
    log: Vec<Vec<String>>,
}

/// Handle to a running fake server.
#[derive(Clone)]
pub struct FakeServer {
    pub port: u16,
    password: Option<String>,
    state: Arc<Mutex<State>>,
    accepted: Arc<AtomicUsize>,
}

impl FakeServer {
    pub fn start() -> Self {
        Self::start_with_password(None)
    }

    pub fn start_with_password(password: Option<&str>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let server = FakeServer {
            port: listener.local_addr().expect("addr").port(),
            password: password.map(str::to_string),
            state: Arc::new(Mutex::new(State::default())),
            accepted: Arc::new(AtomicUsize::new(0)),
        };

        let acceptor = server.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                acceptor.accepted.fetch_add(1, Ordering::SeqCst);
                let session = acceptor.clone();
                thread::spawn(move || session.serve(stream));
            }
        });

        server
    }

    /// Number of TCP connections accepted so far.
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Every command received, upper-cased name first.
    pub fn log(&self) -> Vec<Vec<String>> {
        self.state.lock().log.clone()
    }

    /// Commands received with the given name.
    pub fn commands(&self, name: &str) -> Vec<Vec<String>> {
        self.log().into_iter().filter(|cmd| cmd[0] == name).collect()
    }

    pub fn value(&self, db: i64, key: &str) -> Option<Vec<u8>> {
        let state = self.state.lock();
        state.dbs.get(&db)?.strings.get(key.as_bytes()).cloned()
    }

    pub fn seed(&self, db: i64, key: &str, value: &[u8]) {
        let mut state = self.state.lock();
        state
            .dbs
            .entry(db)
            .or_default()
            .strings
            .insert(key.as_bytes().to_vec(), value.to_vec());
    }

    fn serve(&self, stream: TcpStream) {
        let mut writer = match stream.try_clone() {
            Ok(writer) => writer,
            Err(_) => return,
        };
        let mut reader = BufReader::new(stream);
        let mut session = Session {
            db: 0,
            authed: self.password.is_none(),
        };

        while let Ok(Some(args)) = read_command(&mut reader) {
            if args.is_empty() {
                break;
            }
            let quit = args[0].eq_ignore_ascii_case(b"QUIT");
            let reply = self.dispatch(&mut session, &args);
            if writer.write_all(&reply).and_then(|_| writer.flush()).is_err() || quit {
                break;
            }
        }
    }

    fn dispatch(&self, session: &mut Session, args: &[Vec<u8>]) -> Vec<u8> {
        let name = String::from_utf8_lossy(&args[0]).to_ascii_uppercase();
        let mut state = self.state.lock();
        state.log.push(
            std::iter::once(name.clone())
                .chain(args[1..].iter().map(|arg| String::from_utf8_lossy(arg).into_owned()))
                .collect(),
        );

        if name == "AUTH" {
            return match (&self.password, args.get(1)) {
                (Some(expected), Some(given)) if expected.as_bytes() == given.as_slice() => {
                    session.authed = true;
                    resp_simple("OK")
                }
                (None, _) => {
                    resp_error("ERR AUTH <password> called without any password configured")
                }
                _ => resp_error("WRONGPASS invalid username-password pair"),
            };
        }
        if !session.authed && name != "QUIT" {
            return resp_error("NOAUTH Authentication required.");
        }

        let db_index = session.db;
        let db = state.dbs.entry(db_index).or_default();
        match (name.as_str(), &args[1..]) {
            ("PING", []) => resp_simple("PONG"),
            ("PING", [payload]) => resp_bulk(payload),
            ("QUIT", _) => resp_simple("OK"),
            ("SELECT", [index]) => match parse_i64(index) {
                Some(index) if (0..DATABASES).contains(&index) => {
                    session.db = index;
                    resp_simple("OK")
                }
                _ => resp_error("ERR DB index is out of range"),
            },
            ("CLIENT", [sub, _name]) if sub.eq_ignore_ascii_case(b"SETNAME") => resp_simple("OK"),
            ("GET", [key]) => match db.strings.get(key) {
                Some(value) => resp_bulk(value),
                None => resp_null(),
            },
            ("SET", [key, value, ..]) => {
                db.strings.insert(key.clone(), value.clone());
                resp_simple("OK")
            }
            ("DEL", keys) if !keys.is_empty() => {
                let removed = keys.iter().filter(|key| db.strings.remove(*key).is_some()).count();
                resp_integer(removed as i64)
            }
            ("EXISTS", [key]) => resp_integer(db.strings.contains_key(key) as i64),
            ("INCR", [key]) => {
                let current = db.strings.get(key).and_then(|value| parse_i64(value)).unwrap_or(0);
                let next = current + 1;
                db.strings.insert(key.clone(), next.to_string().into_bytes());
                resp_integer(next)
            }
            ("HGET", [hash, field]) => {
                match db.hashes.get(hash).and_then(|fields| fields.get(field)) {
                    Some(value) => resp_bulk(value),
                    None => resp_null(),
                }
            }
            ("HSET", [hash, field, value]) => {
                let created = db
                    .hashes
                    .entry(hash.clone())
                    .or_default()
                    .insert(field.clone(), value.clone())
                    .is_none();
                resp_integer(created as i64)
            }
            _ => resp_error(&format!("ERR unknown command '{}'", name)),
        }
    }
}

struct Session {
    db: i64,
    authed: bool,
}

fn read_command(reader: &mut BufReader<TcpStream>) -> std::io::Result<Option<Vec<Vec<u8>>>> {
    let mut line = Vec::new();
    if !read_line(reader, &mut line)? {
        return Ok(None);
    }
    if line.first() != Some(&b'*') {
        return Err(invalid("expected array"));
    }
    let count = parse_usize(&line[1..])?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        if !read_line(reader, &mut line)? || line.first() != Some(&b'$') {
            return Err(invalid("expected bulk"));
        }
        let len = parse_usize(&line[1..])?;
        let mut data = vec![0u8; len + 2];
        reader.read_exact(&mut data)?;
        data.truncate(len);
        args.push(data);
    }
    Ok(Some(args))
}

fn read_line(reader: &mut BufReader<TcpStream>, buf: &mut Vec<u8>) -> std::io::Result<bool> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(false);
    }
    if buf.len() < 2 || buf[buf.len() - 2] != b'\r' {
        return Err(invalid("invalid line"));
    }
    buf.truncate(buf.len() - 2);
    Ok(true)
}

fn invalid(msg: &str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, msg.to_string())
}

fn parse_usize(data: &[u8]) -> std::io::Result<usize> {
    std::str::from_utf8(data)
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| invalid("digit"))
}

fn parse_i64(data: &[u8]) -> Option<i64> {
    std::str::from_utf8(data).ok()?.parse().ok()
}

fn resp_simple(message: &str) -> Vec<u8> {
    format!("+{}\r\n", message).into_bytes()
}

fn resp_error(message: &str) -> Vec<u8> {
    format!("-{}\r\n", message).into_bytes()
}

fn resp_integer(value: i64) -> Vec<u8> {
    format!(":{}\r\n", value).into_bytes()
}

fn resp_bulk(data: &[u8]) -> Vec<u8> {
    let mut buf = format!("${}\r\n", data.len()).into_bytes();
    buf.extend_from_slice(data);
    buf.extend_from_slice(b"\r\n");
    buf
}

fn resp_null() -> Vec<u8> {
    b"$-1\r\n".to_vec()
}
