//! # RESP2 Encoding and Parsing
//!
//! Purpose: Encode client commands and parse server replies while keeping
//! allocations under control.
//!
//! ## Design Principles
//! 1. **State-Free Parsing**: Replies are parsed top-down with minimal state.
//! 2. **Buffer Reuse**: Caller provides buffers to avoid per-call allocations.
//! 3. **Binary-Safe**: Bulk strings are treated as raw bytes.
//! 4. **Fail Fast**: Invalid framing returns protocol errors immediately.

use std::io::BufRead;

use crate::error::{ClientError, ClientResult};

/// Largest bulk string accepted from the server (512 MiB, the store's own
/// `proto-max-bulk-len` default).
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Deepest array nesting accepted in a single reply.
pub const MAX_DEPTH: usize = 32;

// Array headers are untrusted; cap what gets reserved up front.
const MAX_PREALLOC: i64 = 1024;

/// A reply from the store, exactly as the server framed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// `$-1` / `*-1`: the store's "missing" sentinel.
    Nil,
    /// +OK or +PONG style replies.
    Simple(Vec<u8>),
    /// -ERR ... replies. Top-level errors are turned into
    /// `ClientError::Server` by the connection; this variant only survives
    /// nested inside arrays (e.g. EXEC results).
    Error(Vec<u8>),
    /// :123 replies.
    Integer(i64),
    /// $... bulk strings, possibly empty.
    Bulk(Vec<u8>),
    /// *... arrays.
    Array(Vec<Value>),
}

impl Value {
    /// True for the nil sentinel only. Empty bulk strings and `0` are values.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Borrow the payload of simple and bulk replies.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Simple(data) | Value::Bulk(data) => Some(data),
            _ => None,
        }
    }

    /// Consumes the reply, returning the payload of simple and bulk replies.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Value::Simple(data) | Value::Bulk(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }
}

/// Encodes a RESP2 array command into the provided buffer.
pub fn encode_command<A: AsRef<[u8]>>(args: &[A], out: &mut Vec<u8>) {
    out.push(b'*');
    push_usize(out, args.len());
    out.extend_from_slice(b"\r\n");
    for arg in args {
        let arg = arg.as_ref();
        out.push(b'$');
        push_usize(out, arg.len());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(arg);
        out.extend_from_slice(b"\r\n");
    }
}

/// Reads one RESP value from the buffered reader.
///
/// Bulk strings longer than [`MAX_BULK_LEN`] and arrays nested deeper than
/// [`MAX_DEPTH`] are rejected as protocol errors.
pub fn read_response<R: BufRead>(
    reader: &mut R,
    line_buf: &mut Vec<u8>,
) -> ClientResult<Value> {
    read_value(reader, line_buf, 0)
}

fn read_value<R: BufRead>(
    reader: &mut R,
    line_buf: &mut Vec<u8>,
    depth: usize,
) -> ClientResult<Value> {
    read_line(reader, line_buf)?;
    if line_buf.is_empty() {
        return Err(ClientError::Protocol);
    }

    match line_buf[0] {
        b'+' => Ok(Value::Simple(line_buf[1..].to_vec())),
        b'-' => Ok(Value::Error(line_buf[1..].to_vec())),
        b':' => Ok(Value::Integer(parse_i64(&line_buf[1..])?)),
        b'$' => {
            let len = parse_i64(&line_buf[1..])?;
            parse_bulk_len(reader, len, line_buf)
        }
        b'*' => {
            let len = parse_i64(&line_buf[1..])?;
            parse_array_len(reader, len, line_buf, depth)
        }
        _ => Err(ClientError::Protocol),
    }
}

fn parse_bulk_len<R: BufRead>(
    reader: &mut R,
    len: i64,
    line_buf: &mut Vec<u8>,
) -> ClientResult<Value> {
    if len < 0 {
        return Ok(Value::Nil);
    }
    if len > MAX_BULK_LEN {
        return Err(ClientError::Protocol);
    }
    let len = len as usize;
    let mut data = vec![0u8; len];
    reader.read_exact(&mut data)?;

    let mut crlf = [0u8; 2];
    reader.read_exact(&mut crlf)?;
    if crlf != [b'\r', b'\n'] {
        return Err(ClientError::Protocol);
    }

    line_buf.clear();
    Ok(Value::Bulk(data))
}

fn parse_array_len<R: BufRead>(
    reader: &mut R,
    len: i64,
    line_buf: &mut Vec<u8>,
    depth: usize,
) -> ClientResult<Value> {
    if len < 0 {
        return Ok(Value::Nil);
    }
    if depth >= MAX_DEPTH {
        return Err(ClientError::Protocol);
    }

    let mut items = Vec::with_capacity(len.min(MAX_PREALLOC) as usize);
    for _ in 0..len {
        items.push(read_value(reader, line_buf, depth + 1)?);
    }
    Ok(Value::Array(items))
}

fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> ClientResult<()> {
    buf.clear();
    let bytes = reader.read_until(b'\n', buf)?;
    if bytes == 0 {
        return Err(ClientError::Protocol);
    }
    if buf.len() < 2 || buf[buf.len() - 2] != b'\r' {
        return Err(ClientError::Protocol);
    }
    buf.truncate(buf.len() - 2);
    Ok(())
}

fn parse_i64(data: &[u8]) -> ClientResult<i64> {
    if data.is_empty() {
        return Err(ClientError::Protocol);
    }
    let (negative, digits) = match data[0] {
        b'-' => (true, &data[1..]),
        _ => (false, data),
    };
    if digits.is_empty() {
        return Err(ClientError::Protocol);
    }

    let mut value: i64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return Err(ClientError::Protocol);
        }
        value = value.saturating_mul(10).saturating_add((b - b'0') as i64);
    }

    Ok(if negative { -value } else { value })
}

fn push_usize(out: &mut Vec<u8>, mut value: usize) {
    // Write digits into a small stack buffer to avoid heap allocations.
    let mut buf = [0u8; 20];
    let mut len = 0;
    if value == 0 {
        buf[0] = b'0';
        len = 1;
    } else {
        while value > 0 {
            buf[len] = b'0' + (value % 10) as u8;
            value /= 10;
            len += 1;
        }
    }
    for idx in (0..len).rev() {
        out.push(buf[idx]);
    }
}
