//! # RESP2 Framing
//!
//! Requests go out as arrays of bulk strings; replies are parsed top-down
//! into `Reply`. Bulk payloads are raw bytes, so BSON blobs pass through
//! unchanged.

use std::io::{self, BufRead, Read};

use bytes::{BufMut, BytesMut};

use crate::error::{StoreError, StoreResult};

/// Upper bound on buffer space reserved up front from a length header.
const MAX_PREALLOC: usize = 1024;

/// One parsed server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+OK` style status line.
    Status(String),
    /// `-ERR ...` error line.
    Error(String),
    /// `:n` integer.
    Integer(i64),
    /// `$n` bulk string; `None` for the null bulk (`$-1`).
    Bulk(Option<Vec<u8>>),
    /// `*n` array.
    Array(Vec<Reply>),
}

impl Reply {
    /// Turns an error line into `StoreError::Server`, passing other replies through.
    pub fn into_result(self) -> StoreResult<Reply> {
        match self {
            Reply::Error(message) => Err(StoreError::Server { message }),
            other => Ok(other),
        }
    }
}

/// Appends `args` to `out` as a RESP array of bulk strings.
pub fn encode_command(args: &[&[u8]], out: &mut BytesMut) {
    let payload: usize = args.iter().map(|arg| arg.len() + 16).sum();
    out.reserve(payload + 16);
    put_header(out, b'*', args.len());
    for arg in args {
        put_header(out, b'$', arg.len());
        out.put_slice(arg);
        out.put_slice(b"\r\n");
    }
}

fn put_header(out: &mut BytesMut, marker: u8, len: usize) {
    out.put_u8(marker);
    out.put_slice(len.to_string().as_bytes());
    out.put_slice(b"\r\n");
}

/// Reads one complete reply from `reader`.
///
/// `line` is scratch space reused across calls.
pub fn read_reply<R: BufRead>(reader: &mut R, line: &mut Vec<u8>) -> StoreResult<Reply> {
    read_line(reader, line)?;
    let (&marker, rest) = line
        .split_first()
        .ok_or(StoreError::Protocol("empty reply line"))?;

    match marker {
        b'+' => Ok(Reply::Status(String::from_utf8_lossy(rest).into_owned())),
        b'-' => Ok(Reply::Error(String::from_utf8_lossy(rest).into_owned())),
        b':' => Ok(Reply::Integer(parse_len(rest)?)),
        b'$' => {
            let len = parse_len(rest)?;
            read_bulk(reader, len)
        }
        b'*' => {
            let len = parse_len(rest)?;
            let mut items = Vec::with_capacity((len.max(0) as usize).min(MAX_PREALLOC));
            for _ in 0..len.max(0) {
                items.push(read_reply(reader, line)?);
            }
            Ok(Reply::Array(items))
        }
        _ => Err(StoreError::Protocol("unknown reply marker")),
    }
}

fn read_bulk<R: BufRead>(reader: &mut R, len: i64) -> StoreResult<Reply> {
    if len < 0 {
        return Ok(Reply::Bulk(None));
    }
    // Grow with the bytes actually received rather than trusting the header.
    let framed = len as u64 + 2;
    let mut data = Vec::with_capacity(framed.min(MAX_PREALLOC as u64) as usize);
    reader.by_ref().take(framed).read_to_end(&mut data)?;
    if (data.len() as u64) < framed {
        return Err(closed_by_server());
    }
    if !data.ends_with(b"\r\n") {
        return Err(StoreError::Protocol("bulk string missing terminator"));
    }
    data.truncate(len as usize);
    Ok(Reply::Bulk(Some(data)))
}

fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> StoreResult<()> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        // Peer closed the socket; surfaced as I/O so the command can be retried.
        return Err(closed_by_server());
    }
    if !buf.ends_with(b"\r\n") {
        return Err(StoreError::Protocol("reply line missing terminator"));
    }
    buf.truncate(buf.len() - 2);
    Ok(())
}

fn closed_by_server() -> StoreError {
    io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed by server").into()
}

fn parse_len(digits: &[u8]) -> StoreResult<i64> {
    std::str::from_utf8(digits)
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or(StoreError::Protocol("invalid integer in reply"))
}
