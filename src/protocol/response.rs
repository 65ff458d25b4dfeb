//! Reply decoding.
//!
//! Every command is answered by exactly one status line, optionally followed
//! by a body of a declared length:
//!
//! ```text
//! RESERVED <id> <bytes>\r\n
//! <data>\r\n
//! ```
//!
//! The caller states the shape it expects with an [`Expect`]. A matching
//! status token yields a typed [`Reply`]; a known error token yields
//! [`BeanstalkError::Server`]; anything else yields
//! [`BeanstalkError::UnexpectedResponse`] carrying the raw line.

use bytes::Bytes;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use super::command::CRLF;
use crate::error::{BeanstalkError, ErrorKind, Result};

/// Most numeric fields any success reply carries (`RESERVED id bytes`).
pub const MAX_FIELDS: usize = 2;

/// Default upper bound on a status line, excluding CRLF.
pub const DEFAULT_MAX_LINE_LEN: usize = 1024;

/// Default upper bound on a reply body (64 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024 * 1024;

/// Expected shape of a success reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expect {
    /// Success status token.
    pub token: &'static str,
    /// Number of leading numeric fields.
    pub fields: usize,
    /// Whether a body follows. Its length is the last numeric field.
    pub body: bool,
    /// Whether a name follows the numeric fields.
    pub name: bool,
}

impl Expect {
    /// `USING <tube>`
    pub const USING: Expect = Expect::named("USING");
    /// `INSERTED <id>`
    pub const INSERTED: Expect = Expect::fields("INSERTED", 1);
    /// `WATCHING <count>`
    pub const WATCHING: Expect = Expect::fields("WATCHING", 1);
    /// `RESERVED <id> <bytes>` + body
    pub const RESERVED: Expect = Expect::with_body("RESERVED", 2);
    /// `FOUND <id> <bytes>` + body
    pub const FOUND: Expect = Expect::with_body("FOUND", 2);
    /// `OK <bytes>` + body
    pub const OK: Expect = Expect::with_body("OK", 1);
    /// `DELETED`
    pub const DELETED: Expect = Expect::status("DELETED");
    /// `RELEASED`
    pub const RELEASED: Expect = Expect::status("RELEASED");
    /// `BURIED`
    pub const BURIED: Expect = Expect::status("BURIED");
    /// `TOUCHED`
    pub const TOUCHED: Expect = Expect::status("TOUCHED");
    /// `KICKED <count>`
    pub const KICKED_COUNT: Expect = Expect::fields("KICKED", 1);
    /// `KICKED`
    pub const KICKED: Expect = Expect::status("KICKED");
    /// `PAUSED`
    pub const PAUSED: Expect = Expect::status("PAUSED");

    /// A bare status token.
    pub const fn status(token: &'static str) -> Self {
        Self {
            token,
            fields: 0,
            body: false,
            name: false,
        }
    }

    /// A status token with `fields` numeric fields.
    pub const fn fields(token: &'static str, fields: usize) -> Self {
        Self {
            token,
            fields,
            body: false,
            name: false,
        }
    }

    /// A status token with numeric fields, the last being a body length.
    pub const fn with_body(token: &'static str, fields: usize) -> Self {
        Self {
            token,
            fields,
            body: true,
            name: false,
        }
    }

    /// A status token followed by a single name.
    pub const fn named(token: &'static str) -> Self {
        Self {
            token,
            fields: 0,
            body: false,
            name: true,
        }
    }
}

/// Limits applied while reading a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadLimits {
    /// Maximum status line length, excluding CRLF.
    pub max_line_len: usize,
    /// Maximum declared body length.
    pub max_body_size: usize,
}

impl Default for ReadLimits {
    fn default() -> Self {
        Self {
            max_line_len: DEFAULT_MAX_LINE_LEN,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

/// A decoded success reply.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reply {
    fields: [u64; MAX_FIELDS],
    len: usize,
    name: Option<String>,
    body: Option<Bytes>,
}

impl Reply {
    /// Numeric field `i`, or `None` if the shape carried fewer fields.
    pub fn field(&self, i: usize) -> Option<u64> {
        self.fields().get(i).copied()
    }

    /// All numeric fields.
    pub fn fields(&self) -> &[u64] {
        &self.fields[..self.len]
    }

    /// First numeric field, or 0 if none.
    pub fn id(&self) -> u64 {
        self.fields().first().copied().unwrap_or(0)
    }

    /// Trailing name, for `USING`.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Body, if the shape carried one.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Take the body, or an empty buffer.
    pub fn into_body(self) -> Bytes {
        self.body.unwrap_or_default()
    }
}

/// Read one reply from `reader` and decode it against `expect`.
///
/// Reads exactly one status line and, when a body is expected, exactly the
/// declared number of bytes plus CRLF. `op` tags any error.
pub async fn read_reply<R>(
    reader: &mut R,
    op: &'static str,
    expect: &Expect,
    limits: &ReadLimits,
) -> Result<Reply>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_line(reader, limits.max_line_len).await?;
    tracing::trace!(op, line = %line, "reply");

    let (mut reply, body_len) = decode_status(&line, op, expect)?;

    if let Some(len) = body_len {
        if len > limits.max_body_size as u64 {
            return Err(BeanstalkError::Protocol(format!(
                "{}: body size {} exceeds maximum {}",
                op, len, limits.max_body_size
            )));
        }
        reply.body = Some(read_body(reader, len as usize).await?);
    }

    Ok(reply)
}

/// Decode a status line (CRLF already stripped).
///
/// Returns the reply and, when a body follows, its declared length.
pub fn decode_status(line: &str, op: &'static str, expect: &Expect) -> Result<(Reply, Option<u64>)> {
    let mut parts = line.split(' ');
    let token = parts.next().unwrap_or("");

    if token != expect.token {
        return Err(match ErrorKind::from_token(token) {
            Some(kind) => BeanstalkError::Server { op, kind },
            None => BeanstalkError::UnexpectedResponse {
                op,
                line: line.to_string(),
            },
        });
    }

    let mut reply = Reply::default();
    for slot in reply.fields.iter_mut().take(expect.fields) {
        let raw = parts.next().ok_or_else(|| {
            BeanstalkError::Protocol(format!("{}: missing field in {:?}", op, line))
        })?;
        *slot = raw.parse().map_err(|_| {
            BeanstalkError::Protocol(format!("{}: malformed field {:?} in {:?}", op, raw, line))
        })?;
    }
    reply.len = expect.fields.min(MAX_FIELDS);

    if expect.name {
        let name = parts
            .next()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| BeanstalkError::Protocol(format!("{}: missing name in {:?}", op, line)))?;
        reply.name = Some(name.to_string());
    }

    let body_len = if expect.body && reply.len > 0 {
        Some(reply.fields[reply.len - 1])
    } else {
        None
    };

    Ok((reply, body_len))
}

async fn read_line<R>(reader: &mut R, max_line_len: usize) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::with_capacity(64);
    let limit = (max_line_len + CRLF.len()) as u64;
    let n = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;

    if n == 0 {
        return Err(BeanstalkError::ConnectionClosed);
    }
    if !buf.ends_with(b"\n") {
        if buf.len() as u64 >= limit {
            return Err(BeanstalkError::Protocol(format!(
                "status line exceeds {} bytes",
                max_line_len
            )));
        }
        return Err(BeanstalkError::ConnectionClosed);
    }
    if !buf.ends_with(CRLF) {
        return Err(BeanstalkError::Protocol(
            "status line not terminated by CRLF".to_string(),
        ));
    }
    buf.truncate(buf.len() - CRLF.len());

    String::from_utf8(buf)
        .map_err(|_| BeanstalkError::Protocol("status line is not valid UTF-8".to_string()))
}

async fn read_body<R>(reader: &mut R, len: usize) -> Result<Bytes>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = vec![0u8; len + CRLF.len()];
    reader.read_exact(&mut buf).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            BeanstalkError::ConnectionClosed
        } else {
            BeanstalkError::Io(e)
        }
    })?;

    if !buf.ends_with(CRLF) {
        return Err(BeanstalkError::Protocol(
            "body not terminated by CRLF".to_string(),
        ));
    }
    buf.truncate(len);
    Ok(Bytes::from(buf))
}
