//! Per-tube operations.
//!
//! A [`Tube`] is a name plus a borrow of the [`Connection`]. Commands that
//! need the tube selected (`put`, `peek-*`, `kick*`) ask the connection to
//! `use` it first; the connection skips that when it is already in use.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::codec::{JsonCodec, MsgPackCodec};
use crate::conn::Connection;
use crate::error::{BeanstalkError, Result};
use crate::job::Job;
use crate::protocol::{duration, parse_dict, Command, Expect};

/// The tube every connection starts out using and watching.
pub const DEFAULT_TUBE: &str = "default";

/// Longest tube name the server accepts, in bytes.
pub const MAX_TUBE_NAME_LEN: usize = 200;

/// Check a tube name against the server's naming rules.
///
/// Names are 1 to 200 bytes of `A-Z a-z 0-9 - + / ; . $ _ ( )` and may not
/// start with `-`.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(BeanstalkError::InvalidArgument(
            "tube name is empty".to_string(),
        ));
    }
    if name.len() > MAX_TUBE_NAME_LEN {
        return Err(BeanstalkError::InvalidArgument(format!(
            "tube name is {} bytes, limit is {}",
            name.len(),
            MAX_TUBE_NAME_LEN
        )));
    }
    if name.starts_with('-') {
        return Err(BeanstalkError::InvalidArgument(format!(
            "tube name {:?} starts with '-'",
            name
        )));
    }
    if let Some(c) = name.chars().find(|c| !is_name_char(*c)) {
        return Err(BeanstalkError::InvalidArgument(format!(
            "tube name {:?} contains {:?}",
            name, c
        )));
    }
    Ok(())
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-+/;.$_()".contains(c)
}

/// Which queue of a tube to peek at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeekState {
    /// Front of the ready queue.
    Ready,
    /// Delayed job that becomes ready next.
    Delayed,
    /// Buried job that would be kicked next.
    Buried,
}

impl PeekState {
    fn verb(self) -> &'static str {
        match self {
            PeekState::Ready => "peek-ready",
            PeekState::Delayed => "peek-delayed",
            PeekState::Buried => "peek-buried",
        }
    }
}

/// A named tube on the server connected to by a [`Connection`].
pub struct Tube<'a, S = TcpStream> {
    conn: &'a mut Connection<S>,
    name: String,
}

impl<'a, S> Tube<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Names are validated by [`Connection::tube`].
    pub(crate) fn new(conn: &'a mut Connection<S>, name: String) -> Self {
        Self { conn, name }
    }

    /// The tube name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Put a job with priority `pri` and time-to-run `ttr`, returning its id.
    ///
    /// If `delay` is nonzero the job stays delayed that long before it
    /// becomes ready. Durations round up to whole seconds.
    pub async fn put(
        &mut self,
        body: impl Into<Bytes>,
        pri: u32,
        delay: Duration,
        ttr: Duration,
    ) -> Result<u64> {
        let delay = duration::to_wire_secs(delay)?;
        let ttr = duration::to_wire_secs(ttr)?;
        let command = Command::new("put").arg(pri).arg(delay).arg(ttr).body(body);

        let reply = self
            .conn
            .cmd(Some(self.name.as_str()), None, command, Expect::INSERTED)
            .await?;
        Ok(reply.id())
    }

    /// Put `value` encoded as MsgPack.
    pub async fn put_msgpack<T: Serialize>(
        &mut self,
        value: &T,
        pri: u32,
        delay: Duration,
        ttr: Duration,
    ) -> Result<u64> {
        let body = MsgPackCodec::encode(value)?;
        self.put(body, pri, delay, ttr).await
    }

    /// Put `value` encoded as JSON.
    pub async fn put_json<T: Serialize>(
        &mut self,
        value: &T,
        pri: u32,
        delay: Duration,
        ttr: Duration,
    ) -> Result<u64> {
        let body = JsonCodec::encode(value)?;
        self.put(body, pri, delay, ttr).await
    }

    /// Get a copy of the job at the front of the ready queue.
    pub async fn peek_ready(&mut self) -> Result<Job> {
        self.peek_state(PeekState::Ready).await
    }

    /// Get a copy of the delayed job that becomes ready next.
    pub async fn peek_delayed(&mut self) -> Result<Job> {
        self.peek_state(PeekState::Delayed).await
    }

    /// Get a copy of the buried job that would be kicked next.
    pub async fn peek_buried(&mut self) -> Result<Job> {
        self.peek_state(PeekState::Buried).await
    }

    /// Peek at the head of `state`'s queue.
    pub async fn peek_state(&mut self, state: PeekState) -> Result<Job> {
        let reply = self
            .conn
            .cmd(Some(self.name.as_str()), None, Command::new(state.verb()), Expect::FOUND)
            .await?;
        Ok(Job::new(reply.id(), reply.into_body()))
    }

    /// Move up to `bound` buried jobs (or delayed jobs, if none are buried)
    /// to the ready queue. Returns how many moved.
    pub async fn kick(&mut self, bound: u64) -> Result<u64> {
        let reply = self
            .conn
            .cmd(
                Some(self.name.as_str()),
                None,
                Command::new("kick").arg(bound),
                Expect::KICKED_COUNT,
            )
            .await?;
        Ok(reply.field(0).unwrap_or_default())
    }

    /// Move one buried or delayed job to the ready queue.
    pub async fn kick_job(&mut self, id: u64) -> Result<()> {
        self.conn
            .cmd(
                Some(self.name.as_str()),
                None,
                Command::new("kick-job").arg(id),
                Expect::KICKED,
            )
            .await?;
        Ok(())
    }

    /// Delete every ready job. Returns how many were deleted.
    pub async fn flush_ready(&mut self) -> Result<u64> {
        self.flush_state(PeekState::Ready).await
    }

    /// Delete every delayed job. Returns how many were deleted.
    pub async fn flush_delayed(&mut self) -> Result<u64> {
        self.flush_state(PeekState::Delayed).await
    }

    /// Delete every buried job. Returns how many were deleted.
    pub async fn flush_buried(&mut self) -> Result<u64> {
        self.flush_state(PeekState::Buried).await
    }

    /// Flush ready, delayed, then buried jobs, stopping at the first error.
    pub async fn flush(&mut self) -> Result<u64> {
        let mut total = 0;
        for state in [PeekState::Ready, PeekState::Delayed, PeekState::Buried] {
            total += self.flush_state(state).await?;
        }
        Ok(total)
    }

    /// Peek and delete until the server reports `NOT_FOUND`.
    async fn flush_state(&mut self, state: PeekState) -> Result<u64> {
        let mut deleted = 0;
        loop {
            let job = match self.peek_state(state).await {
                Ok(job) => job,
                Err(e) if e.is_not_found() => break,
                Err(e) => return Err(e),
            };
            self.conn.delete(job.id).await?;
            deleted += 1;
        }
        tracing::debug!(tube = %self.name, ?state, deleted, "flushed");
        Ok(deleted)
    }

    /// Statistics about this tube.
    pub async fn stats(&mut self) -> Result<HashMap<String, String>> {
        let command = Command::new("stats-tube").arg(&self.name);
        let reply = self.conn.cmd(None, None, command, Expect::OK).await?;
        Ok(parse_dict(&reply.into_body()))
    }

    /// Pause new reservations from this tube for `d`.
    pub async fn pause(&mut self, d: Duration) -> Result<()> {
        let secs = duration::to_wire_secs(d)?;
        let command = Command::new("pause-tube").arg(&self.name).arg(secs);
        self.conn.cmd(None, None, command, Expect::PAUSED).await?;
        Ok(())
    }
}
