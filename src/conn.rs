//! Connection: session state and command dispatch.
//!
//! A [`Connection`] owns the byte stream and mirrors two pieces of server
//! session state:
//!
//! - the tube last selected with `use` (where `put` enqueues)
//! - the set of watched tubes (where `reserve` draws from)
//!
//! Both start as `"default"` and change only after the server confirms the
//! corresponding command. Every operation goes through [`Connection::cmd`],
//! which first brings the session state in line with what the operation
//! needs, then sends the command and decodes its reply.
//!
//! # Concurrency
//!
//! Exactly one command is outstanding at a time. All operations take
//! `&mut self`, so sharing a connection between tasks requires the caller to
//! wrap it in a mutex; nothing is queued or locked internally.
//!
//! Reservation calls may wait for a long time. [`CloseHandle::close`] makes a
//! pending read fail promptly with [`BeanstalkError::ConnectionClosed`].
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use beanstalk_client::Connection;
//!
//! let mut conn = Connection::connect("127.0.0.1:11300").await?;
//! let id = conn.tube("emails")?.put("hello", 1, Duration::ZERO, Duration::from_secs(120)).await?;
//! let job = conn.tube_set(["emails"])?.reserve_with_timeout(Duration::from_secs(5)).await?;
//! conn.delete(job.id).await?;
//! ```

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::sync::CancellationToken;

use crate::error::{BeanstalkError, Result};
use crate::job::Job;
use crate::protocol::{
    duration, parse_dict, parse_list, read_reply, Command, Expect, ReadLimits, Reply,
    DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_LINE_LEN,
};
use crate::transport::connect_tcp;
use crate::tube::{validate_name, Tube, DEFAULT_TUBE};
use crate::tube_set::TubeSet;
use crate::watch::plan;

/// Default timeout for establishing a TCP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnConfig {
    /// Timeout for establishing the TCP connection. `None` waits forever.
    pub connect_timeout: Option<Duration>,
    /// Maximum reply status line length, excluding CRLF.
    pub max_line_len: usize,
    /// Maximum reply body size accepted from the server.
    pub max_body_size: usize,
}

impl Default for ConnConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            max_line_len: DEFAULT_MAX_LINE_LEN,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl ConnConfig {
    fn limits(&self) -> ReadLimits {
        ReadLimits {
            max_line_len: self.max_line_len,
            max_body_size: self.max_body_size,
        }
    }
}

/// Builder for configuring and opening a [`Connection`].
#[derive(Debug, Clone, Default)]
pub struct ConnectionBuilder {
    config: ConnConfig,
}

impl ConnectionBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connect timeout.
    ///
    /// Default: 10 seconds
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Wait indefinitely when connecting.
    pub fn no_connect_timeout(mut self) -> Self {
        self.config.connect_timeout = None;
        self
    }

    /// Set the maximum reply status line length.
    ///
    /// Default: 1024
    pub fn max_line_len(mut self, len: usize) -> Self {
        self.config.max_line_len = len;
        self
    }

    /// Set the maximum reply body size.
    ///
    /// Default: 64 MiB
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    /// The configuration built so far.
    pub fn config(&self) -> &ConnConfig {
        &self.config
    }

    /// Connect over TCP.
    pub async fn connect<A: ToSocketAddrs>(self, addr: A) -> Result<Connection<TcpStream>> {
        let stream = connect_tcp(addr, self.config.connect_timeout).await?;
        Ok(Connection::with_config(stream, self.config))
    }

    /// Wrap an already-open stream.
    pub fn build<S>(self, stream: S) -> Connection<S>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        Connection::with_config(stream, self.config)
    }
}

/// Handle that closes a connection from outside its owner.
///
/// Cheap to clone and `Send`, so it can be moved into another task while the
/// owner is blocked in a reservation.
#[derive(Debug, Clone)]
pub struct CloseHandle {
    token: CancellationToken,
}

impl CloseHandle {
    /// Close the connection. A pending read fails with
    /// [`BeanstalkError::ConnectionClosed`]; later calls fail the same way.
    pub fn close(&self) {
        self.token.cancel();
    }

    /// True once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ready,
    /// A command was sent and its reply not yet fully read.
    InFlight,
    /// Transport failed, framing was lost, or the connection was closed.
    Broken,
}

/// A connection to a beanstalkd server.
pub struct Connection<S = TcpStream> {
    stream: BufStream<S>,
    config: ConnConfig,
    used: String,
    watched: BTreeSet<String>,
    state: State,
    cancel: CancellationToken,
}

impl Connection<TcpStream> {
    /// Connect over TCP with default settings.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        ConnectionBuilder::new().connect(addr).await
    }

    /// Create a connection builder.
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already-open stream with default settings.
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, ConnConfig::default())
    }

    /// Wrap an already-open stream.
    pub fn with_config(stream: S, config: ConnConfig) -> Self {
        Self {
            stream: BufStream::new(stream),
            config,
            used: DEFAULT_TUBE.to_string(),
            watched: BTreeSet::from([DEFAULT_TUBE.to_string()]),
            state: State::Ready,
            cancel: CancellationToken::new(),
        }
    }

    /// The tube `put` currently targets, as last confirmed by the server.
    pub fn used_tube(&self) -> &str {
        &self.used
    }

    /// The watched set, as last confirmed by the server.
    pub fn watched_tubes(&self) -> &BTreeSet<String> {
        &self.watched
    }

    /// The active configuration.
    pub fn config(&self) -> &ConnConfig {
        &self.config
    }

    /// True if the connection can no longer be used.
    pub fn is_broken(&self) -> bool {
        self.state == State::Broken || self.cancel.is_cancelled()
    }

    /// A handle that can close this connection from another task.
    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle {
            token: self.cancel.clone(),
        }
    }

    /// Flush and shut down the stream.
    pub async fn close(mut self) -> Result<()> {
        self.cancel.cancel();
        self.state = State::Broken;
        self.stream.shutdown().await?;
        Ok(())
    }

    /// Borrow tube `name` for per-tube operations.
    ///
    /// # Errors
    ///
    /// Returns [`BeanstalkError::InvalidArgument`] if the name is invalid.
    pub fn tube(&mut self, name: impl Into<String>) -> Result<Tube<'_, S>> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Tube::new(self, name))
    }

    /// Borrow a set of tubes for reservation.
    ///
    /// # Errors
    ///
    /// Returns [`BeanstalkError::InvalidArgument`] if the set is empty or a
    /// name is invalid.
    pub fn tube_set<I, N>(&mut self, names: I) -> Result<TubeSet<'_, S>>
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let names: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(BeanstalkError::InvalidArgument(
                "tube set must name at least one tube".to_string(),
            ));
        }
        for name in &names {
            validate_name(name)?;
        }
        Ok(TubeSet::new(self, names))
    }

    fn default_tube(&mut self) -> Tube<'_, S> {
        Tube::new(self, DEFAULT_TUBE.to_string())
    }

    fn default_tube_set(&mut self) -> TubeSet<'_, S> {
        TubeSet::new(self, BTreeSet::from([DEFAULT_TUBE.to_string()]))
    }

    /// Dispatch a command.
    ///
    /// 1. If `tube` differs from the used tube, send `use` and require
    ///    success first.
    /// 2. If `tubes` is given, converge the watched set to it.
    /// 3. Send `command` and decode its reply against `expect`.
    ///
    /// A failure in step 1 or 2 is returned without sending `command`.
    /// Tube names are validated before anything is written.
    ///
    /// An unrecognised status line leaves the connection usable only when
    /// `expect` carries no body. Otherwise the length of any trailing data is
    /// unknown and the connection is marked broken.
    pub async fn cmd(
        &mut self,
        tube: Option<&str>,
        tubes: Option<&BTreeSet<String>>,
        command: Command,
        expect: Expect,
    ) -> Result<Reply> {
        if let Some(tube) = tube {
            validate_name(tube)?;
        }
        if let Some(tubes) = tubes {
            for name in tubes {
                validate_name(name)?;
            }
        }

        if let Some(tube) = tube {
            if tube != self.used {
                self.use_tube(tube).await?;
            }
        }
        if let Some(tubes) = tubes {
            self.reconcile(tubes).await?;
        }
        self.exchange(&command, &expect).await
    }

    async fn use_tube(&mut self, tube: &str) -> Result<()> {
        tracing::debug!(tube, "use");
        self.exchange(&Command::new("use").arg(tube), &Expect::USING)
            .await?;
        self.used = tube.to_string();
        Ok(())
    }

    async fn reconcile(&mut self, desired: &BTreeSet<String>) -> Result<()> {
        for step in plan(&self.watched, desired)? {
            tracing::debug!(verb = step.verb(), tube = step.tube(), "reconcile watch set");
            let command = Command::new(step.verb()).arg(step.tube());
            let reply = self.exchange(&command, &Expect::WATCHING).await?;
            step.apply(&mut self.watched);

            let count = reply.field(0).unwrap_or_default();
            if count != self.watched.len() as u64 {
                tracing::warn!(
                    server = count,
                    local = self.watched.len(),
                    "watched tube count disagrees with server"
                );
            }
        }
        Ok(())
    }

    /// One command/reply exchange. Marks the connection broken on transport
    /// or framing failure.
    async fn exchange(&mut self, command: &Command, expect: &Expect) -> Result<Reply> {
        self.ensure_usable()?;
        self.state = State::InFlight;

        let result = self.exchange_inner(command, expect).await;
        match &result {
            Err(err) if err.is_fatal() => self.invalidate(command.verb(), err),
            // Framing is lost if a body may follow an unknown status line.
            Err(err @ BeanstalkError::UnexpectedResponse { .. }) if expect.body => {
                self.invalidate(command.verb(), err)
            }
            _ => self.state = State::Ready,
        }
        result
    }

    async fn exchange_inner(&mut self, command: &Command, expect: &Expect) -> Result<Reply> {
        tracing::debug!(verb = command.verb(), args = ?command.args(), "send");
        self.stream.write_all(&command.encode()).await?;
        self.stream.flush().await?;

        let limits = self.config.limits();
        let Self { stream, cancel, .. } = self;

        tokio::select! {
            reply = read_reply(stream, command.verb(), expect, &limits) => reply,
            _ = cancel.cancelled() => Err(BeanstalkError::ConnectionClosed),
        }
    }

    fn ensure_usable(&mut self) -> Result<()> {
        if self.cancel.is_cancelled() {
            self.state = State::Broken;
        }
        match self.state {
            State::Ready => Ok(()),
            State::InFlight => {
                // The previous exchange was abandoned mid-reply.
                tracing::warn!("previous command was cancelled; connection invalidated");
                self.state = State::Broken;
                Err(BeanstalkError::ConnectionClosed)
            }
            State::Broken => Err(BeanstalkError::ConnectionClosed),
        }
    }

    fn invalidate(&mut self, verb: &'static str, err: &BeanstalkError) {
        if self.state != State::Broken {
            tracing::warn!(verb, error = %err, "connection invalidated");
        }
        self.state = State::Broken;
    }

    // Job operations. These act on an id alone and need no tube state.

    /// Delete a job.
    pub async fn delete(&mut self, id: u64) -> Result<()> {
        self.cmd(None, None, Command::new("delete").arg(id), Expect::DELETED)
            .await?;
        Ok(())
    }

    /// Release a reserved job back to the ready queue (or delayed, if
    /// `delay` is nonzero) with priority `pri`.
    pub async fn release(&mut self, id: u64, pri: u32, delay: Duration) -> Result<()> {
        let delay = duration::to_wire_secs(delay)?;
        let command = Command::new("release").arg(id).arg(pri).arg(delay);
        self.cmd(None, None, command, Expect::RELEASED).await?;
        Ok(())
    }

    /// Bury a reserved job with priority `pri`.
    pub async fn bury(&mut self, id: u64, pri: u32) -> Result<()> {
        let command = Command::new("bury").arg(id).arg(pri);
        self.cmd(None, None, command, Expect::BURIED).await?;
        Ok(())
    }

    /// Reset a reserved job's time-to-run.
    pub async fn touch(&mut self, id: u64) -> Result<()> {
        self.cmd(None, None, Command::new("touch").arg(id), Expect::TOUCHED)
            .await?;
        Ok(())
    }

    /// Get a copy of job `id`.
    pub async fn peek(&mut self, id: u64) -> Result<Job> {
        let reply = self
            .cmd(None, None, Command::new("peek").arg(id), Expect::FOUND)
            .await?;
        Ok(Job::new(reply.id(), reply.into_body()))
    }

    /// Statistics about job `id`.
    pub async fn stats_job(&mut self, id: u64) -> Result<HashMap<String, String>> {
        let reply = self
            .cmd(None, None, Command::new("stats-job").arg(id), Expect::OK)
            .await?;
        Ok(parse_dict(&reply.into_body()))
    }

    /// Server-wide statistics.
    pub async fn stats(&mut self) -> Result<HashMap<String, String>> {
        let reply = self
            .cmd(None, None, Command::new("stats"), Expect::OK)
            .await?;
        Ok(parse_dict(&reply.into_body()))
    }

    /// Names of all existing tubes.
    pub async fn list_tubes(&mut self) -> Result<Vec<String>> {
        let reply = self
            .cmd(None, None, Command::new("list-tubes"), Expect::OK)
            .await?;
        Ok(parse_list(&reply.into_body()))
    }

    /// The tube the server reports as used.
    pub async fn list_tube_used(&mut self) -> Result<String> {
        let reply = self
            .cmd(None, None, Command::new("list-tube-used"), Expect::USING)
            .await?;
        Ok(reply.name().unwrap_or_default().to_string())
    }

    /// The tubes the server reports as watched.
    pub async fn list_tubes_watched(&mut self) -> Result<Vec<String>> {
        let reply = self
            .cmd(None, None, Command::new("list-tubes-watched"), Expect::OK)
            .await?;
        Ok(parse_list(&reply.into_body()))
    }

    // Shortcuts for the "default" tube and tube set.

    /// [`Tube::put`] on `"default"`.
    pub async fn put(
        &mut self,
        body: impl Into<Bytes>,
        pri: u32,
        delay: Duration,
        ttr: Duration,
    ) -> Result<u64> {
        self.default_tube().put(body, pri, delay, ttr).await
    }

    /// [`Tube::peek_ready`] on `"default"`.
    pub async fn peek_ready(&mut self) -> Result<Job> {
        self.default_tube().peek_ready().await
    }

    /// [`Tube::peek_delayed`] on `"default"`.
    pub async fn peek_delayed(&mut self) -> Result<Job> {
        self.default_tube().peek_delayed().await
    }

    /// [`Tube::peek_buried`] on `"default"`.
    pub async fn peek_buried(&mut self) -> Result<Job> {
        self.default_tube().peek_buried().await
    }

    /// [`Tube::kick`] on `"default"`.
    pub async fn kick(&mut self, bound: u64) -> Result<u64> {
        self.default_tube().kick(bound).await
    }

    /// [`Tube::kick_job`] on `"default"`.
    pub async fn kick_job(&mut self, id: u64) -> Result<()> {
        self.default_tube().kick_job(id).await
    }

    /// [`Tube::flush_ready`] on `"default"`.
    pub async fn flush_ready(&mut self) -> Result<u64> {
        self.default_tube().flush_ready().await
    }

    /// [`Tube::flush_delayed`] on `"default"`.
    pub async fn flush_delayed(&mut self) -> Result<u64> {
        self.default_tube().flush_delayed().await
    }

    /// [`Tube::flush_buried`] on `"default"`.
    pub async fn flush_buried(&mut self) -> Result<u64> {
        self.default_tube().flush_buried().await
    }

    /// [`Tube::pause`] on `"default"`.
    pub async fn pause(&mut self, d: Duration) -> Result<()> {
        self.default_tube().pause(d).await
    }

    /// [`TubeSet::reserve`] on `{"default"}`.
    pub async fn reserve(&mut self) -> Result<Job> {
        self.default_tube_set().reserve().await
    }

    /// [`TubeSet::reserve_with_timeout`] on `{"default"}`.
    pub async fn reserve_with_timeout(&mut self, timeout: Duration) -> Result<Job> {
        self.default_tube_set().reserve_with_timeout(timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::{mock, ok_body};

    #[tokio::test]
    async fn test_initial_state() {
        let (conn, server) = mock("", "");
        assert_eq!(conn.used_tube(), "default");
        assert_eq!(
            conn.watched_tubes().iter().collect::<Vec<_>>(),
            vec!["default"]
        );
        assert!(!conn.is_broken());
        conn.close().await.unwrap();
        server.finish().await;
    }

    #[tokio::test]
    async fn test_delete() {
        let (mut conn, server) = mock("delete 1\r\n", "DELETED\r\n");
        conn.delete(1).await.unwrap();
        conn.close().await.unwrap();
        server.finish().await;
    }

    #[tokio::test]
    async fn test_delete_not_found() {
        let (mut conn, server) = mock("delete 9\r\n", "NOT_FOUND\r\n");
        let err = conn.delete(9).await.unwrap_err();
        assert!(matches!(
            err,
            BeanstalkError::Server {
                op: "delete",
                kind: ErrorKind::NotFound
            }
        ));
        assert!(!conn.is_broken());
        conn.close().await.unwrap();
        server.finish().await;
    }

    #[tokio::test]
    async fn test_release() {
        let (mut conn, server) = mock("release 1 10 2\r\n", "RELEASED\r\n");
        conn.release(1, 10, Duration::from_millis(1500)).await.unwrap();
        conn.close().await.unwrap();
        server.finish().await;
    }

    #[tokio::test]
    async fn test_release_buried_is_error() {
        let (mut conn, server) = mock("release 1 0 0\r\n", "BURIED\r\n");
        let err = conn.release(1, 0, Duration::ZERO).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Buried));
        conn.close().await.unwrap();
        server.finish().await;
    }

    #[tokio::test]
    async fn test_bury_and_touch() {
        let (mut conn, server) = mock("bury 1 3\r\ntouch 1\r\n", "BURIED\r\nTOUCHED\r\n");
        conn.bury(1, 3).await.unwrap();
        conn.touch(1).await.unwrap();
        conn.close().await.unwrap();
        server.finish().await;
    }

    #[tokio::test]
    async fn test_peek() {
        let (mut conn, server) = mock("peek 4\r\n", "FOUND 4 5\r\nhello\r\n");
        let job = conn.peek(4).await.unwrap();
        assert_eq!(job.id, 4);
        assert_eq!(&job.body[..], b"hello");
        conn.close().await.unwrap();
        server.finish().await;
    }

    #[tokio::test]
    async fn test_stats() {
        let replies = ok_body("---\ncurrent-jobs-ready: 1\n") + &ok_body("---\nid: 2\nx\n");
        let (mut conn, server) = mock("stats\r\nstats-job 2\r\n", &replies);
        let stats = conn.stats().await.unwrap();
        assert_eq!(stats["current-jobs-ready"], "1");

        let stats = conn.stats_job(2).await.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats["id"], "2");
        conn.close().await.unwrap();
        server.finish().await;
    }

    #[tokio::test]
    async fn test_list_tubes() {
        let replies = ok_body("---\n- default\n- jobs\n")
            + "USING default\r\n"
            + &ok_body("---\n- default\n");
        let (mut conn, server) = mock(
            "list-tubes\r\nlist-tube-used\r\nlist-tubes-watched\r\n",
            &replies,
        );
        assert_eq!(conn.list_tubes().await.unwrap(), vec!["default", "jobs"]);
        assert_eq!(conn.list_tube_used().await.unwrap(), "default");
        assert_eq!(conn.list_tubes_watched().await.unwrap(), vec!["default"]);
        conn.close().await.unwrap();
        server.finish().await;
    }

    #[tokio::test]
    async fn test_use_failure_skips_command_and_keeps_state() {
        let (mut conn, server) = mock("use jobs\r\n", "OUT_OF_MEMORY\r\n");
        let err = conn
            .tube("jobs")
            .unwrap()
            .put("x", 0, Duration::ZERO, Duration::ZERO)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BeanstalkError::Server {
                op: "use",
                kind: ErrorKind::OutOfMemory
            }
        ));
        assert_eq!(conn.used_tube(), "default");
        conn.close().await.unwrap();
        server.finish().await;
    }

    #[tokio::test]
    async fn test_reconcile_failure_stops_and_keeps_confirmed_steps() {
        let (mut conn, server) = mock(
            "watch a\r\nwatch b\r\n",
            "WATCHING 2\r\nOUT_OF_MEMORY\r\n",
        );
        let err = conn
            .tube_set(["a", "b"])
            .unwrap()
            .reserve()
            .await
            .unwrap_err();

        assert!(matches!(err, BeanstalkError::Server { op: "watch", .. }));
        let watched: Vec<_> = conn.watched_tubes().iter().cloned().collect();
        assert_eq!(watched, vec!["a", "default"]);
        conn.close().await.unwrap();
        server.finish().await;
    }

    #[tokio::test]
    async fn test_unexpected_response_keeps_connection() {
        let (mut conn, server) = mock("touch 1\r\ntouch 1\r\n", "HUH\r\nTOUCHED\r\n");
        let err = conn.touch(1).await.unwrap_err();
        assert!(matches!(
            err,
            BeanstalkError::UnexpectedResponse { op: "touch", ref line } if line == "HUH"
        ));
        conn.touch(1).await.unwrap();
        conn.close().await.unwrap();
        server.finish().await;
    }

    #[tokio::test]
    async fn test_unexpected_response_with_body_invalidates() {
        let (mut conn, server) = mock("peek 1\r\n", "HUH 3\r\nabc\r\n");
        let err = conn.peek(1).await.unwrap_err();
        assert!(matches!(
            err,
            BeanstalkError::UnexpectedResponse { op: "peek", ref line } if line == "HUH 3"
        ));
        assert!(conn.is_broken());

        let err = conn.delete(1).await.unwrap_err();
        assert!(matches!(err, BeanstalkError::ConnectionClosed));
        drop(conn);
        server.finish().await;
    }

    #[tokio::test]
    async fn test_cmd_rejects_invalid_tube_names() {
        let (mut conn, server) = mock("", "");

        let err = conn
            .cmd(
                Some("a\r\nkick 100"),
                None,
                Command::new("kick").arg(1),
                Expect::KICKED_COUNT,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BeanstalkError::InvalidArgument(_)));

        let tubes = BTreeSet::from(["ok".to_string(), "bad name".to_string()]);
        let err = conn
            .cmd(None, Some(&tubes), Command::new("reserve"), Expect::RESERVED)
            .await
            .unwrap_err();
        assert!(matches!(err, BeanstalkError::InvalidArgument(_)));

        assert!(!conn.is_broken());
        assert_eq!(conn.used_tube(), "default");
        assert_eq!(conn.watched_tubes().len(), 1);
        conn.close().await.unwrap();
        server.finish().await;
    }

    #[tokio::test]
    async fn test_transport_failure_invalidates() {
        // Server hangs up without replying.
        let (client, server) = tokio::io::duplex(4096);
        drop(server);
        let mut conn = Connection::new(client);

        let err = conn.delete(1).await.unwrap_err();
        assert!(err.is_fatal());
        assert!(conn.is_broken());

        let err = conn.delete(2).await.unwrap_err();
        assert!(matches!(err, BeanstalkError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_protocol_violation_invalidates() {
        let (mut conn, server) = mock("peek 1\r\n", "FOUND 1 3\r\nabcd\r\n");
        let err = conn.peek(1).await.unwrap_err();
        assert!(matches!(err, BeanstalkError::Protocol(_)));
        assert!(conn.is_broken());
        assert!(matches!(
            conn.touch(1).await,
            Err(BeanstalkError::ConnectionClosed)
        ));
        conn.close().await.unwrap();
        server.finish().await;
    }

    #[tokio::test]
    async fn test_close_handle_unblocks_reserve() {
        let (client, _server) = tokio::io::duplex(4096);
        let mut conn = Connection::new(client);
        let handle = conn.close_handle();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.close();
        });

        let result = tokio::time::timeout(Duration::from_secs(5), conn.reserve()).await;
        let err = result.expect("reserve should be unblocked").unwrap_err();
        assert!(matches!(err, BeanstalkError::ConnectionClosed));
        assert!(conn.is_broken());
    }

    #[tokio::test]
    async fn test_close_before_first_command() {
        let (mut conn, server) = mock("", "");
        let handle = conn.close_handle();
        let other = handle.clone();
        assert!(!other.is_closed());

        handle.close();
        assert!(other.is_closed());
        assert!(conn.is_broken());

        let err = conn.touch(1).await.unwrap_err();
        assert!(matches!(err, BeanstalkError::ConnectionClosed));
        drop(conn);
        server.finish().await;
    }

    #[tokio::test]
    async fn test_cancelled_exchange_invalidates() {
        let (client, _server) = tokio::io::duplex(4096);
        let mut conn = Connection::new(client);

        let abandoned =
            tokio::time::timeout(Duration::from_millis(10), conn.reserve()).await;
        assert!(abandoned.is_err());

        let err = conn.delete(1).await.unwrap_err();
        assert!(matches!(err, BeanstalkError::ConnectionClosed));
        assert!(conn.is_broken());
    }

    #[tokio::test]
    async fn test_builder_configuration() {
        let builder = Connection::builder()
            .connect_timeout(Duration::from_secs(1))
            .max_line_len(256)
            .max_body_size(1024);

        assert_eq!(builder.config().connect_timeout, Some(Duration::from_secs(1)));
        assert_eq!(builder.config().max_line_len, 256);
        assert_eq!(builder.config().max_body_size, 1024);

        let builder = builder.no_connect_timeout();
        assert_eq!(builder.config().connect_timeout, None);

        let (client, _server) = tokio::io::duplex(64);
        let conn = builder.build(client);
        assert_eq!(conn.config().max_body_size, 1024);
    }

    #[tokio::test]
    async fn test_body_limit_from_config() {
        let (client, mut server) = tokio::io::duplex(4096);
        let mut conn = Connection::builder().max_body_size(2).build(client);

        server.write_all(b"FOUND 1 3\r\nabc\r\n").await.unwrap();

        let err = conn.peek(1).await.unwrap_err();
        assert!(matches!(err, BeanstalkError::Protocol(_)));
    }

    #[test]
    fn test_tube_set_rejects_empty() {
        let (client, _server) = tokio::io::duplex(64);
        let mut conn = Connection::new(client);
        let empty: [&str; 0] = [];
        assert!(matches!(
            conn.tube_set(empty),
            Err(BeanstalkError::InvalidArgument(_))
        ));
        assert!(conn.tube("bad name").is_err());
    }
}
