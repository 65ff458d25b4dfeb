//! Reservation from a set of tubes.

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::conn::Connection;
use crate::error::Result;
use crate::job::Job;
use crate::protocol::{duration, Command, Expect};

/// A set of tubes on the server connected to by a [`Connection`].
///
/// Before each reservation the connection's watched set is converged to
/// exactly these names.
pub struct TubeSet<'a, S = TcpStream> {
    conn: &'a mut Connection<S>,
    names: BTreeSet<String>,
}

impl<'a, S> TubeSet<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Names are validated by [`Connection::tube_set`].
    pub(crate) fn new(conn: &'a mut Connection<S>, names: BTreeSet<String>) -> Self {
        Self { conn, names }
    }

    /// The tube names, in lexical order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Reserve a job, waiting as long as it takes.
    ///
    /// Fails with [`ErrorKind::DeadlineSoon`](crate::ErrorKind::DeadlineSoon)
    /// if a job already reserved by this connection is about to time out.
    pub async fn reserve(&mut self) -> Result<Job> {
        let reply = self
            .conn
            .cmd(None, Some(&self.names), Command::new("reserve"), Expect::RESERVED)
            .await?;
        Ok(Job::new(reply.id(), reply.into_body()))
    }

    /// Reserve a job, waiting at most `timeout` (rounded up to whole
    /// seconds; zero polls).
    ///
    /// Fails with [`ErrorKind::TimedOut`](crate::ErrorKind::TimedOut) if no
    /// job became available in time.
    pub async fn reserve_with_timeout(&mut self, timeout: Duration) -> Result<Job> {
        let secs = duration::to_wire_secs(timeout)?;
        let command = Command::new("reserve-with-timeout").arg(secs);
        let reply = self
            .conn
            .cmd(None, Some(&self.names), command, Expect::RESERVED)
            .await?;
        Ok(Job::new(reply.id(), reply.into_body()))
    }
}
