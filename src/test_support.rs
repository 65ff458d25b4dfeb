//! Scripted in-memory server for unit tests.
//!
//! The fake server writes all canned replies up front, then records every
//! byte the client sends until the client shuts down its half. `finish`
//! asserts the recorded bytes equal the expected request transcript.

use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

use crate::conn::Connection;

/// Large enough that canned replies never block the writer.
const PIPE_CAPACITY: usize = 1 << 20;

pub(crate) struct MockServer {
    expected: String,
    task: JoinHandle<Vec<u8>>,
}

impl MockServer {
    /// Wait for the client to close and compare transcripts.
    pub(crate) async fn finish(self) {
        let seen = self.task.await.unwrap();
        assert_eq!(String::from_utf8_lossy(&seen), self.expected);
    }
}

/// A connection wired to a server that expects `requests` and answers with
/// `replies`.
pub(crate) fn mock(requests: &str, replies: &str) -> (Connection<DuplexStream>, MockServer) {
    let (client, mut server) = duplex(PIPE_CAPACITY);
    let replies = replies.as_bytes().to_vec();

    let task = tokio::spawn(async move {
        server.write_all(&replies).await.unwrap();
        let mut seen = Vec::new();
        server.read_to_end(&mut seen).await.unwrap();
        seen
    });

    let server = MockServer {
        expected: requests.to_string(),
        task,
    };
    (Connection::new(client), server)
}

/// An `OK <len>` reply carrying `body`.
pub(crate) fn ok_body(body: &str) -> String {
    format!("OK {}\r\n{}\r\n", body.len(), body)
}
