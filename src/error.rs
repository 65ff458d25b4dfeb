//! Error types for beanstalk-client.
//!
//! Every failure surfaces synchronously from the call that triggered it.
//! Four families exist:
//!
//! - **Server sentinels** ([`BeanstalkError::Server`]): the server answered
//!   with one of the closed set of error tokens ([`ErrorKind`]).
//! - **Transport** ([`BeanstalkError::Io`], [`BeanstalkError::ConnectionClosed`],
//!   [`BeanstalkError::Protocol`]): the stream failed or lost framing. The
//!   connection is unusable afterwards.
//! - **Usage** ([`BeanstalkError::InvalidArgument`]): rejected before any I/O.
//! - **Unrecognized** ([`BeanstalkError::UnexpectedResponse`]): a status token
//!   outside the known set, with the raw line kept for diagnosis.

use thiserror::Error;

/// Closed set of error tokens the server may answer with.
///
/// `TimedOut` and `DeadlineSoon` are expected outcomes of reservation calls
/// rather than failures; see [`BeanstalkError::is_timeout`] and
/// [`BeanstalkError::is_deadline_soon`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorKind {
    /// `NOT_FOUND`
    #[error("not found")]
    NotFound,
    /// `TIMED_OUT`: no job became available within the requested wait.
    #[error("timeout")]
    TimedOut,
    /// `DEADLINE_SOON`: a reserved job's time-to-run is about to expire.
    #[error("deadline soon")]
    DeadlineSoon,
    /// `BAD_FORMAT`
    #[error("bad command format")]
    BadFormat,
    /// `UNKNOWN_COMMAND`
    #[error("unknown command")]
    UnknownCommand,
    /// `OUT_OF_MEMORY`
    #[error("server is out of memory")]
    OutOfMemory,
    /// `INTERNAL_ERROR`
    #[error("internal error")]
    InternalError,
    /// `EXPECTED_CRLF`
    #[error("expected CR LF")]
    ExpectedCrlf,
    /// `JOB_TOO_BIG`
    #[error("job too big")]
    JobTooBig,
    /// `DRAINING`
    #[error("draining")]
    Draining,
    /// `BURIED`
    #[error("buried")]
    Buried,
    /// `NOT_IGNORED`: the last watched tube cannot be ignored.
    #[error("not ignored")]
    NotIgnored,
}

impl ErrorKind {
    /// All kinds, in wire-token order.
    pub const ALL: [ErrorKind; 12] = [
        ErrorKind::NotFound,
        ErrorKind::TimedOut,
        ErrorKind::DeadlineSoon,
        ErrorKind::BadFormat,
        ErrorKind::UnknownCommand,
        ErrorKind::OutOfMemory,
        ErrorKind::InternalError,
        ErrorKind::ExpectedCrlf,
        ErrorKind::JobTooBig,
        ErrorKind::Draining,
        ErrorKind::Buried,
        ErrorKind::NotIgnored,
    ];

    /// Classify a status token. Returns `None` for tokens outside the set.
    pub fn from_token(token: &str) -> Option<Self> {
        let kind = match token {
            "NOT_FOUND" => ErrorKind::NotFound,
            "TIMED_OUT" => ErrorKind::TimedOut,
            "DEADLINE_SOON" => ErrorKind::DeadlineSoon,
            "BAD_FORMAT" => ErrorKind::BadFormat,
            "UNKNOWN_COMMAND" => ErrorKind::UnknownCommand,
            "OUT_OF_MEMORY" => ErrorKind::OutOfMemory,
            "INTERNAL_ERROR" => ErrorKind::InternalError,
            "EXPECTED_CRLF" => ErrorKind::ExpectedCrlf,
            "JOB_TOO_BIG" => ErrorKind::JobTooBig,
            "DRAINING" => ErrorKind::Draining,
            "BURIED" => ErrorKind::Buried,
            "NOT_IGNORED" => ErrorKind::NotIgnored,
            _ => return None,
        };
        Some(kind)
    }

    /// The wire token for this kind.
    pub fn token(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::TimedOut => "TIMED_OUT",
            ErrorKind::DeadlineSoon => "DEADLINE_SOON",
            ErrorKind::BadFormat => "BAD_FORMAT",
            ErrorKind::UnknownCommand => "UNKNOWN_COMMAND",
            ErrorKind::OutOfMemory => "OUT_OF_MEMORY",
            ErrorKind::InternalError => "INTERNAL_ERROR",
            ErrorKind::ExpectedCrlf => "EXPECTED_CRLF",
            ErrorKind::JobTooBig => "JOB_TOO_BIG",
            ErrorKind::Draining => "DRAINING",
            ErrorKind::Buried => "BURIED",
            ErrorKind::NotIgnored => "NOT_IGNORED",
        }
    }
}

/// Main error type for all beanstalk operations.
#[derive(Debug, Error)]
pub enum BeanstalkError {
    /// The server rejected `op` with a known error token.
    #[error("{op}: {kind}")]
    Server {
        /// Verb of the command that failed.
        op: &'static str,
        /// Sentinel kind.
        kind: ErrorKind,
    },

    /// The server answered `op` with a status token outside the known set.
    #[error("{op}: unexpected response {line:?}")]
    UnexpectedResponse {
        /// Verb of the command that failed.
        op: &'static str,
        /// Raw status line, CRLF stripped.
        line: String,
    },

    /// I/O error on the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream was closed, or the connection was invalidated earlier.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Framing violation (missing CRLF, oversized line or body, bad field).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Caller-supplied argument rejected before any I/O.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// JSON payload encoding/decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack payload encoding error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack payload decoding error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),
}

impl BeanstalkError {
    /// The sentinel kind, if this is a server error.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            BeanstalkError::Server { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// True if no job became available within the requested wait.
    pub fn is_timeout(&self) -> bool {
        self.kind() == Some(ErrorKind::TimedOut)
    }

    /// True if a reserved job's TTR is about to expire.
    pub fn is_deadline_soon(&self) -> bool {
        self.kind() == Some(ErrorKind::DeadlineSoon)
    }

    /// True if the server reported `NOT_FOUND`.
    pub fn is_not_found(&self) -> bool {
        self.kind() == Some(ErrorKind::NotFound)
    }

    /// True if this error leaves the connection unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BeanstalkError::Io(_) | BeanstalkError::ConnectionClosed | BeanstalkError::Protocol(_)
        )
    }
}

/// Result type alias using BeanstalkError.
pub type Result<T> = std::result::Result<T, BeanstalkError>;
