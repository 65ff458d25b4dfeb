//! Command encoding.
//!
//! A command is one ASCII line:
//!
//! ```text
//! verb arg1 arg2 ...\r\n
//! ```
//!
//! Commands that carry a body (only `put`) append the body's byte length as
//! the final argument and send the body as a second line:
//!
//! ```text
//! put 0 0 120 5\r\n
//! hello\r\n
//! ```

use std::fmt::Display;

use bytes::{BufMut, Bytes, BytesMut};

/// Line terminator for commands, replies, and bodies.
pub const CRLF: &[u8] = b"\r\n";

/// A verb, its positional arguments, and an optional raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    verb: &'static str,
    args: Vec<String>,
    body: Option<Bytes>,
}

impl Command {
    /// Create a command with no arguments.
    pub fn new(verb: &'static str) -> Self {
        Self {
            verb,
            args: Vec::new(),
            body: None,
        }
    }

    /// Append a positional argument.
    pub fn arg(mut self, arg: impl Display) -> Self {
        self.args.push(arg.to_string());
        self
    }

    /// Attach a body. Its length is appended as the last argument on encode.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// The command verb, used to tag errors.
    #[inline]
    pub fn verb(&self) -> &'static str {
        self.verb
    }

    /// Positional arguments, excluding the implicit body length.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The attached body, if any.
    pub fn payload(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        let mut len = self.verb.len() + CRLF.len();
        len += self.args.iter().map(|a| a.len() + 1).sum::<usize>();
        if let Some(body) = &self.body {
            len += 1 + decimal_len(body.len()) + body.len() + CRLF.len();
        }
        len
    }

    /// Encode into a fresh buffer.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Encode into an existing buffer.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_slice(self.verb.as_bytes());
        for arg in &self.args {
            buf.put_u8(b' ');
            buf.put_slice(arg.as_bytes());
        }
        match &self.body {
            Some(body) => {
                buf.put_u8(b' ');
                buf.put_slice(body.len().to_string().as_bytes());
                buf.put_slice(CRLF);
                buf.put_slice(body);
                buf.put_slice(CRLF);
            }
            None => buf.put_slice(CRLF),
        }
    }
}

fn decimal_len(mut n: usize) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_bare_verb() {
        let cmd = Command::new("peek-ready");
        assert_eq!(&cmd.encode()[..], b"peek-ready\r\n");
    }

    #[test]
    fn test_encode_with_args() {
        let cmd = Command::new("release").arg(7u64).arg(1024u32).arg(0u32);
        assert_eq!(&cmd.encode()[..], b"release 7 1024 0\r\n");
    }

    #[test]
    fn test_encode_put_appends_body_length() {
        let cmd = Command::new("put").arg(0).arg(0).arg(0).body("foo");
        assert_eq!(&cmd.encode()[..], b"put 0 0 0 3\r\nfoo\r\n");
    }

    #[test]
    fn test_empty_body_still_framed() {
        let cmd = Command::new("put").arg(1).arg(0).arg(60).body(Bytes::new());
        assert_eq!(&cmd.encode()[..], b"put 1 0 60 0\r\n\r\n");
    }

    #[test]
    fn test_body_is_written_unmodified() {
        let body: Vec<u8> = vec![0, 13, 10, 255, b' '];
        let cmd = Command::new("put").arg(0).arg(0).arg(1).body(body.clone());
        let encoded = cmd.encode();

        let header = b"put 0 0 1 5\r\n";
        assert_eq!(&encoded[..header.len()], header);
        assert_eq!(&encoded[header.len()..header.len() + 5], &body[..]);
        assert!(encoded.ends_with(CRLF));
    }

    #[test]
    fn test_encoded_len_matches_encoding() {
        let cmds = [
            Command::new("stats"),
            Command::new("use").arg("emails"),
            Command::new("put").arg(4294967295u32).arg(0).arg(120).body(vec![b'x'; 12345]),
        ];
        for cmd in cmds {
            assert_eq!(cmd.encoded_len(), cmd.encode().len());
        }
    }

    #[test]
    fn test_accessors() {
        let cmd = Command::new("watch").arg("jobs");
        assert_eq!(cmd.verb(), "watch");
        assert_eq!(cmd.args(), &["jobs".to_string()]);
        assert!(cmd.payload().is_none());
    }
}
