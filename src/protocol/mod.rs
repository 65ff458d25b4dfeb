//! Protocol module - command encoding, reply decoding, and body parsers.
//!
//! This module implements the text protocol spoken on the wire:
//! - `verb args...\r\n` command lines with optional bodies
//! - status-line replies decoded against an expected shape
//! - duration rounding to wire seconds
//! - the YAML subset used in `stats*` and `list-tubes*` bodies

pub mod duration;

mod command;
mod response;
mod yaml;

pub use command::{Command, CRLF};
pub use response::{
    decode_status, read_reply, Expect, ReadLimits, Reply, DEFAULT_MAX_BODY_SIZE,
    DEFAULT_MAX_LINE_LEN, MAX_FIELDS,
};
pub use yaml::{parse_dict, parse_list};
