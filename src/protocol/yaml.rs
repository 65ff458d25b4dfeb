//! Parsers for the YAML subset used in `stats*` and `list-tubes*` bodies.
//!
//! The server only ever emits a `---` marker followed by a flat mapping
//!
//! ```text
//! ---
//! name: default
//! current-jobs-ready: 0
//! ```
//!
//! or a flat sequence
//!
//! ```text
//! ---
//! - default
//! - emails
//! ```
//!
//! Parsing is lenient: stray lines are skipped, never rejected, so new
//! server fields cannot break old clients.

use std::collections::HashMap;

/// Document start marker.
const MARKER: &str = "---";

/// Parse a flat `key: value` mapping. First occurrence of a key wins.
pub fn parse_dict(body: &[u8]) -> HashMap<String, String> {
    let mut dict = HashMap::new();
    for line in lines(body) {
        let Some((key, value)) = line.split_once(": ") else {
            continue;
        };
        if key.is_empty() {
            continue;
        }
        dict.entry(key.to_string())
            .or_insert_with(|| value.to_string());
    }
    dict
}

/// Parse a flat `- item` sequence, preserving order.
pub fn parse_list(body: &[u8]) -> Vec<String> {
    lines(body)
        .filter_map(|line| line.strip_prefix("- "))
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn lines(body: &[u8]) -> impl Iterator<Item = &str> {
    body.split(|&b| b == b'\n')
        .filter_map(|line| std::str::from_utf8(line).ok())
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty() && *line != MARKER)
}
