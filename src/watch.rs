//! Watch-set reconciliation planning.
//!
//! The server keeps, per connection, the set of tubes `reserve` draws from.
//! Converging it to a desired set takes one `watch` per missing tube and one
//! `ignore` per surplus tube. The server refuses to ignore the last watched
//! tube, so every watch is issued before any ignore: with a non-empty target
//! the watched set then never shrinks to zero.
//!
//! Names are processed in lexical order so a given input always produces the
//! same command sequence.

use std::collections::BTreeSet;

use crate::error::{BeanstalkError, Result};

/// One reconciliation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchStep {
    /// Send `watch <tube>`.
    Watch(String),
    /// Send `ignore <tube>`.
    Ignore(String),
}

impl WatchStep {
    /// The command verb for this step.
    pub fn verb(&self) -> &'static str {
        match self {
            WatchStep::Watch(_) => "watch",
            WatchStep::Ignore(_) => "ignore",
        }
    }

    /// The tube this step operates on.
    pub fn tube(&self) -> &str {
        match self {
            WatchStep::Watch(name) | WatchStep::Ignore(name) => name,
        }
    }

    /// Apply this step to a watched set after the server confirmed it.
    pub fn apply(&self, watched: &mut BTreeSet<String>) {
        match self {
            WatchStep::Watch(name) => {
                watched.insert(name.clone());
            }
            WatchStep::Ignore(name) => {
                watched.remove(name);
            }
        }
    }
}

/// Compute the minimal ordered steps taking `watched` to `desired`.
///
/// # Errors
///
/// Returns [`BeanstalkError::InvalidArgument`] if `desired` is empty.
pub fn plan(watched: &BTreeSet<String>, desired: &BTreeSet<String>) -> Result<Vec<WatchStep>> {
    if desired.is_empty() {
        return Err(BeanstalkError::InvalidArgument(
            "tube set must name at least one tube".to_string(),
        ));
    }

    let watches = desired
        .difference(watched)
        .map(|name| WatchStep::Watch(name.clone()));
    let ignores = watched
        .difference(desired)
        .map(|name| WatchStep::Ignore(name.clone()));

    Ok(watches.chain(ignores).collect())
}
