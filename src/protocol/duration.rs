//! Duration-to-wire conversion.
//!
//! Delays, TTRs, reservation timeouts and pause intervals travel as whole
//! seconds in a 32-bit unsigned field. Sub-second durations round up so a
//! caller asking for 1.2s never gets less than that; zero stays zero.

use std::time::Duration;

use crate::error::{BeanstalkError, Result};

/// Largest second count the server accepts.
pub const MAX_WIRE_SECS: u32 = u32::MAX;

/// Convert a duration to wire seconds, rounding up.
///
/// # Errors
///
/// Returns [`BeanstalkError::InvalidArgument`] if the rounded value exceeds
/// [`MAX_WIRE_SECS`].
pub fn to_wire_secs(d: Duration) -> Result<u32> {
    let secs = d.as_secs();
    let secs = if d.subsec_nanos() > 0 {
        secs.checked_add(1)
    } else {
        Some(secs)
    };

    secs.and_then(|s| u32::try_from(s).ok()).ok_or_else(|| {
        BeanstalkError::InvalidArgument(format!(
            "duration {:?} exceeds {} wire seconds",
            d, MAX_WIRE_SECS
        ))
    })
}

/// Build a duration from a signed second count.
///
/// `Duration` cannot be negative, so callers holding signed values go
/// through here to get a usage error instead of a panic.
pub fn from_signed_secs(secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(BeanstalkError::InvalidArgument(format!(
            "duration must be a non-negative number of seconds, got {}",
            secs
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| BeanstalkError::InvalidArgument(format!("duration {}: {}", secs, e)))
}
