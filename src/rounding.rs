//! Half-hour duration rounding — the billing-correctness kernel.
//!
//! All stored durations go through [`round_half_hour`], which implements the
//! half-hour billing contract: any positive remainder up to and including 30
//! minutes rounds to the half hour, anything past 30 rounds to the full hour.
//! Arithmetic uses [`rust_decimal::Decimal`] pinned to one decimal place;
//! binary floats never touch stored durations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::{MosaicError, Result};

/// Round a duration in whole minutes to half-hour precision.
///
/// - `minutes <= 0` → `0.0`
/// - remainder `0` → whole hours
/// - remainder `1..=30` → half hour up
/// - remainder `31..=59` → full hour up
pub fn round_half_hour(minutes: i64) -> Decimal {
    if minutes <= 0 {
        return Decimal::new(0, 1);
    }

    let hours = minutes / 60;
    let remainder = minutes % 60;

    let tenths = if remainder == 0 {
        hours * 10
    } else if remainder <= 30 {
        hours * 10 + 5
    } else {
        (hours + 1) * 10
    };

    Decimal::new(tenths, 1)
}

/// Rounded duration between two instants.
///
/// Seconds are truncated before rounding, so 29m59s counts as 29 minutes.
/// Fails with `InvalidArgument` when `end` precedes `start`.
pub fn duration_rounded(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Decimal> {
    if end < start {
        return Err(MosaicError::invalid("end_time must be after start_time"));
    }
    Ok(round_half_hour((end - start).num_minutes()))
}
