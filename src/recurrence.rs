//! Next-occurrence calculation for recurring reminders.
//!
//! All shifts happen on the wall clock in the user's timezone, then convert
//! back to UTC for storage. Monthly shifts preserve the day of month and
//! clamp to the last day when the target month is shorter.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{MosaicError, Result};
use crate::store::types::{RecurrenceConfig, RecurrenceFrequency};

/// Compute the next occurrence of a recurring reminder.
pub fn next_occurrence(
    current: DateTime<Utc>,
    config: &RecurrenceConfig,
    tz: Tz,
) -> Result<DateTime<Utc>> {
    let local = current.with_timezone(&tz).naive_local();

    let next_local = match config.frequency {
        RecurrenceFrequency::Daily => local + Duration::days(1),
        RecurrenceFrequency::Weekly => local + Duration::days(7),
        RecurrenceFrequency::Monthly => shift_one_month(local, config.day_of_month)?,
    };

    localize(next_local, tz)
}

/// Shift a local datetime forward one calendar month, clamping the day.
fn shift_one_month(local: NaiveDateTime, preferred_day: Option<u8>) -> Result<NaiveDateTime> {
    let (year, month) = if local.month() == 12 {
        (local.year() + 1, 1)
    } else {
        (local.year(), local.month() + 1)
    };

    let target_day = preferred_day.map(u32::from).unwrap_or(local.day());
    let day = target_day.min(days_in_month(year, month));

    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        MosaicError::invalid(format!("cannot form date {year}-{month:02}-{day:02}"))
    })?;
    Ok(date.and_time(local.time()))
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    // First of the following month minus one day
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .map(|d| d.pred_opt().map(|p| p.day()).unwrap_or(28))
        .unwrap_or(28)
}

/// Resolve a local wall-clock time back to UTC. Ambiguous times (DST fall
/// back) take the earlier instant; nonexistent times (spring forward) slide
/// past the gap.
fn localize(naive: NaiveDateTime, tz: Tz) -> Result<DateTime<Utc>> {
    use chrono::offset::LocalResult;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earlier, _) => Ok(earlier.with_timezone(&Utc)),
        LocalResult::None => {
            let shifted = naive + Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .ok_or_else(|| {
                    MosaicError::Internal(anyhow::anyhow!(
                        "cannot localize {naive} in {tz}"
                    ))
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cfg(frequency: RecurrenceFrequency) -> RecurrenceConfig {
        RecurrenceConfig {
            frequency,
            day_of_week: None,
            day_of_month: None,
        }
    }

    #[test]
    fn daily_advances_exactly_one_day() {
        let now = Utc.with_ymd_and_hms(2026, 1, 19, 9, 0, 0).unwrap();
        let next = next_occurrence(now, &cfg(RecurrenceFrequency::Daily), chrono_tz::UTC).unwrap();
        assert_eq!(next - now, Duration::hours(24));
    }

    #[test]
    fn weekly_advances_exactly_seven_days() {
        let now = Utc.with_ymd_and_hms(2026, 1, 19, 9, 0, 0).unwrap();
        let next = next_occurrence(now, &cfg(RecurrenceFrequency::Weekly), chrono_tz::UTC).unwrap();
        assert_eq!(next - now, Duration::days(7));
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 26, 9, 0, 0).unwrap());
    }

    #[test]
    fn monthly_clamps_to_shorter_months() {
        // Jan 31 → Feb 28 (2026 is not a leap year)
        let jan31 = Utc.with_ymd_and_hms(2026, 1, 31, 9, 0, 0).unwrap();
        let next =
            next_occurrence(jan31, &cfg(RecurrenceFrequency::Monthly), chrono_tz::UTC).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 2, 28, 9, 0, 0).unwrap());

        // Mar 31 → Apr 30
        let mar31 = Utc.with_ymd_and_hms(2026, 3, 31, 9, 0, 0).unwrap();
        let next =
            next_occurrence(mar31, &cfg(RecurrenceFrequency::Monthly), chrono_tz::UTC).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 4, 30, 9, 0, 0).unwrap());

        // Leap year: Jan 31 2028 → Feb 29 2028
        let jan31 = Utc.with_ymd_and_hms(2028, 1, 31, 9, 0, 0).unwrap();
        let next =
            next_occurrence(jan31, &cfg(RecurrenceFrequency::Monthly), chrono_tz::UTC).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2028, 2, 29, 9, 0, 0).unwrap());
    }

    #[test]
    fn monthly_honors_preferred_day_of_month() {
        // Clamped to Feb 28, the configured day pulls back to 31 in March
        let feb28 = Utc.with_ymd_and_hms(2026, 2, 28, 9, 0, 0).unwrap();
        let config = RecurrenceConfig {
            frequency: RecurrenceFrequency::Monthly,
            day_of_week: None,
            day_of_month: Some(31),
        };
        let next = next_occurrence(feb28, &config, chrono_tz::UTC).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 31, 9, 0, 0).unwrap());
    }

    #[test]
    fn december_rolls_into_january() {
        let dec15 = Utc.with_ymd_and_hms(2026, 12, 15, 8, 30, 0).unwrap();
        let next =
            next_occurrence(dec15, &cfg(RecurrenceFrequency::Monthly), chrono_tz::UTC).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2027, 1, 15, 8, 30, 0).unwrap());
    }

    #[test]
    fn wall_clock_is_preserved_across_dst() {
        // US DST starts 2026-03-08; a daily 09:00 reminder stays at 09:00 local.
        let tz = chrono_tz::America::New_York;
        let before = tz
            .with_ymd_and_hms(2026, 3, 7, 9, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        let next = next_occurrence(before, &cfg(RecurrenceFrequency::Daily), tz).unwrap();
        let local = next.with_timezone(&tz);
        assert_eq!(local.time(), chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    }
}
