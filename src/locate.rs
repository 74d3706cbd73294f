//! Locator: finds the newest NWM analysis_assim channel_rt file.
//!
//! NWM output is organized by date partition with no index:
//!   nwm.YYYYMMDD/analysis_assim/nwm.tHHz.analysis_assim.channel_rt.tm00.conus.nc
//!
//! The search is a bounded linear scan: today and yesterday (UTC), newest
//! first. Within a date the zero-padded hour makes the lexicographically
//! greatest channel_rt key the chronologically latest one. A listing failure
//! or malformed key invalidates that candidate date only — the store is
//! eventually consistent and a transient error on one partition should not
//! prevent checking the other.

use chrono::{DateTime, Days, NaiveTime, TimeDelta, Utc};

use crate::config::NWM_BUCKET;
use crate::model::{NwmError, RemoteFileHandle};

/// Fixed lookback window: today and the previous day.
pub const LOOKBACK_DAYS: u64 = 2;

/// Listing seam for the upstream object store, so the scan can be exercised
/// against a fake store in tests.
pub trait ListObjects {
    /// Lists object keys under `prefix` in `bucket`.
    fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, NwmError>;
}

// ---------------------------------------------------------------------------
// Key namespace helpers
// ---------------------------------------------------------------------------

/// Candidate partition dates at UTC midnight, newest first.
///
/// Uses calendar-correct date subtraction, so the scan behaves at month and
/// year boundaries (the 1st of a month looks back into the previous month).
pub fn candidate_dates(now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    (0..LOOKBACK_DAYS)
        .map(|days_ago| {
            (now.date_naive() - Days::new(days_ago))
                .and_time(NaiveTime::MIN)
                .and_utc()
        })
        .collect()
}

/// The analysis_assim partition prefix for one date, e.g.
/// `nwm.20240501/analysis_assim/`.
pub fn partition_prefix(date: DateTime<Utc>) -> String {
    format!("nwm.{}/analysis_assim/", date.format("%Y%m%d"))
}

/// Whether a key denotes a channel routing output file.
pub fn is_channel_rt_key(key: &str) -> bool {
    key.contains("channel_rt") && key.ends_with(".nc")
}

/// Selects the latest channel_rt key from a listing.
///
/// The filename hour is zero-padded (`t06z` < `t12z`), so lexicographic max
/// equals chronological max. Returns `None` if the listing has no
/// channel_rt members.
pub fn select_latest_key(keys: &[String]) -> Option<&str> {
    keys.iter()
        .filter(|k| is_channel_rt_key(k))
        .max()
        .map(String::as_str)
}

/// Parses the two-digit reference hour out of a channel_rt key, taken from
/// the `tHHz` segment after the first `.t` (e.g. `nwm.t12z...` → 12).
pub fn parse_reference_hour(key: &str) -> Result<u32, NwmError> {
    let segment = key
        .split(".t")
        .nth(1)
        .ok_or_else(|| NwmError::BadHourSegment(key.to_string()))?;
    let digits = segment
        .get(..2)
        .ok_or_else(|| NwmError::BadHourSegment(key.to_string()))?;
    let hour: u32 = digits
        .parse()
        .map_err(|_| NwmError::BadHourSegment(key.to_string()))?;
    if hour > 23 {
        return Err(NwmError::BadHourSegment(key.to_string()));
    }
    Ok(hour)
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Finds the most recent analysis_assim channel_rt file as of `now`.
///
/// Scans candidate dates newest to oldest, returning the first date that
/// yields a usable key. Fails with `NwmError::NoRecentData` only when every
/// candidate in the window comes up empty.
pub fn find_latest(
    store: &impl ListObjects,
    now: DateTime<Utc>,
) -> Result<RemoteFileHandle, NwmError> {
    for date in candidate_dates(now) {
        let prefix = partition_prefix(date);

        let keys = match store.list_keys(NWM_BUCKET, &prefix) {
            Ok(keys) => keys,
            Err(e) => {
                println!("   ⚠ Error checking {}: {}", prefix, e);
                continue;
            }
        };

        let Some(latest) = select_latest_key(&keys) else {
            continue;
        };

        let hour = match parse_reference_hour(latest) {
            Ok(hour) => hour,
            Err(e) => {
                println!("   ⚠ Skipping {}: {}", prefix, e);
                continue;
            }
        };

        // `date` is midnight, so adding the hour lands on the hour boundary.
        let reference_time = date + TimeDelta::hours(i64::from(hour));

        return Ok(RemoteFileHandle {
            bucket: NWM_BUCKET.to_string(),
            key: latest.to_string(),
            reference_time,
        });
    }

    Err(NwmError::NoRecentData)
}
