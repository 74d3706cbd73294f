//! Core data types for the NWM streamflow publishing pipeline.
//!
//! This module defines the shared domain model imported by all other modules:
//! the located remote file, the published JSON artifact, and the error type
//! used across the locate/download/extract/publish steps.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Located file
// ---------------------------------------------------------------------------

/// One located NWM channel_rt file: its bucket, full object key, and the
/// reference time parsed from the key's hour segment.
///
/// Constructed by `locate::find_latest`, consumed once by the download step.
/// The reference time is always at a UTC hour boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFileHandle {
    pub bucket: String,
    pub key: String,
    pub reference_time: DateTime<Utc>,
}

impl RemoteFileHandle {
    /// Anonymous HTTPS URL for the object (public buckets only).
    pub fn https_url(&self) -> String {
        format!("https://{}.s3.amazonaws.com/{}", self.bucket, self.key)
    }

    /// `s3://bucket/key` form, for operator-facing messages.
    pub fn s3_url(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }

    /// The final path segment of the key, e.g.
    /// `nwm.t12z.analysis_assim.channel_rt.tm00.conus.nc`.
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

// ---------------------------------------------------------------------------
// Published artifact
// ---------------------------------------------------------------------------

/// COMID (stringified) → streamflow in m³/s, rounded to 2 decimal places.
///
/// A `BTreeMap` keeps serialization deterministic: extracting the same file
/// twice yields byte-for-byte identical JSON.
pub type FilteredSiteMap = BTreeMap<String, f64>;

/// The JSON document published for frontend consumption.
///
/// Field order matters — it is part of the external contract:
/// `generated_at`, `reference_time`, `site_count`, `sites`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedDocument {
    /// ISO 8601 UTC timestamp of when this document was produced.
    pub generated_at: String,
    /// ISO 8601 UTC reference time of the source NWM file.
    pub reference_time: String,
    /// Number of entries in `sites`.
    pub site_count: usize,
    pub sites: FilteredSiteMap,
}

/// Formats a timestamp the way the published document expects:
/// ISO 8601 with an explicit `+00:00` offset, whole seconds.
pub fn iso_utc(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, false)
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise while locating, fetching, or processing NWM data.
#[derive(Debug)]
pub enum NwmError {
    /// No channel_rt file was found across the whole lookback window.
    NoRecentData,
    /// A single date-partition listing failed. Recovered inside the scan
    /// by moving to the next candidate date; surfaced only in logs.
    Listing(String),
    /// Non-2xx HTTP response while downloading the NetCDF file.
    HttpStatus(u16),
    /// Network-level failure during download.
    Transport(String),
    /// The output store rejected the publication request.
    Upload(String),
    /// The NetCDF file is missing required variables or is malformed.
    DataFormat(String),
    /// The hour segment of a candidate key could not be parsed.
    /// Invalidates that candidate only, never the whole search.
    BadHourSegment(String),
    /// Invalid runtime configuration.
    Config(String),
    /// Local filesystem failure (scratch directory, dry-run output).
    Io(std::io::Error),
}

impl std::fmt::Display for NwmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NwmError::NoRecentData => {
                write!(f, "Could not find recent NWM data in the lookback window")
            }
            NwmError::Listing(msg) => write!(f, "Listing failed: {}", msg),
            NwmError::HttpStatus(code) => write!(f, "HTTP error: {}", code),
            NwmError::Transport(msg) => write!(f, "Transport error: {}", msg),
            NwmError::Upload(msg) => write!(f, "Upload failed: {}", msg),
            NwmError::DataFormat(msg) => write!(f, "Data format error: {}", msg),
            NwmError::BadHourSegment(key) => {
                write!(f, "Cannot parse hour segment from key: {}", key)
            }
            NwmError::Config(msg) => write!(f, "Configuration error: {}", msg),
            NwmError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for NwmError {}

impl From<std::io::Error> for NwmError {
    fn from(e: std::io::Error) -> Self {
        NwmError::Io(e)
    }
}

impl From<reqwest::Error> for NwmError {
    fn from(e: reqwest::Error) -> Self {
        NwmError::Transport(e.to_string())
    }
}

impl From<netcdf::Error> for NwmError {
    fn from(e: netcdf::Error) -> Self {
        NwmError::DataFormat(e.to_string())
    }
}
