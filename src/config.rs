//! Runtime configuration, sourced from the environment with defaults.
//!
//! All tunables are collected once at startup into a `Config` struct and
//! passed into the pipeline, so the locate/extract/publish code never reads
//! the environment itself.

use crate::model::NwmError;
use std::env;

// ---------------------------------------------------------------------------
// Fixed upstream constants
// ---------------------------------------------------------------------------

/// NOAA NWM bucket (public, anonymous access).
pub const NWM_BUCKET: &str = "noaa-nwm-pds";

/// Region the NWM bucket lives in.
pub const NWM_REGION: &str = "us-east-1";

/// Well-known key the published document is written to.
pub const OUTPUT_KEY: &str = "live/current_velocity.json";

// ---------------------------------------------------------------------------
// Environment-sourced settings
// ---------------------------------------------------------------------------

const DEFAULT_OUTPUT_BUCKET: &str = "nwm-streamflow-data";
const DEFAULT_OUTPUT_REGION: &str = "us-east-1";
const DEFAULT_MIN_STREAMFLOW: f64 = 10.0;

/// Pipeline configuration resolved from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bucket the published JSON is uploaded to (`S3_BUCKET_NAME`).
    pub output_bucket: String,
    /// Region for the output bucket (`AWS_REGION`).
    pub output_region: String,
    /// Optional named credential profile for the upload (`AWS_PROFILE`).
    pub aws_profile: Option<String>,
    /// Minimum streamflow in m³/s to include (`MIN_STREAMFLOW`).
    /// Reaches below this carry negligible flow and would bloat the output.
    pub min_streamflow: f64,
}

impl Config {
    /// Resolves configuration from the process environment, loading a local
    /// `.env` file first if one is present.
    pub fn from_env() -> Result<Self, NwmError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a `Config` from an injected lookup function. Lets tests supply
    /// variables without touching the process environment.
    pub fn from_lookup<F>(get: F) -> Result<Self, NwmError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let min_streamflow = match get("MIN_STREAMFLOW") {
            Some(raw) => raw.trim().parse::<f64>().map_err(|_| {
                NwmError::Config(format!("MIN_STREAMFLOW is not a number: {}", raw))
            })?,
            None => DEFAULT_MIN_STREAMFLOW,
        };

        if !min_streamflow.is_finite() || min_streamflow < 0.0 {
            return Err(NwmError::Config(format!(
                "MIN_STREAMFLOW must be a non-negative number, got {}",
                min_streamflow
            )));
        }

        Ok(Config {
            output_bucket: get("S3_BUCKET_NAME")
                .unwrap_or_else(|| DEFAULT_OUTPUT_BUCKET.to_string()),
            output_region: get("AWS_REGION")
                .unwrap_or_else(|| DEFAULT_OUTPUT_REGION.to_string()),
            aws_profile: get("AWS_PROFILE").filter(|p| !p.is_empty()),
            min_streamflow,
        })
    }
}
