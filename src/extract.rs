//! Extractor: NWM channel_rt NetCDF → filtered COMID→streamflow map.
//!
//! A channel_rt file carries parallel per-reach arrays:
//!   - `feature_id`  — NHDPlus COMID, one per reach
//!   - `streamflow`  — discharge in m³/s, same length and order
//!   - `velocity`    — water velocity in m/s (unused by the minimal output)
//!
//! Most of the network carries negligible flow, so rows below the configured
//! minimum are dropped along with missing/negative readings. What remains is
//! rounded to 2 decimal places and keyed by stringified COMID.

use std::collections::BTreeMap;
use std::path::Path;

use crate::model::{FilteredSiteMap, NwmError};

/// Parallel per-reach arrays read from one channel_rt file.
pub struct ChannelData {
    pub feature_ids: Vec<i64>,
    pub streamflow: Vec<f64>,
}

/// Result of filtering one file: the site map plus the skip tally.
#[derive(Debug)]
pub struct ExtractOutcome {
    pub sites: FilteredSiteMap,
    pub skipped: usize,
}

// ---------------------------------------------------------------------------
// NetCDF access
// ---------------------------------------------------------------------------

/// CF-convention decoding parameters for a packed variable.
///
/// NWM stores streamflow as scaled integers; xarray applies
/// `scale_factor`/`add_offset` and masks `_FillValue` automatically, so we
/// do the same here. Fill values become NaN and fall out in the filter step.
struct CfDecode {
    scale: f64,
    offset: f64,
    fill: Option<f64>,
}

impl CfDecode {
    fn from_variable(var: &netcdf::Variable) -> Self {
        CfDecode {
            scale: attr_f64(var, "scale_factor").unwrap_or(1.0),
            offset: attr_f64(var, "add_offset").unwrap_or(0.0),
            fill: attr_f64(var, "_FillValue").or_else(|| attr_f64(var, "missing_value")),
        }
    }

    fn apply(&self, raw: f64) -> f64 {
        if self.fill.is_some_and(|fill| raw == fill) {
            f64::NAN
        } else {
            raw * self.scale + self.offset
        }
    }
}

fn attr_f64(var: &netcdf::Variable, name: &str) -> Option<f64> {
    use netcdf::AttributeValue;
    match var.attribute(name)?.value().ok()? {
        AttributeValue::Uchar(v) => Some(f64::from(v)),
        AttributeValue::Schar(v) => Some(f64::from(v)),
        AttributeValue::Ushort(v) => Some(f64::from(v)),
        AttributeValue::Short(v) => Some(f64::from(v)),
        AttributeValue::Uint(v) => Some(f64::from(v)),
        AttributeValue::Int(v) => Some(f64::from(v)),
        AttributeValue::Ulonglong(v) => Some(v as f64),
        AttributeValue::Longlong(v) => Some(v as f64),
        AttributeValue::Float(v) => Some(f64::from(v)),
        AttributeValue::Double(v) => Some(v),
        _ => None,
    }
}

/// Reads the `feature_id` and `streamflow` variables from a channel_rt file,
/// applying CF decoding to the streamflow values.
pub fn read_channel_file(path: &Path) -> Result<ChannelData, NwmError> {
    let file = netcdf::open(path)?;

    let feature_var = file
        .variable("feature_id")
        .ok_or_else(|| NwmError::DataFormat("missing variable: feature_id".to_string()))?;
    let flow_var = file
        .variable("streamflow")
        .ok_or_else(|| NwmError::DataFormat("missing variable: streamflow".to_string()))?;

    let feature_ids: Vec<i64> = feature_var.get_values::<i64, _>(..)?;
    let raw_flow: Vec<f64> = flow_var.get_values::<f64, _>(..)?;

    if feature_ids.len() != raw_flow.len() {
        return Err(NwmError::DataFormat(format!(
            "feature_id has {} rows but streamflow has {}",
            feature_ids.len(),
            raw_flow.len()
        )));
    }

    let decode = CfDecode::from_variable(&flow_var);
    let streamflow = raw_flow.into_iter().map(|raw| decode.apply(raw)).collect();

    Ok(ChannelData {
        feature_ids,
        streamflow,
    })
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Rounds to 2 decimal places, half away from zero. Applied uniformly to
/// every published value.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Filters parallel reach arrays down to the published site map.
///
/// Rows are skipped (and tallied) when the streamflow is NaN or negative
/// (invalid physical reading) or below `min_streamflow`. The arrays are
/// assumed aligned — one row per reach, same order.
pub fn filter_sites(
    feature_ids: &[i64],
    streamflow: &[f64],
    min_streamflow: f64,
) -> ExtractOutcome {
    let mut sites = BTreeMap::new();
    let mut skipped = 0usize;

    for (comid, &flow) in feature_ids.iter().zip(streamflow) {
        if flow.is_nan() || flow < 0.0 {
            skipped += 1;
            continue;
        }
        if flow < min_streamflow {
            skipped += 1;
            continue;
        }
        sites.insert(comid.to_string(), round2(flow));
    }

    ExtractOutcome { sites, skipped }
}

/// Full extraction: read the file, then filter.
pub fn extract(path: &Path, min_streamflow: f64) -> Result<ExtractOutcome, NwmError> {
    let data = read_channel_file(path)?;
    Ok(filter_sites(&data.feature_ids, &data.streamflow, min_streamflow))
}

// ---------------------------------------------------------------------------
// Styling classifiers
// ---------------------------------------------------------------------------
// Not used by the minimal output, but part of the public contract for a
// richer output mode. Half-open buckets: lower bound inclusive, upper
// bound exclusive.

/// Classifies a velocity (m/s) into one of six styling buckets.
pub fn categorize_velocity(velocity_ms: f64) -> &'static str {
    if velocity_ms < 0.1 {
        "very_slow"
    } else if velocity_ms < 0.3 {
        "slow"
    } else if velocity_ms < 0.6 {
        "moderate"
    } else if velocity_ms < 1.0 {
        "fast"
    } else if velocity_ms < 2.0 {
        "very_fast"
    } else {
        "extreme"
    }
}

/// Classifies a streamflow (m³/s) into one of six styling buckets.
pub fn categorize_streamflow(cms: f64) -> &'static str {
    if cms < 1.0 {
        "very_low"
    } else if cms < 10.0 {
        "low"
    } else if cms < 50.0 {
        "moderate"
    } else if cms < 200.0 {
        "high"
    } else if cms < 1000.0 {
        "very_high"
    } else {
        "extreme"
    }
}
