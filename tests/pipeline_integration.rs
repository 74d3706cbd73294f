//! Integration tests for the extract → publish half of the pipeline.
//!
//! These tests build a small channel_rt-shaped NetCDF file on disk and run
//! the real extraction path over it, verifying the published document
//! content, dry-run equivalence, idempotence, and scratch cleanup.
//!
//! Run with: cargo test --test pipeline_integration

use chrono::{TimeZone, Utc};
use std::fs;
use std::path::Path;

use nwm_service::extract;
use nwm_service::model::PublishedDocument;
use nwm_service::publish;
use nwm_service::storage;

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

/// Writes a minimal channel_rt-shaped file: parallel `feature_id` and
/// `streamflow` variables, one row per reach.
fn write_channel_fixture(path: &Path, ids: &[i64], flows: &[f64]) {
    let mut file = netcdf::create(path).expect("create NetCDF fixture");
    file.add_dimension("feature_id", ids.len())
        .expect("add dimension");

    let mut id_var = file
        .add_variable::<i64>("feature_id", &["feature_id"])
        .expect("add feature_id variable");
    id_var.put_values(ids, ..).expect("write feature_id");

    let mut flow_var = file
        .add_variable::<f64>("streamflow", &["feature_id"])
        .expect("add streamflow variable");
    flow_var.put_values(flows, ..).expect("write streamflow");
}

/// Writes a fixture the way NWM actually packs streamflow: scaled int32
/// with CF `scale_factor`/`add_offset` attributes and a `_FillValue`
/// sentinel for missing reaches.
fn write_packed_channel_fixture(
    path: &Path,
    ids: &[i64],
    raw_flows: &[i32],
    scale_factor: f64,
    add_offset: f64,
    fill_value: i32,
) {
    let mut file = netcdf::create(path).expect("create NetCDF fixture");
    file.add_dimension("feature_id", ids.len())
        .expect("add dimension");

    let mut id_var = file
        .add_variable::<i64>("feature_id", &["feature_id"])
        .expect("add feature_id variable");
    id_var.put_values(ids, ..).expect("write feature_id");

    let mut flow_var = file
        .add_variable::<i32>("streamflow", &["feature_id"])
        .expect("add streamflow variable");
    flow_var
        .put_attribute("scale_factor", scale_factor)
        .expect("write scale_factor");
    flow_var
        .put_attribute("add_offset", add_offset)
        .expect("write add_offset");
    flow_var
        .put_attribute("_FillValue", fill_value)
        .expect("write _FillValue");
    flow_var.put_values(raw_flows, ..).expect("write streamflow");
}

// ---------------------------------------------------------------------------
// Extraction over a real file
// ---------------------------------------------------------------------------

#[test]
fn test_extract_filters_invalid_and_tiny_reaches() {
    let dir = tempfile::tempdir().unwrap();
    let nc_path = dir.path().join("nwm_channel_rt.nc");
    write_channel_fixture(
        &nc_path,
        &[100, 101, 102, 103],
        &[-1.0, f64::NAN, 5.0, 15.0],
    );

    let outcome = extract::extract(&nc_path, 10.0).unwrap();

    assert_eq!(outcome.sites.len(), 1);
    assert_eq!(outcome.sites.get("103"), Some(&15.0));
    assert_eq!(outcome.skipped, 3);
}

#[test]
fn test_extract_rounds_to_two_decimals() {
    let dir = tempfile::tempdir().unwrap();
    let nc_path = dir.path().join("nwm_channel_rt.nc");
    write_channel_fixture(&nc_path, &[7050001, 7050002], &[12.3456, 987.654_3]);

    let outcome = extract::extract(&nc_path, 10.0).unwrap();

    assert_eq!(outcome.sites.get("7050001"), Some(&12.35));
    assert_eq!(outcome.sites.get("7050002"), Some(&987.65));
}

#[test]
fn test_extract_twice_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let nc_path = dir.path().join("nwm_channel_rt.nc");
    let ids: Vec<i64> = (1_000_000..1_000_200).collect();
    let flows: Vec<f64> = (0..200).map(|i| i as f64 * 1.7 + 0.003).collect();
    write_channel_fixture(&nc_path, &ids, &flows);

    let first = extract::extract(&nc_path, 10.0).unwrap();
    let second = extract::extract(&nc_path, 10.0).unwrap();

    assert_eq!(
        serde_json::to_vec(&first.sites).unwrap(),
        serde_json::to_vec(&second.sites).unwrap()
    );
    assert_eq!(first.skipped, second.skipped);
}

#[test]
fn test_extract_decodes_packed_streamflow_attributes() {
    let dir = tempfile::tempdir().unwrap();
    let nc_path = dir.path().join("nwm_channel_rt.nc");
    // raw 1500 → 17.5, fill → missing, raw 250 → 5.0 (below threshold),
    // raw 100000 → 1002.5
    write_packed_channel_fixture(
        &nc_path,
        &[100, 101, 102, 103],
        &[1500, -999900, 250, 100000],
        0.01,
        2.5,
        -999900,
    );

    let outcome = extract::extract(&nc_path, 10.0).unwrap();

    assert_eq!(outcome.sites.len(), 2);
    assert_eq!(outcome.sites.get("100"), Some(&17.5));
    assert_eq!(outcome.sites.get("103"), Some(&1002.5));
    // One fill row and one below-threshold row.
    assert_eq!(outcome.skipped, 2);
}

#[test]
fn test_missing_streamflow_variable_is_data_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let nc_path = dir.path().join("broken.nc");
    {
        let mut file = netcdf::create(&nc_path).unwrap();
        file.add_dimension("feature_id", 2).unwrap();
        let mut id_var = file
            .add_variable::<i64>("feature_id", &["feature_id"])
            .unwrap();
        id_var.put_values(&[1i64, 2], ..).unwrap();
    }

    let err = extract::extract(&nc_path, 10.0).unwrap_err();
    assert!(err.to_string().contains("streamflow"), "got: {}", err);
}

// ---------------------------------------------------------------------------
// Document assembly and dry-run equivalence
// ---------------------------------------------------------------------------

#[test]
fn test_dry_run_document_matches_published_content() {
    let dir = tempfile::tempdir().unwrap();
    let nc_path = dir.path().join("nwm_channel_rt.nc");
    write_channel_fixture(
        &nc_path,
        &[2674770, 2674772, 2674776],
        &[123.456, 3.0, 44.999],
    );

    let outcome = extract::extract(&nc_path, 10.0).unwrap();
    let reference_time = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let generated_at = Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap();
    let document = publish::build_document(outcome.sites, reference_time, generated_at);

    // What a real run would PUT.
    let compact = publish::to_compact_json(&document).unwrap();

    // What a dry run writes locally.
    let local = dir.path().join("current_velocity.json");
    publish::write_local(&document, &local).unwrap();

    let from_compact: PublishedDocument = serde_json::from_slice(&compact).unwrap();
    let from_local: PublishedDocument =
        serde_json::from_str(&fs::read_to_string(&local).unwrap()).unwrap();

    assert_eq!(from_local.sites, from_compact.sites);
    assert_eq!(from_local.site_count, 2); // 3.0 was filtered out
    assert_eq!(from_local.reference_time, "2024-05-01T12:00:00+00:00");
    assert_eq!(from_local.sites.get("2674770"), Some(&123.46));
    assert_eq!(from_local.sites.get("2674776"), Some(&45.0));
}

// ---------------------------------------------------------------------------
// Scratch cleanup
// ---------------------------------------------------------------------------

#[test]
fn test_scratch_directory_removed_after_success_and_failure() {
    // Success path: extraction completes, guard dropped afterwards.
    let scratch = storage::scratch_dir().unwrap();
    let scratch_path = scratch.path().to_path_buf();
    let nc_path = scratch_path.join("nwm_channel_rt.nc");
    write_channel_fixture(&nc_path, &[1], &[42.0]);
    extract::extract(&nc_path, 10.0).unwrap();
    drop(scratch);
    assert!(!scratch_path.exists());

    // Failure path: extraction errors, guard still cleans up.
    let scratch = storage::scratch_dir().unwrap();
    let scratch_path = scratch.path().to_path_buf();
    let bogus = scratch_path.join("nwm_channel_rt.nc");
    fs::write(&bogus, b"not a netcdf file").unwrap();
    assert!(extract::extract(&bogus, 10.0).is_err());
    drop(scratch);
    assert!(!scratch_path.exists());
}
