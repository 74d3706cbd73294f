//! NWM → S3 Streamflow Pipeline
//!
//! One-shot pipeline that:
//! 1. Finds the latest NWM analysis_assim channel_rt NetCDF on NOAA's bucket
//! 2. Downloads it to a scratch directory
//! 3. Extracts per-reach streamflow, filtered and rounded
//! 4. Publishes compact JSON to S3 for frontend consumption
//!
//! Usage:
//!   cargo run --release                # publish to the configured bucket
//!   cargo run --release -- --dry-run   # compute everything, save locally
//!
//! Environment (all optional, see config.rs for defaults):
//!   S3_BUCKET_NAME, AWS_REGION, AWS_PROFILE, MIN_STREAMFLOW

use std::env;
use std::path::Path;
use std::process;

use chrono::Utc;

use nwm_service::config::{Config, NWM_REGION, OUTPUT_KEY};
use nwm_service::model::{NwmError, iso_utc};
use nwm_service::storage::{NwmSource, OutputStore};
use nwm_service::{extract, locate, publish, storage};

fn main() {
    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();
    let mut dry_run = false;

    for arg in &args[1..] {
        match arg.as_str() {
            "--dry-run" => dry_run = true,
            _ => {
                eprintln!("Unknown argument: {}", arg);
                eprintln!("Usage: {} [--dry-run]", args[0]);
                process::exit(1);
            }
        }
    }

    println!("============================================================");
    println!("🌊 NWM → S3 Streamflow Pipeline");
    println!("============================================================\n");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run(&config, dry_run) {
        eprintln!("\n❌ Pipeline failed: {}", e);
        process::exit(1);
    }
}

fn run(config: &Config, dry_run: bool) -> Result<(), NwmError> {
    // 1. Find the latest NWM file
    println!("🔎 Searching for the latest channel_rt file...");
    let source = NwmSource::connect(NWM_REGION)?;
    let handle = locate::find_latest(&source, Utc::now())?;
    println!("   Found: {}", handle.file_name());
    println!("   Reference time: {}", iso_utc(handle.reference_time));

    // 2. Download into a scratch directory. The guard removes the directory
    // and its contents on every exit path, including error returns below.
    let scratch = storage::scratch_dir()?;
    println!("\n📥 Downloading {}", handle.s3_url());
    let nc_path = source.download(&handle, scratch.path())?;

    // 3. Extract and filter
    println!("\n⚙️  Processing NetCDF: {}", nc_path.display());
    println!("   Minimum streamflow: {} m³/s", config.min_streamflow);
    let outcome = extract::extract(&nc_path, config.min_streamflow)?;
    println!(
        "   Extracted data for {} reaches (skipped {})",
        outcome.sites.len(),
        outcome.skipped
    );

    // 4. Publish
    let document = publish::build_document(outcome.sites, handle.reference_time, Utc::now());
    let body = publish::to_compact_json(&document)?;
    println!(
        "\n📤 JSON size: {:.2} MB",
        body.len() as f64 / 1024.0 / 1024.0
    );

    let output_location = if dry_run {
        println!(
            "   [DRY RUN] Would upload to s3://{}/{}",
            config.output_bucket, OUTPUT_KEY
        );
        let local = Path::new("current_velocity.json");
        publish::write_local(&document, local)?;
        println!("   Saved to {}", local.display());
        local.display().to_string()
    } else {
        let store = OutputStore::connect(config)?;
        store.publish(OUTPUT_KEY, body)?;
        let url = store.public_url(OUTPUT_KEY);
        println!("   Uploaded to: {}", url);
        url
    };

    println!("\n============================================================");
    println!("✅ SUCCESS");
    println!("   Output: {}", output_location);
    println!("============================================================");

    Ok(())
}
