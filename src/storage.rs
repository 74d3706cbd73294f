//! Object-store collaborators for the pipeline.
//!
//! Two stores with different trust levels:
//!   - `NwmSource` — the public NOAA bucket, listed with an explicitly
//!     unauthenticated S3 client and downloaded from over plain HTTPS.
//!   - `OutputStore` — the publication bucket, written with default or
//!     profile-based credentials.
//!
//! The AWS SDK is async; each store owns a current-thread Tokio runtime and
//! blocks on individual calls, so the pipeline itself stays a plain
//! sequential program.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use tokio::runtime::Runtime;

use crate::config::Config;
use crate::locate::ListObjects;
use crate::model::{NwmError, RemoteFileHandle};

/// Cap on keys fetched per listing request. One date partition holds well
/// under this many analysis_assim objects.
const LIST_MAX_KEYS: i32 = 100;

/// Download buffer size; matches the upstream chunked transfer granularity.
const DOWNLOAD_CHUNK_BYTES: usize = 8192;

fn blocking_runtime() -> Result<Runtime, NwmError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(NwmError::Io)
}

// ---------------------------------------------------------------------------
// Upstream (public NWM bucket)
// ---------------------------------------------------------------------------

/// Read-only client for the public NWM bucket.
pub struct NwmSource {
    client: Client,
    runtime: Runtime,
    http: reqwest::blocking::Client,
}

impl NwmSource {
    /// Builds an unauthenticated client for the given region. The NWM bucket
    /// is public; requests are sent unsigned rather than with ambient
    /// credentials.
    pub fn connect(region: &str) -> Result<Self, NwmError> {
        let runtime = blocking_runtime()?;
        let client = runtime.block_on(async {
            let shared = aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(region.to_string()))
                .no_credentials()
                .load()
                .await;
            Client::new(&shared)
        });

        Ok(NwmSource {
            client,
            runtime,
            http: reqwest::blocking::Client::new(),
        })
    }

    /// Downloads the located file into `dest_dir`, streaming in chunks and
    /// reporting progress on a single updating line.
    pub fn download(
        &self,
        handle: &RemoteFileHandle,
        dest_dir: &Path,
    ) -> Result<PathBuf, NwmError> {
        let url = handle.https_url();
        println!("   Downloading from: {}", url);

        let mut response = self.http.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(NwmError::HttpStatus(status.as_u16()));
        }

        // May be absent with chunked transfer encoding.
        let total_bytes = response.content_length().unwrap_or(0);

        let dest = dest_dir.join("nwm_channel_rt.nc");
        let mut file = fs::File::create(&dest)?;

        let mut buf = [0u8; DOWNLOAD_CHUNK_BYTES];
        let mut downloaded: u64 = 0;
        loop {
            let n = response.read(&mut buf).map_err(NwmError::Io)?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n])?;
            downloaded += n as u64;
            if total_bytes > 0 {
                let pct = downloaded as f64 / total_bytes as f64 * 100.0;
                print!("\r   Downloading: {:.1}%", pct);
                io::stdout().flush().ok();
            }
        }

        println!(
            "\n   Downloaded {:.1} MB to {}",
            downloaded as f64 / 1024.0 / 1024.0,
            dest.display()
        );
        Ok(dest)
    }
}

impl ListObjects for NwmSource {
    fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, NwmError> {
        self.runtime.block_on(async {
            let response = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .max_keys(LIST_MAX_KEYS)
                .send()
                .await
                .map_err(|e| NwmError::Listing(e.to_string()))?;

            Ok(response
                .contents()
                .iter()
                .filter_map(|object| object.key().map(str::to_string))
                .collect())
        })
    }
}

// ---------------------------------------------------------------------------
// Downstream (publication bucket)
// ---------------------------------------------------------------------------

/// Authenticated client for the output bucket.
pub struct OutputStore {
    client: Client,
    runtime: Runtime,
    bucket: String,
    region: String,
}

impl OutputStore {
    /// Builds a client using the configured region and, when set, the named
    /// credential profile; otherwise the default credential chain applies.
    pub fn connect(config: &Config) -> Result<Self, NwmError> {
        let runtime = blocking_runtime()?;
        let client = runtime.block_on(async {
            let mut loader = aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(config.output_region.clone()));
            if let Some(profile) = &config.aws_profile {
                println!("   Using AWS profile: {}", profile);
                loader = loader.profile_name(profile);
            }
            Client::new(&loader.load().await)
        });

        Ok(OutputStore {
            client,
            runtime,
            bucket: config.output_bucket.clone(),
            region: config.output_region.clone(),
        })
    }

    /// Whole-object PUT of the published JSON. The 5-minute cache hint keeps
    /// CDN/browser copies from outliving the hourly refresh cadence.
    pub fn publish(&self, key: &str, body: Vec<u8>) -> Result<(), NwmError> {
        self.runtime.block_on(async {
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .body(ByteStream::from(body))
                .content_type("application/json")
                .cache_control("max-age=300")
                .send()
                .await
                .map(|_| ())
                .map_err(|e| NwmError::Upload(e.to_string()))
        })
    }

    /// Public HTTPS URL of a published key.
    pub fn public_url(&self, key: &str) -> String {
        public_url(&self.bucket, &self.region, key)
    }
}

/// Regional virtual-hosted URL for an object in the output bucket.
pub fn public_url(bucket: &str, region: &str, key: &str) -> String {
    format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key)
}

/// Creates the scratch directory holding the downloaded NetCDF file.
///
/// The returned guard removes the directory and its contents when dropped,
/// on every exit path.
pub fn scratch_dir() -> Result<tempfile::TempDir, NwmError> {
    tempfile::tempdir().map_err(NwmError::Io)
}
