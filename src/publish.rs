//! Published-document assembly and serialization.
//!
//! The document fully replaces whatever was previously at the output key;
//! runs never merge with prior output. Production publication uses compact
//! JSON; dry-run writes an indented copy locally for inspection.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::model::{FilteredSiteMap, NwmError, PublishedDocument, iso_utc};

/// Assembles the published document from the filtered site map and the
/// located file's reference time.
pub fn build_document(
    sites: FilteredSiteMap,
    reference_time: DateTime<Utc>,
    generated_at: DateTime<Utc>,
) -> PublishedDocument {
    PublishedDocument {
        generated_at: iso_utc(generated_at),
        reference_time: iso_utc(reference_time),
        site_count: sites.len(),
        sites,
    }
}

/// Compact serialization (no extraneous whitespace) for publication.
pub fn to_compact_json(document: &PublishedDocument) -> Result<Vec<u8>, NwmError> {
    serde_json::to_vec(document)
        .map_err(|e| NwmError::DataFormat(format!("JSON serialization failed: {}", e)))
}

/// Writes an indented copy to `path` for dry-run inspection. Carries the
/// same content as the compact form, formatting aside.
pub fn write_local(document: &PublishedDocument, path: &Path) -> Result<(), NwmError> {
    let pretty = serde_json::to_string_pretty(document)
        .map_err(|e| NwmError::DataFormat(format!("JSON serialization failed: {}", e)))?;
    fs::write(path, pretty)?;
    Ok(())
}
