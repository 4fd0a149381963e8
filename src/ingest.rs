use std::path::Path;

use chrono::{DateTime, Utc};
use log::{error, info};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use uuid::Uuid;

use crate::blob_store::{base_name, BlobStore};
use crate::db::{DbPool, ImageRecord};
use crate::mimetype_detector;

pub const DEFAULT_EXTENSION: &str = ".jpg";

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Failed to store upload: {0}")]
    Storage(#[from] std::io::Error),
    #[error("Empty upload")]
    Empty,
}

/// Extension for a stored original, derived from the client's filename.
///
/// Lowercased and dot-prefixed. Only raster types the thumbnailer decodes are kept;
/// anything else (missing, `svg`, `html`, ...) becomes `.jpg`.
pub fn storage_extension(filename_hint: Option<&str>) -> String {
    filename_hint
        .and_then(base_name)
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| mimetype_detector::from_extension(ext).is_some())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Stores uploaded originals and records their metadata.
#[derive(Clone)]
pub struct IngestionService {
    blobs: BlobStore,
    db_pool: DbPool,
}

impl IngestionService {
    pub fn new(blobs: BlobStore, db_pool: DbPool) -> Self {
        Self { blobs, db_pool }
    }

    pub async fn ingest<R>(
        &self,
        reader: &mut R,
        filename_hint: Option<&str>,
        title: Option<&str>,
        album: Option<&str>,
    ) -> Result<ImageRecord, IngestError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut reader = BufReader::new(reader);
        if reader.fill_buf().await?.is_empty() {
            return Err(IngestError::Empty);
        }

        let id = Uuid::new_v4().to_string();
        let filename = format!("{}{}", id, storage_extension(filename_hint));
        let target = self.blobs.images_dir().join(&filename);

        let written = self.blobs.write_stream(&target, &mut reader).await?;

        let record = ImageRecord {
            id,
            filename,
            title: non_blank(title),
            album: non_blank(album),
            created_at: now_seconds(),
        };

        // The blob stays on disk either way; a failed insert only loses its gallery entry.
        if let Err(e) = record.insert(&self.db_pool).await {
            error!(
                "Stored {} but failed to record metadata: {}",
                record.filename, e
            );
        } else {
            info!(
                "Ingested {} ({} bytes, album: {:?})",
                record.filename, written, record.album
            );
        }

        Ok(record)
    }
}

/// Timestamps are persisted at second precision.
fn now_seconds() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now)
}
