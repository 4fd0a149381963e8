use std::fs::Metadata;
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, warn};
use tokio::fs;
use warp::http::header::{HeaderMap, HeaderName, HeaderValue};
use warp::http::header::{
    CACHE_CONTROL, CONTENT_TYPE, ETAG, LAST_MODIFIED, X_CONTENT_TYPE_OPTIONS,
};
use warp::http::StatusCode;
use warp::Reply;

use crate::mimetype_detector;

/// Size and modification time of a served file; the only inputs to its validators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub size: u64,
    pub modified: SystemTime,
}

impl FileStamp {
    pub fn new(size: u64, modified: SystemTime) -> Self {
        // HTTP dates cannot express pre-epoch times.
        Self {
            size,
            modified: modified.max(UNIX_EPOCH),
        }
    }

    pub fn from_metadata(metadata: &Metadata) -> io::Result<Self> {
        Ok(Self::new(metadata.len(), metadata.modified()?))
    }

    fn modified_secs(&self) -> u64 {
        self.modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    /// Weak validator derived from size and mtime, e.g. `W/"1024-1700000000"`.
    pub fn weak_etag(&self) -> String {
        format!("W/\"{}-{}\"", self.size, self.modified_secs())
    }

    pub fn last_modified(&self) -> String {
        httpdate::fmt_http_date(self.modified)
    }
}

/// Validator headers sent by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionalHeaders {
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<String>,
}

/// Whether a client holding the given validators already has the current file.
///
/// `If-None-Match` matches when it contains the current ETag anywhere in its value.
/// `If-Modified-Since` matches when the file is not newer than the given date,
/// compared at one-second granularity. Either one is sufficient.
pub fn is_not_modified(stamp: &FileStamp, conditional: &ConditionalHeaders) -> bool {
    if let Some(if_none_match) = conditional.if_none_match.as_deref() {
        if !if_none_match.is_empty() && if_none_match.contains(&stamp.weak_etag()) {
            return true;
        }
    }

    if let Some(if_modified_since) = conditional.if_modified_since.as_deref() {
        if let Ok(since) = httpdate::parse_http_date(if_modified_since) {
            if stamp.modified < since + Duration::from_secs(1) {
                return true;
            }
        }
    }

    false
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("File not found")]
    NotFound,
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

/// A file response carrying caching headers; `304` responses have an empty body.
#[derive(Debug)]
pub struct CachedFile {
    pub status: StatusCode,
    pub etag: String,
    pub last_modified: String,
    pub cache_control: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl CachedFile {
    pub fn is_not_modified(&self) -> bool {
        self.status == StatusCode::NOT_MODIFIED
    }
}

impl Reply for CachedFile {
    fn into_response(self) -> warp::reply::Response {
        let not_modified = self.is_not_modified();
        let mut response = warp::reply::with_status(self.body, self.status).into_response();
        let headers = response.headers_mut();

        if not_modified {
            headers.remove(CONTENT_TYPE);
        } else {
            set_header(headers, CONTENT_TYPE, &self.content_type);
        }
        set_header(headers, CACHE_CONTROL, &self.cache_control);
        set_header(headers, LAST_MODIFIED, &self.last_modified);
        set_header(headers, ETAG, &self.etag);
        headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));

        response
    }
}

fn set_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(e) => warn!("Dropping invalid {} header {:?}: {}", name, value, e),
    }
}

/// Serves files from the blob store with conditional-request handling.
///
/// Used unchanged for originals and renditions.
#[derive(Debug, Clone)]
pub struct FileResponder {
    cache_control: String,
}

impl FileResponder {
    pub fn new(max_age_secs: u64) -> Self {
        Self {
            cache_control: format!("public, max-age={}", max_age_secs),
        }
    }

    pub async fn serve_with_caching(
        &self,
        path: &Path,
        conditional: &ConditionalHeaders,
    ) -> Result<CachedFile, ServeError> {
        let metadata = match fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => return Err(ServeError::NotFound),
        };
        let stamp = FileStamp::from_metadata(&metadata)?;

        let mut file = CachedFile {
            status: StatusCode::OK,
            etag: stamp.weak_etag(),
            last_modified: stamp.last_modified(),
            cache_control: self.cache_control.clone(),
            content_type: mimetype_detector::content_type(path),
            body: Vec::new(),
        };

        if is_not_modified(&stamp, conditional) {
            debug!("Not modified: {}", path.display());
            file.status = StatusCode::NOT_MODIFIED;
            return Ok(file);
        }

        file.body = fs::read(path).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ServeError::NotFound,
            _ => ServeError::IoError(e),
        })?;

        Ok(file)
    }
}
