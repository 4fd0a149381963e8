use std::fmt;
use std::str::FromStr;

use crate::blob_store::base_name;

/// Bounding box a rendition must fit into, parsed from `WxH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoxSize {
    pub width: u32,
    pub height: u32,
}

impl BoxSize {
    pub fn new(width: u32, height: u32) -> Result<Self, CacheError> {
        if width == 0 || height == 0 {
            return Err(CacheError::InvalidSize(format!("{}x{}", width, height)));
        }
        Ok(Self { width, height })
    }
}

impl FromStr for BoxSize {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CacheError::InvalidSize(s.to_string());

        let (width, height) = s.split_once('x').ok_or_else(invalid)?;
        if height.contains('x') {
            return Err(invalid());
        }

        let width = width.parse::<u32>().map_err(|_| invalid())?;
        let height = height.parse::<u32>().map_err(|_| invalid())?;

        BoxSize::new(width, height).map_err(|_| invalid())
    }
}

impl fmt::Display for BoxSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Identifies one rendition. Its filename is the whole cache index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source_filename: String,
    pub size: BoxSize,
}

impl CacheKey {
    /// Builds a key from a client-supplied name; only its base name is kept.
    pub fn new(source_filename: &str, size: BoxSize) -> Result<Self, CacheError> {
        let base = base_name(source_filename).ok_or(CacheError::PhotoNotFound)?;
        Ok(Self {
            source_filename: base.to_string(),
            size,
        })
    }

    pub fn rendition_filename(&self) -> String {
        format!("{}_{}", self.size, self.source_filename)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendition_filename())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Invalid thumbnail size: {0}")]
    InvalidSize(String),
    #[error("Photo not found")]
    PhotoNotFound,
    #[error("Image processing error: {0}")]
    ImageError(#[from] image::ImageError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Thumbnail worker failed: {0}")]
    WorkerError(String),
}

pub type CacheResult<T> = Result<T, CacheError>;
