use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::fs;

use crate::blob_store::BlobStore;
use crate::thumbnail_types::{BoxSize, CacheError, CacheKey, CacheResult};

type InFlightMap = HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>;

/// Produces renditions on demand and keeps them in the thumbs directory.
///
/// The rendition filename is derived from the key alone, so the directory
/// listing doubles as the cache index. A rendition that already exists is
/// served as-is: replacing an original in place under the same name leaves
/// its old renditions behind until they are deleted.
#[derive(Clone)]
pub struct ThumbnailGenerator {
    blobs: BlobStore,
    in_flight: Arc<Mutex<InFlightMap>>,
}

impl ThumbnailGenerator {
    pub fn new(blobs: BlobStore) -> CacheResult<Self> {
        std::fs::create_dir_all(blobs.thumbs_dir())?;

        Ok(Self {
            blobs,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Returns the path of the rendition for `source_filename` fitted into `size`,
    /// generating it first if needed.
    pub async fn get_or_generate(
        &self,
        source_filename: &str,
        size: BoxSize,
    ) -> CacheResult<PathBuf> {
        let cache_key = CacheKey::new(source_filename, size)?;
        let cache_path = self.get_cache_path(&cache_key)?;

        if is_file(&cache_path).await {
            debug!("Cache hit for {}", cache_key);
            return Ok(cache_path);
        }

        // One generator per rendition path; later arrivals wait and then reuse its output.
        let entry = self.enter(&cache_path);
        let _permit = entry.gate.lock().await;

        if is_file(&cache_path).await {
            debug!("Cache filled by concurrent request for {}", cache_key);
            return Ok(cache_path);
        }

        debug!("Cache miss for {}, generating thumbnail", cache_key);
        self.generate_thumbnail(&cache_key, &cache_path).await?;

        Ok(cache_path)
    }

    pub fn get_cache_path(&self, key: &CacheKey) -> CacheResult<PathBuf> {
        self.blobs
            .rendition_path(&key.rendition_filename())
            .ok_or(CacheError::PhotoNotFound)
    }

    async fn generate_thumbnail(&self, key: &CacheKey, cache_path: &Path) -> CacheResult<()> {
        let photo_path = self
            .blobs
            .original_path(&key.source_filename)
            .ok_or(CacheError::PhotoNotFound)?;

        if !is_file(&photo_path).await {
            return Err(CacheError::PhotoNotFound);
        }

        let format = ImageFormat::from_path(cache_path)?;
        let size = key.size;

        let thumbnail_data =
            tokio::task::spawn_blocking(move || render_thumbnail(&photo_path, size, format))
                .await
                .map_err(|e| CacheError::WorkerError(e.to_string()))??;

        self.blobs.write_atomic(cache_path, &thumbnail_data).await?;
        debug!("Saved thumbnail to cache: {:?}", cache_path);

        Ok(())
    }

    fn enter(&self, cache_path: &Path) -> InFlight<'_> {
        let mut map = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let gate = map
            .entry(cache_path.to_path_buf())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();

        InFlight {
            map: &self.in_flight,
            key: cache_path.to_path_buf(),
            gate,
        }
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight.lock().map(|m| m.len()).unwrap_or(0)
    }
}

/// Registration in the in-flight table, removed when the request is done with it.
struct InFlight<'a> {
    map: &'a Mutex<InFlightMap>,
    key: PathBuf,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut map = self
            .map
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if map
            .get(&self.key)
            .is_some_and(|current| Arc::ptr_eq(current, &self.gate))
        {
            map.remove(&self.key);
        }
    }
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

fn render_thumbnail(source: &Path, size: BoxSize, format: ImageFormat) -> CacheResult<Vec<u8>> {
    let img = ImageReader::open(source)?.with_guessed_format()?.decode()?;
    let thumbnail = resize_to_fit(img, size);
    encode_image(thumbnail, format)
}

/// Target dimensions for a downscale-only resize that keeps the aspect ratio
/// and fits inside `size`.
pub fn fit_dimensions(width: u32, height: u32, size: BoxSize) -> (u32, u32) {
    if width <= size.width && height <= size.height {
        return (width, height);
    }

    let src_aspect = width as f64 / height as f64;
    let box_aspect = size.width as f64 / size.height as f64;

    if src_aspect > box_aspect {
        let scaled = (height as f64 * size.width as f64 / width as f64).round();
        (size.width, (scaled as u32).clamp(1, size.height))
    } else {
        let scaled = (width as f64 * size.height as f64 / height as f64).round();
        ((scaled as u32).clamp(1, size.width), size.height)
    }
}

fn resize_to_fit(img: DynamicImage, size: BoxSize) -> DynamicImage {
    let (width, height) = fit_dimensions(img.width(), img.height(), size);
    if (width, height) == (img.width(), img.height()) {
        return img;
    }
    img.resize_exact(width, height, FilterType::Lanczos3)
}

fn encode_image(img: DynamicImage, format: ImageFormat) -> CacheResult<Vec<u8>> {
    // JPEG has no alpha channel.
    let img = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
        _ => img,
    };

    let mut buffer = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buffer, format)?;
    Ok(buffer.into_inner())
}
