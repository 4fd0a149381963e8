use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};

use crate::config::StorageConfig;

/// Filesystem storage for originals and their derived renditions.
#[derive(Debug, Clone)]
pub struct BlobStore {
    images_dir: PathBuf,
    thumbs_dir: PathBuf,
}

/// Strips any directory components from a client-supplied name.
///
/// Returns `None` when nothing usable is left (`""`, `".."`, `"/"`).
pub fn base_name(name: &str) -> Option<&str> {
    let base = Path::new(name).file_name()?.to_str()?;
    if base.is_empty() || base == "." || base == ".." {
        None
    } else {
        Some(base)
    }
}

impl BlobStore {
    pub fn new(images_dir: impl Into<PathBuf>, thumbs_dir: impl Into<PathBuf>) -> Self {
        Self {
            images_dir: images_dir.into(),
            thumbs_dir: thumbs_dir.into(),
        }
    }

    pub fn from_config(storage: &StorageConfig) -> Self {
        Self::new(&storage.images_path, &storage.thumbs_path)
    }

    pub fn ensure_dirs(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.images_dir)?;
        std::fs::create_dir_all(&self.thumbs_dir)?;
        Ok(())
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    pub fn thumbs_dir(&self) -> &Path {
        &self.thumbs_dir
    }

    /// Path of an original inside the images directory, or `None` for unusable names.
    pub fn original_path(&self, filename: &str) -> Option<PathBuf> {
        base_name(filename).map(|base| self.images_dir.join(base))
    }

    /// Path of a rendition inside the thumbs directory, or `None` for unusable names.
    pub fn rendition_path(&self, filename: &str) -> Option<PathBuf> {
        base_name(filename).map(|base| self.thumbs_dir.join(base))
    }

    /// Writes `data` to `target` so that readers only ever see the complete file.
    pub async fn write_atomic(&self, target: &Path, data: &[u8]) -> io::Result<()> {
        let temp_path = temp_sibling(target);

        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        publish(&temp_path, target).await
    }

    /// Streams `reader` into `target`, making it visible only once fully written.
    pub async fn write_stream<R>(&self, target: &Path, reader: &mut R) -> io::Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let temp_path = temp_sibling(target);

        let written = match copy_to_file(&temp_path, reader).await {
            Ok(written) => written,
            Err(e) => {
                let _ = fs::remove_file(&temp_path).await;
                return Err(e);
            }
        };

        publish(&temp_path, target).await?;
        Ok(written)
    }
}

async fn copy_to_file<R>(path: &Path, reader: &mut R) -> io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut file = fs::File::create(path).await?;
    let written = tokio::io::copy(reader, &mut file).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

async fn publish(temp_path: &Path, target: &Path) -> io::Result<()> {
    if let Err(e) = fs::rename(temp_path, target).await {
        warn!(
            "Failed to move {} into place at {}: {}",
            temp_path.display(),
            target.display(),
            e
        );
        let _ = fs::remove_file(temp_path).await;
        return Err(e);
    }

    debug!("Wrote blob {}", target.display());
    Ok(())
}

/// Hidden, uniquely named file next to `target`, so the final rename stays on one filesystem.
fn temp_sibling(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_name = format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple());

    match target.parent() {
        Some(parent) => parent.join(temp_name),
        None => PathBuf::from(temp_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (BlobStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = BlobStore::new(temp_dir.path().join("images"), temp_dir.path().join("thumbs"));
        store.ensure_dirs().unwrap();
        (store, temp_dir)
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_base_name_strips_directories() {
        assert_eq!(base_name("photo.jpg"), Some("photo.jpg"));
        assert_eq!(base_name("../../etc/passwd"), Some("passwd"));
        assert_eq!(base_name("/abs/path/a.png"), Some("a.png"));
        assert_eq!(base_name(".."), None);
        assert_eq!(base_name("/"), None);
        assert_eq!(base_name(""), None);
    }

    #[test]
    fn test_paths_stay_inside_store() {
        let (store, _temp_dir) = create_test_store();

        let original = store.original_path("../secret.jpg").unwrap();
        assert_eq!(original, store.images_dir().join("secret.jpg"));

        let rendition = store.rendition_path("x/../200x200_a.jpg").unwrap();
        assert_eq!(rendition, store.thumbs_dir().join("200x200_a.jpg"));

        assert!(store.original_path("..").is_none());
    }

    #[tokio::test]
    async fn test_write_atomic_leaves_only_final_file() {
        let (store, _temp_dir) = create_test_store();
        let target = store.thumbs_dir().join("10x10_a.jpg");

        store.write_atomic(&target, b"rendition").await.unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"rendition");
        assert_eq!(dir_entries(store.thumbs_dir()), vec!["10x10_a.jpg"]);
    }

    #[tokio::test]
    async fn test_write_atomic_failure_leaves_nothing_behind() {
        let (store, temp_dir) = create_test_store();
        let target = temp_dir.path().join("missing-dir").join("a.jpg");

        assert!(store.write_atomic(&target, b"data").await.is_err());
        assert!(!target.exists());
        assert_eq!(dir_entries(store.thumbs_dir()), Vec::<String>::new());
    }

    #[tokio::test]
    async fn test_write_stream_copies_all_bytes() {
        let (store, _temp_dir) = create_test_store();
        let target = store.images_dir().join("upload.png");
        let payload = vec![7u8; 64 * 1024];

        let written = store
            .write_stream(&target, &mut payload.as_slice())
            .await
            .unwrap();

        assert_eq!(written, payload.len() as u64);
        assert_eq!(std::fs::read(&target).unwrap(), payload);
        assert_eq!(dir_entries(store.images_dir()), vec!["upload.png"]);
    }
}
