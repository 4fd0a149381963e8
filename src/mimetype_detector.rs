use std::path::Path;

const OCTET_STREAM: MimeType = MimeType::new("application", "octet-stream");

/// Detects the MIME type of a stored blob from its extension
pub fn from_path(path: &Path) -> Option<MimeType> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(from_extension)
}

/// `Content-Type` value for a stored blob, falling back to `application/octet-stream`
pub fn content_type(path: &Path) -> String {
    from_path(path).unwrap_or(OCTET_STREAM).to_string()
}

/// MIME type for a raster extension the thumbnailer can decode; `None` for anything else.
pub fn from_extension(ext: &str) -> Option<MimeType> {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some(MimeType::new("image", "jpeg")),
        "png" => Some(MimeType::new("image", "png")),
        "gif" => Some(MimeType::new("image", "gif")),
        "webp" => Some(MimeType::new("image", "webp")),
        "bmp" => Some(MimeType::new("image", "bmp")),
        "tiff" | "tif" => Some(MimeType::new("image", "tiff")),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MimeType {
    type_: &'static str,
    subtype: &'static str,
}

impl MimeType {
    const fn new(type_: &'static str, subtype: &'static str) -> Self {
        Self { type_, subtype }
    }
}

impl std::fmt::Display for MimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)
    }
}
