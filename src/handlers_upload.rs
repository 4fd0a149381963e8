use bytes::{BufMut, BytesMut};
use futures_util::TryStreamExt;
use warp::http::Uri;
use warp::multipart::{FormData, Part};
use warp::{reject, Filter, Rejection, Reply};

use crate::ingest::{IngestError, IngestionService};
use crate::warp_helpers::{with_ingestion, ProcessingError, ValidationError};

const IMAGE_FIELD: &str = "image";
const TITLE_FIELD: &str = "title";
const ALBUM_FIELD: &str = "album";

/// Fields of the upload form, with the image buffered in memory.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub image: Option<UploadedFile>,
    pub title: Option<String>,
    pub album: Option<String>,
}

/// The `image` part. Only file parts qualify, so a filename is always present.
#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub data: BytesMut,
}

fn invalid_form(message: impl Into<String>) -> Rejection {
    reject::custom(ValidationError {
        message: message.into(),
    })
}

async fn read_part(part: Part) -> Result<BytesMut, Rejection> {
    part.stream()
        .try_fold(BytesMut::new(), |mut buffer, chunk| async move {
            buffer.put(chunk);
            Ok(buffer)
        })
        .await
        .map_err(|e| {
            log::warn!("Failed to read upload part: {}", e);
            invalid_form(format!("Invalid form: {}", e))
        })
}

async fn read_text(part: Part) -> Result<String, Rejection> {
    let data = read_part(part).await?;
    String::from_utf8(data.to_vec())
        .map_err(|_| invalid_form("Form fields must be UTF-8"))
}

pub async fn read_upload_form(mut form: FormData) -> Result<UploadForm, Rejection> {
    let mut upload = UploadForm::default();

    while let Some(part) = form.try_next().await.map_err(|e| {
        log::warn!("Malformed multipart body: {}", e);
        invalid_form(format!("Invalid form: {}", e))
    })? {
        let name = part.name().to_string();
        match name.as_str() {
            IMAGE_FIELD => {
                let filename = part
                    .filename()
                    .map(str::to_string)
                    .ok_or_else(|| invalid_form("Image required"))?;
                let data = read_part(part).await?;
                upload.image = Some(UploadedFile { filename, data });
            }
            TITLE_FIELD => upload.title = Some(read_text(part).await?),
            ALBUM_FIELD => upload.album = Some(read_text(part).await?),
            other => log::debug!("Ignoring form field {}", other),
        }
    }

    Ok(upload)
}

pub async fn store_upload(
    upload: UploadForm,
    ingestion: &IngestionService,
) -> Result<crate::db::ImageRecord, Rejection> {
    let image = upload
        .image
        .ok_or_else(|| invalid_form("Image required"))?;
    if image.data.is_empty() {
        return Err(invalid_form("Uploaded image is empty"));
    }

    let mut body: &[u8] = &image.data;
    ingestion
        .ingest(
            &mut body,
            Some(&image.filename),
            upload.title.as_deref(),
            upload.album.as_deref(),
        )
        .await
        .map_err(|e| match e {
            IngestError::Empty => invalid_form("Uploaded image is empty"),
            IngestError::Storage(e) => {
                log::error!("Failed to store upload: {}", e);
                reject::custom(ProcessingError {
                    message: "Failed to store image".to_string(),
                })
            }
        })
}

pub async fn upload_image(
    form: FormData,
    ingestion: IngestionService,
) -> Result<impl Reply, Rejection> {
    let upload = read_upload_form(form).await?;
    let record = store_upload(upload, &ingestion).await?;
    log::debug!("Upload complete: {}", record.filename);

    Ok(warp::redirect::see_other(Uri::from_static("/")))
}

pub fn build_upload_routes(
    ingestion: IngestionService,
    max_upload_bytes: u64,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("upload")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::multipart::form().max_length(max_upload_bytes))
        .and(with_ingestion(ingestion))
        .and_then(upload_image)
}
