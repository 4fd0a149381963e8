use serde::Serialize;
use std::convert::Infallible;

use warp::http::StatusCode;
use warp::{reject, Filter, Rejection, Reply};

use crate::blob_store::BlobStore;
use crate::db::DbPool;
use crate::file_responder::{ConditionalHeaders, FileResponder};
use crate::gallery::GalleryService;
use crate::ingest::IngestionService;
use crate::thumbnail_generator::ThumbnailGenerator;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    pub timestamp: String,
}

#[derive(Debug)]
pub struct DatabaseError {
    pub message: String,
}

impl reject::Reject for DatabaseError {}

#[derive(Debug)]
pub struct NotFoundError;
impl reject::Reject for NotFoundError {}

#[derive(Debug)]
pub struct ValidationError {
    pub message: String,
}

impl reject::Reject for ValidationError {}

/// Image decoding, encoding, storage, or rendering failure.
#[derive(Debug)]
pub struct ProcessingError {
    pub message: String,
}

impl reject::Reject for ProcessingError {}

pub fn with_db(db_pool: DbPool) -> impl Filter<Extract = (DbPool,), Error = Infallible> + Clone {
    warp::any().map(move || db_pool.clone())
}

pub fn with_thumbnail_generator(
    thumbnail_generator: ThumbnailGenerator,
) -> impl Filter<Extract = (ThumbnailGenerator,), Error = Infallible> + Clone {
    warp::any().map(move || thumbnail_generator.clone())
}

pub fn with_blobs(blobs: BlobStore) -> impl Filter<Extract = (BlobStore,), Error = Infallible> + Clone {
    warp::any().map(move || blobs.clone())
}

pub fn with_file_responder(
    responder: FileResponder,
) -> impl Filter<Extract = (FileResponder,), Error = Infallible> + Clone {
    warp::any().map(move || responder.clone())
}

pub fn with_gallery(
    gallery: GalleryService,
) -> impl Filter<Extract = (GalleryService,), Error = Infallible> + Clone {
    warp::any().map(move || gallery.clone())
}

pub fn with_ingestion(
    ingestion: IngestionService,
) -> impl Filter<Extract = (IngestionService,), Error = Infallible> + Clone {
    warp::any().map(move || ingestion.clone())
}

pub fn with_conditional_headers(
) -> impl Filter<Extract = (ConditionalHeaders,), Error = Rejection> + Clone {
    warp::header::optional::<String>("if-none-match")
        .and(warp::header::optional::<String>("if-modified-since"))
        .map(|if_none_match, if_modified_since| ConditionalHeaders {
            if_none_match,
            if_modified_since,
        })
}

/// The rest of the request path, undecoded. Handlers reduce it to a base name.
pub fn tail_path() -> impl Filter<Extract = (String,), Error = Infallible> + Clone {
    warp::path::tail().map(|tail: warp::path::Tail| tail.as_str().to_string())
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message;
    let timestamp = chrono::Utc::now().to_rfc3339();

    if err.is_not_found() {
        code = StatusCode::NOT_FOUND;
        message = "Not Found".to_string();
    } else if let Some(database_error) = err.find::<DatabaseError>() {
        code = StatusCode::INTERNAL_SERVER_ERROR;
        message = database_error.message.clone();
    } else if let Some(processing_error) = err.find::<ProcessingError>() {
        code = StatusCode::INTERNAL_SERVER_ERROR;
        message = processing_error.message.clone();
    } else if err.find::<NotFoundError>().is_some() {
        code = StatusCode::NOT_FOUND;
        message = "Image not found".to_string();
    } else if let Some(validation_error) = err.find::<ValidationError>() {
        code = StatusCode::BAD_REQUEST;
        message = validation_error.message.clone();
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        code = StatusCode::BAD_REQUEST;
        message = "File too big".to_string();
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        code = StatusCode::BAD_REQUEST;
        message = "Upload must declare its length".to_string();
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        code = StatusCode::BAD_REQUEST;
        message = "Expected a multipart form".to_string();
    } else if let Some(invalid) = err.find::<warp::reject::InvalidHeader>() {
        code = StatusCode::BAD_REQUEST;
        message = invalid.to_string();
    } else if let Some(missing) = err.find::<warp::reject::MissingHeader>() {
        code = StatusCode::BAD_REQUEST;
        message = missing.to_string();
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        code = StatusCode::METHOD_NOT_ALLOWED;
        message = "Method not allowed".to_string();
    } else {
        log::error!("Unhandled rejection: {:?}", err);
        code = StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal server error".to_string();
    }

    let error_response = ErrorResponse {
        error: message,
        code: code.as_u16(),
        timestamp,
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&error_response),
        code,
    ))
}
