use std::str::FromStr;
use warp::{reject, Filter, Rejection, Reply};

use crate::file_responder::{ConditionalHeaders, FileResponder, ServeError};
use crate::thumbnail_generator::ThumbnailGenerator;
use crate::thumbnail_types::{BoxSize, CacheError};
use crate::warp_helpers::{
    tail_path, with_conditional_headers, with_file_responder, with_thumbnail_generator,
    NotFoundError, ProcessingError, ValidationError,
};

pub fn serve_rejection(err: ServeError) -> Rejection {
    match err {
        ServeError::NotFound => reject::custom(NotFoundError),
        ServeError::IoError(e) => {
            log::error!("Failed to read file: {}", e);
            reject::custom(ProcessingError {
                message: "Failed to read file".to_string(),
            })
        }
    }
}

fn cache_rejection(err: CacheError) -> Rejection {
    match err {
        CacheError::InvalidSize(size) => reject::custom(ValidationError {
            message: format!("Invalid thumbnail size: {}", size),
        }),
        CacheError::PhotoNotFound => reject::custom(NotFoundError),
        other => {
            log::error!("Failed to generate thumbnail: {}", other);
            reject::custom(ProcessingError {
                message: format!("Failed to generate thumbnail: {}", other),
            })
        }
    }
}

pub async fn get_thumbnail(
    size: String,
    filename: String,
    conditional: ConditionalHeaders,
    thumbnail_generator: ThumbnailGenerator,
    responder: FileResponder,
) -> Result<impl Reply, Rejection> {
    log::debug!("Thumbnail requested for {}, size: {}", filename, size);

    let size = BoxSize::from_str(&size).map_err(cache_rejection)?;
    let path = thumbnail_generator
        .get_or_generate(&filename, size)
        .await
        .map_err(cache_rejection)?;

    responder
        .serve_with_caching(&path, &conditional)
        .await
        .map_err(serve_rejection)
}

pub fn build_thumbnail_routes(
    thumbnail_generator: ThumbnailGenerator,
    responder: FileResponder,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("thumb")
        .and(warp::path::param::<String>())
        .and(tail_path())
        .and(warp::get())
        .and(with_conditional_headers())
        .and(with_thumbnail_generator(thumbnail_generator))
        .and(with_file_responder(responder))
        .and_then(get_thumbnail)
}
