use warp::{reject, Filter, Rejection, Reply};

use crate::blob_store::BlobStore;
use crate::file_responder::{ConditionalHeaders, FileResponder};
use crate::handlers_thumbnail::serve_rejection;
use crate::warp_helpers::{
    tail_path, with_blobs, with_conditional_headers, with_file_responder, NotFoundError,
};

/// Which blob directory a static route serves from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKind {
    Original,
    Rendition,
}

pub async fn serve_blob(
    kind: BlobKind,
    name: String,
    conditional: ConditionalHeaders,
    blobs: BlobStore,
    responder: FileResponder,
) -> Result<impl Reply, Rejection> {
    let path = match kind {
        BlobKind::Original => blobs.original_path(&name),
        BlobKind::Rendition => blobs.rendition_path(&name),
    }
    .ok_or_else(|| reject::custom(NotFoundError))?;

    responder
        .serve_with_caching(&path, &conditional)
        .await
        .map_err(serve_rejection)
}

fn blob_route(
    prefix: &'static str,
    kind: BlobKind,
    blobs: BlobStore,
    responder: FileResponder,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path(prefix)
        .and(warp::get())
        .map(move || kind)
        .and(tail_path())
        .and(with_conditional_headers())
        .and(with_blobs(blobs))
        .and(with_file_responder(responder))
        .and_then(serve_blob)
}

/// `/images/{name}` serves originals and `/thumbs/{name}` serves renditions.
pub fn build_static_routes(
    blobs: BlobStore,
    responder: FileResponder,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let images = blob_route("images", BlobKind::Original, blobs.clone(), responder.clone());
    let thumbs = blob_route("thumbs", BlobKind::Rendition, blobs, responder);

    images.or(thumbs)
}
