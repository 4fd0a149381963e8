use warp::{reject, Filter, Rejection, Reply};

use crate::gallery::{GalleryError, GalleryQuery, GalleryService, ImagesResponse};
use crate::warp_helpers::{with_gallery, DatabaseError, ProcessingError};

fn gallery_rejection(err: GalleryError) -> Rejection {
    log::error!("Gallery error: {}", err);
    match err {
        GalleryError::Database(e) => reject::custom(DatabaseError {
            message: format!("Database error: {}", e),
        }),
        GalleryError::Template(e) => reject::custom(ProcessingError {
            message: format!("Template error: {}", e),
        }),
    }
}

pub async fn gallery_page(
    query: GalleryQuery,
    gallery: GalleryService,
) -> Result<impl Reply, Rejection> {
    let request = gallery.page_request(&query);
    let page = gallery
        .load_page(&request)
        .await
        .map_err(gallery_rejection)?;
    let html = gallery.render_index(&page).map_err(gallery_rejection)?;

    Ok(warp::reply::html(html))
}

pub async fn list_images(
    query: GalleryQuery,
    gallery: GalleryService,
) -> Result<impl Reply, Rejection> {
    log::debug!("Listing images: {:?}", query);

    let request = gallery.page_request(&query);
    let page = gallery
        .load_page(&request)
        .await
        .map_err(gallery_rejection)?;

    Ok(warp::reply::json(&ImagesResponse::from(page)))
}

pub fn build_gallery_routes(
    gallery: GalleryService,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let index = warp::path::end()
        .and(warp::get())
        .and(warp::query::<GalleryQuery>())
        .and(with_gallery(gallery.clone()))
        .and_then(gallery_page);

    let api_images = warp::path("api")
        .and(warp::path("images"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<GalleryQuery>())
        .and(with_gallery(gallery))
        .and_then(list_images);

    index.or(api_images)
}
