use image::{GenericImageView, RgbImage};
use tempfile::TempDir;
use warp::http::header::{ETAG, LAST_MODIFIED};
use warp::http::StatusCode;
use warp::Reply;

use pixshelf::blob_store::BlobStore;
use pixshelf::file_responder::{ConditionalHeaders, FileResponder};
use pixshelf::handlers_thumbnail::get_thumbnail;
use pixshelf::thumbnail_generator::ThumbnailGenerator;
use pixshelf::warp_helpers::{handle_rejection, NotFoundError, ValidationError};

struct Fixture {
    _temp_dir: TempDir,
    blobs: BlobStore,
    generator: ThumbnailGenerator,
    responder: FileResponder,
}

fn create_fixture() -> Fixture {
    let temp_dir = TempDir::new().unwrap();
    let blobs = BlobStore::new(temp_dir.path().join("images"), temp_dir.path().join("thumbs"));
    blobs.ensure_dirs().unwrap();
    let generator = ThumbnailGenerator::new(blobs.clone()).unwrap();

    Fixture {
        _temp_dir: temp_dir,
        blobs,
        generator,
        responder: FileResponder::new(86400),
    }
}

fn write_photo(blobs: &BlobStore, name: &str, width: u32, height: u32) {
    RgbImage::from_pixel(width, height, image::Rgb([200, 40, 90]))
        .save(blobs.images_dir().join(name))
        .unwrap();
}

async fn request_thumbnail(
    fixture: &Fixture,
    size: &str,
    filename: &str,
    conditional: ConditionalHeaders,
) -> warp::reply::Response {
    match get_thumbnail(
        size.to_string(),
        filename.to_string(),
        conditional,
        fixture.generator.clone(),
        fixture.responder.clone(),
    )
    .await
    {
        Ok(reply) => reply.into_response(),
        Err(rejection) => handle_rejection(rejection).await.unwrap().into_response(),
    }
}

#[tokio::test]
async fn test_thumbnail_is_generated_then_revalidated() {
    let fixture = create_fixture();
    write_photo(&fixture.blobs, "wide.jpg", 800, 400);

    let first = request_thumbnail(&fixture, "200x200", "wide.jpg", ConditionalHeaders::default()).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers()["content-type"], "image/jpeg");
    assert_eq!(first.headers()["cache-control"], "public, max-age=86400");

    let rendition = fixture.blobs.thumbs_dir().join("200x200_wide.jpg");
    let (width, height) = image::open(&rendition).unwrap().dimensions();
    assert_eq!((width, height), (200, 100));

    let etag = first.headers()[ETAG].to_str().unwrap().to_string();
    let last_modified = first.headers()[LAST_MODIFIED].to_str().unwrap().to_string();
    assert!(etag.starts_with("W/\""));

    let by_etag = request_thumbnail(
        &fixture,
        "200x200",
        "wide.jpg",
        ConditionalHeaders {
            if_none_match: Some(etag.clone()),
            if_modified_since: None,
        },
    )
    .await;
    assert_eq!(by_etag.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(by_etag.headers()[ETAG], etag.as_str());

    let by_date = request_thumbnail(
        &fixture,
        "200x200",
        "wide.jpg",
        ConditionalHeaders {
            if_none_match: None,
            if_modified_since: Some(last_modified),
        },
    )
    .await;
    assert_eq!(by_date.status(), StatusCode::NOT_MODIFIED);
}

#[tokio::test]
async fn test_cached_rendition_is_reused() {
    let fixture = create_fixture();
    write_photo(&fixture.blobs, "a.png", 300, 300);

    let first = request_thumbnail(&fixture, "64x64", "a.png", ConditionalHeaders::default()).await;
    let second = request_thumbnail(&fixture, "64x64", "a.png", ConditionalHeaders::default()).await;

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(first.headers()[ETAG], second.headers()[ETAG]);
}

#[tokio::test]
async fn test_invalid_sizes_are_bad_requests() {
    let fixture = create_fixture();
    write_photo(&fixture.blobs, "a.jpg", 10, 10);

    for size in ["0x100", "100x0", "abcxdef", "200"] {
        let result = get_thumbnail(
            size.to_string(),
            "a.jpg".to_string(),
            ConditionalHeaders::default(),
            fixture.generator.clone(),
            fixture.responder.clone(),
        )
        .await;
        let rejection = result.err().unwrap();
        assert!(rejection.find::<ValidationError>().is_some(), "{}", size);

        let response = request_thumbnail(&fixture, size, "a.jpg", ConditionalHeaders::default()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_missing_source_is_not_found() {
    let fixture = create_fixture();

    let result = get_thumbnail(
        "100x100".to_string(),
        "ghost.jpg".to_string(),
        ConditionalHeaders::default(),
        fixture.generator.clone(),
        fixture.responder.clone(),
    )
    .await;
    assert!(result.err().unwrap().find::<NotFoundError>().is_some());
    assert!(!fixture.blobs.thumbs_dir().join("100x100_ghost.jpg").exists());

    let response = request_thumbnail(&fixture, "100x100", "ghost.jpg", ConditionalHeaders::default()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_undecodable_source_is_server_error() {
    let fixture = create_fixture();
    std::fs::write(fixture.blobs.images_dir().join("broken.jpg"), b"not an image").unwrap();

    let response = request_thumbnail(&fixture, "100x100", "broken.jpg", ConditionalHeaders::default()).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!fixture.blobs.thumbs_dir().join("100x100_broken.jpg").exists());
}

#[tokio::test]
async fn test_path_components_are_stripped() {
    let fixture = create_fixture();
    write_photo(&fixture.blobs, "a.jpg", 50, 50);

    let response = request_thumbnail(&fixture, "20x20", "nested/../a.jpg", ConditionalHeaders::default()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(fixture.blobs.thumbs_dir().join("20x20_a.jpg").exists());
}
