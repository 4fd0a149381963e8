use std::sync::Arc;

use tempfile::TempDir;

use pixshelf::blob_store::BlobStore;
use pixshelf::db::{create_db_pool, DbPool, ImageRecord};
use pixshelf::gallery::{GalleryQuery, GalleryService, GalleryTemplates};
use pixshelf::ingest::IngestionService;

struct Fixture {
    _temp_dir: TempDir,
    pool: DbPool,
    ingestion: IngestionService,
    gallery: GalleryService,
}

async fn create_fixture() -> Fixture {
    let temp_dir = TempDir::new().unwrap();
    let blobs = BlobStore::new(temp_dir.path().join("images"), temp_dir.path().join("thumbs"));
    blobs.ensure_dirs().unwrap();

    let db_path = temp_dir.path().join("gallery.db");
    let pool = create_db_pool(db_path.to_str().unwrap(), 4).await.unwrap();

    let templates = Arc::new(GalleryTemplates::new().unwrap());
    Fixture {
        _temp_dir: temp_dir,
        pool: pool.clone(),
        ingestion: IngestionService::new(blobs, pool.clone()),
        gallery: GalleryService::new(pool, templates, 12),
    }
}

fn query(page: &str, per: &str, album: Option<&str>) -> GalleryQuery {
    GalleryQuery {
        page: Some(page.to_string()),
        per: Some(per.to_string()),
        album: album.map(str::to_string),
    }
}

#[tokio::test]
async fn test_uploads_appear_newest_first() {
    let fixture = create_fixture().await;

    let mut ingested = Vec::new();
    for n in 0..25 {
        let mut body: &[u8] = b"image bytes";
        let title = format!("Photo {}", n);
        ingested.push(
            fixture
                .ingestion
                .ingest(&mut body, Some("p.jpg"), Some(&title), None)
                .await
                .unwrap(),
        );
    }

    let page2 = fixture
        .gallery
        .load_page(&fixture.gallery.page_request(&query("2", "10", None)))
        .await
        .unwrap();
    assert_eq!(page2.total, 25);
    assert_eq!(page2.images.len(), 10);

    let expected: Vec<_> = ingested.iter().rev().skip(10).take(10).map(|r| r.id.clone()).collect();
    let actual: Vec<_> = page2.images.iter().map(|r| r.id.clone()).collect();
    assert_eq!(actual, expected);

    let page3 = fixture
        .gallery
        .load_page(&fixture.gallery.page_request(&query("3", "10", None)))
        .await
        .unwrap();
    assert_eq!(page3.images.len(), 5);
    assert!(!page3.has_next);
}

#[tokio::test]
async fn test_album_filter_never_leaks() {
    let fixture = create_fixture().await;

    for album in ["alps", "beach", "alps", "", "beach", "alps"] {
        let mut body: &[u8] = b"x";
        fixture
            .ingestion
            .ingest(&mut body, None, None, Some(album))
            .await
            .unwrap();
    }

    let alps = fixture
        .gallery
        .load_page(&fixture.gallery.page_request(&query("1", "50", Some("alps"))))
        .await
        .unwrap();
    assert_eq!(alps.total, 3);
    assert!(alps.images.iter().all(|r| r.album.as_deref() == Some("alps")));

    assert_eq!(ImageRecord::count(&fixture.pool, None).await.unwrap(), 6);
}

#[tokio::test]
async fn test_rendered_gallery_links_thumbnails() {
    let fixture = create_fixture().await;
    let mut body: &[u8] = b"x";
    let record = fixture
        .ingestion
        .ingest(&mut body, Some("IMG_0001"), Some("<b>Hello</b>"), None)
        .await
        .unwrap();
    assert!(record.filename.ends_with(".jpg"));

    let page = fixture
        .gallery
        .load_page(&fixture.gallery.page_request(&GalleryQuery::default()))
        .await
        .unwrap();
    let html = fixture.gallery.render_index(&page).unwrap();

    assert!(html.contains(&format!("/thumb/200x200/{}", record.filename)));
    assert!(html.contains(&format!("/images/{}", record.filename)));
    assert!(html.contains("&lt;b&gt;Hello&lt;/b&gt;"));
    assert!(!html.contains("<b>Hello</b>"));
}
