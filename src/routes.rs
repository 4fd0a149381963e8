use log::info;
use std::convert::Infallible;
use std::sync::Arc;
use warp::Filter;

use crate::blob_store::BlobStore;
use crate::config::Config;
use crate::db::{self, DbPool};
use crate::file_responder::FileResponder;
use crate::gallery::{GalleryService, GalleryTemplates};
use crate::handlers_gallery::build_gallery_routes;
use crate::handlers_health::build_health_routes;
use crate::handlers_static::build_static_routes;
use crate::handlers_thumbnail::build_thumbnail_routes;
use crate::handlers_upload::build_upload_routes;
use crate::ingest::IngestionService;
use crate::thumbnail_generator::ThumbnailGenerator;
use crate::warp_helpers::handle_rejection;

/// Shared handles injected into the routes.
#[derive(Clone)]
pub struct Services {
    pub db_pool: DbPool,
    pub blobs: BlobStore,
    pub gallery: GalleryService,
    pub ingestion: IngestionService,
    pub thumbnail_generator: ThumbnailGenerator,
    pub responder: FileResponder,
    pub max_upload_bytes: u64,
}

pub async fn initialize_services(config: &Config) -> Result<Services, Box<dyn std::error::Error>> {
    let blobs = BlobStore::from_config(&config.storage);
    blobs.ensure_dirs()?;
    info!("Blob directories ready");

    let db_pool = db::create_db_pool(&config.db_path, config.db_max_connections).await?;
    info!("Database initialized successfully");

    let templates = Arc::new(GalleryTemplates::new()?);
    let gallery = GalleryService::new(db_pool.clone(), templates, config.default_per_page);
    let ingestion = IngestionService::new(blobs.clone(), db_pool.clone());

    let thumbnail_generator = ThumbnailGenerator::new(blobs.clone())?;
    let responder = FileResponder::new(config.cache_max_age_secs);
    info!("Thumbnail cache initialized");

    Ok(Services {
        db_pool,
        blobs,
        gallery,
        ingestion,
        thumbnail_generator,
        responder,
        max_upload_bytes: config.max_upload_bytes,
    })
}

/// Every route, logged, with rejections recovered into JSON error bodies.
pub fn build_routes(
    services: Services,
) -> impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone {
    let health_routes = build_health_routes(services.db_pool);
    let gallery_routes = build_gallery_routes(services.gallery);
    let upload_routes = build_upload_routes(services.ingestion, services.max_upload_bytes);
    let thumbnail_routes =
        build_thumbnail_routes(services.thumbnail_generator, services.responder.clone());
    let static_routes = build_static_routes(services.blobs, services.responder);

    health_routes
        .or(gallery_routes)
        .or(upload_routes)
        .or(thumbnail_routes)
        .or(static_routes)
        .with(warp::log("pixshelf"))
        .recover(handle_rejection)
}
