pub mod blob_store;
pub mod config;
pub mod db;
pub mod db_pool;
pub mod db_schema;
pub mod file_responder;
pub mod gallery;
pub mod handlers_gallery;
pub mod handlers_health;
pub mod handlers_static;
pub mod handlers_thumbnail;
pub mod handlers_upload;
pub mod ingest;
pub mod mimetype_detector;
pub mod routes;
pub mod thumbnail_generator;
pub mod thumbnail_types;
pub mod warp_helpers;
