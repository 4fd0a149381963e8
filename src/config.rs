use std::env;

pub const DEFAULT_PER_PAGE: u32 = 12;
pub const MAX_PER_PAGE: u32 = 100;
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 20;
pub const DEFAULT_CACHE_MAX_AGE_SECS: u64 = 86400;

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub images_path: String,
    pub thumbs_path: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub db_path: String,
    pub db_max_connections: u32,
    pub storage: StorageConfig,
    pub max_upload_bytes: u64,
    pub default_per_page: u32,
    pub cache_max_age_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let max_upload_mb: u64 = env::var("PIXSHELF_MAX_UPLOAD_MB")
            .unwrap_or_else(|_| DEFAULT_MAX_UPLOAD_MB.to_string())
            .parse()?;

        Ok(Config {
            port: env::var("PIXSHELF_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            host: env::var("PIXSHELF_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            db_path: env::var("PIXSHELF_DB_PATH").unwrap_or_else(|_| "./gallery.db".to_string()),
            db_max_connections: env::var("PIXSHELF_DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "8".to_string())
                .parse()?,
            storage: StorageConfig {
                images_path: env::var("PIXSHELF_IMAGES_PATH")
                    .unwrap_or_else(|_| "./images".to_string()),
                thumbs_path: env::var("PIXSHELF_THUMBS_PATH")
                    .unwrap_or_else(|_| "./thumbs".to_string()),
            },
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            default_per_page: env::var("PIXSHELF_DEFAULT_PER_PAGE")
                .unwrap_or_else(|_| DEFAULT_PER_PAGE.to_string())
                .parse()?,
            cache_max_age_secs: env::var("PIXSHELF_CACHE_MAX_AGE")
                .unwrap_or_else(|_| DEFAULT_CACHE_MAX_AGE_SECS.to_string())
                .parse()?,
        })
    }

    pub fn bind_address(&self) -> Result<std::net::SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}
