use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::MAX_PER_PAGE;
use crate::db::{DbPool, ImageRecord};

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html.liquid");

/// Raw gallery query parameters. Kept as strings so bad input can fall back to defaults.
#[derive(Debug, Default, Deserialize)]
pub struct GalleryQuery {
    pub page: Option<String>,
    pub per: Option<String>,
    pub album: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per: u32,
    pub album: Option<String>,
}

impl PageRequest {
    /// Missing, non-numeric, or non-positive `page`/`per` values silently become defaults.
    pub fn from_query(query: &GalleryQuery, default_per: u32) -> Self {
        let album = query
            .album
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string);

        PageRequest {
            page: positive_or(query.page.as_deref(), 1),
            per: positive_or(query.per.as_deref(), default_per).min(MAX_PER_PAGE),
            album,
        }
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.per)
    }
}

fn positive_or(value: Option<&str>, default: u32) -> u32 {
    value
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

/// Everything the gallery template renders.
#[derive(Debug, Clone, Serialize)]
pub struct GalleryPage {
    pub images: Vec<ImageRecord>,
    pub page: u32,
    pub per: u32,
    pub total: i64,
    pub album: Option<String>,
    pub total_pages: i64,
    pub has_prev: bool,
    pub has_next: bool,
    pub prev_page: u32,
    pub next_page: u32,
}

impl GalleryPage {
    pub fn new(request: &PageRequest, images: Vec<ImageRecord>, total: i64) -> Self {
        let per = i64::from(request.per);
        let total_pages = (total + per - 1) / per;

        GalleryPage {
            images,
            page: request.page,
            per: request.per,
            total,
            album: request.album.clone(),
            total_pages,
            has_prev: request.page > 1,
            has_next: i64::from(request.page) * per < total,
            prev_page: request.page.saturating_sub(1).max(1),
            next_page: request.page.saturating_add(1),
        }
    }
}

/// Body of `GET /api/images`.
#[derive(Debug, Serialize)]
pub struct ImagesResponse {
    pub page: u32,
    pub per: u32,
    pub total: i64,
    pub images: Vec<ImageRecord>,
}

impl From<GalleryPage> for ImagesResponse {
    fn from(page: GalleryPage) -> Self {
        ImagesResponse {
            page: page.page,
            per: page.per,
            total: page.total,
            images: page.images,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GalleryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Template error: {0}")]
    Template(#[from] liquid::Error),
}

pub struct GalleryTemplates {
    index: liquid::Template,
}

impl GalleryTemplates {
    pub fn new() -> Result<Self, GalleryError> {
        let parser = liquid::ParserBuilder::with_stdlib().build()?;
        let index = parser.parse(INDEX_TEMPLATE)?;
        Ok(Self { index })
    }

    pub fn render_index(&self, page: &GalleryPage) -> Result<String, GalleryError> {
        let globals = liquid::to_object(page)?;
        Ok(self.index.render(&globals)?)
    }
}

/// Paginated views over the metadata store.
#[derive(Clone)]
pub struct GalleryService {
    db_pool: DbPool,
    templates: Arc<GalleryTemplates>,
    default_per: u32,
}

impl GalleryService {
    pub fn new(db_pool: DbPool, templates: Arc<GalleryTemplates>, default_per: u32) -> Self {
        Self {
            db_pool,
            templates,
            default_per: default_per.max(1),
        }
    }

    pub fn page_request(&self, query: &GalleryQuery) -> PageRequest {
        PageRequest::from_query(query, self.default_per)
    }

    /// Newest-first records for the requested page, with the total for the same filter.
    pub async fn list_images(
        &self,
        request: &PageRequest,
    ) -> Result<(Vec<ImageRecord>, i64), GalleryError> {
        let listing = ImageRecord::list_with_pagination(
            &self.db_pool,
            request.album.as_deref(),
            i64::from(request.per),
            request.offset(),
        )
        .await?;
        Ok(listing)
    }

    pub async fn load_page(&self, request: &PageRequest) -> Result<GalleryPage, GalleryError> {
        let (images, total) = self.list_images(request).await?;
        Ok(GalleryPage::new(request, images, total))
    }

    pub fn render_index(&self, page: &GalleryPage) -> Result<String, GalleryError> {
        self.templates.render_index(page)
    }
}
