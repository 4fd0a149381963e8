use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub use crate::db_pool::{create_db_pool, create_in_memory_pool, ping, DbPool};

/// Metadata for one uploaded original. Written once at ingestion, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: String,
    /// Blob name in the images directory, `{id}{ext}`.
    pub filename: String,
    pub title: Option<String>,
    pub album: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ImageRow {
    id: String,
    filename: String,
    title: Option<String>,
    album: Option<String>,
    created_at: i64,
}

impl From<ImageRow> for ImageRecord {
    fn from(row: ImageRow) -> Self {
        ImageRecord {
            id: row.id,
            filename: row.filename,
            title: row.title,
            album: row.album,
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap_or_default(),
        }
    }
}

// Listing and counting share the album predicate; `?1` is NULL when unfiltered.
const LIST_SQL: &str = "SELECT id, filename, title, album, created_at FROM images \
     WHERE (?1 IS NULL OR album = ?1) \
     ORDER BY created_at DESC, rowid DESC \
     LIMIT ?2 OFFSET ?3";

const COUNT_SQL: &str = "SELECT COUNT(1) FROM images WHERE (?1 IS NULL OR album = ?1)";

impl ImageRecord {
    pub async fn insert(&self, pool: &DbPool) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO images (id, filename, title, album, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&self.id)
        .bind(&self.filename)
        .bind(&self.title)
        .bind(&self.album)
        .bind(self.created_at.timestamp())
        .execute(pool)
        .await?;
        Ok(())
    }

    #[cfg(test)]
    pub async fn find_by_id(pool: &DbPool, id: &str) -> Result<Option<ImageRecord>, sqlx::Error> {
        let row = sqlx::query_as::<_, ImageRow>(
            "SELECT id, filename, title, album, created_at FROM images WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(ImageRecord::from))
    }

    /// Newest-first page of records plus the total for the same filter.
    pub async fn list_with_pagination(
        pool: &DbPool,
        album: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ImageRecord>, i64), sqlx::Error> {
        let rows = sqlx::query_as::<_, ImageRow>(LIST_SQL)
            .bind(album)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        let total = Self::count(pool, album).await?;

        Ok((rows.into_iter().map(ImageRecord::from).collect(), total))
    }

    pub async fn count(pool: &DbPool, album: Option<&str>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(COUNT_SQL)
            .bind(album)
            .fetch_one(pool)
            .await
    }
}
