use sqlx::SqlitePool;

pub const IMAGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS images (
    id TEXT PRIMARY KEY NOT NULL,
    filename TEXT NOT NULL,
    title TEXT,
    album TEXT,
    -- epoch seconds
    created_at INTEGER NOT NULL
)
"#;

pub const SCHEMA_SQL: &[&str] = &[
    IMAGES_TABLE,
    "CREATE INDEX IF NOT EXISTS idx_images_created_at ON images(created_at);",
    "CREATE INDEX IF NOT EXISTS idx_images_album_created_at ON images(album, created_at);",
];

pub async fn initialize_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for sql in SCHEMA_SQL {
        sqlx::query(sql).execute(pool).await?;
    }
    Ok(())
}
