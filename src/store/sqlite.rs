use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use super::{NewPost, PostStore, StoreError};
use crate::db::models::{Creator, Post};
use crate::state::DbPool;

/// SQLite-backed post store. The creator is kept as an embedded JSON document.
#[derive(Clone)]
pub struct SqlitePostStore {
    pool: DbPool,
}

impl SqlitePostStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

struct PostRow {
    id: String,
    title: String,
    content: String,
    image_url: Option<String>,
    creator: String,
    created_at: DateTime<Utc>,
}

impl PostRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            image_url: row.get(3)?,
            creator: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn into_post(self) -> Result<Post, StoreError> {
        let creator: Creator = serde_json::from_str(&self.creator)?;
        Ok(Post {
            id: self.id,
            title: self.title,
            content: self.content,
            image_url: self.image_url,
            creator,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl PostStore for SqlitePostStore {
    async fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, content, image_url, creator, created_at FROM posts \
             ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt
            .query_map([], PostRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(PostRow::into_post).collect()
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, StoreError> {
        let stored = Post {
            id: uuid::Uuid::now_v7().to_string(),
            title: post.title,
            content: post.content,
            image_url: post.image_url,
            creator: post.creator,
            created_at: Utc::now(),
        };

        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO posts (id, title, content, image_url, creator, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                stored.id,
                stored.title,
                stored.content,
                stored.image_url,
                serde_json::to_string(&stored.creator)?,
                stored.created_at,
            ],
        )?;

        tracing::debug!("Stored post {}", stored.id);
        Ok(stored)
    }
}
