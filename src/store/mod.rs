//! Post persistence contract.
//!
//! Handlers only see `dyn PostStore`, so tests can swap the SQLite store for
//! counting or failing doubles.

pub mod sqlite;

use async_trait::async_trait;

use crate::db::models::{Creator, Post};

pub use sqlite::SqlitePostStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// A post as submitted, before the store assigns `id` and `createdAt`.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub creator: Creator,
}

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Every stored post, oldest first.
    async fn list_posts(&self) -> Result<Vec<Post>, StoreError>;

    /// Persists the post and returns the stored record.
    async fn create_post(&self, post: NewPost) -> Result<Post, StoreError>;
}
