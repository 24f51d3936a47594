#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use feedline::config::Config;
use feedline::db;
use feedline::db::models::Post;
use feedline::routes;
use feedline::state::{AppState, DbPool};
use feedline::store::{NewPost, PostStore, SqlitePostStore, StoreError};

pub const BOUNDARY: &str = "feedline-test-boundary";

pub struct TestApp {
    pub dir: TempDir,
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    /// App backed by a fresh SQLite store in a temp dir.
    pub fn new() -> Self {
        Self::build(|pool| {
            let store: Arc<dyn PostStore> = Arc::new(SqlitePostStore::new(pool));
            store
        })
    }

    pub fn with_store(store: Arc<dyn PostStore>) -> Self {
        Self::build(move |_| store)
    }

    /// App whose SQLite store is wrapped in a write counter.
    pub fn counting() -> (Self, Arc<CountingStore>) {
        let mut counter = None;
        let app = Self::build(|pool| {
            let store = Arc::new(CountingStore::new(Arc::new(SqlitePostStore::new(pool))));
            counter = Some(store.clone());
            let store: Arc<dyn PostStore> = store;
            store
        });
        (app, counter.unwrap())
    }

    fn build(make_store: impl FnOnce(DbPool) -> Arc<dyn PostStore>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.resolve_paths(dir.path());
        config.auth.bcrypt_cost = 4;
        std::fs::create_dir_all(config.images_path()).unwrap();

        let pool = db::create_pool(config.db_path()).unwrap();
        db::run_migrations(&pool).unwrap();
        let store = make_store(pool.clone());

        let state = AppState::new(pool, config, store);
        let router = routes::app(state.clone());
        Self { dir, state, router }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> Response<Body> {
        self.send(json_request("POST", uri, body, None)).await
    }
}

pub fn json_request(method: &str, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// One part of a hand-built multipart body.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                        name, value
                    )
                    .as_bytes(),
                );
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, file_name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::post(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Wraps a real store and counts writes.
pub struct CountingStore {
    inner: Arc<dyn PostStore>,
    pub creates: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Arc<dyn PostStore>) -> Self {
        Self {
            inner,
            creates: AtomicUsize::new(0),
        }
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostStore for CountingStore {
    async fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        self.inner.list_posts().await
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, StoreError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create_post(post).await
    }
}

/// Simulates a lost database connection.
pub struct DisconnectedStore;

#[async_trait]
impl PostStore for DisconnectedStore {
    async fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        Err(StoreError::Unavailable("connection lost".into()))
    }

    async fn create_post(&self, _post: NewPost) -> Result<Post, StoreError> {
        Err(StoreError::Unavailable("connection lost".into()))
    }
}
