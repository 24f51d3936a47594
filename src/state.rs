use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::Config;
use crate::intake::ImageIntake;
use crate::store::PostStore;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub posts: Arc<dyn PostStore>,
    pub intake: ImageIntake,
}

impl AppState {
    pub fn new(db: DbPool, config: Config, posts: Arc<dyn PostStore>) -> Self {
        let intake = ImageIntake::new(
            config.images_path().to_path_buf(),
            config.images_url_prefix().to_string(),
        );
        Self {
            db,
            config,
            posts,
            intake,
        }
    }
}
