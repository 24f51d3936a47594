use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "feedline", about = "A small REST backend for a blog-post feed")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, env = "FEEDLINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long, env = "FEEDLINE_HOST")]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long, env = "FEEDLINE_PORT")]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long, env = "FEEDLINE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub images: ImagesConfig,
    pub feed: FeedConfig,
    pub auth: AuthConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub body_limit_bytes: usize,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ImagesConfig {
    pub path: Option<PathBuf>,
    /// Prefix of the `imageUrl` handed back to clients, also the static mount
    pub url_prefix: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct FeedConfig {
    /// Creator name used when the request carries no session
    pub default_creator: String,
    /// `imageUrl` for posts created without an accepted image
    pub placeholder_image: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub session_hours: u64,
    pub bcrypt_cost: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3090,
            body_limit_bytes: 16 * 1024 * 1024,
        }
    }
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            path: None,
            url_prefix: "images".to_string(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_creator: "anonymous".to_string(),
            placeholder_image: Some("images/placeholder.jpeg".to_string()),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_hours: 720,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        config.resolve_paths(&data_dir);
        Ok(config)
    }

    /// Fills unset storage paths relative to `data_dir`.
    pub fn resolve_paths(&mut self, data_dir: &Path) {
        if self.database.path.is_none() {
            self.database.path = Some(data_dir.join("feedline.db"));
        }
        if self.images.path.is_none() {
            self.images.path = Some(data_dir.join("images"));
        }
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .map(|home| home.join(".feedline"))
                .unwrap_or_else(|| PathBuf::from(".feedline"))
        })
    }

    pub fn db_path(&self) -> &Path {
        self.database
            .path
            .as_deref()
            .unwrap_or(Path::new("feedline.db"))
    }

    pub fn images_path(&self) -> &Path {
        self.images.path.as_deref().unwrap_or(Path::new("images"))
    }

    /// URL prefix without surrounding slashes; never empty since the static
    /// mount cannot sit at the root.
    pub fn images_url_prefix(&self) -> &str {
        match self.images.url_prefix.trim_matches('/') {
            "" => "images",
            prefix => prefix,
        }
    }
}
