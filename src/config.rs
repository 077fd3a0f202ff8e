use dotenv::dotenv;
use log::{info, warn};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::db::{Result, ResultExt};

const DEFAULT_POOL_SIZE: u32 = 10;
const DEFAULT_UPLOAD_DIR: &str = "upload";

/// Settings that live outside Rocket's own configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub pool_size: u32,
    pub upload_dir: PathBuf,
}

impl AppConfig {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<AppConfig> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").chain_err(|| "DATABASE_URL must be set")?;
        let pool_size = match env::var("DATABASE_POOL_SIZE") {
            Ok(value) => value
                .parse::<u32>()
                .chain_err(|| format!("invalid DATABASE_POOL_SIZE: {}", value))?,
            Err(_) => {
                info!("DATABASE_POOL_SIZE not set, using default: {}", DEFAULT_POOL_SIZE);
                DEFAULT_POOL_SIZE
            }
        };
        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                info!("UPLOAD_DIR not set, using default: {}", DEFAULT_UPLOAD_DIR);
                PathBuf::from(DEFAULT_UPLOAD_DIR)
            });

        if !upload_dir.is_dir() {
            warn!("creating upload directory {}", upload_dir.display());
            fs::create_dir_all(&upload_dir)?;
        }

        Ok(AppConfig {
            database_url,
            pool_size,
            upload_dir,
        })
    }
}
