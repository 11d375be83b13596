use anyhow::{bail, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

pub const DEFAULT_BIND: &str = "0.0.0.0:3146";
pub const DEFAULT_SITE_ORIGIN: &str = "http://localhost:3146";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub site_dir: PathBuf,
    /// Catalogue document, relative to `site_dir`.
    pub data_file: String,
    pub remote_origin: Option<String>,
    pub cache_dir: PathBuf,
    pub storage_file: PathBuf,
    pub site_origin: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_raw = get("THISTV_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind: SocketAddr = match bind_raw.parse() {
            Ok(addr) => addr,
            Err(e) => bail!("THISTV_BIND '{}' is not a socket address: {}", bind_raw, e),
        };

        let data_file = get("THISTV_DATA_FILE")
            .unwrap_or_else(|| "data/movies.json".to_string())
            .trim_start_matches('/')
            .to_string();

        let config = Self {
            bind,
            site_dir: get("THISTV_SITE_DIR").unwrap_or_else(|| "site".into()).into(),
            data_file,
            remote_origin: get("THISTV_REMOTE_ORIGIN").map(|o| o.trim_end_matches('/').to_string()),
            cache_dir: get("THISTV_CACHE_DIR").unwrap_or_else(|| "cache".into()).into(),
            storage_file: get("THISTV_STORAGE_FILE")
                .unwrap_or_else(|| "storage/local.json".into())
                .into(),
            site_origin: get("THISTV_SITE_ORIGIN")
                .unwrap_or_else(|| DEFAULT_SITE_ORIGIN.to_string())
                .trim_end_matches('/')
                .to_string(),
        };
        match &config.remote_origin {
            Some(origin) => info!("Catalogue and assets come from {} via the offline cache", origin),
            None => info!("Serving catalogue and assets from {}", config.site_dir.display()),
        }
        Ok(config)
    }

    pub fn data_path(&self) -> PathBuf {
        self.site_dir.join(&self.data_file)
    }
}
