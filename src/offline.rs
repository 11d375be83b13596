use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Bump to start from an empty cache.
pub const CACHE_NAME: &str = "thisTV-v1";
pub const HOME_DOCUMENT: &str = "/index.html";
pub const DEFAULT_DATA_PATH: &str = "/data/movies.json";

/// Pre-populated on install.
pub const CORE_ASSETS: &[&str] = &[
    "/",
    "/index.html",
    "/assets/styles.min.css",
    "/assets/styles.css",
    "/assets/scripts.js",
    "/assets/logo.svg",
    "/data/movies.json",
];

#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    origin: String,
}

impl HttpFetcher {
    pub fn new(origin: &str) -> Self {
        Self {
            client: Client::new(),
            origin: origin.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let url = format!("{}{}", self.origin, path);
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;
        let status = res.status();
        if !status.is_success() {
            return Err(anyhow!("{} -> {}", url, status));
        }
        let body = res.bytes().await.context("reading body failed")?;
        Ok(body.to_vec())
    }
}

/// Bytes served by [`OfflineCache::fetch`], with the path they were stored
/// under. That path differs from the request when the home document stands in
/// for an unreachable asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAsset {
    pub path: String,
    pub bytes: Vec<u8>,
}

impl CachedAsset {
    fn new(path: &str, bytes: Vec<u8>) -> Self {
        Self {
            path: path.to_string(),
            bytes,
        }
    }

    pub fn content_type(&self) -> &'static str {
        content_type_for(&self.path)
    }
}

/// Disk-backed asset cache in front of an upstream origin. The catalogue
/// document is fetched network-first; everything else cache-first.
pub struct OfflineCache {
    fetcher: Arc<dyn AssetFetcher>,
    dir: PathBuf,
    data_path: String,
}

impl OfflineCache {
    pub fn new(fetcher: Arc<dyn AssetFetcher>, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            dir: cache_root.into().join(CACHE_NAME),
            data_path: DEFAULT_DATA_PATH.to_string(),
        }
    }

    pub fn with_data_path(mut self, data_path: &str) -> Self {
        self.data_path = format!("/{}", data_path.trim_start_matches('/'));
        self
    }

    pub fn data_path(&self) -> &str {
        &self.data_path
    }

    /// Returns how many core assets were stored. Individual failures are logged
    /// and skipped.
    pub async fn install(&self) -> usize {
        let mut stored = 0;
        let mut assets: Vec<&str> = CORE_ASSETS.to_vec();
        if !assets.contains(&self.data_path.as_str()) {
            assets.push(self.data_path.as_str());
        }
        for path in assets {
            match self.fetcher.fetch(path).await {
                Ok(bytes) => match self.store(path, &bytes).await {
                    Ok(()) => stored += 1,
                    Err(e) => warn!("Could not cache {}: {:#}", path, e),
                },
                Err(e) => warn!("Could not pre-cache {}: {:#}", path, e),
            }
        }
        info!("Offline cache installed ({} assets)", stored);
        stored
    }

    pub async fn fetch(&self, path: &str) -> Result<CachedAsset> {
        if path.ends_with(&self.data_path) {
            self.network_first(path).await
        } else {
            self.cache_first(path).await
        }
    }

    pub async fn cached(&self, path: &str) -> Option<Vec<u8>> {
        tokio::fs::read(self.entry_path(path)).await.ok()
    }

    async fn network_first(&self, path: &str) -> Result<CachedAsset> {
        match self.fetcher.fetch(path).await {
            Ok(bytes) => {
                if let Err(e) = self.store(path, &bytes).await {
                    warn!("Could not refresh cached {}: {:#}", path, e);
                }
                Ok(CachedAsset::new(path, bytes))
            }
            Err(e) => {
                debug!("Network fetch of {} failed ({:#}); trying cache", path, e);
                self.cached(path)
                    .await
                    .map(|bytes| CachedAsset::new(path, bytes))
                    .ok_or_else(|| anyhow!("{} unavailable online and not cached", path))
            }
        }
    }

    async fn cache_first(&self, path: &str) -> Result<CachedAsset> {
        if let Some(bytes) = self.cached(path).await {
            return Ok(CachedAsset::new(path, bytes));
        }
        match self.fetcher.fetch(path).await {
            Ok(bytes) => {
                if let Err(e) = self.store(path, &bytes).await {
                    warn!("Could not cache {}: {:#}", path, e);
                }
                Ok(CachedAsset::new(path, bytes))
            }
            Err(e) => {
                debug!("Network fetch of {} failed ({:#}); falling back to home", path, e);
                self.cached(HOME_DOCUMENT)
                    .await
                    .map(|bytes| CachedAsset::new(HOME_DOCUMENT, bytes))
                    .ok_or_else(|| anyhow!("{} unavailable and no cached home document", path))
            }
        }
    }

    /// Written to a sibling temp file and renamed, so a torn write never
    /// becomes a cache entry.
    async fn store(&self, path: &str, bytes: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let target = self.entry_path(path);
        let tmp = target.with_extension("tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &target)
            .await
            .with_context(|| format!("replacing {}", target.display()))
    }

    fn entry_path(&self, path: &str) -> PathBuf {
        let digest = Sha256::digest(path.as_bytes());
        self.dir.join(hex::encode(digest))
    }
}

/// Content type for a served asset, by extension.
pub fn content_type_for(path: &str) -> &'static str {
    let ext = path
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("html") | None => "text/html; charset=utf-8",
        Some(_) => "application/octet-stream",
    }
}
