use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::offline::OfflineCache;

pub const PLACEHOLDER_POSTER: &str = "assets/placeholder.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TitleKind {
    #[serde(rename = "movie")]
    Movie,
    #[serde(rename = "webseries")]
    WebSeries,
    #[serde(rename = "other")]
    Other,
}

impl TitleKind {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "movie" | "film" => Self::Movie,
            "webseries" | "web-series" | "web series" | "series" | "tv" => Self::WebSeries,
            _ => Self::Other,
        }
    }
}

/// One catalogue entry. Read-only once loaded; user notes live in
/// [`crate::annotations`] and never touch this record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: TitleKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seasons: Option<u32>,
    pub genres: Vec<String>,
    #[serde(rename = "imdb")]
    pub rating: f64,
    pub popularity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    pub featured: bool,
    #[serde(rename = "seo-title", skip_serializing_if = "Option::is_none")]
    pub seo_title: Option<String>,
}

impl Title {
    /// Builds a title from one raw catalogue entry. Returns `None` only when the
    /// entry is not an object or has no usable id; every other field falls back
    /// to a neutral default.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let id = obj.get("id").and_then(value_as_string)?;

        let title = obj
            .get("title")
            .or_else(|| obj.get("name"))
            .and_then(value_as_string)
            .unwrap_or_default();
        let kind = obj
            .get("type")
            .and_then(|v| v.as_str())
            .map(TitleKind::parse)
            .unwrap_or(TitleKind::Other);
        let featured_flag = obj.get("featured").and_then(|v| v.as_bool()) == Some(true);
        let featured_label = obj
            .get("recomendation")
            .or_else(|| obj.get("recommendation"))
            .and_then(|v| v.as_str())
            .is_some_and(|s| s.trim().eq_ignore_ascii_case("featured"));

        Some(Self {
            id,
            title,
            kind,
            year: obj
                .get("year")
                .and_then(value_as_f64)
                .map(|y| y as i32),
            runtime: obj.get("runtime").and_then(value_as_string),
            seasons: obj
                .get("seasons")
                .and_then(value_as_f64)
                .filter(|s| *s >= 0.0)
                .map(|s| s as u32),
            genres: obj.get("genres").map(value_as_genres).unwrap_or_default(),
            rating: obj.get("imdb").and_then(value_as_f64).unwrap_or(0.0),
            popularity: obj.get("popularity").and_then(value_as_f64).unwrap_or(0.0),
            poster: obj.get("poster").and_then(value_as_string),
            trailer: obj.get("trailer").and_then(value_as_string),
            link: obj.get("link").and_then(value_as_string),
            description: obj.get("description").and_then(value_as_string),
            industry: obj.get("industry").and_then(value_as_string),
            featured: featured_flag || featured_label,
            seo_title: obj.get("seo-title").and_then(value_as_string),
        })
    }

    pub fn poster_or_placeholder(&self) -> &str {
        self.poster.as_deref().unwrap_or(PLACEHOLDER_POSTER)
    }

    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.iter().any(|g| g == genre)
    }
}

/// The full ordered list of titles, in the order of the source document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalogue {
    items: Vec<Title>,
}

impl Catalogue {
    /// Keeps the first occurrence of every id.
    pub fn new(items: Vec<Title>) -> Self {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(items.len());
        for item in items {
            if seen.insert(item.id.clone()) {
                kept.push(item);
            } else {
                warn!("Duplicate catalogue id '{}', keeping first entry", item.id);
            }
        }
        Self { items: kept }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let doc: Value = serde_json::from_str(text).context("catalogue JSON parse failed")?;
        Self::from_document(&doc)
    }

    /// Accepts `{ "items": [...] }` or a bare array. Entries that cannot be read
    /// are skipped.
    pub fn from_document(doc: &Value) -> Result<Self> {
        let raw_items = match doc {
            Value::Array(items) => items,
            Value::Object(obj) => obj
                .get("items")
                .and_then(|v| v.as_array())
                .ok_or_else(|| anyhow!("catalogue document has no `items` array"))?,
            _ => return Err(anyhow!("catalogue document is neither an object nor an array")),
        };

        let mut items = Vec::with_capacity(raw_items.len());
        for (idx, raw) in raw_items.iter().enumerate() {
            match Title::from_value(raw) {
                Some(title) => items.push(title),
                None => warn!("Skipping unreadable catalogue entry #{}", idx),
            }
        }
        Ok(Self::new(items))
    }

    pub fn to_document(&self) -> Value {
        json!({ "items": self.items })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Title> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&Title> {
        let id = id.trim();
        self.items.iter().find(|t| t.id == id)
    }

    pub fn genres(&self) -> Vec<String> {
        collect_genres(self.items.iter())
    }

    pub fn industries(&self) -> Vec<String> {
        self.items
            .iter()
            .filter_map(|t| t.industry.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Distinct genre labels across `titles`, sorted.
pub fn collect_genres<'a>(titles: impl IntoIterator<Item = &'a Title>) -> Vec<String> {
    let mut set = BTreeSet::new();
    for t in titles {
        for g in t.genres.iter().filter(|g| !g.is_empty()) {
            set.insert(g.clone());
        }
    }
    set.into_iter().collect()
}

#[async_trait]
pub trait CatalogueSource: Send + Sync {
    fn describe(&self) -> String;
    async fn load(&self) -> Result<Catalogue>;
}

/// Reads the catalogue document from the local site directory.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CatalogueSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn load(&self) -> Result<Catalogue> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading {}", self.path.display()))?;
        Catalogue::from_json(&text)
    }
}

/// Fetches the catalogue through the offline cache (network first, cached
/// copy when the upstream is unreachable).
pub struct CachedRemoteSource {
    cache: Arc<OfflineCache>,
}

impl CachedRemoteSource {
    pub fn new(cache: Arc<OfflineCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl CatalogueSource for CachedRemoteSource {
    fn describe(&self) -> String {
        format!("remote {}", self.cache.data_path())
    }

    async fn load(&self) -> Result<Catalogue> {
        let asset = self.cache.fetch(self.cache.data_path()).await?;
        let text = String::from_utf8(asset.bytes).context("catalogue is not valid UTF-8")?;
        Catalogue::from_json(&text)
    }
}

/// Any failure yields an empty catalogue.
pub async fn load_catalogue(source: &dyn CatalogueSource) -> Catalogue {
    match source.load().await {
        Ok(catalogue) => {
            info!(
                "Loaded {} titles from {}",
                catalogue.len(),
                source.describe()
            );
            catalogue
        }
        Err(e) => {
            error!(
                "Could not load catalogue from {}: {:#}",
                source.describe(),
                e
            );
            Catalogue::default()
        }
    }
}

/// Shared slot holding the loaded catalogue. Readers take an immutable
/// snapshot; before the loader finishes the snapshot is empty.
#[derive(Clone, Default)]
pub struct CatalogueHandle {
    current: Arc<RwLock<Arc<Catalogue>>>,
}

impl CatalogueHandle {
    pub fn ready(catalogue: Catalogue) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(catalogue))),
        }
    }

    pub async fn snapshot(&self) -> Arc<Catalogue> {
        self.current.read().await.clone()
    }

    pub async fn replace(&self, catalogue: Catalogue) {
        *self.current.write().await = Arc::new(catalogue);
    }

    pub fn spawn_load(&self, source: Arc<dyn CatalogueSource>) -> JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            let catalogue = load_catalogue(source.as_ref()).await;
            handle.replace(catalogue).await;
        })
    }
}

fn value_as_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_as_f64(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

fn value_as_genres(v: &Value) -> Vec<String> {
    let raw: Vec<String> = match v {
        Value::Array(list) => list.iter().filter_map(value_as_string).collect(),
        Value::String(s) => s
            .split(',')
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect(),
        _ => Vec::new(),
    };
    let mut seen = HashSet::new();
    raw.into_iter().filter(|g| seen.insert(g.clone())).collect()
}
