use crate::annotations::{AnnotationStore, Screenshot};
use crate::catalogue::{CachedRemoteSource, Catalogue, CatalogueHandle, CatalogueSource, FileSource};
use crate::chrome::{ChromeContext, ChromeLoader};
use crate::config::AppConfig;
use crate::filters::PendingSearch;
use crate::html::{details_href, document, Document};
use crate::offline::{AssetFetcher, HttpFetcher, OfflineCache};
use crate::pages::details::render_details;
use crate::pages::{self, PageConfig, PageParams, RenderedPage, LISTING_PAGES};
use crate::seo::sitemap_xml;
use crate::storage::{JsonFileStore, KeyValueStore};
use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post, MethodRouter},
    Form, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::{path::PathBuf, sync::Arc};
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer};
use tracing::{debug, error, info, warn};

const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024; // screenshot uploads

#[derive(Clone)]
pub struct AppState {
    pub catalogue: CatalogueHandle,
    pub store: Arc<dyn KeyValueStore>,
    pub annotations: AnnotationStore,
    pub chrome: Arc<ChromeLoader>,
    /// Set when assets and data come from an upstream origin.
    pub offline: Option<Arc<OfflineCache>>,
    pub site_dir: PathBuf,
    pub site_origin: String,
}

impl AppState {
    pub fn new(
        catalogue: CatalogueHandle,
        store: Arc<dyn KeyValueStore>,
        site_dir: impl Into<PathBuf>,
        site_origin: &str,
    ) -> Self {
        let site_dir = site_dir.into();
        Self {
            catalogue,
            annotations: AnnotationStore::new(store.clone()),
            store,
            chrome: Arc::new(ChromeLoader::new(&site_dir)),
            offline: None,
            site_dir,
            site_origin: site_origin.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_offline(mut self, cache: Arc<OfflineCache>) -> Self {
        self.offline = Some(cache);
        self
    }
}

pub async fn run_server(config: AppConfig) -> Result<()> {
    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open(&config.storage_file)?);

    let offline = config.remote_origin.as_deref().map(|origin| {
        let fetcher: Arc<dyn AssetFetcher> = Arc::new(HttpFetcher::new(origin));
        Arc::new(OfflineCache::new(fetcher, &config.cache_dir).with_data_path(&config.data_file))
    });
    let source: Arc<dyn CatalogueSource> = match &offline {
        Some(cache) => Arc::new(CachedRemoteSource::new(cache.clone())),
        None => Arc::new(FileSource::new(config.data_path())),
    };

    let catalogue = CatalogueHandle::default();
    catalogue.spawn_load(source);

    let mut state = AppState::new(catalogue, store, &config.site_dir, &config.site_origin);
    if let Some(cache) = offline {
        let installer = cache.clone();
        tokio::spawn(async move {
            installer.install().await;
        });
        state = state.with_offline(cache);
    }

    let app = build_router(state);

    info!("Listening on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", listing(&pages::HOME))
        .route("/index.html", listing(&pages::HOME))
        .route("/genres.html", listing(&pages::GENRES))
        .route("/movies.html", listing(&pages::MOVIES))
        .route("/webseries.html", listing(&pages::WEB_SERIES))
        .route("/top-imdb.html", listing(&pages::TOP_RATED))
        .route("/featured.html", listing(&pages::FEATURED))
        .route("/movie-details.html", get(movie_details))
        .route("/search", post(stash_search))
        .route("/movie-details/notes", post(save_notes))
        .route("/movie-details/screenshots", post(upload_screenshot))
        .route("/movie-details/screenshots/:id/:index", get(screenshot))
        .route("/movie-details/reset", post(reset_notes))
        .route("/sitemap.xml", get(sitemap))
        .route("/data/movies.json", get(catalogue_json))
        .route("/health", get(health));

    router = match &state.offline {
        Some(_) => router.route("/assets/*path", get(cached_asset)),
        None => router.nest_service("/assets", ServeDir::new(state.site_dir.join("assets"))),
    };

    router
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn listing(config: &'static PageConfig) -> MethodRouter<AppState> {
    get(
        move |State(state): State<AppState>, Query(params): Query<PageParams>| async move {
            let catalogue = state.catalogue.snapshot().await;
            let page = pages::render_listing(config, &params, &catalogue, state.store.as_ref());
            Html(wrap_page(&state, &catalogue, page).await)
        },
    )
}

async fn wrap_page(state: &AppState, catalogue: &Catalogue, page: RenderedPage) -> String {
    let industries = catalogue.industries();
    let chrome = state
        .chrome
        .load(ChromeContext {
            industries: &industries,
            active_industry: page.active_industry.as_deref(),
        })
        .await;
    document(&Document {
        title: &page.title,
        head: &page.head,
        header: &chrome.header,
        body: &page.body,
        footer: &chrome.footer,
    })
}

async fn health() -> &'static str {
    "OK"
}

async fn movie_details(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Response {
    let catalogue = state.catalogue.snapshot().await;
    let annotation = params
        .id
        .as_deref()
        .and_then(|id| state.annotations.load(id.trim()));
    let (status, page) = render_details(
        params.id.as_deref(),
        &catalogue,
        annotation.as_ref(),
        &state.site_origin,
    );
    (status, Html(wrap_page(&state, &catalogue, page).await)).into_response()
}

#[derive(Debug, Deserialize)]
struct SearchForm {
    #[serde(default)]
    q: String,
}

async fn stash_search(State(state): State<AppState>, Form(form): Form<SearchForm>) -> Redirect {
    if !form.q.trim().is_empty() {
        PendingSearch::stash(state.store.as_ref(), &form.q);
    }
    Redirect::to(pages::MOVIES.path)
}

#[derive(Debug, Deserialize)]
struct NoteForm {
    id: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct IdForm {
    id: String,
}

async fn save_notes(State(state): State<AppState>, Form(form): Form<NoteForm>) -> Response {
    let id = form.id.trim();
    if id.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing title id").into_response();
    }
    match state.annotations.save_description(id, &form.description) {
        Ok(_) => {
            info!("Saved notes for '{}'", id);
            Redirect::to(&details_href(id)).into_response()
        }
        Err(e) => {
            error!("Failed to save notes for '{}': {:#}", id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Could not save notes").into_response()
        }
    }
}

async fn reset_notes(State(state): State<AppState>, Form(form): Form<IdForm>) -> Response {
    let id = form.id.trim();
    if id.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing title id").into_response();
    }
    match state.annotations.reset(id) {
        Ok(()) => Redirect::to(&details_href(id)).into_response(),
        Err(e) => {
            error!("Failed to reset notes for '{}': {:#}", id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Could not reset notes").into_response()
        }
    }
}

async fn upload_screenshot(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut id: Option<String> = None;
    let mut upload: Option<(String, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("Rejecting upload: malformed multipart body: {}", e);
                return (StatusCode::BAD_REQUEST, "Malformed upload").into_response();
            }
        };
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("id") => match field.text().await {
                Ok(text) => id = Some(text.trim().to_string()),
                Err(e) => {
                    warn!("Rejecting upload: unreadable id field: {}", e);
                    return (StatusCode::BAD_REQUEST, "Malformed upload").into_response();
                }
            },
            Some("screenshot") => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => upload = Some((content_type, bytes.to_vec())),
                    Err(e) => {
                        warn!("Rejecting upload: unreadable file field: {}", e);
                        return (StatusCode::BAD_REQUEST, "Malformed upload").into_response();
                    }
                }
            }
            other => debug!("Ignoring upload field {:?}", other),
        }
    }

    let (id, (content_type, bytes)) = match (id.filter(|i| !i.is_empty()), upload) {
        (Some(id), Some(upload)) => (id, upload),
        _ => return (StatusCode::BAD_REQUEST, "Missing title id or file").into_response(),
    };
    let shot = match Screenshot::from_bytes(&content_type, &bytes) {
        Ok(shot) => shot,
        Err(e) => {
            warn!("Rejecting screenshot for '{}': {:#}", id, e);
            return (StatusCode::UNSUPPORTED_MEDIA_TYPE, "Screenshots must be images").into_response();
        }
    };
    match state.annotations.add_screenshot(&id, shot) {
        Ok(annotation) => {
            info!(
                "Stored screenshot {} for '{}'",
                annotation.screenshots.len(),
                id
            );
            Redirect::to(&details_href(&id)).into_response()
        }
        Err(e) => {
            error!("Failed to store screenshot for '{}': {:#}", id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Could not store screenshot").into_response()
        }
    }
}

async fn screenshot(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, usize)>,
) -> Response {
    let shot = match state.annotations.screenshot(&id, index) {
        Some(shot) => shot,
        None => return StatusCode::NOT_FOUND.into_response(),
    };
    match shot.bytes() {
        Ok(bytes) => ([(header::CONTENT_TYPE, shot.content_type)], bytes).into_response(),
        Err(e) => {
            warn!("Stored screenshot {} for '{}' is corrupt: {:#}", index, id, e);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

async fn sitemap(State(state): State<AppState>) -> impl IntoResponse {
    let slugs: Vec<&str> = LISTING_PAGES.iter().map(|p| p.slug).collect();
    let xml = sitemap_xml(&state.site_origin, &slugs, Utc::now().date_naive());
    ([(header::CONTENT_TYPE, "application/xml")], xml)
}

async fn catalogue_json(State(state): State<AppState>) -> impl IntoResponse {
    let catalogue = state.catalogue.snapshot().await;
    Json(catalogue.to_document())
}

async fn cached_asset(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    let Some(cache) = state.offline.as_ref() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let full = format!("/assets/{}", path.trim_start_matches('/'));
    match cache.fetch(&full).await {
        Ok(asset) => ([(header::CONTENT_TYPE, asset.content_type())], asset.bytes).into_response(),
        Err(e) => {
            debug!("Asset {} unavailable: {:#}", full, e);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
