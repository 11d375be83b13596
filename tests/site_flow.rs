use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thistv::annotations::note_key;
use thistv::app::{build_router, AppState};
use thistv::catalogue::{Catalogue, CatalogueHandle, CatalogueSource};
use thistv::offline::{AssetFetcher, OfflineCache};
use thistv::storage::{KeyValueStore, MemoryStore};
use tower::util::ServiceExt;

const ORIGIN: &str = "https://thistv.example";

fn sample_catalogue() -> Catalogue {
    let mut items = vec![
        json!({"id": "s1", "title": "Night Shift", "type": "webseries", "genres": ["Crime"], "seasons": 2}),
        json!({"id": "h1", "title": "Harbour Lights", "type": "movie", "genres": ["Drama"], "industry": "Tollywood", "imdb": 8.8}),
        json!({"id": "h2", "title": "Harbour Lights 2", "type": "movie", "genres": ["Drama"], "industry": "Tollywood", "imdb": 7.1}),
    ];
    for i in 0..18 {
        items.push(json!({
            "id": format!("b{i}"),
            "title": format!("Monsoon Tale {i}"),
            "type": "movie",
            "genres": ["Romance"],
            "industry": "Bollywood",
        }));
    }
    Catalogue::from_document(&json!({ "items": items })).unwrap()
}

struct Site {
    _dir: tempfile::TempDir,
    store: Arc<MemoryStore>,
    app: Router,
}

fn site_with(catalogue: CatalogueHandle) -> Site {
    let dir = tempfile::tempdir().unwrap();
    let includes = dir.path().join("includes");
    std::fs::create_dir_all(&includes).unwrap();
    std::fs::write(
        includes.join("header.html"),
        "<nav><div class=\"menu\">{{industry_menu}}</div><div class=\"mobile\">{{mobile_industry_menu}}</div></nav>",
    )
    .unwrap();
    std::fs::write(includes.join("footer.html"), "<footer>&copy; {{year}} thisTV</footer>").unwrap();
    std::fs::create_dir_all(dir.path().join("assets")).unwrap();
    std::fs::write(dir.path().join("assets/styles.css"), "body{margin:0}").unwrap();

    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(catalogue, store.clone(), dir.path(), ORIGIN);
    Site {
        _dir: dir,
        store,
        app: build_router(state),
    }
}

fn site() -> Site {
    site_with(CatalogueHandle::ready(sample_catalogue()))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart(id: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
    let boundary = "thistv-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Disposition: form-data; name=\"id\"\r\n\r\n{id}\r\n").as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"screenshot\"; filename=\"shot\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    Request::builder()
        .method("POST")
        .uri("/movie-details/screenshots")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, HashMap<String, String>, Vec<u8>) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let headers = res
        .headers()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
        .collect();
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap().to_vec();
    (status, headers, body)
}

async fn page(app: &Router, uri: &str) -> (StatusCode, String) {
    let (status, _, body) = send(app, get(uri)).await;
    (status, String::from_utf8(body).unwrap())
}

fn card_count(html: &str) -> usize {
    html.matches("class=\"card\"").count()
}

#[tokio::test]
async fn health_is_ok() {
    let site = site();
    assert_eq!(page(&site.app, "/health").await, (StatusCode::OK, "OK".to_string()));
}

#[tokio::test]
async fn home_is_paged_newest_first_with_chrome() {
    let site = site();
    let (status, html) = page(&site.app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(card_count(&html), 15);
    assert!(html.find("data-id=\"b17\"").unwrap() < html.find("data-id=\"b16\"").unwrap());
    assert!(html.contains("data-industry=\"Bollywood\""));
    assert!(html.contains("All Movies"));
    assert!(!html.contains("{{year}}"));

    let (_, second) = page(&site.app, "/index.html?page=2").await;
    assert_eq!(card_count(&second), 6);
    assert!(second.contains("data-id=\"s1\""));
}

#[tokio::test]
async fn oversized_page_number_lands_on_last_page() {
    let site = site();
    let (status, html) = page(&site.app, "/?page=99999999999999999999999").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(card_count(&html), 6);
    assert!(html.contains("data-id=\"s1\""));
    assert!(!html.contains("data-id=\"b17\""));
}

#[tokio::test]
async fn requests_before_load_see_empty_catalogue() {
    let site = site_with(CatalogueHandle::default());
    let (status, html) = page(&site.app, "/movies.html?page=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(card_count(&html), 0);
    assert_eq!(html.matches("id=\"movies-grid-pagination\"").count(), 1);
    assert_eq!(html.matches("aria-disabled=\"true\"").count(), 2);
}

struct SlowSource {
    released: AtomicBool,
}

#[async_trait::async_trait]
impl CatalogueSource for SlowSource {
    fn describe(&self) -> String {
        "slow".to_string()
    }

    async fn load(&self) -> anyhow::Result<Catalogue> {
        while !self.released.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        Ok(sample_catalogue())
    }
}

#[tokio::test]
async fn catalogue_appears_once_loader_finishes() {
    let handle = CatalogueHandle::default();
    let site = site_with(handle.clone());
    let source = Arc::new(SlowSource {
        released: AtomicBool::new(false),
    });
    let loader = handle.spawn_load(source.clone());

    let (_, before) = page(&site.app, "/featured.html").await;
    assert_eq!(card_count(&before), 0);

    source.released.store(true, Ordering::SeqCst);
    loader.await.unwrap();
    let (_, after) = page(&site.app, "/webseries.html").await;
    assert_eq!(card_count(&after), 1);
    assert!(after.contains("id=\"ws-grid\""));
    assert!(after.contains("id=\"ws-grid-pagination\""));
}

#[tokio::test]
async fn industry_in_url_filters_and_selects() {
    let site = site();
    let (_, html) = page(&site.app, "/movies.html?industry=Tollywood").await;
    assert_eq!(card_count(&html), 2);
    assert!(html.contains("<option value=\"Tollywood\" selected>Tollywood</option>"));
    assert!(html.contains("data-industry=\"Tollywood\" class=\"active\""));
    assert!(!html.contains("data-id=\"s1\""));
}

#[tokio::test]
async fn header_search_is_consumed_by_next_listing() {
    let site = site();
    let (status, headers, _) = send(&site.app, form("/search", "q=harbour")).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(headers.get("location").map(String::as_str), Some("/movies.html"));

    let (_, first) = page(&site.app, "/movies.html").await;
    assert_eq!(card_count(&first), 2);
    assert!(first.contains("value=\"harbour\""));

    let (_, again) = page(&site.app, "/movies.html").await;
    assert_eq!(card_count(&again), 15);
}

#[tokio::test]
async fn top_rated_pages_by_twelve() {
    let site = site();
    let (_, html) = page(&site.app, "/top-imdb.html").await;
    assert_eq!(card_count(&html), 12);
    assert!(html.find("data-id=\"h1\"").unwrap() < html.find("data-id=\"h2\"").unwrap());
}

#[tokio::test]
async fn details_show_related_and_seo() {
    let site = site();
    let (status, html) = page(&site.app, "/movie-details.html?id=h1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("id=\"related-grid\""));
    assert!(html.contains("data-id=\"h2\""));
    assert!(html.contains("https://thistv.example/movie-details.html?id=h1"));
    assert!(html.contains("\"@type\": \"Movie\""));
}

#[tokio::test]
async fn details_hide_related_when_nothing_matches() {
    let site = site();
    let (_, html) = page(&site.app, "/movie-details.html?id=s1").await;
    assert!(!html.contains("related-grid"));
}

#[tokio::test]
async fn details_empty_states() {
    let site = site();
    let (status, html) = page(&site.app, "/movie-details.html").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("No movie selected"));

    let (status, html) = page(&site.app, "/movie-details.html?id=nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(html.contains("Movie not found"));
}

#[tokio::test]
async fn notes_save_and_reset() {
    let site = site();
    let (status, headers, _) = send(
        &site.app,
        form("/movie-details/notes", "id=h1&description=Rewatch+soon"),
    )
    .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(
        headers.get("location").map(String::as_str),
        Some("/movie-details.html?id=h1")
    );
    let (_, html) = page(&site.app, "/movie-details.html?id=h1").await;
    assert!(html.contains("<p id=\"movie-description\">Rewatch soon</p>"));

    let (status, _, _) = send(&site.app, form("/movie-details/reset", "id=h1")).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert!(site.store.get(&note_key("h1")).is_none());
    let (_, html) = page(&site.app, "/movie-details.html?id=h1").await;
    assert!(html.contains("Write your notes here..."));
}

#[tokio::test]
async fn malformed_stored_note_is_ignored() {
    let site = site();
    site.store.set(&note_key("h1"), "not json").unwrap();
    let (status, html) = page(&site.app, "/movie-details.html?id=h1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Write your notes here..."));
}

#[tokio::test]
async fn screenshots_upload_and_serve() {
    let site = site();
    let png = [0x89, b'P', b'N', b'G'];
    let (status, _, _) = send(&site.app, multipart("h1", "image/png", &png)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);

    let (status, headers, body) = send(&site.app, get("/movie-details/screenshots/h1/0")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("content-type").map(String::as_str), Some("image/png"));
    assert_eq!(body, png);

    let (status, _, _) = send(&site.app, get("/movie-details/screenshots/h1/1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(&site.app, multipart("h1", "text/plain", b"hi")).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn sitemap_lists_listing_pages() {
    let site = site();
    let (status, headers, body) = send(&site.app, get("/sitemap.xml")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("content-type").map(String::as_str), Some("application/xml"));
    let xml = String::from_utf8(body).unwrap();
    assert!(xml.contains("<loc>https://thistv.example/</loc>"));
    assert!(xml.contains("<loc>https://thistv.example/top-imdb.html</loc>"));
    assert!(!xml.contains("index.html"));
    assert_eq!(xml.matches("<priority>0.8</priority>").count(), 6);
}

#[tokio::test]
async fn data_endpoint_serves_catalogue_document() {
    let site = site();
    let (status, _, body) = send(&site.app, get("/data/movies.json")).await;
    assert_eq!(status, StatusCode::OK);
    let doc: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(doc["items"].as_array().unwrap().len(), 21);
    assert_eq!(doc["items"][0]["type"], "webseries");
}

#[tokio::test]
async fn assets_served_from_site_dir() {
    let site = site();
    let (status, _, body) = send(&site.app, get("/assets/styles.css")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"body{margin:0}");
}

struct FakeOrigin {
    online: AtomicBool,
}

#[async_trait::async_trait]
impl AssetFetcher for FakeOrigin {
    async fn fetch(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        if !self.online.load(Ordering::SeqCst) {
            anyhow::bail!("offline");
        }
        match path {
            "/assets/logo.svg" => Ok(b"<svg/>".to_vec()),
            "/index.html" => Ok(b"<html>home</html>".to_vec()),
            _ => anyhow::bail!("404 {}", path),
        }
    }
}

#[tokio::test]
async fn assets_through_offline_cache_survive_outage() {
    let site_dir = tempfile::tempdir().unwrap();
    let cache_dir = tempfile::tempdir().unwrap();
    let origin = Arc::new(FakeOrigin {
        online: AtomicBool::new(true),
    });
    let cache = Arc::new(OfflineCache::new(origin.clone(), cache_dir.path()));
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let state = AppState::new(
        CatalogueHandle::ready(sample_catalogue()),
        store,
        site_dir.path(),
        ORIGIN,
    )
    .with_offline(cache);
    let app = build_router(state);

    let (status, headers, body) = send(&app, get("/assets/logo.svg")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("content-type").map(String::as_str), Some("image/svg+xml"));
    assert_eq!(body, b"<svg/>");

    origin.online.store(false, Ordering::SeqCst);
    let (status, _, body) = send(&app, get("/assets/logo.svg")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<svg/>");

    let (status, _, _) = send(&app, get("/assets/missing.js")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn offline_asset_miss_serves_home_document_as_html() {
    let site_dir = tempfile::tempdir().unwrap();
    let cache_dir = tempfile::tempdir().unwrap();
    let origin = Arc::new(FakeOrigin {
        online: AtomicBool::new(true),
    });
    let cache = Arc::new(OfflineCache::new(origin.clone(), cache_dir.path()));
    assert_eq!(cache.install().await, 2);
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let state = AppState::new(
        CatalogueHandle::ready(sample_catalogue()),
        store,
        site_dir.path(),
        ORIGIN,
    )
    .with_offline(cache);
    let app = build_router(state);

    origin.online.store(false, Ordering::SeqCst);
    let (status, headers, body) = send(&app, get("/assets/app.js")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get("content-type").map(String::as_str),
        Some("text/html; charset=utf-8")
    );
    assert_eq!(body, b"<html>home</html>");
}
