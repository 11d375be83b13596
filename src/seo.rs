//! Search-engine metadata: per-title head tags and the site map.

use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::catalogue::{Title, TitleKind};
use crate::html::escape_html;

pub const MAX_DESCRIPTION_CHARS: usize = 155;
const TRUNCATE_AT: usize = 152;

/// Descriptions longer than the limit are cut at the last word boundary within
/// the first 152 characters and suffixed with "...".
pub fn truncate_description(raw: &str) -> String {
    let desc = raw.trim();
    if desc.chars().count() <= MAX_DESCRIPTION_CHARS {
        return desc.to_string();
    }
    let head: String = desc.chars().take(TRUNCATE_AT).collect();
    let cut = match head.rsplit_once(' ') {
        Some((before, _)) => before.to_string(),
        None => head,
    };
    format!("{cut}...")
}

pub fn display_title(item: &Title) -> &str {
    item.seo_title.as_deref().unwrap_or(&item.title)
}

pub fn canonical_url(origin: &str, path: &str) -> String {
    format!(
        "{}/{}",
        origin.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

pub fn meta_tags(item: &Title, page_url: &str) -> String {
    let desc = escape_html(&truncate_description(item.description.as_deref().unwrap_or("")));
    let title = escape_html(display_title(item));
    let image = escape_html(item.poster.as_deref().unwrap_or(""));
    let url = escape_html(page_url);
    [
        format!(r#"<meta name="description" content="{desc}" />"#),
        format!(r#"<link rel="canonical" href="{url}" />"#),
        format!(r#"<meta property="og:title" content="{title}" />"#),
        format!(r#"<meta property="og:description" content="{desc}" />"#),
        format!(r#"<meta property="og:image" content="{image}" />"#),
        format!(r#"<meta property="og:url" content="{url}" />"#),
        r#"<meta property="og:type" content="video.movie" />"#.to_string(),
        r#"<meta name="twitter:card" content="summary_large_image" />"#.to_string(),
        format!(r#"<meta name="twitter:title" content="{title}" />"#),
        format!(r#"<meta name="twitter:description" content="{desc}" />"#),
        format!(r#"<meta name="twitter:image" content="{image}" />"#),
    ]
    .join("\n")
}

pub fn json_ld(item: &Title) -> Value {
    let kind = match item.kind {
        TitleKind::Movie => "Movie",
        _ => "CreativeWork",
    };
    let mut doc = json!({
        "@context": "https://schema.org",
        "@type": kind,
        "name": display_title(item).replace('"', ""),
        "image": item.poster.as_deref().unwrap_or(""),
        "description": item.description.as_deref().unwrap_or(""),
        "datePublished": item.year.map(|y| y.to_string()).unwrap_or_default(),
        "genre": item.genres,
        "duration": item.runtime.as_deref().unwrap_or(""),
    });
    if let Some(trailer) = &item.trailer {
        doc["trailer"] = json!({
            "@type": "VideoObject",
            "name": format!("{} Trailer", item.title),
            "embedUrl": trailer,
        });
    }
    doc
}

/// Head block for a details page. `</` is escaped so catalogue text cannot
/// close the script element.
pub fn head_for(item: &Title, page_url: &str) -> String {
    let ld = serde_json::to_string_pretty(&json_ld(item))
        .unwrap_or_else(|_| "{}".to_string())
        .replace("</", "<\\/");
    format!(
        "{}\n<script type=\"application/ld+json\">\n{}\n</script>",
        meta_tags(item, page_url),
        ld
    )
}

/// `pages` are site-relative paths; `index.html` maps to the bare origin.
pub fn sitemap_xml(origin: &str, pages: &[&str], today: NaiveDate) -> String {
    let base = format!("{}/", origin.trim_end_matches('/'));
    let mut urls: Vec<String> = pages
        .iter()
        .map(|p| {
            let p = p.trim_start_matches('/');
            let p = p.strip_suffix("index.html").unwrap_or(p);
            format!("{base}{p}")
        })
        .collect();
    urls.sort();
    urls.dedup();

    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for url in urls {
        out.push_str(&format!(
            "  <url>\n    <loc>{}</loc>\n    <lastmod>{}</lastmod>\n    <changefreq>weekly</changefreq>\n    <priority>0.8</priority>\n  </url>\n",
            escape_html(&url),
            today.format("%Y-%m-%d")
        ));
    }
    out.push_str("</urlset>");
    out
}
