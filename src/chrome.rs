//! Shared header/footer fragments.
//!
//! Fragments are optional: a missing file just means the page renders
//! without that piece.

use chrono::{Datelike, Utc};
use std::path::PathBuf;
use tracing::debug;

use crate::html::escape_html;

pub const INDUSTRY_MENU_SLOT: &str = "{{industry_menu}}";
pub const MOBILE_INDUSTRY_MENU_SLOT: &str = "{{mobile_industry_menu}}";
pub const YEAR_SLOT: &str = "{{year}}";

#[derive(Debug, Clone)]
pub struct ChromeLoader {
    includes_dir: PathBuf,
}

/// Values substituted into fragment placeholders.
#[derive(Debug, Clone, Copy)]
pub struct ChromeContext<'a> {
    pub industries: &'a [String],
    pub active_industry: Option<&'a str>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chrome {
    pub header: String,
    pub footer: String,
}

impl ChromeLoader {
    pub fn new(site_dir: impl Into<PathBuf>) -> Self {
        Self {
            includes_dir: site_dir.into().join("includes"),
        }
    }

    pub async fn fetch_fragment(&self, name: &str) -> Option<String> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return None;
        }
        let path = self.includes_dir.join(format!("{name}.html"));
        match tokio::fs::read_to_string(&path).await {
            Ok(markup) => Some(markup),
            Err(e) => {
                debug!("Fragment {} not loaded: {}", path.display(), e);
                None
            }
        }
    }

    /// Header and footer are read independently; either may be missing.
    pub async fn load(&self, ctx: ChromeContext<'_>) -> Chrome {
        let (header, footer) = tokio::join!(self.fetch_fragment("header"), self.fetch_fragment("footer"));
        Chrome {
            header: header.map(|h| fill_slots(&h, ctx)).unwrap_or_default(),
            footer: footer.map(|f| fill_slots(&f, ctx)).unwrap_or_default(),
        }
    }
}

pub fn fill_slots(fragment: &str, ctx: ChromeContext<'_>) -> String {
    fragment
        .replace(
            INDUSTRY_MENU_SLOT,
            &industry_menu(ctx.industries, ctx.active_industry),
        )
        .replace(
            MOBILE_INDUSTRY_MENU_SLOT,
            &mobile_industry_menu(ctx.industries, ctx.active_industry),
        )
        .replace(YEAR_SLOT, &Utc::now().year().to_string())
}

/// Desktop dropdown: one link per industry, no catch-all entry.
pub fn industry_menu(industries: &[String], active: Option<&str>) -> String {
    industries
        .iter()
        .map(|ind| industry_link(ind, active == Some(ind.as_str())))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Mobile dropdown: "All Movies" first, then the industries.
pub fn mobile_industry_menu(industries: &[String], active: Option<&str>) -> String {
    let all_class = if active.is_none() { r#" class="active""# } else { "" };
    let mut links = vec![format!(
        r#"<a href="/movies.html" data-industry="all"{all_class}>All Movies</a>"#
    )];
    links.extend(
        industries
            .iter()
            .map(|ind| industry_link(ind, active == Some(ind.as_str()))),
    );
    links.join("\n")
}

fn industry_link(industry: &str, active: bool) -> String {
    format!(
        r#"<a href="/movies.html?industry={enc}" data-industry="{esc}"{class}>{esc}</a>"#,
        enc = urlencoding::encode(industry),
        esc = escape_html(industry),
        class = if active { r#" class="active""# } else { "" },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn industries() -> Vec<String> {
        vec!["Bollywood".to_string(), "South Indian".to_string()]
    }

    #[test]
    fn menus_mark_active_industry() {
        let list = industries();
        let desktop = industry_menu(&list, Some("South Indian"));
        assert!(desktop.contains(
            r#"<a href="/movies.html?industry=South%20Indian" data-industry="South Indian" class="active">South Indian</a>"#
        ));
        assert!(!desktop.contains("All Movies"));

        let mobile = mobile_industry_menu(&list, None);
        assert!(mobile.starts_with(r#"<a href="/movies.html" data-industry="all" class="active">All Movies</a>"#));
    }

    #[tokio::test]
    async fn missing_fragments_render_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ChromeLoader::new(dir.path());
        let list = industries();
        let chrome = loader
            .load(ChromeContext {
                industries: &list,
                active_industry: None,
            })
            .await;
        assert_eq!(chrome, Chrome::default());
    }

    #[tokio::test]
    async fn fragments_have_slots_filled() {
        let dir = tempfile::tempdir().unwrap();
        let includes = dir.path().join("includes");
        std::fs::create_dir_all(&includes).unwrap();
        std::fs::write(includes.join("header.html"), "<nav>{{industry_menu}}</nav>").unwrap();
        std::fs::write(includes.join("footer.html"), "<p>&copy; {{year}}</p>").unwrap();

        let loader = ChromeLoader::new(dir.path());
        let list = industries();
        let chrome = loader
            .load(ChromeContext {
                industries: &list,
                active_industry: Some("Bollywood"),
            })
            .await;
        assert!(chrome.header.contains(r#"data-industry="Bollywood" class="active""#));
        assert!(!chrome.footer.contains(YEAR_SLOT));
    }

    #[tokio::test]
    async fn rejects_path_like_fragment_names() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ChromeLoader::new(dir.path());
        assert!(loader.fetch_fragment("../secret").await.is_none());
    }
}
