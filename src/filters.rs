use std::cmp::Ordering;
use tracing::warn;

use crate::catalogue::{Catalogue, Title, TitleKind};
use crate::grid::Comparator;
use crate::storage::KeyValueStore;

/// Storage slot carrying the header search term to the next page.
pub const PENDING_SEARCH_KEY: &str = "thisTV_q";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Reverse insertion order.
    #[default]
    Newest,
    Rating,
    Popularity,
    Year,
}

impl SortKey {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("rating") => Self::Rating,
            Some("popular") | Some("popularity") => Self::Popularity,
            Some("year") => Self::Year,
            _ => Self::Newest,
        }
    }

    pub fn as_param(&self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Rating => "rating",
            Self::Popularity => "popular",
            Self::Year => "year",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Newest => "Newest",
            Self::Rating => "IMDb rating",
            Self::Popularity => "Popularity",
            Self::Year => "Release year",
        }
    }

    pub const ALL: [SortKey; 4] = [Self::Newest, Self::Rating, Self::Popularity, Self::Year];

    /// `None` leaves ordering to the grid's newest-first default.
    pub fn comparator(&self) -> Option<Comparator> {
        match self {
            Self::Newest => None,
            Self::Rating => Some(by_rating),
            Self::Popularity => Some(by_popularity),
            Self::Year => Some(by_year),
        }
    }
}

pub fn by_rating(a: &Title, b: &Title) -> Ordering {
    b.rating.partial_cmp(&a.rating).unwrap_or(Ordering::Equal)
}

pub fn by_popularity(a: &Title, b: &Title) -> Ordering {
    b.popularity
        .partial_cmp(&a.popularity)
        .unwrap_or(Ordering::Equal)
}

pub fn by_year(a: &Title, b: &Title) -> Ordering {
    b.year.unwrap_or(0).cmp(&a.year.unwrap_or(0))
}

/// Everything that shapes one derived view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewQuery {
    pub kind: Option<TitleKind>,
    pub featured_only: bool,
    pub search: Option<String>,
    pub genre: Option<String>,
    pub industry: Option<String>,
    pub sort: SortKey,
}

/// Trims a control value; empty and `all` mean "no filter".
pub fn normalize_choice(raw: Option<&str>) -> Option<String> {
    let value = raw?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("all") {
        None
    } else {
        Some(value.to_string())
    }
}

/// Filters the full catalogue from scratch. Ordering is left to the renderer
/// via [`SortKey::comparator`].
pub fn derive_view<'a>(catalogue: &'a Catalogue, query: &ViewQuery) -> Vec<&'a Title> {
    let needle = query
        .search
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());
    let genre = normalize_choice(query.genre.as_deref());
    let industry = normalize_choice(query.industry.as_deref());

    catalogue
        .iter()
        .filter(|t| query.kind.map_or(true, |k| t.kind == k))
        .filter(|t| !query.featured_only || t.featured)
        .filter(|t| industry.as_deref().map_or(true, |i| t.industry.as_deref() == Some(i)))
        .filter(|t| {
            needle
                .as_deref()
                .map_or(true, |q| t.title.to_lowercase().contains(q))
        })
        .filter(|t| genre.as_deref().map_or(true, |g| t.has_genre(g)))
        .collect()
}

/// The single shared slot for a search typed in the page header.
pub struct PendingSearch;

impl PendingSearch {
    pub fn stash(store: &dyn KeyValueStore, term: &str) {
        if let Err(e) = store.set(PENDING_SEARCH_KEY, term.trim()) {
            warn!("Could not store pending search: {:#}", e);
        }
    }

    /// Consumes the stored term; later reads see nothing.
    pub fn take(store: &dyn KeyValueStore) -> Option<String> {
        match store.take(PENDING_SEARCH_KEY) {
            Ok(term) => term.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                warn!("Could not clear pending search: {:#}", e);
                None
            }
        }
    }
}
