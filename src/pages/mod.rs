//! Page controllers. Each listing page is a [`PageConfig`]; a request is turned
//! into a [`ViewQuery`], filtered from the full catalogue, ordered and paged by
//! a [`GridRenderer`], and rendered to markup.

pub mod details;

use serde::Deserialize;
use tracing::debug;

use crate::catalogue::{collect_genres, Catalogue, TitleKind};
use crate::filters::{derive_view, normalize_choice, PendingSearch, SortKey, ViewQuery};
use crate::grid::GridRenderer;
use crate::html::{escape_html, options, page_href, paginated_grid};
use crate::storage::KeyValueStore;

/// Which inputs a listing page exposes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Controls {
    pub search: bool,
    pub genre_select: bool,
    pub genre_chips: bool,
    pub sort: bool,
    pub industry: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct PageConfig {
    /// File name the page is published under, e.g. `movies.html`.
    pub slug: &'static str,
    pub path: &'static str,
    pub heading: &'static str,
    pub grid_id: &'static str,
    pub page_size: usize,
    pub kind: Option<TitleKind>,
    pub featured_only: bool,
    /// Overrides any `sort` parameter.
    pub fixed_sort: Option<SortKey>,
    pub controls: Controls,
    pub consumes_pending_search: bool,
}

pub const HOME: PageConfig = PageConfig {
    slug: "index.html",
    path: "/",
    heading: "Latest titles",
    grid_id: "card-grid",
    page_size: 15,
    kind: None,
    featured_only: false,
    fixed_sort: None,
    controls: Controls {
        search: true,
        genre_select: true,
        genre_chips: false,
        sort: true,
        industry: false,
    },
    consumes_pending_search: true,
};

pub const GENRES: PageConfig = PageConfig {
    slug: "genres.html",
    path: "/genres.html",
    heading: "Browse by genre",
    grid_id: "genre-grid",
    page_size: 15,
    kind: None,
    featured_only: false,
    fixed_sort: None,
    controls: Controls {
        search: false,
        genre_select: true,
        genre_chips: true,
        sort: false,
        industry: false,
    },
    consumes_pending_search: false,
};

pub const MOVIES: PageConfig = PageConfig {
    slug: "movies.html",
    path: "/movies.html",
    heading: "Movies",
    grid_id: "movies-grid",
    page_size: 15,
    kind: Some(TitleKind::Movie),
    featured_only: false,
    fixed_sort: None,
    controls: Controls {
        search: true,
        genre_select: true,
        genre_chips: false,
        sort: true,
        industry: true,
    },
    consumes_pending_search: true,
};

pub const WEB_SERIES: PageConfig = PageConfig {
    slug: "webseries.html",
    path: "/webseries.html",
    heading: "Web series",
    grid_id: "ws-grid",
    page_size: 15,
    kind: Some(TitleKind::WebSeries),
    featured_only: false,
    fixed_sort: None,
    controls: Controls {
        search: false,
        genre_select: false,
        genre_chips: false,
        sort: false,
        industry: false,
    },
    consumes_pending_search: false,
};

pub const TOP_RATED: PageConfig = PageConfig {
    slug: "top-imdb.html",
    path: "/top-imdb.html",
    heading: "Top rated on IMDb",
    grid_id: "top-grid",
    page_size: 12,
    kind: None,
    featured_only: false,
    fixed_sort: Some(SortKey::Rating),
    controls: Controls {
        search: false,
        genre_select: false,
        genre_chips: false,
        sort: false,
        industry: false,
    },
    consumes_pending_search: false,
};

pub const FEATURED: PageConfig = PageConfig {
    slug: "featured.html",
    path: "/featured.html",
    heading: "Featured",
    grid_id: "featured-grid",
    page_size: 15,
    kind: None,
    featured_only: true,
    fixed_sort: None,
    controls: Controls {
        search: false,
        genre_select: false,
        genre_chips: false,
        sort: false,
        industry: false,
    },
    consumes_pending_search: false,
};

pub const LISTING_PAGES: [PageConfig; 6] = [HOME, GENRES, MOVIES, WEB_SERIES, TOP_RATED, FEATURED];

/// Query string of any page. Everything is optional and read leniently.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub q: Option<String>,
    pub genre: Option<String>,
    pub sort: Option<String>,
    pub industry: Option<String>,
    pub id: Option<String>,
}

impl PageParams {
    /// Non-numeric or missing page numbers mean page 1. Digit strings too
    /// large for `usize` saturate so they clamp to the last page.
    pub fn page_number(&self) -> usize {
        let raw = self.page.as_deref().map(str::trim).unwrap_or_default();
        match raw.parse::<usize>() {
            Ok(n) => n,
            Err(_) if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) => usize::MAX,
            Err(_) => 1,
        }
    }
}

/// A page body ready to be wrapped in the shared chrome.
#[derive(Debug, Clone, Default)]
pub struct RenderedPage {
    pub title: String,
    pub head: String,
    pub body: String,
    pub active_industry: Option<String>,
}

impl PageConfig {
    fn base_query(&self) -> ViewQuery {
        ViewQuery {
            kind: self.kind,
            featured_only: self.featured_only,
            ..Default::default()
        }
    }

    /// Genre options come from the titles this page can show at all.
    pub fn genre_options(&self, catalogue: &Catalogue) -> Vec<String> {
        collect_genres(derive_view(catalogue, &self.base_query()))
    }
}

pub fn render_listing(
    config: &PageConfig,
    params: &PageParams,
    catalogue: &Catalogue,
    store: &dyn KeyValueStore,
) -> RenderedPage {
    let pending = if config.consumes_pending_search {
        PendingSearch::take(store)
    } else {
        None
    };
    let search = if config.controls.search {
        params
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string)
            .or(pending)
    } else {
        None
    };
    let genre = if config.controls.genre_select || config.controls.genre_chips {
        normalize_choice(params.genre.as_deref())
    } else {
        None
    };
    let industry = if config.controls.industry {
        normalize_choice(params.industry.as_deref())
    } else {
        None
    };
    let sort = config.fixed_sort.unwrap_or_else(|| {
        if config.controls.sort {
            SortKey::parse(params.sort.as_deref())
        } else {
            SortKey::Newest
        }
    });

    let query = ViewQuery {
        search: search.clone(),
        genre: genre.clone(),
        industry: industry.clone(),
        sort,
        ..config.base_query()
    };
    let view = derive_view(catalogue, &query);
    let matched = view.len();
    let mut grid = GridRenderer::new(config.grid_id, view, config.page_size, sort.comparator());
    let page = grid.render_page(params.page_number());

    let mut link_filters: Vec<(&str, String)> = Vec::new();
    if let Some(i) = &industry {
        link_filters.push(("industry", i.clone()));
    }
    if let Some(q) = &search {
        link_filters.push(("q", q.clone()));
    }
    if let Some(g) = &genre {
        link_filters.push(("genre", g.clone()));
    }
    if config.controls.sort && sort != SortKey::Newest {
        link_filters.push(("sort", sort.as_param().to_string()));
    }

    let genres = config.genre_options(catalogue);
    let industries = if config.controls.industry {
        catalogue.industries()
    } else {
        Vec::new()
    };

    let mut body = format!("<h1>{}</h1>\n", escape_html(config.heading));
    body.push_str(&controls_form(
        config,
        search.as_deref(),
        genre.as_deref(),
        industry.as_deref(),
        sort,
        &genres,
        &industries,
    ));
    if config.controls.genre_chips {
        body.push_str(&genre_chips(config, &genres, genre.as_deref()));
    }
    body.push_str(&format!(
        "<p class=\"result-count\">{} titles</p>\n",
        matched
    ));
    body.push_str(&paginated_grid(&page, config.path, &link_filters));

    debug!(
        page = config.slug,
        matched,
        current = page.current,
        total = page.total,
        "rendered listing"
    );

    RenderedPage {
        title: config.heading.to_string(),
        head: String::new(),
        body,
        active_industry: industry,
    }
}

fn controls_form(
    config: &PageConfig,
    search: Option<&str>,
    genre: Option<&str>,
    industry: Option<&str>,
    sort: SortKey,
    genres: &[String],
    industries: &[String],
) -> String {
    let c = config.controls;
    if !(c.search || c.genre_select || c.sort || c.industry) {
        return String::new();
    }
    let mut fields = Vec::new();
    if c.industry {
        fields.push(format!(
            "<select name=\"industry\" id=\"industry-filter\">{}</select>",
            options("All industries", industries, industry)
        ));
    }
    if c.search {
        fields.push(format!(
            "<input type=\"search\" name=\"q\" id=\"search-input\" placeholder=\"Search titles\" value=\"{}\">",
            escape_html(search.unwrap_or(""))
        ));
    }
    if c.genre_select {
        fields.push(format!(
            "<select name=\"genre\" id=\"genre-filter\">{}</select>",
            options("All genres", genres, genre)
        ));
    }
    if c.sort {
        let opts: String = SortKey::ALL
            .iter()
            .map(|k| {
                format!(
                    "<option value=\"{}\"{}>{}</option>",
                    k.as_param(),
                    if *k == sort { " selected" } else { "" },
                    k.label()
                )
            })
            .collect();
        fields.push(format!("<select name=\"sort\" id=\"sort-select\">{opts}</select>"));
    }
    format!(
        "<form class=\"filters\" method=\"get\" action=\"{}\">\n  {}\n  <button type=\"submit\">Apply</button>\n</form>\n",
        config.path,
        fields.join("\n  ")
    )
}

fn genre_chips(config: &PageConfig, genres: &[String], active: Option<&str>) -> String {
    let chip = |label: &str, value: Option<&str>| {
        let filters: Vec<(&str, String)> = value
            .map(|v| vec![("genre", v.to_string())])
            .unwrap_or_default();
        let class = if active == value { "chip active" } else { "chip" };
        format!(
            "<a class=\"{}\" href=\"{}\">{}</a>",
            class,
            escape_html(&page_href(config.path, &filters, 1, config.grid_id)),
            escape_html(label)
        )
    };
    let mut chips = vec![chip("All", None)];
    chips.extend(genres.iter().map(|g| chip(g.as_str(), Some(g.as_str()))));
    format!("<div class=\"genre-chips\">{}</div>\n", chips.join(""))
}
