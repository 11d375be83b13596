//! Markup helpers shared by every page.

use crate::catalogue::{Title, TitleKind};
use crate::grid::{PageControl, PageView};

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn details_href(id: &str) -> String {
    format!("/movie-details.html?id={}", urlencoding::encode(id))
}

/// Second line of a card: year and runtime for movies, season count otherwise.
pub fn card_meta(item: &Title) -> String {
    let sub = match item.kind {
        TitleKind::Movie => format!(
            "{} • {}",
            item.year.map(|y| y.to_string()).unwrap_or_else(|| "—".into()),
            item.runtime.as_deref().unwrap_or("—")
        ),
        _ => match item.seasons {
            Some(n) if n > 0 => format!("{n} seasons"),
            _ => "Series".to_string(),
        },
    };
    let rating = if item.rating > 0.0 {
        item.rating.to_string()
    } else {
        "—".to_string()
    };
    format!("{sub} • IMDb {rating}")
}

pub fn card(item: &Title) -> String {
    let href = item
        .link
        .clone()
        .unwrap_or_else(|| details_href(&item.id));
    format!(
        r#"<a class="card" href="{href}" data-id="{id}">
  <img loading="lazy" decoding="async" src="{poster}" alt="{title} poster">
  <div class="card-body">
    <div class="card-title">{title}</div>
    <div class="card-meta">{meta}</div>
  </div>
</a>"#,
        href = escape_html(&href),
        id = escape_html(&item.id),
        poster = escape_html(item.poster_or_placeholder()),
        title = escape_html(&item.title),
        meta = escape_html(&card_meta(item)),
    )
}

pub fn cards(items: &[&Title]) -> String {
    items.iter().map(|t| card(t)).collect::<Vec<_>>().join("\n")
}

/// Grid plus its pagination nav. `filters` are the query pairs every page
/// link carries so the filtered state survives paging.
pub fn paginated_grid(view: &PageView<'_>, base_path: &str, filters: &[(&str, String)]) -> String {
    let nav = view
        .controls
        .iter()
        .map(|c| control(c, base_path, filters, &view.container_id))
        .collect::<Vec<_>>()
        .join("");
    format!(
        r#"<section class="grid" id="{id}" data-page="{current}" data-pages="{total}">
{cards}
</section>
<nav class="pagination" id="{id}-pagination" aria-label="Pagination">{nav}</nav>"#,
        id = escape_html(&view.container_id),
        current = view.current,
        total = view.total,
        cards = cards(&view.items),
        nav = nav,
    )
}

pub fn page_href(base_path: &str, filters: &[(&str, String)], page: usize, anchor: &str) -> String {
    let mut query: Vec<String> = filters
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect();
    query.push(format!("page={page}"));
    format!("{}?{}#{}", base_path, query.join("&"), anchor)
}

fn control(c: &PageControl, base_path: &str, filters: &[(&str, String)], anchor: &str) -> String {
    match *c {
        PageControl::Prev { target, disabled } => nav_button(
            "prev",
            "Previous page",
            "‹ Prev",
            disabled,
            &page_href(base_path, filters, target, anchor),
        ),
        PageControl::Next { target, disabled } => nav_button(
            "next",
            "Next page",
            "Next ›",
            disabled,
            &page_href(base_path, filters, target, anchor),
        ),
        PageControl::Page { number, active } => {
            if active {
                format!(r#"<span class="page-btn active" aria-current="page">{number}</span>"#)
            } else {
                format!(
                    r#"<a class="page-btn" href="{}">{number}</a>"#,
                    escape_html(&page_href(base_path, filters, number, anchor))
                )
            }
        }
        PageControl::Ellipsis => r#"<span class="dots">…</span>"#.to_string(),
    }
}

fn nav_button(class: &str, aria: &str, label: &str, disabled: bool, href: &str) -> String {
    if disabled {
        format!(
            r#"<span class="pag-nav {class} disabled" aria-label="{aria}" aria-disabled="true">{label}</span>"#
        )
    } else {
        format!(
            r#"<a class="pag-nav {class}" aria-label="{aria}" href="{}">{label}</a>"#,
            escape_html(href)
        )
    }
}

/// `<option>` list with a leading catch-all entry.
pub fn options(all_label: &str, values: &[String], selected: Option<&str>) -> String {
    let mut out = format!(r#"<option value="all">{}</option>"#, escape_html(all_label));
    for v in values {
        let sel = if selected == Some(v.as_str()) { " selected" } else { "" };
        out.push_str(&format!(
            r#"<option value="{v}"{sel}>{v}</option>"#,
            v = escape_html(v),
            sel = sel
        ));
    }
    out
}

pub struct Document<'a> {
    pub title: &'a str,
    pub head: &'a str,
    pub header: &'a str,
    pub body: &'a str,
    pub footer: &'a str,
}

pub fn document(doc: &Document<'_>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title} - thisTV</title>
  <link rel="stylesheet" href="/assets/styles.css">
{head}
</head>
<body>
  <div id="site-header">{header}</div>
  <main>
{body}
  </main>
  <div id="site-footer">{footer}</div>
</body>
</html>"#,
        title = escape_html(doc.title),
        head = doc.head,
        header = doc.header,
        body = doc.body,
        footer = doc.footer,
    )
}
