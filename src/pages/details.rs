use axum::http::StatusCode;
use tracing::debug;

use super::RenderedPage;
use crate::annotations::{description_for, Annotation};
use crate::catalogue::{Catalogue, Title};
use crate::html::{cards, details_href, escape_html};
use crate::related::{related_titles, RelatedQuery};
use crate::seo::{canonical_url, display_title, head_for};

pub const RELATED_GRID_ID: &str = "related-grid";

pub fn render_details(
    id: Option<&str>,
    catalogue: &Catalogue,
    annotation: Option<&Annotation>,
    site_origin: &str,
) -> (StatusCode, RenderedPage) {
    let id = match id.map(str::trim).filter(|s| !s.is_empty()) {
        Some(id) => id,
        None => {
            return (
                StatusCode::OK,
                message_page("No movie selected", "Pick a title from any listing to see its details."),
            )
        }
    };
    let item = match catalogue.find(id) {
        Some(item) => item,
        None => {
            debug!("Details requested for unknown id '{}'", id);
            return (
                StatusCode::NOT_FOUND,
                message_page("Movie not found", "This title is not in the catalogue."),
            );
        }
    };

    let page_url = canonical_url(site_origin, &details_href(&item.id));
    let mut body = summary(item, annotation);
    body.push_str(&notes_section(item, annotation));
    if let Some(related) = related_titles(&RelatedQuery::for_title(item), catalogue) {
        body.push_str(&format!(
            "<section class=\"related\">\n<h2>You may also like</h2>\n<div class=\"grid\" id=\"{}\">\n{}\n</div>\n</section>\n",
            RELATED_GRID_ID,
            cards(&related)
        ));
    }

    (
        StatusCode::OK,
        RenderedPage {
            title: display_title(item).to_string(),
            head: head_for(item, &page_url),
            body,
            active_industry: item.industry.clone(),
        },
    )
}

fn message_page(heading: &str, text: &str) -> RenderedPage {
    RenderedPage {
        title: heading.to_string(),
        head: String::new(),
        body: format!(
            "<section class=\"details-empty\">\n<h1>{}</h1>\n<p>{}</p>\n</section>\n",
            escape_html(heading),
            escape_html(text)
        ),
        active_industry: None,
    }
}

fn summary(item: &Title, annotation: Option<&Annotation>) -> String {
    let genres = if item.genres.is_empty() {
        String::new()
    } else {
        format!(
            "<p class=\"genres\">{}</p>\n",
            escape_html(&item.genres.join(", "))
        )
    };
    let trailer = item
        .trailer
        .as_deref()
        .map(|t| format!("<a class=\"trailer\" href=\"{}\">Watch trailer</a>\n", escape_html(t)))
        .unwrap_or_default();
    format!(
        "<article class=\"details\" data-id=\"{id}\">\n<img class=\"poster\" src=\"{poster}\" alt=\"{title} poster\">\n<h1 id=\"movie-title\">{heading}</h1>\n<p class=\"meta\" id=\"movie-meta\">{meta}</p>\n{genres}<p id=\"movie-description\">{desc}</p>\n{trailer}</article>\n",
        id = escape_html(&item.id),
        poster = escape_html(item.poster_or_placeholder()),
        title = escape_html(&item.title),
        heading = escape_html(&heading(item)),
        meta = escape_html(&meta_line(item)),
        genres = genres,
        desc = escape_html(description_for(item, annotation)),
        trailer = trailer,
    )
}

fn heading(item: &Title) -> String {
    match item.year {
        Some(year) => format!("{} ({})", item.title, year),
        None => item.title.clone(),
    }
}

/// Runtime and rating; absent parts are left out.
fn meta_line(item: &Title) -> String {
    let runtime = item
        .runtime
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);
    let rating = (item.rating > 0.0).then(|| format!("IMDb {}", item.rating));
    [runtime, rating].into_iter().flatten().collect::<Vec<_>>().join(" • ")
}

fn notes_section(item: &Title, annotation: Option<&Annotation>) -> String {
    let id = escape_html(&item.id);
    let enc = urlencoding::encode(&item.id);
    let shots: String = annotation
        .map(|a| a.screenshots.len())
        .map(|n| {
            (0..n)
                .map(|i| {
                    format!(
                        "<img class=\"screenshot\" src=\"/movie-details/screenshots/{enc}/{i}\" alt=\"Screenshot {}\">",
                        i + 1
                    )
                })
                .collect()
        })
        .unwrap_or_default();
    format!(
        r#"<section class="notes">
<h2>Your notes</h2>
<form method="post" action="/movie-details/notes">
  <input type="hidden" name="id" value="{id}">
  <textarea name="description" rows="6">{desc}</textarea>
  <button type="submit">Save</button>
</form>
<div class="screenshots">{shots}</div>
<form method="post" action="/movie-details/screenshots" enctype="multipart/form-data">
  <input type="hidden" name="id" value="{id}">
  <input type="file" name="screenshot" accept="image/*">
  <button type="submit">Upload screenshot</button>
</form>
<form method="post" action="/movie-details/reset">
  <input type="hidden" name="id" value="{id}">
  <button type="submit">Reset</button>
</form>
</section>
"#,
        id = id,
        desc = escape_html(description_for(item, annotation)),
        shots = shots,
    )
}
