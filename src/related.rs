use std::collections::HashSet;

use crate::catalogue::{Catalogue, Title};
use crate::filters::{by_popularity, by_rating};

/// Jaccard similarity at or above this marks the same work listed twice.
pub const NEAR_DUPLICATE_THRESHOLD: f64 = 0.80;
/// Added when one title contains the other (sequels, spin-offs).
pub const TITLE_BONUS: u32 = 100;
pub const MAX_RELATED: usize = 5;

/// The title a related list is computed for.
#[derive(Debug, Clone, Copy)]
pub struct RelatedQuery<'a> {
    pub id: Option<&'a str>,
    pub title: &'a str,
    pub genres: &'a [String],
}

impl<'a> RelatedQuery<'a> {
    /// Uses the SEO title when one is set.
    pub fn for_title(title: &'a Title) -> Self {
        Self {
            id: Some(title.id.as_str()),
            title: title.seo_title.as_deref().unwrap_or(&title.title),
            genres: &title.genres,
        }
    }
}

/// Lowercases and strips everything that varies between listings of the same
/// work: parentheticals, `|`/`-` suffixes, punctuation, release years and
/// video-quality tags.
pub fn normalize_title(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let without_parens = strip_parentheticals(&lower);
    let head = without_parens.split('|').next().unwrap_or_default();
    let head = head.split('-').next().unwrap_or_default();
    let cleaned: String = head
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|token| !is_release_year(token) && !is_quality_tag(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Token-set Jaccard similarity; 0 when either side is empty.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let left: HashSet<&str> = a.split_whitespace().collect();
    let right: HashSet<&str> = b.split_whitespace().collect();
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let shared = left.intersection(&right).count();
    shared as f64 / (left.len() + right.len() - shared) as f64
}

struct Scored<'a> {
    title: &'a Title,
    bonus: u32,
    overlap: usize,
}

/// Top related titles by genre overlap and title relation. `None` when nothing
/// qualifies, so the caller can hide the section.
pub fn related_titles<'a>(
    current: &RelatedQuery<'_>,
    catalogue: &'a Catalogue,
) -> Option<Vec<&'a Title>> {
    let current_genres: HashSet<String> =
        current.genres.iter().map(|g| g.to_lowercase()).collect();
    if current_genres.is_empty() {
        return None;
    }
    let current_norm = normalize_title(current.title);

    let mut scored: Vec<Scored<'a>> = catalogue
        .iter()
        .filter(|t| current.id != Some(t.id.as_str()))
        .filter_map(|t| {
            let candidate_norm = normalize_title(&t.title);
            if candidate_norm.is_empty() {
                return None;
            }
            let similarity = jaccard(&candidate_norm, &current_norm);
            if similarity >= NEAR_DUPLICATE_THRESHOLD {
                return None;
            }
            let overlap = t
                .genres
                .iter()
                .filter(|g| current_genres.contains(&g.to_lowercase()))
                .count();
            if overlap == 0 {
                return None;
            }
            let contains = !current_norm.is_empty()
                && (candidate_norm.contains(&current_norm)
                    || current_norm.contains(&candidate_norm));
            Some(Scored {
                title: t,
                bonus: if contains { TITLE_BONUS } else { 0 },
                overlap,
            })
        })
        .collect();

    scored.sort_by(|a, b| {
        b.bonus
            .cmp(&a.bonus)
            .then_with(|| b.overlap.cmp(&a.overlap))
            .then_with(|| by_rating(a.title, b.title))
            .then_with(|| by_popularity(a.title, b.title))
    });

    let top: Vec<&Title> = scored
        .into_iter()
        .take(MAX_RELATED)
        .map(|s| s.title)
        .collect();
    if top.is_empty() {
        None
    } else {
        Some(top)
    }
}

// Non-greedy: each `(` is closed by the next `)`; an unclosed `(` is kept.
fn strip_parentheticals(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(open) = rest.find('(') {
        match rest[open..].find(')') {
            Some(close_rel) => {
                out.push_str(&rest[..open]);
                rest = &rest[open + close_rel + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

fn is_release_year(token: &str) -> bool {
    token.len() == 4
        && token.chars().all(|c| c.is_ascii_digit())
        && (token.starts_with("19") || token.starts_with("20"))
}

fn is_quality_tag(token: &str) -> bool {
    if token == "4k" {
        return true;
    }
    token
        .strip_suffix('p')
        .is_some_and(|n| (3..=4).contains(&n.len()) && n.chars().all(|c| c.is_ascii_digit()))
}
