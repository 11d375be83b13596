use std::cmp::Ordering;

use crate::catalogue::Title;

/// Numbered buttons are all shown up to this many pages.
const FULL_PAGE_LIST_MAX: usize = 7;
/// Pages shown either side of the current one in the sliding window.
const WINDOW_RADIUS: usize = 2;

pub type Comparator = fn(&Title, &Title) -> Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageControl {
    Prev { target: usize, disabled: bool },
    Page { number: usize, active: bool },
    Ellipsis,
    Next { target: usize, disabled: bool },
}

pub fn page_count(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size.max(1)).max(1)
}

pub fn clamp_page(requested: usize, total: usize) -> usize {
    requested.clamp(1, total.max(1))
}

/// Prev/next plus numbered pages; past seven pages the list collapses to
/// first, a window around `current`, and last.
pub fn build_controls(current: usize, total: usize) -> Vec<PageControl> {
    let total = total.max(1);
    let current = clamp_page(current, total);
    let mut controls = vec![PageControl::Prev {
        target: current.saturating_sub(1).max(1),
        disabled: current == 1,
    }];

    if total <= FULL_PAGE_LIST_MAX {
        controls.extend((1..=total).map(|n| PageControl::Page {
            number: n,
            active: n == current,
        }));
    } else {
        controls.push(PageControl::Page {
            number: 1,
            active: current == 1,
        });
        let start = current.saturating_sub(WINDOW_RADIUS).max(2);
        let end = (current + WINDOW_RADIUS).min(total - 1);
        if start > 2 {
            controls.push(PageControl::Ellipsis);
        }
        controls.extend((start..=end).map(|n| PageControl::Page {
            number: n,
            active: n == current,
        }));
        if end < total - 1 {
            controls.push(PageControl::Ellipsis);
        }
        controls.push(PageControl::Page {
            number: total,
            active: current == total,
        });
    }

    controls.push(PageControl::Next {
        target: (current + 1).min(total),
        disabled: current == total,
    });
    controls
}

/// One rendered page: its items and the control set that replaced any
/// previous one.
#[derive(Debug, Clone)]
pub struct PageView<'a> {
    pub container_id: String,
    pub items: Vec<&'a Title>,
    pub current: usize,
    pub total: usize,
    pub controls: Vec<PageControl>,
}

/// Paginates one grid. Owns the ordered view and the current page.
#[derive(Debug, Clone)]
pub struct GridRenderer<'a> {
    container_id: String,
    ordered: Vec<&'a Title>,
    page_size: usize,
    current: usize,
}

impl<'a> GridRenderer<'a> {
    /// Without a comparator the input order is reversed, so titles appended
    /// last to the catalogue are shown first.
    pub fn new(
        container_id: impl Into<String>,
        items: Vec<&'a Title>,
        page_size: usize,
        comparator: Option<Comparator>,
    ) -> Self {
        Self {
            container_id: container_id.into(),
            ordered: order(items, comparator),
            page_size: page_size.max(1),
            current: 1,
        }
    }

    pub fn total_pages(&self) -> usize {
        page_count(self.ordered.len(), self.page_size)
    }

    pub fn current_page(&self) -> usize {
        self.current
    }

    /// Out-of-range requests are clamped.
    pub fn render_page(&mut self, requested: usize) -> PageView<'a> {
        let total = self.total_pages();
        let page = clamp_page(requested, total);
        self.current = page;

        let start = (page - 1) * self.page_size;
        let items = self
            .ordered
            .iter()
            .skip(start)
            .take(self.page_size)
            .copied()
            .collect();

        PageView {
            container_id: self.container_id.clone(),
            items,
            current: page,
            total,
            controls: build_controls(page, total),
        }
    }
}

fn order<'a>(mut items: Vec<&'a Title>, comparator: Option<Comparator>) -> Vec<&'a Title> {
    match comparator {
        Some(cmp) => items.sort_by(|a, b| cmp(a, b)),
        None => items.reverse(),
    }
    items
}
