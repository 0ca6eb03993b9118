//! Fixed-size windowing over a globally ordered candidate sequence.

use crate::model::{Candidate, Page};
use crate::navigation::{Focus, NavOutcome, Navigator};

pub const DEFAULT_PAGE_SIZE: usize = 6;

pub fn total_pages(total_count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total_count.div_ceil(page_size)
}

pub fn clamp_page_index(page_index: usize, total_pages: usize) -> usize {
    page_index.min(total_pages.saturating_sub(1))
}

/// Cuts page `page_index` out of `ordered`, clamping the index into range.
pub fn window(ordered: &[Candidate], page_index: usize, page_size: usize) -> Page {
    let total_count = ordered.len();
    let total_pages = total_pages(total_count, page_size);
    if total_pages == 0 {
        return Page::empty();
    }

    let page_index = clamp_page_index(page_index, total_pages);
    let start = page_index * page_size;
    let end = (start + page_size).min(total_count);
    Page {
        items: ordered[start..end].to_vec(),
        page_index,
        total_pages,
        total_count,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot<'a> {
    Filled(&'a Candidate),
    Placeholder,
}

impl Slot<'_> {
    pub fn is_selectable(&self) -> bool {
        matches!(self, Slot::Filled(_))
    }
}

/// The currently loaded page of the grid plus its focus cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct GridState {
    page_size: usize,
    page: Page,
    navigator: Navigator,
}

impl GridState {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            page: Page::empty(),
            navigator: Navigator::default(),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn items(&self) -> &[Candidate] {
        &self.page.items
    }

    pub fn focus(&self) -> Focus {
        self.navigator.focus()
    }

    /// Installs a freshly fetched page. Focus is re-derived from the item count
    /// regardless of the previous cursor.
    pub fn apply_page(&mut self, mut page: Page) {
        page.items.truncate(self.page_size);
        self.navigator.reset(page.items.len());
        self.page = page;
    }

    pub fn clear(&mut self) {
        self.apply_page(Page::empty());
    }

    pub fn slots(&self) -> Vec<Slot<'_>> {
        (0..self.page_size)
            .map(|index| {
                self.page
                    .items
                    .get(index)
                    .map_or(Slot::Placeholder, Slot::Filled)
            })
            .collect()
    }

    pub fn select_slot(&mut self, slot: usize) -> Option<&Candidate> {
        match self.navigator.select(slot) {
            NavOutcome::Emit(index) => self.page.items.get(index),
            _ => None,
        }
    }

    pub fn focused(&self) -> Option<&Candidate> {
        self.navigator
            .cursor()
            .and_then(|cursor| self.page.items.get(cursor))
    }

    pub fn can_go_prev(&self) -> bool {
        self.page.page_index > 0
    }

    pub fn can_go_next(&self) -> bool {
        self.page.page_index + 1 < self.page.total_pages
    }

    /// Index of the previous page, or `None` when already on the first page.
    pub fn prev_page_index(&self) -> Option<usize> {
        self.can_go_prev().then(|| self.page.page_index - 1)
    }

    /// Index of the next page, or `None` when already on the last page.
    pub fn next_page_index(&self) -> Option<usize> {
        self.can_go_next().then(|| self.page.page_index + 1)
    }
}
