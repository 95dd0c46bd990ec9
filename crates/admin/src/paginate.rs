//! Page slicing over a filtered collection.

use serde::{Deserialize, Serialize};

/// Current page (1-based) and the constant page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageState {
    page_index: usize,
    page_size: usize,
}

impl PageState {
    /// Page size below 1 is raised to 1.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_index: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Back to the first page (after any filter change).
    pub fn reset(&mut self) {
        self.page_index = 1;
    }

    /// Move to `page_index`, clamped into `[1, total_pages]`.
    pub fn go_to(&mut self, page_index: usize, total_pages: usize) {
        self.page_index = page_index.clamp(1, total_pages.max(1));
    }

    /// Enforce `page_index <= total_pages`; out-of-range pages fall back to 1.
    pub fn clamp(&mut self, total_pages: usize) {
        if self.page_index == 0 || self.page_index > total_pages.max(1) {
            self.page_index = 1;
        }
    }
}

/// One page worth of items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    pub page_index: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// `ceil(len / page_size)`, never less than 1.
pub fn total_pages(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size.max(1)).max(1)
}

/// Slice `items` for the page in `state`. A page past the end is empty.
pub fn paginate<'a, T>(items: &'a [T], state: &PageState) -> Page<'a, T> {
    let size = state.page_size();
    let start = state.page_index().saturating_sub(1).saturating_mul(size);
    let end = start.saturating_add(size).min(items.len());
    let slice = if start >= items.len() {
        &items[0..0]
    } else {
        &items[start..end]
    };
    Page {
        items: slice,
        page_index: state.page_index(),
        total_pages: total_pages(items.len(), size),
        total_items: items.len(),
    }
}
