//! Addressable listing state carried in the URL: `page`, `q` and `tags`.

use crate::api::ListQuery;
use crate::filter::{ListParams, SearchFilter, parse_tag_list, total_pages};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlState {
    pub page: Option<u32>,
    pub q: Option<String>,
    pub tags: Vec<String>,
}

impl From<ListQuery> for UrlState {
    /// A non-numeric or zero page is treated as unset; blank `q` and tag
    /// entries are dropped.
    fn from(query: ListQuery) -> Self {
        Self {
            page: query
                .page
                .and_then(|p| p.trim().parse::<u32>().ok())
                .filter(|p| *p >= 1),
            q: query.q.filter(|q| !q.is_empty()),
            tags: query.tags.as_deref().map(parse_tag_list).unwrap_or_default(),
        }
    }
}

impl UrlState {
    pub fn current_page(&self) -> u32 {
        self.page.unwrap_or(1)
    }

    /// Submit a new search term. Clears `q` when blank and always resets the page.
    pub fn with_search(mut self, term: &str) -> Self {
        self.q = Some(term.to_string()).filter(|t| !t.is_empty());
        self.page = None;
        self
    }

    /// Add `tag` if absent, remove it if present. The page is left as-is.
    pub fn toggle_tag(mut self, tag: &str) -> Self {
        if let Some(pos) = self.tags.iter().position(|t| t == tag) {
            self.tags.remove(pos);
        } else {
            self.tags.push(tag.to_string());
        }
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page.max(1));
        self
    }

    pub fn to_query_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(q) = &self.q {
            parts.push(format!("q={}", urlencoding::encode(q)));
        }
        if !self.tags.is_empty() {
            parts.push(format!("tags={}", urlencoding::encode(&self.tags.join(","))));
        }
        if let Some(page) = self.page {
            parts.push(format!("page={page}"));
        }
        parts.join("&")
    }

    /// Translate into listing pipeline input.
    pub fn to_list_params(&self, page_size: u32) -> ListParams {
        ListParams::new(self.current_page(), page_size)
            .with_search(self.q.as_deref().and_then(SearchFilter::any_text))
            .with_tags(self.tags.iter().cloned())
    }
}

/// Previous/next navigation for a listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(current_page: u32, total_count: u64, page_size: u32) -> Self {
        Self {
            current_page,
            total_pages: total_pages(total_count, page_size),
        }
    }

    pub fn previous_page(&self) -> Option<u32> {
        (self.current_page > 1).then(|| self.current_page - 1)
    }

    pub fn next_page(&self) -> Option<u32> {
        (u64::from(self.current_page) < self.total_pages).then(|| self.current_page + 1)
    }
}
