use serde::{Deserialize, Serialize};

/// Text column a search term may match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Title,
    Description,
    Content,
}

impl SearchField {
    pub const ALL: [SearchField; 3] = [Self::Title, Self::Description, Self::Content];

    pub fn column(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Content => "content",
        }
    }
}

/// Structured substring search: a row qualifies when `term` occurs in any of
/// `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub fields: Vec<SearchField>,
    pub term: String,
    pub case_sensitive: bool,
}

impl SearchFilter {
    /// Case-insensitive search over title, description and content.
    /// The term is used as entered, surrounding whitespace included; only an
    /// empty term means no filter.
    pub fn any_text(term: &str) -> Option<Self> {
        if term.is_empty() {
            return None;
        }
        Some(Self {
            fields: SearchField::ALL.to_vec(),
            term: term.to_string(),
            case_sensitive: false,
        })
    }

    /// Evaluate the filter against in-memory values.
    pub fn matches(&self, title: &str, description: Option<&str>, content: &str) -> bool {
        self.fields.iter().any(|field| {
            let haystack = match field {
                SearchField::Title => Some(title),
                SearchField::Description => description,
                SearchField::Content => Some(content),
            };
            haystack.is_some_and(|h| self.contained_in(h))
        })
    }

    fn contained_in(&self, haystack: &str) -> bool {
        if self.case_sensitive {
            haystack.contains(&self.term)
        } else {
            haystack.to_lowercase().contains(&self.term.to_lowercase())
        }
    }
}

/// Input to the listing pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ListParams {
    /// 1-based page number
    pub page: u32,
    pub page_size: u32,
    pub search: Option<SearchFilter>,
    /// Tag overlap filter; empty means no tag filtering
    pub tags: Vec<String>,
}

impl ListParams {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
            search: None,
            tags: Vec::new(),
        }
    }

    pub fn with_search(mut self, search: Option<SearchFilter>) -> Self {
        self.search = search;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Index of the first item on this page within the full result set.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.page_size)
    }
}

/// Number of pages needed to show `total_count` items.
pub fn total_pages(total_count: u64, page_size: u32) -> u64 {
    let page_size = u64::from(page_size.max(1));
    total_count.div_ceil(page_size)
}

/// Split a comma-separated tag list, trimming entries and dropping blanks.
pub fn parse_tag_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}
