/// Query string for paginated listings. Pages are 1-based.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub query: Option<String>,
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// The search term, ignoring blanks and the `all` placeholder.
    pub fn query(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty() && *q != "all")
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total_pages: i64,
}

/// Saturates for absurd page numbers, which then simply land past the last row.
pub fn offset(page: i64, page_size: i64) -> i64 {
    page.max(1).saturating_sub(1).saturating_mul(page_size)
}

pub fn total_pages(row_count: i64, page_size: i64) -> i64 {
    if page_size <= 0 {
        return 0;
    }
    (row_count + page_size - 1) / page_size
}
