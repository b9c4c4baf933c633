use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 25;
pub const MAX_PAGE_SIZE: usize = 500;

/// `page` / `limit` query parameters. Pages are 1-based.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl PageParams {
    pub fn page(&self) -> usize {
        self.page.filter(|p| *p > 0).unwrap_or(1)
    }

    pub fn limit(&self) -> usize {
        self.limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE)
    }
}

/// One page of a result set, with relative links to its neighbours.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

pub fn paginate<T>(items: Vec<T>, params: PageParams) -> Paginated<T> {
    let page = params.page();
    let limit = params.limit();
    let count = items.len();
    let start = (page - 1).saturating_mul(limit);

    let results: Vec<T> = items.into_iter().skip(start).take(limit).collect();

    let next = (start.saturating_add(limit) < count).then(|| page_link(page + 1, limit));
    let previous = (page > 1).then(|| page_link(page - 1, limit));

    Paginated {
        count,
        next,
        previous,
        results,
    }
}

fn page_link(page: usize, limit: usize) -> String {
    format!("?page={page}&limit={limit}")
}
