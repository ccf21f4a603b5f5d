use serde::Serialize;

pub const PER_PAGE: i64 = 10;

/// Page envelope returned by every list endpoint that paginates.
#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub data: Vec<T>,
    pub current_page: i64,
    pub per_page: i64,
    pub total: i64,
    pub last_page: i64,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(data: Vec<T>, current_page: i64, total: i64) -> Self {
        let last_page = ((total + PER_PAGE - 1) / PER_PAGE).max(1);
        Self {
            data,
            current_page,
            per_page: PER_PAGE,
            total,
            last_page,
        }
    }
}

/// Clamp a caller-supplied page number and return its row offset.
pub fn page_offset(page: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    (page, (page - 1) * PER_PAGE)
}
