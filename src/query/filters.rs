//! Pagination and sort parameters after validation.

/// Sort keys accepted on quote listings. The `-` form sorts descending.
pub const QUOTE_SORT_SAFELIST: &[&str] = &[
    "id",
    "content",
    "modified_at",
    "created_at",
    "user_id",
    "-id",
    "-content",
    "-modified_at",
    "-created_at",
    "-user_id",
];

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE: i64 = 10_000_000;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A sort key that is known to be on a safelist.
///
/// The column borrows from the safelist itself, so it can only ever hold
/// one of the server-defined names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    column: &'static str,
    direction: Direction,
}

impl SortKey {
    /// Look `raw` up in `safelist`. `None` if it is not there.
    pub fn parse(raw: &str, safelist: &'static [&'static str]) -> Option<Self> {
        let entry = safelist.iter().find(|allowed| **allowed == raw)?;
        Some(match entry.strip_prefix('-') {
            Some(column) => Self {
                column,
                direction: Direction::Desc,
            },
            None => Self {
                column: entry,
                direction: Direction::Asc,
            },
        })
    }

    pub fn column(&self) -> &'static str {
        self.column
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filters {
    pub page: i64,
    pub page_size: i64,
    pub sort: SortKey,
}

impl Filters {
    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_key_from_safelist() {
        let key = SortKey::parse("-created_at", QUOTE_SORT_SAFELIST).unwrap();
        assert_eq!(key.column(), "created_at");
        assert_eq!(key.direction(), Direction::Desc);

        let key = SortKey::parse("id", QUOTE_SORT_SAFELIST).unwrap();
        assert_eq!(key.column(), "id");
        assert_eq!(key.direction().as_sql(), "ASC");
    }

    #[test]
    fn test_sort_key_rejects_everything_else() {
        for raw in ["", "-", "--id", "ID", "author", "id; DROP TABLE quotes", "id DESC"] {
            assert!(SortKey::parse(raw, QUOTE_SORT_SAFELIST).is_none(), "{raw:?}");
        }
    }

    #[test]
    fn test_offset() {
        let sort = SortKey::parse("id", QUOTE_SORT_SAFELIST).unwrap();
        let filters = Filters { page: 3, page_size: 20, sort };
        assert_eq!(filters.limit(), 20);
        assert_eq!(filters.offset(), 40);
    }
}
