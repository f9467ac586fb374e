use serde::Serialize;

/// Pagination summary returned next to a page of results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub current_page: i64,
    pub page_size: i64,
    pub first_page: i64,
    pub total_pages: i64,
    pub total_records: i64,
}

impl Metadata {
    /// Zero records gives all-zero metadata.
    pub fn calculate(total_records: i64, page: i64, page_size: i64) -> Self {
        if total_records <= 0 || page_size <= 0 {
            return Self::default();
        }

        Self {
            current_page: page,
            page_size,
            first_page: 1,
            total_pages: (total_records + page_size - 1) / page_size,
            total_records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_records() {
        assert_eq!(Metadata::calculate(0, 7, 20), Metadata::default());
        assert_eq!(Metadata::calculate(0, 1, 1).total_pages, 0);
    }

    #[test]
    fn test_total_pages_round_up() {
        let meta = Metadata::calculate(41, 2, 20);
        assert_eq!(meta.total_pages, 3);
        assert_eq!(meta.current_page, 2);
        assert_eq!(meta.first_page, 1);
        assert_eq!(meta.total_records, 41);

        assert_eq!(Metadata::calculate(40, 1, 20).total_pages, 2);
        assert_eq!(Metadata::calculate(1, 1, 100).total_pages, 1);
    }
}
