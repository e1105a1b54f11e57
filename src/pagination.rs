use serde::Serialize;

pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 100;

/// A validated page window. Both numbers are safe to inline into SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// Parses raw query-string values. Non-numeric input is rejected; numbers are
    /// clamped so that `page >= 1` and `1 <= limit <= 100`.
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Result<Self, String> {
        let page = parse_number("page", page)?.unwrap_or(1).clamp(1, i64::from(u32::MAX));
        let limit = parse_number("limit", limit)?
            .unwrap_or(i64::from(DEFAULT_LIMIT))
            .clamp(1, i64::from(MAX_LIMIT));

        Ok(Self {
            page: page as u32,
            limit: limit as u32,
        })
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

fn parse_number(name: &str, raw: Option<&str>) -> Result<Option<i64>, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse::<i64>()
            .map(Some)
            .map_err(|_| format!("{name} must be a whole number")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(request: PageRequest, total: i64) -> Self {
        let limit = i64::from(request.limit.max(1));
        let total = total.max(0);
        Self {
            page: request.page,
            limit: request.limit,
            total,
            pages: (total + limit - 1) / limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let req = PageRequest::parse(None, None).unwrap();
        assert_eq!(req, PageRequest { page: 1, limit: 20 });
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(PageRequest::parse(None, Some("500")).unwrap().limit, 100);
        assert_eq!(PageRequest::parse(None, Some("0")).unwrap().limit, 1);
        assert_eq!(PageRequest::parse(Some("-3"), Some("-1")).unwrap(), PageRequest { page: 1, limit: 1 });
    }

    #[test]
    fn test_non_numeric_is_rejected() {
        assert!(PageRequest::parse(Some("1; DROP TABLE bookings"), None).is_err());
        assert!(PageRequest::parse(None, Some("ten")).is_err());
    }

    #[test]
    fn test_offset() {
        let req = PageRequest::parse(Some("3"), Some("25")).unwrap();
        assert_eq!(req.offset(), 50);
    }

    #[test]
    fn test_pages_rounds_up() {
        let req = PageRequest { page: 1, limit: 20 };
        assert_eq!(Pagination::new(req, 0).pages, 0);
        assert_eq!(Pagination::new(req, 20).pages, 1);
        assert_eq!(Pagination::new(req, 21).pages, 2);
    }
}
