//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Attachment purposes recorded by the platform
///
/// Attachment content is never inspected; only the reference is kept.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentPurpose {
    ReferenceImage,
    MockupImage,
    Dxf,
    PaymentScreenshot,
    InvoiceImage,
    ReleaseProof,
}

impl AttachmentPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentPurpose::ReferenceImage => "reference_image",
            AttachmentPurpose::MockupImage => "mockup_image",
            AttachmentPurpose::Dxf => "dxf",
            AttachmentPurpose::PaymentScreenshot => "payment_screenshot",
            AttachmentPurpose::InvoiceImage => "invoice_image",
            AttachmentPurpose::ReleaseProof => "release_proof",
        }
    }
}

/// Offset pagination parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageParams {
    #[serde(default = "PageParams::default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

impl PageParams {
    pub const MAX_LIMIT: u32 = 100;

    fn default_limit() -> u32 {
        20
    }

    /// Clamp the limit into `1..=MAX_LIMIT`
    pub fn normalized(self) -> Self {
        Self {
            limit: self.limit.clamp(1, Self::MAX_LIMIT),
            offset: self.offset,
        }
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            limit: Self::default_limit(),
            offset: 0,
        }
    }
}

/// One page of a list endpoint
///
/// Callers needing the full history follow `next` until it is `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Build a page, deriving `next`/`previous` links from the request path
    /// and its raw query string (other filters are preserved).
    pub fn new(
        results: Vec<T>,
        count: u64,
        params: PageParams,
        path: &str,
        raw_query: Option<&str>,
    ) -> Self {
        let params = params.normalized();
        let end = u64::from(params.offset) + results.len() as u64;
        let next = (end < count).then(|| page_link(path, raw_query, params.limit, end as u32));
        let previous = (params.offset > 0)
            .then(|| page_link(path, raw_query, params.limit, params.offset.saturating_sub(params.limit)));

        Self {
            count,
            next,
            previous,
            results,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

/// Rebuild a list URL with new `limit`/`offset`, keeping every other query pair
pub fn page_link(path: &str, raw_query: Option<&str>, limit: u32, offset: u32) -> String {
    let mut pairs: Vec<&str> = raw_query
        .unwrap_or("")
        .split('&')
        .filter(|pair| {
            !pair.is_empty() && !pair.starts_with("limit=") && !pair.starts_with("offset=")
        })
        .collect();
    let paging = format!("limit={}&offset={}", limit, offset);
    pairs.push(&paging);
    format!("{}?{}", path, pairs.join("&"))
}

/// Date range for queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub start: chrono::NaiveDate,
    pub end: chrono::NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: chrono::NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_links_preserve_filters() {
        let params = PageParams { limit: 2, offset: 2 };
        let page = Page::new(vec![1, 2], 5, params, "/api/v1/releases", Some("confirmed=false&limit=2&offset=2"));

        assert_eq!(
            page.next.as_deref(),
            Some("/api/v1/releases?confirmed=false&limit=2&offset=4")
        );
        assert_eq!(
            page.previous.as_deref(),
            Some("/api/v1/releases?confirmed=false&limit=2&offset=0")
        );
    }

    #[test]
    fn test_last_page_has_no_next() {
        let params = PageParams { limit: 20, offset: 0 };
        let page = Page::new(vec![1, 2, 3], 3, params, "/api/v1/orders", None);
        assert!(page.next.is_none());
        assert!(page.previous.is_none());
    }

    #[test]
    fn test_limit_is_clamped() {
        let params = PageParams { limit: 0, offset: 0 }.normalized();
        assert_eq!(params.limit, 1);
        let params = PageParams { limit: 5000, offset: 0 }.normalized();
        assert_eq!(params.limit, PageParams::MAX_LIMIT);
    }
}
