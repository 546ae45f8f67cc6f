//! Client for the upstream data service holding the material and account catalog
//!
//! List endpoints are paginated; the client follows each page's `next` link
//! until it is null.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize};
use uuid::Uuid;

use crate::config::UpstreamConfig;
use crate::error::{AppError, AppResult};

/// Upper bound on pages fetched for a single listing
const MAX_PAGES: usize = 10_000;

/// Data service API client
#[derive(Clone)]
pub struct DataServiceClient {
    client: Client,
    base_url: String,
    api_token: Option<String>,
    page_size: u32,
}

/// One page as returned by the data service
#[derive(Debug, Deserialize)]
pub struct RemotePage<T> {
    #[serde(default)]
    pub next: Option<String>,
    pub results: Vec<T>,
}

/// Material as described by the data service
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteMaterial {
    pub code: String,
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub available_quantity: Decimal,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

/// Account as described by the data service
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteAccount {
    pub id: Option<Uuid>,
    pub name: String,
    pub number: String,
    pub account_type: String,
}

fn default_true() -> bool {
    true
}

impl DataServiceClient {
    /// Build a client from configuration; `None` when no base URL is set
    pub fn from_config(config: &UpstreamConfig) -> AppResult<Option<Self>> {
        if config.base_url.trim().is_empty() {
            return Ok(None);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Some(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            page_size: config.page_size,
        }))
    }

    /// Fetch every material in the catalog
    pub async fn list_materials(&self) -> AppResult<Vec<RemoteMaterial>> {
        self.fetch_all("/materials/").await
    }

    /// Fetch every payment account
    pub async fn list_accounts(&self) -> AppResult<Vec<RemoteAccount>> {
        self.fetch_all("/accounts/").await
    }

    async fn fetch_all<T: DeserializeOwned>(&self, path: &str) -> AppResult<Vec<T>> {
        let first = format!("{}{}?limit={}", self.base_url, path, self.page_size);
        follow_pages(first, |url| self.fetch_page(resolve_url(&self.base_url, &url))).await
    }

    async fn fetch_page<T: DeserializeOwned>(&self, url: String) -> AppResult<RemotePage<T>> {
        tracing::debug!("Fetching {}", url);

        let mut request = self.client.get(&url);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("{} returned {} - {}", url, status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("invalid page from {}: {}", url, e)))
    }
}

/// Make a `next` link absolute; the data service may return paths only
pub fn resolve_url(base_url: &str, link: &str) -> String {
    if link.starts_with("http://") || link.starts_with("https://") {
        link.to_string()
    } else {
        format!("{}/{}", base_url.trim_end_matches('/'), link.trim_start_matches('/'))
    }
}

/// Collect the results of every page, starting at `first` and following `next`
///
/// A `next` link that was already visited ends the walk with an error instead
/// of looping forever.
pub async fn follow_pages<T, F, Fut>(first: String, mut fetch: F) -> AppResult<Vec<T>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = AppResult<RemotePage<T>>>,
{
    let mut results = Vec::new();
    let mut visited = HashSet::new();
    let mut cursor = Some(first);

    while let Some(url) = cursor {
        if !visited.insert(url.clone()) || visited.len() > MAX_PAGES {
            return Err(AppError::Upstream(format!("pagination loop at {}", url)));
        }
        let page = fetch(url).await?;
        results.extend(page.results);
        cursor = page.next.filter(|next| !next.is_empty());
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn pages(links: &[(&str, Option<&str>, Vec<u32>)]) -> HashMap<String, RemotePage<u32>> {
        links
            .iter()
            .map(|(url, next, results)| {
                (
                    url.to_string(),
                    RemotePage {
                        next: next.map(str::to_string),
                        results: results.clone(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_follows_next_until_null() {
        let mut pages = pages(&[
            ("p1", Some("p2"), vec![1, 2]),
            ("p2", Some("p3"), vec![3]),
            ("p3", None, vec![4, 5]),
        ]);

        let all = tokio_test::block_on(follow_pages("p1".to_string(), |url| {
            let page = pages.remove(&url);
            async move { page.ok_or_else(|| AppError::Upstream(url)) }
        }))
        .unwrap();

        assert_eq!(all, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_repeated_link_is_an_error() {
        let pages = pages(&[("p1", Some("p2"), vec![1]), ("p2", Some("p1"), vec![2])]);

        let result = tokio_test::block_on(follow_pages("p1".to_string(), |url| {
            let page = pages.get(&url).map(|p| RemotePage {
                next: p.next.clone(),
                results: p.results.clone(),
            });
            async move { page.ok_or_else(|| AppError::Upstream(url)) }
        }));

        assert!(matches!(result, Err(AppError::Upstream(_))));
    }

    #[test]
    fn test_resolve_url() {
        assert_eq!(
            resolve_url("https://data.example.com/api", "/materials/?offset=100"),
            "https://data.example.com/api/materials/?offset=100"
        );
        assert_eq!(
            resolve_url("https://data.example.com/api", "https://other.example.com/x"),
            "https://other.example.com/x"
        );
    }
}
