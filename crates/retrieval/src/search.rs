//! Web-search backends.
//!
//! A closed set of two: a self-hosted SearXNG instance (keyword engine
//! aggregator, JSON API) and Tavily (AI search API). Both return ranked
//! `{title, content, url}` hits; provider relevance order is preserved.

use serde::Deserialize;
use sibyl_core::error::RetrievalError;
use tracing::debug;

/// One ranked web-search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub content: String,
    pub url: String,
}

/// Which search API to talk to. Selected once, at construction.
#[derive(Debug, Clone)]
pub enum SearchBackend {
    /// SearXNG JSON API: `GET {base}/search?q=...&format=json`
    Searxng { base_url: String },
    /// Tavily search API: `POST {base}` with a bearer key
    Tavily { base_url: String, api_key: String },
}

/// A web-search client bound to one backend.
pub struct WebSearch {
    backend: SearchBackend,
    client: reqwest::Client,
}

impl WebSearch {
    pub fn new(backend: SearchBackend) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self { backend, client }
    }

    /// Run the query, returning at most `limit` hits in provider rank order.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>, RetrievalError> {
        let hits = match &self.backend {
            SearchBackend::Searxng { base_url } => self.searxng(base_url, query, limit).await?,
            SearchBackend::Tavily { base_url, api_key } => {
                self.tavily(base_url, api_key, query, limit).await?
            }
        };
        debug!(count = hits.len(), "Web search returned");
        Ok(hits)
    }

    async fn searxng(
        &self,
        base_url: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>, RetrievalError> {
        let url = format!("{}/search", base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("pageno", "1"),
                ("categories", "general"),
            ])
            .header("User-Agent", "Mozilla/5.0")
            .send()
            .await
            .map_err(|e| RetrievalError::SearchFailed(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(RetrievalError::Http {
                status_code: status,
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: SearxngResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::SearchFailed(e.to_string()))?;

        Ok(body
            .results
            .into_iter()
            .take(limit)
            .map(|r| SearchHit {
                title: r.title,
                content: r.content,
                url: r.url,
            })
            .collect())
    }

    async fn tavily(
        &self,
        base_url: &str,
        api_key: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>, RetrievalError> {
        let body = serde_json::json!({
            "query": query,
            "max_results": limit,
        });

        let response = self
            .client
            .post(base_url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::SearchFailed(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(RetrievalError::Http {
                status_code: status,
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: TavilyResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::SearchFailed(e.to_string()))?;

        Ok(body
            .results
            .into_iter()
            .take(limit)
            .map(|r| SearchHit {
                title: r.title,
                content: r.content,
                url: r.url,
            })
            .collect())
    }
}

// --- Wire types ---

#[derive(Debug, Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearxngResult>,
}

#[derive(Debug, Deserialize)]
struct SearxngResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    url: String,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    url: String,
}
