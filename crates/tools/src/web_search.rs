//! Web search tool backed by SerpAPI.
//!
//! Queries Google through `https://serpapi.com/search` and condenses the
//! JSON response into one observation: SerpAPI's direct answer when it has
//! one, otherwise the knowledge-graph description, otherwise the top
//! organic results.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use stepwise_core::error::ToolError;
use stepwise_core::tool::Tool;
use tracing::{debug, warn};

const SERPAPI_URL: &str = "https://serpapi.com/search";

/// Observation when the response holds nothing usable.
pub const NO_RESULT: &str = "No good search result found";

/// Where search results come from.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Run `query` and summarize at most `max_results` results as text.
    async fn search(&self, query: &str, max_results: usize) -> Result<String, ToolError>;
}

/// SerpAPI client.
pub struct SerpApi {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl SerpApi {
    /// A missing key is reported on the first search, not here.
    pub fn new(api_key: Option<String>) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| failed(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            api_key,
            base_url: SERPAPI_URL.into(),
            client,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl SearchEngine for SerpApi {
    async fn search(&self, query: &str, max_results: usize) -> Result<String, ToolError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| failed("no SerpAPI key configured; set SERPAPI_API_KEY"))?;

        debug!(query, "Querying SerpAPI");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", query), ("api_key", api_key), ("engine", "google")])
            .send()
            .await
            .map_err(|e| failed(format!("request failed: {e}")))?;

        let status = response.status().as_u16();

        if status == 401 || status == 403 {
            return Err(failed("SerpAPI rejected the API key"));
        }

        if status == 429 {
            return Err(failed("SerpAPI rate limit reached, try again later"));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "SerpAPI returned error");
            return Err(failed(format!("SerpAPI returned status {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| failed(format!("unreadable SerpAPI response: {e}")))?;

        Ok(summarize(&body, max_results))
    }
}

/// Condense a SerpAPI response into a single observation.
pub fn summarize(body: &Value, max_results: usize) -> String {
    let answer_box = &body["answer_box"];
    let direct = [
        answer_box["answer"].as_str(),
        answer_box["snippet"].as_str(),
        answer_box["snippet_highlighted_words"][0].as_str(),
        body["knowledge_graph"]["description"].as_str(),
    ];
    if let Some(answer) = direct.into_iter().flatten().find(|s| !s.trim().is_empty()) {
        return answer.trim().to_string();
    }

    let organic: Vec<String> = body["organic_results"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .filter_map(|r| {
            let snippet = r["snippet"].as_str()?;
            Some(format!(
                "{}\n{}\n{}",
                r["title"].as_str().unwrap_or_default(),
                r["link"].as_str().unwrap_or_default(),
                snippet
            ))
        })
        .take(max_results)
        .collect();

    if organic.is_empty() {
        NO_RESULT.to_string()
    } else {
        organic.join("\n\n")
    }
}

fn failed(reason: impl Into<String>) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: "web_search".into(),
        reason: reason.into(),
    }
}

pub struct WebSearchTool {
    engine: Arc<dyn SearchEngine>,
    max_results: usize,
}

impl WebSearchTool {
    pub fn new(engine: Arc<dyn SearchEngine>) -> Self {
        Self {
            engine,
            max_results: 3,
        }
    }

    /// Search through SerpAPI with `api_key`.
    pub fn serpapi(api_key: Option<String>) -> Result<Self, ToolError> {
        Ok(Self::new(Arc::new(SerpApi::new(api_key)?)))
    }

    pub fn with_max_results(mut self, n: usize) -> Self {
        self.max_results = n.clamp(1, 10);
        self
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "A search engine. Useful for when you need to answer questions about current events. \
         Input should be a search query."
    }

    async fn call(&self, input: &str) -> Result<String, ToolError> {
        let query = input.trim().trim_matches('"').trim();
        if query.is_empty() {
            return Err(ToolError::InvalidInput("search query is empty".into()));
        }

        self.engine.search(query, self.max_results).await
    }
}
