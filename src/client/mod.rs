use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::{ContinuationToken, LogEntry, SearchCriteria};

/// Literal `message` the search API returns on success.
pub const SUCCESS_MESSAGE: &str = "Log data fetched successfully";

/// Body of a search or fetch-more request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchRequest {
    #[serde(rename = "clientId")]
    pub client_id: String,
    pub repcode: String,
    #[serde(rename = "startDate")]
    pub start_date: String,
    #[serde(rename = "endDate")]
    pub end_date: String,
    #[serde(rename = "type")]
    pub log_type: String,
    pub search_after: Option<ContinuationToken>,
}

impl SearchRequest {
    pub fn new(criteria: &SearchCriteria, token: Option<&ContinuationToken>) -> Self {
        Self {
            client_id: criteria.client_id.clone(),
            repcode: criteria.repcode.clone(),
            start_date: criteria.start_date.clone(),
            end_date: criteria.end_date.clone(),
            log_type: criteria.log_type.clone(),
            search_after: token.cloned(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Vec<LogEntry>>,
    #[serde(default, rename = "searchAfter")]
    pub search_after: Option<ContinuationToken>,
}

/// One successfully fetched page.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchPage {
    pub message: String,
    pub entries: Vec<LogEntry>,
    pub token: Option<ContinuationToken>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to reach {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("search rejected: {message}")]
    Rejected { message: String },

    #[error("invalid response body: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to build HTTP client: {source}")]
    HttpClient {
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to setup proxy: {proxy}: {source}")]
    Proxy {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },
}

/// The remote search service.
#[async_trait]
pub trait SearchApi: Send + Sync {
    async fn search(&self, endpoint: &str, request: &SearchRequest)
        -> Result<SearchPage, FetchError>;
}

/// Checks the success discriminator and unwraps a decoded response.
pub fn interpret_response(
    response: SearchResponse,
    success_message: &str,
) -> Result<SearchPage, FetchError> {
    let message = response.message.unwrap_or_default();
    if message != success_message {
        let message = if message.trim().is_empty() {
            "Something went wrong".to_string()
        } else {
            message
        };
        return Err(FetchError::Rejected { message });
    }
    let entries = response.data.ok_or_else(|| FetchError::Rejected {
        message: "Invalid response format from server".to_string(),
    })?;
    Ok(SearchPage {
        message,
        entries,
        token: response.search_after,
    })
}

#[derive(Clone, Debug)]
pub struct ClientOptions {
    pub timeout_seconds: u64,
    pub proxy: Option<String>,
    pub success_message: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            proxy: None,
            success_message: SUCCESS_MESSAGE.to_string(),
        }
    }
}

/// `SearchApi` over HTTP POST with JSON bodies.
#[derive(Clone, Debug)]
pub struct HttpSearchApi {
    client: reqwest::Client,
    success_message: String,
}

impl HttpSearchApi {
    pub fn new(options: &ClientOptions) -> Result<Self, BuildError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(options.timeout_seconds.max(1)));

        if let Some(proxy) = options.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            let proxy = reqwest::Proxy::all(proxy).map_err(|e| BuildError::Proxy {
                proxy: proxy.to_string(),
                source: e,
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| BuildError::HttpClient { source: e })?;
        Ok(Self {
            client,
            success_message: options.success_message.clone(),
        })
    }
}

#[async_trait]
impl SearchApi for HttpSearchApi {
    async fn search(
        &self,
        endpoint: &str,
        request: &SearchRequest,
    ) -> Result<SearchPage, FetchError> {
        debug!(endpoint, ?request, "posting search request");
        let transport = |e| FetchError::Transport {
            endpoint: endpoint.to_string(),
            source: e,
        };

        let response = self
            .client
            .post(endpoint)
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport)?;

        if !status.is_success() {
            let message = serde_json::from_slice::<SearchResponse>(&body)
                .ok()
                .and_then(|r| r.message)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            warn!(status = status.as_u16(), %message, "search request failed");
            return Err(FetchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let decoded: SearchResponse =
            serde_json::from_slice(&body).map_err(|e| FetchError::Decode { source: e })?;
        let page = interpret_response(decoded, &self.success_message)?;
        info!(
            entries = page.entries.len(),
            has_more = page.token.is_some(),
            "received log page"
        );
        Ok(page)
    }
}
