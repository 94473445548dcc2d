//! Quote sources used to produce auto-reply content

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

/// Default public quote endpoint
pub const DEFAULT_QUOTE_API_URL: &str = "https://api.quotable.io/random";

/// Errors that can occur while fetching a quote
#[derive(Debug, Error)]
pub enum QuoteError {
    /// HTTP request failures
    #[error("HTTP error (status {status}): {body}")]
    Http { status: u16, body: String },

    /// The response body wasn't the expected JSON
    #[error("Invalid quote response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for QuoteError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16()).unwrap_or(0);
        QuoteError::Http {
            status,
            body: err.to_string(),
        }
    }
}

#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetch a single piece of text
    async fn fetch_quote(&self) -> Result<String, QuoteError>;
}

/// Response body of the quote service; only `content` is used
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    content: String,
}

/// Quote source backed by a remote JSON endpoint
pub struct HttpQuoteSource {
    http_client: Client,
    url: String,
}

impl HttpQuoteSource {
    pub fn new(url: impl Into<String>) -> Result<Self, QuoteError> {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| QuoteError::Http {
                status: 0,
                body: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl QuoteSource for HttpQuoteSource {
    async fn fetch_quote(&self) -> Result<String, QuoteError> {
        let response = self.http_client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QuoteError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        parse_quote(&body)
    }
}

fn parse_quote(body: &str) -> Result<String, QuoteError> {
    let quote: QuoteResponse =
        serde_json::from_str(body).map_err(|e| QuoteError::InvalidResponse(e.to_string()))?;
    Ok(quote.content)
}

/// Quote source that always returns the same text
#[derive(Debug, Clone)]
pub struct StaticQuoteSource {
    text: String,
}

impl StaticQuoteSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl QuoteSource for StaticQuoteSource {
    async fn fetch_quote(&self) -> Result<String, QuoteError> {
        Ok(self.text.clone())
    }
}
