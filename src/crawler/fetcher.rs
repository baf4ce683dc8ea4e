//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests made to the remote site:
//! - Building the session client (cookie store, user agent, timeouts)
//! - Throttled GET and form POST requests
//! - Retry logic for transient failures
//! - Error classification
//! - Unwrapping the JSON overflow payload of truncated ascent listings

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::crawler::parser::parse_overflow_payload;
use crate::crawler::throttle::Throttle;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Failure of a single request after retries were exhausted
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Not authorized for {url} (HTTP {status})")]
    Unauthorized { url: String, status: u16 },

    #[error("Network error for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Malformed overflow payload from {url}: {message}")]
    Overflow { url: String, message: String },
}

impl FetchError {
    /// Returns true if the session is not (or no longer) authenticated
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// The URL of the failed request
    pub fn url(&self) -> &str {
        match self {
            Self::Status { url, .. }
            | Self::Unauthorized { url, .. }
            | Self::Network { url, .. }
            | Self::Overflow { url, .. } => url,
        }
    }
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: String,
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

/// Builds an HTTP client with proper configuration
///
/// The client keeps a cookie store so the login session carries over to
/// every later request.
///
/// # Example
///
/// ```no_run
/// use crag_leader::config::UserAgentConfig;
/// use crag_leader::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "CragLeader".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .cookie_store(true)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// What to do with a response or transport error
enum Attempt {
    Done(FetchedPage),
    Retry { after: Duration, error: FetchError },
    Fail(FetchError),
}

/// Throttled, retrying HTTP fetcher bound to one session
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 401/403 | Immediate → Unauthorized |
/// | HTTP 429 | Wait `Retry-After` (or retry delay), retry |
/// | HTTP 5xx | Wait retry delay, retry |
/// | Other 4xx | Immediate → Status |
/// | Timeout / connection error | Wait retry delay, retry |
///
/// Every attempt, retries included, passes through the throttle.
pub struct Fetcher {
    client: Client,
    throttle: Throttle,
    max_retries: u32,
    retry_delay: Duration,
}

impl Fetcher {
    pub fn new(client: Client, config: &CrawlerConfig) -> Self {
        Self {
            client,
            throttle: Throttle::new(config.request_interval()),
            max_retries: config.max_retries.max(1),
            retry_delay: config.retry_delay(),
        }
    }

    /// Number of requests sent so far, retries included
    pub fn requests_made(&self) -> u64 {
        self.throttle.requests()
    }

    /// GETs a page and returns its body
    pub async fn get_text(&mut self, url: &Url) -> Result<String, FetchError> {
        let page = self.execute(url, |client| client.get(url.clone())).await?;
        Ok(page.body)
    }

    /// POSTs a url-encoded form
    pub async fn post_form(
        &mut self,
        url: &Url,
        form: &[(&str, &str)],
    ) -> Result<FetchedPage, FetchError> {
        self.execute(url, |client| client.post(url.clone()).form(form))
            .await
    }

    /// GETs an overflow listing and returns the HTML fragment it wraps
    pub async fn get_overflow_html(&mut self, url: &Url) -> Result<String, FetchError> {
        let body = self
            .execute(url, |client| {
                client
                    .get(url.clone())
                    .header(reqwest::header::ACCEPT, "application/json")
            })
            .await?
            .body;

        parse_overflow_payload(&body).map_err(|e| FetchError::Overflow {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn execute<F>(&mut self, url: &Url, build: F) -> Result<FetchedPage, FetchError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut attempt = 1;
        loop {
            self.throttle.wait().await;
            tracing::debug!("Request {} (attempt {}/{})", url, attempt, self.max_retries);

            let outcome = match build(&self.client).send().await {
                Ok(response) => self.classify_response(url, response).await,
                Err(e) => self.classify_error(url, e),
            };

            match outcome {
                Attempt::Done(page) => return Ok(page),
                Attempt::Fail(error) => return Err(error),
                Attempt::Retry { after, error } => {
                    if attempt >= self.max_retries {
                        return Err(error);
                    }
                    tracing::warn!("{}; retrying in {:?}", error, after);
                    tokio::time::sleep(after).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn classify_response(&self, url: &Url, response: reqwest::Response) -> Attempt {
        let status = response.status();
        let final_url = response.url().to_string();
        let status_error = || FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        };

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Attempt::Fail(FetchError::Unauthorized {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(self.retry_delay);
            return Attempt::Retry {
                after,
                error: status_error(),
            };
        }

        if status.is_server_error() {
            return Attempt::Retry {
                after: self.retry_delay,
                error: status_error(),
            };
        }

        if !status.is_success() {
            return Attempt::Fail(status_error());
        }

        match response.text().await {
            Ok(body) => Attempt::Done(FetchedPage {
                final_url,
                status: status.as_u16(),
                body,
            }),
            Err(e) => self.classify_error(url, e),
        }
    }

    fn classify_error(&self, url: &Url, error: reqwest::Error) -> Attempt {
        let transient = error.is_timeout() || error.is_connect() || error.is_body() || error.is_request();
        let error = FetchError::Network {
            url: url.to_string(),
            source: error,
        };

        if transient {
            Attempt::Retry {
                after: self.retry_delay,
                error,
            }
        } else {
            Attempt::Fail(error)
        }
    }
}
