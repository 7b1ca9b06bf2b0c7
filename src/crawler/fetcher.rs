//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client with user agent and timeouts
//! - A redirect policy that never leaves the mirrored host
//! - GET requests that read the full response body
//! - Error classification (status failure, timeout, other)

use crate::config::CrawlSettings;
use crate::url::is_same_host;
use reqwest::{header::LOCATION, redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// Maximum redirect hops followed for a single request
pub const MAX_REDIRECTS: usize = 10;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Server answered 2xx and the body was read
    Success {
        /// Final URL after same-host redirects
        final_url: Url,
        /// HTTP status code
        status_code: u16,
        /// Response body
        body: Vec<u8>,
    },

    /// A redirect pointed at another host and was not followed
    RedirectOffDomain {
        /// Redirect target as sent by the server
        location: String,
        /// Host of the redirect target
        host: String,
    },

    /// Non-success HTTP status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Request or body read timed out
    Timeout {
        /// Error description
        error: String,
    },

    /// Any other network error (connection refused, redirect loop, etc.)
    NetworkError {
        /// Error description
        error: String,
    },
}

/// Builds the HTTP client shared by every worker for one run
///
/// # Redirects
///
/// Same-host redirects are followed up to [`MAX_REDIRECTS`] hops. A redirect
/// to any other host stops the chain and the 3xx response is returned to the
/// caller, which [`fetch_url`] reports as [`FetchResult::RedirectOffDomain`].
///
/// # Example
///
/// ```no_run
/// use site_mirror::config::{Config, CrawlSettings};
/// use site_mirror::crawler::build_http_client;
///
/// let mut config = Config::default();
/// config.site.base_url = Some("https://example.test/".to_string());
/// let settings = CrawlSettings::from_config(&config).unwrap();
///
/// let client = build_http_client(&settings).unwrap();
/// ```
pub fn build_http_client(settings: &CrawlSettings) -> Result<Client, reqwest::Error> {
    let base_host = settings.base_host.clone();
    let policy = Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            attempt.error(format!("redirect chain exceeded {} hops", MAX_REDIRECTS))
        } else if !is_same_host(attempt.url(), &base_host) {
            attempt.stop()
        } else {
            attempt.follow()
        }
    });

    Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(Duration::from_secs(settings.request_timeout_secs))
        .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
        .redirect(policy)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and classifies the result
///
/// # Classification
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx | `Success` with the full body |
/// | 3xx to another host | `RedirectOffDomain` |
/// | Any other non-2xx | `HttpError` |
/// | Timeout (request or body) | `Timeout` |
/// | Anything else | `NetworkError` |
///
/// # Arguments
///
/// * `client` - The client from [`build_http_client`]
/// * `url` - The URL to fetch
/// * `base_host` - Host the mirror is confined to
pub async fn fetch_url(client: &Client, url: &Url, base_host: &str) -> FetchResult {
    let response = match client.get(url.clone()).send().await {
        Ok(response) => response,
        Err(e) => return classify_error(e),
    };

    let status = response.status();
    let final_url = response.url().clone();

    if status.is_redirection() {
        if let Some((location, host)) = off_domain_location(&response, base_host) {
            return FetchResult::RedirectOffDomain { location, host };
        }
    }

    if !status.is_success() {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    match response.bytes().await {
        Ok(body) => FetchResult::Success {
            final_url,
            status_code: status.as_u16(),
            body: body.to_vec(),
        },
        Err(e) => classify_error(e),
    }
}

/// Returns the redirect target and its host when it leaves `base_host`
fn off_domain_location(response: &reqwest::Response, base_host: &str) -> Option<(String, String)> {
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    let target = response.url().join(location).ok()?;

    if is_same_host(&target, base_host) {
        return None;
    }

    let host = target.host_str().unwrap_or_default().to_string();
    Some((location.to_string(), host))
}

fn classify_error(e: reqwest::Error) -> FetchResult {
    if e.is_timeout() {
        FetchResult::Timeout {
            error: e.to_string(),
        }
    } else if e.is_connect() {
        FetchResult::NetworkError {
            error: format!("connection failed: {}", e),
        }
    } else {
        FetchResult::NetworkError {
            error: e.to_string(),
        }
    }
}
