//! Raw content retrieval for agents.
//!
//! [`RawFetcher`] is the single network boundary of the agent pipeline. The
//! pipeline never talks to the network directly; it hands a URL and
//! [`FetchOptions`] to a fetcher and receives the raw body back.
//! [`HttpFetcher`] is the default `reqwest`-backed implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, ClientBuilder, redirect};
use tracing::{debug, instrument};
use url::Url;

use super::error::FetchError;
use crate::user_agent;

/// Browser User-Agent sent when a call site asks for browser-like headers.
///
/// Catalog sites commonly serve reduced markup (or a bot wall) to clients
/// that identify as tools.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const BROWSER_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Default connect timeout for catalog requests.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;
/// Default read timeout for catalog requests.
pub const READ_TIMEOUT_SECS: u64 = 30;
/// Redirect hops followed when a call site enables redirects.
const MAX_REDIRECTS: usize = 10;

/// Per-call fetch options chosen by the call site (one set per stage).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Send browser-like `User-Agent`, `Accept` and `Accept-Language` headers.
    pub browser_headers: bool,
    /// Follow HTTP redirects. When false a 3xx response is a failure.
    pub follow_redirects: bool,
}

impl FetchOptions {
    /// Options with browser-like headers and no redirect following.
    #[must_use]
    pub fn browser() -> Self {
        Self {
            browser_headers: true,
            ..Self::default()
        }
    }

    /// Options with the tool's own headers and no redirect following.
    #[must_use]
    pub fn plain() -> Self {
        Self::default()
    }

    /// Enables or disables redirect following.
    #[must_use]
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }
}

/// Performs the actual retrieval of raw content for a URL.
///
/// Implementations must not retry; the pipeline reports failures as-is.
///
/// # Object Safety
///
/// This trait uses `async_trait` so agents can hold an `Arc<dyn RawFetcher>`.
#[async_trait]
pub trait RawFetcher: Send + Sync {
    /// Fetches the body of `url` as text.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failure or a non-success status.
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<String, FetchError>;
}

/// Timeout settings for [`HttpFetcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetcherSettings {
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub read_timeout_secs: u64,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
        }
    }
}

/// `reqwest`-backed [`RawFetcher`].
///
/// Holds two pooled clients because redirect policy is fixed per client:
/// one follows redirects, the other reports them as failures.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    following: Client,
    direct: Client,
    settings: FetcherSettings,
}

impl HttpFetcher {
    /// Creates a fetcher with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] when client construction fails.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_settings(FetcherSettings::default())
    }

    /// Creates a fetcher with explicit timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] when client construction fails.
    #[instrument(level = "debug")]
    pub fn with_settings(settings: FetcherSettings) -> Result<Self, FetchError> {
        let following = base_builder(settings)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(FetchError::client_build)?;
        let direct = base_builder(settings)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(FetchError::client_build)?;
        Ok(Self {
            following,
            direct,
            settings,
        })
    }

    /// Returns the timeout settings in use.
    #[must_use]
    pub fn settings(&self) -> FetcherSettings {
        self.settings
    }
}

fn base_builder(settings: FetcherSettings) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
        .timeout(Duration::from_secs(settings.read_timeout_secs))
        .user_agent(user_agent::default_fetch_user_agent())
        .gzip(true)
}

#[async_trait]
impl RawFetcher for HttpFetcher {
    #[instrument(skip(self, options), fields(url = %url, browser = options.browser_headers))]
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<String, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::invalid_url(url));
        }

        let client = if options.follow_redirects {
            &self.following
        } else {
            &self.direct
        };

        let mut request = client.get(parsed);
        if options.browser_headers {
            request = request
                .header(USER_AGENT, BROWSER_USER_AGENT)
                .header(ACCEPT, BROWSER_ACCEPT)
                .header(ACCEPT_LANGUAGE, BROWSER_ACCEPT_LANGUAGE);
        }

        let response = request
            .send()
            .await
            .map_err(|source| FetchError::network(url, source))?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "non-success response");
            return Err(FetchError::http_status(url, status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|source| FetchError::body(url, source))?;
        debug!(bytes = body.len(), "fetched raw content");
        Ok(body)
    }
}
