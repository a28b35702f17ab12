//! Throttled raw-content retrieval for agents.
//!
//! This module provides the network boundary of the agent pipeline and the
//! per-agent throttle guarding it.
//!
//! # Features
//!
//! - [`RawFetcher`] trait: the only place an agent touches the network
//! - [`HttpFetcher`]: `reqwest` implementation with browser-like header
//!   emulation and per-call redirect handling
//! - [`RateLimiter`]: per-agent `max_concurrent` / `min_time` throttle
//! - Structured [`FetchError`] with the failing URL attached
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use aggregator_core::fetch::{FetchOptions, HttpFetcher, RateLimiter, RawFetcher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = Arc::new(HttpFetcher::new()?);
//! let limiter = RateLimiter::new(1, Duration::from_millis(1000))?;
//! let body = limiter
//!     .schedule(move || async move {
//!         fetcher
//!             .fetch("https://example.com/series", &FetchOptions::browser())
//!             .await
//!     })
//!     .await?;
//! println!("{} bytes", body.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
pub mod rate_limiter;

pub use client::{
    BROWSER_USER_AGENT, CONNECT_TIMEOUT_SECS, FetchOptions, FetcherSettings, HttpFetcher,
    READ_TIMEOUT_SECS, RawFetcher,
};
pub use error::{FetchError, LimiterError};
pub use rate_limiter::RateLimiter;
