//! The two server conventions.
//!
//! Both adapters normalize whatever happened into an [`Outcome`]; they never
//! return a Rust error. Their classification rules differ on purpose:
//! [`LegacyTransport`] trusts the envelope's `status` field, while
//! [`RestTransport`] trusts the HTTP status code.

mod legacy;
mod rest;

pub use legacy::LegacyTransport;
pub use rest::RestTransport;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use std::time::Duration;
use vanille_core::{Outcome, RequestDescriptor};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request. `None` disables the timeout.
    async fn send(&self, request: &RequestDescriptor, timeout: Option<Duration>) -> Outcome;
}

/// The HTTP client shared by both transports.
pub fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(concat!("vanille/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Resolve a possibly relative URL against the site's base URL.
pub(crate) fn absolute_url(base: &str, url: &str) -> String {
    if Url::parse(url).is_ok() {
        return url.to_string();
    }
    match Url::parse(base).and_then(|b| b.join(url)) {
        Ok(joined) => joined.into(),
        Err(_) => url.to_string(),
    }
}

pub(crate) fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "timeout".to_string()
    } else {
        err.to_string()
    }
}

pub(crate) fn status_text(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => status.as_u16().to_string(),
    }
}
