use super::{Transport, absolute_url, describe, status_text};
use async_trait::async_trait;
use reqwest::RequestBuilder;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use std::time::Duration;
use vanille_core::{Config, Method, Outcome, RequestDescriptor, ResponseEnvelope};

/// JSON requests to per-endpoint URLs under the site's REST root.
///
/// The HTTP status decides the outcome: any non-2xx response is an
/// application error even when its body is a success envelope, and any 2xx
/// response with a decodable envelope is a success even when that envelope
/// says `error`. The timeout wraps the whole exchange and aborts it.
#[derive(Debug, Clone)]
pub struct RestTransport {
    client: reqwest::Client,
    config: Arc<Config>,
}

impl RestTransport {
    pub fn new(client: reqwest::Client, config: Arc<Config>) -> Self {
        Self { client, config }
    }

    pub fn endpoint_url(&self, endpoint: &str) -> String {
        absolute_url(&self.config.base_url, &self.config.rest_endpoint_url(endpoint))
    }

    fn authorize(&self, builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        let Some(token) = token else {
            return builder;
        };
        match &self.config.rest_token_header {
            Some(header) => builder.header(header.as_str(), token),
            None => builder.bearer_auth(token),
        }
    }
}

fn extra_headers(headers: &[(String, String)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
            (Ok(name), Ok(value)) => {
                map.append(name, value);
            }
            _ => tracing::warn!(header = %name, "skipping invalid header"),
        }
    }
    map
}

async fn exchange(builder: RequestBuilder) -> Outcome {
    let response = match builder.send().await {
        Ok(response) => response,
        Err(e) => return Outcome::transport(describe(&e)),
    };
    let status = response.status();
    if !status.is_success() {
        let envelope = match response.bytes().await {
            Ok(body) => ResponseEnvelope::from_slice(&body).ok(),
            Err(_) => None,
        };
        return Outcome::ApplicationError {
            http_status: Some(status.as_u16()),
            envelope,
            detail: status_text(status),
        };
    }
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => return Outcome::transport(describe(&e)),
    };
    match ResponseEnvelope::from_slice(&body) {
        Ok(envelope) => Outcome::Success(envelope),
        Err(e) => Outcome::transport(format!("invalid response body: {e}")),
    }
}

#[async_trait]
impl Transport for RestTransport {
    async fn send(&self, request: &RequestDescriptor, timeout: Option<Duration>) -> Outcome {
        if !request.files.is_empty() {
            tracing::warn!(
                files = request.files.len(),
                "rest transport does not upload files, ignoring them"
            );
        }
        let url = self.endpoint_url(&request.endpoint);
        tracing::debug!(%url, method = request.method.as_str(), "rest request");

        let method = match request.method {
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        };
        let builder = self.client.request(method, &url).json(&request.payload);
        let builder = self
            .authorize(builder, request.token.as_deref())
            .headers(extra_headers(&request.headers));

        match timeout {
            Some(limit) => tokio::time::timeout(limit, exchange(builder))
                .await
                .unwrap_or_else(|_| Outcome::transport("timeout")),
            None => exchange(builder).await,
        }
    }
}
