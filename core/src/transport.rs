//! Default [`Transport`] backed by `ureq`.
//!
//! `ureq` is synchronous, so every request runs inside
//! `tokio::task::spawn_blocking` and the async executor is never blocked.
//! Status-as-error is disabled: 4xx/5xx come back as `HttpResponse` data for
//! the repository to interpret.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest response body read by default. ureq on its own stops at 10 MiB.
pub const DEFAULT_MAX_BODY_BYTES: u64 = 256 * 1024 * 1024;

/// Executes requests against `base_url` with an optional bearer token.
#[derive(Clone)]
pub struct UreqTransport {
    base_url: String,
    bearer_token: Option<String>,
    max_body_bytes: u64,
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            agent,
        }
    }

    #[must_use]
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Responses with a larger body fail with `TransportError::Network`.
    #[must_use]
    pub fn max_body_bytes(mut self, limit: u64) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport")
            .field("base_url", &self.base_url)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for UreqTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let agent = self.agent.clone();
        let url = format!("{}{}", self.base_url, request.path);
        let auth = self.bearer_token.as_ref().map(|t| format!("Bearer {t}"));
        let limit = self.max_body_bytes;

        tokio::task::spawn_blocking(move || send(&agent, &url, auth.as_deref(), limit, request))
            .await
            .map_err(|e| TransportError::Join(e.to_string()))?
    }
}

fn send(
    agent: &ureq::Agent,
    url: &str,
    auth: Option<&str>,
    limit: u64,
    request: HttpRequest,
) -> Result<HttpResponse, TransportError> {
    let HttpRequest {
        method,
        headers,
        body,
        ..
    } = request;

    let result = match method {
        HttpMethod::Get => with_headers(agent.get(url), auth, &headers).call(),
        HttpMethod::Delete => {
            let builder = with_headers(agent.delete(url), auth, &headers);
            match body {
                Some(body) => builder.force_send_body().send(body.as_bytes()),
                None => builder.call(),
            }
        }
        HttpMethod::Post | HttpMethod::Put => {
            let builder = if method == HttpMethod::Post {
                agent.post(url)
            } else {
                agent.put(url)
            };
            let builder = with_headers(builder, auth, &headers);
            match body {
                Some(body) => builder.send(body.as_bytes()),
                None => builder.send_empty(),
            }
        }
    };

    let mut response = result.map_err(map_ureq_error)?;
    let status = response.status();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let body = response
        .body_mut()
        .with_config()
        .limit(limit)
        .read_to_string()
        .map_err(map_ureq_error)?;

    Ok(HttpResponse {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or_default().to_string(),
        headers,
        body,
    })
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    auth: Option<&str>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    builder = builder.header("accept", "application/json");
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn map_ureq_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        other => TransportError::Network(other.to_string()),
    }
}
