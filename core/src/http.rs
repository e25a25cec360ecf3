//! HTTP transport types and the transport seam.
//!
//! # Design
//! Requests and responses are plain data. The repository builds `HttpRequest`
//! values and parses `HttpResponse` values without touching the network; the
//! single I/O step is delegated to a [`Transport`]. Paths are relative to the
//! platform host (`/rest/V1/...`), so the transport owns the base URL and any
//! credentials.
//!
//! All fields use owned types so values can be moved into blocking tasks and
//! across threads without lifetime concerns.

use async_trait::async_trait;

use crate::error::TransportError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
///
/// `path` is host-relative and already carries its query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(path: String) -> Self {
        Self {
            method: HttpMethod::Get,
            path,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn delete(path: String) -> Self {
        Self {
            method: HttpMethod::Delete,
            path,
            headers: Vec::new(),
            body: None,
        }
    }

    /// A request carrying a JSON body.
    pub fn json(method: HttpMethod, path: String, body: String) -> Self {
        Self {
            method,
            path,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        }
    }
}

/// An HTTP response described as plain data.
///
/// `reason` is the human-readable status description (`"Not Found"`), used
/// as the detail of protocol errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes one HTTP round-trip.
///
/// Implementations own the host, connection pool and bearer token. A non-2xx
/// status is a successful execution: it comes back as data and is interpreted
/// by the repository. Only failures to obtain a response at all are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16) -> HttpResponse {
        HttpResponse {
            status,
            reason: String::new(),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    #[test]
    fn success_covers_whole_2xx_range() {
        assert!(response(200).is_success());
        assert!(response(202).is_success());
        assert!(response(204).is_success());
        assert!(!response(199).is_success());
        assert!(!response(301).is_success());
        assert!(!response(404).is_success());
    }

    #[test]
    fn json_request_sets_content_type() {
        let req = HttpRequest::json(HttpMethod::Put, "/rest/V1/x".to_string(), "{}".to_string());
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "application/json".to_string())]
        );
        assert_eq!(req.body.as_deref(), Some("{}"));
    }

    #[test]
    fn get_request_has_no_body() {
        let req = HttpRequest::get("/rest/V1/x".to_string());
        assert_eq!(req.method.as_str(), "GET");
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
    }
}
