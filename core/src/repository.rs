//! Entity repository over the platform's REST API.
//!
//! # Design
//! `RestRepository` holds a transport and immutable options and carries no
//! state between calls, so one instance can serve any number of concurrent
//! callers. Every public operation follows the same shape:
//!
//! 1. validate arguments and compose the path, returning `ArgumentError`
//!    before any I/O;
//! 2. build an `HttpRequest`, execute it, check the status, parse the body;
//! 3. fold the outcome of step 2 into a `ResultEnvelope`.
//!
//! Collection paging lives in `pager.rs` and bulk batches in `bulk.rs`; both
//! reuse the helpers defined here.

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::envelope::ResultEnvelope;
use crate::error::{ArgumentError, RepositoryError, TransportError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::types::{wrap_entity, Entity, EntityId, ErrorDocument};
use crate::url::{compose_in, compose_segments, JoinMode, Namespace};

/// Per-repository settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryOptions {
    /// Store view every path is scoped to; `None` uses the default roots.
    pub store_code: Option<String>,
    /// Page size for `fetch_all` when the caller passes none.
    pub default_page_size: Option<u32>,
    /// Hard ceiling on pages requested by one `fetch_all`.
    pub max_pages: Option<u32>,
}

/// Asynchronous repository for platform entities.
#[derive(Debug, Clone)]
pub struct RestRepository<T> {
    transport: T,
    options: RepositoryOptions,
}

impl<T: Transport> RestRepository<T> {
    pub fn new(transport: T) -> Self {
        Self::with_options(transport, RepositoryOptions::default())
    }

    pub fn with_options(transport: T, options: RepositoryOptions) -> Self {
        Self { transport, options }
    }

    pub fn options(&self) -> &RepositoryOptions {
        &self.options
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch one entity by key.
    pub async fn get<E: Entity>(
        &self,
        endpoint: &str,
        id: EntityId,
        cancel: Option<&CancellationToken>,
    ) -> Result<ResultEnvelope<E>, ArgumentError> {
        let path = self.entity_path(endpoint, id)?;
        let result = self.fetch_json(HttpRequest::get(path.clone()), cancel).await;
        Ok(finish("get", &path, result))
    }

    /// Create an entity; the platform echoes it back with its key.
    pub async fn create<E: Entity>(
        &self,
        endpoint: &str,
        entity: &E,
        cancel: Option<&CancellationToken>,
    ) -> Result<ResultEnvelope<E>, ArgumentError> {
        let path = self.collection_path(endpoint)?;
        let result = self.write(HttpMethod::Post, path.clone(), entity, cancel).await;
        Ok(finish("create", &path, result))
    }

    /// Replace an existing entity. The entity must carry its key.
    pub async fn update<E: Entity>(
        &self,
        endpoint: &str,
        entity: &E,
        cancel: Option<&CancellationToken>,
    ) -> Result<ResultEnvelope<E>, ArgumentError> {
        let id = entity.persisted_id().ok_or_else(|| ArgumentError::Invalid {
            name: "entity",
            reason: "entity has no id".to_string(),
        })?;
        let path = self.entity_path(endpoint, id)?;
        let result = self.write(HttpMethod::Put, path.clone(), entity, cancel).await;
        Ok(finish("update", &path, result))
    }

    /// Delete an entity by key. The response body is ignored.
    pub async fn delete(
        &self,
        endpoint: &str,
        id: EntityId,
        cancel: Option<&CancellationToken>,
    ) -> Result<ResultEnvelope<()>, ArgumentError> {
        let path = self.entity_path(endpoint, id)?;
        let result = self
            .execute(HttpRequest::delete(path.clone()), cancel)
            .await
            .map(drop);
        Ok(finish("delete", &path, result))
    }

    pub(crate) fn store_code(&self) -> Option<&str> {
        self.options.store_code.as_deref()
    }

    pub(crate) fn collection_path(&self, endpoint: &str) -> Result<String, ArgumentError> {
        ArgumentError::require("endpoint", endpoint)?;
        compose_in(Namespace::Entity, self.store_code(), endpoint, "", JoinMode::Path)
    }

    fn entity_path(&self, endpoint: &str, id: EntityId) -> Result<String, ArgumentError> {
        ArgumentError::require("endpoint", endpoint)?;
        if id == 0 {
            return Err(ArgumentError::Invalid {
                name: "id",
                reason: "entity id must be non-zero".to_string(),
            });
        }
        compose_segments(
            Namespace::Entity,
            self.store_code(),
            &[endpoint, &id.to_string()],
        )
    }

    async fn write<E: Entity>(
        &self,
        method: HttpMethod,
        path: String,
        entity: &E,
        cancel: Option<&CancellationToken>,
    ) -> Result<E, RepositoryError> {
        let body = wrap_entity(entity)
            .and_then(|value| serde_json::to_string(&value))
            .map_err(RepositoryError::Encode)?;
        self.fetch_json(HttpRequest::json(method, path, body), cancel)
            .await
    }

    pub(crate) async fn fetch_json<R: DeserializeOwned>(
        &self,
        request: HttpRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<R, RepositoryError> {
        let response = self.execute(request, cancel).await?;
        parse_json(&response)
    }

    /// One round-trip, raced against `cancel`, with non-2xx mapped to errors.
    pub(crate) async fn execute(
        &self,
        request: HttpRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<HttpResponse, RepositoryError> {
        debug!(method = request.method.as_str(), path = %request.path, "sending request");
        let response = match cancel {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => return Err(TransportError::Cancelled.into()),
                result = self.transport.execute(request) => result?,
            },
            None => self.transport.execute(request).await?,
        };
        debug!(status = response.status, "received response");
        check_status(response)
    }
}

/// Map a non-2xx response to `RepositoryError::Status`.
pub fn check_status(response: HttpResponse) -> Result<HttpResponse, RepositoryError> {
    if response.is_success() {
        return Ok(response);
    }
    let message = serde_json::from_str::<ErrorDocument>(&response.body)
        .ok()
        .map(|doc| doc.message);
    let description = if response.reason.is_empty() {
        "Unexpected Status".to_string()
    } else {
        response.reason
    };
    Err(RepositoryError::Status {
        status: response.status,
        description,
        message,
    })
}

pub fn parse_json<R: DeserializeOwned>(response: &HttpResponse) -> Result<R, RepositoryError> {
    serde_json::from_str(&response.body).map_err(RepositoryError::Decode)
}

/// Fold an operation outcome into an envelope, logging failures.
pub(crate) fn finish<V>(
    operation: &'static str,
    path: &str,
    result: Result<V, RepositoryError>,
) -> ResultEnvelope<V> {
    if let Err(err) = &result {
        warn!(operation, path, error = %err, "storefront request failed");
    }
    ResultEnvelope::from_result(result)
}
