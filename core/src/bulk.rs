//! Asynchronous bulk batches: submit once, then poll by correlation id.
//!
//! A batch is either accepted (the platform returns a `bulk_uuid`) or it is
//! not; nothing is retried or re-queued here. Each `poll_bulk_status` call
//! performs exactly one lookup. How often to poll, and when to give up, is
//! the caller's decision.

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::criteria::SearchCriteria;
use crate::envelope::ResultEnvelope;
use crate::error::{ArgumentError, RepositoryError};
use crate::http::{HttpRequest, Transport};
use crate::repository::{finish, RestRepository};
use crate::types::{
    wrap_entity, BulkOperationKind, BulkOperationResponse, BulkOperationStatus, Entity,
};
use crate::url::{compose_in, JoinMode, Namespace};

impl<T: Transport> RestRepository<T> {
    /// Submit `entities` as one bulk batch of `kind`.
    pub async fn submit_bulk<E: Entity>(
        &self,
        endpoint: &str,
        entities: &[E],
        kind: BulkOperationKind,
        cancel: Option<&CancellationToken>,
    ) -> Result<ResultEnvelope<BulkOperationResponse>, ArgumentError> {
        ArgumentError::require("endpoint", endpoint)?;
        if entities.is_empty() {
            return Err(ArgumentError::Empty { name: "entities" });
        }
        let path = compose_in(
            Namespace::BulkSubmit,
            self.store_code(),
            endpoint,
            "",
            JoinMode::Path,
        )?;

        let result = self.send_batch(path.clone(), entities, kind, cancel).await;
        if let Ok(ack) = &result {
            info!(
                bulk_uuid = %ack.bulk_uuid,
                ?kind,
                operations = entities.len(),
                rejected = ack.errors,
                "bulk batch accepted"
            );
        }
        Ok(finish("submit_bulk", &path, result))
    }

    /// Look up the progress of one batch.
    ///
    /// `store_code` overrides the repository's store for this lookup only.
    pub async fn poll_bulk_status(
        &self,
        bulk_id: Uuid,
        store_code: Option<&str>,
        cancel: Option<&CancellationToken>,
    ) -> Result<ResultEnvelope<BulkOperationStatus>, ArgumentError> {
        self.poll_bulk_status_as(bulk_id, store_code, cancel).await
    }

    /// As [`poll_bulk_status`](Self::poll_bulk_status), decoding operation
    /// items into `I`.
    pub async fn poll_bulk_status_as<I>(
        &self,
        bulk_id: Uuid,
        store_code: Option<&str>,
        cancel: Option<&CancellationToken>,
    ) -> Result<ResultEnvelope<BulkOperationStatus<I>>, ArgumentError>
    where
        I: DeserializeOwned + Send,
    {
        if bulk_id.is_nil() {
            return Err(ArgumentError::Empty { name: "bulk_id" });
        }
        let path = compose_in(
            Namespace::BulkStatus,
            store_code.or(self.store_code()),
            "",
            &SearchCriteria::bulk_uuid(bulk_id).to_query_string(),
            JoinMode::Query,
        )?;

        let result = self
            .fetch_json::<BulkOperationStatus<I>>(HttpRequest::get(path.clone()), cancel)
            .await
            .and_then(|status| {
                if status.bulk_id == bulk_id {
                    Ok(status)
                } else {
                    Err(RepositoryError::CorrelationMismatch {
                        expected: bulk_id,
                        actual: status.bulk_id,
                    })
                }
            });
        Ok(finish("poll_bulk_status", &path, result))
    }

    async fn send_batch<E: Entity>(
        &self,
        path: String,
        entities: &[E],
        kind: BulkOperationKind,
        cancel: Option<&CancellationToken>,
    ) -> Result<BulkOperationResponse, RepositoryError> {
        let items = entities
            .iter()
            .map(wrap_entity)
            .collect::<Result<Vec<_>, _>>()
            .map_err(RepositoryError::Encode)?;
        let body = serde_json::to_string(&items).map_err(RepositoryError::Encode)?;
        self.fetch_json(HttpRequest::json(kind.method(), path, body), cancel)
            .await
    }
}
