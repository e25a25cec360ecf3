//! Synchronous facade over [`RestRepository`].
//!
//! # Design
//! The async repository stays the single implementation; every blocking
//! method drives the matching async call to completion on a runtime owned by
//! the facade. When the calling thread is itself a tokio worker, blocking it
//! on another runtime would panic (or starve a single-threaded reactor), so
//! the call is moved to a scoped helper thread and only that thread blocks.

use std::future::Future;

use serde::de::DeserializeOwned;
use tokio::runtime::{Builder, Handle, Runtime};
use uuid::Uuid;

use crate::criteria::SearchCriteria;
use crate::envelope::ResultEnvelope;
use crate::error::{ArgumentError, TransportError};
use crate::http::Transport;
use crate::repository::RestRepository;
use crate::types::{
    BulkOperationKind, BulkOperationResponse, BulkOperationStatus, Entity, EntityId,
    SearchResults,
};

/// Blocking twin of [`RestRepository`]. Cancellation is not offered here.
pub struct BlockingRepository<T> {
    inner: RestRepository<T>,
    // `None` once released; calls then fail without sending anything.
    runtime: Option<Runtime>,
}

impl<T: Transport> BlockingRepository<T> {
    /// # Errors
    /// Fails when the dedicated runtime cannot be started.
    pub fn new(inner: RestRepository<T>) -> std::io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("storefront-blocking")
            .enable_all()
            .build()?;
        Ok(Self {
            inner,
            runtime: Some(runtime),
        })
    }

    pub fn inner(&self) -> &RestRepository<T> {
        &self.inner
    }

    pub fn get<E: Entity>(
        &self,
        endpoint: &str,
        id: EntityId,
    ) -> Result<ResultEnvelope<E>, ArgumentError> {
        self.run(self.inner.get(endpoint, id, None))
    }

    pub fn create<E: Entity>(
        &self,
        endpoint: &str,
        entity: &E,
    ) -> Result<ResultEnvelope<E>, ArgumentError> {
        self.run(self.inner.create(endpoint, entity, None))
    }

    pub fn update<E: Entity>(
        &self,
        endpoint: &str,
        entity: &E,
    ) -> Result<ResultEnvelope<E>, ArgumentError> {
        self.run(self.inner.update(endpoint, entity, None))
    }

    pub fn delete(&self, endpoint: &str, id: EntityId) -> Result<ResultEnvelope<()>, ArgumentError> {
        self.run(self.inner.delete(endpoint, id, None))
    }

    pub fn search<E: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        criteria: &SearchCriteria,
    ) -> Result<ResultEnvelope<SearchResults<E>>, ArgumentError> {
        self.run(self.inner.search(endpoint, criteria, None))
    }

    pub fn fetch_all<E: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        page_size: Option<u32>,
    ) -> Result<ResultEnvelope<Vec<E>>, ArgumentError> {
        self.run(self.inner.fetch_all(endpoint, page_size, None))
    }

    pub fn submit_bulk<E: Entity>(
        &self,
        endpoint: &str,
        entities: &[E],
        kind: BulkOperationKind,
    ) -> Result<ResultEnvelope<BulkOperationResponse>, ArgumentError> {
        self.run(self.inner.submit_bulk(endpoint, entities, kind, None))
    }

    pub fn poll_bulk_status(
        &self,
        bulk_id: Uuid,
        store_code: Option<&str>,
    ) -> Result<ResultEnvelope<BulkOperationStatus>, ArgumentError> {
        self.run(self.inner.poll_bulk_status(bulk_id, store_code, None))
    }

    fn run<V, F>(&self, future: F) -> Result<ResultEnvelope<V>, ArgumentError>
    where
        V: Send,
        F: Future<Output = Result<ResultEnvelope<V>, ArgumentError>> + Send,
    {
        let Some(runtime) = self.runtime.as_ref() else {
            return Ok(ResultEnvelope::failure(
                TransportError::Join("blocking runtime has shut down".to_string()).into(),
            ));
        };
        if Handle::try_current().is_err() {
            return runtime.block_on(future);
        }
        std::thread::scope(|scope| {
            match scope.spawn(move || runtime.block_on(future)).join() {
                Ok(output) => output,
                Err(panic) => std::panic::resume_unwind(panic),
            }
        })
    }
}

impl<T> Drop for BlockingRepository<T> {
    fn drop(&mut self) {
        // Dropping a runtime blocks, which panics inside an async context.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RepositoryError;
    use crate::repository::tests::{ok, product, Product, ScriptedTransport};

    fn blocking(transport: &ScriptedTransport) -> BlockingRepository<ScriptedTransport> {
        BlockingRepository::new(RestRepository::new(transport.clone())).unwrap()
    }

    #[test]
    fn runs_from_plain_thread() {
        let transport = ScriptedTransport::new([ok(200, r#"{"id":1,"sku":"SKU-1"}"#)]);
        let env = blocking(&transport).get::<Product>("products", 1).unwrap();
        assert_eq!(env.into_item(), Some(product(1)));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn runs_from_inside_single_threaded_runtime() {
        let transport = ScriptedTransport::new([ok(200, r#"{"items":[],"total_count":0}"#)]);
        let repo = blocking(&transport);
        let env = repo.fetch_all::<Product>("products", None).unwrap();
        assert!(env.is_success());
        assert_eq!(transport.requests().len(), 1);
        drop(repo);
    }

    #[test]
    fn released_runtime_yields_failure_envelope() {
        let transport = ScriptedTransport::default();
        let mut repo = blocking(&transport);
        if let Some(runtime) = repo.runtime.take() {
            runtime.shutdown_background();
        }

        let env = repo.get::<Product>("products", 1).unwrap();

        assert!(!env.is_success());
        assert!(matches!(
            env.error(),
            Some(RepositoryError::Transport(TransportError::Join(_)))
        ));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn argument_errors_surface_synchronously() {
        let transport = ScriptedTransport::default();
        let err = blocking(&transport)
            .fetch_all::<Product>(" ", None)
            .unwrap_err();
        assert_eq!(err, ArgumentError::Empty { name: "endpoint" });
        assert!(transport.requests().is_empty());
    }
}
