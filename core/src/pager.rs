//! Collection search and multi-page retrieval.
//!
//! The platform does not reliably report how many pages a collection spans,
//! and `total_count` is informational only. `fetch_all` therefore walks pages
//! until one comes back empty or shorter than the page size. A server that
//! always returns full pages would keep the loop going forever; configure
//! `RepositoryOptions::max_pages` to bound it.

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::criteria::{PageCursor, SearchCriteria};
use crate::envelope::ResultEnvelope;
use crate::error::{ArgumentError, RepositoryError, TransportError};
use crate::http::{HttpRequest, Transport};
use crate::repository::{finish, RestRepository};
use crate::types::SearchResults;
use crate::url::append_query;

impl<T: Transport> RestRepository<T> {
    /// Run one search against a collection endpoint.
    pub async fn search<E>(
        &self,
        endpoint: &str,
        criteria: &SearchCriteria,
        cancel: Option<&CancellationToken>,
    ) -> Result<ResultEnvelope<SearchResults<E>>, ArgumentError>
    where
        E: DeserializeOwned + Send,
    {
        let path = append_query(self.collection_path(endpoint)?, &criteria.to_query_string());
        let result = self.fetch_json(HttpRequest::get(path.clone()), cancel).await;
        Ok(finish("search", &path, result))
    }

    /// Retrieve every item of a collection, one page at a time.
    ///
    /// `page_size` falls back to the repository default, then to 200. Any
    /// failure discards the pages gathered so far.
    pub async fn fetch_all<E>(
        &self,
        endpoint: &str,
        page_size: Option<u32>,
        cancel: Option<&CancellationToken>,
    ) -> Result<ResultEnvelope<Vec<E>>, ArgumentError>
    where
        E: DeserializeOwned + Send,
    {
        let base = self.collection_path(endpoint)?;
        let cursor = PageCursor::new(page_size.or(self.options().default_page_size));
        let result = self.walk_pages(&base, cursor, cancel).await;
        Ok(finish("fetch_all", &base, result))
    }

    async fn walk_pages<E>(
        &self,
        base: &str,
        mut cursor: PageCursor,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<E>, RepositoryError>
    where
        E: DeserializeOwned + Send,
    {
        let max_pages = self.options().max_pages.filter(|&n| n > 0);
        let mut accumulated = Vec::new();
        loop {
            if let Some(max_pages) = max_pages {
                if cursor.current_page() > max_pages {
                    return Err(RepositoryError::PageLimitExceeded { max_pages });
                }
            }
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(TransportError::Cancelled.into());
            }

            let path = append_query(
                base.to_string(),
                &SearchCriteria::for_page(&cursor).to_query_string(),
            );
            let page: SearchResults<E> = self.fetch_json(HttpRequest::get(path), cancel).await?;
            let received = page.items.len();
            debug!(
                page = cursor.current_page(),
                received,
                total_count = ?page.total_count,
                "fetched page"
            );

            if received == 0 {
                break;
            }
            accumulated.extend(page.items);
            if received < cursor.page_size() as usize {
                break;
            }
            cursor.advance();
        }
        info!(
            path = base,
            pages = cursor.current_page(),
            items = accumulated.len(),
            "collection fetched"
        );
        Ok(accumulated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::tests::{ok, product, Product, ScriptedTransport};
    use crate::repository::RepositoryOptions;

    fn page_body(ids: std::ops::Range<u64>, total: u64) -> String {
        let items: Vec<Product> = ids.map(product).collect();
        serde_json::json!({ "items": items, "total_count": total }).to_string()
    }

    #[tokio::test]
    async fn walks_until_short_page() {
        let transport = ScriptedTransport::new([
            ok(200, page_body(1..201, 450)),
            ok(200, page_body(201..401, 450)),
            ok(200, page_body(401..451, 450)),
        ]);
        let repo = RestRepository::new(transport.clone());
        let env = repo
            .fetch_all::<Product>("products", Some(200), None)
            .await
            .unwrap();

        let items = env.into_item().unwrap();
        assert_eq!(items.len(), 450);
        assert!(items.iter().enumerate().all(|(i, p)| p.id == Some(i as u64 + 1)));

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(
            requests[2].path,
            "/rest/V1/products?searchCriteria[page_size]=200&searchCriteria[current_page]=3"
        );
    }

    #[tokio::test]
    async fn empty_first_page_is_success_after_one_request() {
        let transport = ScriptedTransport::new([ok(200, r#"{"items":[],"total_count":0}"#)]);
        let repo = RestRepository::new(transport.clone());
        let env = repo
            .fetch_all::<Product>("products", None, None)
            .await
            .unwrap();

        assert!(env.is_success());
        assert!(env.item().unwrap().is_empty());
        assert_eq!(transport.requests().len(), 1);
        assert!(transport.requests()[0]
            .path
            .contains("searchCriteria[page_size]=200"));
    }

    #[tokio::test]
    async fn exact_multiple_stops_on_empty_page() {
        let transport = ScriptedTransport::new([
            ok(200, page_body(1..3, 4)),
            ok(200, page_body(3..5, 4)),
            ok(200, page_body(0..0, 4)),
        ]);
        let repo = RestRepository::new(transport.clone());
        let env = repo
            .fetch_all::<Product>("products", Some(2), None)
            .await
            .unwrap();
        assert_eq!(env.into_item().unwrap().len(), 4);
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn failure_mid_walk_discards_partial_results() {
        let transport = ScriptedTransport::new([
            ok(200, page_body(1..3, 10)),
            ok(500, r#"{"message":"boom"}"#),
        ]);
        let repo = RestRepository::new(transport.clone());
        let env = repo
            .fetch_all::<Product>("products", Some(2), None)
            .await
            .unwrap();

        assert!(!env.is_success());
        assert!(env.item().is_none());
        assert_eq!(env.error().unwrap().status(), Some(500));
    }

    #[tokio::test]
    async fn page_ceiling_fails_the_fetch() {
        let transport = ScriptedTransport::new([
            ok(200, page_body(1..3, 99)),
            ok(200, page_body(3..5, 99)),
        ]);
        let repo = RestRepository::with_options(
            transport.clone(),
            RepositoryOptions {
                max_pages: Some(2),
                ..RepositoryOptions::default()
            },
        );
        let env = repo
            .fetch_all::<Product>("products", Some(2), None)
            .await
            .unwrap();

        assert!(matches!(
            env.error(),
            Some(RepositoryError::PageLimitExceeded { max_pages: 2 })
        ));
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn default_page_size_comes_from_options() {
        let transport = ScriptedTransport::new([ok(200, page_body(1..2, 1))]);
        let repo = RestRepository::with_options(
            transport.clone(),
            RepositoryOptions {
                default_page_size: Some(25),
                ..RepositoryOptions::default()
            },
        );
        let env = repo
            .fetch_all::<Product>("products", None, None)
            .await
            .unwrap();
        assert!(env.is_success());
        assert!(transport.requests()[0]
            .path
            .contains("searchCriteria[page_size]=25"));
    }

    #[tokio::test]
    async fn cancellation_is_checked_before_each_page() {
        let transport = ScriptedTransport::default();
        let token = CancellationToken::new();
        token.cancel();
        let repo = RestRepository::new(transport.clone());
        let env = repo
            .fetch_all::<Product>("products", None, Some(&token))
            .await
            .unwrap();
        assert!(env.error().unwrap().is_cancelled());
        assert!(transport.requests().is_empty());
    }

    /// Cancels `token` as soon as the first response is handed back.
    struct CancelAfterFirst {
        inner: ScriptedTransport,
        token: CancellationToken,
    }

    #[async_trait::async_trait]
    impl Transport for CancelAfterFirst {
        async fn execute(
            &self,
            request: HttpRequest,
        ) -> Result<crate::http::HttpResponse, TransportError> {
            let response = self.inner.execute(request).await;
            self.token.cancel();
            response
        }
    }

    #[tokio::test]
    async fn cancellation_between_pages_stops_the_walk() {
        let inner = ScriptedTransport::new([
            ok(200, page_body(1..3, 6)),
            ok(200, page_body(3..5, 6)),
        ]);
        let token = CancellationToken::new();
        let repo = RestRepository::new(CancelAfterFirst {
            inner: inner.clone(),
            token: token.clone(),
        });

        let env = repo
            .fetch_all::<Product>("products", Some(2), Some(&token))
            .await
            .unwrap();

        assert!(env.item().is_none());
        assert!(env.error().unwrap().is_cancelled());
        assert_eq!(inner.requests().len(), 1);
    }

    #[tokio::test]
    async fn empty_endpoint_is_rejected_before_any_request() {
        let transport = ScriptedTransport::default();
        let repo = RestRepository::new(transport.clone());
        let err = repo
            .fetch_all::<Product>("", None, None)
            .await
            .unwrap_err();
        assert_eq!(err, ArgumentError::Empty { name: "endpoint" });
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn search_returns_single_page_with_total() {
        let transport = ScriptedTransport::new([ok(200, page_body(1..3, 40))]);
        let repo = RestRepository::new(transport.clone());
        let criteria = SearchCriteria::new()
            .filter(crate::criteria::Filter::eq("sku", "SKU-1"))
            .with_page(&PageCursor::new(Some(2)));
        let env = repo
            .search::<Product>("products", &criteria, None)
            .await
            .unwrap();

        let page = env.into_item().unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_count, Some(40));
        assert!(transport.requests()[0]
            .path
            .starts_with("/rest/V1/products?searchCriteria[filter_groups][0][filters][0][field]=sku"));
    }
}
