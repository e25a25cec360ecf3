//! Wire DTOs for the platform's REST API.
//!
//! # Design
//! These types mirror the platform's JSON but are defined independently from
//! the mock-server crate; integration tests catch schema drift between the
//! two. Entities themselves are opaque to this crate: anything serializable
//! that can report its key implements [`Entity`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::http::HttpMethod;

/// Unsigned key assigned by the platform on persistence.
pub type EntityId = u64;

/// A record marshalled through the repository.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    /// Key the platform wraps write payloads in, e.g. `"product"` for
    /// `{"product": {...}}`.
    const ROOT_KEY: &'static str;

    /// Persisted key. `None` before the entity has been created.
    fn id(&self) -> Option<EntityId>;

    /// Key with the unpersisted zero value folded into `None`.
    fn persisted_id(&self) -> Option<EntityId> {
        self.id().filter(|&id| id != 0)
    }
}

/// One page of a collection search.
///
/// `total_count` is informational; pagination never relies on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total_count: Option<u64>,
}

/// Write payload shape: `{"<root_key>": entity}`.
pub(crate) fn wrap_entity<E: Entity>(entity: &E) -> Result<serde_json::Value, serde_json::Error> {
    let mut body = serde_json::Map::with_capacity(1);
    body.insert(E::ROOT_KEY.to_string(), serde_json::to_value(entity)?);
    Ok(serde_json::Value::Object(body))
}

/// The platform's error document.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorDocument {
    pub message: String,
}

/// Kind of write carried by a bulk batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOperationKind {
    Create,
    Update,
    Delete,
}

impl BulkOperationKind {
    pub fn method(self) -> HttpMethod {
        match self {
            BulkOperationKind::Create => HttpMethod::Post,
            BulkOperationKind::Update => HttpMethod::Put,
            BulkOperationKind::Delete => HttpMethod::Delete,
        }
    }
}

/// Acknowledgement of a bulk submission.
///
/// `bulk_uuid` is the only handle to the batch; callers that need to track it
/// durably must store it themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOperationResponse {
    pub bulk_uuid: Uuid,
    #[serde(default)]
    pub request_items: Vec<BulkRequestItem>,
    #[serde(default)]
    pub errors: bool,
}

/// Per-entity acknowledgement within a bulk submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkRequestItem {
    pub id: u64,
    #[serde(default)]
    pub data_hash: Option<String>,
    pub status: String,
}

/// Progress of a bulk batch as reported by the platform.
///
/// Operation items are passed through untouched; their status vocabulary
/// belongs to the platform. Supply a concrete `I` to decode them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkOperationStatus<I = serde_json::Value> {
    pub bulk_id: Uuid,
    pub operations_count: u64,
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub failure_count: u64,
    #[serde(default = "Vec::new")]
    pub items: Vec<I>,
}

impl<I> BulkOperationStatus<I> {
    /// Every operation has either succeeded or failed.
    pub fn is_settled(&self) -> bool {
        self.resolved_count() >= self.operations_count
    }

    pub fn pending_count(&self) -> u64 {
        self.operations_count.saturating_sub(self.resolved_count())
    }

    // Counts come straight from the platform.
    fn resolved_count(&self) -> u64 {
        self.success_count.saturating_add(self.failure_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    struct Product {
        #[serde(default)]
        id: Option<u64>,
        sku: String,
    }

    impl Entity for Product {
        const ROOT_KEY: &'static str = "product";

        fn id(&self) -> Option<EntityId> {
            self.id
        }
    }

    #[test]
    fn zero_id_is_not_persisted() {
        let product = Product {
            id: Some(0),
            sku: "A".to_string(),
        };
        assert_eq!(product.persisted_id(), None);
    }

    #[test]
    fn wrap_entity_uses_root_key() {
        let product = Product {
            id: None,
            sku: "A".to_string(),
        };
        let body = wrap_entity(&product).unwrap();
        assert_eq!(body["product"]["sku"], "A");
    }

    #[test]
    fn search_results_tolerate_missing_fields() {
        let page: SearchResults<Product> = serde_json::from_str("{}").unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, None);
    }

    #[test]
    fn bulk_response_uses_platform_field_names() {
        let raw = r#"{
            "bulk_uuid": "6b5a2a86-0c5b-4f8e-9d4b-0c1e7b1a2f33",
            "request_items": [{"id": 0, "data_hash": "abc", "status": "accepted"}],
            "errors": false
        }"#;
        let response: BulkOperationResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.request_items.len(), 1);
        assert_eq!(response.request_items[0].status, "accepted");
        assert!(!response.errors);
    }

    #[test]
    fn bulk_status_items_are_opaque() {
        let raw = r#"{
            "bulk_id": "6b5a2a86-0c5b-4f8e-9d4b-0c1e7b1a2f33",
            "operations_count": 3,
            "success_count": 1,
            "failure_count": 1,
            "items": [{"id": 1, "status": 4, "vendor_specific": true}]
        }"#;
        let status: BulkOperationStatus = serde_json::from_str(raw).unwrap();
        assert_eq!(status.items[0]["vendor_specific"], true);
        assert!(!status.is_settled());
        assert_eq!(status.pending_count(), 1);
    }

    #[test]
    fn bulk_status_counts_saturate() {
        let raw = r#"{
            "bulk_id": "6b5a2a86-0c5b-4f8e-9d4b-0c1e7b1a2f33",
            "operations_count": 18446744073709551615,
            "success_count": 18446744073709551615,
            "failure_count": 1
        }"#;
        let status: BulkOperationStatus = serde_json::from_str(raw).unwrap();
        assert!(status.is_settled());
        assert_eq!(status.pending_count(), 0);

        let status = BulkOperationStatus::<serde_json::Value> {
            operations_count: u64::MAX,
            success_count: 1,
            failure_count: 0,
            ..status
        };
        assert!(!status.is_settled());
        assert_eq!(status.pending_count(), u64::MAX - 1);
    }

    #[test]
    fn bulk_kind_maps_to_method() {
        assert_eq!(BulkOperationKind::Create.method(), HttpMethod::Post);
        assert_eq!(BulkOperationKind::Update.method(), HttpMethod::Put);
        assert_eq!(BulkOperationKind::Delete.method(), HttpMethod::Delete);
    }
}
