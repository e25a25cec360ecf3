//! In-memory stand-in for the commerce platform's REST API.
//!
//! Serves products under `/rest/V1/products`, asynchronous bulk batches under
//! `/rest/async/bulk/V1/products` and batch status under `/rest/V1/bulk/`.
//! Bulk batches are applied as soon as they are accepted.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Operation status codes reported in bulk status items.
pub const OPERATION_COMPLETE: u8 = 1;
pub const OPERATION_FAILED: u8 = 3;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: u64,
    pub sku: String,
    #[serde(default)]
    pub name: String,
}

/// Write payload: `{"product": {...}}`.
#[derive(Debug, Deserialize)]
pub struct ProductEnvelope {
    pub product: Product,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDocument {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResults {
    pub items: Vec<Product>,
    pub total_count: usize,
    pub search_criteria: PageInfo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PageInfo {
    pub page_size: usize,
    pub current_page: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BulkAck {
    pub bulk_uuid: Uuid,
    pub request_items: Vec<BulkAckItem>,
    pub errors: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BulkAckItem {
    pub id: usize,
    pub data_hash: String,
    pub status: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BulkStatus {
    pub bulk_id: Uuid,
    pub operations_count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub items: Vec<OperationRecord>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: usize,
    pub bulk_uuid: Uuid,
    pub status: u8,
    pub result_message: String,
}

#[derive(Debug, Clone, Copy)]
enum BulkKind {
    Create,
    Update,
    Delete,
}

/// Shared platform state.
#[derive(Debug)]
pub struct Platform {
    products: RwLock<BTreeMap<u64, Product>>,
    bulks: RwLock<HashMap<Uuid, BulkStatus>>,
    next_id: AtomicU64,
    search_requests: AtomicUsize,
}

pub type Db = Arc<Platform>;

type Reply<T> = Result<Json<T>, (StatusCode, Json<ErrorDocument>)>;

impl Platform {
    pub fn shared() -> Db {
        Arc::new(Self {
            products: RwLock::new(BTreeMap::new()),
            bulks: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            search_requests: AtomicUsize::new(0),
        })
    }

    /// Insert `count` products named `SKU-<id>`.
    pub async fn seed(&self, count: u64) {
        let mut products = self.products.write().await;
        for _ in 0..count {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            products.insert(
                id,
                Product {
                    id,
                    sku: format!("SKU-{id}"),
                    name: format!("Product {id}"),
                },
            );
        }
    }

    /// Number of collection searches served so far.
    pub fn search_requests(&self) -> usize {
        self.search_requests.load(Ordering::SeqCst)
    }

    pub async fn product_count(&self) -> usize {
        self.products.read().await.len()
    }
}

pub fn app() -> Router {
    app_with(Platform::shared())
}

pub fn app_with(db: Db) -> Router {
    Router::new()
        .route("/rest/V1/products", get(search_products).post(create_product))
        .route(
            "/rest/V1/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route(
            "/rest/async/bulk/V1/products",
            post(bulk_create).put(bulk_update).delete(bulk_delete),
        )
        .route("/rest/V1/bulk/", get(bulk_status))
        .route("/rest/V1/unavailable", get(unavailable))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, Platform::shared()).await
}

pub async fn run_with(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(db)).await
}

fn error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ErrorDocument>) {
    (
        status,
        Json(ErrorDocument {
            message: message.into(),
        }),
    )
}

fn not_found() -> (StatusCode, Json<ErrorDocument>) {
    error(
        StatusCode::NOT_FOUND,
        "The product that was requested doesn't exist. Verify the product and try again.",
    )
}

/// `(field, value, condition)` triples grouped by filter group.
fn filter_groups(params: &HashMap<String, String>) -> Vec<Vec<(String, String, String)>> {
    let mut groups = Vec::new();
    for g in 0.. {
        let mut filters = Vec::new();
        for f in 0.. {
            let prefix = format!("searchCriteria[filter_groups][{g}][filters][{f}]");
            let Some(field) = params.get(&format!("{prefix}[field]")) else {
                break;
            };
            let value = params.get(&format!("{prefix}[value]")).cloned().unwrap_or_default();
            let condition = params
                .get(&format!("{prefix}[condition_type]"))
                .cloned()
                .unwrap_or_else(|| "eq".to_string());
            filters.push((field.clone(), value, condition));
        }
        if filters.is_empty() {
            break;
        }
        groups.push(filters);
    }
    groups
}

fn matches(product: &Product, field: &str, value: &str, condition: &str) -> bool {
    let actual = match field {
        "sku" => product.sku.clone(),
        "name" => product.name.clone(),
        "id" | "entity_id" => product.id.to_string(),
        _ => return false,
    };
    match condition {
        "eq" => actual == value,
        "neq" => actual != value,
        "like" => actual.contains(value.trim_matches('%')),
        _ => false,
    }
}

fn page_param(params: &HashMap<String, String>, key: &str) -> Option<usize> {
    params
        .get(key)
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&n| n > 0)
}

async fn search_products(
    State(db): State<Db>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<SearchResults> {
    db.search_requests.fetch_add(1, Ordering::SeqCst);
    let groups = filter_groups(&params);
    let products = db.products.read().await;
    let matching: Vec<&Product> = products
        .values()
        .filter(|p| {
            groups.iter().all(|group| {
                group
                    .iter()
                    .any(|(field, value, condition)| matches(p, field, value, condition))
            })
        })
        .collect();

    let total_count = matching.len();
    let page_size = page_param(&params, "searchCriteria[page_size]").unwrap_or(total_count.max(1));
    let current_page = page_param(&params, "searchCriteria[current_page]").unwrap_or(1);
    let items = matching
        .into_iter()
        .skip((current_page - 1).saturating_mul(page_size))
        .take(page_size)
        .cloned()
        .collect();

    Json(SearchResults {
        items,
        total_count,
        search_criteria: PageInfo {
            page_size,
            current_page,
        },
    })
}

async fn create_product(State(db): State<Db>, Json(input): Json<ProductEnvelope>) -> Json<Product> {
    let id = db.next_id.fetch_add(1, Ordering::SeqCst);
    let product = Product {
        id,
        ..input.product
    };
    db.products.write().await.insert(id, product.clone());
    Json(product)
}

async fn get_product(State(db): State<Db>, Path(id): Path<u64>) -> Reply<Product> {
    let products = db.products.read().await;
    products.get(&id).cloned().map(Json).ok_or_else(not_found)
}

async fn update_product(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<ProductEnvelope>,
) -> Reply<Product> {
    let mut products = db.products.write().await;
    let product = products.get_mut(&id).ok_or_else(not_found)?;
    *product = Product {
        id,
        ..input.product
    };
    Ok(Json(product.clone()))
}

async fn delete_product(State(db): State<Db>, Path(id): Path<u64>) -> Reply<bool> {
    let mut products = db.products.write().await;
    products.remove(&id).map(|_| Json(true)).ok_or_else(not_found)
}

async fn bulk_create(
    State(db): State<Db>,
    Json(items): Json<Vec<ProductEnvelope>>,
) -> Result<(StatusCode, Json<BulkAck>), (StatusCode, Json<ErrorDocument>)> {
    run_bulk(&db, items, BulkKind::Create).await
}

async fn bulk_update(
    State(db): State<Db>,
    Json(items): Json<Vec<ProductEnvelope>>,
) -> Result<(StatusCode, Json<BulkAck>), (StatusCode, Json<ErrorDocument>)> {
    run_bulk(&db, items, BulkKind::Update).await
}

async fn bulk_delete(
    State(db): State<Db>,
    Json(items): Json<Vec<ProductEnvelope>>,
) -> Result<(StatusCode, Json<BulkAck>), (StatusCode, Json<ErrorDocument>)> {
    run_bulk(&db, items, BulkKind::Delete).await
}

async fn run_bulk(
    db: &Platform,
    items: Vec<ProductEnvelope>,
    kind: BulkKind,
) -> Result<(StatusCode, Json<BulkAck>), (StatusCode, Json<ErrorDocument>)> {
    if items.is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "The request body is empty."));
    }
    let bulk_uuid = Uuid::new_v4();
    let mut request_items = Vec::with_capacity(items.len());
    let mut operations = Vec::with_capacity(items.len());

    let mut products = db.products.write().await;
    for (index, ProductEnvelope { product }) in items.into_iter().enumerate() {
        let mut hasher = DefaultHasher::new();
        product.hash(&mut hasher);
        request_items.push(BulkAckItem {
            id: index,
            data_hash: format!("{:016x}", hasher.finish()),
            status: "accepted".to_string(),
        });

        let outcome = match kind {
            BulkKind::Create => {
                let id = db.next_id.fetch_add(1, Ordering::SeqCst);
                products.insert(id, Product { id, ..product });
                Ok(())
            }
            BulkKind::Update => match products.get_mut(&product.id) {
                Some(existing) => {
                    *existing = product;
                    Ok(())
                }
                None => Err(format!("product {} does not exist", product.id)),
            },
            BulkKind::Delete => products
                .remove(&product.id)
                .map(drop)
                .ok_or_else(|| format!("product {} does not exist", product.id)),
        };
        let (status, result_message) = match outcome {
            Ok(()) => (OPERATION_COMPLETE, "Success".to_string()),
            Err(message) => (OPERATION_FAILED, message),
        };
        operations.push(OperationRecord {
            id: index,
            bulk_uuid,
            status,
            result_message,
        });
    }
    drop(products);

    let success_count = operations
        .iter()
        .filter(|op| op.status == OPERATION_COMPLETE)
        .count();
    let status = BulkStatus {
        bulk_id: bulk_uuid,
        operations_count: operations.len(),
        success_count,
        failure_count: operations.len() - success_count,
        items: operations,
    };
    db.bulks.write().await.insert(bulk_uuid, status);
    tracing::info!(%bulk_uuid, ?kind, operations = request_items.len(), "bulk batch applied");

    Ok((
        StatusCode::ACCEPTED,
        Json(BulkAck {
            bulk_uuid,
            request_items,
            errors: false,
        }),
    ))
}

async fn bulk_status(
    State(db): State<Db>,
    Query(params): Query<HashMap<String, String>>,
) -> Reply<BulkStatus> {
    let bulk_uuid = filter_groups(&params)
        .into_iter()
        .flatten()
        .find(|(field, _, condition)| field == "bulk_uuid" && condition == "eq")
        .map(|(_, value, _)| value)
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, "A bulk_uuid filter is required."))?;
    let bulk_uuid: Uuid = bulk_uuid
        .parse()
        .map_err(|_| error(StatusCode::BAD_REQUEST, format!("`{bulk_uuid}` is not a UUID.")))?;

    let bulks = db.bulks.read().await;
    bulks.get(&bulk_uuid).cloned().map(Json).ok_or_else(|| {
        error(
            StatusCode::NOT_FOUND,
            format!("Bulk operation {bulk_uuid} was not found."),
        )
    })
}

async fn unavailable() -> (StatusCode, Json<ErrorDocument>) {
    error(
        StatusCode::SERVICE_UNAVAILABLE,
        "The service is temporarily unavailable.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn product_envelope_requires_root_key() {
        let ok: Result<ProductEnvelope, _> =
            serde_json::from_str(r#"{"product":{"sku":"A"}}"#);
        assert_eq!(ok.unwrap().product.sku, "A");

        let bare: Result<ProductEnvelope, _> = serde_json::from_str(r#"{"sku":"A"}"#);
        assert!(bare.is_err());
    }

    #[test]
    fn product_id_defaults_to_zero() {
        let product: Product = serde_json::from_str(r#"{"sku":"A"}"#).unwrap();
        assert_eq!(product.id, 0);
        assert!(product.name.is_empty());
    }

    #[test]
    fn filter_groups_are_read_in_index_order() {
        let groups = filter_groups(&params(&[
            ("searchCriteria[filter_groups][0][filters][0][field]", "sku"),
            ("searchCriteria[filter_groups][0][filters][0][value]", "A"),
            ("searchCriteria[filter_groups][0][filters][1][field]", "sku"),
            ("searchCriteria[filter_groups][0][filters][1][value]", "B"),
            ("searchCriteria[filter_groups][0][filters][1][condition_type]", "neq"),
            ("searchCriteria[filter_groups][1][filters][0][field]", "name"),
            ("searchCriteria[filter_groups][1][filters][0][value]", "%x%"),
            ("searchCriteria[filter_groups][1][filters][0][condition_type]", "like"),
        ]));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[0][0], ("sku".to_string(), "A".to_string(), "eq".to_string()));
        assert_eq!(groups[0][1].2, "neq");
        assert_eq!(groups[1][0].2, "like");
    }

    #[test]
    fn like_strips_wildcards() {
        let product = Product {
            id: 1,
            sku: "RED-SHIRT".to_string(),
            name: String::new(),
        };
        assert!(matches(&product, "sku", "%SHIRT%", "like"));
        assert!(!matches(&product, "sku", "SHIRT", "eq"));
        assert!(matches(&product, "id", "1", "eq"));
        assert!(!matches(&product, "color", "red", "eq"));
    }

    #[test]
    fn page_param_ignores_zero_and_garbage() {
        let p = params(&[("a", "0"), ("b", "x"), ("c", "5")]);
        assert_eq!(page_param(&p, "a"), None);
        assert_eq!(page_param(&p, "b"), None);
        assert_eq!(page_param(&p, "c"), Some(5));
    }
}
