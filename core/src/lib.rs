//! Entity repository layer for a commerce platform's REST API.
//!
//! # Overview
//! Single-entity CRUD, multi-page collection retrieval and asynchronous bulk
//! batches against the platform's `/rest/V1/` and `/rest/async/bulk/V1/`
//! namespaces. Every operation returns a [`ResultEnvelope`]; runtime failures
//! never escape as `Err`.
//!
//! # Design
//! - Requests and responses are plain data (`http`); the round-trip itself is
//!   the [`Transport`] trait, with [`UreqTransport`] as the default.
//! - Paths are composed by `url` and search parameters by `criteria`; there
//!   is exactly one way to build each.
//! - [`RestRepository`] is stateless between calls and safe to share.
//!   [`BlockingRepository`] wraps it for call sites that cannot `.await`.
//! - Argument errors are the only `Err` an operation returns, and they are
//!   returned before any request is sent.

pub mod blocking;
mod bulk;
pub mod config;
pub mod criteria;
pub mod envelope;
pub mod error;
pub mod http;
mod pager;
pub mod repository;
pub mod transport;
pub mod types;
pub mod url;

pub use blocking::BlockingRepository;
pub use config::RepositoryConfig;
pub use criteria::{
    ConditionType, Filter, FilterGroup, PageCursor, SearchCriteria, SortDirection, SortOrder,
};
pub use envelope::{ResultEnvelope, Severity};
pub use error::{ArgumentError, ConfigError, RepositoryError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use repository::{RepositoryOptions, RestRepository};
pub use tokio_util::sync::CancellationToken;
pub use transport::UreqTransport;
pub use types::{
    BulkOperationKind, BulkOperationResponse, BulkOperationStatus, BulkRequestItem, Entity,
    EntityId, SearchResults,
};
