//! Request path composition for the platform's REST namespaces.
//!
//! Paths are host-relative. Every composed path starts with one of three
//! fixed namespace roots, optionally scoped by a store code, followed by the
//! caller's endpoint and fragment joined without doubled separators.

use crate::error::ArgumentError;

pub const ENTITY_ROOT: &str = "/rest/V1/";
pub const BULK_SUBMIT_ROOT: &str = "/rest/async/bulk/V1/";
pub const BULK_STATUS_ROOT: &str = "/rest/V1/bulk/";

/// Which namespace root a path is composed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// Ordinary entity operations, `/rest/V1/`.
    Entity,
    /// Asynchronous bulk submission, `/rest/async/bulk/V1/`.
    BulkSubmit,
    /// Bulk status lookup, `/rest/V1/bulk/`.
    BulkStatus,
}

impl Namespace {
    /// Root for this namespace. A blank store code yields the unscoped root.
    pub fn root(self, store_code: Option<&str>) -> String {
        match store_code.map(str::trim).filter(|s| !s.is_empty()) {
            None => match self {
                Namespace::Entity => ENTITY_ROOT.to_string(),
                Namespace::BulkSubmit => BULK_SUBMIT_ROOT.to_string(),
                Namespace::BulkStatus => BULK_STATUS_ROOT.to_string(),
            },
            Some(store) => match self {
                Namespace::Entity => format!("/rest/{store}/V1/"),
                Namespace::BulkSubmit => format!("/rest/{store}/async/bulk/V1/"),
                Namespace::BulkStatus => format!("/rest/{store}/V1/bulk/"),
            },
        }
    }
}

/// How a fragment is attached to the base path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinMode {
    /// Fragment is a further path segment.
    Path,
    /// Fragment is a query string.
    Query,
}

/// Compose a path in the entity namespace.
///
/// ```
/// use storefront_core::url::{compose, JoinMode};
///
/// assert_eq!(compose("orders/", "/search", JoinMode::Path).unwrap(), "/rest/V1/orders/search");
/// assert_eq!(compose("orders", "search", JoinMode::Path).unwrap(), "/rest/V1/orders/search");
/// ```
///
/// # Errors
/// `ArgumentError::Empty` when both `base_path` and `fragment` are empty.
pub fn compose(base_path: &str, fragment: &str, mode: JoinMode) -> Result<String, ArgumentError> {
    compose_in(Namespace::Entity, None, base_path, fragment, mode)
}

/// Compose a path under `namespace`, optionally scoped to `store_code`.
///
/// `base_path` may be empty only when `fragment` is not.
pub fn compose_in(
    namespace: Namespace,
    store_code: Option<&str>,
    base_path: &str,
    fragment: &str,
    mode: JoinMode,
) -> Result<String, ArgumentError> {
    if base_path.trim().is_empty() && fragment.trim().is_empty() {
        return Err(ArgumentError::Empty { name: "base_path" });
    }
    let mut path = namespace.root(store_code);
    path.push_str(base_path.trim().trim_start_matches('/'));
    Ok(join(path, fragment.trim(), mode))
}

/// Compose a path from ordered segments.
///
/// The first segment goes through [`compose_in`]; later non-empty segments
/// are appended with a `/` separator, and any `//` left over is collapsed.
pub fn compose_segments(
    namespace: Namespace,
    store_code: Option<&str>,
    segments: &[&str],
) -> Result<String, ArgumentError> {
    let (first, rest) = segments
        .split_first()
        .ok_or(ArgumentError::Empty { name: "segments" })?;
    let mut path = compose_in(namespace, store_code, first, "", JoinMode::Path)?;
    for segment in rest.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if !segment.starts_with('/') {
            path.push('/');
        }
        path.push_str(segment);
    }
    while path.contains("//") {
        path = path.replace("//", "/");
    }
    Ok(path)
}

/// Attach a query string to an already composed path.
pub fn append_query(path: String, query: &str) -> String {
    join(path, query.trim(), JoinMode::Query)
}

fn join(mut path: String, fragment: &str, mode: JoinMode) -> String {
    if fragment.is_empty() {
        return path;
    }
    match mode {
        JoinMode::Path => {
            let base_sep = path.ends_with(['/', '?']);
            let frag_sep = fragment.starts_with(['/', '?']);
            match (base_sep, frag_sep) {
                (true, true) => path.push_str(&fragment[1..]),
                (false, false) => {
                    path.push('/');
                    path.push_str(fragment);
                }
                _ => path.push_str(fragment),
            }
        }
        JoinMode::Query => {
            if !path.ends_with(['?', '&']) {
                path.push(if path.contains('?') { '&' } else { '?' });
            }
            path.push_str(fragment.trim_start_matches(['?', '&']));
        }
    }
    path
}
