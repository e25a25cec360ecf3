//! Uniform success/failure wrapper returned by every repository operation.

use crate::error::RepositoryError;

/// How serious the outcome of an operation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Outcome of a repository operation.
///
/// `is_success()` is derived from the absence of an error, so the two can
/// never disagree. `item` is normally absent on failure; check `is_success()`
/// before reading it.
#[derive(Debug)]
#[must_use]
pub struct ResultEnvelope<T> {
    severity: Severity,
    error: Option<RepositoryError>,
    item: Option<T>,
}

impl<T> ResultEnvelope<T> {
    pub fn success(item: T) -> Self {
        Self {
            severity: Severity::Info,
            error: None,
            item: Some(item),
        }
    }

    pub fn failure(error: RepositoryError) -> Self {
        Self {
            severity: error.severity(),
            error: Some(error),
            item: None,
        }
    }

    /// Failure that still carries whatever payload was obtained.
    pub fn failure_with_item(error: RepositoryError, item: T) -> Self {
        Self {
            severity: error.severity(),
            error: Some(error),
            item: Some(item),
        }
    }

    pub fn from_result(result: Result<T, RepositoryError>) -> Self {
        match result {
            Ok(item) => Self::success(item),
            Err(error) => Self::failure(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn error(&self) -> Option<&RepositoryError> {
        self.error.as_ref()
    }

    pub fn item(&self) -> Option<&T> {
        self.item.as_ref()
    }

    pub fn into_item(self) -> Option<T> {
        self.item
    }

    /// Collapse into a `Result`, discarding any payload carried by a failure.
    pub fn into_result(self) -> Result<Option<T>, RepositoryError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.item),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResultEnvelope<U> {
        ResultEnvelope {
            severity: self.severity,
            error: self.error,
            item: self.item.map(f),
        }
    }
}

impl<T> From<Result<T, RepositoryError>> for ResultEnvelope<T> {
    fn from(result: Result<T, RepositoryError>) -> Self {
        Self::from_result(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;

    fn protocol_error(status: u16) -> RepositoryError {
        RepositoryError::Status {
            status,
            description: "x".to_string(),
            message: None,
        }
    }

    #[test]
    fn success_has_no_error_and_info_severity() {
        let env = ResultEnvelope::success(7);
        assert!(env.is_success());
        assert!(env.error().is_none());
        assert_eq!(env.severity(), Severity::Info);
        assert_eq!(env.item(), Some(&7));
    }

    #[test]
    fn failure_has_error_and_no_item() {
        let env: ResultEnvelope<u8> = ResultEnvelope::failure(TransportError::Timeout.into());
        assert!(!env.is_success());
        assert!(env.error().is_some());
        assert!(env.item().is_none());
        assert_eq!(env.severity(), Severity::Error);
    }

    #[test]
    fn client_errors_are_warnings() {
        let env: ResultEnvelope<()> = ResultEnvelope::failure(protocol_error(404));
        assert_eq!(env.severity(), Severity::Warning);
    }

    #[test]
    fn degenerate_failure_keeps_item_but_is_not_success() {
        let env = ResultEnvelope::failure_with_item(protocol_error(500), vec![1, 2]);
        assert!(!env.is_success());
        assert_eq!(env.item(), Some(&vec![1, 2]));
        assert!(env.into_result().is_err());
    }

    #[test]
    fn from_result_round_trips_both_arms() {
        let ok: ResultEnvelope<&str> = Ok("a").into();
        assert_eq!(ok.into_result().unwrap(), Some("a"));

        let err: ResultEnvelope<&str> = Err(protocol_error(502)).into();
        assert!(matches!(
            err.into_result(),
            Err(RepositoryError::Status { status: 502, .. })
        ));
    }

    #[test]
    fn map_preserves_outcome() {
        let env = ResultEnvelope::success(vec![1, 2, 3]).map(|v| v.len());
        assert_eq!(env.into_item(), Some(3));

        let env: ResultEnvelope<Vec<u8>> = ResultEnvelope::failure(protocol_error(500));
        let mapped = env.map(|v| v.len());
        assert!(!mapped.is_success());
        assert_eq!(mapped.severity(), Severity::Error);
    }
}
