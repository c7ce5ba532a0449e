//! Error types for the feedback API client.
//!
//! # Design
//! Every failure a caller can see collapses into one `ApiError` whose
//! `Display` is the human-readable message a form renders inline. The
//! variants keep enough structure (status, field details) for callers that
//! want to branch, but none of them are required for display.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::store::StoreError;

/// Per-field validation messages returned by the backend under `details`.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Errors returned by `ApiClient` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response (host unreachable, I/O).
    #[error("network error: {0}")]
    Transport(String),

    /// The backend answered with a non-2xx status. `message` is already the
    /// best human-readable text available for the failure.
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        details: Option<FieldErrors>,
    },

    /// A 2xx response body did not match the expected shape.
    #[error("unexpected response from server: {0}")]
    Deserialization(String),

    /// The request payload could not be encoded as JSON.
    #[error("could not encode request: {0}")]
    Serialization(String),

    /// The bearer token could not be persisted.
    #[error("could not store session: {0}")]
    Storage(#[from] StoreError),
}

impl ApiError {
    /// HTTP status for `Http` failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn details(&self) -> Option<&FieldErrors> {
        match self {
            ApiError::Http { details, .. } => details.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_displays_bare_message() {
        let err = ApiError::Http {
            status: 401,
            message: "Invalid credentials".to_string(),
            details: None,
        };
        assert_eq!(err.to_string(), "Invalid credentials");
        assert!(err.is_unauthorized());
        assert!(!err.is_not_found());
    }

    #[test]
    fn details_only_on_http_errors() {
        let mut details = FieldErrors::new();
        details.insert("email".to_string(), vec!["is taken".to_string()]);
        let err = ApiError::Http {
            status: 422,
            message: "Validation failed".to_string(),
            details: Some(details),
        };
        assert_eq!(err.details().unwrap()["email"], vec!["is taken"]);
        assert!(ApiError::Transport("refused".to_string()).details().is_none());
        assert_eq!(ApiError::Transport("refused".to_string()).status(), None);
    }
}
