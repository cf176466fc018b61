//! Error kinds surfaced by the sync pipeline.
//!
//! None of these are caught or retried inside the crate: every one aborts the
//! run and reaches the caller with a descriptive message.

use std::fmt;

use gasp_reconcile::ExistingDifferentObject;
use gasp_rows::{FieldError, Row, RowSourceError, ValidationError};

use crate::service::Endpoint;

// ---------------------------------------------------------------------------
// Remote transport / API
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Network or transport failure.
    Transport(String),
    /// The platform answered with an application-level error.
    Api { status: Option<u16>, message: String },
    /// A response payload could not be decoded.
    Decode(String),
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::Transport(msg) => write!(f, "transport error: {msg}"),
            RemoteError::Api {
                status: Some(s),
                message,
            } => write!(f, "ad manager api error status={s}: {message}"),
            RemoteError::Api {
                status: None,
                message,
            } => write!(f, "ad manager api error: {message}"),
            RemoteError::Decode(msg) => write!(f, "decode error: {msg}"),
        }
    }
}

impl std::error::Error for RemoteError {}

// ---------------------------------------------------------------------------
// Lookup miss
// ---------------------------------------------------------------------------

/// A lookup expected exactly one remote match and got zero or several.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectNotFound {
    pub endpoint: Endpoint,
    /// Human-readable conjunction that was queried, e.g. `name == "Acme"`.
    pub criteria: String,
    pub matches: usize,
}

impl fmt::Display for ObjectNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "object not found: {} where {} (expected 1 result, got {})",
            self.endpoint, self.criteria, self.matches
        )
    }
}

impl std::error::Error for ObjectNotFound {}

// ---------------------------------------------------------------------------
// Malformed row input reaching the sync stage
// ---------------------------------------------------------------------------

/// A row value the synchronizer cannot turn into a remote field.
///
/// The Row Validator rejects these up front; this is the backstop for rows
/// handed to a stage without going through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationError {
    pub line: usize,
    pub column: String,
    pub reason: String,
}

impl ConfigurationError {
    pub fn field(row: &Row, column: &str, source: FieldError) -> Self {
        Self {
            line: row.line(),
            column: column.to_string(),
            reason: source.to_string(),
        }
    }

    pub fn reference(row: &Row, column: &str, value: &str) -> Self {
        Self {
            line: row.line(),
            column: column.to_string(),
            reason: format!("references unknown '{value}'"),
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "configuration error: row {} column '{}': {}",
            self.line, self.column, self.reason
        )
    }
}

impl std::error::Error for ConfigurationError {}

// ---------------------------------------------------------------------------
// Unified pipeline error
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum SyncError {
    Rows(RowSourceError),
    ObjectNotFound(ObjectNotFound),
    ExistingDifferentObject(ExistingDifferentObject),
    Configuration(ConfigurationError),
    Remote(RemoteError),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Rows(e) => write!(f, "{e}"),
            SyncError::ObjectNotFound(e) => write!(f, "{e}"),
            SyncError::ExistingDifferentObject(e) => write!(f, "existing different object: {e}"),
            SyncError::Configuration(e) => write!(f, "{e}"),
            SyncError::Remote(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Rows(e) => Some(e),
            SyncError::ObjectNotFound(e) => Some(e),
            SyncError::ExistingDifferentObject(e) => Some(e),
            SyncError::Configuration(e) => Some(e),
            SyncError::Remote(e) => Some(e),
        }
    }
}

impl From<RowSourceError> for SyncError {
    fn from(e: RowSourceError) -> Self {
        SyncError::Rows(e)
    }
}

impl From<ValidationError> for SyncError {
    fn from(e: ValidationError) -> Self {
        SyncError::Rows(RowSourceError::Validation(e))
    }
}

impl From<ObjectNotFound> for SyncError {
    fn from(e: ObjectNotFound) -> Self {
        SyncError::ObjectNotFound(e)
    }
}

impl From<ExistingDifferentObject> for SyncError {
    fn from(e: ExistingDifferentObject) -> Self {
        SyncError::ExistingDifferentObject(e)
    }
}

impl From<ConfigurationError> for SyncError {
    fn from(e: ConfigurationError) -> Self {
        SyncError::Configuration(e)
    }
}

impl From<RemoteError> for SyncError {
    fn from(e: RemoteError) -> Self {
        SyncError::Remote(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::endpoints;

    #[test]
    fn object_not_found_names_endpoint_and_criteria() {
        let err = ObjectNotFound {
            endpoint: endpoints::COMPANIES,
            criteria: "name == \"Acme\"".to_string(),
            matches: 0,
        };
        assert_eq!(
            err.to_string(),
            "object not found: CompanyService.getCompaniesByStatement where name == \"Acme\" \
             (expected 1 result, got 0)"
        );
    }

    #[test]
    fn remote_error_display_api_with_status() {
        let err = RemoteError::Api {
            status: Some(400),
            message: "bad statement".to_string(),
        };
        assert_eq!(err.to_string(), "ad manager api error status=400: bad statement");
    }

    #[test]
    fn configuration_error_from_field_error() {
        let row = Row::new(5, [("targetingKeyValue1", "region")]);
        let err = ConfigurationError::field(
            &row,
            "targetingKeyValue1",
            FieldError::InvalidToken {
                raw: "region".to_string(),
            },
        );
        assert_eq!(err.line, 5);
        assert!(err.to_string().contains("'targetingKeyValue1'"));
        assert!(err.to_string().contains("key!=value"));
    }
}
