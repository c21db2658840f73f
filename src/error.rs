//! Error types for configuration deployment.
//!
//! No `anyhow` leakage. Explicit, typed errors.

use crate::resolve::ResourceKind;
use std::time::Duration;

/// Failure reported by the remote configuration service.
///
/// `code` is the service's error code string (e.g. `ThrottlingException`),
/// when the transport exposes one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}{message}", .code.as_deref().map(|c| format!("{c}: ")).unwrap_or_default())]
pub struct RemoteError {
    pub code: Option<String>,
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("{kind} '{name}' not found")]
    NotFound { kind: ResourceKind, name: String },

    #[error("found {count} {} named '{name}'; use a unique name or ID", .kind.plural())]
    Ambiguous {
        kind: ResourceKind,
        name: String,
        count: usize,
    },

    #[error("{operation} failed: {source}")]
    Remote {
        operation: &'static str,
        #[source]
        source: RemoteError,
    },

    #[error("invalid configuration version number: '{0}'")]
    InvalidVersionNumber(String),

    #[error("deployment #{deployment_number} was rolled back{}", .reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    RolledBack {
        deployment_number: i32,
        reason: Option<String>,
    },

    #[error("timed out after {timeout:?} waiting for deployment #{deployment_number}")]
    TimedOut {
        deployment_number: i32,
        timeout: Duration,
    },

    #[error("deployment #{deployment_number} reported unexpected state '{state}'")]
    UnexpectedState {
        deployment_number: i32,
        state: String,
    },

    #[error("wait for deployment #{deployment_number} was cancelled")]
    Cancelled { deployment_number: i32 },

    #[error("{operation}: gave up after {pages} pages without reaching the end of the listing")]
    PaginationLimitExceeded {
        operation: &'static str,
        pages: usize,
    },

    #[error("deployment #{deployment_number} is already in progress for this environment")]
    DeploymentInProgress { deployment_number: i32 },

    #[error("no deployment strategy resolved; cannot start a deployment")]
    MissingDeploymentStrategy,
}

impl DeployError {
    /// Wrap a transport failure with the name of the remote operation.
    pub fn remote(operation: &'static str, source: RemoteError) -> Self {
        DeployError::Remote { operation, source }
    }

    /// Whether this error might be recoverable by retry.
    pub fn is_recoverable(&self) -> bool {
        match self {
            DeployError::Remote { .. } => matches!(classify(self), ErrorKind::Throttling),
            DeployError::TimedOut { .. }
            | DeployError::Cancelled { .. }
            | DeployError::DeploymentInProgress { .. } => true,
            _ => false,
        }
    }
}

/// Closed classification of failures, independent of any transport SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AccessDenied,
    Throttling,
    Validation,
    NotFound,
    Conflict,
    Other,
}

/// Classify an error by the remote service's error code.
///
/// Local resolution failures map onto the same vocabulary so callers can
/// branch on one enum.
pub fn classify(err: &DeployError) -> ErrorKind {
    match err {
        DeployError::Remote { source, .. } => match source.code.as_deref() {
            Some("AccessDeniedException" | "UnauthorizedException" | "ExpiredTokenException") => {
                ErrorKind::AccessDenied
            }
            Some(
                "ThrottlingException"
                | "TooManyRequestsException"
                | "ServiceQuotaExceededException",
            ) => ErrorKind::Throttling,
            Some("ValidationException" | "BadRequestException" | "PayloadTooLargeException") => {
                ErrorKind::Validation
            }
            Some("ResourceNotFoundException") => ErrorKind::NotFound,
            Some("ConflictException") => ErrorKind::Conflict,
            _ => ErrorKind::Other,
        },
        DeployError::NotFound { .. } => ErrorKind::NotFound,
        DeployError::Ambiguous { .. }
        | DeployError::InvalidVersionNumber(_)
        | DeployError::MissingDeploymentStrategy => ErrorKind::Validation,
        DeployError::DeploymentInProgress { .. } => ErrorKind::Conflict,
        _ => ErrorKind::Other,
    }
}
