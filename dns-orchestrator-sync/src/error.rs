use serde::{Deserialize, Serialize};

use crate::types::{Record, RecordSetKey};

/// Kind of mutating call issued against the remote service during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// A new record set was created.
    Create,
    /// An existing record set was replaced in place.
    Update,
    /// A record set was removed.
    Delete,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => f.write_str("create"),
            Self::Update => f.write_str("update"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

/// One failed create/update/delete inside a reconciliation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationFailure {
    /// Which call failed.
    pub operation: OperationKind,
    /// Record set the call targeted.
    pub key: RecordSetKey,
    /// Why it failed.
    pub reason: SyncError,
}

impl std::fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.operation, self.key, self.reason)
    }
}

/// Unified error type for every synchronization operation.
///
/// All variants are serializable for structured error reporting.
///
/// # Retryable Errors
///
/// The following variants represent transient failures that may succeed on retry:
/// - [`NetworkError`](Self::NetworkError): network connectivity issues
/// - [`Timeout`](Self::Timeout): request timed out
/// - [`RateLimited`](Self::RateLimited): API rate limit exceeded
/// - [`ServerError`](Self::ServerError): the service answered with a 5xx status
///
/// The authenticated transport retries these with exponential backoff.
/// [`Cancelled`](Self::Cancelled) and [`DeadlineExceeded`](Self::DeadlineExceeded)
/// are never retried.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum SyncError {
    /// A network-level error occurred (DNS resolution failure, connection refused, etc.).
    NetworkError {
        /// Error details.
        detail: String,
    },

    /// The HTTP request timed out.
    Timeout {
        /// Error details.
        detail: String,
    },

    /// The API rate limit has been exceeded (HTTP 429 or equivalent).
    RateLimited {
        /// Suggested wait time in seconds before retrying, if provided by the API.
        retry_after: Option<u64>,
        /// Original error message from the API, if available.
        raw_message: Option<String>,
    },

    /// The service failed with a 5xx status.
    ServerError {
        /// HTTP status code.
        status: u16,
        /// Original error message from the API, if available.
        raw_message: Option<String>,
    },

    /// The bearer token was rejected or has expired on the server side.
    ///
    /// The transport re-authenticates once when it sees this; it only reaches
    /// the caller when a freshly issued token is rejected as well.
    Unauthorized {
        /// Original error message from the API, if available.
        raw_message: Option<String>,
    },

    /// The credential exchange was refused. Never retried.
    InvalidCredentials {
        /// Original error message from the API, if available.
        raw_message: Option<String>,
    },

    /// No zone with the given name is visible to the account.
    ZoneNotFound {
        /// Zone name that was looked up.
        zone: String,
    },

    /// The caller cancelled the operation.
    Cancelled,

    /// The caller's deadline passed before the operation finished.
    DeadlineExceeded,

    /// Some create/update/delete calls of a reconciliation failed.
    ///
    /// `applied` carries the records of every call that did succeed, so the
    /// caller can tell what changed remotely.
    PartialFailure {
        /// Every failed call, with the targeted record set.
        failures: Vec<OperationFailure>,
        /// Records successfully applied by the same reconciliation.
        applied: Vec<Record>,
    },

    /// Failed to parse a response.
    ParseError {
        /// Details about the parse failure.
        detail: String,
    },

    /// Failed to serialize a request body.
    SerializationError {
        /// Details about the serialization failure.
        detail: String,
    },

    /// An unrecognized error response.
    Api {
        /// HTTP status code, if the failure came from an HTTP response.
        status: Option<u16>,
        /// Raw error message.
        raw_message: String,
    },
}

impl SyncError {
    /// Whether the transport may retry the failed call.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError { .. }
                | Self::Timeout { .. }
                | Self::RateLimited { .. }
                | Self::ServerError { .. }
        )
    }

    /// Whether the error came from the caller giving up (cancellation or deadline).
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// 是否为预期行为（用户输入、资源不存在等），用于日志分级。
    ///
    /// 返回 `true` 时应使用 `warn` 级别，`false` 时使用 `error` 级别。
    /// **新增变体时请同步更新此方法。**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials { .. }
                | Self::ZoneNotFound { .. }
                | Self::Cancelled
                | Self::DeadlineExceeded
                | Self::PartialFailure { .. }
        )
    }
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NetworkError { detail } => write!(f, "Network error: {detail}"),
            Self::Timeout { detail } => write!(f, "Request timeout: {detail}"),
            Self::RateLimited { retry_after, .. } => {
                if let Some(secs) = retry_after {
                    write!(f, "Rate limited (retry after {secs}s)")
                } else {
                    write!(f, "Rate limited")
                }
            }
            Self::ServerError {
                status,
                raw_message,
            } => {
                if let Some(msg) = raw_message {
                    write!(f, "Server error (HTTP {status}): {msg}")
                } else {
                    write!(f, "Server error (HTTP {status})")
                }
            }
            Self::Unauthorized { raw_message } => {
                if let Some(msg) = raw_message {
                    write!(f, "Unauthorized: {msg}")
                } else {
                    write!(f, "Unauthorized")
                }
            }
            Self::InvalidCredentials { raw_message } => {
                if let Some(msg) = raw_message {
                    write!(f, "Invalid credentials: {msg}")
                } else {
                    write!(f, "Invalid credentials")
                }
            }
            Self::ZoneNotFound { zone } => write!(f, "Zone '{zone}' not found"),
            Self::Cancelled => write!(f, "Operation cancelled"),
            Self::DeadlineExceeded => write!(f, "Deadline exceeded"),
            Self::PartialFailure { failures, .. } => {
                write!(f, "{} record set operation(s) failed", failures.len())?;
                for (i, failure) in failures.iter().enumerate() {
                    let sep = if i == 0 { ": " } else { "; " };
                    write!(f, "{sep}{failure}")?;
                }
                Ok(())
            }
            Self::ParseError { detail } => write!(f, "Parse error: {detail}"),
            Self::SerializationError { detail } => write!(f, "Serialization error: {detail}"),
            Self::Api {
                status,
                raw_message,
            } => {
                if let Some(status) = status {
                    write!(f, "HTTP {status}: {raw_message}")
                } else {
                    write!(f, "{raw_message}")
                }
            }
        }
    }
}

impl std::error::Error for SyncError {}

/// Convenience type alias for `Result<T, SyncError>`.
pub type Result<T> = std::result::Result<T, SyncError>;
