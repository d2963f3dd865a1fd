//! # Session Error Types
//!
//! Errors surfaced to a console session.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Session Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │   Local         │  │   Store         │  │   Session               │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Validation     │  │  Rejected       │  │  Busy                   │ │
//! │  │  (never sent)   │  │  (domain rule)  │  │  UnknownEditSession     │ │
//! │  │                 │  │  Transport      │  │                         │ │
//! │  │                 │  │  StoreOpenFailed│  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │  Configuration  │  InvalidConfig / ConfigLoadFailed / SaveFailed    │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Operation failures carry the [`SaleOperation`] that produced them so the
//! console can say *which* action failed. Nothing here is retried
//! automatically; `Transport` failures are left to the user.

use std::fmt;

use tally_core::{CoreError, GatewayError, ValidationError};
use thiserror::Error;

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// The user-facing operation an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleOperation {
    Submit,
    AddItem,
    UpdateItem,
    RemoveItem,
    Cancel,
    Refund,
    Confirm,
    Fetch,
    Reconcile,
    Report,
}

impl fmt::Display for SaleOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SaleOperation::Submit => "submit sale",
            SaleOperation::AddItem => "add item",
            SaleOperation::UpdateItem => "update item",
            SaleOperation::RemoveItem => "remove item",
            SaleOperation::Cancel => "cancel sale",
            SaleOperation::Refund => "refund sale",
            SaleOperation::Confirm => "confirm sale",
            SaleOperation::Fetch => "fetch sale",
            SaleOperation::Reconcile => "reconcile sales",
            SaleOperation::Report => "build report",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    // =========================================================================
    // Operation Errors
    // =========================================================================
    /// Input failed local validation; nothing was sent to the store.
    #[error("Cannot {operation}: {source}")]
    Validation {
        operation: SaleOperation,
        source: ValidationError,
    },

    /// The store (or a local copy of its rules) refused the operation.
    #[error("Cannot {operation}: {source}")]
    Rejected {
        operation: SaleOperation,
        source: CoreError,
    },

    /// The store could not be reached. The operation may be repeated by
    /// the user.
    #[error("Cannot {operation}: {message}")]
    Transport {
        operation: SaleOperation,
        message: String,
    },

    /// Another mutation of the same sale is still in flight.
    #[error("Sale {sale_id} is busy with another operation")]
    Busy { sale_id: String },

    #[error("Unknown edit session: {0}")]
    UnknownEditSession(String),

    /// The console could not open its store.
    #[error("Failed to open store: {0}")]
    StoreOpenFailed(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),
}

impl SessionError {
    /// Classifies a local domain error.
    pub fn core(operation: SaleOperation, err: CoreError) -> Self {
        match err {
            CoreError::Validation(source) => SessionError::Validation { operation, source },
            source => SessionError::Rejected { operation, source },
        }
    }

    pub fn validation(operation: SaleOperation, source: ValidationError) -> Self {
        SessionError::Validation { operation, source }
    }

    /// Classifies a gateway failure.
    pub fn gateway(operation: SaleOperation, err: GatewayError) -> Self {
        match err {
            GatewayError::Domain(err) => Self::core(operation, err),
            GatewayError::Unavailable(message) => SessionError::Transport { operation, message },
        }
    }

    /// The operation that failed, if this error came from one.
    pub fn operation(&self) -> Option<SaleOperation> {
        match self {
            SessionError::Validation { operation, .. }
            | SessionError::Rejected { operation, .. }
            | SessionError::Transport { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    /// The domain rule behind a rejection.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            SessionError::Rejected { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Whether repeating the same request could succeed without the user
    /// changing anything.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Transport { .. } | SessionError::Busy { .. })
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<tally_db::DbError> for SessionError {
    fn from(err: tally_db::DbError) -> Self {
        SessionError::StoreOpenFailed(err.to_string())
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SessionError {
    fn from(err: toml::de::Error) -> Self {
        SessionError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SessionError {
    fn from(err: toml::ser::Error) -> Self {
        SessionError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::SaleStatus;

    #[test]
    fn test_gateway_errors_are_classified() {
        let err = SessionError::gateway(
            SaleOperation::Submit,
            GatewayError::Domain(CoreError::EmptyDraft),
        );
        assert!(matches!(err, SessionError::Rejected { .. }));
        assert_eq!(err.as_core(), Some(&CoreError::EmptyDraft));

        let err = SessionError::gateway(
            SaleOperation::Cancel,
            GatewayError::from(ValidationError::required("reason")),
        );
        assert!(matches!(err, SessionError::Validation { .. }));
        assert!(!err.is_retryable());

        let err = SessionError::gateway(
            SaleOperation::Refund,
            GatewayError::Unavailable("connection reset".into()),
        );
        assert!(err.is_retryable());
        assert_eq!(err.operation(), Some(SaleOperation::Refund));
    }

    #[test]
    fn test_message_names_operation() {
        let err = SessionError::core(
            SaleOperation::AddItem,
            CoreError::TerminalSale {
                sale_id: "s-1".into(),
                status: SaleStatus::Refunded,
            },
        );
        assert_eq!(
            err.to_string(),
            "Cannot add item: Sale s-1 is refunded; terminal sales cannot be modified"
        );
    }
}
