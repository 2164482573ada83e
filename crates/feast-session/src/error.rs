//! # Session Error Types
//!
//! Error types for the async half of the client core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Session Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │  Collaborator   │  │     Storage             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Transport      │  │  StorageFailed          │ │
//! │  │  ConfigLoad     │  │  Timeout        │  │  SerializationFailed    │ │
//! │  │  ConfigSave     │  │  Rejected       │  │                         │ │
//! │  │                 │  │  NotFound       │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────────────────────────────────┐  │
//! │  │     Domain      │  │              Internal                       │  │
//! │  │  Core(CoreError)│  │  ChannelError • ShuttingDown                │  │
//! │  └─────────────────┘  └─────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed operation never leaves a partial transition behind: callers can
//! show a notification and retry without compensating.

use feast_core::{CartError, CoreError};
use thiserror::Error;

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Session error type covering all possible client-core failures.
#[derive(Debug, Error)]
pub enum SessionError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Collaborator Errors
    // =========================================================================
    /// The request never got a usable response (network down, 5xx, ...).
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The request timed out.
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    /// The collaborator answered and refused the operation.
    #[error("{operation} rejected: {reason}")]
    Rejected { operation: String, reason: String },

    /// The collaborator does not know the requested resource.
    #[error("Not found: {0}")]
    NotFound(String),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Reading or writing the session store failed.
    #[error("Session storage failed: {0}")]
    StorageFailed(String),

    /// Stored data could not be (de)serialized.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    // =========================================================================
    // Domain Errors
    // =========================================================================
    /// The cart or another core rule refused the operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Channel send/receive failed.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// The session is shutting down.
    #[error("Rider session is shutting down")]
    ShuttingDown,
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<CartError> for SessionError {
    fn from(err: CartError) -> Self {
        SessionError::Core(CoreError::Cart(err))
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::SerializationFailed(err.to_string())
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::StorageFailed(err.to_string())
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
// Error Categorization
// =============================================================================

impl SessionError {
    /// Returns true if the same call may succeed later.
    ///
    /// The poll loop's cadence is the only retry; this only tells the page
    /// whether a "try again" button makes sense.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Transport(_) | SessionError::Timeout(_))
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SessionError::InvalidConfig(_)
                | SessionError::ConfigLoadFailed(_)
                | SessionError::ConfigSaveFailed(_)
        )
    }

    /// Returns true if this error came from the session store.
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            SessionError::StorageFailed(_) | SessionError::SerializationFailed(_)
        )
    }

    /// Returns true for a cross-restaurant cart conflict.
    pub fn is_cart_conflict(&self) -> bool {
        matches!(self, SessionError::Core(CoreError::Cart(err)) if err.is_conflict())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SessionError::Transport("connection reset".into()).is_retryable());
        assert!(SessionError::Timeout(8000).is_retryable());

        assert!(!SessionError::Rejected {
            operation: "start".into(),
            reason: "job reassigned".into(),
        }
        .is_retryable());
        assert!(!SessionError::InvalidConfig("bad".into()).is_retryable());
        assert!(!SessionError::ShuttingDown.is_retryable());
    }

    #[test]
    fn test_categories() {
        assert!(SessionError::ConfigLoadFailed("x".into()).is_config_error());
        assert!(SessionError::StorageFailed("disk full".into()).is_storage_error());
        assert!(SessionError::SerializationFailed("eof".into()).is_storage_error());
        assert!(!SessionError::NotFound("r9".into()).is_storage_error());
    }

    #[test]
    fn test_cart_conflict_conversion() {
        let err: SessionError = CartError::RestaurantConflict {
            cart: "r1".into(),
            incoming: "r2".into(),
        }
        .into();
        assert!(err.is_cart_conflict());
        assert!(err.to_string().contains("r2"));
    }

    #[test]
    fn test_rejected_display() {
        let err = SessionError::Rejected {
            operation: "complete".into(),
            reason: "job not in progress".into(),
        };
        assert_eq!(err.to_string(), "complete rejected: job not in progress");
    }
}
