//! # Sync Error Types
//!
//! Error types for transport, queue and orchestration.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Queue               │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Transport      │  │  QuotaExceeded          │ │
//! │  │  MissingDeviceId│  │  {status, msg}  │  │  RetryCeilingExceeded   │ │
//! │  │  InvalidUrl     │  │                 │  │  Validation             │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌──────────────────────────────────────────────┐ │
//! │  │    Storage      │  │     Orchestration                            │ │
//! │  │                 │  │                                              │ │
//! │  │  Storage(DbErr) │  │  OfflineOperationRejected  SyncTimeout      │ │
//! │  │                 │  │  SyncInProgress                             │ │
//! │  └─────────────────┘  └──────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Handling Policy
//! - Pricing path: `Storage` and `Transport` become misses, never errors.
//! - Queue drain: `Transport` counts as a failed attempt; `QuotaExceeded`
//!   stops the drain without touching retry counters.
//! - `force_sync_now`: everything is returned to the caller.

use scout_core::ValidationError;
use scout_db::DbError;
use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering every failure the engine can surface.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Missing device ID.
    #[error("Device ID not configured. Run `scout config init` first.")]
    MissingDeviceId,

    /// Invalid API URL.
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Input Errors
    // =========================================================================
    /// The scan was rejected before touching storage.
    #[error("Invalid scan: {0}")]
    Validation(#[from] ValidationError),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Local persistence unavailable or corrupt.
    #[error("Storage error: {0}")]
    Storage(#[from] DbError),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// A network call failed: timeout, DNS, refused connection or non-2xx.
    ///
    /// `status` is `None` when no HTTP response was received.
    #[error("Transport error{}: {message}", status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// The server refused a scan because the account's scan quota is used up.
    ///
    /// ## When This Occurs
    /// - `POST /scans` answers 403
    ///
    /// The caller should show an upgrade/limit prompt, not a network error.
    #[error("Scan quota exceeded: {0}")]
    QuotaExceeded(String),

    // =========================================================================
    // Queue Errors
    // =========================================================================
    /// A queued scan failed too many times and was moved to quarantine.
    #[error("Scan {id} abandoned after {retries} attempts: {last_error}")]
    RetryCeilingExceeded {
        id: String,
        retries: u32,
        last_error: String,
    },

    // =========================================================================
    // Orchestration Errors
    // =========================================================================
    /// An explicit sync was requested with no connectivity.
    ///
    /// No network attempt was made.
    #[error("Device is offline; sync not attempted")]
    OfflineOperationRejected,

    /// The forced sync did not finish in time.
    #[error("Sync timed out after {0} seconds")]
    SyncTimeout(u64),

    /// Another sync cycle is already running.
    #[error("A sync is already in progress")]
    SyncInProgress,
}

// =============================================================================
// Constructors
// =============================================================================

impl SyncError {
    /// Creates a Transport error.
    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        SyncError::Transport {
            status,
            message: message.into(),
        }
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl SyncError {
    /// Returns true if a later attempt may succeed.
    ///
    /// The queue drain counts a retryable failure against the entry and
    /// stops on anything else.
    ///
    /// ## Retryable
    /// - Transport failures (any status except the quota 403)
    /// - Timeouts
    ///
    /// ## Non-Retryable
    /// - Quota exhaustion
    /// - Storage, configuration and validation errors
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::Transport { .. } | SyncError::SyncTimeout(_) | SyncError::SyncInProgress
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SyncError::transport(Some(500), "boom").is_retryable());
        assert!(SyncError::transport(None, "dns").is_retryable());
        assert!(SyncError::SyncTimeout(30).is_retryable());

        assert!(!SyncError::QuotaExceeded("limit".into()).is_retryable());
        assert!(!SyncError::OfflineOperationRejected.is_retryable());
        assert!(!SyncError::MissingDeviceId.is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = SyncError::transport(Some(502), "bad gateway");
        assert_eq!(err.to_string(), "Transport error (HTTP 502): bad gateway");

        let err = SyncError::transport(None, "connection refused");
        assert_eq!(err.to_string(), "Transport error: connection refused");
    }

    #[test]
    fn test_storage_error_converts() {
        let err: SyncError = DbError::PoolExhausted.into();
        assert!(matches!(err, SyncError::Storage(_)));
        assert!(!err.is_retryable());
    }
}
