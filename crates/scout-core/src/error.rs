//! # Error Types
//!
//! Domain-specific error types for scout-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  scout-core errors (this file)                                         │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  scout-db errors (separate crate)                                      │
//! │  └── DbError          - Persistent Store failures (StorageError)       │
//! │                                                                         │
//! │  scout-sync errors (separate crate)                                    │
//! │  └── SyncError        - Transport, quota, queue, orchestration         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SyncError → caller                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A stored enum value could not be mapped back to its variant.
    ///
    /// ## When This Occurs
    /// - A row written by a newer build is read by an older one
    /// - Manual edits to the local database
    #[error("Unknown {kind} value: '{value}'")]
    UnknownVariant { kind: &'static str, value: String },

    /// A monetary amount from the wire was not a finite number.
    #[error("Invalid amount for {field}: {reason}")]
    InvalidAmount { field: String, reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before anything touches the store, so an invalid scan never ends up
/// in the queue.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Invalid format (wrong length, illegal characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Check digit does not match the body of the identifier.
    #[error("{field} '{value}' has an invalid check digit")]
    InvalidChecksum { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "isbn".to_string(),
        };
        assert_eq!(err.to_string(), "isbn is required");

        let err = ValidationError::InvalidChecksum {
            field: "isbn".to_string(),
            value: "9780140449137".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "isbn '9780140449137' has an invalid check digit"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "isbn".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_unknown_variant_message() {
        let err = CoreError::UnknownVariant {
            kind: "confidence",
            value: "certain".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown confidence value: 'certain'");
    }
}
