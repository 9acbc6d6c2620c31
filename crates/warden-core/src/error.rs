//! Error types for access guard operations
//!
//! Configuration mistakes (duplicate identifiers, unknown guards, kind
//! mismatches) are programming errors and panic instead of surfacing here.
//! Everything in [`GuardError`] is recoverable by the caller.

use thiserror::Error;

use crate::biometric::BiometricError;
use crate::format::PasscodeFormat;
use crate::store::StoreError;

/// Result type alias for guard operations
pub type Result<T> = std::result::Result<T, GuardError>;

/// Errors that can occur while operating an access guard
#[derive(Debug, Error)]
pub enum GuardError {
    /// The entered passcode did not unlock the guard
    #[error("Wrong passcode")]
    WrongPasscode,

    /// Persisting or encoding an access code failed
    #[error("Failed to store access code: {0}")]
    StoreCode(String),

    /// The guard kind has no stored code to set or reset
    #[error("Operation not supported for {0} code guards")]
    UnsupportedOperation(&'static str),

    /// A new code does not satisfy the format it is stored under
    #[error("Code does not match the required format ({0})")]
    InvalidCodeFormat(PasscodeFormat),

    /// Biometric capability check failed at unlock time
    #[error("Biometric authentication is not available on this device")]
    BiometricsUnavailable,

    /// The biometric adapter reported a hard failure
    #[error("Biometric authentication failed: {0}")]
    Biometric(#[from] BiometricError),

    /// A passcode attempt was routed to a biometric guard without fallback
    #[error("No passcode fallback configured for access guard '{0}'")]
    NoFallback(String),

    /// `register` was called with an identifier that is already taken
    #[error("Access guard identifier already registered: {0}")]
    DuplicateIdentifier(String),

    /// Credential store failure outside of a code write
    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),
}

impl From<serde_json::Error> for GuardError {
    fn from(e: serde_json::Error) -> Self {
        GuardError::StoreCode(format!("Failed to encode access code: {}", e))
    }
}

impl GuardError {
    /// Whether the guard is guaranteed to still be locked after this error
    pub fn leaves_locked(&self) -> bool {
        matches!(
            self,
            Self::WrongPasscode
                | Self::BiometricsUnavailable
                | Self::Biometric(_)
                | Self::NoFallback(_)
        )
    }
}
