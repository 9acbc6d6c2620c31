//! Biometric authenticator boundary
//!
//! The engine never evaluates biometrics itself. Platforms plug in an
//! implementation of [`BiometricAuthenticator`] that wraps the OS prompt
//! (Face ID, Touch ID, fingerprint, Windows Hello).

use async_trait::async_trait;
use thiserror::Error;

/// User-facing justification shown by the OS prompt
pub const BIOMETRIC_UNLOCK_REASON: &str = "Authenticate to unlock protected content";

/// Hard failures reported by a biometric authenticator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BiometricError {
    /// The user dismissed the prompt
    #[error("Authentication was cancelled by the user")]
    Cancelled,

    /// Too many failed attempts; the OS locked biometrics
    #[error("Biometry is locked out")]
    Lockout,

    /// No biometric identity is enrolled on the device
    #[error("No biometric identity is enrolled")]
    NotEnrolled,

    /// Any other platform error
    #[error("{0}")]
    Platform(String),
}

/// Device biometric capability
#[async_trait]
pub trait BiometricAuthenticator: Send + Sync {
    /// Whether biometric authentication can be evaluated right now
    fn is_available(&self) -> bool;

    /// Prompt the user; `Ok(true)` means the user was authenticated
    ///
    /// # Arguments
    /// * `reason` - Justification displayed by the OS prompt
    async fn evaluate(&self, reason: &str) -> Result<bool, BiometricError>;
}

/// Authenticator for devices without biometric hardware
///
/// Biometric guards backed by this authenticator always route to their
/// passcode fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableBiometrics;

#[async_trait]
impl BiometricAuthenticator for UnavailableBiometrics {
    fn is_available(&self) -> bool {
        false
    }

    async fn evaluate(&self, _reason: &str) -> Result<bool, BiometricError> {
        Err(BiometricError::NotEnrolled)
    }
}
