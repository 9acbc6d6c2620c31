//! Warden Core - Access guard engine
//!
//! This crate gates protected content behind passcode or biometric checks
//! and re-locks it automatically after the app spent too long in the
//! background. It provides:
//! - Passcode formats and validation
//! - Code guards with fixed, user-settable or custom-validated codes
//! - Biometric guards with an optional passcode fallback
//! - A registry that creates guard models lazily and fans out app lifecycle events
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use warden_core::{
//!     CodeGuard, CodeGuardConfig, GuardContext, GuardId, GuardRegistry, MemoryCredentialStore,
//! };
//!
//! const VAULT: GuardId<CodeGuard> = GuardId::from_static("com.example.app.vault");
//!
//! # tokio_test();
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn tokio_test() {
//! let context = GuardContext::new(Arc::new(MemoryCredentialStore::new()));
//! let registry = GuardRegistry::new([CodeGuardConfig::fixed(VAULT, "1234").into()], context);
//!
//! assert!(registry.is_locked(&VAULT));
//! assert!(registry.unlock_code(&VAULT, "1234").await.is_valid());
//! assert!(!registry.is_locked(&VAULT));
//! # }
//! ```

pub mod biometric;
pub mod clock;
pub mod config;
pub mod error;
pub mod format;
pub mod identifier;
pub mod model;
pub mod registry;
pub mod store;

pub use biometric::{BiometricAuthenticator, BiometricError, UnavailableBiometrics};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    BiometricGuardConfig, CodeGuardConfig, CodeKind, CodeValidator, GuardConfig,
    ValidationResult, DEFAULT_FALLBACK_FORMAT, DEFAULT_TIMEOUT,
};
pub use error::{GuardError, Result};
pub use format::{CodeLength, PasscodeFormat};
pub use identifier::{BiometricGuard, CodeGuard, GuardId, GuardKind, GuardTag};
pub use model::{
    BiometricGuardModel, CodeGuardModel, GuardContext, GuardEvent, GuardModel, GuardState,
};
pub use registry::GuardRegistry;
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore, StoreError};
