//! Shared helpers for warden-core integration tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use warden_core::{
    BiometricAuthenticator, BiometricError, GuardContext, ManualClock, MemoryCredentialStore,
};

/// Biometric authenticator that always accepts while available
pub struct StubBiometrics {
    available: AtomicBool,
    pub prompts: AtomicUsize,
}

impl StubBiometrics {
    pub fn new(available: bool) -> Self {
        Self {
            available: AtomicBool::new(available),
            prompts: AtomicUsize::new(0),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

#[async_trait]
impl BiometricAuthenticator for StubBiometrics {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn evaluate(&self, _reason: &str) -> Result<bool, BiometricError> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

pub struct Harness {
    pub store: Arc<MemoryCredentialStore>,
    pub clock: Arc<ManualClock>,
    pub biometrics: Arc<StubBiometrics>,
}

impl Harness {
    pub fn new(biometrics_available: bool) -> Self {
        Self {
            store: Arc::new(MemoryCredentialStore::new()),
            clock: Arc::new(ManualClock::default()),
            biometrics: Arc::new(StubBiometrics::new(biometrics_available)),
        }
    }

    /// Fresh context sharing this harness' store, clock and biometrics
    pub fn context(&self) -> GuardContext {
        GuardContext::new(self.store.clone())
            .with_clock(self.clock.clone())
            .with_biometrics(self.biometrics.clone())
    }
}
