//! Biometric guard model
//!
//! Availability is checked on every query rather than cached, so a device
//! that loses its enrolled biometrics falls back to the passcode guard
//! without a restart.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{CodeGuardModel, GuardContext, GuardState};
use crate::biometric::BIOMETRIC_UNLOCK_REASON;
use crate::config::{BiometricGuardConfig, ValidationResult};
use crate::error::{GuardError, Result};

/// Stateful engine of one biometric guard
pub struct BiometricGuardModel {
    config: BiometricGuardConfig,
    context: GuardContext,
    did_unlock: AtomicBool,
    fallback: Option<Arc<CodeGuardModel>>,
}

impl BiometricGuardModel {
    /// Create the model; `fallback` is the model of the derived passcode guard
    pub fn new(
        config: BiometricGuardConfig,
        context: GuardContext,
        fallback: Option<Arc<CodeGuardModel>>,
    ) -> Self {
        Self {
            config,
            context,
            did_unlock: AtomicBool::new(false),
            fallback,
        }
    }

    pub fn config(&self) -> &BiometricGuardConfig {
        &self.config
    }

    /// Model of the passcode fallback, if configured
    pub fn fallback(&self) -> Option<&Arc<CodeGuardModel>> {
        self.fallback.as_ref()
    }

    /// Whether the device can currently evaluate biometrics
    pub fn is_available(&self) -> bool {
        self.context.biometrics().is_available()
    }

    /// Locked state; without biometrics this mirrors the fallback
    pub fn is_locked(&self) -> bool {
        if self.is_available() {
            !self.did_unlock.load(Ordering::SeqCst)
        } else {
            self.fallback
                .as_ref()
                .map_or(true, |fallback| fallback.is_locked())
        }
    }

    fn set_unlocked(&self, unlocked: bool) {
        let previous = self.did_unlock.swap(unlocked, Ordering::SeqCst);
        if previous != unlocked {
            let state = if unlocked {
                GuardState::Unlocked
            } else {
                GuardState::Locked
            };
            debug!(guard = %self.config.id(), state = ?state, "Biometric guard state changed");
            self.context.emit(self.config.id().value(), state);
        }
    }

    /// Prompt for biometric authentication
    ///
    /// Returns whether the user was authenticated. A declined prompt leaves
    /// the guard locked.
    pub async fn unlock(&self) -> Result<bool> {
        if !self.is_available() {
            return Err(GuardError::BiometricsUnavailable);
        }

        let authenticated = self
            .context
            .biometrics()
            .evaluate(BIOMETRIC_UNLOCK_REASON)
            .await?;
        info!(guard = %self.config.id(), authenticated, "Biometric evaluation finished");
        self.set_unlocked(authenticated);
        Ok(authenticated)
    }

    /// Attempt to unlock through the passcode fallback
    pub async fn unlock_with_fallback(&self, code: &str) -> Result<ValidationResult> {
        let fallback = self
            .fallback
            .as_ref()
            .ok_or_else(|| GuardError::NoFallback(self.config.id().to_string()))?;
        Ok(fallback.unlock(code).await)
    }

    /// Lock the guard and its fallback
    pub fn lock(&self) {
        self.set_unlocked(false);
        if let Some(fallback) = &self.fallback {
            fallback.lock();
        }
    }

    /// Reset the fallback code; no-op without a fallback
    pub fn reset_code(&self) -> Result<()> {
        match &self.fallback {
            Some(fallback) => fallback.reset_code(None),
            None => Ok(()),
        }
    }

    pub fn on_enter_background(&self) {
        if let Some(fallback) = &self.fallback {
            fallback.on_enter_background();
        }
    }

    /// Lock if the app spent at least the configured timeout in the background
    pub fn on_enter_foreground(&self, last_entered_background: DateTime<Utc>) {
        let now = self.context.clock().now();
        if crate::clock::timeout_elapsed(
            last_entered_background,
            now,
            self.config.timeout_duration(),
        ) {
            debug!(guard = %self.config.id(), "Background timeout elapsed");
            self.set_unlocked(false);
        }
        if let Some(fallback) = &self.fallback {
            fallback.on_enter_foreground(last_entered_background);
        }
    }
}
