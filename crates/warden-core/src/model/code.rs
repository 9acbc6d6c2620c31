//! Passcode guard model
//!
//! Regular guards keep their code in the credential store under the guard's
//! identifier; fixed and custom guards have nothing persisted and therefore
//! never need setup.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zeroize::{Zeroize, Zeroizing};

use super::{GuardContext, GuardState};
use crate::clock::timeout_elapsed;
use crate::config::{CodeGuardConfig, CodeKind, ValidationResult};
use crate::error::{GuardError, Result};
use crate::format::PasscodeFormat;

/// Persisted access code record
///
/// The format is captured at write time so changing a guard's configured
/// format keeps previously set codes working.
#[derive(Serialize, Deserialize)]
struct PersistedPasscode {
    code: String,
    format: PasscodeFormat,
}

impl PersistedPasscode {
    fn encode(&self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new(serde_json::to_vec(self)?))
    }
}

impl Drop for PersistedPasscode {
    fn drop(&mut self) {
        self.code.zeroize();
    }
}

struct CodeState {
    state: GuardState,
    persisted: Option<PersistedPasscode>,
}

/// Stateful engine of one passcode guard
pub struct CodeGuardModel {
    config: CodeGuardConfig,
    context: GuardContext,
    inner: Mutex<CodeState>,
}

impl CodeGuardModel {
    /// Create the model and derive its initial state from the credential store
    pub fn new(config: CodeGuardConfig, context: GuardContext) -> Self {
        let persisted = if config.kind().is_regular() {
            Self::load_persisted(&context, &config)
        } else {
            None
        };
        let state = Self::initial_state(&config, persisted.is_some());
        debug!(
            guard = %config.id(),
            kind = config.kind().name(),
            state = ?state,
            "Initialized code guard"
        );

        Self {
            config,
            context,
            inner: Mutex::new(CodeState { state, persisted }),
        }
    }

    fn load_persisted(context: &GuardContext, config: &CodeGuardConfig) -> Option<PersistedPasscode> {
        let bytes = match context.store().get(config.id().value()) {
            Ok(Some(bytes)) => Zeroizing::new(bytes),
            Ok(None) => return None,
            Err(e) => {
                warn!(guard = %config.id(), error = %e, "Failed to read persisted access code");
                return None;
            }
        };

        let persisted: PersistedPasscode = match serde_json::from_slice(&bytes) {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!(guard = %config.id(), error = %e, "Ignoring undecodable persisted access code");
                return None;
            }
        };

        if !persisted.format.validate(&persisted.code) {
            warn!(
                guard = %config.id(),
                format = %persisted.format,
                "Ignoring persisted access code that violates its own format"
            );
            return None;
        }

        Some(persisted)
    }

    fn initial_state(config: &CodeGuardConfig, has_code: bool) -> GuardState {
        match config.kind() {
            CodeKind::Fixed { .. } | CodeKind::Custom { .. } => GuardState::Locked,
            CodeKind::Regular { .. } => match (has_code, config.is_optional()) {
                (true, _) => GuardState::Locked,
                (false, true) => GuardState::Unlocked,
                // Not technically locked yet, but the guarded content must stay hidden
                (false, false) => GuardState::NeedsSetup,
            },
        }
    }

    fn inner(&self) -> MutexGuard<'_, CodeState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, inner: &mut CodeState, next: GuardState) {
        if inner.state != next {
            debug!(guard = %self.config.id(), from = ?inner.state, to = ?next, "Code guard state changed");
            inner.state = next;
            self.context.emit(self.config.id().value(), next);
        }
    }

    pub fn config(&self) -> &CodeGuardConfig {
        &self.config
    }

    /// Current state
    pub fn state(&self) -> GuardState {
        self.inner().state
    }

    /// Whether the guarded content must stay hidden
    pub fn is_locked(&self) -> bool {
        self.state().is_locked()
    }

    /// Whether a regular code must be chosen first
    pub fn needs_setup(&self) -> bool {
        self.state() == GuardState::NeedsSetup
    }

    /// Format of the currently stored code, if any
    pub fn persisted_format(&self) -> Option<PasscodeFormat> {
        self.inner().persisted.as_ref().map(|p| p.format)
    }

    /// Lock the guard; a guard that still needs setup stays in setup
    pub fn lock(&self) {
        let mut inner = self.inner();
        if inner.state == GuardState::Unlocked {
            self.transition(&mut inner, GuardState::Locked);
        }
    }

    /// Attempt to unlock with `candidate`
    ///
    /// While a custom validator is running the guard keeps reporting its
    /// previous state. Dropping the returned future before completion leaves
    /// the guard untouched.
    pub async fn unlock(&self, candidate: &str) -> ValidationResult {
        let result = self.evaluate(candidate).await;

        let mut inner = self.inner();
        match &result {
            ValidationResult::Valid => self.transition(&mut inner, GuardState::Unlocked),
            ValidationResult::Invalid { .. } => {
                if inner.state == GuardState::Unlocked {
                    self.transition(&mut inner, GuardState::Locked);
                }
            }
        }
        result
    }

    async fn evaluate(&self, candidate: &str) -> ValidationResult {
        match self.config.kind() {
            CodeKind::Fixed { code, .. } => {
                if candidate == code.as_str() {
                    ValidationResult::Valid
                } else {
                    ValidationResult::invalid()
                }
            }
            CodeKind::Regular { .. } => {
                if self.matches_persisted(candidate) {
                    ValidationResult::Valid
                } else {
                    ValidationResult::invalid()
                }
            }
            CodeKind::Custom { validator, .. } => validator.validate(candidate).await,
        }
    }

    fn matches_persisted(&self, candidate: &str) -> bool {
        self.inner()
            .persisted
            .as_ref()
            .is_some_and(|persisted| persisted.code == candidate)
    }

    fn regular_format(&self) -> Result<PasscodeFormat> {
        match self.config.kind() {
            CodeKind::Regular { format } => Ok(*format),
            other => Err(GuardError::UnsupportedOperation(other.name())),
        }
    }

    /// Set a new regular code and leave the guard unlocked
    ///
    /// The guard ends up as if the user had just entered the new code. On
    /// failure nothing changes.
    pub fn set_access_code(&self, code: &str, format: PasscodeFormat) -> Result<()> {
        self.regular_format()?;
        if !format.validate(code) {
            return Err(GuardError::InvalidCodeFormat(format));
        }
        self.write_code(code, format)?;
        info!(guard = %self.config.id(), format = %format, "Access code set");
        Ok(())
    }

    /// Remove the stored code, optionally replacing it with `new_code`
    ///
    /// Without `new_code` the guard returns to its initial state (setup
    /// required, or unlocked for optional guards). With `new_code` the code
    /// is stored in the configured format and the guard is left unlocked. If
    /// the store fails after the delete, the guard is left cleanly in its
    /// no-code state and the error is returned.
    pub fn reset_code(&self, new_code: Option<&str>) -> Result<()> {
        let format = self.regular_format()?;
        if let Some(code) = new_code {
            if !format.validate(code) {
                return Err(GuardError::InvalidCodeFormat(format));
            }
        }

        self.context.store().delete(self.config.id().value())?;
        {
            let mut inner = self.inner();
            inner.persisted = None;
            let next = Self::initial_state(&self.config, false);
            self.transition(&mut inner, next);
        }
        info!(guard = %self.config.id(), "Access code reset");

        match new_code {
            Some(code) => self.write_code(code, format),
            None => Ok(()),
        }
    }

    fn write_code(&self, code: &str, format: PasscodeFormat) -> Result<()> {
        let persisted = PersistedPasscode {
            code: code.to_string(),
            format,
        };
        let encoded = persisted.encode()?;
        self.context
            .store()
            .set(self.config.id().value(), &encoded)
            .map_err(|e| GuardError::StoreCode(e.to_string()))?;

        let mut inner = self.inner();
        inner.persisted = Some(persisted);
        self.transition(&mut inner, GuardState::Unlocked);
        Ok(())
    }

    /// Background transitions do nothing; timeouts are evaluated on return
    pub fn on_enter_background(&self) {}

    /// Lock if the app spent at least the configured timeout in the background
    pub fn on_enter_foreground(&self, last_entered_background: DateTime<Utc>) {
        let now = self.context.clock().now();
        if timeout_elapsed(last_entered_background, now, self.config.timeout_duration()) {
            debug!(guard = %self.config.id(), "Background timeout elapsed");
            self.lock();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::clock::Clock;
    use crate::config::CodeValidator;
    use crate::identifier::GuardId;
    use crate::model::testing::fixture;
    use crate::store::{CredentialStore, StoreError};

    fn regular(id: &'static str) -> CodeGuardConfig {
        CodeGuardConfig::regular(GuardId::from_static(id), PasscodeFormat::numeric(4))
    }

    #[tokio::test]
    async fn test_fixed_guard_unlock_and_lock() {
        let fx = fixture(false);
        let model = CodeGuardModel::new(
            CodeGuardConfig::fixed(GuardId::new("fixed"), "1234"),
            fx.context.clone(),
        );

        assert!(model.is_locked());
        assert!(!model.needs_setup());

        assert_eq!(model.unlock("0000").await, ValidationResult::invalid());
        assert!(model.is_locked());

        assert_eq!(model.unlock("1234").await, ValidationResult::Valid);
        assert!(!model.is_locked());

        model.lock();
        assert!(model.is_locked());
    }

    #[tokio::test]
    async fn test_invalid_attempt_relocks_unlocked_guard() {
        let fx = fixture(false);
        let model = CodeGuardModel::new(
            CodeGuardConfig::fixed(GuardId::new("fixed"), "1234"),
            fx.context.clone(),
        );

        model.unlock("1234").await;
        assert!(!model.is_locked());
        model.unlock("9999").await;
        assert!(model.is_locked());
    }

    #[tokio::test]
    async fn test_regular_guard_requires_setup() {
        let fx = fixture(false);
        let model = CodeGuardModel::new(regular("regular"), fx.context.clone());

        assert!(model.needs_setup());
        assert!(model.is_locked());

        // Nothing can unlock a guard without a code
        assert!(!model.unlock("1234").await.is_valid());
        assert!(model.needs_setup());

        // Locking keeps it in setup
        model.lock();
        assert_eq!(model.state(), GuardState::NeedsSetup);
    }

    #[tokio::test]
    async fn test_optional_regular_guard_starts_unlocked() {
        let fx = fixture(false);
        let model = CodeGuardModel::new(regular("optional").optional(true), fx.context.clone());

        assert!(!model.is_locked());
        assert!(!model.needs_setup());
    }

    #[tokio::test]
    async fn test_set_access_code_roundtrip() {
        let fx = fixture(false);
        let model = CodeGuardModel::new(regular("regular"), fx.context.clone());

        model
            .set_access_code("4321", PasscodeFormat::numeric(4))
            .unwrap();
        assert!(!model.is_locked());
        assert!(!model.needs_setup());
        assert!(fx.store.contains("regular"));

        let fresh = CodeGuardModel::new(regular("regular"), fx.context.clone());
        assert!(fresh.is_locked());
        assert!(!fresh.needs_setup());
        assert_eq!(fresh.unlock("4321").await, ValidationResult::Valid);
        assert!(!fresh.is_locked());
    }

    #[tokio::test]
    async fn test_persisted_format_survives_config_change() {
        let fx = fixture(false);
        CodeGuardModel::new(regular("regular"), fx.context.clone())
            .set_access_code("4321", PasscodeFormat::numeric(4))
            .unwrap();

        // Reconfigured to six digits; the stored four-digit code keeps working
        let config =
            CodeGuardConfig::regular(GuardId::new("regular"), PasscodeFormat::numeric(6));
        let model = CodeGuardModel::new(config, fx.context.clone());
        assert_eq!(model.persisted_format(), Some(PasscodeFormat::numeric(4)));
        assert!(model.unlock("4321").await.is_valid());
    }

    #[test]
    fn test_set_access_code_rejects_wrong_format() {
        let fx = fixture(false);
        let model = CodeGuardModel::new(regular("regular"), fx.context.clone());

        let result = model.set_access_code("12ab", PasscodeFormat::numeric(4));
        assert!(matches!(result, Err(GuardError::InvalidCodeFormat(_))));
        assert!(model.needs_setup());
        assert!(fx.store.is_empty());
    }

    #[test]
    fn test_stored_persisted_json_shape() {
        let fx = fixture(false);
        let model = CodeGuardModel::new(regular("regular"), fx.context.clone());
        model
            .set_access_code("1234", PasscodeFormat::numeric(4))
            .unwrap();

        let bytes = fx.store.get("regular").unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "code": "1234",
                "format": {"kind": "numeric", "length": {"exact": 4}}
            })
        );
    }

    #[test]
    fn test_invalid_persisted_code_is_ignored() {
        let fx = fixture(false);
        fx.store.set("garbage", b"not json").unwrap();
        fx.store
            .set(
                "mismatch",
                br#"{"code":"12ab","format":{"kind":"numeric","length":{"exact":4}}}"#,
            )
            .unwrap();

        assert!(CodeGuardModel::new(regular("garbage"), fx.context.clone()).needs_setup());
        assert!(CodeGuardModel::new(regular("mismatch"), fx.context.clone()).needs_setup());
        assert!(
            !CodeGuardModel::new(regular("mismatch").optional(true), fx.context.clone())
                .is_locked()
        );
    }

    #[tokio::test]
    async fn test_reset_twice_requires_setup() {
        let fx = fixture(false);
        let model = CodeGuardModel::new(regular("regular"), fx.context.clone());
        model
            .set_access_code("1111", PasscodeFormat::numeric(4))
            .unwrap();

        model.reset_code(None).unwrap();
        assert!(model.needs_setup());
        assert!(!fx.store.contains("regular"));

        model.reset_code(None).unwrap();
        assert!(model.needs_setup());
        assert!(!fx.store.contains("regular"));
        assert!(!model.unlock("1111").await.is_valid());
    }

    #[tokio::test]
    async fn test_reset_with_new_code_leaves_unlocked() {
        let fx = fixture(false);
        let model = CodeGuardModel::new(regular("regular"), fx.context.clone());
        model
            .set_access_code("1111", PasscodeFormat::numeric(4))
            .unwrap();
        model.lock();

        model.reset_code(Some("2222")).unwrap();
        assert!(!model.is_locked());
        assert!(!model.needs_setup());

        model.lock();
        assert!(!model.unlock("1111").await.is_valid());
        assert!(model.unlock("2222").await.is_valid());
    }

    #[test]
    fn test_reset_optional_guard_unlocks() {
        let fx = fixture(false);
        let model = CodeGuardModel::new(regular("optional").optional(true), fx.context.clone());
        model
            .set_access_code("1111", PasscodeFormat::numeric(4))
            .unwrap();
        model.lock();
        assert!(model.is_locked());

        model.reset_code(None).unwrap();
        assert!(!model.is_locked());
        assert!(!model.needs_setup());
    }

    #[test]
    fn test_reset_unsupported_for_fixed_and_custom() {
        let fx = fixture(false);
        let fixed = CodeGuardModel::new(
            CodeGuardConfig::fixed(GuardId::new("fixed"), "1234"),
            fx.context.clone(),
        );
        assert!(matches!(
            fixed.reset_code(None),
            Err(GuardError::UnsupportedOperation("fixed"))
        ));
        assert!(matches!(
            fixed.set_access_code("1234", PasscodeFormat::numeric(4)),
            Err(GuardError::UnsupportedOperation("fixed"))
        ));

        let custom = CodeGuardModel::new(
            CodeGuardConfig::custom(GuardId::new("custom"), PasscodeFormat::numeric(4), |_: &str| {
                ValidationResult::Valid
            }),
            fx.context.clone(),
        );
        assert!(matches!(
            custom.reset_code(Some("1234")),
            Err(GuardError::UnsupportedOperation("custom"))
        ));
    }

    /// Store whose writes always fail
    struct ReadOnlyStore;

    impl CredentialStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> std::result::Result<Option<Vec<u8>>, StoreError> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &[u8]) -> std::result::Result<(), StoreError> {
            Err(StoreError::Backend("read-only".to_string()))
        }

        fn delete(&self, _key: &str) -> std::result::Result<(), StoreError> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_write_leaves_clean_setup_state() {
        let context = GuardContext::new(Arc::new(ReadOnlyStore));
        let model = CodeGuardModel::new(regular("regular"), context);

        let result = model.reset_code(Some("1234"));
        assert!(matches!(result, Err(GuardError::StoreCode(_))));
        assert!(model.needs_setup());
        assert!(model.persisted_format().is_none());

        let result = model.set_access_code("1234", PasscodeFormat::numeric(4));
        assert!(matches!(result, Err(GuardError::StoreCode(_))));
        assert!(model.needs_setup());
    }

    /// One-time codes: each code unlocks exactly once
    struct ConsumableCodes {
        remaining: Mutex<Vec<String>>,
        consumed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CodeValidator for ConsumableCodes {
        async fn validate(&self, code: &str) -> ValidationResult {
            let mut remaining = self.remaining.lock().unwrap();
            if let Some(idx) = remaining.iter().position(|c| c == code) {
                let code = remaining.remove(idx);
                self.consumed.lock().unwrap().push(code);
                ValidationResult::Valid
            } else if self.consumed.lock().unwrap().iter().any(|c| c == code) {
                ValidationResult::invalid_with("Already Consumed")
            } else {
                ValidationResult::invalid()
            }
        }
    }

    #[tokio::test]
    async fn test_custom_validator_result_is_returned_verbatim() {
        let fx = fixture(false);
        let codes = ConsumableCodes {
            remaining: Mutex::new(vec!["1111".into(), "2222".into()]),
            consumed: Mutex::new(Vec::new()),
        };
        let model = CodeGuardModel::new(
            CodeGuardConfig::custom(GuardId::new("custom"), PasscodeFormat::numeric(4), codes),
            fx.context.clone(),
        );

        assert!(model.is_locked());
        assert!(!model.needs_setup());

        assert_eq!(model.unlock("1111").await, ValidationResult::Valid);
        assert!(!model.is_locked());
        model.lock();

        assert_eq!(
            model.unlock("1111").await,
            ValidationResult::invalid_with("Already Consumed")
        );
        assert!(model.is_locked());
        assert_eq!(model.unlock("3333").await, ValidationResult::invalid());
        assert!(model.unlock("2222").await.is_valid());
    }

    #[tokio::test]
    async fn test_foreground_timeout_boundary() {
        let fx = fixture(false);
        let model = CodeGuardModel::new(
            CodeGuardConfig::fixed(GuardId::new("fixed"), "1234").timeout(Duration::from_secs(10)),
            fx.context.clone(),
        );

        model.unlock("1234").await;
        let background = fx.clock.now();
        fx.clock.advance(chrono::Duration::milliseconds(9_999));
        model.on_enter_foreground(background);
        assert!(!model.is_locked());

        fx.clock.set(background + chrono::Duration::seconds(10));
        model.on_enter_foreground(background);
        assert!(model.is_locked());
    }

    #[tokio::test]
    async fn test_background_alone_never_locks() {
        let fx = fixture(false);
        let model = CodeGuardModel::new(
            CodeGuardConfig::fixed(GuardId::new("fixed"), "1234").timeout(Duration::from_secs(1)),
            fx.context.clone(),
        );
        model.unlock("1234").await;

        model.on_enter_background();
        fx.clock.advance(chrono::Duration::hours(24));
        assert!(!model.is_locked());
    }

    #[tokio::test]
    async fn test_state_changes_are_published() {
        let fx = fixture(false);
        let mut events = fx.context.subscribe();
        let model = CodeGuardModel::new(
            CodeGuardConfig::fixed(GuardId::new("fixed"), "1234"),
            fx.context.clone(),
        );

        model.unlock("1234").await;
        model.lock();
        // No change, no event
        model.lock();

        let first = events.try_recv().unwrap();
        assert_eq!(first.id, "fixed");
        assert_eq!(first.state, GuardState::Unlocked);
        assert_eq!(events.try_recv().unwrap().state, GuardState::Locked);
        assert!(events.try_recv().is_err());
    }
}
