//! End-to-end scenarios for the guard registry

mod common;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::tempdir;
use tokio::sync::Notify;
use warden_core::{
    BiometricGuard, BiometricGuardConfig, CodeGuard, CodeGuardConfig, CodeKind, CodeValidator,
    FileCredentialStore, GuardContext, GuardError, GuardId, GuardRegistry, PasscodeFormat,
    ValidationResult,
};

use common::Harness;

const GUARD_A: GuardId<CodeGuard> = GuardId::from_static("com.example.app.guardA");
const GUARD_B: GuardId<CodeGuard> = GuardId::from_static("com.example.app.guardB");
const FACE_ID: GuardId<BiometricGuard> = GuardId::from_static("com.example.app.faceid");

#[tokio::test]
async fn test_fixed_code_scenario() {
    let harness = Harness::new(false);
    let registry = GuardRegistry::new(
        [CodeGuardConfig::fixed(GUARD_A, "1234").into()],
        harness.context(),
    );

    assert!(registry.is_locked(&GUARD_A));
    assert!(registry.setup_complete(&GUARD_A));

    assert!(!registry.unlock_code(&GUARD_A, "4321").await.is_valid());
    assert!(registry.is_locked(&GUARD_A));

    assert!(registry.unlock_code(&GUARD_A, "1234").await.is_valid());
    assert!(!registry.is_locked(&GUARD_A));

    registry.lock(&GUARD_A);
    assert!(registry.is_locked(&GUARD_A));
}

#[tokio::test]
async fn test_optional_regular_scenario() {
    let harness = Harness::new(false);
    let registry = GuardRegistry::new(
        [CodeGuardConfig::regular(GUARD_B, PasscodeFormat::numeric(4))
            .optional(true)
            .into()],
        harness.context(),
    );

    // Nothing set up yet: open
    assert!(!registry.is_locked(&GUARD_B));
    assert!(!registry.needs_setup(&GUARD_B));

    registry
        .set_access_code(&GUARD_B, "8080", PasscodeFormat::numeric(4))
        .unwrap();
    registry.lock(&GUARD_B);
    assert!(registry.is_locked(&GUARD_B));
    assert!(registry.unlock_code(&GUARD_B, "8080").await.is_valid());

    registry.reset_access_code(&GUARD_B).unwrap();
    assert!(!registry.is_locked(&GUARD_B));
    assert!(harness.store.is_empty());
}

#[tokio::test]
async fn test_code_survives_restart_with_file_store() {
    let dir = tempdir().unwrap();
    let config = || CodeGuardConfig::regular(GUARD_B, PasscodeFormat::numeric(6));

    {
        let store = FileCredentialStore::new(dir.path()).unwrap();
        let registry = GuardRegistry::new([config().into()], GuardContext::new(Arc::new(store)));
        assert!(registry.needs_setup(&GUARD_B));
        registry
            .set_access_code(&GUARD_B, "246810", PasscodeFormat::numeric(6))
            .unwrap();
    }

    let store = FileCredentialStore::new(dir.path()).unwrap();
    let registry = GuardRegistry::new([config().into()], GuardContext::new(Arc::new(store)));
    assert!(!registry.needs_setup(&GUARD_B));
    assert!(registry.is_locked(&GUARD_B));
    assert!(!registry.unlock_code(&GUARD_B, "135791").await.is_valid());
    assert!(registry.unlock_code(&GUARD_B, "246810").await.is_valid());
}

#[test]
fn test_reset_twice_leaves_no_credential() {
    let harness = Harness::new(false);
    let registry = GuardRegistry::new(
        [CodeGuardConfig::regular(GUARD_B, PasscodeFormat::numeric(4)).into()],
        harness.context(),
    );
    registry
        .set_access_code(&GUARD_B, "1111", PasscodeFormat::numeric(4))
        .unwrap();

    for _ in 0..2 {
        registry.reset_access_code(&GUARD_B).unwrap();
        assert!(registry.needs_setup(&GUARD_B));
        assert!(registry.is_locked(&GUARD_B));
        assert!(harness.store.is_empty());
    }
}

#[tokio::test]
async fn test_timeout_boundary_is_inclusive() {
    let harness = Harness::new(false);
    let registry = GuardRegistry::new(
        [CodeGuardConfig::fixed(GUARD_A, "1234")
            .timeout(Duration::from_secs(10))
            .into()],
        harness.context(),
    );

    registry.unlock_code(&GUARD_A, "1234").await;
    registry.entered_background();
    harness.clock.advance(chrono::Duration::milliseconds(9_999));
    registry.entering_foreground();
    assert!(!registry.is_locked(&GUARD_A));

    harness.clock.advance(chrono::Duration::milliseconds(1));
    registry.entering_foreground();
    assert!(registry.is_locked(&GUARD_A));
}

#[test]
#[should_panic(expected = "com.example.app.guardA")]
fn test_duplicate_identifiers_panic() {
    let harness = Harness::new(false);
    GuardRegistry::new(
        [
            CodeGuardConfig::fixed(GUARD_A, "1234").into(),
            BiometricGuardConfig::new(GuardId::new("com.example.app.guardA")).into(),
        ],
        harness.context(),
    );
}

#[tokio::test]
async fn test_biometric_guard_routes_to_fallback() {
    let harness = Harness::new(false);
    let registry = GuardRegistry::new(
        [BiometricGuardConfig::new(FACE_ID)
            .fallback(CodeKind::regular(PasscodeFormat::numeric(4)))
            .into()],
        harness.context(),
    );

    let fallback = FACE_ID.passcode_fallback();
    registry
        .set_access_code(&fallback, "9753", PasscodeFormat::numeric(4))
        .unwrap();
    registry.lock(&FACE_ID);
    assert!(registry.is_locked(&FACE_ID));
    assert!(registry.is_locked(&fallback));

    assert!(registry.unlock_code(&fallback, "9753").await.is_valid());
    assert!(!registry.is_locked(&FACE_ID));

    // Biometrics become available: the outer guard now tracks the prompt
    harness.biometrics.set_available(true);
    assert!(registry.is_locked(&FACE_ID));
    assert!(registry.unlock_biometric(&FACE_ID).await.unwrap());
    assert!(!registry.is_locked(&FACE_ID));
    assert_eq!(harness.biometrics.prompts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_biometric_without_fallback_is_permanently_locked() {
    let harness = Harness::new(false);
    let registry = GuardRegistry::new(
        [BiometricGuardConfig::new(FACE_ID).without_fallback().into()],
        harness.context(),
    );

    assert!(registry.is_locked(&FACE_ID));
    let err = registry.unlock_biometric(&FACE_ID).await.unwrap_err();
    assert!(matches!(err, GuardError::BiometricsUnavailable));
    let err = registry
        .unlock_biometric_fallback(&FACE_ID, "1234")
        .await
        .unwrap_err();
    assert!(matches!(err, GuardError::NoFallback(_)));
    assert!(err.leaves_locked());
    assert!(registry.is_locked(&FACE_ID));
}

/// Each code unlocks once
struct ConsumableCodes {
    codes: Mutex<Vec<String>>,
}

#[async_trait]
impl CodeValidator for ConsumableCodes {
    async fn validate(&self, code: &str) -> ValidationResult {
        let mut codes = self.codes.lock().unwrap();
        match codes.iter().position(|c| c == code) {
            Some(idx) => {
                codes.remove(idx);
                ValidationResult::Valid
            }
            None => ValidationResult::invalid_with("Unknown or already used code"),
        }
    }
}

#[tokio::test]
async fn test_consumable_codes() {
    let harness = Harness::new(false);
    let validator = ConsumableCodes {
        codes: Mutex::new(vec!["1111".into(), "2222".into()]),
    };
    let registry = GuardRegistry::new(
        [
            CodeGuardConfig::custom(GUARD_A, PasscodeFormat::numeric(4), validator)
                .message("Enter one of your recovery codes")
                .into(),
        ],
        harness.context(),
    );

    assert_eq!(
        registry.code_model(&GUARD_A).config().kind().message(),
        Some("Enter one of your recovery codes")
    );
    assert!(registry.unlock_code(&GUARD_A, "1111").await.is_valid());
    registry.lock(&GUARD_A);

    let result = registry.unlock_code(&GUARD_A, "1111").await;
    assert_eq!(result.message(), Some("Unknown or already used code"));
    assert!(registry.is_locked(&GUARD_A));
    assert!(registry.unlock_code(&GUARD_A, "2222").await.is_valid());
}

/// Validator that waits for a signal before accepting
struct GatedValidator {
    gate: Arc<Notify>,
}

#[async_trait]
impl CodeValidator for GatedValidator {
    async fn validate(&self, _code: &str) -> ValidationResult {
        self.gate.notified().await;
        ValidationResult::Valid
    }
}

#[tokio::test]
async fn test_in_flight_unlock_reports_previous_state() {
    let harness = Harness::new(false);
    let gate = Arc::new(Notify::new());
    let registry = Arc::new(GuardRegistry::new(
        [CodeGuardConfig::custom(
            GUARD_A,
            PasscodeFormat::numeric(4),
            GatedValidator { gate: gate.clone() },
        )
        .into()],
        harness.context(),
    ));

    let task = tokio::spawn({
        let registry = registry.clone();
        async move { registry.unlock_code(&GUARD_A, "0000").await }
    });

    tokio::task::yield_now().await;
    assert!(registry.is_locked(&GUARD_A));
    // Lands while the validator is suspended; the later unlock wins
    registry.lock(&GUARD_A);

    gate.notify_one();
    assert!(task.await.unwrap().is_valid());
    assert!(!registry.is_locked(&GUARD_A));
}

#[tokio::test]
async fn test_dropped_unlock_leaves_guard_locked() {
    let harness = Harness::new(false);
    let registry = GuardRegistry::new(
        [CodeGuardConfig::custom(
            GUARD_A,
            PasscodeFormat::numeric(4),
            GatedValidator {
                gate: Arc::new(Notify::new()),
            },
        )
        .into()],
        harness.context(),
    );

    let id = GUARD_A;
    let attempt = registry.unlock_code(&id, "0000");
    let timed_out = tokio::time::timeout(Duration::from_millis(10), attempt).await;
    assert!(timed_out.is_err());
    assert!(registry.is_locked(&GUARD_A));
}
