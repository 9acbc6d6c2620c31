#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use warden_core::{
    CodeGuardConfig, CodeGuardModel, CredentialStore, GuardContext, GuardId, GuardState,
    MemoryCredentialStore, PasscodeFormat,
};

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes where a persisted code is expected must never panic
    let store = Arc::new(MemoryCredentialStore::new());
    store.set("fuzz.guard", data).unwrap();
    let context = GuardContext::new(store.clone());

    let model = CodeGuardModel::new(
        CodeGuardConfig::regular(GuardId::new("fuzz.guard"), PasscodeFormat::numeric(4)),
        context.clone(),
    );

    match model.state() {
        // A stored code was accepted; its own format must be recorded
        GuardState::Locked => assert!(model.persisted_format().is_some()),
        GuardState::NeedsSetup => assert!(model.persisted_format().is_none()),
        GuardState::Unlocked => panic!("non-optional guard started unlocked"),
    }

    // Reset always ends in a clean setup state
    model.reset_code(None).unwrap();
    assert!(model.needs_setup());
    assert!(!store.contains("fuzz.guard"));

    // Optional guards never start locked without a usable code
    store.set("fuzz.optional", data).unwrap();
    let optional = CodeGuardModel::new(
        CodeGuardConfig::regular(GuardId::new("fuzz.optional"), PasscodeFormat::numeric(4))
            .optional(true),
        context,
    );
    assert_eq!(optional.is_locked(), optional.persisted_format().is_some());
});
