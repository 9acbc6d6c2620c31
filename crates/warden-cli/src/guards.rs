//! Guard operations addressed by plain identifier strings
//!
//! Command-line input carries no kind information, so identifiers are
//! resolved against the registry first. Passcodes given for a biometric
//! guard go to its passcode fallback.

use std::collections::HashSet;

use serde::Serialize;
use warden_core::{
    BiometricGuard, CodeGuard, GuardConfig, GuardError, GuardId, GuardRegistry, GuardTag,
    ValidationResult,
};

use crate::error::{CliError, Result};

/// A guard identifier resolved to its kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardTarget {
    Code(GuardId<CodeGuard>),
    Biometric(GuardId<BiometricGuard>),
}

impl GuardTarget {
    /// Resolve `id` against the registry
    pub fn resolve(registry: &GuardRegistry, id: &str) -> Result<Self> {
        match registry.kind_of(id) {
            Some(GuardTag::Code) => Ok(Self::Code(GuardId::new(id.to_string()))),
            Some(GuardTag::Biometric) => Ok(Self::Biometric(GuardId::new(id.to_string()))),
            None => Err(CliError::UnknownGuard(id.to_string())),
        }
    }

    /// Code guard receiving passcodes for this target
    ///
    /// Fails with `NoFallback` for a biometric guard without a passcode fallback.
    fn code_target(&self, registry: &GuardRegistry) -> Result<GuardId<CodeGuard>> {
        match self {
            Self::Code(id) => Ok(id.clone()),
            Self::Biometric(id) => {
                let fallback = id.passcode_fallback();
                match registry.kind_of(fallback.value()) {
                    Some(GuardTag::Code) => Ok(fallback),
                    _ => Err(GuardError::NoFallback(id.to_string()).into()),
                }
            }
        }
    }
}

/// Snapshot of one guard for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardStatus {
    pub id: String,
    pub kind: String,
    pub locked: bool,
    pub needs_setup: bool,
}

/// Status of every configured guard, in registration order
///
/// Derived passcode fallbacks are reported through their biometric guard.
pub fn status(registry: &GuardRegistry) -> Vec<GuardStatus> {
    let configs = registry.configs();
    let fallbacks: HashSet<String> = configs
        .iter()
        .filter_map(|config| match config {
            GuardConfig::Biometric(config) => config.fallback_id_value(),
            GuardConfig::Code(_) => None,
        })
        .collect();

    configs
        .iter()
        .filter(|config| !fallbacks.contains(config.id_value()))
        .map(|config| {
            let (locked, needs_setup) = match config {
                GuardConfig::Code(config) => (
                    registry.is_locked(config.id()),
                    registry.needs_setup(config.id()),
                ),
                GuardConfig::Biometric(config) => (
                    registry.is_locked(config.id()),
                    registry.needs_setup(config.id()),
                ),
            };
            let kind = match config {
                GuardConfig::Code(config) => config.kind().name().to_string(),
                GuardConfig::Biometric(_) => config.tag().to_string(),
            };
            GuardStatus {
                id: config.id_value().to_string(),
                kind,
                locked,
                needs_setup,
            }
        })
        .collect()
}

/// Check `code` against a guard
pub async fn unlock(registry: &GuardRegistry, id: &str, code: &str) -> Result<ValidationResult> {
    match GuardTarget::resolve(registry, id)? {
        GuardTarget::Code(id) => Ok(registry.unlock_code(&id, code).await),
        GuardTarget::Biometric(id) => Ok(registry.unlock_biometric_fallback(&id, code).await?),
    }
}

/// Set a new code in the guard's configured format
pub fn set_code(registry: &GuardRegistry, id: &str, code: &str) -> Result<()> {
    let target = GuardTarget::resolve(registry, id)?.code_target(registry)?;
    let format = registry.code_model(&target).config().format();
    registry.set_access_code(&target, code, format)?;
    Ok(())
}

/// Remove a guard's stored code
pub fn reset(registry: &GuardRegistry, id: &str) -> Result<()> {
    match GuardTarget::resolve(registry, id)? {
        GuardTarget::Code(id) => registry.reset_access_code(&id)?,
        GuardTarget::Biometric(id) => registry.reset_access_code(&id)?,
    }
    Ok(())
}

/// Lock a guard
pub fn lock(registry: &GuardRegistry, id: &str) -> Result<()> {
    match GuardTarget::resolve(registry, id)? {
        GuardTarget::Code(id) => registry.lock(&id),
        GuardTarget::Biometric(id) => registry.lock(&id),
    }
    Ok(())
}
