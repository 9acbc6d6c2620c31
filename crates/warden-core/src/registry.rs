//! Guard registry
//!
//! The registry owns every guard configuration of the application, creates
//! one model per identifier on first use and fans lifecycle events out to
//! the models created so far. It is meant to be shared in an `Arc` between
//! the UI and whatever drives app lifecycle events.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::config::{CodeGuardConfig, GuardConfig, ValidationResult};
use crate::error::{GuardError, Result};
use crate::format::PasscodeFormat;
use crate::identifier::{BiometricGuard, CodeGuard, GuardId, GuardKind, GuardTag};
use crate::model::{BiometricGuardModel, CodeGuardModel, GuardContext, GuardEvent, GuardModel};

/// Registry of all access guards of an application
pub struct GuardRegistry {
    context: GuardContext,
    configs: RwLock<Vec<GuardConfig>>,
    models: Mutex<HashMap<String, GuardModel>>,
    last_entered_background: Mutex<DateTime<Utc>>,
}

impl GuardRegistry {
    /// Create a registry from the application's guard configurations
    ///
    /// # Panics
    /// If two configurations share an identifier value, including the
    /// identifiers derived for biometric fallbacks, regardless of kind.
    pub fn new(configs: impl IntoIterator<Item = GuardConfig>, context: GuardContext) -> Self {
        let configs: Vec<GuardConfig> = configs.into_iter().collect();

        let mut seen = HashSet::new();
        let duplicates: BTreeSet<String> = configs
            .iter()
            .flat_map(GuardConfig::reserved_values)
            .filter(|value| !seen.insert(value.clone()))
            .collect();
        if !duplicates.is_empty() {
            let duplicates: Vec<_> = duplicates.into_iter().collect();
            panic!(
                "Found duplicate access guard identifiers: {}",
                duplicates.join(", ")
            );
        }

        let now = context.clock().now();
        info!(guards = configs.len(), "Initialized access guard registry");

        Self {
            context,
            configs: RwLock::new(configs),
            models: Mutex::new(HashMap::new()),
            last_entered_background: Mutex::new(now),
        }
    }

    /// Register an additional guard
    pub fn register(&self, config: impl Into<GuardConfig>) -> Result<()> {
        let config = config.into();
        let mut configs = self.configs.write().unwrap_or_else(PoisonError::into_inner);

        let taken: HashSet<String> = configs.iter().flat_map(GuardConfig::reserved_values).collect();
        if let Some(value) = config
            .reserved_values()
            .into_iter()
            .find(|value| taken.contains(value))
        {
            return Err(GuardError::DuplicateIdentifier(value));
        }

        info!(guard = config.id_value(), kind = %config.tag(), "Registered access guard");
        configs.push(config);
        Ok(())
    }

    fn register_fallback(&self, config: &CodeGuardConfig) {
        let mut configs = self.configs.write().unwrap_or_else(PoisonError::into_inner);
        if configs.iter().any(|c| c.id_value() == config.id().value()) {
            return;
        }
        debug!(guard = %config.id(), "Registered passcode fallback");
        configs.push(GuardConfig::Code(config.clone()));
    }

    fn models(&self) -> MutexGuard<'_, HashMap<String, GuardModel>> {
        self.models.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of all registered configurations
    pub fn configs(&self) -> Vec<GuardConfig> {
        self.configs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Resolve a config by value, deriving a biometric fallback if needed
    fn resolve_config(&self, value: &str) -> Option<GuardConfig> {
        let configs = self.configs.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(config) = configs.iter().find(|c| c.id_value() == value) {
            return Some(config.clone());
        }
        configs.iter().find_map(|config| match config {
            GuardConfig::Biometric(bio) if bio.fallback_id_value().as_deref() == Some(value) => {
                bio.fallback_config().map(GuardConfig::Code)
            }
            _ => None,
        })
    }

    /// Kind of the guard registered under `value`, if any
    pub fn kind_of(&self, value: &str) -> Option<GuardTag> {
        self.resolve_config(value).map(|config| config.tag())
    }

    fn model_for(&self, value: &str, tag: GuardTag) -> GuardModel {
        if let Some(model) = self.models().get(value) {
            if model.tag() != tag {
                kind_mismatch(value, tag, model.tag());
            }
            return model.clone();
        }

        let config = self
            .resolve_config(value)
            .unwrap_or_else(|| panic!("No access guard registered for identifier '{}'", value));
        if config.tag() != tag {
            kind_mismatch(value, tag, config.tag());
        }

        // Built without holding the models lock; a fallback is built recursively
        let model = match config {
            GuardConfig::Code(config) => {
                GuardModel::Code(Arc::new(CodeGuardModel::new(config, self.context.clone())))
            }
            GuardConfig::Biometric(config) => {
                let fallback = config.fallback_config().map(|fallback| {
                    self.register_fallback(&fallback);
                    self.code_model_by_value(fallback.id().value())
                });
                GuardModel::Biometric(Arc::new(BiometricGuardModel::new(
                    config,
                    self.context.clone(),
                    fallback,
                )))
            }
        };
        debug!(guard = value, kind = %tag, "Created access guard model");

        self.models()
            .entry(value.to_string())
            .or_insert(model)
            .clone()
    }

    fn code_model_by_value(&self, value: &str) -> Arc<CodeGuardModel> {
        match self.model_for(value, GuardTag::Code) {
            GuardModel::Code(model) => model,
            GuardModel::Biometric(_) => kind_mismatch(value, GuardTag::Code, GuardTag::Biometric),
        }
    }

    /// Model of a code guard, created on first access
    ///
    /// # Panics
    /// If `id` is not registered, or registered as a biometric guard.
    pub fn code_model(&self, id: &GuardId<CodeGuard>) -> Arc<CodeGuardModel> {
        self.code_model_by_value(id.value())
    }

    /// Model of a biometric guard, created on first access
    ///
    /// # Panics
    /// If `id` is not registered, or registered as a code guard.
    pub fn biometric_model(&self, id: &GuardId<BiometricGuard>) -> Arc<BiometricGuardModel> {
        match self.model_for(id.value(), GuardTag::Biometric) {
            GuardModel::Biometric(model) => model,
            GuardModel::Code(_) => kind_mismatch(id.value(), GuardTag::Biometric, GuardTag::Code),
        }
    }

    /// Model of any guard kind
    pub fn model<K: GuardKind>(&self, id: &GuardId<K>) -> GuardModel {
        self.model_for(id.value(), K::TAG)
    }

    pub fn is_locked<K: GuardKind>(&self, id: &GuardId<K>) -> bool {
        self.model(id).is_locked()
    }

    pub fn lock<K: GuardKind>(&self, id: &GuardId<K>) {
        self.model(id).lock();
    }

    /// Whether the guard requires a code to be set up before use
    ///
    /// Biometric guards report their fallback's setup state.
    pub fn needs_setup<K: GuardKind>(&self, id: &GuardId<K>) -> bool {
        match self.model(id) {
            GuardModel::Code(model) => model.needs_setup(),
            GuardModel::Biometric(model) => model
                .fallback()
                .is_some_and(|fallback| fallback.needs_setup()),
        }
    }

    pub fn setup_complete<K: GuardKind>(&self, id: &GuardId<K>) -> bool {
        !self.needs_setup(id)
    }

    /// Attempt to unlock a code guard
    pub async fn unlock_code(&self, id: &GuardId<CodeGuard>, input: &str) -> ValidationResult {
        let model = self.code_model(id);
        model.unlock(input).await
    }

    /// Prompt for biometrics on a biometric guard
    pub async fn unlock_biometric(&self, id: &GuardId<BiometricGuard>) -> Result<bool> {
        let model = self.biometric_model(id);
        model.unlock().await
    }

    /// Attempt to unlock a biometric guard through its passcode fallback
    pub async fn unlock_biometric_fallback(
        &self,
        id: &GuardId<BiometricGuard>,
        input: &str,
    ) -> Result<ValidationResult> {
        let model = self.biometric_model(id);
        model.unlock_with_fallback(input).await
    }

    /// Set the code of a regular code guard
    pub fn set_access_code(
        &self,
        id: &GuardId<CodeGuard>,
        code: &str,
        format: PasscodeFormat,
    ) -> Result<()> {
        self.code_model(id).set_access_code(code, format)
    }

    /// Remove a guard's stored code; biometric guards reset their fallback
    pub fn reset_access_code<K: GuardKind>(&self, id: &GuardId<K>) -> Result<()> {
        match self.model(id) {
            GuardModel::Code(model) => model.reset_code(None),
            GuardModel::Biometric(model) => model.reset_code(),
        }
    }

    /// Record that the app entered the background
    pub fn entered_background(&self) {
        let now = self.context.clock().now();
        *self
            .last_entered_background
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = now;

        let models: Vec<GuardModel> = self.models().values().cloned().collect();
        debug!(models = models.len(), "Entered background");
        for model in models {
            model.on_enter_background();
        }
    }

    /// Lock every guard whose timeout elapsed while in the background
    pub fn entering_foreground(&self) {
        let since = self.last_entered_background();
        let models: Vec<GuardModel> = self.models().values().cloned().collect();
        debug!(models = models.len(), "Entering foreground");
        for model in models {
            model.on_enter_foreground(since);
        }
    }

    pub fn last_entered_background(&self) -> DateTime<Utc> {
        *self
            .last_entered_background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Receive state changes of all guards
    pub fn subscribe(&self) -> broadcast::Receiver<GuardEvent> {
        self.context.subscribe()
    }
}

fn kind_mismatch(value: &str, expected: GuardTag, actual: GuardTag) -> ! {
    panic!(
        "Access guard '{}' is registered as a {} guard, not a {} guard",
        value, actual, expected
    )
}
