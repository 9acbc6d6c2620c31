//! CLI configuration
//!
//! The config file lists the guards of the application being inspected and
//! where their credentials live:
//!
//! ```json
//! {
//!   "store_path": "/home/me/.local/share/warden/credentials",
//!   "guards": [
//!     { "type": "regular", "id": "com.example.vault", "format": {"kind": "numeric", "length": {"exact": 6}} },
//!     { "type": "biometric", "id": "com.example.faceid", "timeout_secs": 60 }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;
use warden_core::{
    BiometricGuardConfig, CodeGuardConfig, CodeKind, FileCredentialStore, GuardConfig,
    GuardContext, GuardId, GuardRegistry, PasscodeFormat, DEFAULT_FALLBACK_FORMAT,
    DEFAULT_TIMEOUT,
};

use crate::error::{CliError, Result};

/// Environment variable overriding the config path
pub const CONFIG_ENV: &str = "WARDEN_CONFIG";

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_fallback() -> Option<PasscodeFormat> {
    Some(DEFAULT_FALLBACK_FORMAT)
}

/// One guard as written in the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GuardDefinition {
    /// User-settable code
    Regular {
        id: String,
        format: PasscodeFormat,
        #[serde(default)]
        optional: bool,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    /// Code baked into the config
    Fixed {
        id: String,
        code: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    /// Biometric guard; `fallback: null` disables the passcode fallback
    Biometric {
        id: String,
        #[serde(default = "default_fallback")]
        fallback: Option<PasscodeFormat>,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl GuardDefinition {
    pub fn id(&self) -> &str {
        match self {
            Self::Regular { id, .. } | Self::Fixed { id, .. } | Self::Biometric { id, .. } => id,
        }
    }

    /// Engine configuration for this definition
    pub fn to_guard_config(&self) -> GuardConfig {
        match self {
            Self::Regular {
                id,
                format,
                optional,
                timeout_secs,
            } => CodeGuardConfig::regular(GuardId::new(id.clone()), *format)
                .optional(*optional)
                .timeout(Duration::from_secs(*timeout_secs))
                .into(),
            Self::Fixed {
                id,
                code,
                timeout_secs,
            } => CodeGuardConfig::fixed(GuardId::new(id.clone()), code.clone())
                .timeout(Duration::from_secs(*timeout_secs))
                .into(),
            Self::Biometric {
                id,
                fallback,
                timeout_secs,
            } => {
                let config = BiometricGuardConfig::new(GuardId::new(id.clone()))
                    .timeout(Duration::from_secs(*timeout_secs));
                match fallback {
                    Some(format) => config.fallback(CodeKind::regular(*format)),
                    None => config.without_fallback(),
                }
                .into()
            }
        }
    }
}

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardenConfig {
    /// Directory of the file credential store
    pub store_path: PathBuf,

    /// Guards of the application
    pub guards: Vec<GuardDefinition>,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            store_path: FileCredentialStore::default_path(),
            guards: vec![GuardDefinition::Regular {
                id: "warden.vault".to_string(),
                format: PasscodeFormat::numeric(6),
                optional: false,
                timeout_secs: default_timeout_secs(),
            }],
        }
    }
}

impl WardenConfig {
    /// Config path from the environment, falling back to the platform config dir
    pub fn default_path() -> PathBuf {
        std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("warden")
                    .join("config.json")
            })
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load the config at `path`, writing the default first if it is missing
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        let config = Self::default();
        config.save(path)?;
        info!("Created default config at {:?}", path);
        Ok(config)
    }

    /// Reject configs the registry would refuse to start with
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for config in self.guards.iter().map(GuardDefinition::to_guard_config) {
            for value in config.reserved_values() {
                if !seen.insert(value.clone()) {
                    return Err(CliError::Config(format!(
                        "duplicate guard identifier '{}'",
                        value
                    )));
                }
            }
        }
        Ok(())
    }

    /// Create directories if they don't exist
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.store_path)?;
        Ok(())
    }

    /// Registry over the configured guards, backed by the file store
    pub fn build_registry(&self) -> Result<GuardRegistry> {
        self.validate()?;
        let store = FileCredentialStore::new(&self.store_path)?;
        let configs: Vec<GuardConfig> = self
            .guards
            .iter()
            .map(GuardDefinition::to_guard_config)
            .collect();
        Ok(GuardRegistry::new(configs, GuardContext::new(Arc::new(store))))
    }
}
