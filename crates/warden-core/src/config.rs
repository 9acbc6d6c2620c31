//! Access guard configuration
//!
//! Configs are immutable descriptions of how a guard behaves. They are built
//! once when the application wires up its [`GuardRegistry`](crate::GuardRegistry)
//! and live for the rest of the process.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{GuardError, Result};
use crate::format::PasscodeFormat;
use crate::identifier::{fallback_value, BiometricGuard, CodeGuard, GuardId, GuardTag};

/// Default time a guard stays unlocked while the app is in the background
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Default passcode fallback of biometric guards
pub const DEFAULT_FALLBACK_FORMAT: PasscodeFormat = PasscodeFormat::alphanumeric(6);

/// Outcome of checking a passcode
///
/// A wrong code is an expected outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// The code is correct; the guard unlocks
    Valid,
    /// The code is wrong; the guard stays locked
    Invalid {
        /// Optional message to show to the user
        message: Option<String>,
    },
}

impl ValidationResult {
    /// Invalid without a message
    pub fn invalid() -> Self {
        Self::Invalid { message: None }
    }

    /// Invalid with a user-facing message
    pub fn invalid_with(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: Some(message.into()),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Message attached to an invalid result
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Valid => None,
            Self::Invalid { message } => message.as_deref(),
        }
    }

    /// Convert into a `Result`, mapping `Invalid` to [`GuardError::WrongPasscode`]
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Valid => Ok(()),
            Self::Invalid { .. } => Err(GuardError::WrongPasscode),
        }
    }
}

/// Application-supplied passcode check for custom code guards
///
/// The validator is the only place allowed to hold application state such as
/// one-time codes. Plain closures `Fn(&str) -> ValidationResult` implement it.
#[async_trait]
pub trait CodeValidator: Send + Sync {
    /// Decide whether `code` unlocks the guard
    async fn validate(&self, code: &str) -> ValidationResult;
}

#[async_trait]
impl<F> CodeValidator for F
where
    F: Fn(&str) -> ValidationResult + Send + Sync,
{
    async fn validate(&self, code: &str) -> ValidationResult {
        self(code)
    }
}

/// How a code guard decides whether a code is correct
#[derive(Clone)]
pub enum CodeKind {
    /// User-chosen code persisted in the credential store
    Regular {
        /// Format new codes must satisfy
        format: PasscodeFormat,
    },
    /// Code baked into the configuration
    Fixed {
        /// Format derived from the code
        format: PasscodeFormat,
        /// The code itself
        code: String,
    },
    /// Validity decided by application logic
    Custom {
        /// Optional prompt shown above the code entry
        message: Option<String>,
        /// Format of codes the validator expects
        format: PasscodeFormat,
        /// The validator
        validator: Arc<dyn CodeValidator>,
    },
}

impl CodeKind {
    /// Regular, user-settable code
    pub fn regular(format: PasscodeFormat) -> Self {
        Self::Regular { format }
    }

    /// Fixed code; the format is derived from the code
    pub fn fixed(code: impl Into<String>) -> Self {
        let code = code.into();
        Self::Fixed {
            format: PasscodeFormat::for_fixed_code(&code),
            code,
        }
    }

    /// Custom-validated code
    pub fn custom(format: PasscodeFormat, validator: impl CodeValidator + 'static) -> Self {
        Self::Custom {
            message: None,
            format,
            validator: Arc::new(validator),
        }
    }

    /// Attach a prompt message; only custom kinds carry one
    pub fn with_message(self, message: impl Into<String>) -> Self {
        match self {
            Self::Custom {
                format, validator, ..
            } => Self::Custom {
                message: Some(message.into()),
                format,
                validator,
            },
            other => other,
        }
    }

    /// Format of codes accepted by this kind
    pub fn format(&self) -> PasscodeFormat {
        match self {
            Self::Regular { format } | Self::Fixed { format, .. } | Self::Custom { format, .. } => {
                *format
            }
        }
    }

    /// Prompt message of custom kinds
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Custom { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Short name used in logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            Self::Regular { .. } => "regular",
            Self::Fixed { .. } => "fixed",
            Self::Custom { .. } => "custom",
        }
    }

    /// Whether the code lives in the credential store
    pub fn is_regular(&self) -> bool {
        matches!(self, Self::Regular { .. })
    }
}

impl fmt::Debug for CodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regular { format } => f.debug_struct("Regular").field("format", format).finish(),
            Self::Fixed { format, .. } => f
                .debug_struct("Fixed")
                .field("format", format)
                .field("code", &"<redacted>")
                .finish(),
            Self::Custom {
                message, format, ..
            } => f
                .debug_struct("Custom")
                .field("message", message)
                .field("format", format)
                .finish_non_exhaustive(),
        }
    }
}

/// Configuration of a passcode guard
#[derive(Clone, Debug)]
pub struct CodeGuardConfig {
    id: GuardId<CodeGuard>,
    timeout: Duration,
    is_optional: bool,
    kind: CodeKind,
}

impl CodeGuardConfig {
    /// Guard with a user-chosen code in the given format
    pub fn regular(id: GuardId<CodeGuard>, format: PasscodeFormat) -> Self {
        Self::with_kind(id, CodeKind::regular(format))
    }

    /// Guard with a fixed code
    pub fn fixed(id: GuardId<CodeGuard>, code: impl Into<String>) -> Self {
        Self::with_kind(id, CodeKind::fixed(code))
    }

    /// Guard whose codes are checked by `validator`
    pub fn custom(
        id: GuardId<CodeGuard>,
        format: PasscodeFormat,
        validator: impl CodeValidator + 'static,
    ) -> Self {
        Self::with_kind(id, CodeKind::custom(format, validator))
    }

    /// Guard of an arbitrary kind with default timeout, not optional
    pub fn with_kind(id: GuardId<CodeGuard>, kind: CodeKind) -> Self {
        Self {
            id,
            timeout: DEFAULT_TIMEOUT,
            is_optional: false,
            kind,
        }
    }

    /// Set how long the guard stays unlocked in the background
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Make the guard optional: without a stored code it starts unlocked
    ///
    /// Only regular guards have a stored code; fixed and custom guards ignore
    /// this flag and always start locked.
    pub fn optional(mut self, is_optional: bool) -> Self {
        self.is_optional = is_optional;
        self
    }

    /// Set a prompt message on a custom guard
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.kind = self.kind.with_message(message);
        self
    }

    pub fn id(&self) -> &GuardId<CodeGuard> {
        &self.id
    }

    pub fn timeout_duration(&self) -> Duration {
        self.timeout
    }

    pub fn is_optional(&self) -> bool {
        self.is_optional
    }

    pub fn kind(&self) -> &CodeKind {
        &self.kind
    }

    /// Format derived from the kind
    pub fn format(&self) -> PasscodeFormat {
        self.kind.format()
    }
}

/// Configuration of a biometric guard
#[derive(Clone, Debug)]
pub struct BiometricGuardConfig {
    id: GuardId<BiometricGuard>,
    timeout: Duration,
    fallback: Option<CodeKind>,
}

impl BiometricGuardConfig {
    /// Biometric guard with the default alphanumeric passcode fallback
    pub fn new(id: GuardId<BiometricGuard>) -> Self {
        Self {
            id,
            timeout: DEFAULT_TIMEOUT,
            fallback: Some(CodeKind::regular(DEFAULT_FALLBACK_FORMAT)),
        }
    }

    /// Set how long the guard stays unlocked in the background
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use `kind` as passcode fallback when biometrics are unavailable
    pub fn fallback(mut self, kind: CodeKind) -> Self {
        self.fallback = Some(kind);
        self
    }

    /// Disable the passcode fallback; without biometrics the guard stays locked
    pub fn without_fallback(mut self) -> Self {
        self.fallback = None;
        self
    }

    pub fn id(&self) -> &GuardId<BiometricGuard> {
        &self.id
    }

    pub fn timeout_duration(&self) -> Duration {
        self.timeout
    }

    pub fn fallback_kind(&self) -> Option<&CodeKind> {
        self.fallback.as_ref()
    }

    /// Identifier value the fallback code guard is registered under
    pub fn fallback_id_value(&self) -> Option<String> {
        self.fallback
            .as_ref()
            .map(|_| fallback_value(self.id.value()))
    }

    /// Derived config of the passcode fallback
    ///
    /// The fallback shares the guard's timeout and is optional, so a device
    /// without biometrics and without a fallback code is not locked out.
    pub fn fallback_config(&self) -> Option<CodeGuardConfig> {
        self.fallback.as_ref().map(|kind| {
            CodeGuardConfig::with_kind(self.id.passcode_fallback(), kind.clone())
                .timeout(self.timeout)
                .optional(true)
        })
    }
}

/// Configuration of any guard kind
#[derive(Clone, Debug)]
pub enum GuardConfig {
    Code(CodeGuardConfig),
    Biometric(BiometricGuardConfig),
}

impl GuardConfig {
    /// Raw identifier value
    pub fn id_value(&self) -> &str {
        match self {
            Self::Code(config) => config.id().value(),
            Self::Biometric(config) => config.id().value(),
        }
    }

    pub fn tag(&self) -> GuardTag {
        match self {
            Self::Code(_) => GuardTag::Code,
            Self::Biometric(_) => GuardTag::Biometric,
        }
    }

    pub fn timeout(&self) -> Duration {
        match self {
            Self::Code(config) => config.timeout_duration(),
            Self::Biometric(config) => config.timeout_duration(),
        }
    }

    /// Every identifier value this config occupies, including a derived fallback
    pub fn reserved_values(&self) -> Vec<String> {
        let mut values = vec![self.id_value().to_string()];
        if let Self::Biometric(config) = self {
            values.extend(config.fallback_id_value());
        }
        values
    }
}

impl From<CodeGuardConfig> for GuardConfig {
    fn from(config: CodeGuardConfig) -> Self {
        Self::Code(config)
    }
}

impl From<BiometricGuardConfig> for GuardConfig {
    fn from(config: BiometricGuardConfig) -> Self {
        Self::Biometric(config)
    }
}
