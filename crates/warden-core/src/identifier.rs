//! Typed access guard identifiers
//!
//! An identifier is a stable string (reverse-DNS style is recommended) that
//! also keys the guard's persisted credential. The phantom kind parameter
//! binds it to exactly one guard kind, so a code identifier can never be used
//! to look up a biometric guard by accident.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Suffix appended to a biometric guard's identifier to name its passcode fallback
pub const FALLBACK_SUFFIX: &str = "~codeFallback";

mod sealed {
    pub trait Sealed {}
}

/// Runtime tag of a guard kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardTag {
    /// Passcode guard
    Code,
    /// Biometric guard (optionally with passcode fallback)
    Biometric,
}

impl GuardTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Biometric => "biometric",
        }
    }
}

impl fmt::Display for GuardTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marker trait for guard kinds; implemented only by [`CodeGuard`] and [`BiometricGuard`]
pub trait GuardKind: sealed::Sealed + Send + Sync + 'static {
    /// Tag this kind resolves to in the registry
    const TAG: GuardTag;
}

/// Kind marker for passcode guards
#[derive(Debug)]
pub enum CodeGuard {}

/// Kind marker for biometric guards
#[derive(Debug)]
pub enum BiometricGuard {}

impl sealed::Sealed for CodeGuard {}
impl sealed::Sealed for BiometricGuard {}

impl GuardKind for CodeGuard {
    const TAG: GuardTag = GuardTag::Code;
}

impl GuardKind for BiometricGuard {
    const TAG: GuardTag = GuardTag::Biometric;
}

/// Identifier of one access guard, bound to its kind at compile time
///
/// ```
/// use warden_core::{CodeGuard, GuardId};
///
/// const TRANSACTIONS: GuardId<CodeGuard> = GuardId::from_static("com.example.app.transactions");
/// assert_eq!(TRANSACTIONS.value(), "com.example.app.transactions");
/// ```
pub struct GuardId<K: GuardKind> {
    value: Cow<'static, str>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: GuardKind> GuardId<K> {
    /// Create an identifier from an owned or borrowed string
    pub fn new(value: impl Into<Cow<'static, str>>) -> Self {
        Self {
            value: value.into(),
            _kind: PhantomData,
        }
    }

    /// Create an identifier usable in `const` items
    pub const fn from_static(value: &'static str) -> Self {
        Self {
            value: Cow::Borrowed(value),
            _kind: PhantomData,
        }
    }

    /// The raw identifier string
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The kind this identifier is bound to
    pub fn tag(&self) -> GuardTag {
        K::TAG
    }
}

impl GuardId<BiometricGuard> {
    /// Identifier of this biometric guard's passcode fallback
    ///
    /// Only meaningful for addressing the fallback code directly, e.g. to set
    /// or reset it.
    pub fn passcode_fallback(&self) -> GuardId<CodeGuard> {
        GuardId::new(fallback_value(&self.value))
    }
}

pub(crate) fn fallback_value(value: &str) -> String {
    format!("{}{}", value, FALLBACK_SUFFIX)
}

impl<K: GuardKind> Clone for GuardId<K> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K: GuardKind> PartialEq for GuardId<K> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<K: GuardKind> Eq for GuardId<K> {}

impl<K: GuardKind> Hash for GuardId<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<K: GuardKind> fmt::Debug for GuardId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GuardId<{}>({:?})", K::TAG, self.value)
    }
}

impl<K: GuardKind> fmt::Display for GuardId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATIC_ID: GuardId<CodeGuard> = GuardId::from_static("edu.example.static");

    #[test]
    fn test_static_and_owned_ids_compare_by_value() {
        let owned = GuardId::<CodeGuard>::new(String::from("edu.example.static"));
        assert_eq!(STATIC_ID, owned);
        assert_eq!(owned.tag(), GuardTag::Code);
    }

    #[test]
    fn test_passcode_fallback_id() {
        let id = GuardId::<BiometricGuard>::new("edu.example.faceid");
        let fallback = id.passcode_fallback();
        assert_eq!(fallback.value(), "edu.example.faceid~codeFallback");
        assert_eq!(fallback.tag(), GuardTag::Code);
    }

    #[test]
    fn test_debug_includes_kind() {
        let id = GuardId::<BiometricGuard>::new("a");
        assert_eq!(format!("{:?}", id), "GuardId<biometric>(\"a\")");
        assert_eq!(id.to_string(), "a");
    }
}
