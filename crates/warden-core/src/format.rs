//! Passcode formats
//!
//! A format fixes the character class (digits only, or digits and letters)
//! and the length constraint of an acceptable code. Formats are captured next
//! to every persisted code so a later configuration change never invalidates
//! codes that were set under the old one.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Length constraint of a passcode, counted in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeLength {
    /// Exactly `n` characters
    Exact(usize),
    /// At least `n` characters
    AtLeast(usize),
}

impl CodeLength {
    /// Check whether a code of `len` characters satisfies the constraint
    pub fn admits(&self, len: usize) -> bool {
        match *self {
            Self::Exact(n) => len == n,
            Self::AtLeast(n) => len >= n,
        }
    }

    /// The number the constraint is expressed in
    pub fn value(&self) -> usize {
        match *self {
            Self::Exact(n) | Self::AtLeast(n) => n,
        }
    }
}

/// Shape of an acceptable passcode
///
/// Serialized adjacently tagged, e.g. `{"kind":"numeric","length":{"exact":4}}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "length", rename_all = "snake_case")]
pub enum PasscodeFormat {
    /// ASCII digits only
    Numeric(CodeLength),
    /// Letters and digits
    Alphanumeric(CodeLength),
}

impl PasscodeFormat {
    /// Numeric code of exactly `digits` digits
    pub const fn numeric(digits: usize) -> Self {
        Self::Numeric(CodeLength::Exact(digits))
    }

    /// Numeric code of at least `digits` digits
    pub const fn numeric_at_least(digits: usize) -> Self {
        Self::Numeric(CodeLength::AtLeast(digits))
    }

    /// Alphanumeric code of at least `chars` characters
    pub const fn alphanumeric(chars: usize) -> Self {
        Self::Alphanumeric(CodeLength::AtLeast(chars))
    }

    /// Alphanumeric code of exactly `chars` characters
    pub const fn alphanumeric_exact(chars: usize) -> Self {
        Self::Alphanumeric(CodeLength::Exact(chars))
    }

    /// Derive the format of a fixed code from its content
    ///
    /// All-ASCII-digit codes are numeric, anything else is alphanumeric; the
    /// length is always exact.
    pub fn for_fixed_code(code: &str) -> Self {
        let length = CodeLength::Exact(code.chars().count());
        if code.chars().all(|c| c.is_ascii_digit()) {
            Self::Numeric(length)
        } else {
            Self::Alphanumeric(length)
        }
    }

    /// Length constraint of this format
    pub fn length(&self) -> CodeLength {
        match *self {
            Self::Numeric(length) | Self::Alphanumeric(length) => length,
        }
    }

    /// Whether only digits are accepted
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric(_))
    }

    /// Check that `code` has the right character class and length
    pub fn validate(&self, code: &str) -> bool {
        let allowed = match self {
            Self::Numeric(_) => code.chars().all(|c| c.is_ascii_digit()),
            Self::Alphanumeric(_) => code.chars().all(char::is_alphanumeric),
        };
        allowed && self.length().admits(code.chars().count())
    }
}

impl fmt::Display for PasscodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self, self.length()) {
            (Self::Numeric(_), CodeLength::Exact(n)) => write!(f, "{}-digit numeric", n),
            (Self::Numeric(_), CodeLength::AtLeast(n)) => {
                write!(f, "numeric, at least {} digits", n)
            }
            (Self::Alphanumeric(_), CodeLength::Exact(n)) => {
                write!(f, "{}-character alphanumeric", n)
            }
            (Self::Alphanumeric(_), CodeLength::AtLeast(n)) => {
                write!(f, "alphanumeric, at least {} characters", n)
            }
        }
    }
}
