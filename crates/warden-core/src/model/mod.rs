//! Stateful guard models
//!
//! One model exists per configured identifier. Models are created lazily by
//! the registry and receive everything they need through a [`GuardContext`]
//! instead of reaching back into the registry.
//!
//! # State Machine
//!
//! ```text
//!            set code / reset(new)
//! NeedsSetup ─────────────────────────┐
//!     ▲                               ▼
//!     │ reset            unlock(valid)
//!     └────────── Locked ───────────▶ Unlocked
//!                   ▲                   │
//!                   └───────────────────┘
//!                 lock / timeout / unlock(invalid)
//! ```

mod biometric;
mod code;

pub use biometric::BiometricGuardModel;
pub use code::CodeGuardModel;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::biometric::{BiometricAuthenticator, UnavailableBiometrics};
use crate::clock::{Clock, SystemClock};
use crate::identifier::GuardTag;
use crate::store::CredentialStore;

/// Capacity of the state change channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Lock state of a guard
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum GuardState {
    /// A regular code must be chosen before the guard can be unlocked
    NeedsSetup,
    /// Locked; an unlock attempt is required
    #[default]
    Locked,
    /// Unlocked; the guarded content may be shown
    Unlocked,
}

impl GuardState {
    /// Callers treat guards that still need setup as locked
    pub fn is_locked(&self) -> bool {
        !matches!(self, Self::Unlocked)
    }
}

/// Notification that a guard changed state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardEvent {
    /// Identifier value of the guard
    pub id: String,
    /// New state
    pub state: GuardState,
}

/// Dependencies shared by the registry and all of its models
#[derive(Clone)]
pub struct GuardContext {
    store: Arc<dyn CredentialStore>,
    biometrics: Arc<dyn BiometricAuthenticator>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<GuardEvent>,
}

impl GuardContext {
    /// Context with the given store, no biometrics and the system clock
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            biometrics: Arc::new(UnavailableBiometrics),
            clock: Arc::new(SystemClock),
            events,
        }
    }

    /// Use `biometrics` as the device capability
    pub fn with_biometrics(mut self, biometrics: Arc<dyn BiometricAuthenticator>) -> Self {
        self.biometrics = biometrics;
        self
    }

    /// Use `clock` as time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &dyn CredentialStore {
        self.store.as_ref()
    }

    pub fn biometrics(&self) -> &dyn BiometricAuthenticator {
        self.biometrics.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Receive state change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<GuardEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, id: &str, state: GuardState) {
        // No subscribers is fine
        let _ = self.events.send(GuardEvent {
            id: id.to_string(),
            state,
        });
    }
}

/// A materialized guard of either kind
#[derive(Clone)]
pub enum GuardModel {
    Code(Arc<CodeGuardModel>),
    Biometric(Arc<BiometricGuardModel>),
}

impl GuardModel {
    pub fn tag(&self) -> GuardTag {
        match self {
            Self::Code(_) => GuardTag::Code,
            Self::Biometric(_) => GuardTag::Biometric,
        }
    }

    /// Identifier value of the underlying guard
    pub fn id_value(&self) -> &str {
        match self {
            Self::Code(model) => model.config().id().value(),
            Self::Biometric(model) => model.config().id().value(),
        }
    }

    pub fn is_locked(&self) -> bool {
        match self {
            Self::Code(model) => model.is_locked(),
            Self::Biometric(model) => model.is_locked(),
        }
    }

    pub fn lock(&self) {
        match self {
            Self::Code(model) => model.lock(),
            Self::Biometric(model) => model.lock(),
        }
    }

    pub fn on_enter_background(&self) {
        match self {
            Self::Code(model) => model.on_enter_background(),
            Self::Biometric(model) => model.on_enter_background(),
        }
    }

    pub fn on_enter_foreground(&self, last_entered_background: DateTime<Utc>) {
        match self {
            Self::Code(model) => model.on_enter_foreground(last_entered_background),
            Self::Biometric(model) => model.on_enter_foreground(last_entered_background),
        }
    }
}
