//! Warden CLI - Tooling around the Warden access guard engine
//!
//! This crate backs the `wardenctl` binary: it loads guard definitions from a
//! JSON config, builds a registry on top of a file credential store and
//! exposes status, code management and an interactive lifecycle session.

pub mod config;
pub mod error;
pub mod guards;
pub mod session;

pub use config::{GuardDefinition, WardenConfig};
pub use error::{CliError, CommandError, Result};
pub use guards::{GuardStatus, GuardTarget};
pub use session::{run_session, SessionCommand};
