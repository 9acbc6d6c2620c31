//! Interactive lifecycle session
//!
//! Drives one registry from line-oriented input, so lock/unlock behavior and
//! background timeouts can be exercised against a real credential store.

use std::str::FromStr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;
use warden_core::{GuardRegistry, ValidationResult};

use crate::error::{CommandError, Result};
use crate::guards;

/// One line of session input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Unlock { id: String, code: String },
    Lock { id: String },
    Background,
    Foreground,
    Status,
    Help,
    Quit,
}

const HELP: &str = "commands: unlock <id> <code> | lock <id> | background | foreground | status | help | quit";

impl FromStr for SessionCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().ok_or(CommandError::Empty)?;

        let mut arg = |command: &'static str, argument: &'static str| {
            words
                .next()
                .map(str::to_string)
                .ok_or(CommandError::MissingArgument { command, argument })
        };

        let parsed = match command {
            "unlock" => Self::Unlock {
                id: arg("unlock", "id")?,
                code: arg("unlock", "code")?,
            },
            "lock" => Self::Lock {
                id: arg("lock", "id")?,
            },
            "background" | "bg" => Self::Background,
            "foreground" | "fg" => Self::Foreground,
            "status" => Self::Status,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(CommandError::UnknownCommand(other.to_string())),
        };

        match words.next() {
            Some(extra) => Err(CommandError::UnexpectedArgument(extra.to_string())),
            None => Ok(parsed),
        }
    }
}

/// Execute one command, returning the line to print
async fn execute(registry: &GuardRegistry, command: SessionCommand) -> Result<String> {
    let output = match command {
        SessionCommand::Unlock { id, code } => {
            match guards::unlock(registry, &id, &code).await? {
                ValidationResult::Valid => format!("{}: unlocked", id),
                ValidationResult::Invalid { message: Some(message) } => {
                    format!("{}: invalid code ({})", id, message)
                }
                ValidationResult::Invalid { message: None } => format!("{}: invalid code", id),
            }
        }
        SessionCommand::Lock { id } => {
            guards::lock(registry, &id)?;
            format!("{}: locked", id)
        }
        SessionCommand::Background => {
            registry.entered_background();
            "entered background".to_string()
        }
        SessionCommand::Foreground => {
            registry.entering_foreground();
            "entered foreground".to_string()
        }
        SessionCommand::Status => guards::status(registry)
            .iter()
            .map(|status| {
                format!(
                    "{} [{}] {}{}",
                    status.id,
                    status.kind,
                    if status.locked { "locked" } else { "unlocked" },
                    if status.needs_setup { ", needs setup" } else { "" }
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
        SessionCommand::Help => HELP.to_string(),
        SessionCommand::Quit => String::new(),
    };
    Ok(output)
}

/// Run a session until `quit` or end of input
///
/// Parse and guard errors are reported on `output` and the session goes on.
pub async fn run_session<R, W>(registry: &GuardRegistry, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let command = match line.parse::<SessionCommand>() {
            Ok(command) => command,
            Err(CommandError::Empty) => continue,
            Err(e) => {
                output.write_all(format!("error: {}\n", e).as_bytes()).await?;
                continue;
            }
        };
        debug!(?command, "Session command");
        if command == SessionCommand::Quit {
            break;
        }

        let text = match execute(registry, command).await {
            Ok(text) => text,
            Err(e) => format!("error: {}", e),
        };
        output.write_all(text.as_bytes()).await?;
        output.write_all(b"\n").await?;
    }
    output.flush().await?;
    Ok(())
}
