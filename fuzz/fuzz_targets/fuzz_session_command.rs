#![no_main]

use libfuzzer_sys::fuzz_target;
use warden_cli::SessionCommand;

fuzz_target!(|line: &str| {
    // Parsing arbitrary input should not panic
    if let Ok(command) = line.parse::<SessionCommand>() {
        // Parsed commands never carry empty arguments
        match command {
            SessionCommand::Unlock { id, code } => {
                assert!(!id.is_empty());
                assert!(!code.is_empty());
            }
            SessionCommand::Lock { id } => assert!(!id.is_empty()),
            _ => {}
        }
    }
});
