#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use warden_core::{CodeLength, PasscodeFormat};

#[derive(Debug, Arbitrary)]
struct Input {
    numeric: bool,
    exact: bool,
    length: u8,
    code: String,
}

fuzz_target!(|input: Input| {
    let length = if input.exact {
        CodeLength::Exact(input.length as usize)
    } else {
        CodeLength::AtLeast(input.length as usize)
    };
    let format = if input.numeric {
        PasscodeFormat::Numeric(length)
    } else {
        PasscodeFormat::Alphanumeric(length)
    };

    // Validation is pure
    let valid = format.validate(&input.code);
    assert_eq!(valid, format.validate(&input.code));

    // Valid codes satisfy the length constraint in characters
    if valid {
        assert!(length.admits(input.code.chars().count()));
    }

    // Display should not panic
    let _ = format.to_string();

    // Derived fixed formats accept their own code when it is alphanumeric
    let fixed = PasscodeFormat::for_fixed_code(&input.code);
    assert_eq!(fixed.length(), CodeLength::Exact(input.code.chars().count()));
    if input.code.chars().all(char::is_alphanumeric) {
        assert!(fixed.validate(&input.code));
    }
});
