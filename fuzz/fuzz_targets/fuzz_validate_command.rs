#![no_main]

use libfuzzer_sys::fuzz_target;

use verdict::SecurityPolicy;

fuzz_target!(|data: &[u8]| {
    if let Ok(command) = std::str::from_utf8(data) {
        // Validation of arbitrary command strings must never panic
        let _ = verdict::validate_command(command, &SecurityPolicy::default());
    }
});
