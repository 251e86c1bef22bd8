#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        // Split the input into a fake stdout/stderr pair and feed every
        // parser. Parsing arbitrary output must never panic.
        let (stdout, stderr) = match content.split_once('\x00') {
            Some((out, err)) => (out, err),
            None => (content, ""),
        };

        for parser in verdict::all_parsers() {
            let run = parser.parse(stdout, stderr);
            assert_eq!(run.summary.total, run.summary.passed + run.summary.failed);
        }
    }
});
