#![no_main]

use libfuzzer_sys::fuzz_target;
use yaml_engine::{LoadSettings, Scanner};

fuzz_target!(|data: &[u8]| {
    let settings = LoadSettings::default().with_parse_comments(true);
    let mut scanner = Scanner::with_settings(&settings);
    scanner.set_input_bytes(data);
    for token in scanner {
        if token.is_err() {
            break;
        }
    }
});
