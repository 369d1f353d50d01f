#![no_main]

use libfuzzer_sys::fuzz_target;
use yaml_engine::{EventData, Parser};

fuzz_target!(|data: &[u8]| {
    let mut parser = Parser::new();
    parser.set_input_bytes(data);
    while let Ok(event) = parser.next_event() {
        if matches!(event.data, EventData::StreamEnd) {
            break;
        }
    }
});
