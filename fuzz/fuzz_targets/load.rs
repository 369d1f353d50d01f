#![no_main]

use libfuzzer_sys::fuzz_target;
use yaml_engine::{Composer, Constructor, Dump};

fuzz_target!(|data: &[u8]| {
    let mut composer = Composer::new();
    composer.set_input_bytes(data);
    let mut constructor = Constructor::new();
    for document in composer {
        let Ok(document) = document else {
            break;
        };
        // Whatever loads must dump again.
        if let Ok(value) = constructor.construct_document(&document) {
            Dump::default().dump_to_string(&value).unwrap();
        }
    }
});
