#![no_main]

use libfuzzer_sys::fuzz_target;
use pointerkit_web::DeterministicHost;
use pointerkit_web::input_parser::{parse_device_event, replay_jsonl};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let _ = parse_device_event(text);
    let host = DeterministicHost::new();
    let _ = replay_jsonl(&host, text);
});
