#![no_main]

use libfuzzer_sys::fuzz_target;
use stemsplit_core::{parse_progress_line, ProgressTracker};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);

    let mut tracker = ProgressTracker::new();
    let mut last = 0u8;
    for line in text.split(['\r', '\n']) {
        if let Some(value) = parse_progress_line(line) {
            assert!(value <= 100);
        }
        if let Some(event) = tracker.observe_line(line) {
            assert!(event.value <= 100);
            assert!(event.value >= last);
            last = event.value;
        }
    }
    assert_eq!(tracker.complete().value, 100);
});
