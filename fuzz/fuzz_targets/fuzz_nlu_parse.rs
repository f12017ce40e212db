#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(result) = dentabot::collaborators::luis::parse_prediction(s) {
            let _ = result.top_score();
            let _ = result.first_entity("time");
        }
    }
});
