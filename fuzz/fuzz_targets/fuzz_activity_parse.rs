#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(activity) = dentabot::bot::parse_activity(data) {
        let _ = activity.to_incoming_message();
        let _ = activity.members_added_ids();
    }
});
