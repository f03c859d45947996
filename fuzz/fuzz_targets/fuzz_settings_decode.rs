//! Fuzz target: `settings::decode`
//!
//! Any flash image must decode without panicking, and the decoded record
//! must be a fixed point of encode/decode.
//!
//! cargo fuzz run fuzz_settings_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use smartplant::settings::{self, RECORD_LEN};

fuzz_target!(|data: &[u8]| {
    let mut image = [0u8; RECORD_LEN];
    let n = data.len().min(RECORD_LEN);
    image[..n].copy_from_slice(&data[..n]);

    let record = settings::decode(&image);
    let again = settings::decode(&settings::encode(&record));
    assert_eq!(record, again);
});
