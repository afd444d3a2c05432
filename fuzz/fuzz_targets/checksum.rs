#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    use tinydescriptor::{compute_checksum, is_valid_checksum};

    let body = match std::str::from_utf8(data) {
        Ok(s) => s,
        Err(_) => return,
    };

    let checksum = compute_checksum(body);
    if body.chars().all(|ch| (' '..='~').contains(&ch)) {
        assert!(is_valid_checksum(&checksum), "{body:?}");
    } else {
        assert!(checksum.is_empty(), "{body:?}");
    }
});
