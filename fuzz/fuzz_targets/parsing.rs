#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    use tinydescriptor::{Context, KeyRange, compute_checksum};

    let text = match std::str::from_utf8(data) {
        Ok(s) => s,
        Err(_) => return,
    };

    let ctx = Context::new();
    let descriptor = match tinydescriptor::parse_with(&ctx, text, Some("testnet")) {
        Ok(descriptor) => descriptor,
        Err(_) => return,
    };

    if let Some(checksum) = descriptor.checksum() {
        let body = &text[..text.len() - checksum.len() - 1];
        assert_eq!(compute_checksum(body), checksum);
    }

    // keep derivation cheap, the default range has a thousand entries
    let Ok(descriptor) = descriptor.with_key_range(KeyRange::new(0, 2).unwrap()) else {
        return;
    };
    let _ = descriptor.output_scripts(&ctx);
    let _ = descriptor.addresses(&ctx);
});
