use proptest::prelude::*;
use tinydescriptor::{ErrorKind, compute_checksum, is_valid_checksum};

const K1: &str = "02eb23fcd29fbc0ef1badafc973f9011d4c8f447fd9a5997a965cc01ffca267fb6";

#[test]
fn known_vectors() {
    assert_eq!(compute_checksum(&format!("pkh({K1})")), "3dry3g6c");
    assert_eq!(
        compute_checksum("raw(00145dc930210dd88ac6372f0e71318d565eefe72bf2)"),
        "pp260wzp"
    );
    assert_eq!(compute_checksum("pk(\u{e9})"), "");
}

proptest! {
    #[test]
    fn computed_checksum_is_accepted(hex in "([0-9a-f]{2}){1,40}") {
        let body = format!("raw({hex})");
        let checksum = compute_checksum(&body);
        prop_assert!(is_valid_checksum(&checksum));

        let descriptor = tinydescriptor::parse(&format!("{body}#{checksum}"), None).unwrap();
        prop_assert_eq!(descriptor.checksum(), Some(checksum.as_str()));
        prop_assert_eq!(descriptor.hex_param().unwrap().value(), hex::decode(&hex).unwrap());
    }

    #[test]
    fn wrong_checksum_is_rejected(hex in "([0-9a-f]{2}){1,40}", idx in 0usize..8) {
        let body = format!("raw({hex})");
        let checksum = compute_checksum(&body);

        let mut wrong: Vec<char> = checksum.chars().collect();
        wrong[idx] = if wrong[idx] == 'q' { 'p' } else { 'q' };
        let wrong: String = wrong.into_iter().collect();

        let err = tinydescriptor::parse(&format!("{body}#{wrong}"), None).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::ChecksumMismatch);
    }
}
