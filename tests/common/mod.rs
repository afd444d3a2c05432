#![allow(dead_code)]

use bitcoin::{Network, PublicKey};
use tinydescriptor::{Bip32Codec, Context, DerivedChild, ExtendedKey, KeyCodec, KeyExpression, Result};

pub const TPUB: &str = "tpubDBHn4aVWbRA6SbSVoUZsyTowBtecUUWShQzoP7jibnjkSTa4VC2K2VZUz2CeJx4yhSMKy8ScBMe1LRSU6FsnP49ojGyHewYAD1Vf3iXm4Tm";
pub const K1: &str = "02eb23fcd29fbc0ef1badafc973f9011d4c8f447fd9a5997a965cc01ffca267fb6";
pub const K2: &str = "0278545fdc052121222e21d403276f0dd7811578e53852c151997777da88c4a37d";
pub const COMPRESSED: &str = "024278e860f61b8765513006c9c44a60c17238c81b57aa443f22f6c174d9637be2";
pub const UNCOMPRESSED: &str = "044278e860f61b8765513006c9c44a60c17238c81b57aa443f22f6c174d9637be2e11d944d19694960765ec7b7efe9d829dcf5de2fb8c074edf2b04206c36ae1c0";

/// Key codec where child 2 of every node at index 1 does not exist.
///
/// BIP32 skips an invalid child by moving on to the next index, so `…/1/2` is derived at `…/1/3`.
/// Real invalid children are too rare to find in fixtures.
pub struct SkippingCodec;

impl KeyCodec for SkippingCodec {
    fn derive_child(&self, key: &ExtendedKey, index: u32, hardened: bool) -> Result<DerivedChild> {
        let parent_index = u32::from(key.child_number()) & 0x7FFF_FFFF;
        if parent_index == 1 && index == 2 {
            return Bip32Codec.derive_child(key, 3, hardened);
        }
        Bip32Codec.derive_child(key, index, hardened)
    }
}

pub fn skipping_context(ignore_nonexistent_path_index: bool) -> Context<'static> {
    Context::with_codec(&SkippingCodec).with_options(
        tinydescriptor::Options::new().ignore_nonexistent_path_index(ignore_nonexistent_path_index),
    )
}

/// Public key of a fixed key expression, derived with the plain BIP32 codec.
pub fn public_key(text: &str) -> PublicKey {
    KeyExpression::parse(&Context::new(), Network::Testnet, text)
        .unwrap()
        .public_key()
}

pub fn tpub_child(path: &str) -> PublicKey {
    public_key(&format!("{TPUB}/{path}"))
}
