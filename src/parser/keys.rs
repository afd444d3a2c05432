use core::str::FromStr;

use bitcoin::bip32::Fingerprint;
use bitcoin::Network;
use lazy_static::lazy_static;
use regex::Regex;

use crate::codec::{real_path_index, EXTENDED_KEY_PREFIXES, SECP};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::keys::{EcPairKey, ExtPairKey, KeyExpression, KeyOrigin, KeyPair, Wildcard};

lazy_static! {
    /// `[fingerprint/origin/path]key/derive/path/*`
    static ref KEY_EXPRESSION: Regex = Regex::new(concat!(
        r"^(?P<origin>\[(?P<fingerprint>[A-Fa-f0-9]{8})(?P<origin_path>(?:/[0-9]+['h]?)+)?\])?",
        r"(?P<key>[A-Za-z0-9]{4,})(?P<derive_path>(?:/[0-9]+['h]?)*(?:/\*['h]?)?)?$",
    ))
    .expect("key expression grammar is a valid regex");
}

fn is_extended_key(key: &str) -> bool {
    EXTENDED_KEY_PREFIXES
        .iter()
        .any(|prefix| key.starts_with(prefix))
}

/// Raw public keys start with their SEC1 tag byte.
fn is_raw_public_key(key: &str) -> bool {
    matches!(key.as_bytes(), [b'0', b'2' | b'3' | b'4', ..])
}

fn split_hardened(term: &str) -> (&str, bool) {
    match term.strip_suffix(['\'', 'h']) {
        Some(term) => (term, true),
        None => (term, false),
    }
}

fn path_index_to_string(index: u32, hardened: bool) -> String {
    if hardened {
        format!("{index}'")
    } else {
        index.to_string()
    }
}

pub(crate) fn parse_key(ctx: &Context, network: Network, text: &str) -> Result<KeyExpression> {
    let invalid = |reason| Error::KeyDecode {
        key: text.into(),
        reason,
    };

    let captures = KEY_EXPRESSION
        .captures(text)
        .ok_or_else(|| invalid("invalid key expression"))?;
    let group = |name| captures.name(name).map_or("", |m| m.as_str());

    let origin = match captures.name("fingerprint") {
        Some(fingerprint) => {
            let fingerprint = Fingerprint::from_str(fingerprint.as_str())
                .map_err(|_| invalid("invalid origin fingerprint"))?;
            let path = captures.name("origin_path").map(|m| m.as_str().to_owned());
            Some(KeyOrigin::new(fingerprint, path))
        }
        None => None,
    };

    let key = group("key");
    let derive_path = group("derive_path");

    if is_extended_key(key) {
        let mut ext_key = ctx.codec().decode_extended_key(key, network)?;
        let mut wildcard = Wildcard::None;

        for term in derive_path.split('/').skip(1) {
            let (term, hardened) = split_hardened(term);

            if term == "*" {
                wildcard = if hardened {
                    Wildcard::Hardened
                } else {
                    Wildcard::Unhardened
                };
                continue;
            }

            let index = u32::from_str(term).map_err(|_| invalid("invalid derivation path"))?;
            let requested = real_path_index(index, hardened)?;
            let child = ctx.codec().derive_child(&ext_key, index, hardened)?;

            if child.child_number != requested {
                if !ctx.ignore_nonexistent_path_index() {
                    return Err(Error::NonexistentIndex {
                        index: path_index_to_string(index, hardened),
                    });
                }
                tracing::debug!(
                    key = text,
                    %requested,
                    used = %child.child_number,
                    "nonexistent path index replaced"
                );
            }
            ext_key = child.key;
        }

        return Ok(KeyExpression::new(
            network,
            text,
            origin,
            KeyPair::Ext(ExtPairKey::new(ext_key, wildcard)),
        ));
    }

    if !derive_path.is_empty() {
        return Err(invalid("derivation path on a non-extended key"));
    }

    let pair = if is_raw_public_key(key) {
        EcPairKey::from_public_key(ctx.codec().decode_public_key(key)?)
    } else {
        let private_key = ctx.codec().decode_wif(key, network)?;
        EcPairKey::from_private_key(private_key, private_key.public_key(&*SECP))
    };

    Ok(KeyExpression::new(network, text, origin, KeyPair::Ec(pair)))
}
