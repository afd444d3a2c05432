//! Key decoding and BIP32 child derivation.
//!
//! The descriptor engine never touches curve arithmetic directly: it asks a [`KeyCodec`] to
//! decode key text and to derive children. [`Bip32Codec`] implements every operation on top of
//! the `bitcoin` crate and is what [`Context::new`](crate::Context::new) uses.

use core::fmt;
use core::str::FromStr;

use bitcoin::bip32::{self, ChildNumber, Xpriv, Xpub};
use bitcoin::secp256k1::{All, Secp256k1};
use bitcoin::{Network, NetworkKind, PrivateKey, PublicKey};
use lazy_static::lazy_static;

use crate::error::{Error, Result};

lazy_static! {
    pub(crate) static ref SECP: Secp256k1<All> = Secp256k1::new();
}

/// Prefixes of base58 extended keys.
pub(crate) const EXTENDED_KEY_PREFIXES: [&str; 4] = ["xpub", "xprv", "tpub", "tprv"];

/// A BIP32 extended key, public or private.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExtendedKey {
    Public(Xpub),
    Private(Xpriv),
}

impl ExtendedKey {
    /// Child number this key was derived with.
    pub fn child_number(&self) -> ChildNumber {
        match self {
            ExtendedKey::Public(xpub) => xpub.child_number,
            ExtendedKey::Private(xpriv) => xpriv.child_number,
        }
    }

    pub fn network(&self) -> NetworkKind {
        match self {
            ExtendedKey::Public(xpub) => xpub.network,
            ExtendedKey::Private(xpriv) => xpriv.network,
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, ExtendedKey::Private(_))
    }

    /// Compressed public key of this node.
    pub fn public_key(&self) -> PublicKey {
        match self {
            ExtendedKey::Public(xpub) => PublicKey::new(xpub.public_key),
            ExtendedKey::Private(xpriv) => PublicKey::new(xpriv.private_key.public_key(&*SECP)),
        }
    }

    /// Public counterpart of this key.
    pub fn to_xpub(&self) -> Xpub {
        match self {
            ExtendedKey::Public(xpub) => *xpub,
            ExtendedKey::Private(xpriv) => Xpub::from_priv(&*SECP, xpriv),
        }
    }
}

impl fmt::Display for ExtendedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtendedKey::Public(xpub) => write!(f, "{}", xpub),
            ExtendedKey::Private(xpriv) => write!(f, "{}", xpriv),
        }
    }
}

/// Result of a single derivation step.
///
/// `child_number` is the index the child was actually derived at, which differs from the
/// requested index when BIP32 skipped a non-existent child.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DerivedChild {
    pub key: ExtendedKey,
    pub child_number: ChildNumber,
}

/// BIP32 child number for a path index: `index + 2^31` when hardened.
pub fn real_path_index(index: u32, hardened: bool) -> Result<ChildNumber> {
    let child_number = if hardened {
        ChildNumber::from_hardened_idx(index)
    } else {
        ChildNumber::from_normal_idx(index)
    };
    child_number.map_err(|e| Error::Derivation(e.to_string()))
}

/// Key decoding and derivation used by the descriptor engine.
///
/// Every method has a default implementation on top of the `bitcoin` crate. Implementors
/// override only the behavior they need to change and may call [`Bip32Codec`] for the rest.
pub trait KeyCodec: Sync {
    /// Decodes a base58 `xpub`/`tpub`/`xprv`/`tprv` key for `network`.
    fn decode_extended_key(&self, text: &str, network: Network) -> Result<ExtendedKey> {
        let invalid = || Error::KeyDecode {
            key: text.into(),
            reason: "invalid extended key",
        };

        let key = if text.starts_with("xprv") || text.starts_with("tprv") {
            ExtendedKey::Private(Xpriv::from_str(text).map_err(|_| invalid())?)
        } else {
            ExtendedKey::Public(Xpub::from_str(text).map_err(|_| invalid())?)
        };

        if key.network() != NetworkKind::from(network) {
            return Err(invalid());
        }
        Ok(key)
    }

    /// Derives the child of `key` at `index`.
    ///
    /// When the child at `index` is invalid, derivation proceeds with the next index as BIP32
    /// prescribes, and the returned `child_number` reports the index actually used.
    fn derive_child(&self, key: &ExtendedKey, index: u32, hardened: bool) -> Result<DerivedChild> {
        let mut index = index;
        loop {
            let child_number = real_path_index(index, hardened)?;
            let derived = match key {
                ExtendedKey::Public(xpub) => xpub
                    .derive_pub(&*SECP, &[child_number])
                    .map(ExtendedKey::Public),
                ExtendedKey::Private(xpriv) => xpriv
                    .derive_priv(&*SECP, &[child_number])
                    .map(ExtendedKey::Private),
            };

            match derived {
                Ok(key) => return Ok(DerivedChild { key, child_number }),
                Err(bip32::Error::Secp256k1(e)) => {
                    tracing::trace!(%child_number, error = %e, "invalid child, trying next index");
                    index = index
                        .checked_add(1)
                        .ok_or_else(|| Error::Derivation("index out of range".into()))?;
                }
                Err(e) => return Err(Error::Derivation(e.to_string())),
            }
        }
    }

    /// Decodes a hex public key, compressed iff its first byte is not `0x04`.
    fn decode_public_key(&self, text: &str) -> Result<PublicKey> {
        let invalid = || Error::KeyDecode {
            key: text.into(),
            reason: "invalid public key",
        };

        let bytes = hex::decode(text).map_err(|_| invalid())?;
        PublicKey::from_slice(&bytes).map_err(|_| invalid())
    }

    /// Decodes a WIF private key for `network`.
    fn decode_wif(&self, text: &str, network: Network) -> Result<PrivateKey> {
        let invalid = || Error::KeyDecode {
            key: text.into(),
            reason: "invalid (WIF formatted) private key",
        };

        let key = PrivateKey::from_wif(text).map_err(|_| invalid())?;
        if key.network != NetworkKind::from(network) {
            return Err(invalid());
        }
        Ok(key)
    }
}

/// [`KeyCodec`] backed by the `bitcoin` crate.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Bip32Codec;

impl KeyCodec for Bip32Codec {}

#[cfg(test)]
mod test {
    use super::*;

    const TPUB: &str = "tpubDBHn4aVWbRA6SbSVoUZsyTowBtecUUWShQzoP7jibnjkSTa4VC2K2VZUz2CeJx4yhSMKy8ScBMe1LRSU6FsnP49ojGyHewYAD1Vf3iXm4Tm";
    const TPRV: &str = "tprv8frpuMJRyJJep6g57Ur3Xbz7668aLUrSY1wDAz1aBsLNWTxzLgbsSM6uJ35cLxzBYWPQSVqBJaqEHSummwkcP72kUPx6qM7sN15YvYhXwNa";
    const XPUB: &str = "xpub661MyMwAqRbcFtXgS5sYJABqqG9YLmC4Q1Rdap9gSE8NqtwybGhePY2gZ29ESFjqJoCu1Rupje8YtGqsefD265TMg7usUDFdp6W1EGMcet8";

    #[test]
    fn extended_key_network_must_match() {
        let codec = Bip32Codec;
        assert!(codec.decode_extended_key(TPUB, Network::Testnet).is_ok());
        assert!(codec.decode_extended_key(TPUB, Network::Regtest).is_ok());
        assert!(codec.decode_extended_key(XPUB, Network::Bitcoin).is_ok());

        let err = codec
            .decode_extended_key(TPUB, Network::Bitcoin)
            .unwrap_err();
        assert_eq!(
            err,
            Error::KeyDecode {
                key: TPUB.into(),
                reason: "invalid extended key"
            }
        );
    }

    #[test]
    fn derive_reports_child_number() {
        let codec = Bip32Codec;
        let key = codec.decode_extended_key(TPUB, Network::Testnet).unwrap();

        let child = codec.derive_child(&key, 1, false).unwrap();
        assert_eq!(child.child_number, ChildNumber::from_normal_idx(1).unwrap());
        assert_eq!(child.key.child_number(), child.child_number);

        let grandchild = codec.derive_child(&child.key, 0, false).unwrap();
        assert_eq!(
            grandchild.key.public_key().to_string(),
            "02eb23fcd29fbc0ef1badafc973f9011d4c8f447fd9a5997a965cc01ffca267fb6"
        );
    }

    #[test]
    fn private_keys_expose_their_public_half() {
        let codec = Bip32Codec;
        let tprv = codec.decode_extended_key(TPRV, Network::Testnet).unwrap();
        assert!(tprv.is_private());

        let xpub = tprv.to_xpub();
        assert_eq!(PublicKey::new(xpub.public_key), tprv.public_key());
        assert_eq!(xpub.child_number, tprv.child_number());

        let tpub = codec.decode_extended_key(TPUB, Network::Testnet).unwrap();
        assert!(!tpub.is_private());
        assert_eq!(tpub.to_xpub().to_string(), TPUB);
    }

    #[test]
    fn hardened_from_public_key_fails() {
        let codec = Bip32Codec;
        let key = codec.decode_extended_key(TPUB, Network::Testnet).unwrap();
        let err = codec.derive_child(&key, 0, true).unwrap_err();
        assert!(matches!(err, Error::Derivation(_)));
    }

    #[test]
    fn real_path_indices() {
        assert_eq!(u32::from(real_path_index(2, false).unwrap()), 2);
        assert_eq!(u32::from(real_path_index(2, true).unwrap()), 0x8000_0002);
        assert!(real_path_index(0x8000_0000, false).is_err());
    }

    #[test]
    fn raw_public_keys() {
        let codec = Bip32Codec;
        let compressed = codec
            .decode_public_key("02eb23fcd29fbc0ef1badafc973f9011d4c8f447fd9a5997a965cc01ffca267fb6")
            .unwrap();
        assert!(compressed.compressed);

        let uncompressed = codec
            .decode_public_key("044278e860f61b8765513006c9c44a60c17238c81b57aa443f22f6c174d9637be2e11d944d19694960765ec7b7efe9d829dcf5de2fb8c074edf2b04206c36ae1c0")
            .unwrap();
        assert!(!uncompressed.compressed);

        assert!(codec.decode_public_key("02eb23").is_err());
        assert!(codec.decode_public_key("02zz").is_err());
    }

    #[test]
    fn wif_network_must_match() {
        let codec = Bip32Codec;
        let wif = "cVtQQE3Y8jHRk58Pet8BUXiFhcKmJkBGFXPtiNQ2m8Hy8CAL9Rvk";
        let key = codec.decode_wif(wif, Network::Testnet).unwrap();
        assert!(key.compressed);
        assert!(codec.decode_wif(wif, Network::Bitcoin).is_err());
    }
}
