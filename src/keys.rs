//! Key expressions.
//!
//! A key expression is either a single key pair ([`EcPairKey`], from a hex public key or a WIF
//! private key) or a BIP32 extended key ([`ExtPairKey`]) optionally ending in a wildcard. A
//! wildcard key stands for every child in its [`KeyRange`].

use core::fmt;
use core::ops::Range;
use core::str::FromStr;

use bitcoin::bip32::Fingerprint;
use bitcoin::{Network, PrivateKey, PublicKey};

use crate::codec::{real_path_index, ExtendedKey};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::limits::DEFAULT_KEY_RANGE_COUNT;

/// Highest unhardened BIP32 child index.
const MAX_PATH_INDEX: u32 = 0x7FFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// A single key pair.
    EcPair,
    /// A BIP32 extended key pair.
    ExtPair,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::EcPair => "ecpair",
            KeyType::ExtPair => "extpair",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ecpair" => Ok(KeyType::EcPair),
            "extpair" => Ok(KeyType::ExtPair),
            _ => Err(Error::KeyDecode {
                key: s.into(),
                reason: "unknown key type",
            }),
        }
    }
}

/// Trailing wildcard of an extended key path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Wildcard {
    #[default]
    None,
    /// `/*`
    Unhardened,
    /// `/*'` or `/*h`
    Hardened,
}

impl Wildcard {
    pub fn is_hardened(&self) -> bool {
        *self == Wildcard::Hardened
    }
}

impl fmt::Display for Wildcard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Wildcard::None => write!(f, ""),
            Wildcard::Unhardened => write!(f, "/*"),
            Wildcard::Hardened => write!(f, "/*'"),
        }
    }
}

impl FromStr for Wildcard {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" => Ok(Wildcard::None),
            "/*" | "*" => Ok(Wildcard::Unhardened),
            "/*'" | "/*h" | "*'" | "*h" => Ok(Wildcard::Hardened),
            _ => Err(Error::KeyDecode {
                key: s.into(),
                reason: "invalid path wildcard",
            }),
        }
    }
}

/// Child indices a wildcard key expands to: `count` indices starting at `start_idx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyRange {
    start_idx: u32,
    count: u32,
}

impl Default for KeyRange {
    fn default() -> Self {
        Self {
            start_idx: 0,
            count: DEFAULT_KEY_RANGE_COUNT,
        }
    }
}

impl KeyRange {
    /// The range must be non-empty and stay below the hardened index space.
    pub fn new(start_idx: u32, count: u32) -> Result<Self> {
        let fits = count > 0
            && start_idx
                .checked_add(count - 1)
                .is_some_and(|last| last <= MAX_PATH_INDEX);
        if !fits {
            return Err(Error::InvalidKeyRange { start_idx, count });
        }
        Ok(Self { start_idx, count })
    }

    pub fn start_idx(&self) -> u32 {
        self.start_idx
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn indices(&self) -> Range<u32> {
        self.start_idx..self.start_idx + self.count
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ start_idx: {}, count: {} }}",
            self.start_idx, self.count
        )
    }
}

/// `[fingerprint/path]` prefix of a key expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyOrigin {
    fingerprint: Fingerprint,
    path: Option<String>,
}

impl KeyOrigin {
    pub fn new(fingerprint: Fingerprint, path: Option<String>) -> Self {
        Self { fingerprint, path }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Origin path as written, including its leading `/`.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

impl fmt::Display for KeyOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}{}]", self.fingerprint, self.path().unwrap_or_default())
    }
}

/// A single key pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcPairKey {
    public_key: PublicKey,
    private_key: Option<PrivateKey>,
}

impl EcPairKey {
    pub fn from_public_key(public_key: PublicKey) -> Self {
        Self {
            public_key,
            private_key: None,
        }
    }

    pub fn from_private_key(private_key: PrivateKey, public_key: PublicKey) -> Self {
        Self {
            public_key,
            private_key: Some(private_key),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    pub fn private_key(&self) -> Option<&PrivateKey> {
        self.private_key.as_ref()
    }
}

/// A BIP32 key pair, already derived along the fixed part of its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtPairKey {
    key: ExtendedKey,
    wildcard: Wildcard,
    key_range: Option<KeyRange>,
}

impl ExtPairKey {
    pub fn new(key: ExtendedKey, wildcard: Wildcard) -> Self {
        let key_range = (wildcard != Wildcard::None).then(KeyRange::default);
        Self {
            key,
            wildcard,
            key_range,
        }
    }

    pub fn key(&self) -> &ExtendedKey {
        &self.key
    }

    pub fn wildcard(&self) -> Wildcard {
        self.wildcard
    }

    pub fn key_range(&self) -> Option<KeyRange> {
        self.key_range
    }

    fn public_keys(&self, ctx: &Context) -> Result<Vec<Option<PublicKey>>> {
        let Some(range) = self.key_range else {
            return Ok(vec![Some(self.key.public_key())]);
        };

        let hardened = self.wildcard.is_hardened();
        let ignore = ctx.ignore_nonexistent_path_index();

        range
            .indices()
            .map(|idx| {
                let child = ctx.codec().derive_child(&self.key, idx, hardened)?;
                let requested = real_path_index(idx, hardened)?;

                if child.child_number == requested {
                    tracing::trace!(%requested, "derived range key");
                    Ok(Some(child.key.public_key()))
                } else if ignore {
                    tracing::debug!(%requested, used = %child.child_number, "nonexistent index replaced");
                    Ok(Some(child.key.public_key()))
                } else {
                    tracing::debug!(%requested, "nonexistent index left absent");
                    Ok(None)
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPair {
    Ec(EcPairKey),
    Ext(ExtPairKey),
}

/// A key argument of a script expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyExpression {
    network: Network,
    text: String,
    origin: Option<KeyOrigin>,
    pair: KeyPair,
}

impl KeyExpression {
    pub fn new(network: Network, text: &str, origin: Option<KeyOrigin>, pair: KeyPair) -> Self {
        Self {
            network,
            text: text.into(),
            origin,
            pair,
        }
    }

    /// Parses a key expression such as `[d34db33f/44'/0']xpub.../1/*`.
    pub fn parse(ctx: &Context, network: Network, text: &str) -> Result<Self> {
        crate::parser::keys::parse_key(ctx, network, text)
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn key_type(&self) -> KeyType {
        match self.pair {
            KeyPair::Ec(_) => KeyType::EcPair,
            KeyPair::Ext(_) => KeyType::ExtPair,
        }
    }

    pub fn pair(&self) -> &KeyPair {
        &self.pair
    }

    pub fn origin(&self) -> Option<&KeyOrigin> {
        self.origin.as_ref()
    }

    /// Public key of the key pair itself, before any wildcard expansion.
    pub fn public_key(&self) -> PublicKey {
        match &self.pair {
            KeyPair::Ec(ec) => ec.public_key(),
            KeyPair::Ext(ext) => ext.key.public_key(),
        }
    }

    pub fn is_compressed_pub_key(&self) -> bool {
        self.public_key().compressed
    }

    /// Whether this key ends in a wildcard and so stands for a range of keys.
    pub fn from_range(&self) -> bool {
        self.path_wildcard() != Wildcard::None
    }

    pub fn path_wildcard(&self) -> Wildcard {
        match &self.pair {
            KeyPair::Ec(_) => Wildcard::None,
            KeyPair::Ext(ext) => ext.wildcard,
        }
    }

    pub fn key_range(&self) -> Option<KeyRange> {
        match &self.pair {
            KeyPair::Ec(_) => None,
            KeyPair::Ext(ext) => ext.key_range,
        }
    }

    /// Sets the key range of a wildcard key.
    pub fn set_key_range(&mut self, range: KeyRange) -> Result<()> {
        match &mut self.pair {
            KeyPair::Ext(ext) if ext.wildcard != Wildcard::None => {
                ext.key_range = Some(range);
                Ok(())
            }
            _ => Err(Error::KeyNotRanged(self.text.clone())),
        }
    }

    /// Public keys this expression stands for.
    ///
    /// A key without wildcard yields its single public key. A wildcard key yields one entry per
    /// index of its key range. An index BIP32 skips is either replaced by the key at the next
    /// existing index or, when the context does not ignore non-existent indices, reported as
    /// `None`.
    pub fn public_keys(&self, ctx: &Context) -> Result<Vec<Option<PublicKey>>> {
        match &self.pair {
            KeyPair::Ec(ec) => Ok(vec![Some(ec.public_key)]),
            KeyPair::Ext(ext) => ext.public_keys(ctx),
        }
    }
}

impl fmt::Display for KeyExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
