use core::fmt;

use bitcoin::Network;

use crate::codec::{Bip32Codec, KeyCodec};

/// Evaluation options.
///
/// `ignore_nonexistent_path_index` decides what happens when a BIP32 derivation step lands on an
/// index the standard defines as non-existent: when set, the key derived at the next index is
/// used in its place; when cleared, parsing fails and key ranges report the index as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Options {
    pub ignore_nonexistent_path_index: bool,
}

impl Default for Options {
    #[inline]
    fn default() -> Self {
        Self {
            ignore_nonexistent_path_index: true,
        }
    }
}

impl Options {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn ignore_nonexistent_path_index(mut self, ignore: bool) -> Self {
        self.ignore_nonexistent_path_index = ignore;
        self
    }
}

static DEFAULT_CODEC: Bip32Codec = Bip32Codec;

/// Parse and derivation context.
///
/// Carries the [`Options`] and the [`KeyCodec`] used to decode and derive keys. A context is a
/// plain value: every call that parses a descriptor or resolves its keys receives one explicitly,
/// so two callers with different options never observe each other.
///
/// ```rust
/// use tinydescriptor::{Context, Options};
///
/// let mut ctx = Context::new();
/// assert!(ctx.options().ignore_nonexistent_path_index);
///
/// ctx.set_options(Options::new().ignore_nonexistent_path_index(false));
/// assert!(!ctx.options().ignore_nonexistent_path_index);
///
/// ctx.reset_options();
/// assert_eq!(ctx.options(), Options::default());
/// ```
#[derive(Clone, Copy)]
pub struct Context<'c> {
    options: Options,
    codec: &'c dyn KeyCodec,
}

impl Default for Context<'static> {
    #[inline]
    fn default() -> Self {
        Self {
            options: Options::default(),
            codec: &DEFAULT_CODEC,
        }
    }
}

impl Context<'static> {
    /// Context with default options and the [`Bip32Codec`].
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<'c> Context<'c> {
    /// Context with default options and a custom key codec.
    #[inline]
    pub fn with_codec(codec: &'c dyn KeyCodec) -> Self {
        Self {
            options: Options::default(),
            codec,
        }
    }

    /// Same codec, different options.
    #[inline]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    #[inline]
    pub fn set_options(&mut self, options: Options) {
        tracing::debug!(?options, "descriptor options updated");
        self.options = options;
    }

    #[inline]
    pub fn options(&self) -> Options {
        self.options
    }

    #[inline]
    pub fn reset_options(&mut self) {
        self.options = Options::default();
    }

    #[inline]
    pub fn codec(&self) -> &'c dyn KeyCodec {
        self.codec
    }

    #[inline]
    pub(crate) fn ignore_nonexistent_path_index(&self) -> bool {
        self.options.ignore_nonexistent_path_index
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Network for a network name.
///
/// `testnet` and `signet` share the test network parameters, `regtest` selects regtest. Anything
/// else, including no name at all, selects the main network.
pub fn network_from_name(name: Option<&str>) -> Network {
    match name {
        Some("testnet") | Some("signet") => Network::Testnet,
        Some("regtest") => Network::Regtest,
        _ => Network::Bitcoin,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn network_names() {
        assert_eq!(network_from_name(None), Network::Bitcoin);
        assert_eq!(network_from_name(Some("main")), Network::Bitcoin);
        assert_eq!(network_from_name(Some("bitcoin")), Network::Bitcoin);
        assert_eq!(network_from_name(Some("foo")), Network::Bitcoin);
        assert_eq!(network_from_name(Some("testnet")), Network::Testnet);
        assert_eq!(network_from_name(Some("signet")), Network::Testnet);
        assert_eq!(network_from_name(Some("regtest")), Network::Regtest);
    }

    #[test]
    fn options_are_per_context() {
        let mut a = Context::new();
        let b = Context::new();

        a.set_options(Options::new().ignore_nonexistent_path_index(false));
        assert!(!a.ignore_nonexistent_path_index());
        assert!(b.ignore_nonexistent_path_index());

        a.reset_options();
        assert!(a.ignore_nonexistent_path_index());
    }
}
