#![forbid(unsafe_code)]
//! Bitcoin output script descriptors, as defined in
//! [BIP-380](https://github.com/bitcoin/bips/blob/master/bip-0380.mediawiki).
//!
//! A descriptor such as `wsh(multi(2,K1,K2/0/*))#checksum` is parsed into a typed
//! [`ScriptExpression`] tree, then evaluated into output scripts and addresses. Wildcard keys
//! yield one output per index of their [`KeyRange`].
//!
//! ```
//! let descriptor = tinydescriptor::parse(
//!     "pkh(02eb23fcd29fbc0ef1badafc973f9011d4c8f447fd9a5997a965cc01ffca267fb6)#3dry3g6c",
//!     Some("bitcoin"),
//! )
//! .unwrap();
//!
//! let ctx = tinydescriptor::Context::new();
//! assert_eq!(descriptor.output_scripts(&ctx).unwrap().len(), 1);
//! ```

mod macros;

pub mod address;
pub mod codec;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod expression;
pub mod keys;
pub mod limits;
pub mod parser;
pub mod payment;
mod script;
pub mod utils;

pub use address::{AddrExpression, AddrType};
pub use codec::{Bip32Codec, DerivedChild, ExtendedKey, KeyCodec};
pub use context::{Context, Options, network_from_name};
pub use descriptor::{ScriptExpression, ScriptNode, ScriptType};
pub use error::{Error, ErrorKind, Result};
pub use expression::{Expression, ExpressionRef, ExpressionType, HexExpression, NumberExpression};
pub use keys::{KeyExpression, KeyOrigin, KeyPair, KeyRange, KeyType, Wildcard};
pub use payment::{Payment, Template};
pub use utils::checksum::{descriptor_checksum, is_valid_checksum};

/// Parses a root descriptor with the default [`Context`].
///
/// `network` is a network name as accepted by [`network_from_name`]; anything else, including
/// `None`, selects mainnet.
pub fn parse(text: &str, network: Option<&str>) -> Result<ScriptExpression> {
    parse_with(&Context::new(), text, network)
}

/// Parses a root descriptor, resolving keys through `ctx`.
pub fn parse_with(ctx: &Context, text: &str, network: Option<&str>) -> Result<ScriptExpression> {
    ScriptExpression::parse(ctx, network_from_name(network), text, None)
}

/// Checksum of a descriptor body; empty if the body has characters outside the input charset.
#[inline]
pub fn compute_checksum(text: &str) -> String {
    descriptor_checksum(text)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_defaults_to_mainnet() {
        let k = "02eb23fcd29fbc0ef1badafc973f9011d4c8f447fd9a5997a965cc01ffca267fb6";
        let descriptor = parse(&format!("pkh({k})"), None).unwrap();
        assert_eq!(descriptor.network(), bitcoin::Network::Bitcoin);

        let descriptor = parse(&format!("pkh({k})"), Some("testnet")).unwrap();
        assert_eq!(descriptor.network(), bitcoin::Network::Testnet);
    }

    #[test]
    fn checksum_of_body() {
        assert_eq!(
            compute_checksum("raw(00145dc930210dd88ac6372f0e71318d565eefe72bf2)"),
            "pp260wzp"
        );
    }
}
