//! Standard payment templates.
//!
//! A [`Payment`] pairs an output script with its address (when the template has one) and, for
//! script-hash templates, the script it commits to. Constructors build payments from keys and
//! inner payments; [`Payment::from_address`] and [`Payment::from_output_script`] go the other way.

use core::fmt;
use core::str::FromStr;

use bitcoin::address::AddressType;
use bitcoin::opcodes::all::{OP_CHECKMULTISIG, OP_CHECKSIG, OP_PUSHNUM_1, OP_PUSHNUM_16};
use bitcoin::script::{Builder, Instruction, Script, ScriptBuf};
use bitcoin::{Address, CompressedPublicKey, Network, PublicKey};

use crate::error::{Error, Result};
use crate::limits;

/// Payment template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    P2pkh,
    P2wpkh,
    P2sh,
    P2wsh,
    P2pk,
    P2ms,
    NullData,
}

/// Templates an address may decode to, in decoding priority.
const ADDRESS_TEMPLATES: [Template; 4] = [
    Template::P2wpkh,
    Template::P2pkh,
    Template::P2wsh,
    Template::P2sh,
];

/// Templates an output script may match, in matching priority.
const OUTPUT_TEMPLATES: [Template; 7] = [
    Template::P2wpkh,
    Template::P2pkh,
    Template::P2wsh,
    Template::P2sh,
    Template::P2pk,
    Template::P2ms,
    Template::NullData,
];

impl Template {
    pub fn as_str(&self) -> &'static str {
        match self {
            Template::P2pkh => "p2pkh",
            Template::P2wpkh => "p2wpkh",
            Template::P2sh => "p2sh",
            Template::P2wsh => "p2wsh",
            Template::P2pk => "p2pk",
            Template::P2ms => "p2ms",
            Template::NullData => "nulldata",
        }
    }

    /// Whether outputs of this template have an address.
    pub fn has_address(&self) -> bool {
        !matches!(self, Template::P2pk | Template::P2ms | Template::NullData)
    }

    fn address_type(&self) -> Option<AddressType> {
        match self {
            Template::P2pkh => Some(AddressType::P2pkh),
            Template::P2wpkh => Some(AddressType::P2wpkh),
            Template::P2sh => Some(AddressType::P2sh),
            Template::P2wsh => Some(AddressType::P2wsh),
            _ => None,
        }
    }

    fn matches(&self, script: &Script) -> bool {
        match self {
            Template::P2pkh => script.is_p2pkh(),
            Template::P2wpkh => script.is_p2wpkh(),
            Template::P2sh => script.is_p2sh(),
            Template::P2wsh => script.is_p2wsh(),
            Template::P2pk => p2pk_key(script).is_some(),
            Template::P2ms => multisig_params(script).is_some(),
            Template::NullData => is_null_data(script),
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An output script of a standard template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    template: Template,
    output_script: ScriptBuf,
    address: Option<Address>,
    redeem_script: Option<ScriptBuf>,
}

impl Payment {
    pub fn template(&self) -> Template {
        self.template
    }

    pub fn output_script(&self) -> &Script {
        &self.output_script
    }

    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    /// The script a P2SH or P2WSH output commits to, when known.
    pub fn redeem_script(&self) -> Option<&Script> {
        self.redeem_script.as_deref()
    }

    pub fn into_output_script(self) -> ScriptBuf {
        self.output_script
    }

    /// Pay-to-pubkey. Has no address.
    pub fn p2pk(key: &PublicKey) -> Self {
        Self {
            template: Template::P2pk,
            output_script: ScriptBuf::new_p2pk(key),
            address: None,
            redeem_script: None,
        }
    }

    pub fn p2pkh(key: &PublicKey, network: Network) -> Self {
        let hash = key.pubkey_hash();
        Self {
            template: Template::P2pkh,
            output_script: ScriptBuf::new_p2pkh(&hash),
            address: Some(Address::p2pkh(hash, network)),
            redeem_script: None,
        }
    }

    /// Pay-to-witness-pubkey-hash. The key must be compressed.
    pub fn p2wpkh(key: &PublicKey, network: Network) -> Result<Self> {
        let key = CompressedPublicKey::try_from(*key).map_err(|e| Error::payment("p2wpkh", e))?;
        Ok(Self {
            template: Template::P2wpkh,
            output_script: ScriptBuf::new_p2wpkh(&key.wpubkey_hash()),
            address: Some(Address::p2wpkh(&key, network)),
            redeem_script: None,
        })
    }

    /// Bare `threshold`-of-`keys.len()` multisig. Has no address.
    pub fn p2ms(threshold: u32, keys: &[PublicKey]) -> Result<Self> {
        limits::check_multisig(threshold, keys.len())?;

        let mut builder = Builder::new().push_int(i64::from(threshold));
        for key in keys {
            builder = builder.push_key(key);
        }
        let output_script = builder
            .push_int(keys.len() as i64)
            .push_opcode(OP_CHECKMULTISIG)
            .into_script();

        Ok(Self {
            template: Template::P2ms,
            output_script,
            address: None,
            redeem_script: None,
        })
    }

    /// Pay-to-script-hash committing to the output script of `redeem`.
    pub fn p2sh(redeem: &Payment, network: Network) -> Result<Self> {
        let redeem_script = redeem.output_script.clone();
        limits::check_redeem_script_size(redeem_script.len())?;

        let address = Address::p2sh(&redeem_script, network).map_err(|e| Error::payment("p2sh", e))?;
        Ok(Self {
            template: Template::P2sh,
            output_script: address.script_pubkey(),
            address: Some(address),
            redeem_script: Some(redeem_script),
        })
    }

    /// Pay-to-witness-script-hash committing to the output script of `witness`.
    ///
    /// Witness scripts may not contain uncompressed public keys.
    pub fn p2wsh(witness: &Payment, network: Network) -> Result<Self> {
        let witness_script = witness.output_script.clone();
        if has_uncompressed_key(&witness_script) {
            return Err(Error::payment(
                "p2wsh",
                "witness script contains uncompressed pubkey",
            ));
        }

        Ok(Self {
            template: Template::P2wsh,
            output_script: ScriptBuf::new_p2wsh(&witness_script.wscript_hash()),
            address: Some(Address::p2wsh(&witness_script, network)),
            redeem_script: Some(witness_script),
        })
    }

    /// Decodes an address valid for `network`.
    ///
    /// Templates are tried in the order P2WPKH, P2PKH, P2WSH, P2SH.
    pub fn from_address(text: &str, network: Network) -> Result<Self> {
        let invalid = || Error::InvalidAddress(text.into());

        let address = Address::from_str(text)
            .map_err(|_| invalid())?
            .require_network(network)
            .map_err(|_| invalid())?;

        let template = ADDRESS_TEMPLATES
            .into_iter()
            .find(|template| template.address_type() == address.address_type())
            .ok_or_else(invalid)?;

        Ok(Self {
            template,
            output_script: address.script_pubkey(),
            address: Some(address),
            redeem_script: None,
        })
    }

    /// Classifies an output script.
    ///
    /// Templates are tried in the order P2WPKH, P2PKH, P2WSH, P2SH, P2PK, P2MS, null data. A
    /// script matching none of them is a non-standard output.
    pub fn from_output_script(script: &Script, network: Network) -> Result<Self> {
        let template = OUTPUT_TEMPLATES
            .into_iter()
            .find(|template| template.matches(script))
            .ok_or_else(|| Error::UnsupportedOutput(hex::encode(script.as_bytes())))?;

        let address = if template.has_address() {
            let address = Address::from_script(script, network)
                .map_err(|e| Error::payment(template.as_str(), e))?;
            Some(address)
        } else {
            None
        };

        Ok(Self {
            template,
            output_script: script.to_owned(),
            address,
            redeem_script: None,
        })
    }
}

fn instructions(script: &Script) -> Option<Vec<Instruction<'_>>> {
    script.instructions().collect::<core::result::Result<_, _>>().ok()
}

fn pushnum(instruction: &Instruction<'_>) -> Option<u8> {
    match instruction {
        Instruction::Op(op) => {
            let (code, first, last) = (op.to_u8(), OP_PUSHNUM_1.to_u8(), OP_PUSHNUM_16.to_u8());
            (first..=last).contains(&code).then(|| code - first + 1)
        }
        Instruction::PushBytes(_) => None,
    }
}

fn push_key(instruction: &Instruction<'_>) -> Option<PublicKey> {
    match instruction {
        Instruction::PushBytes(bytes) => PublicKey::from_slice(bytes.as_bytes()).ok(),
        Instruction::Op(_) => None,
    }
}

/// `<key> OP_CHECKSIG` with a valid key.
fn p2pk_key(script: &Script) -> Option<PublicKey> {
    match instructions(script)?.as_slice() {
        [key, Instruction::Op(op)] if *op == OP_CHECKSIG => push_key(key),
        _ => None,
    }
}

/// `<m> <key>... <n> OP_CHECKMULTISIG` with `1 <= m <= n` and `n` valid keys.
fn multisig_params(script: &Script) -> Option<(u8, Vec<PublicKey>)> {
    let instructions = instructions(script)?;
    let (threshold, rest) = instructions.split_first()?;
    let (checkmultisig, rest) = rest.split_last()?;
    let (total, keys) = rest.split_last()?;

    if !matches!(checkmultisig, Instruction::Op(op) if *op == OP_CHECKMULTISIG) {
        return None;
    }
    let (m, n) = (pushnum(threshold)?, pushnum(total)?);
    let keys = keys.iter().map(push_key).collect::<Option<Vec<_>>>()?;

    (m <= n && usize::from(n) == keys.len()).then_some((m, keys))
}

/// `OP_RETURN` followed by data pushes only.
fn is_null_data(script: &Script) -> bool {
    if !script.is_op_return() {
        return false;
    }
    instructions(script).is_some_and(|instructions| {
        instructions
            .iter()
            .skip(1)
            .all(|instruction| matches!(instruction, Instruction::PushBytes(_)))
    })
}

fn has_uncompressed_key(script: &Script) -> bool {
    script.instructions().flatten().any(|instruction| {
        push_key(&instruction).is_some_and(|key| !key.compressed)
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn key(text: &str) -> PublicKey {
        PublicKey::from_str(text).unwrap()
    }

    fn script(text: &str) -> ScriptBuf {
        ScriptBuf::from_hex(text).unwrap()
    }

    const K1: &str = "02eb23fcd29fbc0ef1badafc973f9011d4c8f447fd9a5997a965cc01ffca267fb6";
    const K2: &str = "035dc97b1688f577d73360331eb56403128c3d8b01904785e93f7c617839fae41a";
    const UNCOMPRESSED: &str = "044278e860f61b8765513006c9c44a60c17238c81b57aa443f22f6c174d9637be2e11d944d19694960765ec7b7efe9d829dcf5de2fb8c074edf2b04206c36ae1c0";

    #[test]
    fn key_templates() {
        let k = key(K1);

        let p2pk = Payment::p2pk(&k);
        assert_eq!(hex::encode(p2pk.output_script().as_bytes()), format!("21{K1}ac"));
        assert!(p2pk.address().is_none());

        let p2pkh = Payment::p2pkh(&k, Network::Testnet);
        assert_eq!(
            hex::encode(p2pkh.output_script().as_bytes()),
            "76a9145dc930210dd88ac6372f0e71318d565eefe72bf288ac"
        );
        assert_eq!(
            p2pkh.address().unwrap().to_string(),
            "mp4r9gW2LDGdh3xa3gYjJY9MG7ZDo4eKv8"
        );

        let p2wpkh = Payment::p2wpkh(&k, Network::Testnet).unwrap();
        assert_eq!(
            p2wpkh.address().unwrap().to_string(),
            "tb1qthynqggdmz9vvde0pecnrr2ktmh7w2ljgenyg0"
        );

        let sh_wpkh = Payment::p2sh(&p2wpkh, Network::Testnet).unwrap();
        assert_eq!(
            hex::encode(sh_wpkh.output_script().as_bytes()),
            "a914b53b74876b178a295caa2e91870ccb32b0b43fb787"
        );
        assert_eq!(sh_wpkh.redeem_script(), Some(p2wpkh.output_script()));
    }

    #[test]
    fn p2wpkh_requires_compressed_key() {
        let err = Payment::p2wpkh(&key(UNCOMPRESSED), Network::Testnet).unwrap_err();
        assert!(matches!(err, Error::Payment { template: "p2wpkh", .. }));
    }

    #[test]
    fn p2wsh_rejects_uncompressed_keys() {
        let inner = Payment::p2pk(&key(UNCOMPRESSED));
        assert!(Payment::p2wsh(&inner, Network::Testnet).is_err());

        let inner = Payment::p2pkh(&key(K1), Network::Testnet);
        let wsh = Payment::p2wsh(&inner, Network::Testnet).unwrap();
        assert_eq!(
            wsh.address().unwrap().to_string(),
            "tb1qfrnrk6vumachv82qvkzavg6k3cy4f9zw4j4pdzq73s2xa63y3xlq7gfg4h"
        );
    }

    #[test]
    fn multisig() {
        let p2ms = Payment::p2ms(1, &[key(K1), key(K2)]).unwrap();
        assert_eq!(
            hex::encode(p2ms.output_script().as_bytes()),
            format!("5121{K1}21{K2}52ae")
        );
        assert_eq!(multisig_params(p2ms.output_script()).unwrap().0, 1);

        assert!(Payment::p2ms(3, &[key(K1), key(K2)]).is_err());
        assert!(Payment::p2ms(0, &[key(K1), key(K2)]).is_err());
        assert!(Payment::p2ms(1, &[key(K1); 21]).is_err());
    }

    #[test]
    fn classify_output_scripts() {
        let cases = [
            (
                "001407ccf39409babd2e1ad589f26401aed3ed95a222",
                Template::P2wpkh,
                Some("tb1qqlx089qfh27juxk438exgqdw60ketg3zgxhqch"),
            ),
            (
                "76a9145dc930210dd88ac6372f0e71318d565eefe72bf288ac",
                Template::P2pkh,
                Some("mp4r9gW2LDGdh3xa3gYjJY9MG7ZDo4eKv8"),
            ),
            (
                "a914a909857e5d14cbcf2044b250f7c6492810aae8d187",
                Template::P2sh,
                Some("2N8f1bGNi89ixDhzdF483hu8aHqWi42SNBE"),
            ),
            (
                "2102eb23fcd29fbc0ef1badafc973f9011d4c8f447fd9a5997a965cc01ffca267fb6ac",
                Template::P2pk,
                None,
            ),
            (
                "6a1354686973206973206f6e6c7920612074657374",
                Template::NullData,
                None,
            ),
        ];

        for (hex, template, address) in cases {
            let payment = Payment::from_output_script(&script(hex), Network::Testnet).unwrap();
            assert_eq!(payment.template(), template, "{hex}");
            assert_eq!(payment.address().map(|a| a.to_string()).as_deref(), address);
        }

        let p2ms = script(&format!("5121{K1}21{K2}52ae"));
        assert_eq!(
            Payment::from_output_script(&p2ms, Network::Testnet)
                .unwrap()
                .template(),
            Template::P2ms
        );
    }

    #[test]
    fn non_standard_output() {
        let err =
            Payment::from_output_script(&script("010203040506070809"), Network::Testnet).unwrap_err();
        assert_eq!(err, Error::UnsupportedOutput("010203040506070809".into()));
    }

    #[test]
    fn decode_addresses() {
        let cases = [
            ("tb1qm8uykx5ncknljvmg0yyv28ueaqvekausjkw4n3", Template::P2wpkh),
            ("n1PUNQaSqsXpSB3Rpdx8QEUrYLH2VUyGkX", Template::P2pkh),
            (
                "tb1q760y8stegejhntvxvd03jze7tculgjjlzg3uknhx5kk462ag5clqqqgg6x",
                Template::P2wsh,
            ),
            ("2N17sNBW68RrxE8tPNsYsRSNA1GmZMzjaPx", Template::P2sh),
        ];
        for (text, template) in cases {
            let payment = Payment::from_address(text, Network::Testnet).unwrap();
            assert_eq!(payment.template(), template, "{text}");
            assert_eq!(payment.address().unwrap().to_string(), text);
        }

        assert_eq!(
            Payment::from_address("n1PUNQaSqsXpSB3Rpdx8QEUrYLH2VUyGkX", Network::Bitcoin),
            Err(Error::InvalidAddress("n1PUNQaSqsXpSB3Rpdx8QEUrYLH2VUyGkX".into()))
        );
        assert!(Payment::from_address("not-an-address", Network::Testnet).is_err());
    }
}
