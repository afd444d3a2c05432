//! Descriptor expression tree.
//!
//! Every node knows the network it was parsed for and the text it was parsed from. Leaf nodes
//! (keys, addresses, hex strings, numbers) carry their decoded value; script nodes carry their
//! children.

use core::fmt;
use core::str::FromStr;

use bitcoin::Network;

use crate::address::AddrExpression;
use crate::descriptor::ScriptExpression;
use crate::error::{Error, Result};
use crate::keys::KeyExpression;

/// Kind of an expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionType {
    Script,
    Key,
    Addr,
    Hex,
    Number,
}

impl ExpressionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpressionType::Script => "script",
            ExpressionType::Key => "key",
            ExpressionType::Addr => "addr",
            ExpressionType::Hex => "hex",
            ExpressionType::Number => "number",
        }
    }
}

impl fmt::Display for ExpressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An owned expression node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Script(ScriptExpression),
    Key(KeyExpression),
    Addr(AddrExpression),
    Hex(HexExpression),
    Number(NumberExpression),
}

/// A borrowed expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionRef<'a> {
    Script(&'a ScriptExpression),
    Key(&'a KeyExpression),
    Addr(&'a AddrExpression),
    Hex(&'a HexExpression),
    Number(&'a NumberExpression),
}

macro_rules! for_each_variant {
    ($enum:ident, $value:expr, $inner:ident => $body:expr) => {
        match $value {
            $enum::Script($inner) => $body,
            $enum::Key($inner) => $body,
            $enum::Addr($inner) => $body,
            $enum::Hex($inner) => $body,
            $enum::Number($inner) => $body,
        }
    };
}

impl Expression {
    pub fn expression_type(&self) -> ExpressionType {
        self.to_ref().expression_type()
    }

    pub fn network(&self) -> Network {
        for_each_variant!(Expression, self, e => e.network())
    }

    pub fn text(&self) -> &str {
        for_each_variant!(Expression, self, e => e.text())
    }

    pub fn to_ref(&self) -> ExpressionRef<'_> {
        match self {
            Expression::Script(e) => ExpressionRef::Script(e),
            Expression::Key(e) => ExpressionRef::Key(e),
            Expression::Addr(e) => ExpressionRef::Addr(e),
            Expression::Hex(e) => ExpressionRef::Hex(e),
            Expression::Number(e) => ExpressionRef::Number(e),
        }
    }
}

impl<'a> ExpressionRef<'a> {
    pub fn expression_type(&self) -> ExpressionType {
        match self {
            ExpressionRef::Script(_) => ExpressionType::Script,
            ExpressionRef::Key(_) => ExpressionType::Key,
            ExpressionRef::Addr(_) => ExpressionType::Addr,
            ExpressionRef::Hex(_) => ExpressionType::Hex,
            ExpressionRef::Number(_) => ExpressionType::Number,
        }
    }

    pub fn network(&self) -> Network {
        for_each_variant!(ExpressionRef, self, e => e.network())
    }

    pub fn text(&self) -> &'a str {
        for_each_variant!(ExpressionRef, *self, e => e.text())
    }

    pub fn to_expression(&self) -> Expression {
        match *self {
            ExpressionRef::Script(e) => Expression::Script(e.clone()),
            ExpressionRef::Key(e) => Expression::Key(e.clone()),
            ExpressionRef::Addr(e) => Expression::Addr(e.clone()),
            ExpressionRef::Hex(e) => Expression::Hex(e.clone()),
            ExpressionRef::Number(e) => Expression::Number(e.clone()),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

impl fmt::Display for ExpressionRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

impl From<ScriptExpression> for Expression {
    fn from(e: ScriptExpression) -> Self {
        Expression::Script(e)
    }
}

impl From<KeyExpression> for Expression {
    fn from(e: KeyExpression) -> Self {
        Expression::Key(e)
    }
}

impl From<AddrExpression> for Expression {
    fn from(e: AddrExpression) -> Self {
        Expression::Addr(e)
    }
}

impl From<HexExpression> for Expression {
    fn from(e: HexExpression) -> Self {
        Expression::Hex(e)
    }
}

impl From<NumberExpression> for Expression {
    fn from(e: NumberExpression) -> Self {
        Expression::Number(e)
    }
}

/// A positive decimal integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberExpression {
    network: Network,
    text: String,
    value: u32,
}

impl NumberExpression {
    pub fn parse(network: Network, text: &str) -> Result<Self> {
        let invalid = || Error::InvalidNumber(text.into());

        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let value = u32::from_str(text).map_err(|_| invalid())?;
        if value == 0 {
            return Err(invalid());
        }

        Ok(Self {
            network,
            text: text.into(),
            value,
        })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn value(&self) -> u32 {
        self.value
    }
}

/// An even-length hex string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexExpression {
    network: Network,
    text: String,
    value: Vec<u8>,
}

impl HexExpression {
    pub fn parse(network: Network, text: &str) -> Result<Self> {
        // hex::decode accepts an empty string
        if text.is_empty() {
            return Err(Error::InvalidHex(text.into()));
        }
        let value = hex::decode(text).map_err(|_| Error::InvalidHex(text.into()))?;

        Ok(Self {
            network,
            text: text.into(),
            value,
        })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn numbers() {
        let n = NumberExpression::parse(Network::Testnet, "12").unwrap();
        assert_eq!(n.value(), 12);
        assert_eq!(n.text(), "12");

        for bad in ["0", "", "-1", "1.5", "12a", "a12", "99999999999"] {
            assert_eq!(
                NumberExpression::parse(Network::Testnet, bad),
                Err(Error::InvalidNumber(bad.into())),
                "{bad}"
            );
        }
    }

    #[test]
    fn hex_strings() {
        let h = HexExpression::parse(Network::Testnet, "00Ff").unwrap();
        assert_eq!(h.value(), &[0x00, 0xff]);

        for bad in ["", "0", "0g", "abc"] {
            assert!(HexExpression::parse(Network::Testnet, bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn expression_accessors() {
        let e = Expression::from(NumberExpression::parse(Network::Regtest, "3").unwrap());
        assert_eq!(e.expression_type(), ExpressionType::Number);
        assert_eq!(e.network(), Network::Regtest);
        assert_eq!(e.text(), "3");
        assert_eq!(e.to_ref().to_expression(), e);
        assert_eq!(e.to_string(), "3");
    }
}
