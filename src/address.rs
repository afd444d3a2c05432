use core::fmt;
use core::str::FromStr;

use bitcoin::{Address, Network};

use crate::error::{Error, Result};
use crate::payment::{Payment, Template};

/// Address template of an `addr(...)` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddrType {
    P2pkh,
    P2sh,
    P2wpkh,
    P2wsh,
}

impl AddrType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddrType::P2pkh => "p2pkh",
            AddrType::P2sh => "p2sh",
            AddrType::P2wpkh => "p2wpkh",
            AddrType::P2wsh => "p2wsh",
        }
    }
}

impl fmt::Display for AddrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AddrType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "p2pkh" => Ok(AddrType::P2pkh),
            "p2sh" => Ok(AddrType::P2sh),
            "p2wpkh" => Ok(AddrType::P2wpkh),
            "p2wsh" => Ok(AddrType::P2wsh),
            _ => Err(Error::InvalidAddress(s.into())),
        }
    }
}

impl TryFrom<Template> for AddrType {
    type Error = Error;

    fn try_from(template: Template) -> Result<Self> {
        match template {
            Template::P2pkh => Ok(AddrType::P2pkh),
            Template::P2sh => Ok(AddrType::P2sh),
            Template::P2wpkh => Ok(AddrType::P2wpkh),
            Template::P2wsh => Ok(AddrType::P2wsh),
            other => Err(Error::InvalidAddress(other.to_string())),
        }
    }
}

/// A decoded address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddrExpression {
    network: Network,
    text: String,
    addr_type: AddrType,
    payment: Payment,
}

impl AddrExpression {
    /// Decodes `text` as an address for `network`, trying P2WPKH, P2PKH, P2WSH and P2SH in
    /// that order.
    pub fn parse(network: Network, text: &str) -> Result<Self> {
        let payment = Payment::from_address(text, network)?;
        let addr_type = AddrType::try_from(payment.template())?;

        Ok(Self {
            network,
            text: text.into(),
            addr_type,
            payment,
        })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn addr_type(&self) -> AddrType {
        self.addr_type
    }

    pub fn payment(&self) -> &Payment {
        &self.payment
    }

    pub fn address(&self) -> Option<&Address> {
        self.payment.address()
    }
}

impl fmt::Display for AddrExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn address_types() {
        let cases = [
            ("tb1qm8uykx5ncknljvmg0yyv28ueaqvekausjkw4n3", AddrType::P2wpkh),
            ("n1PUNQaSqsXpSB3Rpdx8QEUrYLH2VUyGkX", AddrType::P2pkh),
            (
                "tb1q760y8stegejhntvxvd03jze7tculgjjlzg3uknhx5kk462ag5clqqqgg6x",
                AddrType::P2wsh,
            ),
            ("2N17sNBW68RrxE8tPNsYsRSNA1GmZMzjaPx", AddrType::P2sh),
        ];

        for (text, addr_type) in cases {
            let addr = AddrExpression::parse(Network::Testnet, text).unwrap();
            assert_eq!(addr.addr_type(), addr_type);
            assert_eq!(AddrType::from_str(&addr_type.to_string()).unwrap(), addr_type);
            assert_eq!(addr.to_string(), text);
        }
    }

    #[test]
    fn wrong_network() {
        assert_eq!(
            AddrExpression::parse(Network::Bitcoin, "tb1qm8uykx5ncknljvmg0yyv28ueaqvekausjkw4n3"),
            Err(Error::InvalidAddress(
                "tb1qm8uykx5ncknljvmg0yyv28ueaqvekausjkw4n3".into()
            ))
        );
    }
}
