use crate::bitcoin_definition_link;
use crate::error::{Error, Result};

/// Maximum script element size allowed by consensus rules.
#[doc = bitcoin_definition_link!("8333aa5302902f6be929c30b3c2b4e91c6583224", "script/script.h", 28)]
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

/// Maximum number of public keys per multisig.
#[doc = bitcoin_definition_link!("8333aa5302902f6be929c30b3c2b4e91c6583224", "script/script.h", 34)]
pub const MAX_PUBKEYS_PER_MULTISIG: usize = 20;

/// Number of keys a wildcard key expands to unless a key range is set.
pub const DEFAULT_KEY_RANGE_COUNT: u32 = 1001;

/// Check the threshold and key count of a multisig script.
pub fn check_multisig(threshold: u32, keys: usize) -> Result<()> {
    if keys == 0 || keys > MAX_PUBKEYS_PER_MULTISIG {
        return Err(Error::payment(
            "p2ms",
            format!("invalid number of keys ({keys}); expected 1..={MAX_PUBKEYS_PER_MULTISIG}"),
        ));
    }
    if threshold == 0 || threshold as usize > keys {
        return Err(Error::payment(
            "p2ms",
            format!("invalid threshold ({threshold}) for {keys} keys"),
        ));
    }
    Ok(())
}

/// Check that a redeem script can be pushed by a P2SH spend.
pub fn check_redeem_script_size(size: usize) -> Result<()> {
    if size > MAX_SCRIPT_ELEMENT_SIZE {
        return Err(Error::payment(
            "p2sh",
            format!("redeem script too large ({size} > {MAX_SCRIPT_ELEMENT_SIZE})"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn multisig_bounds() {
        assert!(check_multisig(1, 1).is_ok());
        assert!(check_multisig(20, 20).is_ok());
        assert!(check_multisig(0, 2).is_err());
        assert!(check_multisig(3, 2).is_err());
        assert!(check_multisig(1, 21).is_err());
        assert!(check_multisig(1, 0).is_err());
    }

    #[test]
    fn redeem_script_bounds() {
        assert!(check_redeem_script_size(MAX_SCRIPT_ELEMENT_SIZE).is_ok());
        assert!(check_redeem_script_size(MAX_SCRIPT_ELEMENT_SIZE + 1).is_err());
    }
}
