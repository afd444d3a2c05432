// Modified implementation from https://github.com/rust-bitcoin/rust-miniscript/blob/255b9d950ba04859bc16fb77567808a77b736071/src/descriptor/checksum.rs#L94

// SPDX-License-Identifier: CC0-1.0

//! Descriptor checksum
//!
//! This module contains a re-implementation of the function used by Bitcoin Core to calculate the
//! checksum of a descriptor. The checksum algorithm is specified in [BIP-380].
//!
//! [BIP-380]: <https://github.com/bitcoin/bips/blob/master/bip-0380.mediawiki>

use core::convert::TryFrom;

use bech32::primitives::checksum::PackedFe32;
use bech32::{Checksum, Fe32};
use bitcoin::bech32;

use crate::bip_link;
use crate::error::{Error, Result};

/// Number of characters of a descriptor checksum.
pub const CHECKSUM_LENGTH: usize = 8;
const CODE_LENGTH: usize = 32767;

/// Symbols a checksum is written with.
pub const CHECKSUM_CHARSET: &str = "qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Map of valid characters in descriptor strings.
///
/// The map starts at 32 (space) and runs up to 126 (tilde). Each entry is the position of the
/// character inside the 95-symbol input charset: the low 5 bits select the symbol inside its
/// group, the high bits select one of three groups.
#[rustfmt::skip]
const CHAR_MAP: [u8; 95] = [
    94, 59, 92, 91, 28, 29, 50, 15, 10, 11, 17, 51, 14, 52, 53, 16,
     0,  1,  2,  3,  4,  5,  6,  7,  8,  9, 27, 54, 55, 56, 57, 58,
    26, 82, 83, 84, 85, 86, 87, 88, 89, 32, 33, 34, 35, 36, 37, 38,
    39, 40, 41, 42, 43, 44, 45, 46, 47, 48, 49, 12, 93, 13, 60, 61,
    90, 18, 19, 20, 21, 22, 23, 24, 25, 64, 65, 66, 67, 68, 69, 70,
    71, 72, 73, 74, 75, 76, 77, 78, 79, 80, 81, 30, 62, 31, 63,
];

/// Position of `ch` in the input charset, if it belongs to it.
#[inline]
fn char_position(ch: char) -> Option<u64> {
    let code = u32::from(ch);
    if !(32..127).contains(&code) {
        return None;
    }
    Some(u64::from(CHAR_MAP[code as usize - 32]))
}

/// Computes the checksum of a descriptor body.
///
#[doc = concat!("See ", bip_link!(380, "checksum"), ".")]
///
/// Returns an empty string if `text` contains a character outside the input charset.
pub fn descriptor_checksum(text: &str) -> String {
    let mut eng = Engine::new();
    match eng.input(text) {
        Ok(()) => eng.checksum(),
        Err(_) => String::new(),
    }
}

/// Whether `checksum` is exactly 8 symbols of the checksum charset.
pub fn is_valid_checksum(checksum: &str) -> bool {
    checksum.chars().count() == CHECKSUM_LENGTH
        && checksum.chars().all(|ch| CHECKSUM_CHARSET.contains(ch))
}

/// Checks that `checksum` is the checksum of `body`.
pub(crate) fn verify_checksum(body: &str, checksum: &str) -> Result<()> {
    let expected = descriptor_checksum(body);
    if expected != checksum {
        tracing::debug!(found = checksum, %expected, "descriptor checksum mismatch");
        return Err(Error::ChecksumMismatch {
            found: checksum.into(),
            expected,
        });
    }
    tracing::trace!(checksum, "descriptor checksum verified");
    Ok(())
}

/// A character outside of the descriptor input charset.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InvalidCharacter {
    /// The character in question.
    pub ch: char,
    /// Its position in the string.
    pub pos: usize,
}

/// An engine to compute a checksum from a string.
pub struct Engine {
    inner: bech32::primitives::checksum::Engine<DescriptorChecksum>,
    cls: u64,
    clscount: u64,
}

impl Default for Engine {
    fn default() -> Engine {
        Engine::new()
    }
}

impl Engine {
    /// Constructs an engine with no input.
    pub fn new() -> Self {
        Engine {
            inner: bech32::primitives::checksum::Engine::new(),
            cls: 0,
            clscount: 0,
        }
    }

    /// Inputs some data into the checksum engine.
    ///
    /// If this function returns an error, the engine is left in an unspecified state.
    pub fn input(&mut self, s: &str) -> core::result::Result<(), InvalidCharacter> {
        for (pos, ch) in s.char_indices() {
            let pos_in_charset = char_position(ch).ok_or(InvalidCharacter { ch, pos })?;
            self.input_position(pos_in_charset);
        }
        Ok(())
    }

    fn input_position(&mut self, pos: u64) {
        self.inner.input_fe(fe32(pos));

        self.cls = self.cls * 3 + (pos >> 5);
        self.clscount += 1;
        if self.clscount == 3 {
            self.inner.input_fe(fe32(self.cls));
            self.cls = 0;
            self.clscount = 0;
        }
    }

    /// Obtains the checksum characters of all the data thus-far fed to the
    /// engine without allocating, to get a string use [`Self::checksum`].
    pub fn checksum_chars(&mut self) -> [char; CHECKSUM_LENGTH] {
        if self.clscount > 0 {
            self.inner.input_fe(fe32(self.cls));
        }
        self.inner.input_target_residue();

        let mut chars = [0 as char; CHECKSUM_LENGTH];
        let mut checksum_remaining = CHECKSUM_LENGTH;

        for checksum_ch in &mut chars {
            checksum_remaining -= 1;
            let unpacked = self.inner.residue().unpack(checksum_remaining);
            *checksum_ch = fe32(u64::from(unpacked)).to_char();
        }
        chars
    }

    /// Obtains the checksum of all the data thus-far fed to the engine.
    pub fn checksum(&mut self) -> String {
        String::from_iter(self.checksum_chars().iter().copied())
    }
}

/// Field element from the low 5 bits of `value`.
#[inline]
fn fe32(value: u64) -> Fe32 {
    Fe32::try_from(value as u8 & 31).expect("value is valid because of the mask")
}

/// The Output Script Descriptor checksum algorithm, defined in [BIP-380].
///
/// [BIP-380]: <https://github.com/bitcoin/bips/blob/master/bip-0380.mediawiki>
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum DescriptorChecksum {}

/// Generator coefficients, taken from BIP-380.
#[rustfmt::skip]
const GEN: [u64; 5] = [0xf5dee51989, 0xa9fdca3312, 0x1bab10e32d, 0x3706b1677a, 0x644d626ffd];

impl Checksum for DescriptorChecksum {
    type MidstateRepr = u64; // We need 40 bits (8 * 5).
    const CHECKSUM_LENGTH: usize = CHECKSUM_LENGTH;
    const CODE_LENGTH: usize = CODE_LENGTH;
    const GENERATOR_SH: [u64; 5] = GEN;
    const TARGET_RESIDUE: u64 = 1;
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn known_checksums() {
        assert_eq!(
            descriptor_checksum(
                "wpkh([cc909d55/0'/0'/10']03484581a96934d1ee62da5bc575a5b4091edd2945ad60fd1c8edf5255fe1cbf42)"
            ),
            "mlqvq72k"
        );
        assert_eq!(
            descriptor_checksum(
                "sh(multi(2,tpubDBHn4aVWbRA6SbSVoUZsyTowBtecUUWShQzoP7jibnjkSTa4VC2K2VZUz2CeJx4yhSMKy8ScBMe1LRSU6FsnP49ojGyHewYAD1Vf3iXm4Tm/1/*,tpubDBHn4aVWbRA6SbSVoUZsyTowBtecUUWShQzoP7jibnjkSTa4VC2K2VZUz2CeJx4yhSMKy8ScBMe1LRSU6FsnP49ojGyHewYAD1Vf3iXm4Tm/2/*))"
            ),
            "yec8ldgv"
        );
        assert_eq!(
            descriptor_checksum(
                "pkh(02eb23fcd29fbc0ef1badafc973f9011d4c8f447fd9a5997a965cc01ffca267fb6)"
            ),
            "3dry3g6c"
        );
    }

    #[test]
    fn unmapped_character_gives_empty_checksum() {
        assert_eq!(descriptor_checksum("Ã£bcedfg"), "");
        assert_eq!(descriptor_checksum("pk(\n)"), "");
    }

    #[test]
    fn checksum_format() {
        assert!(is_valid_checksum("mlqvq72k"));
        assert!(!is_valid_checksum("mlqvq72"));
        assert!(!is_valid_checksum("mlqvq72ks"));
        // 'b' is not part of the checksum charset
        assert!(!is_valid_checksum("mlqvq72b"));
    }

    #[test]
    fn verify() {
        let body = "raw(00145dc930210dd88ac6372f0e71318d565eefe72bf2)";
        assert!(verify_checksum(body, "pp260wzp").is_ok());
        assert_eq!(
            verify_checksum(body, "pp260wzq"),
            Err(Error::ChecksumMismatch {
                found: "pp260wzq".into(),
                expected: "pp260wzp".into()
            })
        );
    }

    proptest! {
        #[test]
        fn checksum_is_eight_charset_symbols(body in "[ -~]{0,120}") {
            let checksum = descriptor_checksum(&body);
            prop_assert!(is_valid_checksum(&checksum));
            prop_assert_eq!(checksum.clone(), descriptor_checksum(&body));
        }

        #[test]
        fn single_character_edit_changes_checksum(
            body in "[ -~]{1,100}",
            pos in any::<prop::sample::Index>(),
            replacement in "[ -~]",
        ) {
            let idx = pos.index(body.len());
            let original = &body[idx..idx + 1];
            prop_assume!(original != replacement);

            let mut edited = String::with_capacity(body.len());
            edited.push_str(&body[..idx]);
            edited.push_str(&replacement);
            edited.push_str(&body[idx + 1..]);

            prop_assert_ne!(descriptor_checksum(&body), descriptor_checksum(&edited));
        }
    }
}
