/// Output a string link to `bitcoin` source code.
#[macro_export]
macro_rules! bitcoin_definition_link {
    (
        $commit:literal, // Git commit hash
        $file_path:literal, // File path within `bitcoin`'s `src/`, e.g. `script/script.h`
        $start:literal$(..=$end:literal)? // File lines, e.g. `0..=123` or `0`
    ) => {
        concat!(
            "Bitcoin Core [definition](https://github.com/bitcoin/bitcoin/blob/",
            $commit,
            "/src/",
            $file_path,
            "#L",
            stringify!($start),
            $(
                "-L",
                stringify!($end),
            )?
            ")."
        )
    };
}

/// Output a string link to a BIP, optionally to one of its sections.
///
/// Takes a three-digit BIP number, e.g. `380`.
#[macro_export]
macro_rules! bip_link {
    ($number:literal) => {
        concat!(
            "[BIP-",
            stringify!($number),
            "](https://github.com/bitcoin/bips/blob/master/bip-0",
            stringify!($number),
            ".mediawiki)"
        )
    };
    ($number:literal, $section:literal) => {
        concat!(
            "[BIP-",
            stringify!($number),
            "](https://github.com/bitcoin/bips/blob/master/bip-0",
            stringify!($number),
            ".mediawiki#",
            $section,
            ")"
        )
    };
}
