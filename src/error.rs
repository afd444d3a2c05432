//! Error types for descriptor parsing and evaluation.

use thiserror::Error;

/// Result type for descriptor operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The text does not match any legal production at this nesting level.
    Grammar,
    /// The `#checksum` suffix does not match the descriptor body.
    ChecksumMismatch,
    /// Wrong child arity or child type for a concrete node.
    Structural,
    /// Malformed extended, raw or WIF key.
    KeyDecode,
    /// Child key derivation failed or hit a non-existent index.
    Derivation,
    /// Raw output script does not match any known payment template.
    UnsupportedOutput,
    /// Invalid or inconsistent key range.
    KeyRange,
    /// A payment template rejected its parameters.
    Payment,
}

/// Errors raised while parsing or evaluating a descriptor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No production of the grammar matches the text.
    #[error("no matching text ({text}): {reason}")]
    Grammar { text: String, reason: &'static str },

    /// Fewer arguments than the script type requires.
    #[error("missing arguments; expected: {expected}, got: {found}")]
    MissingArguments { expected: usize, found: usize },

    /// Number argument is not a positive integer.
    #[error("invalid number ({0})")]
    InvalidNumber(String),

    /// Hex argument is not an even-length hex string.
    #[error("invalid hex string ({0})")]
    InvalidHex(String),

    /// Address argument does not decode to a supported payment for the network.
    #[error("invalid bitcoin address ({0})")]
    InvalidAddress(String),

    /// Unknown script type token.
    #[error("unknown script type ({0})")]
    UnknownScriptType(String),

    /// Descriptor checksum suffix does not match.
    #[error("invalid checksum ({found}); expected '{expected}'")]
    ChecksumMismatch { found: String, expected: String },

    /// Checksum is not 8 characters from the checksum charset.
    #[error("invalid checksum format ({0})")]
    InvalidChecksum(String),

    /// Wrong number and/or type of child expressions.
    #[error("[{script_type}] inconsistent child expressions; {reason}")]
    Structural {
        script_type: &'static str,
        reason: String,
    },

    /// Key text could not be decoded.
    #[error("{reason} ({key})")]
    KeyDecode { key: String, reason: &'static str },

    /// A derivation step hit an index BIP32 defines as non-existent.
    #[error("error deriving extended key: nonexistent index ({index})")]
    NonexistentIndex { index: String },

    /// The key codec failed while deriving a child key.
    #[error("error deriving extended key: {0}")]
    Derivation(String),

    /// Key range is not a valid `{startIdx, count}` pair.
    #[error("invalid key range (start: {start_idx}, count: {count})")]
    InvalidKeyRange { start_idx: u32, count: u32 },

    /// Key range set on a key that has no wildcard.
    #[error("key is not from range ({0})")]
    KeyNotRanged(String),

    /// Ranged keys of one script disagree on their key range.
    #[error("key range mismatch; key #1: {first}, key #{index}: {other}")]
    KeyRangeMismatch {
        first: String,
        index: usize,
        other: String,
    },

    /// Raw output script is not a standard template.
    #[error("non-standard output script ({0})")]
    UnsupportedOutput(String),

    /// A payment template rejected its parameters.
    #[error("error deriving {template} payment: {reason}")]
    Payment {
        template: &'static str,
        reason: String,
    },

    /// Failure while parsing one argument of a script call.
    #[error("error parsing argument #{index} ({text}): {source}")]
    Argument {
        index: usize,
        text: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn structural(script_type: &'static str, reason: impl Into<String>) -> Self {
        Self::Structural {
            script_type,
            reason: reason.into(),
        }
    }

    pub(crate) fn payment(template: &'static str, reason: impl ToString) -> Self {
        Self::Payment {
            template,
            reason: reason.to_string(),
        }
    }

    /// The innermost error, looking through argument wrappers.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Argument { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Classification of the innermost error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Argument { source, .. } => source.kind(),
            Error::Grammar { .. }
            | Error::MissingArguments { .. }
            | Error::InvalidNumber(_)
            | Error::InvalidHex(_)
            | Error::InvalidAddress(_)
            | Error::UnknownScriptType(_) => ErrorKind::Grammar,
            Error::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            Error::InvalidChecksum(_) | Error::Structural { .. } => ErrorKind::Structural,
            Error::KeyDecode { .. } => ErrorKind::KeyDecode,
            Error::NonexistentIndex { .. } | Error::Derivation(_) => ErrorKind::Derivation,
            Error::InvalidKeyRange { .. }
            | Error::KeyNotRanged(_)
            | Error::KeyRangeMismatch { .. } => ErrorKind::KeyRange,
            Error::UnsupportedOutput(_) => ErrorKind::UnsupportedOutput,
            Error::Payment { .. } => ErrorKind::Payment,
        }
    }
}
