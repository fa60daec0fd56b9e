use core::fmt::{self, Display};
use thiserror::Error;

/// The byte string that failed length validation
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum InputKind {
    /// An encoded public key
    PublicKey,
    /// An encoded secret key
    SecretKey,
    /// An encoded ciphertext
    Ciphertext,
    /// A shared secret
    SharedSecret,
}

impl Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PublicKey => "public key",
            Self::SecretKey => "secret key",
            Self::Ciphertext => "ciphertext",
            Self::SharedSecret => "shared secret",
        })
    }
}

/// The errors that can occur for Kyber.
///
/// A ciphertext that fails re-encryption during decapsulation is not an error: it produces the
/// implicit rejection secret instead.
#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A key or ciphertext does not have the exact length required by its parameter set
    #[error("Invalid {kind} length: expected {expected}, got {actual}")]
    InvalidInputLength {
        /// What was being parsed
        kind: InputKind,
        /// The length required by the parameter set
        expected: usize,
        /// The length that was supplied
        actual: usize,
    },
    /// The randomness source failed to deliver the requested bytes
    #[error("Randomness source unavailable")]
    RandomnessUnavailable,
    /// Unknown parameter set, or inputs that belong to different parameter sets
    #[error("Invalid parameter set")]
    InvalidParameterSet,
}

/// The result type for Kyber
pub type KyberResult<T> = Result<T, Error>;

/// Check that `bytes` has exactly the length required for `kind`
pub(crate) fn check_length(kind: InputKind, expected: usize, bytes: &[u8]) -> KyberResult<()> {
    if bytes.len() == expected {
        Ok(())
    } else {
        Err(Error::InvalidInputLength {
            kind,
            expected,
            actual: bytes.len(),
        })
    }
}
