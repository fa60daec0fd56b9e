//! Parameter sets and the runtime algorithm selector.
//!
//! A `ParameterSet` is a plain `Copy` record.  Every component receives the record it needs as an
//! explicit argument, so the three security levels share one code path and differ only in the
//! constants below.  `Algorithm` pairs a parameter set with one of the two CCA transforms.

use core::fmt::{self, Display};
use core::str::FromStr;
use subtle::{Choice, ConstantTimeEq};

use crate::algebra::FieldElement;
use crate::encode::encoded_polynomial_size;
use crate::error::Error;

/// The constants that describe one security level of the scheme
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParameterSet {
    /// A short name for the security level
    pub name: &'static str,
    /// The degree of the ring polynomial
    pub n: usize,
    /// The field modulus
    pub q: u16,
    /// The rank of the module
    pub k: usize,
    /// The noise parameter for the secret and for the encryption randomness
    pub eta1: usize,
    /// The noise parameter for the encryption errors
    pub eta2: usize,
    /// The compression width of the vector ciphertext part
    pub du: usize,
    /// The compression width of the scalar ciphertext part
    pub dv: usize,
    /// The claimed NIST security category
    pub nist_level: usize,
}

impl ParameterSet {
    /// Security level 1
    pub const LEVEL1: Self = Self::new("512", 2, 3, 10, 4, 1);
    /// Security level 3
    pub const LEVEL3: Self = Self::new("768", 3, 2, 10, 4, 3);
    /// Security level 5
    pub const LEVEL5: Self = Self::new("1024", 4, 2, 11, 5, 5);

    const fn new(
        name: &'static str,
        k: usize,
        eta1: usize,
        du: usize,
        dv: usize,
        nist_level: usize,
    ) -> Self {
        Self {
            name,
            n: 256,
            q: FieldElement::Q,
            k,
            eta1,
            eta2: 2,
            du,
            dv,
            nist_level,
        }
    }

    /// The length of a vector of `k` polynomials encoded at 12 bits per coefficient
    pub const fn polyvec_bytes(&self) -> usize {
        self.k * encoded_polynomial_size(12)
    }

    /// The length of the compressed `u` part of a ciphertext
    pub const fn u_bytes(&self) -> usize {
        self.k * encoded_polynomial_size(self.du)
    }

    /// The length of the compressed `v` part of a ciphertext
    pub const fn v_bytes(&self) -> usize {
        encoded_polynomial_size(self.dv)
    }

    /// `Enc_12(t_hat) || rho`
    pub const fn public_key_length(&self) -> usize {
        self.polyvec_bytes() + 32
    }

    /// `Enc_12(s_hat) || pk || H(pk) || z`
    pub const fn secret_key_length(&self) -> usize {
        self.polyvec_bytes() + self.public_key_length() + 64
    }

    /// `Enc_du(Compress_du(u)) || Enc_dv(Compress_dv(v))`
    pub const fn ciphertext_length(&self) -> usize {
        self.u_bytes() + self.v_bytes()
    }

    /// The shared secret is always 32 bytes
    pub const fn shared_secret_length(&self) -> usize {
        32
    }
}

/// The CCA transform applied on top of the shared K-PKE
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Transform {
    /// CRYSTALS-Kyber (round 3): the key is `KDF(K_bar || H(c))`
    Kyber,
    /// FIPS 203 ML-KEM: the key is taken directly from `G`
    MlKem,
}

/// The supported Kyber algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Ord, PartialOrd, Hash, Default)]
pub enum Algorithm {
    /// CRYSTALS-Kyber with security level 1
    Kyber512,
    /// CRYSTALS-Kyber with security level 3
    #[default]
    Kyber768,
    /// CRYSTALS-Kyber with security level 5
    Kyber1024,
    /// ML-KEM-512 as standardized in FIPS 203
    MlKem512,
    /// ML-KEM-768 as standardized in FIPS 203
    MlKem768,
    /// ML-KEM-1024 as standardized in FIPS 203
    MlKem1024,
}

impl ConstantTimeEq for Algorithm {
    fn ct_eq(&self, other: &Self) -> Choice {
        u8::from(*self).ct_eq(&u8::from(*other))
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .find(|alg| alg.name() == s)
            .copied()
            .ok_or(Error::InvalidParameterSet)
    }
}

impl From<Algorithm> for u8 {
    fn from(alg: Algorithm) -> u8 {
        match alg {
            Algorithm::Kyber512 => 1,
            Algorithm::Kyber768 => 2,
            Algorithm::Kyber1024 => 3,
            Algorithm::MlKem512 => 4,
            Algorithm::MlKem768 => 5,
            Algorithm::MlKem1024 => 6,
        }
    }
}

impl TryFrom<u8> for Algorithm {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Algorithm::Kyber512),
            2 => Ok(Algorithm::Kyber768),
            3 => Ok(Algorithm::Kyber1024),
            4 => Ok(Algorithm::MlKem512),
            5 => Ok(Algorithm::MlKem768),
            6 => Ok(Algorithm::MlKem1024),
            _ => Err(Error::InvalidParameterSet),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Algorithm {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if s.is_human_readable() {
            s.serialize_str(self.name())
        } else {
            s.serialize_u8(u8::from(*self))
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Algorithm {
    fn deserialize<D>(d: D) -> Result<Algorithm, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        if d.is_human_readable() {
            let s = String::deserialize(d)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            let v = u8::deserialize(d)?;
            v.try_into().map_err(serde::de::Error::custom)
        }
    }
}

impl Algorithm {
    /// Every supported algorithm, ordered by tag
    pub fn all() -> &'static [Algorithm] {
        &[
            Self::Kyber512,
            Self::Kyber768,
            Self::Kyber1024,
            Self::MlKem512,
            Self::MlKem768,
            Self::MlKem1024,
        ]
    }

    /// The canonical name of the algorithm
    pub fn name(&self) -> &'static str {
        match self {
            Self::Kyber512 => "Kyber512",
            Self::Kyber768 => "Kyber768",
            Self::Kyber1024 => "Kyber1024",
            Self::MlKem512 => "ML-KEM-512",
            Self::MlKem768 => "ML-KEM-768",
            Self::MlKem1024 => "ML-KEM-1024",
        }
    }

    /// Get the parameter set
    pub fn parameters(&self) -> ParameterSet {
        match self {
            Self::Kyber512 | Self::MlKem512 => ParameterSet::LEVEL1,
            Self::Kyber768 | Self::MlKem768 => ParameterSet::LEVEL3,
            Self::Kyber1024 | Self::MlKem1024 => ParameterSet::LEVEL5,
        }
    }

    pub(crate) fn transform(&self) -> Transform {
        match self {
            Self::Kyber512 | Self::Kyber768 | Self::Kyber1024 => Transform::Kyber,
            Self::MlKem512 | Self::MlKem768 | Self::MlKem1024 => Transform::MlKem,
        }
    }

    /// Get the claimed NIST level
    pub fn claimed_nist_level(&self) -> usize {
        self.parameters().nist_level
    }

    /// Get the length of the public key
    pub fn public_key_length(&self) -> usize {
        self.parameters().public_key_length()
    }

    /// Get the length of the secret key
    pub fn secret_key_length(&self) -> usize {
        self.parameters().secret_key_length()
    }

    /// Get the length of the ciphertext
    pub fn ciphertext_length(&self) -> usize {
        self.parameters().ciphertext_length()
    }

    /// Get the length of the shared secret
    pub fn shared_secret_length(&self) -> usize {
        self.parameters().shared_secret_length()
    }
}
