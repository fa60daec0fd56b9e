#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]
#![allow(non_snake_case)] // Allow notation matching the published algorithms
#![allow(clippy::clone_on_copy)] // Be explicit about moving data
#![deny(missing_docs)] // Require all public interfaces to be documented
#![warn(clippy::pedantic)] // Be pedantic by default
#![warn(clippy::integer_division_remainder_used)] // Be judicious about using `/` and `%`

//! # Usage
//!
//! Select a parameter set with the [`Algorithm`] enum, generate a key pair from a cryptographic
//! random number generator, encapsulate a fresh shared secret against the public key and
//! decapsulate it on the other side.
//!
//! ```
//! use kyber_kem::Algorithm;
//! use rand::rngs::OsRng;
//!
//! let alg = Algorithm::Kyber768;
//! let (pk, sk) = alg.generate_keypair(OsRng).unwrap();
//! let (ct, k_send) = alg.encapsulate_with_rng(&pk, OsRng).unwrap();
//! let k_recv = alg.decapsulate(&sk, &ct).unwrap();
//!
//! assert_eq!(k_send, k_recv);
//! ```
//!
//! Every operation also has an `_observed` form that reports the intermediate values of the
//! computation to an [`observer::Observer`]:
//!
//! ```
//! use kyber_kem::{Algorithm, observer::{Recorder, Stage}};
//! use rand::rngs::OsRng;
//!
//! let mut recorder = Recorder::new();
//! let (_pk, _sk) = Algorithm::Kyber512
//!     .generate_keypair_observed(OsRng, &mut recorder)
//!     .unwrap();
//! let a_hat = recorder.get("A_hat").unwrap();
//! assert_eq!(a_hat.stage, Stage::MatrixExpansion);
//! ```

/// The inevitable utility module
mod util;

/// Field and ring arithmetic, the NTT, and sampling
mod algebra;

/// Hash functions, XOFs and the randomness source
mod crypto;

/// Compression and decompression of coefficients
mod compress;

/// Encoding and decoding of polynomials
mod encode;

/// The CPA-secure public-key encryption scheme
mod pke;

/// The CCA-secure key encapsulation transforms
mod kem;

/// Parameter sets
mod param;

mod error;

/// Read-only snapshots of intermediate values
pub mod observer;

pub mod stats;

pub use error::{Error, InputKind, KyberResult};
pub use param::{Algorithm, ParameterSet};

use core::fmt::{self, Debug};
use rand_core::CryptoRngCore;
use subtle::{Choice, ConstantTimeEq};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::check_length;
use crate::kem::{DecapsulationKey, EncapsulationKey};
use crate::observer::{NoopObserver, Observer};
use crate::util::b32;

macro_rules! serde_impl {
    ($name:ident, $from_method:ident) => {
        #[cfg(feature = "serde")]
        impl serde::Serialize for $name {
            fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                if s.is_human_readable() {
                    use serde::ser::SerializeStruct;

                    let mut map = s.serialize_struct(stringify!($name), 2)?;
                    map.serialize_field("algorithm", &self.algorithm)?;
                    map.serialize_field("value", &hex::encode(&self.value))?;
                    map.end()
                } else {
                    let mut seq = vec![u8::from(self.algorithm)];
                    seq.extend_from_slice(self.value.as_slice());
                    s.serialize_bytes(&seq)
                }
            }
        }

        #[cfg(feature = "serde")]
        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(d: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                if d.is_human_readable() {
                    struct FieldVisitor;
                    #[derive(serde::Deserialize)]
                    #[serde(field_identifier, rename_all = "snake_case")]
                    enum Field {
                        Algorithm,
                        Value,
                    }

                    impl<'de> serde::de::Visitor<'de> for FieldVisitor {
                        type Value = $name;

                        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                            write!(f, "a struct with two fields")
                        }

                        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
                        where
                            A: serde::de::MapAccess<'de>,
                        {
                            let mut algorithm = Option::<Algorithm>::None;
                            let mut value = Option::<String>::None;
                            while let Some(key) = map.next_key()? {
                                match key {
                                    Field::Algorithm => {
                                        if algorithm.is_some() {
                                            return Err(serde::de::Error::duplicate_field(
                                                "algorithm",
                                            ));
                                        }
                                        algorithm = Some(map.next_value()?);
                                    }
                                    Field::Value => {
                                        if value.is_some() {
                                            return Err(serde::de::Error::duplicate_field("value"));
                                        }
                                        value = Some(map.next_value()?);
                                    }
                                }
                            }

                            let algorithm = algorithm
                                .ok_or_else(|| serde::de::Error::missing_field("algorithm"))?;
                            let value =
                                value.ok_or_else(|| serde::de::Error::missing_field("value"))?;
                            let value = hex::decode(&value).map_err(serde::de::Error::custom)?;
                            algorithm
                                .$from_method(&value)
                                .map_err(serde::de::Error::custom)
                        }
                    }
                    const FIELDS: &[&str] = &["algorithm", "value"];
                    d.deserialize_struct(stringify!($name), FIELDS, FieldVisitor)
                } else {
                    struct BytesVisitor;

                    impl<'de> serde::de::Visitor<'de> for BytesVisitor {
                        type Value = $name;

                        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                            write!(f, "an algorithm tag followed by a byte sequence")
                        }

                        fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
                        where
                            E: serde::de::Error,
                        {
                            let (tag, value) = v
                                .split_first()
                                .ok_or_else(|| E::invalid_length(0, &self))?;
                            let algorithm =
                                Algorithm::try_from(*tag).map_err(serde::de::Error::custom)?;
                            algorithm
                                .$from_method(value)
                                .map_err(serde::de::Error::custom)
                        }
                    }

                    d.deserialize_bytes(BytesVisitor)
                }
            }
        }
    };
}

macro_rules! ct_eq_imp {
    ($name:ident) => {
        impl ConstantTimeEq for $name {
            fn ct_eq(&self, other: &Self) -> Choice {
                self.algorithm.ct_eq(&other.algorithm)
                    & self.value.as_slice().ct_eq(other.value.as_slice())
            }
        }

        impl Eq for $name {}

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.ct_eq(other).into()
            }
        }
    };
}

macro_rules! accessors {
    ($name:ident, $from_method:ident) => {
        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                self.value.as_ref()
            }
        }

        impl $name {
            /// Get the algorithm
            pub fn algorithm(&self) -> Algorithm {
                self.algorithm
            }

            /// Get the value
            pub fn value(&self) -> &[u8] {
                self.value.as_slice()
            }

            #[doc = concat!("Convert a slice of bytes into a [`", stringify!($name), "`] according to the specified [`Algorithm`].")]
            ///
            /// # Errors
            ///
            /// Returns [`Error::InvalidInputLength`] if the length is not exactly the one required
            /// by `algorithm`.
            pub fn from_bytes<B: AsRef<[u8]>>(algorithm: Algorithm, value: B) -> KyberResult<Self> {
                algorithm.$from_method(value.as_ref())
            }
        }
    };
}

macro_rules! redacted_debug {
    ($name:ident) => {
        impl Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("algorithm", &self.algorithm)
                    .field("value", &"<redacted>")
                    .finish()
            }
        }

        impl Zeroize for $name {
            fn zeroize(&mut self) {
                self.value.zeroize();
            }
        }

        impl Drop for $name {
            fn drop(&mut self) {
                self.zeroize();
            }
        }

        impl ZeroizeOnDrop for $name {}
    };
}

/// A Kyber ciphertext
#[derive(Debug, Clone, Default)]
pub struct Ciphertext {
    pub(crate) algorithm: Algorithm,
    pub(crate) value: Vec<u8>,
}

accessors!(Ciphertext, ciphertext_from_bytes);
ct_eq_imp!(Ciphertext);
serde_impl!(Ciphertext, ciphertext_from_bytes);

/// A Kyber public key
#[derive(Debug, Clone, Default)]
pub struct PublicKey {
    pub(crate) algorithm: Algorithm,
    pub(crate) value: Vec<u8>,
}

accessors!(PublicKey, public_key_from_bytes);
ct_eq_imp!(PublicKey);
serde_impl!(PublicKey, public_key_from_bytes);

impl From<&SecretKey> for PublicKey {
    fn from(secret_key: &SecretKey) -> Self {
        secret_key.algorithm.public_key_from_secret_key(secret_key)
    }
}

impl PublicKey {
    /// Encapsulate a random value to generate a [`SharedSecret`] and a [`Ciphertext`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::RandomnessUnavailable`] if `rng` fails.
    pub fn encapsulate_with_rng(
        &self,
        rng: impl CryptoRngCore,
    ) -> KyberResult<(Ciphertext, SharedSecret)> {
        self.algorithm.encapsulate_with_rng(self, rng)
    }
}

/// A Kyber secret key
#[derive(Clone, Default)]
pub struct SecretKey {
    pub(crate) algorithm: Algorithm,
    pub(crate) value: Vec<u8>,
}

accessors!(SecretKey, secret_key_from_bytes);
ct_eq_imp!(SecretKey);
serde_impl!(SecretKey, secret_key_from_bytes);
redacted_debug!(SecretKey);

impl SecretKey {
    /// Decapsulate the [`Ciphertext`] to return the [`SharedSecret`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameterSet`] if the ciphertext belongs to another algorithm.
    pub fn decapsulate(&self, ciphertext: &Ciphertext) -> KyberResult<SharedSecret> {
        self.algorithm.decapsulate(self, ciphertext)
    }
}

/// A Kyber shared secret
#[derive(Clone, Default)]
pub struct SharedSecret {
    pub(crate) algorithm: Algorithm,
    pub(crate) value: Vec<u8>,
}

accessors!(SharedSecret, shared_secret_from_bytes);
ct_eq_imp!(SharedSecret);
serde_impl!(SharedSecret, shared_secret_from_bytes);
redacted_debug!(SharedSecret);

impl SharedSecret {
    /// Shannon entropy of the secret's bytes, in bits per byte.  At most 5 for 32 bytes.
    pub fn entropy(&self) -> f64 {
        stats::shannon_entropy(&self.value)
    }

    /// Shannon entropy of the secret's hex digits, in bits per digit.  At most 4.
    pub fn hex_entropy(&self) -> f64 {
        stats::shannon_entropy(&stats::nibbles(&self.value))
    }

    /// The number of occurrences of every byte value in the secret
    pub fn byte_histogram(&self) -> [usize; 256] {
        stats::byte_histogram(&self.value)
    }
}

impl Algorithm {
    /// Generate a new key pair, drawing 64 bytes from `rng` in a single request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RandomnessUnavailable`] if `rng` fails.
    pub fn generate_keypair(&self, rng: impl CryptoRngCore) -> KyberResult<(PublicKey, SecretKey)> {
        self.generate_keypair_observed(rng, &mut NoopObserver)
    }

    /// Generate a new key pair and report the intermediate values to `observer`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RandomnessUnavailable`] if `rng` fails.
    pub fn generate_keypair_observed(
        &self,
        mut rng: impl CryptoRngCore,
        observer: &mut dyn Observer,
    ) -> KyberResult<(PublicKey, SecretKey)> {
        let mut seed = crypto::rand::<64>(&mut rng)?;
        let keys = self.generate_keypair_inner(&seed, observer);
        seed.zeroize();
        Ok(keys)
    }

    /// Derive a key pair from a 64-byte seed `d || z`.  The same seed always yields the same key
    /// pair.
    #[cfg_attr(not(feature = "hazmat"), doc(hidden))]
    pub fn generate_keypair_from_seed(&self, seed: &[u8; 64]) -> (PublicKey, SecretKey) {
        self.generate_keypair_inner(seed, &mut NoopObserver)
    }

    fn generate_keypair_inner(
        &self,
        seed: &[u8; 64],
        observer: &mut dyn Observer,
    ) -> (PublicKey, SecretKey) {
        let (d, z) = seed.split_at(32);
        let dk = DecapsulationKey::generate_deterministic(*self, &b32(d), &b32(z), observer);
        let pk = PublicKey {
            algorithm: *self,
            value: dk.encapsulation_key().to_bytes(),
        };
        let sk = SecretKey {
            algorithm: *self,
            value: dk.to_bytes(),
        };
        (pk, sk)
    }

    /// Encapsulate a random value to generate a [`SharedSecret`] and a [`Ciphertext`], drawing 32
    /// bytes from `rng` in a single request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameterSet`] if `public_key` belongs to another algorithm, or
    /// [`Error::RandomnessUnavailable`] if `rng` fails.
    pub fn encapsulate_with_rng(
        &self,
        public_key: &PublicKey,
        rng: impl CryptoRngCore,
    ) -> KyberResult<(Ciphertext, SharedSecret)> {
        self.encapsulate_observed(public_key, rng, &mut NoopObserver)
    }

    /// Encapsulate a random value and report the intermediate values to `observer`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameterSet`] if `public_key` belongs to another algorithm, or
    /// [`Error::RandomnessUnavailable`] if `rng` fails.
    pub fn encapsulate_observed(
        &self,
        public_key: &PublicKey,
        mut rng: impl CryptoRngCore,
        observer: &mut dyn Observer,
    ) -> KyberResult<(Ciphertext, SharedSecret)> {
        let ek = self.encapsulation_key(public_key)?;
        let mut m = crypto::rand::<32>(&mut rng)?;
        let out = self.encapsulate_inner(&ek, &m, observer);
        m.zeroize();
        Ok(out)
    }

    /// Encapsulate the given 32 bytes of randomness.  The same inputs always yield the same
    /// [`Ciphertext`] and [`SharedSecret`], so `m` must never be reused.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameterSet`] if `public_key` belongs to another algorithm.
    #[cfg_attr(not(feature = "hazmat"), doc(hidden))]
    pub fn encapsulate_deterministic(
        &self,
        public_key: &PublicKey,
        m: &[u8; 32],
    ) -> KyberResult<(Ciphertext, SharedSecret)> {
        let ek = self.encapsulation_key(public_key)?;
        Ok(self.encapsulate_inner(&ek, m, &mut NoopObserver))
    }

    fn encapsulation_key(&self, public_key: &PublicKey) -> KyberResult<EncapsulationKey> {
        if public_key.algorithm != *self {
            return Err(Error::InvalidParameterSet);
        }
        EncapsulationKey::from_bytes(*self, &public_key.value)
    }

    fn encapsulate_inner(
        &self,
        ek: &EncapsulationKey,
        m: &[u8; 32],
        observer: &mut dyn Observer,
    ) -> (Ciphertext, SharedSecret) {
        let (ct, mut k) = ek.encapsulate_deterministic(&b32(m), observer);
        let ss = SharedSecret {
            algorithm: *self,
            value: k.to_vec(),
        };
        k.as_mut_slice().zeroize();
        let ct = Ciphertext {
            algorithm: *self,
            value: ct,
        };
        (ct, ss)
    }

    /// Decapsulate the [`Ciphertext`] to return the [`SharedSecret`].  A ciphertext that was
    /// tampered with yields a pseudorandom secret rather than an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameterSet`] if the key or ciphertext belong to another
    /// algorithm, or [`Error::InvalidInputLength`] if either has the wrong length.
    pub fn decapsulate(
        &self,
        secret_key: &SecretKey,
        ciphertext: &Ciphertext,
    ) -> KyberResult<SharedSecret> {
        self.decapsulate_observed(secret_key, ciphertext, &mut NoopObserver)
    }

    /// Decapsulate the [`Ciphertext`] and report the intermediate values to `observer`.  The
    /// re-encryption performed during decapsulation is reported as well.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameterSet`] if the key or ciphertext belong to another
    /// algorithm, or [`Error::InvalidInputLength`] if either has the wrong length.
    pub fn decapsulate_observed(
        &self,
        secret_key: &SecretKey,
        ciphertext: &Ciphertext,
        observer: &mut dyn Observer,
    ) -> KyberResult<SharedSecret> {
        if secret_key.algorithm != *self || ciphertext.algorithm != *self {
            return Err(Error::InvalidParameterSet);
        }
        check_length(
            InputKind::Ciphertext,
            self.ciphertext_length(),
            &ciphertext.value,
        )?;

        let dk = DecapsulationKey::from_bytes(*self, &secret_key.value)?;
        let mut k = dk.decapsulate(&ciphertext.value, observer)?;
        let ss = SharedSecret {
            algorithm: *self,
            value: k.to_vec(),
        };
        k.as_mut_slice().zeroize();
        Ok(ss)
    }

    fn public_key_from_secret_key(&self, secret_key: &SecretKey) -> PublicKey {
        let params = self.parameters();
        let start = params.polyvec_bytes();
        let end = start + params.public_key_length();
        PublicKey {
            algorithm: *self,
            value: secret_key.value.get(start..end).unwrap_or_default().to_vec(),
        }
    }

    fn public_key_from_bytes(&self, bytes: &[u8]) -> KyberResult<PublicKey> {
        check_length(InputKind::PublicKey, self.public_key_length(), bytes)?;
        Ok(PublicKey {
            algorithm: *self,
            value: bytes.to_vec(),
        })
    }

    fn secret_key_from_bytes(&self, bytes: &[u8]) -> KyberResult<SecretKey> {
        check_length(InputKind::SecretKey, self.secret_key_length(), bytes)?;
        Ok(SecretKey {
            algorithm: *self,
            value: bytes.to_vec(),
        })
    }

    fn ciphertext_from_bytes(&self, bytes: &[u8]) -> KyberResult<Ciphertext> {
        check_length(InputKind::Ciphertext, self.ciphertext_length(), bytes)?;
        Ok(Ciphertext {
            algorithm: *self,
            value: bytes.to_vec(),
        })
    }

    fn shared_secret_from_bytes(&self, bytes: &[u8]) -> KyberResult<SharedSecret> {
        check_length(InputKind::SharedSecret, self.shared_secret_length(), bytes)?;
        Ok(SharedSecret {
            algorithm: *self,
            value: bytes.to_vec(),
        })
    }
}
