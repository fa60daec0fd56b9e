use core::fmt;
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{G, H, J};
use crate::error::{InputKind, KyberResult, check_length};
use crate::observer::Observer;
use crate::param::{Algorithm, Transform};
use crate::pke::{DecryptionKey, EncryptionKey};
use crate::util::{B32, Truncate, b32};

/// A shared key resulting from a Kyber transaction
pub(crate) type SharedKey = B32;

fn select(a: &B32, b: &B32, choice: Choice) -> B32 {
    B32::from_fn(|i| u8::conditional_select(&a[i], &b[i], choice))
}

/// A `DecapsulationKey` provides the ability to generate a new key pair, and decapsulate an
/// encapsulated shared key.
#[derive(Clone)]
pub(crate) struct DecapsulationKey {
    dk_pke: DecryptionKey,
    ek: EncapsulationKey,
    z: B32,
}

impl fmt::Debug for DecapsulationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecapsulationKey")
            .field("algorithm", &self.ek.alg)
            .field("dk_pke", &self.dk_pke)
            .field("z", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl Drop for DecapsulationKey {
    fn drop(&mut self) {
        self.z.as_mut_slice().zeroize();
    }
}

impl ZeroizeOnDrop for DecapsulationKey {}

impl DecapsulationKey {
    /// Derive a key pair from the 32-byte key generation seed `d` and the implicit rejection
    /// seed `z`.
    #[allow(clippy::similar_names)] // allow dk_pke, ek_pke
    pub(crate) fn generate_deterministic(
        alg: Algorithm,
        d: &B32,
        z: &B32,
        observer: &mut dyn Observer,
    ) -> Self {
        let params = alg.parameters();
        let (rho, sigma) = match alg.transform() {
            Transform::Kyber => G(&[d.as_slice()]),
            // FIPS 203 binds the module rank into the seed expansion
            Transform::MlKem => G(&[d.as_slice(), &[u8::truncate(params.k)]]),
        };

        let (dk_pke, ek_pke) = DecryptionKey::generate(params, &rho, &sigma, observer);
        let ek = EncapsulationKey::new(alg, ek_pke);
        Self {
            dk_pke,
            ek,
            z: z.clone(),
        }
    }

    #[allow(clippy::similar_names)]
    pub(crate) fn from_bytes(alg: Algorithm, enc: &[u8]) -> KyberResult<Self> {
        let params = alg.parameters();
        check_length(InputKind::SecretKey, params.secret_key_length(), enc)?;

        let (dk_pke, rest) = enc.split_at(params.polyvec_bytes());
        let (ek_pke, rest) = rest.split_at(params.public_key_length());
        let (h, z) = rest.split_at(32);

        // The stored hash is taken as given; it is always recomputed when the key is generated
        let dk_pke = DecryptionKey::from_bytes(params, dk_pke)?;
        let ek_pke = EncryptionKey::from_bytes(params, ek_pke)?;
        Ok(Self {
            dk_pke,
            ek: EncapsulationKey {
                alg,
                ek_pke,
                h: b32(h),
            },
            z: b32(z),
        })
    }

    /// `Enc_12(s_hat) || pk || H(pk) || z`
    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut enc = self.dk_pke.to_bytes();
        enc.extend_from_slice(&self.ek.to_bytes());
        enc.extend_from_slice(&self.ek.h);
        enc.extend_from_slice(&self.z);
        enc
    }

    pub(crate) fn encapsulation_key(&self) -> &EncapsulationKey {
        &self.ek
    }

    /// Recover the shared key.  If re-encrypting the decrypted message does not reproduce the
    /// ciphertext, a pseudorandom key bound to `z` and the ciphertext is returned instead.  The
    /// choice is made with a constant-time comparison and selection.
    pub(crate) fn decapsulate(
        &self,
        ct: &[u8],
        observer: &mut dyn Observer,
    ) -> KyberResult<SharedKey> {
        let alg = self.ek.alg;
        check_length(InputKind::Ciphertext, alg.ciphertext_length(), ct)?;

        let mut mp = self.dk_pke.decrypt(ct, observer)?;
        let (mut Kp, rp) = G(&[mp.as_slice(), self.ek.h.as_slice()]);
        let cp = self.ek.ek_pke.encrypt(&mp, &rp, observer);
        let equal = cp.as_slice().ct_eq(ct);

        let K = match alg.transform() {
            Transform::Kyber => {
                let mut pre_image = select(&self.z, &Kp, equal);
                let K = J(&[pre_image.as_slice(), H(ct).as_slice()]);
                pre_image.as_mut_slice().zeroize();
                K
            }
            Transform::MlKem => {
                let Kbar = J(&[self.z.as_slice(), ct]);
                select(&Kbar, &Kp, equal)
            }
        };

        mp.as_mut_slice().zeroize();
        Kp.as_mut_slice().zeroize();
        Ok(K)
    }
}

/// An `EncapsulationKey` provides the ability to encapsulate a shared key so that it can only be
/// decapsulated by the holder of the corresponding decapsulation key.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct EncapsulationKey {
    alg: Algorithm,
    ek_pke: EncryptionKey,
    h: B32,
}

impl EncapsulationKey {
    pub(crate) fn new(alg: Algorithm, ek_pke: EncryptionKey) -> Self {
        let h = H(ek_pke.to_bytes());
        Self { alg, ek_pke, h }
    }

    pub(crate) fn from_bytes(alg: Algorithm, enc: &[u8]) -> KyberResult<Self> {
        let ek_pke = EncryptionKey::from_bytes(alg.parameters(), enc)?;
        Ok(Self::new(alg, ek_pke))
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        self.ek_pke.to_bytes()
    }

    /// Encapsulate with the 32 bytes of randomness `m`
    pub(crate) fn encapsulate_deterministic(
        &self,
        m: &B32,
        observer: &mut dyn Observer,
    ) -> (Vec<u8>, SharedKey) {
        match self.alg.transform() {
            Transform::Kyber => {
                // Never encrypt raw output of the randomness source
                let m = H(m);
                let (mut Kbar, r) = G(&[m.as_slice(), self.h.as_slice()]);
                let c = self.ek_pke.encrypt(&m, &r, observer);
                let K = J(&[Kbar.as_slice(), H(&c).as_slice()]);
                Kbar.as_mut_slice().zeroize();
                (c, K)
            }
            Transform::MlKem => {
                let (K, r) = G(&[m.as_slice(), self.h.as_slice()]);
                let c = self.ek_pke.encrypt(m, &r, observer);
                (c, K)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::observer::NoopObserver;
    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    fn random_b32(rng: &mut ChaCha20Rng) -> B32 {
        let mut out = B32::default();
        rng.fill_bytes(&mut out);
        out
    }

    #[test]
    fn round_trip() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        for &alg in Algorithm::all() {
            let d = random_b32(&mut rng);
            let z = random_b32(&mut rng);
            let m = random_b32(&mut rng);

            let dk = DecapsulationKey::generate_deterministic(alg, &d, &z, &mut NoopObserver);
            let ek = dk.encapsulation_key();
            let (ct, k_send) = ek.encapsulate_deterministic(&m, &mut NoopObserver);
            let k_recv = dk.decapsulate(&ct, &mut NoopObserver).unwrap();
            assert_eq!(k_send, k_recv);
        }
    }

    #[test]
    fn implicit_rejection() {
        let seed = B32::default();
        for &alg in Algorithm::all() {
            let dk = DecapsulationKey::generate_deterministic(alg, &seed, &seed, &mut NoopObserver);
            let (mut ct, k_send) = dk
                .encapsulation_key()
                .encapsulate_deterministic(&seed, &mut NoopObserver);
            ct[0] ^= 1;

            let k1 = dk.decapsulate(&ct, &mut NoopObserver).unwrap();
            let k2 = dk.decapsulate(&ct, &mut NoopObserver).unwrap();
            assert_ne!(k1, k_send);
            assert_eq!(k1, k2);
        }
    }

    #[test]
    fn kyber_key_derivation() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let d = random_b32(&mut rng);
        let z = random_b32(&mut rng);
        let m0 = random_b32(&mut rng);

        let dk = DecapsulationKey::generate_deterministic(Algorithm::Kyber768, &d, &z, &mut NoopObserver);
        let ek = dk.encapsulation_key();
        let (ct, k) = ek.encapsulate_deterministic(&m0, &mut NoopObserver);

        // m = H(m0), (K_bar, r) = G(m || H(pk)), K = KDF(K_bar || H(c))
        let m = H(m0);
        assert_eq!(ek.h, H(ek.to_bytes()));
        let (k_bar, r) = G(&[m.as_slice(), ek.h.as_slice()]);
        assert_eq!(ct, ek.ek_pke.encrypt(&m, &r, &mut NoopObserver));
        assert_eq!(k, J(&[k_bar.as_slice(), H(&ct).as_slice()]));

        // Rejection replaces K_bar with z
        let mut tampered = ct.clone();
        tampered[1] ^= 0x10;
        let rejected = dk.decapsulate(&tampered, &mut NoopObserver).unwrap();
        assert_eq!(rejected, J(&[z.as_slice(), H(&tampered).as_slice()]));
    }

    #[test]
    fn mlkem_key_derivation() {
        let mut rng = ChaCha20Rng::seed_from_u64(8);
        let d = random_b32(&mut rng);
        let z = random_b32(&mut rng);
        let m = random_b32(&mut rng);

        let dk = DecapsulationKey::generate_deterministic(Algorithm::MlKem768, &d, &z, &mut NoopObserver);
        let ek = dk.encapsulation_key();
        let (ct, k) = ek.encapsulate_deterministic(&m, &mut NoopObserver);

        let (expected, r) = G(&[m.as_slice(), ek.h.as_slice()]);
        assert_eq!(k, expected);
        assert_eq!(ct, ek.ek_pke.encrypt(&m, &r, &mut NoopObserver));

        let mut tampered = ct.clone();
        tampered[1] ^= 0x10;
        let rejected = dk.decapsulate(&tampered, &mut NoopObserver).unwrap();
        assert_eq!(rejected, J(&[z.as_slice(), tampered.as_slice()]));
    }

    #[test]
    fn transforms_differ() {
        let seed = B32::default();
        let kyber =
            DecapsulationKey::generate_deterministic(Algorithm::Kyber768, &seed, &seed, &mut NoopObserver);
        let mlkem =
            DecapsulationKey::generate_deterministic(Algorithm::MlKem768, &seed, &seed, &mut NoopObserver);
        assert_ne!(
            kyber.encapsulation_key().to_bytes(),
            mlkem.encapsulation_key().to_bytes()
        );
    }

    #[test]
    fn debug_hides_secrets() {
        let z = b32(&[0xa5; 32]);
        let dk = DecapsulationKey::generate_deterministic(
            Algorithm::Kyber512,
            &B32::default(),
            &z,
            &mut NoopObserver,
        );
        let debug = format!("{dk:?}");
        assert!(debug.contains("Kyber512"));
        assert!(debug.contains("<redacted>"));
        // Neither the rejection seed nor any coefficient list leaks
        assert!(!debug.contains("165"));
        assert!(!debug.contains("FieldElement"));
    }

    #[test]
    fn key_codec() {
        let seed = B32::default();
        for &alg in Algorithm::all() {
            let dk = DecapsulationKey::generate_deterministic(alg, &seed, &seed, &mut NoopObserver);
            let dk_bytes = dk.to_bytes();
            assert_eq!(dk_bytes.len(), alg.secret_key_length());

            let parsed = DecapsulationKey::from_bytes(alg, &dk_bytes).unwrap();
            assert_eq!(parsed.to_bytes(), dk_bytes);
            assert_eq!(parsed.encapsulation_key(), dk.encapsulation_key());

            let ek_bytes = dk.encapsulation_key().to_bytes();
            let ek = EncapsulationKey::from_bytes(alg, &ek_bytes).unwrap();
            assert_eq!(&ek, dk.encapsulation_key());
        }
    }
}
