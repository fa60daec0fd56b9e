use core::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::algebra::{
    Ntt, NttInverse, NttMatrix, NttVector, Polynomial, PolynomialVector, sample_poly_cbd,
};
use crate::compress::Compress;
use crate::crypto::PRF;
use crate::encode::Encode;
use crate::error::{InputKind, KyberResult, check_length};
use crate::observer::{Observer, Stage, emit};
use crate::param::ParameterSet;
use crate::util::{B32, Truncate, b32};

/// A `DecryptionKey` provides the ability to generate a new key pair, and decrypt an
/// encrypted value.
#[derive(Clone, PartialEq)]
pub struct DecryptionKey {
    params: ParameterSet,
    s_hat: NttVector,
}

impl fmt::Debug for DecryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptionKey")
            .field("params", &self.params.name)
            .field("s_hat", &"<redacted>")
            .finish()
    }
}

impl Drop for DecryptionKey {
    fn drop(&mut self) {
        self.s_hat.zeroize();
    }
}

impl ZeroizeOnDrop for DecryptionKey {}

impl DecryptionKey {
    /// Generate a new key pair from the public seed `rho` and the noise seed `sigma`, according
    /// to the `K-PKE.KeyGen` procedure.  Deriving the two seeds is left to the CCA transform.
    pub fn generate(
        params: ParameterSet,
        rho: &B32,
        sigma: &B32,
        observer: &mut dyn Observer,
    ) -> (Self, EncryptionKey) {
        let k = params.k;

        // Sample pseudo-random matrix and vectors
        let A_hat = NttMatrix::sample_uniform(rho, k, false);
        emit(observer, Stage::MatrixExpansion, "A_hat", &A_hat);

        let mut s = PolynomialVector::sample_cbd(params.eta1, sigma, k, 0);
        let mut e = PolynomialVector::sample_cbd(params.eta1, sigma, k, u8::truncate(k));
        emit(observer, Stage::NoiseSampling, "s", &s);
        emit(observer, Stage::NoiseSampling, "e", &e);

        // NTT the vectors
        let s_hat = s.ntt();
        let mut e_hat = e.ntt();
        s.zeroize();
        e.zeroize();
        emit(observer, Stage::NttTransform, "s_hat", &s_hat);
        emit(observer, Stage::NttTransform, "e_hat", &e_hat);

        // Compute the public value
        let t_hat = &(&A_hat * &s_hat) + &e_hat;
        e_hat.zeroize();
        emit(observer, Stage::NttTransform, "t_hat", &t_hat);

        let dk = DecryptionKey { params, s_hat };
        let ek = EncryptionKey {
            params,
            t_hat,
            rho: rho.clone(),
        };
        (dk, ek)
    }

    /// Decrypt ciphertext to obtain the encrypted value, according to the `K-PKE.Decrypt`
    /// procedure.  A ciphertext that was not produced for this key decrypts to some unrelated
    /// message; that is not an error.
    pub fn decrypt(&self, ciphertext: &[u8], observer: &mut dyn Observer) -> KyberResult<B32> {
        let params = self.params;
        check_length(InputKind::Ciphertext, params.ciphertext_length(), ciphertext)?;
        let (c1, c2) = ciphertext.split_at(params.u_bytes());

        let malformed = || crate::Error::InvalidInputLength {
            kind: InputKind::Ciphertext,
            expected: params.ciphertext_length(),
            actual: ciphertext.len(),
        };
        let mut u = PolynomialVector::decode(params.du, c1).ok_or_else(malformed)?;
        u.decompress(params.du);
        let mut v = Polynomial::decode(params.dv, c2).ok_or_else(malformed)?;
        v.decompress(params.dv);
        emit(observer, Stage::Decompression, "u", &u);
        emit(observer, Stage::Decompression, "v", &v);

        let u_hat = u.ntt();
        emit(observer, Stage::NttTransform, "u_hat", &u_hat);

        let sTu = (&self.s_hat * &u_hat).ntt_inverse();
        let mut w = &v - &sTu;
        emit(observer, Stage::InverseNtt, "w", &w);

        w.compress(1);
        emit(observer, Stage::Compression, "m", &w);
        let m = b32(&w.encode(1));
        w.zeroize();
        Ok(m)
    }

    /// Represent this decryption key as a byte array `Enc_12(s_hat)`
    pub fn to_bytes(&self) -> Vec<u8> {
        self.s_hat.encode(12)
    }

    /// Parse a decryption key from a byte array `Enc_12(s_hat)`
    pub fn from_bytes(params: ParameterSet, enc: &[u8]) -> KyberResult<Self> {
        let malformed = || crate::Error::InvalidInputLength {
            kind: InputKind::SecretKey,
            expected: params.polyvec_bytes(),
            actual: enc.len(),
        };
        if enc.len() != params.polyvec_bytes() {
            return Err(malformed());
        }
        let s_hat = NttVector::decode(12, enc).ok_or_else(malformed)?;
        Ok(Self { params, s_hat })
    }
}

/// An `EncryptionKey` provides the ability to encrypt a value so that it can only be
/// decrypted by the holder of the corresponding decryption key.
#[derive(Clone, Debug, PartialEq)]
pub struct EncryptionKey {
    params: ParameterSet,
    t_hat: NttVector,
    rho: B32,
}

impl EncryptionKey {
    /// Encrypt the specified message for the holder of the corresponding decryption key, using the
    /// provided randomness, according the `K-PKE.Encrypt` procedure.
    pub fn encrypt(&self, message: &B32, randomness: &B32, observer: &mut dyn Observer) -> Vec<u8> {
        let params = self.params;
        let k = params.k;

        let A_hat_t = NttMatrix::sample_uniform(&self.rho, k, true);
        emit(observer, Stage::MatrixExpansion, "A_hat^T", &A_hat_t);

        let mut r = PolynomialVector::sample_cbd(params.eta1, randomness, k, 0);
        let mut e1 = PolynomialVector::sample_cbd(params.eta2, randomness, k, u8::truncate(k));
        let prf_output = PRF(params.eta2, randomness, u8::truncate(2 * k));
        let mut e2 = sample_poly_cbd(params.eta2, &prf_output);
        emit(observer, Stage::NoiseSampling, "r", &r);
        emit(observer, Stage::NoiseSampling, "e1", &e1);
        emit(observer, Stage::NoiseSampling, "e2", &e2);

        let r_hat = r.ntt();
        r.zeroize();
        emit(observer, Stage::NttTransform, "r_hat", &r_hat);

        let ATr = (&A_hat_t * &r_hat).ntt_inverse();
        let mut u = &ATr + &e1;
        e1.zeroize();
        emit(observer, Stage::InverseNtt, "u", &u);

        // `message` is exactly 32 bytes, so this decoding cannot fail
        let mut mu = Polynomial::decode(1, message).unwrap_or_default();
        mu.decompress(1);
        emit(observer, Stage::Decompression, "mu", &mu);

        let tTr = (&self.t_hat * &r_hat).ntt_inverse();
        let mut v = &(&tTr + &e2) + &mu;
        e2.zeroize();
        mu.zeroize();
        emit(observer, Stage::InverseNtt, "v", &v);

        u.compress(params.du);
        v.compress(params.dv);
        emit(observer, Stage::Compression, "c1", &u);
        emit(observer, Stage::Compression, "c2", &v);

        let mut ct = u.encode(params.du);
        ct.extend_from_slice(&v.encode(params.dv));
        ct
    }

    /// Represent this encryption key as a byte array `Enc_12(t_hat) || rho`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut enc = self.t_hat.encode(12);
        enc.extend_from_slice(&self.rho);
        enc
    }

    /// Parse an encryption key from a byte array `Enc_12(t_hat) || rho`
    pub fn from_bytes(params: ParameterSet, enc: &[u8]) -> KyberResult<Self> {
        check_length(InputKind::PublicKey, params.public_key_length(), enc)?;
        let (t_hat, rho) = enc.split_at(params.polyvec_bytes());
        let t_hat = NttVector::decode(12, t_hat).ok_or(crate::Error::InvalidInputLength {
            kind: InputKind::PublicKey,
            expected: params.public_key_length(),
            actual: enc.len(),
        })?;
        Ok(Self {
            params,
            t_hat,
            rho: b32(rho),
        })
    }
}
