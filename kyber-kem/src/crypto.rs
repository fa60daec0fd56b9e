use rand_core::CryptoRngCore;
use sha3::{
    Digest, Sha3_256, Sha3_512, Shake128, Shake256,
    digest::{ExtendableOutput, Update, XofReader},
};

use crate::error::{Error, KyberResult};
use crate::util::{B32, b32};

/// Draw `N` bytes of fresh randomness in a single request.
pub fn rand<const N: usize>(rng: &mut impl CryptoRngCore) -> KyberResult<[u8; N]> {
    let mut val = [0u8; N];
    rng.try_fill_bytes(&mut val)
        .map_err(|_| Error::RandomnessUnavailable)?;
    Ok(val)
}

/// `G: B* -> B32 x B32`, instantiated with SHA3-512
pub fn G(inputs: &[impl AsRef<[u8]>]) -> (B32, B32) {
    let mut h = Sha3_512::new();
    for x in inputs {
        Digest::update(&mut h, x);
    }
    let out = h.finalize();
    (b32(&out[..32]), b32(&out[32..]))
}

/// `H: B* -> B32`, instantiated with SHA3-256
pub fn H(x: impl AsRef<[u8]>) -> B32 {
    let mut h = Sha3_256::new();
    Digest::update(&mut h, x);
    b32(&h.finalize())
}

/// `J: B* -> B32`, SHAKE256 truncated to 32 bytes.  Kyber uses the same function as its KDF.
pub fn J(inputs: &[impl AsRef<[u8]>]) -> B32 {
    let mut h = Shake256::default();
    for x in inputs {
        h.update(x.as_ref());
    }
    let mut r = h.finalize_xof();

    let mut out = B32::default();
    r.read(out.as_mut_slice());
    out
}

/// `PRF_eta: B32 x B -> B^{64 eta}`, instantiated with SHAKE256
pub fn PRF(eta: usize, s: &B32, b: u8) -> Vec<u8> {
    let mut h = Shake256::default();
    h.update(s.as_slice());
    h.update(&[b]);
    let mut r = h.finalize_xof();

    let mut out = vec![0u8; 64 * eta];
    r.read(&mut out);
    out
}

/// `XOF: B32 x B x B -> B*`, instantiated with SHAKE128
pub fn XOF(rho: &B32, i: u8, j: u8) -> impl XofReader {
    let mut h = Shake128::default();
    h.update(rho.as_slice());
    h.update(&[i, j]);
    h.finalize_xof()
}
