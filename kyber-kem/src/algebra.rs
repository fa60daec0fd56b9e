use core::ops::{Add, Mul, Sub};
use hybrid_array::{Array, typenum::U256};
use sha3::digest::XofReader;
use zeroize::{DefaultIsZeroes, Zeroize};

use crate::crypto::{PRF, XOF};
use crate::encode::unpack;
use crate::util::{B32, Truncate};

pub type Integer = u16;

/// An element of GF(q).  The value is kept in `[0, q)` by every operation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldElement(pub Integer);

impl DefaultIsZeroes for FieldElement {}

impl FieldElement {
    pub const Q: Integer = 3329;
    pub const Q32: u32 = Self::Q as u32;
    pub const Q64: u64 = Self::Q as u64;

    const BARRETT_SHIFT: usize = 32;
    #[allow(clippy::integer_division_remainder_used)]
    const BARRETT_MULTIPLIER: u64 = (1 << Self::BARRETT_SHIFT) / Self::Q64;

    /// Reduce a value in `[0, 2q)` into `[0, q)` without a data-dependent branch.
    pub const fn small_reduce(x: u16) -> u16 {
        let y = x.wrapping_sub(Self::Q);
        let mask = 0u16.wrapping_sub(y >> 15);
        y.wrapping_add(Self::Q & mask)
    }

    /// Barrett reduction, valid for every `u32` input.
    #[allow(clippy::cast_possible_truncation)]
    pub const fn barrett_reduce(x: u32) -> u16 {
        let product = (x as u64) * Self::BARRETT_MULTIPLIER;
        let quotient = (product >> Self::BARRETT_SHIFT) as u32;
        let remainder = x - quotient * Self::Q32;
        Self::small_reduce(remainder as u16)
    }
}

impl Add<FieldElement> for FieldElement {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(Self::small_reduce(self.0 + rhs.0))
    }
}

impl Sub<FieldElement> for FieldElement {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        // Guard against underflow if `rhs` is too large
        Self(Self::small_reduce(self.0 + Self::Q - rhs.0))
    }
}

impl Mul<FieldElement> for FieldElement {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self(Self::barrett_reduce(u32::from(self.0) * u32::from(rhs.0)))
    }
}

/// An element of the ring `R_q`, i.e., a polynomial over `Z_q` of degree 255
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct Polynomial(pub Array<FieldElement, U256>);

impl Polynomial {
    pub const fn new(x: Array<FieldElement, U256>) -> Self {
        Self(x)
    }
}

impl Zeroize for Polynomial {
    fn zeroize(&mut self) {
        self.0.as_mut_slice().zeroize();
    }
}

impl Add<&Polynomial> for &Polynomial {
    type Output = Polynomial;

    fn add(self, rhs: &Polynomial) -> Polynomial {
        Polynomial(Array::from_fn(|i| self.0[i] + rhs.0[i]))
    }
}

impl Sub<&Polynomial> for &Polynomial {
    type Output = Polynomial;

    fn sub(self, rhs: &Polynomial) -> Polynomial {
        Polynomial(Array::from_fn(|i| self.0[i] - rhs.0[i]))
    }
}

impl Mul<&Polynomial> for FieldElement {
    type Output = Polynomial;

    fn mul(self, rhs: &Polynomial) -> Polynomial {
        Polynomial(Array::from_fn(|i| self * rhs.0[i]))
    }
}

/// A vector of polynomials of length `k`.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct PolynomialVector(pub Vec<Polynomial>);

impl Zeroize for PolynomialVector {
    fn zeroize(&mut self) {
        self.0.iter_mut().for_each(Zeroize::zeroize);
    }
}

impl Add<&PolynomialVector> for &PolynomialVector {
    type Output = PolynomialVector;

    fn add(self, rhs: &PolynomialVector) -> PolynomialVector {
        PolynomialVector(self.0.iter().zip(rhs.0.iter()).map(|(x, y)| x + y).collect())
    }
}

impl PolynomialVector {
    /// Sample `k` polynomials from the centered binomial distribution, using PRF nonces
    /// `start_n, start_n + 1, ...`.
    pub fn sample_cbd(eta: usize, sigma: &B32, k: usize, start_n: u8) -> Self {
        Self(
            (0..k)
                .map(|i| {
                    let prf_output = PRF(eta, sigma, start_n + u8::truncate(i));
                    sample_poly_cbd(eta, &prf_output)
                })
                .collect(),
        )
    }
}

/// An element of the ring `T_q` i.e. a tuple of 128 elements of the direct sum components of
/// `T_q`, stored as 256 coefficients in pairs.
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct NttPolynomial(pub Array<FieldElement, U256>);

impl NttPolynomial {
    pub const fn new(x: Array<FieldElement, U256>) -> Self {
        Self(x)
    }
}

impl Zeroize for NttPolynomial {
    fn zeroize(&mut self) {
        self.0.as_mut_slice().zeroize();
    }
}

impl Add<&NttPolynomial> for &NttPolynomial {
    type Output = NttPolynomial;

    fn add(self, rhs: &NttPolynomial) -> NttPolynomial {
        NttPolynomial(Array::from_fn(|i| self.0[i] + rhs.0[i]))
    }
}

/// Algorithm 11: `MultiplyNTTs`
impl Mul<&NttPolynomial> for &NttPolynomial {
    type Output = NttPolynomial;

    fn mul(self, rhs: &NttPolynomial) -> NttPolynomial {
        let mut out = NttPolynomial::default();

        for i in 0..128 {
            let (c0, c1) = base_case_multiply(
                self.0[2 * i],
                self.0[2 * i + 1],
                rhs.0[2 * i],
                rhs.0[2 * i + 1],
                i,
            );

            out.0[2 * i] = c0;
            out.0[2 * i + 1] = c1;
        }

        out
    }
}

/// Algorithm 12: `BaseCaseMultiply`
///
/// Multiplication in `Z_q[X] / (X^2 - gamma)`.  This is a hot loop, so we promote to u32 and only
/// reduce where a sum could overflow the Barrett input range.
#[inline]
fn base_case_multiply(
    a0: FieldElement,
    a1: FieldElement,
    b0: FieldElement,
    b1: FieldElement,
    i: usize,
) -> (FieldElement, FieldElement) {
    let a0 = u32::from(a0.0);
    let a1 = u32::from(a1.0);
    let b0 = u32::from(b0.0);
    let b1 = u32::from(b1.0);
    let g = u32::from(GAMMA[i].0);

    let b1g = u32::from(FieldElement::barrett_reduce(b1 * g));

    let c0 = FieldElement::barrett_reduce(a0 * b0 + a1 * b1g);
    let c1 = FieldElement::barrett_reduce(a0 * b1 + a1 * b0);
    (FieldElement(c0), FieldElement(c1))
}

/// A vector of `k` NTT-domain polynomials.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct NttVector(pub Vec<NttPolynomial>);

impl Zeroize for NttVector {
    fn zeroize(&mut self) {
        self.0.iter_mut().for_each(Zeroize::zeroize);
    }
}

impl Add<&NttVector> for &NttVector {
    type Output = NttVector;

    fn add(self, rhs: &NttVector) -> NttVector {
        NttVector(self.0.iter().zip(rhs.0.iter()).map(|(x, y)| x + y).collect())
    }
}

/// Dot product.  Every partial product is already reduced before it enters the accumulator.
impl Mul<&NttVector> for &NttVector {
    type Output = NttPolynomial;

    fn mul(self, rhs: &NttVector) -> NttPolynomial {
        self.0
            .iter()
            .zip(rhs.0.iter())
            .fold(NttPolynomial::default(), |acc, (x, y)| &acc + &(x * y))
    }
}

/// A `k x k` matrix of NTT-domain polynomials.  Each vector represents a row of the matrix, so
/// that multiplying on the right just requires iteration.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct NttMatrix(pub Vec<NttVector>);

impl Mul<&NttVector> for &NttMatrix {
    type Output = NttVector;

    fn mul(self, rhs: &NttVector) -> NttVector {
        NttVector(self.0.iter().map(|x| x * rhs).collect())
    }
}

impl NttMatrix {
    /// Expand the public seed `rho` into `A_hat` (or its transpose).  Entry `(i, j)` of `A_hat`
    /// is sampled from `XOF(rho, j, i)`.
    pub fn sample_uniform(rho: &B32, k: usize, transpose: bool) -> Self {
        Self(
            (0..k)
                .map(|i| {
                    NttVector(
                        (0..k)
                            .map(|j| {
                                let (i, j) = if transpose { (j, i) } else { (i, j) };
                                let mut xof = XOF(rho, u8::truncate(j), u8::truncate(i));
                                sample_ntt(&mut xof)
                            })
                            .collect(),
                    )
                })
                .collect(),
        )
    }
}

/// The SHAKE128 rate: one squeeze of the XOF yields this many bytes.
const XOF_BLOCK_SIZE: usize = 168;

/// Algorithm 7: `SampleNTT(B)`
///
/// Candidates are consumed a whole XOF block at a time.  Every 12-bit candidate is written to the
/// next free slot and the slot counter advances by the (masked) acceptance bit, so the loop body
/// never branches on a candidate value.  The first 256 accepted values are exactly the ones the
/// early-exit formulation of the algorithm would select.
pub fn sample_ntt(xof: &mut impl XofReader) -> NttPolynomial {
    const SLACK: usize = 2 * XOF_BLOCK_SIZE / 3;

    let mut block = [0u8; XOF_BLOCK_SIZE];
    let mut candidates = [0u16; 256 + SLACK];
    let mut filled = 0;

    while filled < 256 {
        xof.read(&mut block);

        for b in block.chunks_exact(3) {
            let d1 = u16::from(b[0]) | ((u16::from(b[1]) & 0xf) << 8);
            let d2 = (u16::from(b[1]) >> 4) | (u16::from(b[2]) << 4);

            candidates[filled] = d1;
            filled += accept(d1);
            candidates[filled] = d2;
            filled += accept(d2);
        }
    }

    NttPolynomial::new(Array::from_fn(|i| FieldElement(candidates[i])))
}

/// Returns 1 if the 12-bit candidate is below q, 0 otherwise.
#[inline]
fn accept(d: u16) -> usize {
    usize::from(d.wrapping_sub(FieldElement::Q) >> 15)
}

/// Algorithm 8: `SamplePolyCBD_eta(B)`
///
/// The PRF output is unpacked into `2 * eta`-bit values.  The low `eta` bits and the high `eta`
/// bits of each value are summed with shifts and masks (no lookup tables indexed by secret data)
/// and their difference is taken mod q.
pub(crate) fn sample_poly_cbd(eta: usize, prf_output: &[u8]) -> Polynomial {
    fn bit_sum(x: u16, eta: usize) -> u16 {
        (0..eta).fold(0, |acc, j| acc + ((x >> j) & 1))
    }

    let vals = unpack(2 * eta, prf_output);
    Polynomial::new(Array::from_fn(|i| {
        let x = bit_sum(vals[i].0, eta);
        let y = bit_sum(vals[i].0 >> eta, eta);
        FieldElement(FieldElement::small_reduce(x + FieldElement::Q - y))
    }))
}

/// The Number Theoretic Transform (NTT) is a variant of the Discrete Fourier Transform (DFT)
/// defined over a finite field that turns costly polynomial multiplications into simple
/// coefficient-wise multiplications modulo a fixed prime.
pub(crate) trait Ntt {
    type Output;
    fn ntt(&self) -> Self::Output;
}

/// Algorithm 9: `NTT`
impl Ntt for Polynomial {
    type Output = NttPolynomial;

    fn ntt(&self) -> NttPolynomial {
        let mut k = 1;

        let mut f = self.0;
        for len in [128, 64, 32, 16, 8, 4, 2] {
            for start in (0..256).step_by(2 * len) {
                let zeta = ZETA_POW_BITREV[k];
                k += 1;

                for j in start..(start + len) {
                    let t = zeta * f[j + len];
                    f[j + len] = f[j] - t;
                    f[j] = f[j] + t;
                }
            }
        }

        NttPolynomial::new(f)
    }
}

impl Ntt for PolynomialVector {
    type Output = NttVector;

    fn ntt(&self) -> NttVector {
        NttVector(self.0.iter().map(Ntt::ntt).collect())
    }
}

/// The inverse NTT converts coefficient-wise products back into standard polynomial form.
#[allow(clippy::module_name_repetitions)]
pub(crate) trait NttInverse {
    type Output;
    fn ntt_inverse(&self) -> Self::Output;
}

/// Algorithm 10: `NTT^{-1}`
impl NttInverse for NttPolynomial {
    type Output = Polynomial;

    fn ntt_inverse(&self) -> Polynomial {
        let mut f = self.0;

        let mut k = 127;
        for len in [2, 4, 8, 16, 32, 64, 128] {
            for start in (0..256).step_by(2 * len) {
                let zeta = ZETA_POW_BITREV[k];
                k -= 1;

                for j in start..(start + len) {
                    let t = f[j];
                    f[j] = t + f[j + len];
                    f[j + len] = zeta * (f[j + len] - t);
                }
            }
        }

        // 3303 = 128^{-1} mod q: seven layers, each of which doubled every coefficient
        FieldElement(3303) * &Polynomial::new(f)
    }
}

impl NttInverse for NttVector {
    type Output = PolynomialVector;

    fn ntt_inverse(&self) -> PolynomialVector {
        PolynomialVector(self.0.iter().map(NttInverse::ntt_inverse).collect())
    }
}

/// Since the powers of zeta used in the `NTT` and `MultiplyNTTs` are fixed, we use pre-computed
/// tables to avoid the need to compute the exponentiations at runtime.
///
/// * `ZETA_POW_BITREV[i] = zeta^{BitRev_7(i)}`
/// * `GAMMA[i] = zeta^{2 BitRev_7(i) + 1}`
///
/// Because operator overloading can't be const, we have to do all the reductions here manually.
/// Because `for` loops are forbidden in `const` functions, we do them manually with `while` loops.
#[allow(clippy::cast_possible_truncation)]
const ZETA_POW_BITREV: [FieldElement; 128] = {
    const ZETA: u64 = 17;
    #[allow(clippy::integer_division_remainder_used)]
    const fn bitrev7(x: usize) -> usize {
        ((x >> 6) % 2)
            | (((x >> 5) % 2) << 1)
            | (((x >> 4) % 2) << 2)
            | (((x >> 3) % 2) << 3)
            | (((x >> 2) % 2) << 4)
            | (((x >> 1) % 2) << 5)
            | ((x % 2) << 6)
    }

    // Compute the powers of zeta
    let mut pow = [FieldElement(0); 128];
    let mut i = 0;
    let mut curr = 1u64;
    #[allow(clippy::integer_division_remainder_used)]
    while i < 128 {
        pow[i] = FieldElement(curr as u16);
        i += 1;
        curr = (curr * ZETA) % FieldElement::Q64;
    }

    // Reorder the powers according to bitrev7
    let mut pow_bitrev = [FieldElement(0); 128];
    let mut i = 0;
    while i < 128 {
        pow_bitrev[i] = pow[bitrev7(i)];
        i += 1;
    }
    pow_bitrev
};

#[allow(clippy::cast_possible_truncation)]
const GAMMA: [FieldElement; 128] = {
    const ZETA: u64 = 17;
    let mut gamma = [FieldElement(0); 128];
    let mut i = 0;
    while i < 128 {
        let zpr = ZETA_POW_BITREV[i].0 as u64;
        #[allow(clippy::integer_division_remainder_used)]
        let g = (zpr * zpr * ZETA) % FieldElement::Q64;
        gamma[i] = FieldElement(g as u16);
        i += 1;
    }
    gamma
};
