use hybrid_array::{Array, typenum::U256};

use crate::algebra::{
    FieldElement, Integer, NttPolynomial, NttVector, Polynomial, PolynomialVector,
};
use crate::util::Truncate;

type DecodedValue = Array<FieldElement, U256>;

/// The number of bytes in the `d`-bit encoding of one polynomial
pub const fn encoded_polynomial_size(d: usize) -> usize {
    32 * d
}

// Algorithm 4 ByteEncode_d(F)
//
// Each value contributes its low `d` bits, least significant bit first, to a little-endian bit
// stream.  Values must already be below `2^d` (or below q for `d = 12`).
pub(crate) fn byte_encode(d: usize, vals: &[FieldElement]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity((vals.len() * d).div_ceil(8));

    let mut acc = 0u32;
    let mut bits = 0;
    for v in vals {
        acc |= u32::from(v.0) << bits;
        bits += d;
        while bits >= 8 {
            bytes.push(u8::truncate(acc));
            acc >>= 8;
            bits -= 8;
        }
    }
    if bits > 0 {
        bytes.push(u8::truncate(acc));
    }

    bytes
}

/// Split a byte string into consecutive `d`-bit values, least significant bit first.  No range
/// reduction is applied, so this is also how the binomial sampler reads its PRF output.
pub(crate) fn unpack(d: usize, bytes: &[u8]) -> Vec<FieldElement> {
    let mask: u32 = (1 << d) - 1;
    let mut vals = Vec::with_capacity(bytes.len() * 8 / d);

    let mut acc = 0u32;
    let mut bits = 0;
    for b in bytes {
        acc |= u32::from(*b) << bits;
        bits += 8;
        while bits >= d {
            vals.push(FieldElement(u16::truncate(acc & mask)));
            acc >>= d;
            bits -= d;
        }
    }

    vals
}

// Algorithm 5 ByteDecode_d(F)
//
// Returns `None` unless exactly 256 values are present.  For `d = 12` the decoded values are
// reduced mod q, so that arbitrary input still yields canonical field elements.
pub(crate) fn byte_decode(d: usize, bytes: &[u8]) -> Option<DecodedValue> {
    if bytes.len() != encoded_polynomial_size(d) {
        return None;
    }

    let vals = unpack(d, bytes);
    Some(Array::from_fn(|i| {
        let x: Integer = vals[i].0;
        if d == 12 {
            FieldElement(FieldElement::small_reduce(x))
        } else {
            FieldElement(x)
        }
    }))
}

/// Serialization of polynomials and vectors of polynomials at a runtime bit width
pub trait Encode: Sized {
    fn encode(&self, d: usize) -> Vec<u8>;
    fn decode(d: usize, enc: &[u8]) -> Option<Self>;
}

impl Encode for Polynomial {
    fn encode(&self, d: usize) -> Vec<u8> {
        byte_encode(d, &self.0)
    }

    fn decode(d: usize, enc: &[u8]) -> Option<Self> {
        byte_decode(d, enc).map(Self)
    }
}

impl Encode for NttPolynomial {
    fn encode(&self, d: usize) -> Vec<u8> {
        byte_encode(d, &self.0)
    }

    fn decode(d: usize, enc: &[u8]) -> Option<Self> {
        byte_decode(d, enc).map(Self)
    }
}

fn encode_all<T: Encode>(polys: &[T], d: usize) -> Vec<u8> {
    polys.iter().flat_map(|p| p.encode(d)).collect()
}

// The vector length is implied by the input length, which must be a whole number of polynomials.
fn decode_all<T: Encode>(d: usize, enc: &[u8]) -> Option<Vec<T>> {
    let size = encoded_polynomial_size(d);
    if enc.is_empty() || enc.len() % size != 0 {
        return None;
    }
    enc.chunks_exact(size).map(|c| T::decode(d, c)).collect()
}

impl Encode for PolynomialVector {
    fn encode(&self, d: usize) -> Vec<u8> {
        encode_all(&self.0, d)
    }

    fn decode(d: usize, enc: &[u8]) -> Option<Self> {
        decode_all(d, enc).map(Self)
    }
}

impl Encode for NttVector {
    fn encode(&self, d: usize) -> Vec<u8> {
        encode_all(&self.0, d)
    }

    fn decode(d: usize, enc: &[u8]) -> Option<Self> {
        decode_all(d, enc).map(Self)
    }
}
