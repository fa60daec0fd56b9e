use crate::algebra::{FieldElement, Integer, Polynomial, PolynomialVector};
use crate::util::Truncate;

const DIV_SHIFT: usize = 34;
#[allow(clippy::integer_division_remainder_used)]
const DIV_MUL: u64 = (1 << DIV_SHIFT) / FieldElement::Q64;

const fn mask(d: usize) -> Integer {
    ((1 as Integer) << d) - 1
}

// Traits for objects that allow compression / decompression to `d` bits per coefficient
pub trait Compress {
    fn compress(&mut self, d: usize) -> &Self;
    fn decompress(&mut self, d: usize) -> &Self;
}

impl Compress for FieldElement {
    // Equation 4.5: Compress_d(x) = round((2^d / q) x) mod 2^d
    //
    // Here and in decompression, we leverage the following facts:
    //
    //   round(a / b) = floor((a + b/2) / b)
    //   a / q ~= (a * x) >> s where x >> s ~= 1/q
    //
    // so no division by q is performed on secret data.
    fn compress(&mut self, d: usize) -> &Self {
        const Q_HALF: u64 = (FieldElement::Q64 + 1) >> 1;
        let x = u64::from(self.0);
        let y = (((x << d) + Q_HALF) * DIV_MUL) >> DIV_SHIFT;
        self.0 = u16::truncate(y) & mask(d);
        self
    }

    // Equation 4.6: Decompress_d(x) = round((q / 2^d) x)
    fn decompress(&mut self, d: usize) -> &Self {
        let x = u32::from(self.0);
        let y = ((x * FieldElement::Q32) + (1 << (d - 1))) >> d;
        self.0 = u16::truncate(y);
        self
    }
}

impl Compress for Polynomial {
    fn compress(&mut self, d: usize) -> &Self {
        for x in &mut self.0 {
            x.compress(d);
        }

        self
    }

    fn decompress(&mut self, d: usize) -> &Self {
        for x in &mut self.0 {
            x.decompress(d);
        }

        self
    }
}

impl Compress for PolynomialVector {
    fn compress(&mut self, d: usize) -> &Self {
        for x in &mut self.0 {
            x.compress(d);
        }

        self
    }

    fn decompress(&mut self, d: usize) -> &Self {
        for x in &mut self.0 {
            x.decompress(d);
        }

        self
    }
}
