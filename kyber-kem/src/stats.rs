//! Empirical statistics over byte strings, such as a shared secret.
//!
//! These are plain summaries for display next to the observer snapshots.  They branch on the
//! data, so they must never be computed over a secret that is still in use.

/// The number of occurrences of every byte value
pub fn byte_histogram(bytes: &[u8]) -> [usize; 256] {
    let mut counts = [0usize; 256];
    for &b in bytes {
        counts[usize::from(b)] += 1;
    }
    counts
}

/// Split every byte into its high and low nibble, in the order they appear in hex
pub fn nibbles(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().flat_map(|b| [b >> 4, b & 0xf]).collect()
}

/// Shannon entropy of the empirical symbol distribution, in bits per symbol.  An empty input
/// has zero entropy.
#[allow(clippy::cast_precision_loss)]
pub fn shannon_entropy(symbols: &[u8]) -> f64 {
    let total = symbols.len() as f64;
    byte_histogram(symbols)
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            p * (total / count as f64).log2()
        })
        .sum()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn histogram() {
        let counts = byte_histogram(&[3, 3, 0, 255, 3]);
        assert_eq!(counts[3], 3);
        assert_eq!(counts[0], 1);
        assert_eq!(counts[255], 1);
        assert_eq!(counts.iter().sum::<usize>(), 5);
    }

    #[test]
    fn hex_digits() {
        assert_eq!(nibbles(&[0xab, 0x01]), [0xa, 0xb, 0x0, 0x1]);
        assert!(nibbles(&[]).is_empty());
    }

    #[test]
    fn entropy() {
        assert_eq!(shannon_entropy(&[]), 0.0);
        assert_eq!(shannon_entropy(&[7; 10]), 0.0);
        assert_eq!(shannon_entropy(&[0, 1]), 1.0);
        assert_eq!(shannon_entropy(&[0, 1, 2, 3]), 2.0);

        // -(3/4 log2 3/4 + 1/4 log2 1/4) = 2 - (3/4) log2 3
        let skewed = shannon_entropy(&[0, 0, 0, 1]);
        assert!((skewed - 0.811_278_124_459_132_8).abs() < 1e-12);

        let every_value: Vec<u8> = (0..=255).collect();
        assert_eq!(shannon_entropy(&every_value), 8.0);
    }
}
