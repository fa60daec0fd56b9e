use hybrid_array::{Array, typenum::U32};

/// A 32-byte array, defined here for brevity because it is used several times
pub type B32 = Array<u8, U32>;

/// Copy a 32-byte slice into a [`B32`].  Every caller slices at a fixed offset of a buffer whose
/// length has already been validated.
pub(crate) fn b32(bytes: &[u8]) -> B32 {
    let mut out = B32::default();
    out.copy_from_slice(bytes);
    out
}

/// Safely truncate an unsigned integer value to shorter representation
pub(crate) trait Truncate<T> {
    /// Truncate value to the width of `Self`.
    fn truncate(x: T) -> Self;
}

macro_rules! define_truncate {
    ($from:ident, $to:ident) => {
        impl Truncate<$from> for $to {
            // The high-order bits are masked off before the cast, so truncation is explicit
            #[allow(clippy::cast_possible_truncation)]
            fn truncate(x: $from) -> $to {
                (x & $from::from($to::MAX)) as $to
            }
        }
    };
}

define_truncate!(u32, u16);
define_truncate!(u32, u8);
define_truncate!(u64, u16);
define_truncate!(u64, u32);
define_truncate!(usize, u8);
