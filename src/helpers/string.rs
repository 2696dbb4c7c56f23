//! Little-endian integer and float decoding for the binary workbook formats.
//!
//! Callers slice the input first; every decoder reads from the start of the
//! slice and panics if it is shorter than the decoded width.

macro_rules! little_endian {
    ($(#[$meta:meta])* $name:ident => $kind:ty) => {
        $(#[$meta])*
        #[inline]
        pub(crate) fn $name(bytes: &[u8]) -> $kind {
            let mut buffer = [0u8; std::mem::size_of::<$kind>()];
            buffer.copy_from_slice(&bytes[..std::mem::size_of::<$kind>()]);
            <$kind>::from_le_bytes(buffer)
        }
    };
}

little_endian!(
    /// Reads a `u16` from the first 2 bytes.
    to_u16 => u16
);
little_endian!(
    /// Reads a `u32` from the first 4 bytes.
    to_u32 => u32
);
little_endian!(
    /// Reads a `u64` from the first 8 bytes.
    to_u64 => u64
);
little_endian!(
    /// Reads an IEEE 754 double from the first 8 bytes.
    to_f64 => f64
);

/// Reads a 32-bit sector or record offset as `usize`.
#[inline]
pub(crate) fn to_usize(bytes: &[u8]) -> usize {
    to_u32(bytes) as usize
}

/// Splits a byte slice into consecutive 32-bit offsets. A trailing partial
/// word is ignored.
pub(crate) fn to_usize_iter(bytes: &[u8]) -> impl ExactSizeIterator<Item = usize> + '_ {
    bytes.chunks_exact(4).map(to_usize)
}
