//! Length and distance alphabets (RFC 1951 §3.2.5).

/// Base match length for length symbols 257..=285
const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115,
    131, 163, 195, 227, 258,
];

/// Extra bits following each length symbol
const LENGTH_EXTRA: [u8; 29] =
    [0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0];

/// Base distance for distance symbols 0..=29
const DISTANCE_BASE: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

/// Extra bits following each distance symbol
const DISTANCE_EXTRA: [u8; 30] =
    [0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13, 13];

/// Transmission order of the code length alphabet in a dynamic block header
pub const CODE_LENGTH_ORDER: [usize; 19] =
    [16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15];

/// `(base, extra_bits)` for a literal/length symbol, `None` outside 257..=285
///
/// Symbols 286 and 287 take part in the fixed code but never appear in valid data.
#[inline]
pub fn length_code(symbol: u16) -> Option<(u16, u8)> {
    let index = symbol.checked_sub(257)? as usize;
    Some((*LENGTH_BASE.get(index)?, LENGTH_EXTRA[index]))
}

/// `(base, extra_bits)` for a distance symbol, `None` for 30 and 31
#[inline]
pub fn distance_code(symbol: u16) -> Option<(u16, u8)> {
    let index = symbol as usize;
    Some((*DISTANCE_BASE.get(index)?, DISTANCE_EXTRA[index]))
}
