/// Literal/length alphabet size used by dynamic headers (0-285)
pub const NUM_LITERAL_LENGTH_CODES: usize = 286;

/// Distance alphabet size used by dynamic headers (0-29)
pub const NUM_DISTANCE_CODES: usize = 30;

/// Code length alphabet size (0-18)
pub const NUM_CODE_LENGTH_CODES: usize = 19;

/// Fixed Huffman literal/length code lengths (RFC 1951 section 3.2.6)
///
/// Covers all 288 symbols; 286 and 287 have codes but never appear in valid data.
pub fn fixed_literal_lengths() -> [u8; 288] {
    let mut lengths = [0u8; 288];
    lengths[0..=143].fill(8); // 0-143: 8 bits
    lengths[144..=255].fill(9); // 144-255: 9 bits
    lengths[256..=279].fill(7); // 256-279: 7 bits
    lengths[280..=287].fill(8); // 280-287: 8 bits
    lengths
}

/// Fixed Huffman distance code lengths (all 5 bits, 30 and 31 unused)
pub fn fixed_distance_lengths() -> [u8; 32] {
    [5u8; 32]
}
