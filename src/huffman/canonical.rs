//! Canonical Huffman code assignment (RFC 1951 section 3.2.2).
//!
//! Code values are derived from code lengths alone: shorter codes sort before
//! longer ones, and codes of equal length are handed out in ascending symbol
//! order. Every decoder in this crate is built on top of this assignment.

use crate::error::{Error, Result};

/// Longest code length DEFLATE allows
pub const MAX_CODE_LENGTH: usize = 15;

/// A `(length, value)` pair; length 0 marks an unused symbol
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CanonicalCode {
    pub length: u8,
    /// Code bits, most significant bit first; always `< 1 << length`
    pub value: u16,
}

impl CanonicalCode {
    pub const UNUSED: Self = Self { length: 0, value: 0 };

    pub fn is_used(&self) -> bool {
        self.length > 0
    }

    /// The code as it appears in the LSB-first bit stream
    pub fn stream_bits(&self) -> u16 {
        reverse_bits(self.value, self.length)
    }
}

/// Count codes of each length, rejecting overlong and over-subscribed sets.
///
/// Returns the per-length counts (index 0 always zero) and the longest length.
/// Incomplete codes are accepted: DEFLATE streams legitimately carry them, e.g.
/// a distance alphabet with a single code.
pub fn length_counts(lengths: &[u8]) -> Result<([u32; MAX_CODE_LENGTH + 1], u8)> {
    let mut counts = [0u32; MAX_CODE_LENGTH + 1];
    let mut max_len = 0u8;

    for &len in lengths {
        if len as usize > MAX_CODE_LENGTH {
            return Err(Error::InvalidCodeLength(len));
        }
        counts[len as usize] += 1;
        max_len = max_len.max(len);
    }
    counts[0] = 0;

    // Kraft inequality: track unassigned code space at each length
    let mut left: i32 = 1;
    for &count in &counts[1..] {
        left <<= 1;
        left -= count as i32;
        if left < 0 {
            return Err(Error::HuffmanOversubscribed);
        }
    }

    Ok((counts, max_len))
}

/// First code value for each length, given the per-length counts
pub fn first_codes(counts: &[u32; MAX_CODE_LENGTH + 1]) -> [u32; MAX_CODE_LENGTH + 2] {
    let mut next_code = [0u32; MAX_CODE_LENGTH + 2];
    for len in 1..=MAX_CODE_LENGTH {
        next_code[len + 1] = (next_code[len] + counts[len]) << 1;
    }
    next_code
}

/// Assign canonical codes into `codes` (cleared first), returning the longest length.
///
/// `codes[i]` corresponds to `lengths[i]`. Reusing `codes` across blocks avoids
/// reallocating per dynamic header.
pub fn build_codes_into(lengths: &[u8], codes: &mut Vec<CanonicalCode>) -> Result<u8> {
    let (counts, max_len) = length_counts(lengths)?;
    let mut next_code = first_codes(&counts);

    codes.clear();
    codes.extend(lengths.iter().map(|&len| {
        if len == 0 {
            return CanonicalCode::UNUSED;
        }
        let value = next_code[len as usize];
        next_code[len as usize] += 1;
        CanonicalCode { length: len, value: value as u16 }
    }));

    Ok(max_len)
}

/// Assign canonical codes for `lengths`
pub fn build_codes(lengths: &[u8]) -> Result<Vec<CanonicalCode>> {
    let mut codes = Vec::with_capacity(lengths.len());
    build_codes_into(lengths, &mut codes)?;
    Ok(codes)
}

/// Reverse the low `length` bits of `code`
pub fn reverse_bits(code: u16, length: u8) -> u16 {
    if length == 0 {
        return 0;
    }
    code.reverse_bits() >> (16 - length as u32)
}
