use super::canonical::{first_codes, length_counts, MAX_CODE_LENGTH};
use crate::bits::BitReader;
use crate::error::{Error, Result};
use std::io::Read;

/// Resolves Huffman-coded bits to symbol indices.
///
/// Implementations differ in data structure and cost profile but decode any
/// given bit sequence to the same symbols and reject the same inputs.
pub trait SymbolDecoder: Default {
    /// Short name for logs and CLI output
    const NAME: &'static str;

    /// Rebuild the decode structure from per-symbol code lengths
    ///
    /// Storage from a previous build is reused where possible.
    fn build(&mut self, lengths: &[u8]) -> Result<()>;

    /// Decode the next symbol from the bit stream
    fn decode<R: Read>(&self, bits: &mut BitReader<R>) -> Result<u16>;

    /// Build a fresh decoder from code lengths
    fn from_lengths(lengths: &[u8]) -> Result<Self> {
        let mut decoder = Self::default();
        decoder.build(lengths)?;
        Ok(decoder)
    }
}

/// Canonical range decoder
///
/// Keeps, per code length, the first code value and the index of its first
/// symbol in a length-sorted symbol list. Each extra bit narrows the candidate
/// to one length; a hit is a simple range check.
#[derive(Clone, Debug, Default)]
pub struct RangeDecoder {
    /// Maximum code length
    max_bits: u8,
    /// For each bit length: (first_code, first_symbol_index, count)
    bit_info: [(u32, u16, u16); MAX_CODE_LENGTH + 1],
    /// Symbols sorted by code length, then by symbol value
    symbols: Vec<u16>,
}

impl SymbolDecoder for RangeDecoder {
    const NAME: &'static str = "range";

    fn build(&mut self, lengths: &[u8]) -> Result<()> {
        let (bl_count, max_bits) = length_counts(lengths)?;
        let next_code = first_codes(&bl_count);

        let mut offsets = [0u16; MAX_CODE_LENGTH + 1];
        let mut symbol_idx = 0u16;
        for bits in 1..=MAX_CODE_LENGTH {
            offsets[bits] = symbol_idx;
            self.bit_info[bits] = (next_code[bits], symbol_idx, bl_count[bits] as u16);
            symbol_idx += bl_count[bits] as u16;
        }

        // Counting sort by length; symbol order within a length is preserved
        self.symbols.clear();
        self.symbols.resize(symbol_idx as usize, 0);
        for (sym, &len) in lengths.iter().enumerate() {
            if len > 0 {
                let slot = &mut offsets[len as usize];
                self.symbols[*slot as usize] = sym as u16;
                *slot += 1;
            }
        }

        self.max_bits = max_bits;
        Ok(())
    }

    fn decode<R: Read>(&self, bits: &mut BitReader<R>) -> Result<u16> {
        if self.max_bits == 0 {
            return Err(Error::HuffmanIncomplete);
        }

        let mut code = 0u32;
        for len in 1..=self.max_bits as usize {
            code = (code << 1) | bits.read_bits(1)?;
            let (first_code, first_idx, count) = self.bit_info[len];

            if code >= first_code && code < first_code + count as u32 {
                let idx = first_idx as usize + (code - first_code) as usize;
                return Ok(self.symbols[idx]);
            }
        }

        Err(Error::InvalidHuffmanSymbol(code))
    }
}

impl RangeDecoder {
    /// Check if this decoder is empty (no symbols)
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
