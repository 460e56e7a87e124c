use super::canonical::{build_codes_into, CanonicalCode};
use super::decoder::SymbolDecoder;
use crate::bits::BitReader;
use crate::error::{Error, Result};
use std::io::Read;

/// Low bits of a table entry hold the code length, the rest the symbol
const LENGTH_BITS: u32 = 4;
const LENGTH_MASK: u32 = (1 << LENGTH_BITS) - 1;

/// Reversed-bit flat table decoder
///
/// The table has `2^max_bits` entries indexed by the next `max_bits` stream
/// bits. A code of length `L` fills every slot whose low `L` bits equal its
/// bit-reversed value, so one lookup yields both symbol and true length.
/// Near the end of input, where `max_bits` bits may not exist, decoding falls
/// back to probing the same table one bit at a time.
#[derive(Clone, Debug, Default)]
pub struct TableDecoder {
    table: Vec<u32>,
    codes: Vec<CanonicalCode>,
    max_bits: u8,
}

impl TableDecoder {
    /// Number of table slots
    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    fn decode_incremental<R: Read>(&self, bits: &mut BitReader<R>) -> Result<u16> {
        let mut index = 0usize;
        for len in 1..=self.max_bits as u32 {
            index |= (bits.read_bits(1)? as usize) << (len - 1);
            // Slot for `index` followed by zero bits; a code of exactly this
            // length matching these bits is stored here
            let entry = self.table[index];
            if entry & LENGTH_MASK == len {
                return Ok((entry >> LENGTH_BITS) as u16);
            }
        }
        Err(Error::InvalidHuffmanSymbol(index as u32))
    }
}

impl SymbolDecoder for TableDecoder {
    const NAME: &'static str = "table";

    fn build(&mut self, lengths: &[u8]) -> Result<()> {
        self.max_bits = build_codes_into(lengths, &mut self.codes)?;

        self.table.clear();
        if self.max_bits == 0 {
            return Ok(());
        }
        let size = 1usize << self.max_bits;
        self.table.resize(size, 0);

        for (sym, code) in self.codes.iter().enumerate().filter(|(_, c)| c.is_used()) {
            let entry = ((sym as u32) << LENGTH_BITS) | code.length as u32;
            let start = code.stream_bits() as usize;
            for slot in (start..size).step_by(1 << code.length) {
                if self.table[slot] != 0 {
                    return Err(Error::HuffmanOversubscribed);
                }
                self.table[slot] = entry;
            }
        }
        Ok(())
    }

    #[inline]
    fn decode<R: Read>(&self, bits: &mut BitReader<R>) -> Result<u16> {
        if self.max_bits == 0 {
            return Err(Error::HuffmanIncomplete);
        }

        match bits.peek_bits(self.max_bits) {
            Ok(index) => {
                let entry = self.table[index as usize];
                let len = entry & LENGTH_MASK;
                if len == 0 {
                    return Err(Error::InvalidHuffmanSymbol(index));
                }
                bits.consume_bits(len as u8);
                Ok((entry >> LENGTH_BITS) as u16)
            }
            Err(Error::UnexpectedEof) => self.decode_incremental(bits),
            Err(e) => Err(e),
        }
    }
}
