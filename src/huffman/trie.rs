use super::canonical::{build_codes_into, CanonicalCode};
use super::decoder::SymbolDecoder;
use crate::bits::BitReader;
use crate::error::{Error, Result};
use std::io::Read;

/// Child slot tag marking a leaf; the low bits hold the symbol
const LEAF: u32 = 1 << 31;

/// Empty child slot. The root lives at index 0 and is never anyone's child.
const EMPTY: u32 = 0;

/// Binary trie decoder
///
/// Each bit walks one edge from the root. Nodes live in a flat arena as
/// `[left, right]` child slots. Build and per-symbol decode cost are both
/// proportional to code length, and there is no table to size.
#[derive(Clone, Debug, Default)]
pub struct TrieDecoder {
    nodes: Vec<[u32; 2]>,
    codes: Vec<CanonicalCode>,
    max_bits: u8,
}

impl TrieDecoder {
    fn insert(&mut self, symbol: u16, code: CanonicalCode) -> Result<()> {
        let mut node = 0usize;
        for depth in (0..code.length).rev() {
            let bit = ((code.value >> depth) & 1) as usize;
            let child = self.nodes[node][bit];

            if depth == 0 {
                // Slot must be free, otherwise this code collides with another
                if child != EMPTY {
                    return Err(Error::HuffmanOversubscribed);
                }
                self.nodes[node][bit] = LEAF | symbol as u32;
                return Ok(());
            }

            node = match child {
                EMPTY => {
                    self.nodes.push([EMPTY; 2]);
                    let idx = self.nodes.len() - 1;
                    self.nodes[node][bit] = idx as u32;
                    idx
                }
                // A shorter code is a prefix of this one
                c if c & LEAF != 0 => return Err(Error::HuffmanOversubscribed),
                c => c as usize,
            };
        }
        Ok(())
    }
}

impl SymbolDecoder for TrieDecoder {
    const NAME: &'static str = "trie";

    fn build(&mut self, lengths: &[u8]) -> Result<()> {
        let mut codes = std::mem::take(&mut self.codes);
        self.max_bits = build_codes_into(lengths, &mut codes)?;

        self.nodes.clear();
        self.nodes.push([EMPTY; 2]);
        let result = codes
            .iter()
            .enumerate()
            .filter(|(_, code)| code.is_used())
            .try_for_each(|(sym, &code)| self.insert(sym as u16, code));

        self.codes = codes;
        result
    }

    fn decode<R: Read>(&self, bits: &mut BitReader<R>) -> Result<u16> {
        if self.max_bits == 0 {
            return Err(Error::HuffmanIncomplete);
        }

        let mut node = 0usize;
        let mut code = 0u32;
        for _ in 0..self.max_bits {
            let bit = bits.read_bits(1)?;
            code = (code << 1) | bit;
            match self.nodes[node][bit as usize] {
                EMPTY => break,
                c if c & LEAF != 0 => return Ok((c & !LEAF) as u16),
                c => node = c as usize,
            }
        }

        Err(Error::InvalidHuffmanSymbol(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_node_count() {
        // A complete code over 4 symbols of length 2 needs root + 2 inner nodes
        let decoder = TrieDecoder::from_lengths(&[2, 2, 2, 2]).unwrap();
        assert_eq!(decoder.nodes.len(), 3);
    }

    #[test]
    fn test_decode_mixed_lengths() {
        // Codes: sym0 = 10, sym1 = 0, sym2 = 11
        let decoder = TrieDecoder::from_lengths(&[2, 1, 2]).unwrap();

        // Stream (LSB first): 0 | 1,0 | 1,1  -> 0b11_01_0 read from bit 0
        let mut reader = BitReader::new(Cursor::new(vec![0b0001_1010]));
        assert_eq!(decoder.decode(&mut reader).unwrap(), 1);
        assert_eq!(decoder.decode(&mut reader).unwrap(), 0);
        assert_eq!(decoder.decode(&mut reader).unwrap(), 2);
    }

    #[test]
    fn test_unassigned_path() {
        // Only code 0 exists; a 1 bit leads nowhere
        let decoder = TrieDecoder::from_lengths(&[1]).unwrap();
        let mut reader = BitReader::new(Cursor::new(vec![0b1]));
        assert!(matches!(decoder.decode(&mut reader), Err(Error::InvalidHuffmanSymbol(1))));
    }

    #[test]
    fn test_prefix_conflict_rejected() {
        let mut decoder = TrieDecoder::default();
        decoder.nodes.push([EMPTY; 2]);
        decoder.insert(0, CanonicalCode { length: 1, value: 0 }).unwrap();
        let err = decoder.insert(1, CanonicalCode { length: 2, value: 0b01 }).unwrap_err();
        assert!(matches!(err, Error::HuffmanOversubscribed));
        let err = decoder.insert(2, CanonicalCode { length: 1, value: 0 }).unwrap_err();
        assert!(matches!(err, Error::HuffmanOversubscribed));
    }
}
