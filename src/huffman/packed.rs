use super::canonical::{build_codes_into, CanonicalCode};
use super::decoder::SymbolDecoder;
use crate::bits::BitReader;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::io::Read;

/// How `(code, length)` is packed into a single map key
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyOrder {
    /// `length << 16 | code`
    #[default]
    LengthMajor,
    /// `code << 4 | length`
    CodeMajor,
}

impl KeyOrder {
    #[inline]
    fn pack(self, code: u32, length: u8) -> u32 {
        match self {
            KeyOrder::LengthMajor => ((length as u32) << 16) | code,
            KeyOrder::CodeMajor => (code << 4) | length as u32,
        }
    }
}

/// Packed-key map decoder
///
/// Every code is stored in a hash map under one integer key combining its value
/// and length. Decoding extends the candidate code one bit at a time and probes
/// the map after each bit.
#[derive(Clone, Debug, Default)]
pub struct PackedMapDecoder {
    order: KeyOrder,
    map: HashMap<u32, u16>,
    codes: Vec<CanonicalCode>,
    max_bits: u8,
}

impl PackedMapDecoder {
    pub fn with_order(order: KeyOrder) -> Self {
        Self { order, ..Default::default() }
    }

    pub fn order(&self) -> KeyOrder {
        self.order
    }

    /// Number of codes stored
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn rebuild(&mut self, lengths: &[u8]) -> Result<()> {
        self.max_bits = build_codes_into(lengths, &mut self.codes)?;
        self.map.clear();

        for (sym, code) in self.codes.iter().enumerate().filter(|(_, c)| c.is_used()) {
            let key = self.order.pack(code.value as u32, code.length);
            if self.map.insert(key, sym as u16).is_some() {
                return Err(Error::HuffmanOversubscribed);
            }
        }
        Ok(())
    }

    fn lookup<R: Read>(&self, bits: &mut BitReader<R>) -> Result<u16> {
        if self.max_bits == 0 {
            return Err(Error::HuffmanIncomplete);
        }

        let mut code = 0u32;
        for len in 1..=self.max_bits {
            code = (code << 1) | bits.read_bits(1)?;
            if let Some(&sym) = self.map.get(&self.order.pack(code, len)) {
                return Ok(sym);
            }
        }

        Err(Error::InvalidHuffmanSymbol(code))
    }
}

impl SymbolDecoder for PackedMapDecoder {
    const NAME: &'static str = "packed";

    fn build(&mut self, lengths: &[u8]) -> Result<()> {
        self.rebuild(lengths)
    }

    fn decode<R: Read>(&self, bits: &mut BitReader<R>) -> Result<u16> {
        self.lookup(bits)
    }
}

/// [`PackedMapDecoder`] fixed to [`KeyOrder::CodeMajor`] keys
#[derive(Clone, Debug)]
pub struct CodeMajorDecoder(PackedMapDecoder);

impl Default for CodeMajorDecoder {
    fn default() -> Self {
        Self(PackedMapDecoder::with_order(KeyOrder::CodeMajor))
    }
}

impl SymbolDecoder for CodeMajorDecoder {
    const NAME: &'static str = "packed-code-major";

    fn build(&mut self, lengths: &[u8]) -> Result<()> {
        self.0.rebuild(lengths)
    }

    fn decode<R: Read>(&self, bits: &mut BitReader<R>) -> Result<u16> {
        self.0.lookup(bits)
    }
}
