use std::fmt;

/// DEFLATE block encoding (BTYPE)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
    /// BTYPE 00: raw bytes
    Stored,
    /// BTYPE 01: RFC 1951 fixed Huffman tables
    Fixed,
    /// BTYPE 10: Huffman tables transmitted in the block header
    Dynamic,
}

impl BlockKind {
    /// Map a 2-bit BTYPE value, `None` for the reserved value 3
    pub fn from_btype(btype: u8) -> Option<Self> {
        match btype {
            0 => Some(BlockKind::Stored),
            1 => Some(BlockKind::Fixed),
            2 => Some(BlockKind::Dynamic),
            _ => None,
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BlockKind::Stored => "stored",
            BlockKind::Fixed => "fixed",
            BlockKind::Dynamic => "dynamic",
        })
    }
}

/// Header bits that start every block
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub is_final: bool,
    pub kind: BlockKind,
}

/// Back-reference still being emitted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PendingCopy {
    pub remaining: usize,
    pub distance: usize,
}

impl PendingCopy {
    pub fn is_empty(&self) -> bool {
        self.remaining == 0
    }
}

/// Counters collected while inflating
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InflateStats {
    pub stored_blocks: u64,
    pub fixed_blocks: u64,
    pub dynamic_blocks: u64,
    /// Decoded bytes produced
    pub output_bytes: u64,
}

impl InflateStats {
    pub fn blocks(&self) -> u64 {
        self.stored_blocks + self.fixed_blocks + self.dynamic_blocks
    }

    pub(crate) fn count_block(&mut self, kind: BlockKind) {
        match kind {
            BlockKind::Stored => self.stored_blocks += 1,
            BlockKind::Fixed => self.fixed_blocks += 1,
            BlockKind::Dynamic => self.dynamic_blocks += 1,
        }
    }
}
