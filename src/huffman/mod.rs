//! Canonical Huffman codes and interchangeable symbol decoders.
//!
//! | Decoder              | Build         | Decode per symbol     | Memory            |
//! |----------------------|---------------|-----------------------|-------------------|
//! | [`TrieDecoder`]      | O(n * len)    | one node per bit      | ~2 nodes per code |
//! | [`PackedMapDecoder`] | O(n)          | one map probe per bit | one entry per code|
//! | [`CodeMajorDecoder`] | O(n)          | one map probe per bit | one entry per code|
//! | [`TableDecoder`]     | O(2^max_len)  | one lookup            | 2^max_len entries |
//! | [`RangeDecoder`]     | O(n)          | range check per bit   | one entry per code|

pub mod canonical;
pub mod decoder;
pub mod packed;
pub mod table;
pub mod tables;
pub mod trie;

pub use canonical::{build_codes, CanonicalCode};
pub use decoder::{RangeDecoder, SymbolDecoder};
pub use packed::{CodeMajorDecoder, KeyOrder, PackedMapDecoder};
pub use table::TableDecoder;
pub use trie::TrieDecoder;
