//! Streaming DEFLATE, zlib and gzip decompression.
//!
//! The decoder is assembled from interchangeable parts: a [`SymbolDecoder`]
//! strategy for Huffman symbols and a [`LookBackMemory`] strategy for the sliding
//! window, injected through a [`WindowFactory`]. [`decompress`] and
//! [`decompress_stream`] pick them from a [`DecodeConfig`].
//!
//! ```no_run
//! use std::io::Read;
//!
//! let data = std::fs::read("file.gz")?;
//! let mut decoder = inflow::GzipDecoder::new(data.as_slice())?;
//! let mut text = String::new();
//! decoder.read_to_string(&mut text)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bits;
pub mod checksum;
pub mod container;
pub mod deflate;
pub mod error;
pub mod huffman;
pub mod window;

pub use container::{AnyDecoder, Format, GzipDecoder, GzipHeader, ZlibDecoder, ZlibHeader};
pub use deflate::{InflateStats, Inflater};
pub use error::{Error, ErrorKind, Result};
pub use huffman::{
    CodeMajorDecoder, PackedMapDecoder, RangeDecoder, SymbolDecoder, TableDecoder, TrieDecoder,
};
pub use window::{BufferPool, LookBackMemory, WindowFactory, WindowKind, DEFLATE_MAX_DISTANCE};

use std::fmt;
use std::io::{self, Read, Write};
use std::sync::Arc;

/// Huffman symbol decoding strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DecoderKind {
    /// [`TrieDecoder`]
    Trie,
    /// [`PackedMapDecoder`] with length-major keys
    PackedLengthMajor,
    /// [`CodeMajorDecoder`]
    PackedCodeMajor,
    /// [`TableDecoder`]
    #[default]
    Table,
    /// [`RangeDecoder`]
    Range,
}

impl DecoderKind {
    pub const ALL: [DecoderKind; 5] = [
        DecoderKind::Trie,
        DecoderKind::PackedLengthMajor,
        DecoderKind::PackedCodeMajor,
        DecoderKind::Table,
        DecoderKind::Range,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DecoderKind::Trie => TrieDecoder::NAME,
            DecoderKind::PackedLengthMajor => PackedMapDecoder::NAME,
            DecoderKind::PackedCodeMajor => CodeMajorDecoder::NAME,
            DecoderKind::Table => TableDecoder::NAME,
            DecoderKind::Range => RangeDecoder::NAME,
        }
    }
}

impl fmt::Display for DecoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration for decoding
#[derive(Clone, Debug)]
pub struct DecodeConfig {
    /// Input format (default: detect)
    pub format: Format,
    /// Sliding window strategy
    pub window: WindowKind,
    /// Huffman decoding strategy
    pub decoder: DecoderKind,
    /// Window size for raw DEFLATE input
    pub max_distance: usize,
    /// Decode every gzip member instead of stopping after the first
    pub multi_member: bool,
    /// Buffer size for I/O operations
    pub buffer_size: usize,
    /// Block count for [`WindowKind::BlockChain`]
    pub block_chain_blocks: usize,
    /// Shared pool for pooled windows; each factory makes its own when unset
    pub pool: Option<Arc<BufferPool>>,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            format: Format::Auto,
            window: WindowKind::Ring,
            decoder: DecoderKind::Table,
            max_distance: DEFLATE_MAX_DISTANCE,
            multi_member: true,
            buffer_size: 128 * 1024,
            block_chain_blocks: window::chain::DEFAULT_BLOCKS,
            pool: None,
        }
    }
}

impl DecodeConfig {
    /// Window factory for the configured strategy
    pub fn window_factory(&self) -> WindowFactory {
        match (self.window, &self.pool) {
            (WindowKind::BlockChain, _) => self.window.factory_with_blocks(self.block_chain_blocks),
            (WindowKind::PooledStrict | WindowKind::PooledFast, Some(pool)) => {
                self.window.factory_with_pool(Arc::clone(pool))
            }
            (kind, _) => kind.factory(),
        }
    }
}

/// Statistics from a decode operation
#[derive(Clone, Debug, Default)]
pub struct DecodeStats {
    /// Format that was decoded (detected when configured as `Auto`)
    pub format: Format,
    /// Compressed bytes consumed, excluding trailing bytes
    pub input_bytes: u64,
    pub output_bytes: u64,
    /// gzip members, or 1 for a complete zlib/raw stream
    pub members: u64,
    /// Bytes found after the compressed data
    pub trailing_bytes: u64,
    pub blocks: InflateStats,
}

/// Decompress an in-memory buffer
pub fn decompress(data: &[u8], format: Format) -> Result<Vec<u8>> {
    let config = DecodeConfig { format, ..Default::default() };
    let mut out = Vec::with_capacity(data.len().saturating_mul(3));
    decompress_stream(data, &mut out, &config)?;
    Ok(out)
}

/// Decompress `reader` into `writer`; trailing bytes are counted and discarded
pub fn decompress_stream<R: Read, W: Write>(
    reader: R,
    writer: W,
    config: &DecodeConfig,
) -> Result<DecodeStats> {
    decompress_stream_with_trailing(reader, writer, io::sink(), config)
}

/// Decompress `reader` into `writer`, copying bytes found after the compressed
/// data to `trailing`
pub fn decompress_stream_with_trailing<R: Read, W: Write, T: Write>(
    reader: R,
    writer: W,
    trailing: T,
    config: &DecodeConfig,
) -> Result<DecodeStats> {
    match config.decoder {
        DecoderKind::Trie => run::<_, _, _, TrieDecoder>(reader, writer, trailing, config),
        DecoderKind::PackedLengthMajor => {
            run::<_, _, _, PackedMapDecoder>(reader, writer, trailing, config)
        }
        DecoderKind::PackedCodeMajor => {
            run::<_, _, _, CodeMajorDecoder>(reader, writer, trailing, config)
        }
        DecoderKind::Table => run::<_, _, _, TableDecoder>(reader, writer, trailing, config),
        DecoderKind::Range => run::<_, _, _, RangeDecoder>(reader, writer, trailing, config),
    }
}

fn run<R: Read, W: Write, T: Write, D: SymbolDecoder>(
    reader: R,
    mut writer: W,
    mut trailing: T,
    config: &DecodeConfig,
) -> Result<DecodeStats> {
    let mut decoder = AnyDecoder::<R, D>::new(
        reader,
        config.format,
        config.window_factory(),
        config.max_distance,
        config.multi_member,
    )?;

    let mut buf = vec![0u8; config.buffer_size.max(1)];
    let mut output_bytes = 0u64;
    loop {
        let n = decoder.decode(&mut buf)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n])?;
        output_bytes += n as u64;
    }
    writer.flush()?;

    let input_bytes = decoder.bytes_consumed();
    let trailing_bytes = io::copy(&mut decoder.trailing_reader()?, &mut trailing)?;

    Ok(DecodeStats {
        format: decoder.format(),
        input_bytes,
        output_bytes,
        members: decoder.members(),
        trailing_bytes,
        blocks: *decoder.stats(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decompress_scenarios() {
        let stored = [0x01, 0x05, 0x00, 0xFA, 0xFF, 0x68, 0x65, 0x6C, 0x6C, 0x6F];
        assert_eq!(decompress(&stored, Format::Raw).unwrap(), b"hello");

        let empty_zlib = [0x78, 0x9C, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01];
        assert!(decompress(&empty_zlib, Format::Zlib).unwrap().is_empty());
        assert!(decompress(&empty_zlib, Format::Auto).unwrap().is_empty());
    }

    #[test]
    fn test_oversized_raw_window_is_capped() {
        let stored = [0x01, 0x05, 0x00, 0xFA, 0xFF, 0x68, 0x65, 0x6C, 0x6C, 0x6F];
        for window in WindowKind::ALL {
            let config = DecodeConfig {
                format: Format::Raw,
                window,
                max_distance: usize::MAX,
                ..Default::default()
            };
            let mut out = Vec::new();
            decompress_stream(&stored[..], &mut out, &config).unwrap();
            assert_eq!(out, b"hello", "{}", window);
        }
    }

    #[test]
    fn test_wrong_format_fails() {
        let empty_zlib = [0x78, 0x9C, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01];
        assert!(matches!(decompress(&empty_zlib, Format::Gzip), Err(Error::InvalidGzipMagic(_))));
    }

    #[test]
    fn test_stream_stats_and_trailing() {
        let mut data = vec![0x78, 0x9C, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01];
        data.extend_from_slice(b"tail");

        for decoder in DecoderKind::ALL {
            for window in WindowKind::ALL {
                let config = DecodeConfig { decoder, window, ..Default::default() };
                let mut out = Vec::new();
                let mut tail = Vec::new();
                let stats =
                    decompress_stream_with_trailing(data.as_slice(), &mut out, &mut tail, &config)
                        .unwrap();
                assert!(out.is_empty());
                assert_eq!(tail, b"tail");
                assert_eq!(stats.format, Format::Zlib);
                assert_eq!(stats.input_bytes, 8);
                assert_eq!(stats.trailing_bytes, 4);
                assert_eq!(stats.members, 1);
                assert_eq!(stats.blocks.fixed_blocks, 1);
            }
        }
    }

    #[test]
    fn test_config_window_factory() {
        let pool = BufferPool::new(DEFLATE_MAX_DISTANCE, 2);
        let config = DecodeConfig {
            window: WindowKind::PooledStrict,
            pool: Some(Arc::clone(&pool)),
            ..Default::default()
        };
        let window = (config.window_factory())(1024);
        assert_eq!(window.available(), 1024);
        assert_eq!(pool.outstanding(), 1);
        drop(window);
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_decoder_names() {
        let names: Vec<&str> = DecoderKind::ALL.iter().map(|d| d.name()).collect();
        assert_eq!(names, ["trie", "packed", "packed-code-major", "table", "range"]);
    }
}
