//! gzip (RFC 1952) and zlib (RFC 1950) wrappers around the raw inflater,
//! plus format detection.

pub mod gzip;
pub mod zlib;

pub use gzip::{GzipDecoder, GzipHeader, GZIP_MAGIC};
pub use zlib::{ZlibDecoder, ZlibHeader};

use crate::bits::BitReader;
use crate::deflate::{InflateStats, Inflater, TrailingReader};
use crate::error::{Error, Result};
use crate::huffman::{SymbolDecoder, TableDecoder};
use crate::window::{WindowFactory, DEFLATE_MAX_DISTANCE};
use log::debug;
use std::fmt;
use std::io::{self, Read};

/// Compressed stream format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    /// Detect from the first two bytes
    #[default]
    Auto,
    /// Raw DEFLATE (RFC 1951)
    Raw,
    /// zlib (RFC 1950)
    Zlib,
    /// gzip (RFC 1952)
    Gzip,
}

impl Format {
    /// Guess the format of a stream from its leading bytes
    ///
    /// gzip by magic; zlib when the header is a valid DEFLATE zlib header;
    /// raw DEFLATE otherwise, including for inputs shorter than two bytes.
    pub fn detect(prefix: &[u8]) -> Format {
        match prefix {
            [a, b, ..] if [*a, *b] == GZIP_MAGIC => Format::Gzip,
            [a, b, ..] if ZlibHeader::from_bytes([*a, *b]).is_ok() => Format::Zlib,
            _ => Format::Raw,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Format::Auto => "auto",
            Format::Raw => "raw",
            Format::Zlib => "zlib",
            Format::Gzip => "gzip",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Peek the first two bytes without consuming them
fn sniff<R: Read>(bits: &mut BitReader<R>) -> Result<Format> {
    match bits.peek_bits(16) {
        Ok(v) => Ok(Format::detect(&[v as u8, (v >> 8) as u8])),
        Err(Error::UnexpectedEof) => Ok(Format::Raw),
        Err(e) => Err(e),
    }
}

/// Decoder for any supported format
pub enum AnyDecoder<R: Read, D: SymbolDecoder = TableDecoder> {
    Raw(Inflater<R, D>),
    Zlib(ZlibDecoder<R, D>),
    Gzip(GzipDecoder<R, D>),
}

impl<R: Read, D: SymbolDecoder> AnyDecoder<R, D> {
    /// Build a decoder for `format`, sniffing the input when it is [`Format::Auto`]
    ///
    /// `raw_window` is the maximum distance for raw DEFLATE, capped at 32 KiB
    /// since no distance code reaches further; zlib takes it from its header and
    /// gzip always uses 32 KiB.
    pub fn new(
        reader: R,
        format: Format,
        factory: WindowFactory,
        raw_window: usize,
        multi_member: bool,
    ) -> Result<Self> {
        let mut bits = BitReader::new(reader);
        let format = match format {
            Format::Auto => {
                let detected = sniff(&mut bits)?;
                debug!("detected format: {}", detected);
                detected
            }
            other => other,
        };

        Ok(match format {
            Format::Gzip => {
                AnyDecoder::Gzip(GzipDecoder::from_bits(bits, factory)?.multi_member(multi_member))
            }
            Format::Zlib => AnyDecoder::Zlib(ZlibDecoder::from_bits(bits, factory)?),
            Format::Raw | Format::Auto => {
                let window = raw_window.clamp(1, DEFLATE_MAX_DISTANCE);
                if window != raw_window {
                    debug!("raw window {} clamped to {}", raw_window, window);
                }
                AnyDecoder::Raw(Inflater::from_bits(bits, factory(window)))
            }
        })
    }

    /// Format being decoded
    pub fn format(&self) -> Format {
        match self {
            AnyDecoder::Raw(_) => Format::Raw,
            AnyDecoder::Zlib(_) => Format::Zlib,
            AnyDecoder::Gzip(_) => Format::Gzip,
        }
    }

    pub fn decode(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self {
            AnyDecoder::Raw(d) => d.inflate(buf),
            AnyDecoder::Zlib(d) => d.decode(buf),
            AnyDecoder::Gzip(d) => d.decode(buf),
        }
    }

    pub fn stats(&self) -> &InflateStats {
        match self {
            AnyDecoder::Raw(d) => d.stats(),
            AnyDecoder::Zlib(d) => d.stats(),
            AnyDecoder::Gzip(d) => d.stats(),
        }
    }

    /// Streams decoded: gzip members, otherwise 1 once finished
    pub fn members(&self) -> u64 {
        match self {
            AnyDecoder::Raw(d) => d.is_finished() as u64,
            AnyDecoder::Zlib(d) => d.is_finished() as u64,
            AnyDecoder::Gzip(d) => d.members(),
        }
    }

    pub fn bytes_consumed(&self) -> u64 {
        match self {
            AnyDecoder::Raw(d) => d.bytes_consumed(),
            AnyDecoder::Zlib(d) => d.bytes_consumed(),
            AnyDecoder::Gzip(d) => d.bytes_consumed(),
        }
    }

    /// [`Read`] over input left after the compressed data
    pub fn trailing_reader(&mut self) -> Result<TrailingReader<'_, R>> {
        match self {
            AnyDecoder::Raw(d) => {
                d.enter_trailing_bytes()?;
                d.trailing_reader()
            }
            AnyDecoder::Zlib(d) => d.trailing_reader(),
            AnyDecoder::Gzip(d) => d.trailing_reader(),
        }
    }
}

impl<R: Read, D: SymbolDecoder> Read for AnyDecoder<R, D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.decode(buf).map_err(io::Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::{WindowKind, DEFLATE_MAX_DISTANCE};
    use std::io::Write;

    #[test]
    fn test_detect() {
        assert_eq!(Format::detect(&[0x1f, 0x8b, 0x08]), Format::Gzip);
        assert_eq!(Format::detect(&[0x78, 0x9c]), Format::Zlib);
        assert_eq!(Format::detect(&[0x78, 0x01]), Format::Zlib);
        assert_eq!(Format::detect(&[0x78, 0xda]), Format::Zlib);
        // Preset dictionary headers still look like zlib
        assert_eq!(Format::detect(&[0x78, 0xbb]), Format::Zlib);
        assert_eq!(Format::detect(&[0x01, 0x05]), Format::Raw);
        assert_eq!(Format::detect(&[0x78]), Format::Raw);
        assert_eq!(Format::detect(&[]), Format::Raw);
    }

    fn decode_auto(data: &[u8]) -> (Format, Vec<u8>) {
        let mut decoder = AnyDecoder::<_, TableDecoder>::new(
            data,
            Format::Auto,
            WindowKind::Ring.factory(),
            DEFLATE_MAX_DISTANCE,
            true,
        )
        .unwrap();
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        (decoder.format(), out)
    }

    #[test]
    fn test_auto_decodes_each_format() {
        let payload = b"the same payload in three wrappers ".repeat(50);

        let mut gz = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        gz.write_all(&payload).unwrap();
        assert_eq!(decode_auto(&gz.finish().unwrap()), (Format::Gzip, payload.clone()));

        let mut zl = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
        zl.write_all(&payload).unwrap();
        assert_eq!(decode_auto(&zl.finish().unwrap()), (Format::Zlib, payload.clone()));

        let stored = [0x01, 0x05, 0x00, 0xFA, 0xFF, b'h', b'e', b'l', b'l', b'o'];
        assert_eq!(decode_auto(&stored), (Format::Raw, b"hello".to_vec()));
    }

    #[test]
    fn test_raw_trailing_reader() {
        let data = [0x01, 0x01, 0x00, 0xFE, 0xFF, b'x', b'r', b'e', b's', b't'];
        let mut decoder = AnyDecoder::<_, TableDecoder>::new(
            &data[..],
            Format::Raw,
            WindowKind::Linear.factory(),
            1024,
            true,
        )
        .unwrap();
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"x");
        assert_eq!(decoder.members(), 1);

        let mut rest = Vec::new();
        decoder.trailing_reader().unwrap().read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"rest");
    }
}
