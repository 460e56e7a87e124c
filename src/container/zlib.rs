use crate::bits::BitReader;
use crate::checksum::{Adler32, RollingChecksum};
use crate::deflate::{InflateStats, Inflater, TrailingReader};
use crate::error::{Error, Result};
use crate::huffman::{SymbolDecoder, TableDecoder};
use crate::window::{WindowFactory, WindowKind};
use log::debug;
use std::io::{self, Read};

/// FLG bit announcing a preset dictionary
const FDICT: u8 = 1 << 5;

/// Parsed zlib header (RFC 1950)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZlibHeader {
    pub cmf: u8,
    pub flg: u8,
    /// LZ77 window size, `1 << (CINFO + 8)`
    pub window_size: usize,
    /// FLEVEL: 0 fastest .. 3 maximum compression
    pub level: u8,
    pub has_dictionary: bool,
}

impl ZlibHeader {
    /// Parse and validate the two header bytes
    pub fn parse<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf).map_err(Error::from_read)?;
        Self::from_bytes(buf)
    }

    pub fn from_bytes([cmf, flg]: [u8; 2]) -> Result<Self> {
        let check = u16::from_be_bytes([cmf, flg]);
        if check % 31 != 0 {
            return Err(Error::ZlibHeaderChecksum(check));
        }

        let method = cmf & 0x0F;
        if method != 8 {
            return Err(Error::UnsupportedCompressionMethod(method));
        }

        let cinfo = cmf >> 4;
        if cinfo > 7 {
            return Err(Error::InvalidZlibWindow(cinfo));
        }

        Ok(ZlibHeader {
            cmf,
            flg,
            window_size: 1 << (cinfo + 8),
            level: flg >> 6,
            has_dictionary: flg & FDICT != 0,
        })
    }
}

/// Streaming zlib decoder
///
/// The window is sized from the header, so back-references beyond the declared
/// window are rejected. The Adler-32 trailer is validated at end of data.
pub struct ZlibDecoder<R: Read, D: SymbolDecoder = TableDecoder> {
    inflater: Inflater<R, D>,
    header: ZlibHeader,
    adler: Adler32,
    done: bool,
    failed: bool,
}

impl<R: Read> ZlibDecoder<R> {
    /// Decoder with a ring window and the flat-table symbol decoder
    pub fn new(reader: R) -> Result<Self> {
        Self::with_factory(reader, WindowKind::default().factory())
    }
}

impl<R: Read, D: SymbolDecoder> ZlibDecoder<R, D> {
    pub fn with_factory(reader: R, factory: WindowFactory) -> Result<Self> {
        Self::from_bits(BitReader::new(reader), factory)
    }

    pub(crate) fn from_bits(mut bits: BitReader<R>, factory: WindowFactory) -> Result<Self> {
        let header = ZlibHeader::parse(&mut bits)?;
        if header.has_dictionary {
            return Err(Error::PresetDictionary);
        }
        debug!("zlib header: window={} level={}", header.window_size, header.level);

        let mut inflater = Inflater::from_bits(bits, factory(header.window_size));
        inflater.hold_window_past_final_block();
        Ok(Self { inflater, header, adler: Adler32::new(), done: false, failed: false })
    }

    pub fn header(&self) -> &ZlibHeader {
        &self.header
    }

    pub fn stats(&self) -> &InflateStats {
        self.inflater.stats()
    }

    pub fn bytes_consumed(&self) -> u64 {
        self.inflater.bytes_consumed()
    }

    pub fn is_finished(&self) -> bool {
        self.done
    }

    /// Decode into `buf`; `Ok(0)` once the trailer is validated
    pub fn decode(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.failed {
            return Err(Error::SessionFailed);
        }
        let result = self.decode_inner(buf);
        if result.is_err() {
            self.failed = true;
            self.inflater.release_window();
        }
        result
    }

    fn decode_inner(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.done || buf.is_empty() {
            return Ok(0);
        }
        let n = self.inflater.inflate(buf)?;
        if n > 0 {
            self.adler.update_slice(&buf[..n]);
            return Ok(n);
        }

        self.inflater.enter_trailing_bytes()?;
        let mut trailer = [0u8; 4];
        self.inflater.read_trailing_exact(&mut trailer)?;
        let expected = u32::from_be_bytes(trailer);
        debug!("zlib trailer: adler32=0x{:08x}", expected);

        let found = self.adler.value();
        if expected != found {
            return Err(Error::Adler32Mismatch { expected, found });
        }
        self.inflater.release_window();
        self.done = true;
        Ok(0)
    }

    /// [`Read`] over input left after the stream
    pub fn trailing_reader(&mut self) -> Result<TrailingReader<'_, R>> {
        if !self.done {
            return Err(Error::InvalidState("zlib stream not finished"));
        }
        self.inflater.trailing_reader()
    }
}

impl<R: Read, D: SymbolDecoder> Read for ZlibDecoder<R, D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.decode(buf).map_err(io::Error::from)
    }
}
