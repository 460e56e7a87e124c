use crate::bits::BitReader;
use crate::checksum::{Crc32, RollingChecksum};
use crate::deflate::{InflateStats, Inflater, TrailingReader};
use crate::error::{Error, Result};
use crate::huffman::{SymbolDecoder, TableDecoder};
use crate::window::{WindowFactory, WindowKind, DEFLATE_MAX_DISTANCE};
use log::debug;
use std::io::{self, Cursor, Read};

/// gzip magic bytes
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Gzip header flags (RFC 1952)
const FTEXT: u8 = 1 << 0;
const FHCRC: u8 = 1 << 1;
const FEXTRA: u8 = 1 << 2;
const FNAME: u8 = 1 << 3;
const FCOMMENT: u8 = 1 << 4;
const FRESERVED: u8 = 0xE0;

/// Parsed gzip member header (RFC 1952)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GzipHeader {
    pub flags: u8,
    pub mtime: u32,
    pub extra_flags: u8,
    pub os: u8,
    pub extra: Option<Vec<u8>>,
    pub filename: Option<String>,
    pub comment: Option<String>,
    /// Header CRC16 as stored; never validated
    pub header_crc: Option<u16>,
}

impl GzipHeader {
    /// Parse a gzip header from a reader
    pub fn parse<R: Read>(reader: &mut R) -> Result<Self> {
        // Magic first so short non-gzip input is reported as such
        let mut magic = [0u8; 2];
        reader.read_exact(&mut magic).map_err(Error::from_read)?;
        if magic != GZIP_MAGIC {
            return Err(Error::InvalidGzipMagic(u16::from_be_bytes(magic)));
        }

        let mut buf = [0u8; 8];
        reader.read_exact(&mut buf).map_err(Error::from_read)?;

        // Compression method (must be 8 for DEFLATE)
        if buf[0] != 8 {
            return Err(Error::UnsupportedCompressionMethod(buf[0]));
        }

        let flags = buf[1];
        if flags & FRESERVED != 0 {
            return Err(Error::ReservedGzipFlags(flags & FRESERVED));
        }
        let mtime = u32::from_le_bytes([buf[2], buf[3], buf[4], buf[5]]);
        let extra_flags = buf[6];
        let os = buf[7];

        let extra = if flags & FEXTRA != 0 {
            let mut xlen_buf = [0u8; 2];
            reader.read_exact(&mut xlen_buf).map_err(Error::from_read)?;
            let xlen = u16::from_le_bytes(xlen_buf) as usize;

            let mut extra_data = vec![0u8; xlen];
            reader.read_exact(&mut extra_data).map_err(Error::from_read)?;
            Some(extra_data)
        } else {
            None
        };

        let filename =
            if flags & FNAME != 0 { Some(read_null_terminated_string(reader)?) } else { None };

        let comment =
            if flags & FCOMMENT != 0 { Some(read_null_terminated_string(reader)?) } else { None };

        let header_crc = if flags & FHCRC != 0 {
            let mut crc_buf = [0u8; 2];
            reader.read_exact(&mut crc_buf).map_err(Error::from_read)?;
            Some(u16::from_le_bytes(crc_buf))
        } else {
            None
        };

        debug!(
            "gzip header: flags=0x{:02x} mtime={} os={} name={:?}",
            flags, mtime, os, filename
        );

        Ok(GzipHeader { flags, mtime, extra_flags, os, extra, filename, comment, header_crc })
    }

    /// Check if the FTEXT flag is set
    pub fn is_text(&self) -> bool {
        self.flags & FTEXT != 0
    }

    /// Check if the FHCRC flag is set
    pub fn has_header_crc(&self) -> bool {
        self.flags & FHCRC != 0
    }
}

/// Read a null-terminated Latin-1 string, decoding as UTF-8 when valid
fn read_null_terminated_string<R: Read>(reader: &mut R) -> Result<String> {
    let mut bytes = Vec::new();
    let mut byte = [0u8; 1];

    loop {
        reader.read_exact(&mut byte).map_err(Error::from_read)?;
        if byte[0] == 0 {
            break;
        }
        bytes.push(byte[0]);
    }

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => Ok(e.into_bytes().iter().map(|&b| b as char).collect()),
    }
}

/// Streaming gzip decoder
///
/// Validates CRC-32 and ISIZE of every member. With multi-member decoding on
/// (the default), members that follow are decoded as one continuous stream.
pub struct GzipDecoder<R: Read, D: SymbolDecoder = TableDecoder> {
    inflater: Inflater<R, D>,
    header: GzipHeader,
    factory: WindowFactory,
    crc: Crc32,
    size: u32,
    multi_member: bool,
    members: u64,
    done: bool,
    failed: bool,
}

impl<R: Read> GzipDecoder<R> {
    /// Decoder with a ring window and the flat-table symbol decoder
    pub fn new(reader: R) -> Result<Self> {
        Self::with_factory(reader, WindowKind::default().factory())
    }
}

impl<R: Read, D: SymbolDecoder> GzipDecoder<R, D> {
    /// Parse the first member header, drawing windows from `factory`
    pub fn with_factory(reader: R, factory: WindowFactory) -> Result<Self> {
        Self::from_bits(BitReader::new(reader), factory)
    }

    pub(crate) fn from_bits(mut bits: BitReader<R>, factory: WindowFactory) -> Result<Self> {
        let header = GzipHeader::parse(&mut bits)?;
        let mut inflater = Inflater::from_bits(bits, factory(DEFLATE_MAX_DISTANCE));
        inflater.hold_window_past_final_block();
        Ok(Self {
            inflater,
            header,
            factory,
            crc: Crc32::new(),
            size: 0,
            multi_member: true,
            members: 0,
            done: false,
            failed: false,
        })
    }

    /// Decode members after the first (default `true`)
    ///
    /// When off, decoding stops after the first member and anything after it is
    /// left for [`trailing_reader`](GzipDecoder::trailing_reader).
    pub fn multi_member(mut self, enabled: bool) -> Self {
        self.multi_member = enabled;
        self
    }

    /// Header of the member currently being decoded
    pub fn header(&self) -> &GzipHeader {
        &self.header
    }

    /// Members fully decoded and validated
    pub fn members(&self) -> u64 {
        self.members
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

    /// Decode into `buf`; `Ok(0)` once every member is validated
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
        while !self.done && !buf.is_empty() {
            let n = self.inflater.inflate(buf)?;
            if n > 0 {
                self.crc.update_slice(&buf[..n]);
                self.size = self.size.wrapping_add(n as u32);
                return Ok(n);
            }
            self.finish_member()?;
        }
        Ok(0)
    }

    /// Validate the trailer and move on to the next member if there is one
    fn finish_member(&mut self) -> Result<()> {
        self.inflater.enter_trailing_bytes()?;
        let mut trailer = [0u8; 8];
        self.inflater.read_trailing_exact(&mut trailer)?;

        let expected_crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        let expected_size = u32::from_le_bytes([trailer[4], trailer[5], trailer[6], trailer[7]]);
        debug!("gzip trailer: crc32=0x{:08x} isize={}", expected_crc, expected_size);

        let found = self.crc.value();
        if expected_crc != found {
            return Err(Error::Crc32Mismatch { expected: expected_crc, found });
        }
        if expected_size != self.size {
            return Err(Error::SizeMismatch { expected: expected_size, found: self.size });
        }
        self.members += 1;
        self.inflater.release_window();

        if !self.multi_member {
            self.done = true;
            return Ok(());
        }

        let first = match self.inflater.read_trailing_byte()? {
            Some(byte) => byte,
            None => {
                self.done = true;
                return Ok(());
            }
        };
        let header = {
            let mut reader = Cursor::new([first]).chain(self.inflater.trailing_reader()?);
            GzipHeader::parse(&mut reader)?
        };
        self.inflater.restart((self.factory)(DEFLATE_MAX_DISTANCE))?;
        self.header = header;
        self.crc.start();
        self.size = 0;
        Ok(())
    }

    /// [`Read`] over input left after the last decoded member
    pub fn trailing_reader(&mut self) -> Result<TrailingReader<'_, R>> {
        if !self.done {
            return Err(Error::InvalidState("gzip stream not finished"));
        }
        self.inflater.trailing_reader()
    }
}

impl<R: Read, D: SymbolDecoder> Read for GzipDecoder<R, D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.decode(buf).map_err(io::Error::from)
    }
}
