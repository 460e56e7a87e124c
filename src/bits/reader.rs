use crate::error::{Error, Result};
use std::io::Read;

/// Bit-level reader for DEFLATE streams
///
/// DEFLATE uses LSB-first bit ordering within bytes.
/// Bits are read from LSB to MSB within each byte.
///
/// The reader pulls source bytes ahead of need, so once the logical stream has
/// ended the buffer may still hold bits and whole bytes that belong to whatever
/// follows it. Those stay reachable through [`BitReader::get_bit`],
/// [`BitReader::try_read_aligned_byte`] and the [`Read`] impl.
pub struct BitReader<R: Read> {
    reader: R,
    /// Buffer holding up to 64 bits
    buffer: u64,
    /// Number of valid bits in buffer (0-64)
    bits_available: u8,
    /// Total bytes pulled from the source
    bytes_read: u64,
}

impl<R: Read> BitReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buffer: 0, bits_available: 0, bytes_read: 0 }
    }

    /// Ensure at least `n` bits are available in buffer
    ///
    /// Uses bulk refill: reads up to 8 bytes at once when buffer is low,
    /// reducing call overhead significantly for bit-level operations.
    fn fill_buffer(&mut self, n: u8) -> Result<()> {
        debug_assert!(n <= 57, "Cannot request more than 57 bits at once");

        if self.bits_available >= n {
            return Ok(());
        }

        // We can safely add bytes when bits_available <= 56 (room for 8 bits minimum)
        if self.bits_available <= 56 {
            let bytes_to_read = ((64 - self.bits_available) / 8) as usize;
            let mut bulk_buf = [0u8; 8];

            match self.reader.read(&mut bulk_buf[..bytes_to_read]) {
                Ok(0) => {
                    // Fall through to byte-by-byte for EOF handling
                }
                Ok(bytes_read) => {
                    for &byte in &bulk_buf[..bytes_read] {
                        self.buffer |= (byte as u64) << self.bits_available;
                        self.bits_available += 8;
                    }
                    self.bytes_read += bytes_read as u64;

                    if self.bits_available >= n {
                        return Ok(());
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(Error::from_read(e)),
            }
        }

        while self.bits_available < n {
            match self.pull_byte()? {
                Some(byte) => {
                    self.buffer |= (byte as u64) << self.bits_available;
                    self.bits_available += 8;
                }
                None => return Err(Error::UnexpectedEof),
            }
        }
        Ok(())
    }

    /// Pull one byte straight from the source, `None` at end of input
    fn pull_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.reader.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.bytes_read += 1;
                    return Ok(Some(byte[0]));
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(Error::from_read(e)),
            }
        }
    }

    /// Read `n` bits (0-32) in LSB-first order (standard DEFLATE order)
    pub fn read_bits(&mut self, n: u8) -> Result<u32> {
        debug_assert!(n <= 32, "Cannot read more than 32 bits at once");

        if n == 0 {
            return Ok(0);
        }

        self.fill_buffer(n)?;

        let mask = (1u64 << n) - 1;
        let result = (self.buffer & mask) as u32;
        self.buffer >>= n;
        self.bits_available -= n;

        Ok(result)
    }

    /// Peek at `n` bits without consuming them (for table-based Huffman decoding)
    ///
    /// On end of input the bits that could be buffered stay buffered, so a caller
    /// can fall back to reading them one at a time.
    #[inline]
    pub fn peek_bits(&mut self, n: u8) -> Result<u32> {
        debug_assert!(n <= 32, "Cannot peek more than 32 bits at once");

        if n == 0 {
            return Ok(0);
        }

        self.fill_buffer(n)?;

        let mask = (1u64 << n) - 1;
        Ok((self.buffer & mask) as u32)
    }

    /// Consume `n` bits that were previously peeked
    #[inline]
    pub fn consume_bits(&mut self, n: u8) {
        debug_assert!(n <= self.bits_available, "Cannot consume more bits than available");
        self.buffer >>= n;
        self.bits_available -= n;
    }

    /// Read a single bit
    #[inline]
    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? != 0)
    }

    /// Discard remaining bits in current byte, align to next byte boundary
    pub fn align_to_byte(&mut self) {
        let discard = self.bits_available % 8;
        if discard > 0 {
            self.buffer >>= discard;
            self.bits_available -= discard;
        }
    }

    /// Read an aligned byte, `None` when the source is exhausted
    pub fn try_read_aligned_byte(&mut self) -> Result<Option<u8>> {
        self.align_to_byte();
        if self.bits_available >= 8 {
            return self.read_bits(8).map(|v| Some(v as u8));
        }
        self.pull_byte()
    }

    /// Read a 16-bit little-endian value (aligns to byte boundary first)
    pub fn read_u16_le(&mut self) -> Result<u16> {
        self.align_to_byte();
        let lo = self.read_bits(8)? as u16;
        let hi = self.read_bits(8)? as u16;
        Ok(lo | (hi << 8))
    }

    /// Read exactly `buf.len()` bytes (aligns to byte boundary first)
    ///
    /// Buffered whole bytes are drained first, the rest is read from the source
    /// in one call.
    pub fn read_aligned_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        self.align_to_byte();
        let buffered = self.drain_buffered(buf);
        if buffered < buf.len() {
            self.reader.read_exact(&mut buf[buffered..]).map_err(Error::from_read)?;
            self.bytes_read += (buf.len() - buffered) as u64;
        }
        Ok(())
    }

    /// Move whole buffered bytes into `buf`, returning how many were moved
    fn drain_buffered(&mut self, buf: &mut [u8]) -> usize {
        debug_assert_eq!(self.bits_available % 8, 0);
        let mut n = 0;
        while n < buf.len() && self.bits_available >= 8 {
            buf[n] = self.buffer as u8;
            self.buffer >>= 8;
            self.bits_available -= 8;
            n += 1;
        }
        n
    }

    /// Inspect a buffered but unconsumed bit without consuming it
    ///
    /// Index 0 is the next bit [`BitReader::read_bit`] would return. Returns
    /// `None` past the buffered bits; no source read happens.
    pub fn get_bit(&self, index: u8) -> Option<bool> {
        if index >= self.bits_available {
            return None;
        }
        Some((self.buffer >> index) & 1 != 0)
    }

    /// Bits buffered but not yet consumed
    pub fn bits_available(&self) -> u8 {
        self.bits_available
    }

    /// Bytes consumed by the decoder (pulled minus still buffered)
    pub fn bytes_consumed(&self) -> u64 {
        self.bytes_read - (self.bits_available / 8) as u64
    }
}

/// Byte-aligned reads over whatever follows the current position
impl<R: Read> Read for BitReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.align_to_byte();
        let buffered = self.drain_buffered(buf);
        if buffered > 0 {
            return Ok(buffered);
        }
        let n = self.reader.read(buf)?;
        self.bytes_read += n as u64;
        Ok(n)
    }
}
