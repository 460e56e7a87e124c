use super::block::{BlockHeader, BlockKind, InflateStats, PendingCopy};
use super::tables::{distance_code, length_code, CODE_LENGTH_ORDER};
use crate::bits::BitReader;
use crate::error::{Error, Result};
use crate::huffman::tables::{
    fixed_distance_lengths, fixed_literal_lengths, NUM_CODE_LENGTH_CODES, NUM_DISTANCE_CODES,
    NUM_LITERAL_LENGTH_CODES,
};
use crate::huffman::{SymbolDecoder, TableDecoder};
use crate::window::LookBackMemory;
use log::debug;
use std::io::{self, Read};

/// Symbol 256 closes a Huffman block
const END_OF_BLOCK: u16 = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    /// Expecting a block header
    BlockFree,
    Stored { is_final: bool, remaining: usize },
    Huffman { is_final: bool, fixed: bool },
    /// Final block done; payload is complete
    LastBlockFree,
    TrailingBits,
    TrailingBytes,
    Failed,
}

impl State {
    fn after_block(is_final: bool) -> Self {
        if is_final {
            State::LastBlockFree
        } else {
            State::BlockFree
        }
    }
}

/// Streaming DEFLATE decoder (RFC 1951)
///
/// Pulls compressed bytes from `R`, resolves Huffman symbols with `D` and keeps
/// history in an injected [`LookBackMemory`]. Output is produced on demand
/// through [`inflate`](Inflater::inflate) or the [`Read`] impl.
///
/// Once the final block has been decoded, whatever follows the compressed data
/// can be read in trailing-bits or trailing-bytes mode.
pub struct Inflater<R: Read, D: SymbolDecoder = TableDecoder> {
    bits: BitReader<R>,
    window: Box<dyn LookBackMemory>,
    window_released: bool,
    /// Keep the window past the final block until the container releases it
    hold_window: bool,
    state: State,
    literal: D,
    distance: D,
    code_length: D,
    fixed_literal: D,
    fixed_distance: D,
    fixed_ready: bool,
    pending: PendingCopy,
    /// Scratch for transmitted literal/length and distance code lengths
    lengths: [u8; NUM_LITERAL_LENGTH_CODES + NUM_DISTANCE_CODES],
    code_length_lengths: [u8; NUM_CODE_LENGTH_CODES],
    stats: InflateStats,
    /// Error held back so bytes decoded before it can be returned first
    deferred: Option<Error>,
}

impl<R: Read> Inflater<R> {
    /// Decoder using the flat-table symbol decoder
    pub fn new(reader: R, window: Box<dyn LookBackMemory>) -> Self {
        Self::with_decoder(reader, window)
    }
}

impl<R: Read, D: SymbolDecoder> Inflater<R, D> {
    /// Decoder with an explicit symbol decoding strategy
    pub fn with_decoder(reader: R, window: Box<dyn LookBackMemory>) -> Self {
        Self::from_bits(BitReader::new(reader), window)
    }

    /// Continue decoding from an existing bit reader (after a container header)
    pub fn from_bits(bits: BitReader<R>, window: Box<dyn LookBackMemory>) -> Self {
        Self {
            bits,
            window,
            window_released: false,
            hold_window: false,
            state: State::BlockFree,
            literal: D::default(),
            distance: D::default(),
            code_length: D::default(),
            fixed_literal: D::default(),
            fixed_distance: D::default(),
            fixed_ready: false,
            pending: PendingCopy::default(),
            lengths: [0; NUM_LITERAL_LENGTH_CODES + NUM_DISTANCE_CODES],
            code_length_lengths: [0; NUM_CODE_LENGTH_CODES],
            stats: InflateStats::default(),
            deferred: None,
        }
    }

    /// Decode into `out`, returning the number of bytes produced
    ///
    /// `Ok(0)` for a non-empty `out` means the final block has been decoded.
    /// After an error the session is failed: bytes decoded before the error are
    /// returned first, then the error, then [`Error::SessionFailed`].
    pub fn inflate(&mut self, out: &mut [u8]) -> Result<usize> {
        if self.state == State::Failed {
            return Err(self.deferred.take().unwrap_or(Error::SessionFailed));
        }

        let mut written = 0;
        let result = self.inflate_into(out, &mut written);
        self.stats.output_bytes += written as u64;

        match result {
            Ok(()) => Ok(written),
            Err(e) => {
                self.fail();
                if written > 0 {
                    self.deferred = Some(e);
                    Ok(written)
                } else {
                    Err(e)
                }
            }
        }
    }

    fn inflate_into(&mut self, out: &mut [u8], written: &mut usize) -> Result<()> {
        while *written < out.len() {
            match self.state {
                State::BlockFree => self.read_block_header()?,
                State::Stored { is_final, remaining } => {
                    if remaining == 0 {
                        self.end_block(is_final);
                        continue;
                    }
                    let n = remaining.min(out.len() - *written);
                    let chunk = &mut out[*written..*written + n];
                    self.bits.read_aligned_bytes(chunk)?;
                    self.window.put_slice(chunk);
                    *written += n;
                    self.state = State::Stored { is_final, remaining: remaining - n };
                }
                State::Huffman { is_final, fixed } => {
                    self.inflate_huffman(out, written, is_final, fixed)?;
                }
                State::LastBlockFree
                | State::TrailingBits
                | State::TrailingBytes
                | State::Failed => break,
            }
        }
        Ok(())
    }

    fn read_block_header(&mut self) -> Result<()> {
        let is_final = self.bits.read_bit()?;
        let btype = self.bits.read_bits(2)? as u8;
        let kind = BlockKind::from_btype(btype).ok_or(Error::InvalidBlockType(btype))?;
        let header = BlockHeader { is_final, kind };
        debug!("block header: {} final={}", header.kind, header.is_final);

        self.state = match kind {
            BlockKind::Stored => {
                let len = self.bits.read_u16_le()?;
                let nlen = self.bits.read_u16_le()?;
                if len != !nlen {
                    return Err(Error::StoredBlockLengthMismatch { len, nlen });
                }
                State::Stored { is_final, remaining: len as usize }
            }
            BlockKind::Fixed => {
                if !self.fixed_ready {
                    self.fixed_literal.build(&fixed_literal_lengths())?;
                    self.fixed_distance.build(&fixed_distance_lengths())?;
                    self.fixed_ready = true;
                }
                State::Huffman { is_final, fixed: true }
            }
            BlockKind::Dynamic => {
                self.read_dynamic_tables()?;
                State::Huffman { is_final, fixed: false }
            }
        };
        self.stats.count_block(kind);
        Ok(())
    }

    /// Read a dynamic block header and rebuild the literal and distance decoders
    fn read_dynamic_tables(&mut self) -> Result<()> {
        let hlit = self.bits.read_bits(5)? as usize + 257;
        let hdist = self.bits.read_bits(5)? as usize + 1;
        let hclen = self.bits.read_bits(4)? as usize + 4;
        debug!("dynamic header: hlit={} hdist={} hclen={}", hlit, hdist, hclen);

        if hlit > NUM_LITERAL_LENGTH_CODES || hdist > NUM_DISTANCE_CODES {
            return Err(Error::TooManyCodes { literal: hlit, distance: hdist });
        }

        self.code_length_lengths = [0; NUM_CODE_LENGTH_CODES];
        for &symbol in &CODE_LENGTH_ORDER[..hclen] {
            self.code_length_lengths[symbol] = self.bits.read_bits(3)? as u8;
        }
        self.code_length.build(&self.code_length_lengths)?;

        let total = hlit + hdist;
        let mut i = 0;
        while i < total {
            let (value, repeat) = match self.code_length.decode(&mut self.bits)? {
                sym @ 0..=15 => (sym as u8, 1),
                16 => {
                    let prev = match i {
                        0 => return Err(Error::MissingPreviousLength),
                        _ => self.lengths[i - 1],
                    };
                    (prev, 3 + self.bits.read_bits(2)? as usize)
                }
                17 => (0, 3 + self.bits.read_bits(3)? as usize),
                18 => (0, 11 + self.bits.read_bits(7)? as usize),
                sym => return Err(Error::InvalidHuffmanSymbol(sym as u32)),
            };
            if i + repeat > total {
                return Err(Error::CodeLengthOverflow);
            }
            self.lengths[i..i + repeat].fill(value);
            i += repeat;
        }

        if self.lengths[END_OF_BLOCK as usize] == 0 {
            return Err(Error::MissingEndOfBlock);
        }
        self.literal.build(&self.lengths[..hlit])?;
        self.distance.build(&self.lengths[hlit..total])?;
        Ok(())
    }

    /// Decode symbols until `out` is full or the block ends
    fn inflate_huffman(
        &mut self,
        out: &mut [u8],
        written: &mut usize,
        is_final: bool,
        fixed: bool,
    ) -> Result<()> {
        let mut n = *written;

        if !self.pending.is_empty() {
            let take = self.pending.remaining.min(out.len() - n);
            self.window.copy_into(self.pending.distance, &mut out[n..n + take])?;
            self.pending.remaining -= take;
            n += take;
            *written = n;
        }

        let (literal, distance) = if fixed {
            (&self.fixed_literal, &self.fixed_distance)
        } else {
            (&self.literal, &self.distance)
        };

        while n < out.len() {
            let sym = literal.decode(&mut self.bits)?;
            match sym {
                0..=255 => {
                    out[n] = sym as u8;
                    self.window.put(sym as u8);
                    n += 1;
                }
                END_OF_BLOCK => {
                    self.state = State::after_block(is_final);
                    break;
                }
                _ => {
                    let (base, extra) = length_code(sym).ok_or(Error::InvalidLengthCode(sym))?;
                    let length = base as usize + self.bits.read_bits(extra)? as usize;

                    let dist_sym = distance.decode(&mut self.bits)?;
                    let (dist_base, dist_extra) =
                        distance_code(dist_sym).ok_or(Error::InvalidDistanceCode(dist_sym))?;
                    let dist = dist_base as usize + self.bits.read_bits(dist_extra)? as usize;

                    let take = length.min(out.len() - n);
                    self.window.copy_into(dist, &mut out[n..n + take])?;
                    n += take;
                    self.pending = PendingCopy { remaining: length - take, distance: dist };
                }
            }
            *written = n;
        }

        if self.state == State::LastBlockFree {
            self.finish_final_block();
        }
        Ok(())
    }

    fn end_block(&mut self, is_final: bool) {
        self.state = State::after_block(is_final);
        if is_final {
            self.finish_final_block();
        }
    }

    fn finish_final_block(&mut self) {
        if !self.hold_window {
            self.release_window();
        }
    }

    fn fail(&mut self) {
        self.state = State::Failed;
        self.pending = PendingCopy::default();
        self.release_window();
    }

    /// Leave the window in place after the final block
    ///
    /// Containers set this so the window outlives trailer validation; they then
    /// call [`release_window`](Inflater::release_window) themselves.
    pub(crate) fn hold_window_past_final_block(&mut self) {
        self.hold_window = true;
    }

    /// Release the window exactly once
    pub(crate) fn release_window(&mut self) {
        if self.window_released {
            return;
        }
        self.window_released = true;
        if self.window.release() {
            debug!("released look-back window after {} bytes", self.stats.output_bytes);
        }
    }

    /// Start decoding a new DEFLATE stream at the next byte boundary
    ///
    /// Used between gzip members. Only valid once the previous stream is complete.
    pub fn restart(&mut self, window: Box<dyn LookBackMemory>) -> Result<()> {
        if !self.is_finished() {
            return Err(Error::InvalidState("restart before the final block"));
        }
        self.release_window();
        self.bits.align_to_byte();
        self.window = window;
        self.window_released = false;
        self.pending = PendingCopy::default();
        self.state = State::BlockFree;
        Ok(())
    }

    /// Final block has been decoded
    pub fn is_finished(&self) -> bool {
        matches!(self.state, State::LastBlockFree | State::TrailingBits | State::TrailingBytes)
    }

    /// Session has failed
    pub fn is_failed(&self) -> bool {
        self.state == State::Failed
    }

    pub fn stats(&self) -> &InflateStats {
        &self.stats
    }

    /// Input bytes consumed so far, excluding bytes read ahead and still buffered
    pub fn bytes_consumed(&self) -> u64 {
        self.bits.bytes_consumed()
    }

    /// Switch to reading the bits left in the reader after the final block
    pub fn enter_trailing_bits(&mut self) -> Result<()> {
        match self.state {
            State::LastBlockFree | State::TrailingBits => {
                self.state = State::TrailingBits;
                Ok(())
            }
            State::Failed => Err(Error::SessionFailed),
            _ => Err(Error::InvalidState("trailing bits before the final block")),
        }
    }

    /// Buffered bits not consumed by the decoder
    pub fn trailing_bit_count(&self) -> usize {
        match self.state {
            State::TrailingBits => self.bits.bits_available() as usize,
            _ => 0,
        }
    }

    /// Peek a buffered trailing bit; index 0 is the next one
    pub fn trailing_bit(&self, index: usize) -> Option<bool> {
        match self.state {
            State::TrailingBits => self.bits.get_bit(u8::try_from(index).ok()?),
            _ => None,
        }
    }

    /// Consume one trailing bit, `None` at end of input
    pub fn read_trailing_bit(&mut self) -> Result<Option<bool>> {
        if self.state != State::TrailingBits {
            return Err(Error::InvalidState("not in trailing bits mode"));
        }
        match self.bits.read_bit() {
            Ok(bit) => Ok(Some(bit)),
            Err(Error::UnexpectedEof) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Switch to byte-aligned reads of whatever follows the compressed data
    ///
    /// The partial byte at the current position is discarded.
    pub fn enter_trailing_bytes(&mut self) -> Result<()> {
        match self.state {
            State::LastBlockFree | State::TrailingBits | State::TrailingBytes => {
                self.bits.align_to_byte();
                self.state = State::TrailingBytes;
                Ok(())
            }
            State::Failed => Err(Error::SessionFailed),
            _ => Err(Error::InvalidState("trailing bytes before the final block")),
        }
    }

    /// Next trailing byte, `None` at end of input
    pub fn read_trailing_byte(&mut self) -> Result<Option<u8>> {
        self.expect_trailing_bytes()?;
        self.bits.try_read_aligned_byte()
    }

    /// Fill `buf` from the trailing bytes
    pub fn read_trailing_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.expect_trailing_bytes()?;
        self.bits.read_aligned_bytes(buf)
    }

    /// [`Read`] over the trailing bytes
    pub fn trailing_reader(&mut self) -> Result<TrailingReader<'_, R>> {
        self.expect_trailing_bytes()?;
        Ok(TrailingReader { bits: &mut self.bits })
    }

    fn expect_trailing_bytes(&self) -> Result<()> {
        if self.state != State::TrailingBytes {
            return Err(Error::InvalidState("not in trailing bytes mode"));
        }
        Ok(())
    }
}

impl<R: Read, D: SymbolDecoder> Read for Inflater<R, D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inflate(buf).map_err(io::Error::from)
    }
}

impl<R: Read, D: SymbolDecoder> Drop for Inflater<R, D> {
    fn drop(&mut self) {
        self.release_window();
    }
}

/// Byte reader over input that follows a finished DEFLATE stream
pub struct TrailingReader<'a, R: Read> {
    bits: &'a mut BitReader<R>,
}

impl<R: Read> Read for TrailingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.bits.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::huffman::{CodeMajorDecoder, PackedMapDecoder, RangeDecoder, TrieDecoder};
    use crate::window::{BufferPool, WindowKind, DEFLATE_MAX_DISTANCE};
    use std::io::{Cursor, Write};
    use std::sync::Arc;

    /// Packs test streams: header fields LSB first, Huffman codes MSB first
    #[derive(Default)]
    struct BitSink {
        bytes: Vec<u8>,
        used: u32,
    }

    impl BitSink {
        fn bits(&mut self, value: u32, n: u32) -> &mut Self {
            for i in 0..n {
                if self.used % 8 == 0 {
                    self.bytes.push(0);
                }
                let bit = ((value >> i) & 1) as u8;
                *self.bytes.last_mut().unwrap() |= bit << (self.used % 8);
                self.used += 1;
            }
            self
        }

        fn code(&mut self, value: u32, n: u32) -> &mut Self {
            for i in (0..n).rev() {
                self.bits((value >> i) & 1, 1);
            }
            self
        }

        fn finish(&mut self) -> Vec<u8> {
            std::mem::take(&mut self.bytes)
        }
    }

    fn inflater(data: Vec<u8>) -> Inflater<Cursor<Vec<u8>>> {
        Inflater::new(Cursor::new(data), WindowKind::Ring.create(DEFLATE_MAX_DISTANCE))
    }

    fn inflate_all<D: SymbolDecoder>(data: &[u8], window: WindowKind) -> Result<Vec<u8>> {
        let mut inflater = Inflater::<_, D>::with_decoder(data, window.create(DEFLATE_MAX_DISTANCE));
        let mut out = Vec::new();
        let mut buf = [0u8; 777];
        loop {
            match inflater.inflate(&mut buf)? {
                0 => return Ok(out),
                n => out.extend_from_slice(&buf[..n]),
            }
        }
    }

    fn sample_text(len: usize) -> Vec<u8> {
        let words: [&[u8]; 6] = [b"deflate ", b"window ", b"huffman ", b"zz", b"\x00\x01", b"block\n"];
        let mut state = 0x2545F491u32;
        let mut out = Vec::with_capacity(len);
        while out.len() < len {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            if state % 7 == 0 {
                out.push(state as u8);
            } else {
                out.extend_from_slice(words[(state >> 8) as usize % words.len()]);
            }
        }
        out.truncate(len);
        out
    }

    fn deflate(data: &[u8], level: u32) -> Vec<u8> {
        let mut encoder =
            flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::new(level));
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_stored_block_hello() {
        let data = vec![0x01, 0x05, 0x00, 0xFA, 0xFF, b'h', b'e', b'l', b'l', b'o'];
        let mut inflater = inflater(data);
        let mut out = Vec::new();
        inflater.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hello");
        assert!(inflater.is_finished());
        assert_eq!(inflater.stats().stored_blocks, 1);
        assert_eq!(inflater.stats().output_bytes, 5);
    }

    #[test]
    fn test_stored_complement_mismatch() {
        let data = vec![0x01, 0x05, 0x00, 0xFA, 0xFE, b'h', b'e', b'l', b'l', b'o'];
        let err = inflater(data).inflate(&mut [0u8; 16]).unwrap_err();
        assert!(matches!(err, Error::StoredBlockLengthMismatch { len: 5, nlen: 0xFEFA }));
        assert_eq!(err.kind(), ErrorKind::CompressAlgorithm);
    }

    #[test]
    fn test_reserved_block_type() {
        let err = inflater(vec![0b111]).inflate(&mut [0u8; 4]).unwrap_err();
        assert!(matches!(err, Error::InvalidBlockType(3)));
        assert_eq!(err.kind(), ErrorKind::MalformedBlockType);
    }

    #[test]
    fn test_truncated_stream() {
        let data = deflate(&sample_text(5000), 6);
        let err = inflate_all::<TableDecoder>(&data[..data.len() / 2], WindowKind::Ring)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEndOfStream);
    }

    #[test]
    fn test_every_decoder_and_window() {
        let text = sample_text(100_000);
        for level in [0, 1, 6, 9] {
            let data = deflate(&text, level);
            for window in WindowKind::ALL {
                assert_eq!(inflate_all::<TableDecoder>(&data, window).unwrap(), text);
                assert_eq!(inflate_all::<TrieDecoder>(&data, window).unwrap(), text);
                assert_eq!(inflate_all::<PackedMapDecoder>(&data, window).unwrap(), text);
                assert_eq!(inflate_all::<CodeMajorDecoder>(&data, window).unwrap(), text);
                assert_eq!(inflate_all::<RangeDecoder>(&data, window).unwrap(), text);
            }
        }
    }

    #[test]
    fn test_block_stats() {
        let text = sample_text(300_000);
        let mut inflater = inflater(deflate(&text, 6));
        let mut out = Vec::new();
        inflater.read_to_end(&mut out).unwrap();
        let stats = *inflater.stats();
        assert_eq!(stats.output_bytes, text.len() as u64);
        assert!(stats.dynamic_blocks >= 1);
        assert_eq!(stats.blocks(), stats.stored_blocks + stats.fixed_blocks + stats.dynamic_blocks);
    }

    #[test]
    fn test_fixed_block_with_trailing_bits() {
        let data = BitSink::default()
            .bits(1, 1)
            .bits(1, 2)
            .code(0x30 + b'a' as u32, 8)
            .code(0, 7)
            .bits(0b101101, 6)
            .bits(0xAB, 8)
            .finish();

        let mut inflater = inflater(data);
        assert!(inflater.enter_trailing_bits().is_err());
        let mut buf = [0u8; 8];
        assert_eq!(inflater.inflate(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], b'a');
        assert_eq!(inflater.stats().fixed_blocks, 1);
        assert_eq!(inflater.inflate(&mut buf).unwrap(), 0);

        inflater.enter_trailing_bits().unwrap();
        assert_eq!(inflater.trailing_bit_count(), 14);
        let bits: Vec<bool> = (0..6).map(|i| inflater.trailing_bit(i).unwrap()).collect();
        assert_eq!(bits, vec![true, false, true, true, false, true]);
        assert_eq!(inflater.trailing_bit(14), None);
        assert_eq!(inflater.read_trailing_bit().unwrap(), Some(true));

        inflater.enter_trailing_bytes().unwrap();
        assert_eq!(inflater.read_trailing_byte().unwrap(), Some(0xAB));
        assert_eq!(inflater.read_trailing_byte().unwrap(), None);
    }

    #[test]
    fn test_trailing_bytes_after_stored_block() {
        let mut data = vec![0x01, 0x02, 0x00, 0xFD, 0xFF, b'o', b'k'];
        data.extend_from_slice(b"payload");
        let mut inflater = inflater(data);
        let mut out = Vec::new();
        inflater.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"ok");

        assert!(inflater.read_trailing_byte().is_err());
        inflater.enter_trailing_bytes().unwrap();
        let mut head = [0u8; 3];
        inflater.read_trailing_exact(&mut head).unwrap();
        assert_eq!(&head, b"pay");
        let mut rest = Vec::new();
        inflater.trailing_reader().unwrap().read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"load");
    }

    #[test]
    fn test_distance_beyond_history_fails_after_output() {
        // 'a', then length 3 at distance 2 with only one byte written
        let data = BitSink::default()
            .bits(1, 1)
            .bits(1, 2)
            .code(0x30 + b'a' as u32, 8)
            .code(1, 7)
            .code(1, 5)
            .code(0, 7)
            .finish();

        let mut inflater = inflater(data);
        let mut buf = [0u8; 8];
        assert_eq!(inflater.inflate(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], b'a');
        let err = inflater.inflate(&mut buf).unwrap_err();
        assert!(matches!(err, Error::IllegalDistance { distance: 2, available: 1 }));
        assert!(inflater.is_failed());
        assert!(matches!(inflater.inflate(&mut buf), Err(Error::SessionFailed)));
    }

    #[test]
    fn test_fixed_distance_codes_30_and_31_rejected() {
        let data = BitSink::default()
            .bits(1, 1)
            .bits(1, 2)
            .code(0x30 + b'a' as u32, 8)
            .code(1, 7)
            .code(30, 5)
            .finish();
        let mut out = Vec::new();
        let err = inflater(data).read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert_eq!(out, b"a");
    }

    #[test]
    fn test_fixed_length_code_286_rejected() {
        // 280-287 are 8-bit codes starting at 11000000
        let data = BitSink::default().bits(1, 1).bits(1, 2).code(0xC0 + 6, 8).finish();
        let err = inflater(data).inflate(&mut [0u8; 4]).unwrap_err();
        assert!(matches!(err, Error::InvalidLengthCode(286)));
    }

    /// Dynamic header with HLIT=257, HDIST=1 whose code-length code gives
    /// symbol 0 the code `0` and `other` the code `1`
    fn dynamic_prefix(other: usize) -> BitSink {
        let mut sink = BitSink::default();
        sink.bits(1, 1).bits(2, 2).bits(0, 5).bits(0, 5).bits(0, 4);
        // Transmission order starts 16, 17, 18, 0
        for symbol in [16, 17, 18, 0] {
            let len = if symbol == other || symbol == 0 { 1 } else { 0 };
            sink.bits(len, 3);
        }
        sink
    }

    #[test]
    fn test_dynamic_too_many_codes() {
        let data = BitSink::default().bits(1, 1).bits(2, 2).bits(30, 5).bits(0, 5).bits(0, 4).finish();
        let err = inflater(data).inflate(&mut [0u8; 4]).unwrap_err();
        assert!(matches!(err, Error::TooManyCodes { literal: 287, distance: 1 }));
        assert_eq!(err.kind(), ErrorKind::MalformedHuffmanStream);
    }

    #[test]
    fn test_dynamic_repeat_overflow() {
        let data = dynamic_prefix(18).code(1, 1).bits(127, 7).code(1, 1).bits(127, 7).finish();
        let err = inflater(data).inflate(&mut [0u8; 4]).unwrap_err();
        assert!(matches!(err, Error::CodeLengthOverflow));
    }

    #[test]
    fn test_dynamic_repeat_without_previous() {
        let data = dynamic_prefix(16).code(1, 1).bits(0, 2).finish();
        let err = inflater(data).inflate(&mut [0u8; 4]).unwrap_err();
        assert!(matches!(err, Error::MissingPreviousLength));
    }

    #[test]
    fn test_dynamic_missing_end_of_block() {
        // 138 + 119 + 1 zero lengths
        let data = dynamic_prefix(18)
            .code(1, 1)
            .bits(127, 7)
            .code(1, 1)
            .bits(108, 7)
            .code(0, 1)
            .finish();
        let err = inflater(data).inflate(&mut [0u8; 4]).unwrap_err();
        assert!(matches!(err, Error::MissingEndOfBlock));
    }

    #[test]
    fn test_small_reads_match_bulk() {
        let text = sample_text(20_000);
        let mut inflater = inflater(deflate(&text, 9));
        let mut out = Vec::new();
        let mut buf = [0u8; 3];
        loop {
            let n = inflater.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, text);
    }

    #[test]
    fn test_restart_decodes_concatenated_streams() {
        let mut data = deflate(b"first ", 6);
        data.extend(deflate(b"second", 1));
        let mut inflater = inflater(data);

        let mut out = Vec::new();
        inflater.read_to_end(&mut out).unwrap();
        assert!(inflater.restart(WindowKind::Linear.create(1024)).is_ok());
        inflater.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"first second");
    }

    #[test]
    fn test_window_returned_to_pool() {
        let pool = BufferPool::new(DEFLATE_MAX_DISTANCE, 4);
        let factory = WindowKind::PooledFast.factory_with_pool(Arc::clone(&pool));
        let data = deflate(&sample_text(50_000), 6);

        // Dropped mid-stream
        {
            let mut inflater = Inflater::new(data.as_slice(), factory(DEFLATE_MAX_DISTANCE));
            inflater.inflate(&mut [0u8; 100]).unwrap();
            assert_eq!(pool.outstanding(), 1);
        }
        assert_eq!(pool.outstanding(), 0);

        // Completed
        let mut inflater = Inflater::new(data.as_slice(), factory(DEFLATE_MAX_DISTANCE));
        let mut out = Vec::new();
        inflater.read_to_end(&mut out).unwrap();
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.pooled(), 1);

        // Failed
        let mut inflater = Inflater::new(&data[..data.len() / 3], factory(DEFLATE_MAX_DISTANCE));
        assert!(inflater.read_to_end(&mut out).is_err());
        assert_eq!(pool.outstanding(), 0);
    }
}
