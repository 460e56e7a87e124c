use thiserror::Error;

/// Coarse classification of decode failures.
///
/// Every variant of [`Error`] maps to exactly one kind. All kinds are terminal for
/// the decode session that produced them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The byte source ran dry in the middle of a structure
    UnexpectedEndOfStream,
    /// Block type code 3
    MalformedBlockType,
    /// Header, complement or checksum validation failed
    CompressAlgorithm,
    /// Code lengths or coded bits do not form a usable Huffman code
    MalformedHuffmanStream,
    /// Back-reference outside the look-back window
    IllegalDistance,
    /// The underlying source failed
    Io,
    /// The API was used out of order
    Usage,
}

#[derive(Error, Debug)]
pub enum Error {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected end of input")]
    UnexpectedEof,

    // Container header errors
    #[error("Invalid gzip magic bytes: expected 0x1f8b, got 0x{0:04x}")]
    InvalidGzipMagic(u16),

    #[error("Unsupported compression method: {0} (only DEFLATE/8 supported)")]
    UnsupportedCompressionMethod(u8),

    #[error("Reserved gzip flag bits set: 0x{0:02x}")]
    ReservedGzipFlags(u8),

    #[error("Zlib header check failed: 0x{0:04x} is not a multiple of 31")]
    ZlibHeaderChecksum(u16),

    #[error("Invalid zlib window size exponent: {0} (max 7)")]
    InvalidZlibWindow(u8),

    #[error("Preset dictionaries are not supported")]
    PresetDictionary,

    // DEFLATE block errors
    #[error("Invalid DEFLATE block type: {0}")]
    InvalidBlockType(u8),

    #[error("Stored block length mismatch: LEN={len}, NLEN={nlen}")]
    StoredBlockLengthMismatch { len: u16, nlen: u16 },

    // Huffman errors
    #[error("Invalid Huffman code length: {0} (max 15)")]
    InvalidCodeLength(u8),

    #[error("Huffman code oversubscribed: more codes than possible for bit length")]
    HuffmanOversubscribed,

    #[error("Huffman code incomplete: no symbols assigned")]
    HuffmanIncomplete,

    #[error("Undecodable Huffman bit sequence: 0x{0:x}")]
    InvalidHuffmanSymbol(u32),

    #[error("Too many codes in dynamic header: {literal} literal/length, {distance} distance")]
    TooManyCodes { literal: usize, distance: usize },

    #[error("Code length repeat overflows the declared code count")]
    CodeLengthOverflow,

    #[error("Code length repeat with no previous length")]
    MissingPreviousLength,

    #[error("Literal/length code has no end-of-block symbol")]
    MissingEndOfBlock,

    #[error("Invalid length code: {0}")]
    InvalidLengthCode(u16),

    #[error("Invalid distance code: {0}")]
    InvalidDistanceCode(u16),

    // Window errors
    #[error("Back-reference distance {distance} exceeds available window {available}")]
    IllegalDistance { distance: usize, available: usize },

    // Checksum errors
    #[error("CRC32 mismatch: expected 0x{expected:08x}, got 0x{found:08x}")]
    Crc32Mismatch { expected: u32, found: u32 },

    #[error("Size mismatch: expected {expected} bytes, got {found}")]
    SizeMismatch { expected: u32, found: u32 },

    #[error("Adler-32 mismatch: expected 0x{expected:08x}, got 0x{found:08x}")]
    Adler32Mismatch { expected: u32, found: u32 },

    // Session errors
    #[error("Invalid decoder state: {0}")]
    InvalidState(&'static str),

    #[error("Decode session already failed")]
    SessionFailed,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) => ErrorKind::Io,
            Error::UnexpectedEof => ErrorKind::UnexpectedEndOfStream,
            Error::InvalidBlockType(_) => ErrorKind::MalformedBlockType,
            Error::InvalidGzipMagic(_)
            | Error::UnsupportedCompressionMethod(_)
            | Error::ReservedGzipFlags(_)
            | Error::ZlibHeaderChecksum(_)
            | Error::InvalidZlibWindow(_)
            | Error::PresetDictionary
            | Error::StoredBlockLengthMismatch { .. }
            | Error::Crc32Mismatch { .. }
            | Error::SizeMismatch { .. }
            | Error::Adler32Mismatch { .. } => ErrorKind::CompressAlgorithm,
            Error::InvalidCodeLength(_)
            | Error::HuffmanOversubscribed
            | Error::HuffmanIncomplete
            | Error::InvalidHuffmanSymbol(_)
            | Error::TooManyCodes { .. }
            | Error::CodeLengthOverflow
            | Error::MissingPreviousLength
            | Error::MissingEndOfBlock
            | Error::InvalidLengthCode(_)
            | Error::InvalidDistanceCode(_) => ErrorKind::MalformedHuffmanStream,
            Error::IllegalDistance { .. } => ErrorKind::IllegalDistance,
            Error::InvalidState(_) | Error::SessionFailed => ErrorKind::Usage,
        }
    }

    /// Map a source read failure, treating a short read as end of stream
    pub(crate) fn from_read(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::UnexpectedEof
        } else {
            Error::Io(err)
        }
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            Error::UnexpectedEof => std::io::Error::new(std::io::ErrorKind::UnexpectedEof, err),
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
