//! Rolling checksums used by the container trailers.
//!
//! gzip carries a CRC-32 of the decoded bytes (RFC 1952), zlib an Adler-32
//! (RFC 1950). Both are fed incrementally as decoded bytes stream through.

/// A checksum accumulated over a byte stream.
pub trait RollingChecksum {
    /// Reset to the initial value
    fn start(&mut self);

    /// Feed a single byte
    fn update(&mut self, byte: u8) {
        self.update_slice(&[byte]);
    }

    /// Feed a run of bytes
    fn update_slice(&mut self, bytes: &[u8]);

    /// Current checksum value
    fn value(&self) -> u32;
}

/// CRC-32 (IEEE) backed by `crc32fast`
#[derive(Clone, Default)]
pub struct Crc32 {
    hasher: crc32fast::Hasher,
}

impl Crc32 {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RollingChecksum for Crc32 {
    fn start(&mut self) {
        self.hasher.reset();
    }

    fn update_slice(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    fn value(&self) -> u32 {
        self.hasher.clone().finalize()
    }
}

/// Largest prime smaller than 65536
const ADLER_MOD: u32 = 65_521;

/// Largest n such that 255*n*(n+1)/2 + (n+1)*(ADLER_MOD-1) fits in u32
const NMAX: usize = 5552;

/// Adler-32 with modulo reduction deferred to `NMAX`-byte chunks
#[derive(Clone, Debug)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Adler32 {
    pub fn new() -> Self {
        Self { a: 1, b: 0 }
    }

    /// Adler-32 of `data` in one shot
    pub fn checksum(data: &[u8]) -> u32 {
        let mut adler = Self::new();
        adler.update_slice(data);
        adler.value()
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

impl RollingChecksum for Adler32 {
    fn start(&mut self) {
        self.a = 1;
        self.b = 0;
    }

    fn update(&mut self, byte: u8) {
        self.a = (self.a + byte as u32) % ADLER_MOD;
        self.b = (self.b + self.a) % ADLER_MOD;
    }

    fn update_slice(&mut self, bytes: &[u8]) {
        let mut a = self.a;
        let mut b = self.b;

        for chunk in bytes.chunks(NMAX) {
            for &byte in chunk {
                a += byte as u32;
                b += a;
            }
            a %= ADLER_MOD;
            b %= ADLER_MOD;
        }

        self.a = a;
        self.b = b;
    }

    fn value(&self) -> u32 {
        (self.b << 16) | self.a
    }
}
